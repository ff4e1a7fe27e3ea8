//! Writing-style profile

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};

/// Measured writing style of a sender
///
/// Serialized with camelCase keys; missing keys default to zero so partial
/// profiles still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleMetrics {
    pub greeting_present: bool,
    /// Greeting phrase, used verbatim
    pub greeting: Option<String>,
    pub sign_off_present: bool,
    pub sign_off: Option<String>,

    // Structure
    pub average_sentence_length: f64,
    pub average_lines_per_paragraph: f64,
    pub average_word_length: f64,
    pub sentence_length_variance: f64,
    pub paragraphs: f64,
    pub bullet_list_present: f64,
    pub numbered_list_rate: f64,
    pub table_usage_rate: f64,

    // Vocabulary and diversity
    pub type_token_ratio: f64,
    pub moving_average_ttr: f64,
    pub hapax_proportion: f64,
    pub shannon_entropy: f64,
    pub lexical_density: f64,
    pub contraction_rate: f64,

    // Syntax and grammar
    pub subordination_ratio: f64,
    pub passive_voice_rate: f64,
    pub modal_verb_rate: f64,
    pub parse_tree_depth_mean: f64,

    // Punctuation and symbols
    pub comma_rate: f64,
    pub exclamation_rate: f64,
    pub question_mark_rate: f64,
    pub three_dot_ellipsis_rate: f64,
    pub parenthesis_rate: f64,
    pub semicolon_rate: f64,
    pub all_caps_rate: f64,
    pub emoji_rate: f64,
    pub markup_bold_rate: f64,
    pub markup_italic_rate: f64,
    pub hyperlink_rate: f64,
    pub code_block_rate: f64,
    pub quoted_text_rate: f64,

    // Tone and sentiment
    pub sentiment_polarity: f64,
    pub sentiment_subjectivity: f64,
    pub formality_score: f64,
    pub hedge_rate: f64,
    pub certainty_rate: f64,

    // Readability and flow
    pub flesch_reading_ease: f64,
    pub gunning_fog_index: f64,
    pub smog_index: f64,
    pub average_forward_references: f64,
    pub cohesion_index: f64,

    // Persona markers and rhetoric
    pub first_person_singular_rate: f64,
    pub first_person_plural_rate: f64,
    pub second_person_rate: f64,
    pub self_reference_ratio: f64,
    pub empathy_phrase_rate: f64,
    pub humor_marker_rate: f64,
    pub rhetorical_question_rate: f64,
    pub analogy_rate: f64,
    pub imperative_sentence_rate: f64,
    pub expletive_opening_rate: f64,
    pub parallelism_rate: f64,
}

impl StyleMetrics {
    /// Parse a profile from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::with_source(
                ErrorKind::Validation,
                anyhow::anyhow!("invalid style profile: {}", e),
            )
        })
    }

    /// Profile JSON as embedded in the prompt
    pub fn to_profile_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::with_source(ErrorKind::Validation, e.into()))
    }
}
