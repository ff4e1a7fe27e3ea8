//! Composition prompt builder
//!
//! Turns a writing-style profile and the composing context into the
//! instruction text handed to a text generation model. Building is pure:
//! identical inputs always give identical output.

mod metrics;
mod prompt;

pub use metrics::StyleMetrics;
pub use prompt::{
    ComposeContext, OUT_OF_SCOPE_REPLY, ThreadMessage, build_compose_prompt,
    styled_email_assistant_system_prompt,
};
