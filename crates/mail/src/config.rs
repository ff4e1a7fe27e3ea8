//! Runtime settings and OAuth client credentials
//!
//! [`Settings`] is read from `settings.json` in the Zero config directory,
//! then overridden by environment variables. [`GmailCredentials`] holds the
//! OAuth client used by the Gmail driver to refresh access tokens.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings filename in the Zero config directory
const SETTINGS_FILE: &str = "settings.json";

/// Credentials filename in the Zero config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Default number of threads requested per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Tunables for listing, paging and the view layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the web API serving `/api/driver`
    pub api_base_url: String,
    pub default_page_size: usize,
    /// Row height in pixels for the regular list layout
    pub item_height: f32,
    /// Row height in pixels for the compact list layout
    pub compact_item_height: f32,
    /// Gap between rows in pixels
    pub list_gap: f32,
    /// Rows rendered beyond each edge of the viewport
    pub overscan: usize,
    /// Hover time before a thread is prefetched
    pub hover_prefetch_delay_ms: u64,
    /// Quiet period before a requested revalidation runs
    pub revalidate_debounce_ms: u64,
    /// SQLite database for connections; defaults to the config directory
    pub database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            item_height: 96.0,
            compact_item_height: 64.0,
            list_gap: 6.0,
            overscan: 1,
            hover_prefetch_delay_ms: 1000,
            revalidate_debounce_ms: 3000,
            database_path: None,
        }
    }
}

impl Settings {
    /// Load settings from the config directory, then apply environment overrides
    pub fn load() -> Result<Self> {
        let settings: Settings = config::load_json_or_default(SETTINGS_FILE)?;
        Ok(settings.with_env_overrides())
    }

    /// Load settings from a specific file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings: Settings = config::load_json_file(path)?;
        Ok(settings.with_env_overrides())
    }

    /// Apply `ZERO_API_URL`, `ZERO_PAGE_SIZE` and `ZERO_DATABASE`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("ZERO_API_URL") {
            self.api_base_url = url;
        }
        if let Some(size) = lookup("ZERO_PAGE_SIZE").and_then(|s| s.parse().ok()) {
            self.default_page_size = size;
        }
        if let Some(path) = lookup("ZERO_DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Row height for the chosen layout
    pub fn row_height(&self, compact: bool) -> f32 {
        if compact {
            self.compact_item_height
        } else {
            self.item_height
        }
    }

    /// Resolved database location
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| config::config_path("zero.db"))
    }
}

/// OAuth client credentials for the Gmail API
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientCredentials>,
    web: Option<ClientCredentials>,
}

#[derive(Deserialize)]
struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials
    /// 2. JSON file (~/.config/zero/google-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Credentials baked in with `GOOGLE_CLIENT_ID=.. GOOGLE_CLIENT_SECRET=.. cargo build`
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        let client = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: client.client_id,
            client_secret: client.client_secret,
        })
    }

    /// Parse credentials from JSON (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .context("GOOGLE_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .context("GOOGLE_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_page_size, 20);
        assert_eq!(settings.row_height(true), 64.0);
        assert_eq!(settings.row_height(false), 96.0);
        assert_eq!(settings.revalidate_debounce_ms, 3000);
    }

    #[test]
    fn test_partial_settings_file_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "api_base_url": "https://mail.example.com" }"#).unwrap();
        assert_eq!(settings.api_base_url, "https://mail.example.com");
        assert_eq!(settings.default_page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(settings.overscan, 1);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::default().with_overrides(|key| match key {
            "ZERO_API_URL" => Some("https://api.example.com".to_string()),
            "ZERO_PAGE_SIZE" => Some("50".to_string()),
            _ => None,
        });
        assert_eq!(settings.api_base_url, "https://api.example.com");
        assert_eq!(settings.default_page_size, 50);
        assert!(settings.database_path.is_none());
    }

    #[test]
    fn test_invalid_page_size_override_is_ignored() {
        let settings = Settings::default().with_overrides(|key| match key {
            "ZERO_PAGE_SIZE" => Some("lots".to_string()),
            _ => None,
        });
        assert_eq!(settings.default_page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_parse_installed_credentials() {
        let json = r#"{
            "installed": {
                "client_id": "test-client-id.apps.googleusercontent.com",
                "client_secret": "test-secret"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-client-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn test_invalid_credentials_json() {
        assert!(GmailCredentials::from_json(r#"{ "other": {} }"#).is_err());
    }
}
