// Configuration module
// Centralized management of application configuration

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod reading;

pub use reading::{ReadingMode, ReadingModeConfig, ReadingSpeedSettings, TimingProfile};

/// Default description of the star character, used when the caller does not
/// supply one. Matches the uploaded reference photo.
pub const DEFAULT_CHARACTER_DESCRIPTION: &str =
    "4 years old, curly brown hair, light skin, blue-green eyes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub claude_api_key: Option<String>,
    pub stability_api_key: Option<String>,
    pub eleven_labs_api_key: Option<String>,
    pub images_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub temp_stories_dir: PathBuf,
    pub db_path: PathBuf,
    pub reference_photo: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            claude_api_key: None,
            stability_api_key: None,
            eleven_labs_api_key: None,
            images_dir: PathBuf::from("static/images"),
            videos_dir: PathBuf::from("static/videos"),
            temp_stories_dir: PathBuf::from("temp_stories"),
            db_path: PathBuf::from("stories.db"),
            reference_photo: PathBuf::from("static/images/esme_reference.jpg"),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// everything except the API keys (which have no sensible default).
    pub fn from_env() -> Self {
        Self {
            claude_api_key: env_key("CLAUDE_API_KEY"),
            stability_api_key: env_key("STABILITY_API_KEY"),
            eleven_labs_api_key: env_key("ELEVEN_LABS_API_KEY"),
            ..Self::default()
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("stories.db"));
        assert_eq!(config.images_dir, PathBuf::from("static/images"));
        assert!(config.claude_api_key.is_none());
    }
}
