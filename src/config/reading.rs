//! Reading-speed configuration.
//!
//! Two named modes drive every timing decision in the app: `normal` for
//! fluent read-aloud playback and `learning` for the slower learn-to-read
//! experience. The numbers here are empirical tuning values; they are kept
//! as named configuration so they can be recalibrated without code changes.

use log::warn;
use serde::{Deserialize, Serialize};

/// A named reading mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingMode {
    Normal,
    Learning,
}

impl ReadingMode {
    /// Resolve a mode name. Unrecognized names fall back to `normal`
    /// rather than failing.
    pub fn from_name(name: &str) -> Self {
        match name {
            "normal" => ReadingMode::Normal,
            "learning" => ReadingMode::Learning,
            other => {
                warn!("Unknown reading mode '{}', falling back to 'normal'", other);
                ReadingMode::Normal
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingMode::Normal => "normal",
            ReadingMode::Learning => "learning",
        }
    }
}

/// Per-mode speed configuration: how long a word is held on screen and how
/// fast the narration is asked to speak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingModeConfig {
    /// Base display duration per word, in milliseconds.
    pub base_duration_ms: u64,
    /// Additional display duration per character, in milliseconds.
    pub char_duration_ms: u64,
    /// Speaking-rate multiplier passed to the speech provider.
    pub speaking_rate: f32,
    /// Playback-rate multiplier applied client-side.
    pub playback_rate: f32,
}

/// The full reading-speed table. Constructed once at startup and read-only
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingSpeedSettings {
    pub normal: ReadingModeConfig,
    pub learning: ReadingModeConfig,
}

impl Default for ReadingSpeedSettings {
    fn default() -> Self {
        Self {
            normal: ReadingModeConfig {
                base_duration_ms: 180,
                char_duration_ms: 60,
                speaking_rate: 1.0,
                playback_rate: 1.0,
            },
            learning: ReadingModeConfig {
                base_duration_ms: 600,
                char_duration_ms: 150,
                speaking_rate: 0.7,
                playback_rate: 0.6,
            },
        }
    }
}

impl ReadingSpeedSettings {
    pub fn config_for(&self, mode: ReadingMode) -> &ReadingModeConfig {
        match mode {
            ReadingMode::Normal => &self.normal,
            ReadingMode::Learning => &self.learning,
        }
    }

    /// Look up a mode by name, falling back to `normal` for unknown names.
    pub fn mode(&self, name: &str) -> (ReadingMode, &ReadingModeConfig) {
        let mode = ReadingMode::from_name(name);
        (mode, self.config_for(mode))
    }
}

/// Per-mode timing tuning beyond the base/char durations: pauses, bonuses
/// and clamp bounds for the word-timing estimator.
#[derive(Debug, Clone)]
pub struct TimingProfile {
    /// Extra time granted to complex words.
    pub complexity_bonus_ms: u64,
    /// Pause after sentence-terminal punctuation (`.` `!` `?`).
    pub sentence_pause_ms: u64,
    /// Pause after clause punctuation (`,` `:` `;`).
    pub clause_pause_ms: u64,
    /// Gap inserted between consecutive words in a timeline.
    pub inter_word_gap_ms: u64,
    /// Lower clamp for a single word's duration.
    pub min_word_ms: u64,
    /// Upper clamp for a single word's duration.
    pub max_word_ms: u64,
}

const NORMAL_TIMING: TimingProfile = TimingProfile {
    complexity_bonus_ms: 100,
    sentence_pause_ms: 100,
    clause_pause_ms: 50,
    inter_word_gap_ms: 50,
    min_word_ms: 200,
    max_word_ms: 1000,
};

const LEARNING_TIMING: TimingProfile = TimingProfile {
    complexity_bonus_ms: 300,
    sentence_pause_ms: 200,
    clause_pause_ms: 100,
    inter_word_gap_ms: 150,
    min_word_ms: 400,
    max_word_ms: 2000,
};

impl TimingProfile {
    pub fn for_mode(mode: ReadingMode) -> &'static TimingProfile {
        match mode {
            ReadingMode::Normal => &NORMAL_TIMING,
            ReadingMode::Learning => &LEARNING_TIMING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_mode_falls_back_to_normal() {
        let settings = ReadingSpeedSettings::default();
        let (mode, config) = settings.mode("turbo");
        assert_eq!(mode, ReadingMode::Normal);
        assert_eq!(config.base_duration_ms, settings.normal.base_duration_ms);
    }

    #[test]
    fn test_learning_mode_is_slower() {
        let settings = ReadingSpeedSettings::default();
        assert!(settings.learning.base_duration_ms > settings.normal.base_duration_ms);
        assert!(settings.learning.char_duration_ms > settings.normal.char_duration_ms);
        assert!(settings.learning.speaking_rate < settings.normal.speaking_rate);

        let learning = TimingProfile::for_mode(ReadingMode::Learning);
        let normal = TimingProfile::for_mode(ReadingMode::Normal);
        assert!(learning.min_word_ms > normal.min_word_ms);
        assert!(learning.max_word_ms > normal.max_word_ms);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&ReadingMode::Learning).unwrap(),
            "\"learning\""
        );
        assert_eq!(ReadingMode::from_name("learning"), ReadingMode::Learning);
    }
}
