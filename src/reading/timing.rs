//! Word-timing estimation.
//!
//! Predicts how long each word should stay highlighted while narration
//! plays. Per-word durations come from the mode's base/per-character
//! configuration, adjusted by word class and trailing punctuation, then
//! clamped into the mode's bounds. A whole-text variant lays the words out
//! on a cumulative timeline for client-side highlighting.

use serde::{Deserialize, Serialize};

use crate::config::{ReadingMode, ReadingModeConfig, ReadingSpeedSettings, TimingProfile};
use crate::reading::words::{classify, clean_word, WordClass};

/// Sight words are read faster than their length suggests.
pub const SIGHT_WORD_FACTOR: f64 = 0.7;

const SENTENCE_END_PUNCTUATION: [char; 3] = ['.', '!', '?'];
const CLAUSE_PUNCTUATION: [char; 3] = [',', ':', ';'];

/// The kind of pause a word's trailing punctuation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunctuationPause {
    SentenceEnd,
    Clause,
}

/// Inspect the token's trailing punctuation (anything after the last
/// alphanumeric character). The closest recognized mark wins.
pub fn trailing_punctuation(word: &str) -> Option<PunctuationPause> {
    for c in word.chars().rev() {
        if c.is_alphanumeric() {
            return None;
        }
        if SENTENCE_END_PUNCTUATION.contains(&c) {
            return Some(PunctuationPause::SentenceEnd);
        }
        if CLAUSE_PUNCTUATION.contains(&c) {
            return Some(PunctuationPause::Clause);
        }
    }
    None
}

/// Estimate the display duration of a single word, in milliseconds.
pub fn estimate_word(word: &str, config: &ReadingModeConfig, profile: &TimingProfile) -> u64 {
    let clean = clean_word(word);
    let mut duration =
        config.base_duration_ms + clean.chars().count() as u64 * config.char_duration_ms;

    match classify(word) {
        WordClass::SightWord => duration = (duration as f64 * SIGHT_WORD_FACTOR) as u64,
        WordClass::ComplexWord => duration += profile.complexity_bonus_ms,
        WordClass::PhonicsWord | WordClass::RegularWord => {}
    }

    match trailing_punctuation(word) {
        Some(PunctuationPause::SentenceEnd) => duration += profile.sentence_pause_ms,
        Some(PunctuationPause::Clause) => duration += profile.clause_pause_ms,
        None => {}
    }

    duration.clamp(profile.min_word_ms, profile.max_word_ms)
}

/// One word on the highlighting timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub end_ms: u64,
    pub word_type: WordClass,
    pub has_punctuation: bool,
    pub sentence_end: bool,
}

/// Timing analysis for a block of text, ready for JSON serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingPreview {
    pub reading_mode: ReadingMode,
    pub speaking_rate: f32,
    pub playback_rate: f32,
    pub word_count: usize,
    pub total_duration_ms: u64,
    pub words: Vec<WordTiming>,
}

/// Lay the text's words out on a cumulative timeline.
///
/// Words are separated by the mode's inter-word gap; the total duration is
/// the end offset of the last word. Unknown mode names fall back to normal.
pub fn build_timeline(
    text: &str,
    reading_mode: &str,
    settings: &ReadingSpeedSettings,
) -> TimingPreview {
    let (mode, config) = settings.mode(reading_mode);
    let profile = TimingProfile::for_mode(mode);

    let mut words = Vec::new();
    let mut cursor: u64 = 0;

    for token in text.split_whitespace() {
        if !words.is_empty() {
            cursor += profile.inter_word_gap_ms;
        }

        let duration = estimate_word(token, config, profile);
        let punctuation = trailing_punctuation(token);

        words.push(WordTiming {
            word: token.to_string(),
            start_ms: cursor,
            duration_ms: duration,
            end_ms: cursor + duration,
            word_type: classify(token),
            has_punctuation: punctuation.is_some(),
            sentence_end: punctuation == Some(PunctuationPause::SentenceEnd),
        });

        cursor += duration;
    }

    TimingPreview {
        reading_mode: mode,
        speaking_rate: config.speaking_rate,
        playback_rate: config.playback_rate,
        word_count: words.len(),
        total_duration_ms: cursor,
        words,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ReadingSpeedSettings {
        ReadingSpeedSettings::default()
    }

    fn estimate(word: &str, mode: ReadingMode) -> u64 {
        let s = settings();
        estimate_word(word, s.config_for(mode), TimingProfile::for_mode(mode))
    }

    #[test]
    fn test_learning_mode_is_always_slower() {
        for word in ["cat", "the", "astonishing", "fast.", "a"] {
            assert!(
                estimate(word, ReadingMode::Learning) > estimate(word, ReadingMode::Normal),
                "learning should be slower for {:?}",
                word
            );
        }
    }

    #[test]
    fn test_sight_words_are_faster_than_phonics_peers() {
        // Same length, same mode; "see" is a sight word, "sat" is not
        assert!(estimate("see", ReadingMode::Normal) < estimate("sat", ReadingMode::Normal));
    }

    #[test]
    fn test_complex_words_get_a_bonus() {
        let s = settings();
        let config = s.config_for(ReadingMode::Normal);
        let profile = TimingProfile::for_mode(ReadingMode::Normal);
        // "mist" (phonics default) vs a complex word of equal length
        let base = config.base_duration_ms + 4 * config.char_duration_ms;
        assert_eq!(estimate_word("mist", config, profile), base);
        // "dear" hits the vowel-team pattern
        assert_eq!(
            estimate_word("dear", config, profile),
            base + profile.complexity_bonus_ms
        );
    }

    #[test]
    fn test_punctuation_pauses() {
        assert_eq!(
            trailing_punctuation("fast."),
            Some(PunctuationPause::SentenceEnd)
        );
        assert_eq!(trailing_punctuation("fast,"), Some(PunctuationPause::Clause));
        assert_eq!(trailing_punctuation("fast\""), None);
        assert_eq!(
            trailing_punctuation("fast.\""),
            Some(PunctuationPause::SentenceEnd)
        );
        assert_eq!(trailing_punctuation("fast"), None);

        assert!(estimate("fast.", ReadingMode::Normal) > estimate("fast", ReadingMode::Normal));
        assert!(estimate("fast.", ReadingMode::Normal) > estimate("fast,", ReadingMode::Normal));
    }

    #[test]
    fn test_durations_are_clamped() {
        let s = settings();
        let profile = TimingProfile::for_mode(ReadingMode::Normal);
        let long_word = "extraordinarily";
        let duration = estimate_word(long_word, s.config_for(ReadingMode::Normal), profile);
        assert!(duration <= profile.max_word_ms);

        // "a" is a sight word; scaled down but never below the floor
        let short = estimate_word("a", s.config_for(ReadingMode::Normal), profile);
        assert!(short >= profile.min_word_ms);
    }

    #[test]
    fn test_timeline_offsets_accumulate() {
        let preview = build_timeline("Esme ran fast.", "normal", &settings());
        assert_eq!(preview.word_count, 3);
        assert_eq!(preview.reading_mode, ReadingMode::Normal);

        for pair in preview.words.windows(2) {
            assert!(pair[1].start_ms > pair[0].start_ms);
            assert!(pair[1].start_ms >= pair[0].end_ms);
        }
        for timing in &preview.words {
            assert_eq!(timing.end_ms, timing.start_ms + timing.duration_ms);
        }
        assert_eq!(
            preview.total_duration_ms,
            preview.words.last().unwrap().end_ms
        );
        assert!(preview.words[2].sentence_end);
    }

    #[test]
    fn test_timeline_learning_total_exceeds_normal() {
        let text = "She found a cave.";
        let normal = build_timeline(text, "normal", &settings());
        let learning = build_timeline(text, "learning", &settings());
        assert!(learning.total_duration_ms > normal.total_duration_ms);
    }

    #[test]
    fn test_empty_text_timeline() {
        let preview = build_timeline("", "normal", &settings());
        assert_eq!(preview.word_count, 0);
        assert_eq!(preview.total_duration_ms, 0);
        assert!(preview.words.is_empty());
    }
}
