//! Stanza-level reading analysis.
//!
//! Aggregates word classifications over a stanza into counts, a sight-word
//! ratio and a coarse difficulty rating, which in turn picks the recommended
//! reading mode.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ReadingMode;
use crate::reading::words::{classify, WordClass};

/// A stanza whose complex-word fraction exceeds this is rated hard.
pub const HARD_COMPLEX_RATIO: f64 = 0.3;
/// A stanza whose sight-word fraction exceeds this is rated easy.
pub const EASY_SIGHT_RATIO: f64 = 0.7;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Lexical composition of a stanza. `sight_word_ratio` is a percentage
/// rounded to one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingAnalysis {
    pub word_count: usize,
    pub sight_words: usize,
    pub phonics_words: usize,
    pub complex_words: usize,
    pub sight_word_ratio: f64,
    pub difficulty: Difficulty,
    pub recommended_reading_mode: ReadingMode,
}

impl ReadingAnalysis {
    fn empty() -> Self {
        Self {
            word_count: 0,
            sight_words: 0,
            phonics_words: 0,
            complex_words: 0,
            sight_word_ratio: 0.0,
            difficulty: Difficulty::Easy,
            recommended_reading_mode: ReadingMode::Normal,
        }
    }
}

/// Lowercased word tokens of the given lines, in order.
pub fn extract_words<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .flat_map(|line| {
            WORD_RE
                .find_iter(line.as_ref())
                .map(|m| m.as_str().to_lowercase())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Analyze a stanza's lines for reading difficulty.
///
/// Regular words contribute to the total count but to none of the three
/// instruction buckets, so sight + phonics + complex never exceeds the total.
pub fn analyze<S: AsRef<str>>(lines: &[S]) -> ReadingAnalysis {
    let words = extract_words(lines);
    if words.is_empty() {
        return ReadingAnalysis::empty();
    }

    let mut sight_words = 0;
    let mut phonics_words = 0;
    let mut complex_words = 0;

    for word in &words {
        match classify(word) {
            WordClass::SightWord => sight_words += 1,
            WordClass::PhonicsWord => phonics_words += 1,
            WordClass::ComplexWord => complex_words += 1,
            WordClass::RegularWord => {}
        }
    }

    let total = words.len();
    let sight_ratio = sight_words as f64 / total as f64;
    let complex_ratio = complex_words as f64 / total as f64;

    let difficulty = if complex_ratio > HARD_COMPLEX_RATIO {
        Difficulty::Hard
    } else if sight_ratio > EASY_SIGHT_RATIO {
        Difficulty::Easy
    } else {
        Difficulty::Medium
    };

    let recommended_reading_mode = match difficulty {
        Difficulty::Easy => ReadingMode::Normal,
        Difficulty::Medium | Difficulty::Hard => ReadingMode::Learning,
    };

    ReadingAnalysis {
        word_count: total,
        sight_words,
        phonics_words,
        complex_words,
        sight_word_ratio: round_one_decimal(sight_ratio * 100.0),
        difficulty,
        recommended_reading_mode,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stanza() {
        let analysis = analyze::<&str>(&[]);
        assert_eq!(analysis.word_count, 0);
        assert_eq!(analysis.sight_word_ratio, 0.0);
        assert_eq!(analysis.difficulty, Difficulty::Easy);
        assert_eq!(analysis.recommended_reading_mode, ReadingMode::Normal);
    }

    #[test]
    fn test_counts_never_exceed_total() {
        let analysis = analyze(&["she found a cave near the big blue door"]);
        assert!(
            analysis.sight_words + analysis.phonics_words + analysis.complex_words
                <= analysis.word_count
        );
    }

    #[test]
    fn test_short_common_sentence() {
        let analysis = analyze(&["the cat sat"]);
        assert_eq!(analysis.word_count, 3);
        assert!(analysis.sight_words >= 1);
        assert_eq!(analysis.complex_words, 0);
        // One sight word out of three: below the easy threshold
        assert_eq!(analysis.difficulty, Difficulty::Medium);
        assert_eq!(analysis.recommended_reading_mode, ReadingMode::Learning);
    }

    #[test]
    fn test_all_sight_words_is_easy() {
        let analysis = analyze(&["you and me go up"]);
        assert_eq!(analysis.word_count, 5);
        assert_eq!(analysis.sight_words, 5);
        assert_eq!(analysis.sight_word_ratio, 100.0);
        assert_eq!(analysis.difficulty, Difficulty::Easy);
        assert_eq!(analysis.recommended_reading_mode, ReadingMode::Normal);
    }

    #[test]
    fn test_complex_heavy_stanza_is_hard() {
        let analysis = analyze(&["astonishing adventures throughout mysterious kingdoms"]);
        assert_eq!(analysis.word_count, 5);
        assert!(analysis.complex_words as f64 / analysis.word_count as f64 > HARD_COMPLEX_RATIO);
        assert_eq!(analysis.difficulty, Difficulty::Hard);
        assert_eq!(analysis.recommended_reading_mode, ReadingMode::Learning);
    }

    #[test]
    fn test_sight_ratio_percentage() {
        // "she" and "a" are sight words, "found" and "cave" are not
        let analysis = analyze(&["She found a cave."]);
        assert_eq!(analysis.word_count, 4);
        assert_eq!(analysis.sight_words, 2);
        assert_eq!(analysis.sight_word_ratio, 50.0);
    }

    #[test]
    fn test_analyze_is_pure() {
        let lines = ["Esme ran fast."];
        assert_eq!(analyze(&lines), analyze(&lines));
    }
}
