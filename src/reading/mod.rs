// Reading-analysis core
// Pure text processing: segmentation, word classification, timing
// estimation and stanza-level analysis. No I/O anywhere in this tree; all
// shared tables are immutable statics, so everything here is safe to call
// concurrently from independent requests.

pub mod analyzer;
pub mod segmenter;
pub mod timing;
pub mod words;

use serde::{Deserialize, Serialize};

pub use analyzer::{analyze, Difficulty, ReadingAnalysis};
pub use segmenter::{segment, strict_pass, SegmenterConfig};
pub use timing::{build_timeline, estimate_word, TimingPreview, WordTiming};
pub use words::{classify, WordClass};

use crate::utils::common::normalize_escaped_newlines;

/// One blank-line-delimited block of story text with its reading analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stanza {
    pub index: usize,
    pub lines: Vec<String>,
    pub reading_analysis: ReadingAnalysis,
}

/// Process a page's text into annotated stanza records.
///
/// Splits on blank lines, keeps non-empty trimmed lines and analyzes each
/// stanza for reading difficulty. Empty input yields an empty list.
pub fn process_story_text(text: &str) -> Vec<Stanza> {
    if text.is_empty() {
        return Vec::new();
    }

    let text = normalize_escaped_newlines(text);

    text.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .enumerate()
        .map(|(index, block)| {
            let lines: Vec<String> = block
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            let reading_analysis = analyzer::analyze(&lines);
            Stanza {
                index,
                lines,
                reading_analysis,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_stanzas() {
        assert!(process_story_text("").is_empty());
        assert!(process_story_text("  \n\n  ").is_empty());
    }

    #[test]
    fn test_stanzas_are_indexed_and_never_empty() {
        let stanzas = process_story_text("Esme ran fast.\n\nShe found a cave.");
        assert_eq!(stanzas.len(), 2);
        assert_eq!(stanzas[0].index, 0);
        assert_eq!(stanzas[1].index, 1);
        assert!(stanzas.iter().all(|s| !s.lines.is_empty()));
    }

    #[test]
    fn test_two_stanza_story_analysis() {
        let stanzas = process_story_text("Esme ran fast.\n\nShe found a cave.");

        let first = &stanzas[0].reading_analysis;
        assert_eq!(first.word_count, 3);
        // "ran" decodes as a CVC phonics word
        assert_eq!(classify("ran"), WordClass::PhonicsWord);
        assert!(first.phonics_words >= 1);

        let second = &stanzas[1].reading_analysis;
        assert_eq!(second.word_count, 4);
        assert_eq!(second.sight_words, 2);
        assert_eq!(second.sight_word_ratio, 50.0);
    }

    #[test]
    fn test_multiline_stanza_lines_are_trimmed() {
        let stanzas = process_story_text("  Line one here.  \n   Line two there.  ");
        assert_eq!(stanzas.len(), 1);
        assert_eq!(stanzas[0].lines, vec!["Line one here.", "Line two there."]);
    }

    #[test]
    fn test_record_serialization_shape() {
        let stanzas = process_story_text("You and me go up.");
        let json = serde_json::to_value(&stanzas[0]).unwrap();
        assert_eq!(json["index"], 0);
        assert!(json["lines"].is_array());
        let analysis = &json["reading_analysis"];
        assert_eq!(analysis["word_count"], 5);
        assert_eq!(analysis["difficulty"], "easy");
        assert_eq!(analysis["recommended_reading_mode"], "normal");
        assert!(analysis["sight_word_ratio"].is_number());
    }
}
