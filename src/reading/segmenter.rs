//! Story text segmentation.
//!
//! Splits raw generated text into blank-line-delimited page blocks, dropping
//! empty blocks, known boilerplate and fragments too short to be story
//! content. A strict pass runs first; if it leaves too few pages the raw
//! blocks are re-filtered with a deliberately more permissive fallback pass
//! (length check only), trading precision for coverage when the generator's
//! output resists the primary filter.

use log::{debug, info, warn};

use crate::utils::common::{normalize_escaped_newlines, preview};

/// Block prefixes observed in generator output that are commentary about the
/// story rather than story content. Kept as data so the segmenter stays
/// decoupled from any one upstream text generator.
const DEFAULT_BOILERPLATE_PREFIXES: &[&str] = &[
    "[The revised version includes:",
    "[The improved version has:",
    "1. More playful, bouncy rhymes",
    "2. Concrete details kids can relate to",
    "3. Active verbs (",
    "4. Simple but engaging language",
    "5. More sensory details",
    "6. Fun activities that 4-year-olds enjoy",
];

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Blocks starting with any of these are dropped by the strict pass.
    pub boilerplate_prefixes: Vec<String>,
    /// Strict pass keeps blocks longer than this many characters.
    pub strict_min_len: usize,
    /// Fallback pass keeps blocks longer than this many characters.
    pub fallback_min_len: usize,
    /// Fewer surviving blocks than this triggers the fallback pass.
    pub min_pages: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            boilerplate_prefixes: DEFAULT_BOILERPLATE_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            strict_min_len: 10,
            fallback_min_len: 20,
            min_pages: 3,
        }
    }
}

impl SegmenterConfig {
    fn is_boilerplate(&self, block: &str) -> bool {
        self.boilerplate_prefixes
            .iter()
            .any(|prefix| block.starts_with(prefix.as_str()))
    }
}

/// Split raw text into surviving page blocks, in input order.
///
/// Returns an empty `Vec` when nothing survives either pass; the caller
/// decides whether that is a terminal condition.
pub fn segment(raw_text: &str, config: &SegmenterConfig) -> Vec<String> {
    let text = normalize_escaped_newlines(raw_text);
    let raw_blocks: Vec<&str> = text.split("\n\n").collect();

    let pages = strict_filter(&raw_blocks, config);
    info!(
        "Strict filtering kept {} of {} raw sections",
        pages.len(),
        raw_blocks.len()
    );

    if pages.len() >= config.min_pages {
        return pages;
    }

    warn!(
        "Only {} pages after strict filtering, re-running with minimal filtering",
        pages.len()
    );
    let fallback = fallback_filter(&raw_blocks, config);
    info!("Minimal filtering kept {} pages", fallback.len());
    fallback
}

/// The strict pass alone, for callers that never want the fallback (e.g. the
/// simplified-story text, where losing a page is acceptable).
pub fn strict_pass(raw_text: &str, config: &SegmenterConfig) -> Vec<String> {
    let text = normalize_escaped_newlines(raw_text);
    let raw_blocks: Vec<&str> = text.split("\n\n").collect();
    strict_filter(&raw_blocks, config)
}

fn strict_filter(raw_blocks: &[&str], config: &SegmenterConfig) -> Vec<String> {
    let mut pages = Vec::new();

    for block in raw_blocks {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        if config.is_boilerplate(block) {
            info!("Skipped boilerplate section: {}", preview(block, 50));
            continue;
        }
        if block.chars().count() > config.strict_min_len {
            debug!("Kept story content: {}", preview(block, 50));
            pages.push(block.to_string());
        }
    }

    pages
}

fn fallback_filter(raw_blocks: &[&str], config: &SegmenterConfig) -> Vec<String> {
    raw_blocks
        .iter()
        .map(|block| block.trim())
        .filter(|block| !block.is_empty() && block.chars().count() > config.fallback_min_len)
        .map(|block| block.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SegmenterConfig {
        SegmenterConfig::default()
    }

    #[test]
    fn test_preserves_input_order() {
        let text = "First stanza with plenty of words here.\n\n\
                    Second stanza, also long enough to keep.\n\n\
                    Third stanza rounds out the little story.";
        let pages = segment(text, &config());
        assert_eq!(pages.len(), 3);
        assert!(pages[0].starts_with("First"));
        assert!(pages[1].starts_with("Second"));
        assert!(pages[2].starts_with("Third"));
        assert!(pages.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn test_empty_and_whitespace_inputs() {
        assert!(segment("", &config()).is_empty());
        assert!(segment("   \n\n  ", &config()).is_empty());
    }

    #[test]
    fn test_normalizes_escaped_newlines() {
        let text = "A stanza that arrived escaped, long enough.\\n\\nAnother escaped stanza, also long enough.\\n\\nAnd one more for good measure here.";
        let pages = segment(text, &config());
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn test_strict_pass_drops_boilerplate_and_short_blocks() {
        let text = "[The revised version includes: better rhymes and pacing]\n\n\
                    Esme skipped along the sandy path to the shore.\n\n\
                    tiny\n\n\
                    She waved at the gulls and laughed at the waves.\n\n\
                    Then she built a castle taller than her head.";
        let pages = segment(text, &config());
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| !p.starts_with("[The revised")));
        assert!(!pages.iter().any(|p| p == "tiny"));
    }

    #[test]
    fn test_fallback_skips_boilerplate_check() {
        // Strict pass keeps only two blocks, so the fallback re-runs and the
        // boilerplate block (longer than 20 chars) comes back.
        let text = "[The revised version includes: smoother rhythm overall]\n\n\
                    Esme found a shiny pebble down by the stream.\n\n\
                    She put it in her pocket to show her mom.";
        let pages = segment(text, &config());
        assert_eq!(pages.len(), 3);
        assert!(pages[0].starts_with("[The revised version includes:"));
    }

    #[test]
    fn test_fallback_requires_more_length() {
        // Strict keeps "a middling block" (len > 10); with fewer than three
        // pages the fallback runs and its longer threshold drops it.
        let text = "a middling block\n\nshort";
        let pages = segment(text, &config());
        assert!(pages.is_empty());
    }

    #[test]
    fn test_strict_pass_helper_never_falls_back() {
        let text = "[The improved version has: more sensory detail in it]\n\n\
                    Only one real stanza survives this pass here.";
        let pages = strict_pass(text, &config());
        assert_eq!(pages.len(), 1);
        assert!(pages[0].starts_with("Only one"));
    }
}
