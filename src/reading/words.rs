//! Word classification for reading instruction.
//!
//! Words are sorted into four buckets: sight words (memorized, not decoded),
//! phonics words (decodable via basic letter-sound patterns), complex words
//! (needing extra decoding effort) and regular words (none of the above).
//! The sight-word set and the phonics patterns are immutable process-wide
//! tables; classification is a pure function of the word string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Graded sight-word lists. Aggregated into one lookup set; the grade split
/// is kept for curriculum-facing features.
pub const PRE_K_SIGHT_WORDS: &[&str] = &[
    "i", "a", "the", "to", "and", "go", "up", "me", "my", "you", "it", "in", "on", "at", "is",
];

pub const KINDERGARTEN_SIGHT_WORDS: &[&str] = &[
    "am", "an", "as", "at", "be", "by", "do", "he", "if", "in", "is", "it", "no", "of", "on",
    "or", "so", "to", "up", "we", "all", "and", "are", "but", "can", "come", "day", "did",
    "eat", "for", "get", "had", "has", "her", "him", "his", "how", "let", "may", "new", "not",
    "now", "old", "our", "out", "put", "red", "run", "said", "saw", "see", "she", "too",
    "top", "two", "was", "who", "yes", "you",
];

pub const FIRST_GRADE_SIGHT_WORDS: &[&str] = &[
    "after", "again", "any", "ask", "by", "could", "every", "fly", "from", "give", "going",
    "had", "has", "her", "him", "his", "how", "just", "know", "let", "live", "may", "of",
    "old", "once", "open", "over", "put", "round", "some", "stop", "take", "thank", "them",
    "think", "walk", "were", "when",
];

static SIGHT_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    PRE_K_SIGHT_WORDS
        .iter()
        .chain(KINDERGARTEN_SIGHT_WORDS)
        .chain(FIRST_GRADE_SIGHT_WORDS)
        .copied()
        .collect()
});

/// A recognized phonics pattern, in match-precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhonicsPattern {
    Cvc,
    Cvce,
    ConsonantBlend,
    VowelTeam,
    RControlled,
    /// Length-based fallback: 7+ letters.
    Complex,
}

static CVC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[bcdfghjklmnpqrstvwxyz][aeiou][bcdfghjklmnpqrstvwxyz]$").unwrap());
static CVCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[bcdfghjklmnpqrstvwxyz][aeiou][bcdfghjklmnpqrstvwxyz]e$").unwrap());
static CONSONANT_BLEND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(bl|br|cl|cr|dr|fl|fr|gl|gr|pl|pr|sc|sk|sl|sm|sn|sp|st|sw|tr)").unwrap()
});
static VOWEL_TEAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(ai|ay|ea|ee|ie|oa|ow|ue|ou|oi|oy)").unwrap());
static R_CONTROLLED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(ar|er|ir|or|ur)").unwrap());
static COMPLEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.{7,}$").unwrap());

static PHONICS_PATTERNS: Lazy<Vec<(PhonicsPattern, &'static Regex)>> = Lazy::new(|| {
    vec![
        (PhonicsPattern::Cvc, &*CVC_RE),
        (PhonicsPattern::Cvce, &*CVCE_RE),
        (PhonicsPattern::ConsonantBlend, &*CONSONANT_BLEND_RE),
        (PhonicsPattern::VowelTeam, &*VOWEL_TEAM_RE),
        (PhonicsPattern::RControlled, &*R_CONTROLLED_RE),
        (PhonicsPattern::Complex, &*COMPLEX_RE),
    ]
});

/// Classification of a single word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WordClass {
    SightWord,
    PhonicsWord,
    ComplexWord,
    RegularWord,
}

/// Strip punctuation and lowercase, keeping only alphanumeric characters.
pub fn clean_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// First phonics pattern matching the (already cleaned) word, if any.
pub fn phonics_pattern(clean: &str) -> Option<PhonicsPattern> {
    PHONICS_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(clean))
        .map(|(pattern, _)| *pattern)
}

/// Classify a word for reading instruction.
///
/// Sight-word membership wins over everything else; phonics patterns are
/// tried next in precedence order; short purely-alphabetic words default to
/// phonics, the rest to complex. A token with no alphanumeric content at all
/// is regular.
pub fn classify(word: &str) -> WordClass {
    let clean = clean_word(word);

    if clean.is_empty() {
        return WordClass::RegularWord;
    }

    if SIGHT_WORDS.contains(clean.as_str()) {
        return WordClass::SightWord;
    }

    match phonics_pattern(&clean) {
        Some(PhonicsPattern::Cvc | PhonicsPattern::Cvce | PhonicsPattern::ConsonantBlend) => {
            WordClass::PhonicsWord
        }
        Some(
            PhonicsPattern::VowelTeam | PhonicsPattern::RControlled | PhonicsPattern::Complex,
        ) => WordClass::ComplexWord,
        None => {
            if clean.chars().count() <= 4 && clean.chars().all(|c| c.is_ascii_alphabetic()) {
                WordClass::PhonicsWord
            } else {
                WordClass::ComplexWord
            }
        }
    }
}
