// Copyright 2025 Docdex Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tokenization shared by the indexer and the query parser.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

/// High-frequency English words that add no search value.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "if",
        "in", "into", "is", "it", "its", "no", "not", "of", "on", "or", "such", "that", "the",
        "their", "then", "there", "these", "they", "this", "to", "was", "which", "will", "with",
    ]
    .into_iter()
    .collect()
});

static STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

static TERM_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\p{P}\p{S}]").unwrap());

/// A term separator is any code point that is whitespace, punctuation, or a
/// symbol. Marks and control characters are part of their token.
pub fn is_term_sep(c: char) -> bool {
    TERM_SEP.is_match(c.encode_utf8(&mut [0u8; 4]))
}

/// Stem a single lowercased token.
pub fn stem(s: &str) -> String {
    STEMMER.stem(s).into_owned()
}

pub fn is_stop_word(s: &str) -> bool {
    STOP_WORDS.contains(s)
}

/// Parse free text into search terms: lowercase, split on separators, drop
/// stop words, stem the rest. An empty result means the query matches
/// nothing, not everything.
pub fn parse_query(q: &str) -> Vec<String> {
    let q = q.to_lowercase();
    q.split(is_term_sep)
        .filter(|s| !s.is_empty() && !is_stop_word(s))
        .map(stem)
        .collect()
}

/// The first two code points of `s`, or empty when `s` is shorter. Emitted
/// as a `suggest:` term for prefix completion over package base names.
pub fn suggest_prefix(s: &str) -> &str {
    let mut count = 0;
    for (i, c) in s.char_indices() {
        count += 1;
        if count == 2 {
            return &s[..i + c.len_utf8()];
        }
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_lowers_filters_and_stems() {
        assert_eq!(parse_query("Byte Slices"), vec!["byte", "slice"]);
        assert_eq!(parse_query("the client for HTTP"), vec!["client", "http"]);
        // punctuation and symbols separate tokens
        assert_eq!(parse_query("foo/bar_baz"), vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn parse_query_empty_yields_no_terms() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("the of and").is_empty());
        assert!(parse_query("  ...  ").is_empty());
    }

    #[test]
    fn separators_follow_unicode_classes() {
        // whitespace, punctuation and symbols all separate
        assert!(is_term_sep(' '));
        assert!(is_term_sep('\t'));
        assert!(is_term_sep('_'));
        assert!(is_term_sep('+'));
        assert!(is_term_sep('€'));
        // letters, digits, combining marks and controls do not
        assert!(!is_term_sep('a'));
        assert!(!is_term_sep('7'));
        assert!(!is_term_sep('\u{0301}'));
        assert!(!is_term_sep('\u{0007}'));
        // a combining mark stays inside its token
        assert_eq!(parse_query("cafe\u{0301} beans").len(), 2);
    }

    #[test]
    fn stemming_collapses_plurals() {
        assert_eq!(stem("connections"), stem("connection"));
        assert_eq!(stem("parsing"), stem("parse"));
    }

    #[test]
    fn suggest_prefix_takes_two_code_points() {
        assert_eq!(suggest_prefix("bytes"), "by");
        assert_eq!(suggest_prefix("go"), "go");
        assert_eq!(suggest_prefix("x"), "");
        assert_eq!(suggest_prefix(""), "");
        // multi-byte code points count as one
        assert_eq!(suggest_prefix("héllo"), "hé");
    }
}
