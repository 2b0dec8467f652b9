//! Small text utilities shared by the capabilities.

use std::collections::HashSet;

pub(crate) use styleprof_scoring::tokenize;

/// Common English words ignored when looking for recurring concepts.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "always", "because", "before", "being", "could", "doing", "every",
    "going", "gonna", "great", "honestly", "into", "just", "know", "like", "little", "maybe",
    "really", "right", "should", "something", "still", "their", "there", "these", "thing",
    "things", "think", "those", "through", "want", "wanted", "where", "which", "while", "would",
    "years", "yourself", "actually", "started", "people",
];

/// Non-empty lines of the transcript. Each line is one chunk's speech.
pub(crate) fn segments(transcript: &str) -> Vec<&str> {
    transcript
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Sentences split on terminal punctuation.
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .collect()
}

pub(crate) fn word_set(tokens: &[String]) -> HashSet<&str> {
    tokens.iter().map(String::as_str).collect()
}

pub(crate) fn contains_any(words: &HashSet<&str>, indicators: &[&str]) -> bool {
    indicators.iter().any(|w| words.contains(w))
}

/// Words worth reporting as a concept: long enough and not filler.
pub(crate) fn is_content_word(word: &str) -> bool {
    word.len() >= 5 && word.chars().all(char::is_alphabetic) && !STOPWORDS.contains(&word)
}
