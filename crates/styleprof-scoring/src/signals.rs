//! Keyword signals for relatability and theme tagging.

use std::collections::{BTreeSet, HashSet};

/// Indicator groups for relatability. Each group present in a chunk adds
/// [`RELATABILITY_STEP`] to its score.
pub(crate) const RELATABILITY_GROUPS: &[(&str, &[&str])] = &[
    ("personal", &["i", "me", "my", "mine", "myself"]),
    ("universal", &["everyone", "all", "we", "you"]),
    ("emotional", &["feel", "felt", "emotion", "experience"]),
    ("story", &["when", "happened", "time", "example"]),
    ("resolution", &["learned", "realized", "understood", "discovered"]),
];

pub(crate) const RELATABILITY_STEP: f64 = 0.2;

/// Theme categories and the words that tag a chunk with them.
pub(crate) const THEME_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "inspiration",
        &["inspire", "inspired", "motivate", "encourage", "possible", "dream"],
    ),
    (
        "insight",
        &["realize", "realized", "understand", "learn", "discover", "clarity"],
    ),
    (
        "expertise",
        &["know", "expert", "experience", "professional", "skill"],
    ),
    ("story", &["happened", "time", "when", "story", "example"]),
    (
        "advice",
        &["should", "recommend", "suggest", "advice", "tip"],
    ),
    (
        "reflection",
        &["think", "feel", "believe", "sense", "perspective"],
    ),
    ("action", &["do", "take", "start", "begin", "act"]),
    (
        "challenge",
        &["difficult", "challenge", "hard", "obstacle", "tough", "setback", "setbacks"],
    ),
    (
        "success",
        &["achieve", "accomplish", "succeed", "win", "goal"],
    ),
    (
        "growth",
        &["grow", "develop", "improve", "progress", "better", "stronger"],
    ),
    (
        "resilience",
        &[
            "persist", "persevere", "endure", "resilient", "bounce", "recover", "refused",
            "kept", "overcome", "stronger",
        ],
    ),
    (
        "self_doubt",
        &[
            "doubt", "doubted", "doubts", "unsure", "insecure", "imposter", "inadequate",
            "unworthy",
        ],
    ),
];

/// Relatability in `[0, 1]`: one step per indicator group present.
#[must_use]
pub fn relatability(words: &HashSet<&str>) -> f64 {
    let groups = RELATABILITY_GROUPS
        .iter()
        .filter(|(_, indicators)| indicators.iter().any(|w| words.contains(w)))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let score = groups as f64 * RELATABILITY_STEP;
    score.min(1.0)
}

/// Every theme category with at least one indicator present.
#[must_use]
pub fn theme_tags(words: &HashSet<&str>) -> BTreeSet<String> {
    THEME_CATEGORIES
        .iter()
        .filter(|(_, indicators)| indicators.iter().any(|w| words.contains(w)))
        .map(|(name, _)| (*name).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        crate::lexicon::tokenize(text)
    }

    fn set(tokens: &[String]) -> HashSet<&str> {
        tokens.iter().map(String::as_str).collect()
    }

    #[test]
    fn relatability_counts_groups_not_words() {
        let tokens = words("I me my mine myself");
        assert!((relatability(&set(&tokens)) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn relatability_caps_at_one() {
        let tokens = words("When I felt lost, we all learned something");
        assert!((relatability(&set(&tokens)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_indicators_gives_zero() {
        let tokens = words("Quarterly revenue rose");
        assert!(relatability(&set(&tokens)).abs() < f64::EPSILON);
        assert!(theme_tags(&set(&tokens)).is_empty());
    }

    #[test]
    fn resilience_and_self_doubt_are_tagged() {
        let tokens = words("I kept going because I refused to quit");
        assert!(theme_tags(&set(&tokens)).contains("resilience"));

        let tokens = words("Some days I doubt whether I'm good enough");
        assert!(theme_tags(&set(&tokens)).contains("self_doubt"));
    }

    #[test]
    fn category_names_are_unique() {
        let names: HashSet<&str> = THEME_CATEGORIES.iter().map(|(n, _)| *n).collect();
        assert_eq!(names.len(), THEME_CATEGORIES.len());
    }
}
