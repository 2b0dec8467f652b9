//! Affect lexicon for interview speech.

/// Word valences on a `[-4.0, 4.0]` scale. Keys are lowercase single words.
pub(crate) const AFFECT_LEXICON: &[(&str, f64)] = &[
    // Positive
    ("love", 3.2),
    ("loved", 2.9),
    ("happy", 2.7),
    ("joy", 2.8),
    ("excited", 2.2),
    ("amazing", 2.8),
    ("wonderful", 2.7),
    ("great", 3.1),
    ("good", 1.9),
    ("better", 1.9),
    ("best", 3.2),
    ("hope", 1.9),
    ("hopeful", 2.3),
    ("proud", 2.1),
    ("grateful", 2.0),
    ("thankful", 2.0),
    ("blessed", 2.3),
    ("inspired", 2.2),
    ("inspire", 2.0),
    ("confident", 2.2),
    ("strong", 2.3),
    ("stronger", 2.2),
    ("success", 2.7),
    ("succeed", 2.2),
    ("achieve", 1.8),
    ("accomplished", 1.9),
    ("win", 2.8),
    ("won", 2.7),
    ("growth", 1.6),
    ("grow", 1.5),
    ("learned", 1.3),
    ("overcome", 1.7),
    ("brave", 2.4),
    ("courage", 2.2),
    ("determined", 1.9),
    ("passion", 2.0),
    ("purpose", 1.7),
    ("free", 2.3),
    ("peace", 2.5),
    ("calm", 1.3),
    ("fun", 2.3),
    ("beautiful", 2.9),
    ("support", 1.7),
    ("kind", 2.4),
    ("trust", 2.3),
    ("meaningful", 1.9),
    ("thrive", 2.2),
    ("recover", 1.2),
    ("resilient", 2.0),
    // Negative
    ("hate", -2.7),
    ("sad", -2.1),
    ("angry", -2.3),
    ("afraid", -2.2),
    ("fear", -2.2),
    ("scared", -2.2),
    ("worried", -1.9),
    ("anxious", -1.9),
    ("stress", -1.8),
    ("stressed", -2.0),
    ("overwhelmed", -2.1),
    ("burnout", -2.0),
    ("lonely", -2.0),
    ("lost", -1.3),
    ("hurt", -2.4),
    ("pain", -2.3),
    ("painful", -2.4),
    ("hard", -0.4),
    ("difficult", -1.5),
    ("struggle", -1.6),
    ("struggled", -1.6),
    ("fail", -2.5),
    ("failed", -2.3),
    ("failure", -2.3),
    ("quit", -1.1),
    ("setback", -1.6),
    ("setbacks", -1.6),
    ("doubt", -1.5),
    ("doubted", -1.5),
    ("insecure", -1.8),
    ("terrible", -2.5),
    ("awful", -2.4),
    ("bad", -2.5),
    ("worst", -3.1),
    ("broke", -1.8),
    ("crisis", -3.1),
    ("wrong", -2.1),
    ("ashamed", -2.1),
    ("guilty", -1.8),
    ("tired", -1.9),
    ("exhausted", -1.9),
    ("problem", -1.7),
];

/// Words that flip the valence of the word that follows them.
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "don't", "didn't", "wasn't", "isn't", "can't", "won't",
    "couldn't", "wouldn't", "nobody", "without",
];

/// Dampening applied to a negated valence.
const NEGATION_SCALAR: f64 = -0.74;

/// Normalization constant for the compound score.
const COMPOUND_ALPHA: f64 = 15.0;

/// Polarity summary of a span of text.
///
/// `compound` is in `[-1, 1]`; `positive`, `negative`, and `neutral` are
/// proportions that sum to `1` for non-empty text.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Affect {
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl Affect {
    /// `positive + negative`: how emotionally charged the text is regardless
    /// of direction.
    #[must_use]
    pub fn intensity(&self) -> f64 {
        self.positive + self.negative
    }
}

/// Lowercase words with surrounding punctuation removed. Inner apostrophes
/// survive so contractions such as `don't` stay one token.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .replace('’', "'")
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn valence(word: &str) -> Option<f64> {
    AFFECT_LEXICON
        .iter()
        .find(|(lex_word, _)| *lex_word == word)
        .map(|&(_, v)| v)
}

/// Score `text` against [`AFFECT_LEXICON`]. Returns the zero value for text
/// with no tokens.
#[must_use]
pub fn affect(text: &str) -> Affect {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Affect::default();
    }

    let mut sum = 0.0_f64;
    let mut pos_sum = 0.0_f64;
    let mut neg_sum = 0.0_f64;
    let mut neutral_count = 0.0_f64;

    for (i, token) in tokens.iter().enumerate() {
        let Some(mut v) = valence(token) else {
            neutral_count += 1.0;
            continue;
        };
        if i > 0 && NEGATIONS.contains(&tokens[i - 1].as_str()) {
            v *= NEGATION_SCALAR;
        }
        sum += v;
        if v > 0.0 {
            pos_sum += v + 1.0;
        } else if v < 0.0 {
            neg_sum += v - 1.0;
        } else {
            neutral_count += 1.0;
        }
    }

    let compound = sum / (sum * sum + COMPOUND_ALPHA).sqrt();
    let total = pos_sum + neg_sum.abs() + neutral_count;

    Affect {
        compound: compound.clamp(-1.0, 1.0),
        positive: pos_sum / total,
        negative: neg_sum.abs() / total,
        neutral: neutral_count / total,
    }
}
