// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises one corpus line before it reaches the vocabulary.
//
// Movie-review polarity lines arrive as raw sentences with
// glued punctuation ("it's great, isn't it?"). A word-level
// vocabulary should see "it 's great , is n't it ?" instead,
// otherwise "great," and "great" become two different words.
//
// Cleaning steps (applied in order):
//   1. Map characters outside [A-Za-z0-9(),!?'`] to a space
//   2. Split English contractions ('s 've n't 're 'd 'll)
//   3. Pad , ! ( ) ? with spaces so they become own tokens
//   4. Collapse runs of whitespace, trim, lowercase
//
// Reference: Kim (2014) Convolutional Neural Networks for
//            Sentence Classification (data preparation)

/// Contraction suffixes that become separate tokens.
const CONTRACTIONS: [&str; 6] = ["n't", "'ve", "'re", "'ll", "'s", "'d"];

pub struct Preprocessor;

impl Preprocessor {
    /// Create a new Preprocessor instance
    pub fn new() -> Self {
        Self
    }

    /// Clean a raw sentence for downstream tokenisation.
    pub fn clean(&self, text: &str) -> String {
        // ── Step 1: Keep only the allowed character set ──────────────────────
        let step1: String = text
            .chars()
            .map(|c| match c {
                c if c.is_ascii_alphanumeric() => c,
                '(' | ')' | ',' | '!' | '?' | '\'' | '`' => c,
                _ => ' ',
            })
            .collect();

        // ── Steps 2 + 3: Split words into tokens ─────────────────────────────
        let mut tokens: Vec<String> = Vec::new();
        for word in step1.split_whitespace() {
            split_word(word, &mut tokens);
        }

        // ── Step 4: Join with single spaces, lowercase ───────────────────────
        tokens.join(" ").to_lowercase()
    }
}

/// Split one whitespace-free word into punctuation, stem and
/// contraction tokens, appending them to `out`.
fn split_word(word: &str, out: &mut Vec<String>) {
    let mut current = String::new();
    for c in word.chars() {
        if matches!(c, ',' | '!' | '(' | ')' | '?') {
            push_with_contraction(&current, out);
            current.clear();
            out.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    push_with_contraction(&current, out);
}

fn push_with_contraction(word: &str, out: &mut Vec<String>) {
    if word.is_empty() {
        return;
    }
    let lower = word.to_ascii_lowercase();
    for suffix in CONTRACTIONS {
        if lower.len() > suffix.len() && lower.ends_with(suffix) {
            let cut = word.len() - suffix.len();
            out.push(word[..cut].to_string());
            out.push(word[cut..].to_string());
            return;
        }
    }
    out.push(word.to_string());
}

/// Implement Default so Preprocessor can be created with Preprocessor::default()
impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello   world"), "hello world");
    }

    #[test]
    fn test_trims_edges_and_lowercases() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  Hello World  "), "hello world");
    }

    #[test]
    fn test_splits_punctuation() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("great, really!"), "great , really !");
        assert_eq!(p.clean("(sort of)"), "( sort of )");
    }

    #[test]
    fn test_splits_contractions() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("it's not what we've seen"), "it 's not what we 've seen");
        assert_eq!(p.clean("Isn't it?"), "is n't it ?");
    }

    #[test]
    fn test_drops_disallowed_characters() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("a -- b ; c"), "a b c");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
    }
}
