// ============================================================
// Layer 3 — LabeledText Domain Type
// ============================================================
// One line of the training corpus together with its class.
//
// Labels are stored sparsely (a class index). The one-hot view
// is derived on demand, e.g. positive = [0, 1] and
// negative = [1, 0] for the binary polarity corpus.

use serde::{Deserialize, Serialize};

/// A raw, not yet tokenised, training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledText {
    /// The sentence or document text
    pub text: String,

    /// Class index in `0..num_classes`
    pub label: usize,
}

impl LabeledText {
    pub fn new(text: impl Into<String>, label: usize) -> Self {
        Self { text: text.into(), label }
    }

    /// Dense one-hot encoding of the label over `num_classes` classes.
    /// Returns `None` when the label does not fit.
    pub fn one_hot(&self, num_classes: usize) -> Option<Vec<f32>> {
        if self.label >= num_classes {
            return None;
        }
        let mut v = vec![0.0; num_classes];
        v[self.label] = 1.0;
        Some(v)
    }
}

/// Index of the largest entry of a one-hot (or score) vector.
/// Ties resolve to the smallest index; empty input gives `None`.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_positive() {
        let t = LabeledText::new("a fine film", 1);
        assert_eq!(t.one_hot(2), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_one_hot_out_of_range() {
        let t = LabeledText::new("x", 3);
        assert_eq!(t.one_hot(2), None);
    }

    #[test]
    fn test_argmax_roundtrips_one_hot() {
        let t = LabeledText::new("x", 2);
        let hot = t.one_hot(4).unwrap();
        assert_eq!(argmax(&hot), Some(2));
    }

    #[test]
    fn test_argmax_ties_and_empty() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), Some(0));
        assert_eq!(argmax(&[]), None);
    }
}
