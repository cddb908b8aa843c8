// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Programming against traits lets the application layer swap
// the corpus format without touching the training pipeline:
//   - PolarityCorpus implements CorpusSource (two text files)
//   - a future CSV or JSONL reader would implement it too
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::labeled_text::LabeledText;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce labelled training texts.
pub trait CorpusSource {
    /// Load every example from this source.
    fn load_all(&self) -> Result<Vec<LabeledText>>;

    /// Number of distinct classes the labels range over.
    fn num_classes(&self) -> usize;
}
