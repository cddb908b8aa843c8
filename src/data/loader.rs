// ============================================================
// Layer 4 — Polarity Corpus Loader
// ============================================================
// Reads a binary sentiment corpus stored as two plain-text
// files with one example per line:
//
//   rt-polarity.pos   → class 1, one-hot [0, 1]
//   rt-polarity.neg   → class 0, one-hot [1, 0]
//
// The original review dumps are not valid UTF-8 everywhere,
// so bytes are decoded lossily instead of failing the run.
// Blank lines are skipped.
//
// Reference: Pang & Lee (2005) sentence polarity dataset v1.0
//            Rust Book §12 (Reading a File)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::labeled_text::LabeledText;
use crate::domain::traits::CorpusSource;

/// Class index assigned to lines of the negative file
pub const NEGATIVE: usize = 0;
/// Class index assigned to lines of the positive file
pub const POSITIVE: usize = 1;

/// Loads positive and negative example files.
/// Implements the CorpusSource trait from Layer 3.
pub struct PolarityCorpus {
    positive: PathBuf,
    negative: PathBuf,
}

impl PolarityCorpus {
    pub fn new(positive: impl Into<PathBuf>, negative: impl Into<PathBuf>) -> Self {
        Self { positive: positive.into(), negative: negative.into() }
    }
}

impl CorpusSource for PolarityCorpus {
    fn load_all(&self) -> Result<Vec<LabeledText>> {
        let mut examples = read_lines(&self.positive, POSITIVE)?;
        let positives    = examples.len();
        examples.extend(read_lines(&self.negative, NEGATIVE)?);

        tracing::info!(
            "Loaded {} examples ({} positive, {} negative)",
            examples.len(),
            positives,
            examples.len() - positives,
        );
        Ok(examples)
    }

    fn num_classes(&self) -> usize {
        2
    }
}

/// Read every non-blank line of `path` as an example of class `label`.
fn read_lines(path: &Path, label: usize) -> Result<Vec<LabeledText>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    let examples: Vec<LabeledText> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| LabeledText::new(line, label))
        .collect();

    tracing::debug!("Read {} lines from '{}'", examples.len(), path.display());
    Ok(examples)
}
