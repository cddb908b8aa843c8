use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::error::TrainError;
use crate::domain::labeled_text::argmax;

/// One tokenised and padded training sample.
/// Token id 0 is padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedSample {
    pub tokens: Vec<u32>,
    pub label:  usize,
}

impl EncodedSample {
    pub fn new(tokens: Vec<u32>, label: usize) -> Self {
        Self { tokens, label }
    }

    /// Build a sample from a dense one-hot label row whose width must
    /// equal the configured class count.
    pub fn from_one_hot(tokens: Vec<u32>, one_hot: &[f32], cls_num: usize) -> Result<Self, TrainError> {
        if one_hot.len() != cls_num {
            return Err(TrainError::config(format!(
                "label width {} does not match cls_num {}",
                one_hot.len(),
                cls_num
            )));
        }
        let label = argmax(one_hot)
            .ok_or_else(|| TrainError::config("empty label vector"))?;
        Ok(Self { tokens, label })
    }
}

/// An in-memory split (train or dev) of equal-length samples.
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    samples:         Vec<EncodedSample>,
    sequence_length: usize,
    num_classes:     usize,
}

impl SequenceDataset {
    /// Every sample must have exactly `sequence_length` tokens and a
    /// label below `num_classes`.
    pub fn new(
        samples:         Vec<EncodedSample>,
        sequence_length: usize,
        num_classes:     usize,
    ) -> Result<Self, TrainError> {
        for s in &samples {
            if s.tokens.len() != sequence_length {
                return Err(TrainError::ShapeMismatch {
                    what:     "sample sequence length",
                    expected: sequence_length,
                    found:    s.tokens.len(),
                });
            }
            if s.label >= num_classes {
                return Err(TrainError::config(format!(
                    "label {} out of range for {} classes",
                    s.label, num_classes
                )));
            }
        }
        Ok(Self { samples, sequence_length, num_classes })
    }

    pub fn sequence_length(&self) -> usize { self.sequence_length }

    pub fn num_classes(&self) -> usize { self.num_classes }

    pub fn samples(&self) -> &[EncodedSample] { &self.samples }

    /// Clone the samples at `indices` in order; out-of-range indices are skipped.
    pub fn gather(&self, indices: &[usize]) -> Vec<EncodedSample> {
        indices.iter().filter_map(|&i| self.samples.get(i).cloned()).collect()
    }

    /// Number of samples per class, indexed by class.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes];
        for s in &self.samples {
            counts[s.label] += 1;
        }
        counts
    }
}

impl Dataset<EncodedSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<EncodedSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
