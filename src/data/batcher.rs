// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Two jobs:
//
//   EpochBatches    — decides WHICH samples form each batch:
//                     indices are reshuffled at the start of
//                     every epoch and cut into batch_size
//                     chunks; the last chunk of an epoch may
//                     be shorter.
//
//   SequenceBatcher — turns those samples into tensors:
//                     Input:  N samples, each with T token ids
//                     Output: tokens [N, T] (Int), labels [N] (Int)
//
// All sequences are padded upstream, so stacking is a flatten
// followed by a reshape. A ragged batch is reported as a
// ShapeMismatch error instead of panicking inside reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::prelude::*;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::dataset::EncodedSample;
use crate::domain::error::TrainError;

// ─── SequenceBatch ────────────────────────────────────────────────────────────
/// A batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Token ids, shape [batch_size, seq_len]
    pub tokens: Tensor<B, 2, Int>,

    /// Sparse class labels, shape [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> SequenceBatch<B> {
    pub fn size(&self) -> usize {
        self.tokens.dims()[0]
    }
}

// ─── SequenceBatcher ──────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack `items` into a single batch. Every sample must have
    /// `seq_len` tokens.
    pub fn batch(&self, items: &[EncodedSample], seq_len: usize) -> Result<SequenceBatch<B>, TrainError> {
        if items.is_empty() {
            return Err(TrainError::ShapeMismatch { what: "batch size", expected: 1, found: 0 });
        }
        if let Some(bad) = items.iter().find(|s| s.tokens.len() != seq_len) {
            return Err(TrainError::ShapeMismatch {
                what:     "batch sequence length",
                expected: seq_len,
                found:    bad.tokens.len(),
            });
        }
        let batch_size = items.len();

        // Burn uses i32 for Int tensor construction here
        let token_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.tokens.iter().map(|&t| t as i32))
            .collect();
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let tokens = Tensor::<B, 1, Int>::from_ints(token_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        Ok(SequenceBatch { tokens, labels })
    }
}

// ─── EpochBatches ─────────────────────────────────────────────────────────────
/// One batch worth of sample indices, tagged with its epoch (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBatch {
    pub epoch:   usize,
    pub indices: Vec<usize>,
}

/// Finite stream of index batches over `num_epochs` epochs,
/// reshuffled at every epoch boundary from a seeded RNG.
pub struct EpochBatches {
    order:      Vec<usize>,
    batch_size: usize,
    num_epochs: usize,
    epoch:      usize,
    cursor:     usize,
    rng:        StdRng,
}

impl EpochBatches {
    pub fn new(len: usize, batch_size: usize, num_epochs: usize, seed: u64) -> Self {
        Self {
            order: (0..len).collect(),
            batch_size: batch_size.max(1),
            num_epochs,
            epoch: 0,
            cursor: len, // forces a shuffle before the first batch
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Batches per epoch: ceil(len / batch_size).
    pub fn batches_per_epoch(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    /// Total number of batches the stream will yield.
    pub fn total_batches(&self) -> usize {
        self.batches_per_epoch() * self.num_epochs
    }
}

impl Iterator for EpochBatches {
    type Item = IndexBatch;

    fn next(&mut self) -> Option<IndexBatch> {
        if self.order.is_empty() {
            return None;
        }
        if self.cursor >= self.order.len() {
            if self.epoch >= self.num_epochs {
                return None;
            }
            self.epoch += 1;
            self.cursor = 0;
            self.order.shuffle(&mut self.rng);
        }
        let end     = (self.cursor + self.batch_size).min(self.order.len());
        let indices = self.order[self.cursor..end].to_vec();
        self.cursor = end;
        Some(IndexBatch { epoch: self.epoch, indices })
    }
}
