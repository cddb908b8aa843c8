// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw corpus files to tensor batches.
//
//   rt-polarity.pos / .neg
//       │
//       ▼
//   PolarityCorpus    → reads lines, attaches class labels
//       │
//       ▼
//   Preprocessor      → splits punctuation and contractions
//       │
//       ▼
//   VocabStore        → word ids, padded to one length (infra)
//       │
//       ▼
//   split_train_dev   → seeded shuffle, held-out dev split
//       │
//       ▼
//   SequenceDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   EpochBatches +
//   SequenceBatcher   → per-epoch shuffled tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads positive/negative polarity files
pub mod loader;

/// Normalises raw sentences before tokenisation
pub mod preprocessor;

/// Encoded samples and the in-memory dataset
pub mod dataset;

/// Epoch-shuffled batch stream and tensor batching
pub mod batcher;

/// Shuffles and splits data into train/dev sets
pub mod splitter;
