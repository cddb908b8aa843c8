// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Builds, saves and reloads the word-level vocabulary.
//
// The vocabulary is written ONCE at the start of a run, next
// to the checkpoints, so every snapshot can be paired with the
// exact word → id mapping it was trained with.
//
// Ids:
//   0      <PAD>  (sequence padding)
//   1      <UNK>  (out-of-vocabulary word)
//   2..    corpus words, most frequent first
//
// The vocabulary is stored in HuggingFace tokenizer JSON
// (WordLevel model + WhitespaceSplit pre-tokenizer), so the
// file can be loaded back with Tokenizer::from_file().
//
// Reference: tokenizers crate documentation (WordLevel)

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf};
use tokenizers::Tokenizer;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
const SPECIAL_TOKENS: usize = 2;
const FILE_NAME: &str = "tokenizer.json";

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(FILE_NAME)
    }

    /// Load a previously saved vocabulary from JSON file
    pub fn load(&self) -> Result<Vocabulary> {
        let path = self.path();
        let tokenizer = Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load vocabulary from '{}': {}", path.display(), e
            ))?;
        Ok(Vocabulary { tokenizer })
    }

    /// Count words in the (already cleaned) texts, keep the
    /// `vocab_size - 2` most frequent ones and write the
    /// tokenizer JSON.
    pub fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Vocabulary> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: Word frequencies ─────────────────────────────────────────
        let mut freq: HashMap<&str, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // Frequency descending, then alphabetical so ids are deterministic
        let mut words: Vec<(&str, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIAL_TOKENS));

        // ── Step 2: Vocab JSON ───────────────────────────────────────────────
        let mut vocab = serde_json::json!({
            "<PAD>": PAD_ID,
            "<UNK>": UNK_ID,
        });
        let mut next_id = SPECIAL_TOKENS;
        for (word, _) in &words {
            if vocab.get(*word).is_none() {
                vocab[*word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // ── Step 3: Tokenizer JSON in HuggingFace format ─────────────────────
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": PAD_ID, "content": "<PAD>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": UNK_ID, "content": "<UNK>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": null,
            "pre_tokenizer": {
                "type": "WhitespaceSplit"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "<UNK>"
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;

        tracing::info!("Vocabulary built with {} entries, saved to '{}'", next_id, path.display());
        self.load()
    }
}

/// A loaded word-level vocabulary.
pub struct Vocabulary {
    tokenizer: Tokenizer,
}

impl Vocabulary {
    /// Number of ids, special tokens included.
    pub fn len(&self) -> usize {
        self.tokenizer.get_vocab_size(false)
    }

    /// Word ids of `text`, truncated or right-padded with <PAD> to `max_len`.
    pub fn encode_padded(&self, text: &str, max_len: usize) -> Result<Vec<u32>> {
        let enc = self.tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        let mut ids: Vec<u32> = enc.get_ids().to_vec();
        ids.truncate(max_len);
        ids.resize(max_len, PAD_ID);
        Ok(ids)
    }
}

/// Length of the longest document, counted in whitespace-separated words.
pub fn max_document_length(texts: &[String]) -> usize {
    texts.iter().map(|t| t.split_whitespace().count()).max().unwrap_or(0)
}
