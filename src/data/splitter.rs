// ============================================================
// Layer 4 — Train/Dev Splitter
// ============================================================
// Shuffles samples and holds out the LAST `dev_fraction` of
// them as the dev (evaluation) split:
//   - Training set: used to update model weights
//   - Dev set:      evaluated every `evaluate_every` steps,
//                   never used for gradient updates
//
// The polarity corpus is stored positives-first, so without a
// shuffle the dev split would contain only negative reviews.
// The shuffle is seeded so a run can be reproduced exactly.
//
// Reference: rand crate documentation (SliceRandom, StdRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, dev).
///
/// # Arguments
/// * `samples`      - All available samples (consumed by this function)
/// * `dev_fraction` - Proportion held out for evaluation, e.g. 0.1 = 10%
///
/// # Example
/// ```ignore
/// let (train, dev) = split_train_dev(all_samples, 0.1, 10);
/// // dev has 10% of samples, train has 90%
/// ```
pub fn split_train_dev<T>(mut samples: Vec<T>, dev_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);

    // Fisher-Yates shuffle
    samples.shuffle(&mut rng);

    // e.g. 100 samples * 0.1 = 10 → last 10 are dev
    let total    = samples.len();
    let dev_len  = ((total as f64) * dev_fraction.clamp(0.0, 1.0)) as usize;
    let split_at = total - dev_len.min(total);

    // split_off(n) removes elements [n..] and returns them
    let dev = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} train, {} dev ({}% / {}%)",
        samples.len(),
        dev.len(),
        (samples.len() * 100) / total.max(1),
        (dev.len()     * 100) / total.max(1),
    );

    (samples, dev)
}
