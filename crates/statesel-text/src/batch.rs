//! Padded batching.
//!
//! Batches are built from encoded examples in order, or in a shuffled order
//! when a seed is configured. The shuffle for a given epoch is seeded with
//! `seed + epoch`, so each epoch sees a different order that is still
//! reproducible.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::encode::EncodedExample;
use crate::error::{TextError, TextResult};

/// How examples are grouped into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// Shuffle with this seed; `None` keeps file order.
    pub shuffle_seed: Option<u64>,
    /// Drop a final batch smaller than `batch_size`.
    pub drop_remainder: bool,
}

impl BatchConfig {
    /// In-order batches that keep the remainder.
    pub fn ordered(batch_size: usize) -> Self {
        BatchConfig {
            batch_size,
            shuffle_seed: None,
            drop_remainder: false,
        }
    }

    /// Shuffled batches of exactly `batch_size` examples.
    pub fn shuffled(batch_size: usize, seed: u64) -> Self {
        BatchConfig {
            batch_size,
            shuffle_seed: Some(seed),
            drop_remainder: true,
        }
    }
}

/// A batch of examples with token rows padded to equal length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    pub idx: Vec<usize>,
    pub token_ids: Vec<Vec<usize>>,
    pub labels: Vec<Option<u8>>,
    /// Unpadded row lengths.
    pub lengths: Vec<usize>,
}

impl Batch {
    fn from_examples(examples: &[&EncodedExample], pad_id: usize) -> Self {
        let width = examples.iter().map(|e| e.length).max().unwrap_or(0);
        Batch {
            idx: examples.iter().map(|e| e.idx).collect(),
            token_ids: examples
                .iter()
                .map(|e| {
                    let mut row = e.token_ids.clone();
                    row.resize(width, pad_id);
                    row
                })
                .collect(),
            labels: examples.iter().map(|e| e.label).collect(),
            lengths: examples.iter().map(|e| e.length).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Padded row width.
    pub fn width(&self) -> usize {
        self.token_ids.first().map_or(0, Vec::len)
    }
}

/// Group examples into padded batches for one epoch.
pub fn batches(
    examples: &[EncodedExample],
    config: &BatchConfig,
    epoch: u64,
    pad_id: usize,
) -> TextResult<Vec<Batch>> {
    if config.batch_size == 0 {
        return Err(TextError::InvalidBatchSize);
    }

    let mut order: Vec<&EncodedExample> = examples.iter().collect();
    if let Some(seed) = config.shuffle_seed {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(epoch));
        order.shuffle(&mut rng);
    }

    let batches: Vec<Batch> = order
        .chunks(config.batch_size)
        .filter(|chunk| !config.drop_remainder || chunk.len() == config.batch_size)
        .map(|chunk| Batch::from_examples(chunk, pad_id))
        .collect();
    tracing::debug!(
        examples = examples.len(),
        batches = batches.len(),
        epoch,
        "built batches"
    );
    Ok(batches)
}
