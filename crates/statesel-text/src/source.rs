//! Batched data source over a GLUE SST-2 data directory.
//!
//! A data directory holds `train.tsv`, `dev.tsv` and `test.tsv`. The
//! vocabulary and embeddings are loaded from explicit paths when both files
//! exist, and otherwise built from pretrained GloVe vectors restricted to the
//! tokens of all three splits.

use std::path::{Path, PathBuf};

use crate::batch::{batches, Batch, BatchConfig};
use crate::dataset::read_tsv;
use crate::embed::{glove_embeddings, Embeddings, GloveOptions};
use crate::encode::{EncodedExample, Encoder};
use crate::error::{TextError, TextResult};
use crate::tokenize::unique_tokens;
use crate::vocab::Vocab;

/// Training split file name.
pub const TRAIN_FILE: &str = "train.tsv";
/// Validation split file name.
pub const VALID_FILE: &str = "dev.tsv";
/// Test split file name.
pub const TEST_FILE: &str = "test.tsv";

/// Index of the example logged as a data sample.
const SAMPLE_INDEX: usize = 4;

/// Settings for [`DataSource::open`].
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub data_dir: PathBuf,
    pub batch_size: usize,
    pub shuffle_seed: u64,
    pub glove_path: Option<PathBuf>,
    pub glove_dim: usize,
    pub cache_dir: Option<PathBuf>,
    pub vocab_path: Option<PathBuf>,
    pub embed_path: Option<PathBuf>,
}

impl SourceConfig {
    /// Settings for `data_dir` with default batching and vector width.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        SourceConfig {
            data_dir: data_dir.into(),
            batch_size: 64,
            shuffle_seed: 1,
            glove_path: None,
            glove_dim: 300,
            cache_dir: None,
            vocab_path: None,
            embed_path: None,
        }
    }

    fn cached_paths(&self) -> Option<(&Path, &Path)> {
        match (&self.vocab_path, &self.embed_path) {
            (Some(vocab), Some(embed)) if vocab.exists() && embed.exists() => {
                Some((vocab.as_path(), embed.as_path()))
            }
            _ => None,
        }
    }
}

/// Encoded splits with their vocabulary and embeddings.
#[derive(Debug)]
pub struct DataSource {
    config: SourceConfig,
    vocab: Vocab,
    embeddings: Embeddings,
    pad_id: usize,
    train: Vec<EncodedExample>,
    valid: Vec<EncodedExample>,
    test: Vec<EncodedExample>,
}

impl DataSource {
    /// Read, encode and index all splits of a data directory.
    pub fn open(config: SourceConfig) -> TextResult<Self> {
        if config.batch_size == 0 {
            return Err(TextError::InvalidBatchSize);
        }

        let train_raw = read_tsv(&config.data_dir.join(TRAIN_FILE))?;
        let valid_raw = read_tsv(&config.data_dir.join(VALID_FILE))?;
        let test_raw = read_tsv(&config.data_dir.join(TEST_FILE))?;

        if let Some(sample) = train_raw.get(SAMPLE_INDEX).or_else(|| train_raw.first()) {
            tracing::info!(sample = ?sample, "data sample");
        }

        let (vocab, embeddings) = match config.cached_paths() {
            Some((vocab_path, embed_path)) => (Vocab::load(vocab_path)?, Embeddings::load(embed_path)?),
            None => {
                let glove_path = config.glove_path.as_deref().ok_or(TextError::MissingVectors)?;
                let sentences = train_raw
                    .iter()
                    .chain(&valid_raw)
                    .chain(&test_raw)
                    .map(|e| e.sentence.as_str());
                let tokens = unique_tokens(sentences);
                let options = GloveOptions {
                    dim: config.glove_dim,
                    cache_dir: config.cache_dir.clone(),
                    ..GloveOptions::default()
                };
                glove_embeddings(&tokens, glove_path, &options)?
            }
        };
        if embeddings.rows() != vocab.len() {
            return Err(TextError::SizeMismatch {
                rows: embeddings.rows(),
                tokens: vocab.len(),
            });
        }

        let encoder = Encoder::new(&vocab)?;
        let pad_id = encoder.specials().pad;
        let train = encoder.encode_all(&train_raw);
        let valid = encoder.encode_all(&valid_raw);
        let test = encoder.encode_all(&test_raw);

        tracing::info!(
            train = train.len(),
            valid = valid.len(),
            test = test.len(),
            vocab = vocab.len(),
            "opened data source"
        );

        Ok(DataSource {
            config,
            vocab,
            embeddings,
            pad_id,
            train,
            valid,
            test,
        })
    }

    /// Shuffled training batches for an epoch; the remainder is dropped.
    pub fn train_batches(&self, epoch: u64) -> TextResult<Vec<Batch>> {
        let config = BatchConfig::shuffled(self.config.batch_size, self.config.shuffle_seed);
        batches(&self.train, &config, epoch, self.pad_id)
    }

    /// Validation batches in file order.
    pub fn valid_batches(&self) -> TextResult<Vec<Batch>> {
        batches(&self.valid, &BatchConfig::ordered(self.config.batch_size), 0, self.pad_id)
    }

    /// Test batches in file order.
    pub fn test_batches(&self) -> TextResult<Vec<Batch>> {
        batches(&self.test, &BatchConfig::ordered(self.config.batch_size), 0, self.pad_id)
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn embeddings(&self) -> &Embeddings {
        &self.embeddings
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    pub fn train(&self) -> &[EncodedExample] {
        &self.train
    }

    pub fn valid(&self) -> &[EncodedExample] {
        &self.valid
    }

    pub fn test(&self) -> &[EncodedExample] {
        &self.test
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{EMBED_FILE, VOCAB_FILE};
    use std::fs;
    use tempfile::TempDir;

    fn write_data(dir: &Path) {
        let train = (0..6)
            .map(|i| format!("the film {}\t{}\n", if i % 2 == 0 { "works" } else { "fails" }, i % 2))
            .collect::<String>();
        fs::write(dir.join(TRAIN_FILE), format!("sentence\tlabel\n{}", train)).unwrap();
        fs::write(dir.join(VALID_FILE), "sentence\tlabel\na film\t1\nthe end\t0\nodd\t1\n").unwrap();
        fs::write(dir.join(TEST_FILE), "index\tsentence\n0\tthe film\n").unwrap();
        fs::write(
            dir.join("glove.txt"),
            "the 0.1 0.1\nfilm 0.2 0.2\nworks 0.3 0.3\nunused 0.9 0.9\n",
        )
        .unwrap();
    }

    fn config(dir: &Path) -> SourceConfig {
        SourceConfig {
            batch_size: 2,
            glove_path: Some(dir.join("glove.txt")),
            glove_dim: 2,
            ..SourceConfig::new(dir)
        }
    }

    #[test]
    fn test_open_builds_vocab_from_glove() {
        let dir = TempDir::new().unwrap();
        write_data(dir.path());

        let source = DataSource::open(config(dir.path())).unwrap();
        assert_eq!(source.vocab_size(), 7);
        assert!(!source.vocab().contains("unused"));
        assert_eq!(source.embeddings().rows(), 7);
        assert_eq!(source.train().len(), 6);
        assert_eq!(source.test()[0].label, None);
    }

    #[test]
    fn test_batches_per_split() {
        let dir = TempDir::new().unwrap();
        write_data(dir.path());
        let source = DataSource::open(config(dir.path())).unwrap();

        let train = source.train_batches(0).unwrap();
        assert_eq!(train.len(), 3);
        assert!(train.iter().all(|b| b.len() == 2));
        assert_eq!(train, source.train_batches(0).unwrap());

        let valid = source.valid_batches().unwrap();
        assert_eq!(valid.iter().map(Batch::len).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(source.test_batches().unwrap().len(), 1);
    }

    #[test]
    fn test_cached_vocab_is_reused() {
        let dir = TempDir::new().unwrap();
        write_data(dir.path());
        let cache = dir.path().join("cache");

        let first = DataSource::open(SourceConfig {
            cache_dir: Some(cache.clone()),
            ..config(dir.path())
        })
        .unwrap();

        fs::remove_file(dir.path().join("glove.txt")).unwrap();
        let second = DataSource::open(SourceConfig {
            vocab_path: Some(cache.join(VOCAB_FILE)),
            embed_path: Some(cache.join(EMBED_FILE)),
            ..config(dir.path())
        })
        .unwrap();

        assert_eq!(first.vocab(), second.vocab());
        assert_eq!(first.embeddings(), second.embeddings());
    }

    #[test]
    fn test_missing_vectors() {
        let dir = TempDir::new().unwrap();
        write_data(dir.path());
        let err = DataSource::open(SourceConfig::new(dir.path())).unwrap_err();
        assert!(matches!(err, TextError::MissingVectors));
    }

    #[test]
    fn test_zero_glove_dim_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_data(dir.path());
        let err = DataSource::open(SourceConfig {
            glove_dim: 0,
            ..config(dir.path())
        })
        .unwrap_err();
        assert!(matches!(err, TextError::InvalidDimension));
    }

    #[test]
    fn test_cached_size_mismatch() {
        let dir = TempDir::new().unwrap();
        write_data(dir.path());
        let cache = dir.path().join("cache");
        DataSource::open(SourceConfig {
            cache_dir: Some(cache.clone()),
            ..config(dir.path())
        })
        .unwrap();
        fs::write(cache.join(EMBED_FILE), "1 2\n0 0\n").unwrap();

        let err = DataSource::open(SourceConfig {
            vocab_path: Some(cache.join(VOCAB_FILE)),
            embed_path: Some(cache.join(EMBED_FILE)),
            ..config(dir.path())
        })
        .unwrap_err();
        assert!(matches!(err, TextError::SizeMismatch { rows: 1, tokens: 7 }));
    }

    #[test]
    fn test_missing_split_file() {
        let dir = TempDir::new().unwrap();
        write_data(dir.path());
        fs::remove_file(dir.path().join(TEST_FILE)).unwrap();
        let err = DataSource::open(config(dir.path())).unwrap_err();
        assert!(matches!(err, TextError::Io { .. }));
    }
}
