//! Word embedding matrices and GloVe vector filtering.
//!
//! ## File format
//!
//! Saved matrices are plain text. The first line is the header `rows dim`;
//! every following line holds one row of `dim` space-separated floats, in
//! vocabulary id order.
//!
//! GloVe files hold one `token v1 v2 ... vdim` entry per line. The vector is
//! always the last `dim` fields, so a token may itself contain spaces.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{TextError, TextResult};
use crate::vocab::{Vocab, DEFAULT_SPECIALS};

/// Half-width of the uniform range special-token rows are drawn from.
const SPECIAL_INIT_SCALE: f32 = 0.05;

/// File name of the cached vocabulary.
pub const VOCAB_FILE: &str = "vocab.txt";
/// File name of the cached embedding matrix.
pub const EMBED_FILE: &str = "embed.txt";

/// Dense row-major embedding matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    dim: usize,
    data: Vec<f32>,
}

impl Embeddings {
    /// Create an empty matrix with rows of `dim` values.
    pub fn new(dim: usize) -> Self {
        Embeddings {
            dim,
            data: Vec::new(),
        }
    }

    /// Row width.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    /// The row for a vocabulary id.
    pub fn row(&self, id: usize) -> Option<&[f32]> {
        let start = id.checked_mul(self.dim)?;
        let end = start.checked_add(self.dim)?;
        self.data.get(start..end)
    }

    fn push_row(&mut self, row: &[f32]) {
        debug_assert_eq!(row.len(), self.dim);
        self.data.extend_from_slice(row);
    }

    /// Write the matrix in the text format described in the module docs.
    pub fn save(&self, path: &Path) -> TextResult<()> {
        let mut content = format!("{} {}\n", self.rows(), self.dim);
        for id in 0..self.rows() {
            let row = &self.data[id * self.dim..(id + 1) * self.dim];
            let line = row
                .iter()
                .map(f32::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            content.push_str(&line);
            content.push('\n');
        }
        fs::write(path, content).map_err(|e| TextError::io(path, e))?;
        tracing::info!(path = %path.display(), rows = self.rows(), dim = self.dim, "saved embeddings");
        Ok(())
    }

    /// Read a matrix written by [`Embeddings::save`].
    pub fn load(path: &Path) -> TextResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| TextError::io(path, e))?;
        let malformed = |message: String| TextError::MalformedEmbeddings {
            path: path.display().to_string(),
            message,
        };

        let mut lines = content.lines();
        let header = lines
            .next()
            .ok_or_else(|| malformed("missing header".to_string()))?;
        let (rows, dim) = parse_header(header).ok_or_else(|| {
            malformed(format!("expected 'rows dim' header, found '{}'", header))
        })?;
        if dim == 0 {
            return Err(malformed("dimension must be at least 1".to_string()));
        }

        let mut embeddings = Embeddings::new(dim);
        for (i, line) in lines.enumerate() {
            let row = parse_floats(line.split_whitespace())
                .ok_or_else(|| malformed(format!("row {} has an unparsable value", i)))?;
            if row.len() != dim {
                return Err(malformed(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    dim
                )));
            }
            embeddings.push_row(&row);
        }

        if embeddings.rows() != rows {
            return Err(malformed(format!(
                "header declares {} rows, found {}",
                rows,
                embeddings.rows()
            )));
        }
        Ok(embeddings)
    }
}

fn parse_header(header: &str) -> Option<(usize, usize)> {
    let mut fields = header.split_whitespace();
    let rows = fields.next()?.parse().ok()?;
    let dim = fields.next()?.parse().ok()?;
    match fields.next() {
        Some(_) => None,
        None => Some((rows, dim)),
    }
}

fn parse_floats<'a>(fields: impl IntoIterator<Item = &'a str>) -> Option<Vec<f32>> {
    fields.into_iter().map(|f| f.parse().ok()).collect()
}

// ============================================================================
// GloVe Filtering
// ============================================================================

/// Options for [`glove_embeddings`].
#[derive(Debug, Clone)]
pub struct GloveOptions {
    /// Vector width of the GloVe file.
    pub dim: usize,
    /// Special tokens occupying the first ids; the first is padding.
    pub specials: Vec<String>,
    /// Seed for the special-token rows.
    pub seed: u64,
    /// Directory to write `vocab.txt` and `embed.txt` into.
    pub cache_dir: Option<PathBuf>,
}

impl Default for GloveOptions {
    fn default() -> Self {
        GloveOptions {
            dim: 300,
            specials: DEFAULT_SPECIALS.iter().map(|s| s.to_string()).collect(),
            seed: 42,
            cache_dir: None,
        }
    }
}

/// Build a vocabulary and embedding matrix from the GloVe vectors of the
/// given tokens.
///
/// Special tokens come first with small random rows (the padding row is all
/// zeros), followed by every GloVe token that appears in `tokens`, in file
/// order. Tokens without a GloVe vector are left out.
pub fn glove_embeddings(
    tokens: &HashSet<String>,
    glove_path: &Path,
    options: &GloveOptions,
) -> TextResult<(Vocab, Embeddings)> {
    if options.dim == 0 {
        return Err(TextError::InvalidDimension);
    }
    let mut vocab = Vocab::with_specials(options.specials.iter().cloned())?;
    let mut embeddings = Embeddings::new(options.dim);

    let mut rng = StdRng::seed_from_u64(options.seed);
    for i in 0..options.specials.len() {
        let row: Vec<f32> = if i == 0 {
            vec![0.0; options.dim]
        } else {
            (0..options.dim)
                .map(|_| rng.random_range(-SPECIAL_INIT_SCALE..SPECIAL_INIT_SCALE))
                .collect()
        };
        embeddings.push_row(&row);
    }

    let file = File::open(glove_path).map_err(|e| TextError::io(glove_path, e))?;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| TextError::io(glove_path, e))?;
        let line_no = index + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() <= options.dim {
            return Err(TextError::MalformedVector {
                line: line_no,
                message: format!(
                    "expected a token and {} values, found {} fields",
                    options.dim,
                    fields.len()
                ),
            });
        }

        let (token_fields, values) = fields.split_at(fields.len() - options.dim);
        let token = token_fields.join(" ");
        if !tokens.contains(&token) {
            continue;
        }
        if vocab.contains(&token) {
            tracing::warn!(token = %token, line = line_no, "skipping duplicate vector");
            continue;
        }

        let row = parse_floats(values.iter().copied()).ok_or_else(|| TextError::MalformedVector {
            line: line_no,
            message: format!("unparsable value in vector for '{}'", token),
        })?;
        vocab.insert(token)?;
        embeddings.push_row(&row);
    }

    tracing::info!(
        vocab = vocab.len(),
        dim = options.dim,
        "filtered pretrained vectors"
    );

    if let Some(dir) = &options.cache_dir {
        fs::create_dir_all(dir).map_err(|e| TextError::io(dir, e))?;
        vocab.save(&dir.join(VOCAB_FILE))?;
        embeddings.save(&dir.join(EMBED_FILE))?;
    }

    Ok((vocab, embeddings))
}
