//! Vocabularies mapping tokens to dense ids.
//!
//! Ids are assigned in insertion order starting at zero, so the special
//! tokens a vocabulary is created with always occupy the lowest ids. The
//! on-disk format is one token per line; the line number is the id.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{TextError, TextResult};

/// Padding token.
pub const PAD: &str = "<pad>";
/// Unknown-token placeholder.
pub const UNK: &str = "<unk>";
/// Beginning-of-sentence marker.
pub const BOS: &str = "<s>";
/// End-of-sentence marker.
pub const EOS: &str = "</s>";

/// Default special tokens, padding first.
pub const DEFAULT_SPECIALS: [&str; 4] = [PAD, UNK, BOS, EOS];

/// Ordered token to id mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocab {
    tokens: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocab {
    /// Create an empty vocabulary.
    pub fn new() -> Self {
        Vocab::default()
    }

    /// Create a vocabulary whose first ids are the given special tokens.
    pub fn with_specials<I, S>(specials: I) -> TextResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Vocab::new();
        for token in specials {
            vocab.insert(token)?;
        }
        Ok(vocab)
    }

    /// Append a token, returning its id.
    pub fn insert(&mut self, token: impl Into<String>) -> TextResult<usize> {
        let token = token.into();
        if self.ids.contains_key(&token) {
            return Err(TextError::DuplicateToken { token });
        }
        let id = self.tokens.len();
        self.ids.insert(token.clone(), id);
        self.tokens.push(token);
        Ok(id)
    }

    /// Id of a token.
    pub fn id(&self, token: &str) -> Option<usize> {
        self.ids.get(token).copied()
    }

    /// Id of a token, or `default` when absent.
    pub fn id_or(&self, token: &str, default: usize) -> usize {
        self.id(token).unwrap_or(default)
    }

    /// Token with the given id.
    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in id order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Write one token per line.
    pub fn save(&self, path: &Path) -> TextResult<()> {
        let mut content = String::new();
        for token in &self.tokens {
            content.push_str(token);
            content.push('\n');
        }
        fs::write(path, content).map_err(|e| TextError::io(path, e))?;
        tracing::info!(path = %path.display(), tokens = self.len(), "saved vocab");
        Ok(())
    }

    /// Read a vocabulary written by [`Vocab::save`].
    pub fn load(path: &Path) -> TextResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| TextError::io(path, e))?;
        let mut vocab = Vocab::new();
        for token in content.lines().filter(|line| !line.trim().is_empty()) {
            vocab.insert(token)?;
        }
        tracing::debug!(path = %path.display(), tokens = vocab.len(), "loaded vocab");
        Ok(vocab)
    }
}
