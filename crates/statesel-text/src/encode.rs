//! Sentence encoding into token ids.

use serde::Serialize;

use crate::dataset::Example;
use crate::error::{TextError, TextResult};
use crate::tokenize::whitespace_tokenize;
use crate::vocab::{Vocab, BOS, EOS, PAD, UNK};

/// An example after encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedExample {
    pub idx: usize,
    /// Token ids wrapped in `<s>` ... `</s>`.
    pub token_ids: Vec<usize>,
    pub label: Option<u8>,
    /// Number of ids, markers included.
    pub length: usize,
}

/// Ids of the reserved tokens an encoder relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialIds {
    pub pad: usize,
    pub unk: usize,
    pub bos: usize,
    pub eos: usize,
}

impl SpecialIds {
    /// Look up the reserved tokens in a vocabulary.
    pub fn from_vocab(vocab: &Vocab) -> TextResult<Self> {
        let lookup = |token: &str| {
            vocab.id(token).ok_or_else(|| TextError::MissingSpecial {
                token: token.to_string(),
            })
        };
        Ok(SpecialIds {
            pad: lookup(PAD)?,
            unk: lookup(UNK)?,
            bos: lookup(BOS)?,
            eos: lookup(EOS)?,
        })
    }
}

/// Maps sentences to token ids with a fixed vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'a> {
    vocab: &'a Vocab,
    specials: SpecialIds,
}

impl<'a> Encoder<'a> {
    pub fn new(vocab: &'a Vocab) -> TextResult<Self> {
        Ok(Encoder {
            vocab,
            specials: SpecialIds::from_vocab(vocab)?,
        })
    }

    pub fn specials(&self) -> SpecialIds {
        self.specials
    }

    /// Token ids for a sentence, out-of-vocabulary tokens mapped to `<unk>`.
    pub fn encode_sentence(&self, sentence: &str) -> Vec<usize> {
        let tokens = whitespace_tokenize(sentence);
        let mut ids = Vec::with_capacity(tokens.len() + 2);
        ids.push(self.specials.bos);
        ids.extend(tokens.iter().map(|t| self.vocab.id_or(t, self.specials.unk)));
        ids.push(self.specials.eos);
        ids
    }

    pub fn encode(&self, example: &Example) -> EncodedExample {
        let token_ids = self.encode_sentence(&example.sentence);
        EncodedExample {
            idx: example.idx,
            length: token_ids.len(),
            token_ids,
            label: example.label,
        }
    }

    pub fn encode_all(&self, examples: &[Example]) -> Vec<EncodedExample> {
        examples.iter().map(|e| self.encode(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::DEFAULT_SPECIALS;

    fn vocab() -> Vocab {
        let mut vocab = Vocab::with_specials(DEFAULT_SPECIALS).unwrap();
        vocab.insert("a").unwrap();
        vocab.insert("film").unwrap();
        vocab
    }

    #[test]
    fn test_encode_wraps_and_maps_unknown() {
        let vocab = vocab();
        let encoder = Encoder::new(&vocab).unwrap();
        let encoded = encoder.encode(&Example {
            idx: 3,
            sentence: "a dull film".to_string(),
            label: Some(0),
        });
        assert_eq!(encoded.token_ids, vec![2, 4, 1, 5, 3]);
        assert_eq!(encoded.length, 5);
        assert_eq!(encoded.idx, 3);
        assert_eq!(encoded.label, Some(0));
    }

    #[test]
    fn test_empty_sentence_has_markers_only() {
        let vocab = vocab();
        let encoder = Encoder::new(&vocab).unwrap();
        assert_eq!(encoder.encode_sentence("  "), vec![2, 3]);
    }

    #[test]
    fn test_missing_special() {
        let vocab = Vocab::with_specials(["<pad>", "<unk>", "<s>"]).unwrap();
        let err = Encoder::new(&vocab).unwrap_err();
        assert!(matches!(err, TextError::MissingSpecial { token } if token == "</s>"));
    }
}
