//! Whitespace tokenization.

use std::collections::HashSet;

/// Split a sentence into tokens on runs of whitespace.
pub fn whitespace_tokenize(sentence: &str) -> Vec<&str> {
    sentence.split_whitespace().collect()
}

/// Collect the set of distinct tokens over all sentences.
pub fn unique_tokens<'a, I>(sentences: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let tokens: HashSet<String> = sentences
        .into_iter()
        .flat_map(|s| s.split_whitespace())
        .map(str::to_string)
        .collect();
    tracing::info!(count = tokens.len(), "unique tokens");
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokenize() {
        assert_eq!(
            whitespace_tokenize("  a  gorgeous,\twitty film \n"),
            vec!["a", "gorgeous,", "witty", "film"]
        );
        assert!(whitespace_tokenize("   ").is_empty());
    }

    #[test]
    fn test_unique_tokens() {
        let tokens = unique_tokens(["the film", "the  end"]);
        assert_eq!(tokens.len(), 3);
        assert!(tokens.contains("the"));
        assert!(tokens.contains("end"));
    }
}
