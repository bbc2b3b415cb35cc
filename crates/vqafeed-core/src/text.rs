//! # Question Normalization
//!
//! Turns raw question strings into fixed-length index vectors for the
//! embedding layer, plus a sequence-continuation mask.

use regex::Regex;

use crate::error::Result;
use crate::vocab::Vocabulary;

/// A question encoded to fixed length.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedQuestion {
    /// Vocabulary indices, right-padded with zeros.
    pub indices: Vec<u32>,
    /// 1.0 for positions holding a real token, 0.0 for padding.
    pub mask: Vec<f32>,
}

impl EncodedQuestion {
    /// Number of real tokens in the encoded question.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m > 0.0).count()
    }
}

/// Question tokenizer with pre-compiled normalization patterns.
#[derive(Debug)]
pub struct QuestionTokenizer {
    re_strip: Regex,
    re_to_space: Regex,
}

impl QuestionTokenizer {
    /// Constructs a tokenizer with pre-compiled regex patterns.
    ///
    /// # Errors
    ///
    /// Returns `VqafeedError::Regex` if a pattern fails to compile
    /// (should never happen with the static patterns defined here).
    pub fn new() -> Result<Self> {
        Ok(Self {
            re_strip: Regex::new(r#"[?!'"$:@(),.;]"#)?,
            re_to_space: Regex::new(r"[-/]")?,
        })
    }

    /// Normalize and split a question string into tokens.
    ///
    /// Lowercases, strips punctuation, maps `-` and `/` to spaces, and
    /// drops empty fragments.
    #[must_use]
    pub fn tokenize(&self, question: &str) -> Vec<String> {
        let lowered = question.to_lowercase();
        let stripped = self.re_strip.replace_all(&lowered, "");
        let spaced = self.re_to_space.replace_all(&stripped, " ");

        spaced
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Encode a token list into a `max_length` index vector and mask.
    ///
    /// Padding is on the right; tokens beyond `max_length` are truncated.
    /// Out-of-vocabulary tokens resolve to the vocabulary's fallback
    /// entry.
    #[must_use]
    pub fn encode_tokens(
        &self,
        tokens: &[String],
        vocab: &Vocabulary,
        max_length: usize,
    ) -> EncodedQuestion {
        let mut indices = vec![0u32; max_length];
        let mut mask = vec![0.0f32; max_length];

        for (i, token) in tokens.iter().take(max_length).enumerate() {
            indices[i] = vocab.lookup(token);
            mask[i] = 1.0;
        }

        EncodedQuestion { indices, mask }
    }

    /// Tokenize and encode in one step.
    #[must_use]
    pub fn encode(
        &self,
        question: &str,
        vocab: &Vocabulary,
        max_length: usize,
    ) -> EncodedQuestion {
        let tokens = self.tokenize(question);
        self.encode_tokens(&tokens, vocab, max_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_vocab() -> Vocabulary {
        let mut map = HashMap::new();
        map.insert(String::new(), 0);
        map.insert("what".to_string(), 1);
        map.insert("color".to_string(), 2);
        map.insert("is".to_string(), 3);
        map.insert("the".to_string(), 4);
        map.insert("mans".to_string(), 5);
        map.insert("shirt".to_string(), 6);
        Vocabulary::from_map(map).unwrap()
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        let tokenizer = QuestionTokenizer::new().unwrap();
        let tokens = tokenizer.tokenize("What color is the man's shirt?");
        assert_eq!(tokens, vec!["what", "color", "is", "the", "mans", "shirt"]);
    }

    #[test]
    fn test_tokenize_maps_dash_and_slash_to_space() {
        let tokenizer = QuestionTokenizer::new().unwrap();
        let tokens = tokenizer.tokenize("Is this black-and-white or color/sepia?");
        assert_eq!(
            tokens,
            vec!["is", "this", "black", "and", "white", "or", "color", "sepia"]
        );
    }

    #[test]
    fn test_tokenize_empty() {
        let tokenizer = QuestionTokenizer::new().unwrap();
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("?!.,").is_empty());
    }

    #[test]
    fn test_encode_right_pads() {
        let tokenizer = QuestionTokenizer::new().unwrap();
        let vocab = sample_vocab();
        let encoded = tokenizer.encode("What color?", &vocab, 5);

        assert_eq!(encoded.indices, vec![1, 2, 0, 0, 0]);
        assert_eq!(encoded.mask, vec![1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(encoded.token_count(), 2);
    }

    #[test]
    fn test_encode_truncates() {
        let tokenizer = QuestionTokenizer::new().unwrap();
        let vocab = sample_vocab();
        let encoded = tokenizer.encode("what color is the mans shirt", &vocab, 3);

        assert_eq!(encoded.indices, vec![1, 2, 3]);
        assert_eq!(encoded.mask, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_encode_oov_uses_fallback() {
        let tokenizer = QuestionTokenizer::new().unwrap();
        let vocab = sample_vocab();
        let encoded = tokenizer.encode("what zebra", &vocab, 4);

        // "zebra" is out of vocabulary but still occupies a masked slot.
        assert_eq!(encoded.indices[1], vocab.fallback_index());
        assert_eq!(encoded.mask[1], 1.0);
    }
}
