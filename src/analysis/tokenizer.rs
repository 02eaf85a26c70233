use std::collections::HashSet;
use std::fs;
use std::path::Path;

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::Token;
use crate::core::error::{Error, ErrorKind, Result};

/// Splits text into terms with byte offsets. Implementations must be safe to
/// share across the segmenter workers.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Unicode word-boundary tokenizer, the default for space-delimited text.
#[derive(Debug, Clone)]
pub struct WhitespaceTokenizer {
    pub lowercase: bool,
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        WhitespaceTokenizer { lowercase: true }
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        text.unicode_word_indices()
            .map(|(start, word)| {
                let text = if self.lowercase {
                    word.to_lowercase()
                } else {
                    word.to_string()
                };
                Token { text, start }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Greedy forward-maximum-matching tokenizer over a term dictionary, for
/// scripts without word delimiters. Dictionary format: one term per line,
/// optionally followed by whitespace-separated columns that are ignored.
pub struct DictionaryTokenizer {
    terms: HashSet<String>,
    /// Longest dictionary term, in chars.
    max_term_chars: usize,
}

impl DictionaryTokenizer {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            Error::new(
                ErrorKind::NotFound,
                format!("cannot read dictionary {}: {}", path.display(), err),
            )
        })?;

        let mut terms = HashSet::new();
        let mut max_term_chars = 0;
        for line in contents.lines() {
            if let Some(term) = line.split_whitespace().next() {
                max_term_chars = max_term_chars.max(term.chars().count());
                terms.insert(term.to_string());
            }
        }
        if terms.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("dictionary {} has no terms", path.display()),
            ));
        }
        Ok(DictionaryTokenizer {
            terms,
            max_term_chars,
        })
    }
}

impl Tokenizer for DictionaryTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let chars: Vec<(usize, char)> = text.char_indices().collect();

        let mut i = 0;
        while i < chars.len() {
            let (start, c) = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }

            // Longest dictionary match wins; a lone char is its own token.
            let mut matched = 0;
            for len in (2..=self.max_term_chars.min(chars.len() - i)).rev() {
                let end = chars
                    .get(i + len)
                    .map(|&(offset, _)| offset)
                    .unwrap_or(text.len());
                if self.terms.contains(&text[start..end]) {
                    matched = len;
                    break;
                }
            }
            if matched == 0 {
                matched = 1;
            }
            let end = chars
                .get(i + matched)
                .map(|&(offset, _)| offset)
                .unwrap_or(text.len());
            tokens.push(Token::new(&text[start..end], start));
            i += matched;
        }
        tokens
    }

    fn name(&self) -> &str {
        "dictionary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn whitespace_tokens_carry_byte_offsets() {
        let tokenizer = WhitespaceTokenizer::default();
        let tokens = tokenizer.tokenize("The quick brown fox");
        let expected = vec![
            Token::new("the", 0),
            Token::new("quick", 4),
            Token::new("brown", 10),
            Token::new("fox", 16),
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn whitespace_can_preserve_case() {
        let tokenizer = WhitespaceTokenizer { lowercase: false };
        let tokens = tokenizer.tokenize("Rust");
        assert_eq!(tokens, vec![Token::new("Rust", 0)]);
    }

    #[test]
    fn dictionary_prefers_longest_match() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "full 10").unwrap();
        writeln!(file, "fulltext 3").unwrap();
        writeln!(file, "search").unwrap();
        let tokenizer = DictionaryTokenizer::from_path(file.path()).unwrap();

        let tokens = tokenizer.tokenize("fulltextsearch");
        assert_eq!(
            tokens,
            vec![Token::new("fulltext", 0), Token::new("search", 8)]
        );
    }

    #[test]
    fn dictionary_falls_back_to_single_chars() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ab").unwrap();
        let tokenizer = DictionaryTokenizer::from_path(file.path()).unwrap();

        let tokens = tokenizer.tokenize("xab y");
        assert_eq!(
            tokens,
            vec![Token::new("x", 0), Token::new("ab", 1), Token::new("y", 4)]
        );
    }

    #[test]
    fn missing_dictionary_is_an_error() {
        let missing = Path::new("/nonexistent/dictionary.txt");
        assert!(DictionaryTokenizer::from_path(missing).is_err());
    }
}
