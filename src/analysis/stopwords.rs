use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::core::error::{Error, ErrorKind, Result};

/// Tokens removed from both indexed content and queries.
#[derive(Debug, Default)]
pub struct StopTokens {
    tokens: HashSet<String>,
}

impl StopTokens {
    pub fn new() -> Self {
        StopTokens::default()
    }

    pub fn from_tokens(tokens: impl IntoIterator<Item = String>) -> Self {
        StopTokens {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Loads a stop-token file, one token per line. Blank lines are skipped.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            Error::new(
                ErrorKind::NotFound,
                format!("cannot read stop tokens {}: {}", path.display(), err),
            )
        })?;
        Ok(Self::from_tokens(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from),
        ))
    }

    pub fn is_stop_token(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}
