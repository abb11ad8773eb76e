//! Crate error type: protocol rejection, transport failure, and
//! configuration failure all collapse to one shape so every fallible
//! operation returns a single `Result`.

use std::fmt;
use std::io;

/// The single error type used throughout this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseError(String);

impl LeaseError {
    /// Builds a `LeaseError` carrying the given message.
    pub fn msg(s: impl Into<String>) -> Self {
        LeaseError(s.into())
    }
}

impl fmt::Display for LeaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for LeaseError {}

impl From<io::Error> for LeaseError {
    fn from(e: io::Error) -> Self {
        LeaseError::msg(format!("io error: {}", e))
    }
}

impl From<bincode::Error> for LeaseError {
    fn from(e: bincode::Error) -> Self {
        LeaseError::msg(format!("bincode error: {}", e))
    }
}

impl From<toml::de::Error> for LeaseError {
    fn from(e: toml::de::Error) -> Self {
        LeaseError::msg(format!("toml parse error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_message() {
        let e = LeaseError::msg("boom");
        assert_eq!(e.to_string(), "boom");
    }
}
