//! Error types for identifier parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating identifiers.
///
/// The boolean validators (`is_valid_vin`, `is_valid_imei`) never produce
/// these; they are only returned by the typed constructors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentError {
    /// The input string is empty (after cleanup).
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    /// The input has the wrong number of characters.
    #[error("{kind} must be {expected} characters, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: &'static str,
        actual: usize,
    },

    /// The input contains a character outside the allowed alphabet.
    #[error("{kind} contains invalid character '{character}' at position {position}")]
    InvalidCharacter {
        kind: &'static str,
        character: char,
        position: usize,
    },

    /// The embedded check character does not match the computed one.
    #[error("{kind} check digit mismatch: expected '{expected}', got '{actual}'")]
    CheckDigitMismatch {
        kind: &'static str,
        expected: char,
        actual: char,
    },

    /// The ID is missing the required prefix.
    #[error("invalid ID prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        expected: &'static str,
        actual: String,
    },

    /// The ID is missing the underscore separator.
    #[error("ID missing underscore separator")]
    MissingSeparator,

    /// The ULID portion of the ID is invalid.
    #[error("invalid ULID: {0}")]
    InvalidUlid(String),
}

impl IdentError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdentError::Empty { .. })
    }

    /// Returns true if the input was well-formed but its check digit was wrong.
    pub fn is_checksum_error(&self) -> bool {
        matches!(self, IdentError::CheckDigitMismatch { .. })
    }
}
