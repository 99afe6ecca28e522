//! Vehicle Identification Number validation (ISO 3779 check digit).
//!
//! A VIN is 17 characters from `[A-HJ-NPR-Z0-9]`. Position 9 (index 8) holds
//! a check character computed from the other sixteen: letters are
//! transliterated to numbers, each position is multiplied by a fixed weight,
//! and the sum modulo 11 gives the check digit (`X` for 10).

use crate::error::IdentError;

/// Number of characters in a VIN.
pub const VIN_LENGTH: usize = 17;

/// Index of the check character.
pub const VIN_CHECK_INDEX: usize = 8;

/// Position weights. The check position itself carries weight 0.
const WEIGHTS: [u32; VIN_LENGTH] = [8, 7, 6, 5, 4, 3, 2, 10, 0, 9, 8, 7, 6, 5, 4, 3, 2];

/// Numeric value of a VIN character, or `None` if it is outside the alphabet.
///
/// I, O and Q are not part of the alphabet.
const fn transliterate(c: char) -> Option<u32> {
    let value = match c {
        '0'..='9' => c as u32 - '0' as u32,
        'A' | 'J' => 1,
        'B' | 'K' | 'S' => 2,
        'C' | 'L' | 'T' => 3,
        'D' | 'M' | 'U' => 4,
        'E' | 'N' | 'V' => 5,
        'F' | 'W' => 6,
        'G' | 'P' | 'X' => 7,
        'H' | 'Y' => 8,
        'R' | 'Z' => 9,
        _ => return None,
    };
    Some(value)
}

/// Checks length and alphabet, returning the first violation.
fn check_shape(candidate: &str) -> Result<(), IdentError> {
    if candidate.is_empty() {
        return Err(IdentError::Empty { kind: "VIN" });
    }

    let len = candidate.chars().count();
    if len != VIN_LENGTH {
        return Err(IdentError::InvalidLength {
            kind: "VIN",
            expected: "17",
            actual: len,
        });
    }

    if let Some((position, character)) = candidate
        .chars()
        .enumerate()
        .find(|(_, c)| transliterate(*c).is_none())
    {
        return Err(IdentError::InvalidCharacter {
            kind: "VIN",
            character,
            position,
        });
    }

    Ok(())
}

/// Computes the check character for a shape-valid VIN candidate.
///
/// Returns `None` if the candidate is not 17 characters of the VIN alphabet.
/// The character currently at index 8 does not affect the result.
///
/// ```
/// use intake_ident::vin_check_char;
///
/// assert_eq!(vin_check_char("1HGCM82633A004352"), Some('3'));
/// assert_eq!(vin_check_char("1HGCM82633A00435"), None);
/// ```
pub fn vin_check_char(candidate: &str) -> Option<char> {
    check_shape(candidate).ok()?;

    let sum: u32 = candidate
        .chars()
        .zip(WEIGHTS)
        .map(|(c, weight)| transliterate(c).unwrap_or(0) * weight)
        .sum();

    match sum % 11 {
        10 => Some('X'),
        // remainder is 0..=9
        r => char::from_digit(r, 10),
    }
}

/// Returns true iff `candidate` is a well-formed VIN with a matching check
/// character. Never fails; malformed input yields `false`.
pub fn is_valid_vin(candidate: &str) -> bool {
    match vin_check_char(candidate) {
        Some(expected) => candidate.chars().nth(VIN_CHECK_INDEX) == Some(expected),
        None => false,
    }
}

/// Caller-side cleanup applied to typed or scanned VIN text.
///
/// Drops everything outside `[A-Za-z0-9]`, uppercases, and drops the
/// forbidden letters I, O and Q.
pub fn sanitize_vin(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| !matches!(*c, 'I' | 'O' | 'Q'))
        .collect()
}

/// A VIN whose shape and check character have been verified.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vin(String);

impl Vin {
    /// Validates `candidate` as-is. No cleanup is applied; use
    /// [`sanitize_vin`] first for user input.
    pub fn parse(candidate: &str) -> Result<Self, IdentError> {
        check_shape(candidate)?;

        let expected = vin_check_char(candidate).unwrap_or('?');
        let actual = candidate.chars().nth(VIN_CHECK_INDEX).unwrap_or('?');
        if expected != actual {
            return Err(IdentError::CheckDigitMismatch {
                kind: "VIN",
                expected,
                actual,
            });
        }

        Ok(Self(candidate.to_string()))
    }

    /// Returns the world manufacturer identifier (first three characters).
    #[must_use]
    pub fn wmi(&self) -> &str {
        &self.0[..3]
    }

    /// Returns the check character at position 9.
    #[must_use]
    pub fn check_char(&self) -> char {
        self.0.as_bytes()[VIN_CHECK_INDEX] as char
    }
}

crate::macros::string_identifier!(Vin);

/// Turns decoded barcode text into a VIN.
///
/// The text is cleaned with [`sanitize_vin`]; it is only accepted when exactly
/// 17 characters remain and the check character matches.
pub fn vin_from_scan(decoded: &str) -> Option<Vin> {
    let cleaned = sanitize_vin(decoded);
    if cleaned.len() != VIN_LENGTH {
        return None;
    }
    Vin::parse(&cleaned).ok()
}
