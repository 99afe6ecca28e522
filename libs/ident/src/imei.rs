//! IMEI Luhn check digit computation and validation.
//!
//! An IMEI is 14 identity digits followed by a Luhn check digit. Counting from
//! the left with index 0, every odd-index digit is doubled (minus 9 when the
//! result exceeds 9) before summing.

use crate::error::IdentError;

/// Digits in a full IMEI.
pub const IMEI_LENGTH: usize = 15;

/// Digits in an IMEI without its check digit.
pub const IMEI_BODY_LENGTH: usize = 14;

fn is_ascii_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// Luhn sum over `digits`, doubling odd indexes. Caller guarantees ASCII digits.
fn luhn_sum(digits: &str) -> u32 {
    digits
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum()
}

/// Computes the Luhn check digit for a 14-digit IMEI body.
///
/// Returns `None` unless `digits14` is exactly 14 ASCII digits.
///
/// ```
/// use intake_ident::luhn_check_digit;
///
/// assert_eq!(luhn_check_digit("49015420323751"), Some(8));
/// assert_eq!(luhn_check_digit("0123456789012"), None);
/// ```
pub fn luhn_check_digit(digits14: &str) -> Option<u8> {
    if digits14.len() != IMEI_BODY_LENGTH || !is_ascii_digits(digits14) {
        return None;
    }
    let sum = luhn_sum(digits14);
    // (10 - sum % 10) % 10 is always 0..=9
    Some(((10 - sum % 10) % 10) as u8)
}

/// Returns true iff `candidate15` is exactly 15 ASCII digits with a valid
/// Luhn check digit. Never fails.
pub fn is_valid_imei(candidate15: &str) -> bool {
    candidate15.len() == IMEI_LENGTH
        && is_ascii_digits(candidate15)
        && luhn_sum(candidate15) % 10 == 0
}

/// Completes and re-validates a typed or scanned IMEI.
///
/// 14 digits get the computed check digit appended; 15 digits are kept as-is.
/// Either way the result must pass [`is_valid_imei`], otherwise `None`.
pub fn reconcile_imei(digits: &str) -> Option<String> {
    let candidate = match digits.len() {
        IMEI_BODY_LENGTH => {
            let check = luhn_check_digit(digits)?;
            format!("{digits}{check}")
        }
        IMEI_LENGTH => digits.to_string(),
        _ => return None,
    };

    is_valid_imei(&candidate).then_some(candidate)
}

/// A 15-digit IMEI with a verified check digit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Imei(String);

impl Imei {
    /// Parses a 14- or 15-digit IMEI.
    ///
    /// A 14-digit value is completed with its check digit. Whitespace is not
    /// stripped; clean the input first.
    pub fn parse(digits: &str) -> Result<Self, IdentError> {
        if digits.is_empty() {
            return Err(IdentError::Empty { kind: "IMEI" });
        }

        if let Some((position, character)) = digits
            .chars()
            .enumerate()
            .find(|(_, c)| !c.is_ascii_digit())
        {
            return Err(IdentError::InvalidCharacter {
                kind: "IMEI",
                character,
                position,
            });
        }

        match digits.len() {
            IMEI_BODY_LENGTH | IMEI_LENGTH => {}
            actual => {
                return Err(IdentError::InvalidLength {
                    kind: "IMEI",
                    expected: "14 or 15",
                    actual,
                })
            }
        }

        let body = &digits[..IMEI_BODY_LENGTH];
        let expected = luhn_check_digit(body).map_or('?', |d| char::from(b'0' + d));

        if let Some(actual) = digits.chars().nth(IMEI_BODY_LENGTH) {
            if actual != expected {
                return Err(IdentError::CheckDigitMismatch {
                    kind: "IMEI",
                    expected,
                    actual,
                });
            }
        }

        Ok(Self(format!("{body}{expected}")))
    }

    /// Returns the type allocation code (first eight digits).
    #[must_use]
    pub fn tac(&self) -> &str {
        &self.0[..8]
    }

    /// Returns the check digit.
    #[must_use]
    pub fn check_digit(&self) -> u8 {
        self.0.as_bytes()[IMEI_BODY_LENGTH] - b'0'
    }
}

crate::macros::string_identifier!(Imei);

/// Turns decoded barcode text into an IMEI.
///
/// Only the ASCII digits of the text are considered. The first 15 digits are
/// used when at least 15 are present; otherwise 14 digits are completed with
/// their check digit. The result is always re-validated, including a bare
/// 15-digit decode.
pub fn imei_from_scan(decoded: &str) -> Option<Imei> {
    let digits: String = decoded.chars().filter(char::is_ascii_digit).collect();
    let candidate = match digits.len() {
        n if n >= IMEI_LENGTH => &digits[..IMEI_LENGTH],
        IMEI_BODY_LENGTH => digits.as_str(),
        _ => return None,
    };
    reconcile_imei(candidate).map(Imei)
}
