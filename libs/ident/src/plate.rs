//! License plate normalization.
//!
//! Two formatters exist:
//!
//! - [`normalize_plate_by_runs`] is canonical. It splits the cleaned plate into
//!   maximal runs of letters or digits and joins them with `-`, so plates of
//!   any side-code layout come out grouped correctly (`ABC1234D` becomes
//!   `ABC-1234-D`). The server, PDF and mail subject use this form.
//! - [`normalize_plate_by_length_template`] slices by total length only. It is
//!   what the form uses while the user is still typing.
//!
//! Neither formatter ever fails; they are display aids, not gatekeepers.

use crate::error::IdentError;

/// Grouping applied to 7-character plates by the length-template formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SevenCharGrouping {
    /// 2-3-2.
    #[default]
    TwoThreeTwo,
    /// 2-2-3.
    TwoTwoThree,
}

impl SevenCharGrouping {
    /// Parses the `"2-3-2"` / `"2-2-3"` wire form.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "2-3-2" => Some(Self::TwoThreeTwo),
            "2-2-3" => Some(Self::TwoTwoThree),
            _ => None,
        }
    }

    /// Returns the `"2-3-2"` / `"2-2-3"` wire form.
    pub const fn label(self) -> &'static str {
        match self {
            Self::TwoThreeTwo => "2-3-2",
            Self::TwoTwoThree => "2-2-3",
        }
    }

    const fn widths(self) -> &'static [usize] {
        match self {
            Self::TwoThreeTwo => &[2, 3, 2],
            Self::TwoTwoThree => &[2, 2, 3],
        }
    }
}

/// Strips everything outside `[A-Za-z0-9]` and uppercases the rest.
///
/// This is the key used for registry lookups.
pub fn compact_plate(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Canonical plate normalizer. Alias of [`normalize_plate_by_runs`].
pub fn normalize_plate(raw: &str) -> String {
    normalize_plate_by_runs(raw)
}

/// Groups the cleaned plate into maximal letter/digit runs joined by `-`.
///
/// ```
/// use intake_ident::normalize_plate_by_runs;
///
/// assert_eq!(normalize_plate_by_runs("vgk91x"), "VGK-91-X");
/// assert_eq!(normalize_plate_by_runs("ABC1234D"), "ABC-1234-D");
/// assert_eq!(normalize_plate_by_runs(""), "");
/// ```
pub fn normalize_plate_by_runs(raw: &str) -> String {
    let compact = compact_plate(raw);
    let mut out = String::with_capacity(compact.len() * 2);
    let mut prev_is_digit: Option<bool> = None;

    for c in compact.chars() {
        let is_digit = c.is_ascii_digit();
        if prev_is_digit.is_some_and(|prev| prev != is_digit) {
            out.push('-');
        }
        out.push(c);
        prev_is_digit = Some(is_digit);
    }

    out
}

/// Formats the cleaned plate by fixed-width slicing on its total length.
///
/// - 6 characters: 2-2-2
/// - 7 characters: 2-3-2 or 2-2-3, per `grouping`
/// - 8 characters: 2-2-3-1
/// - anything else: the cleaned plate without hyphens
pub fn normalize_plate_by_length_template(raw: &str, grouping: SevenCharGrouping) -> String {
    let compact = compact_plate(raw);
    let widths: &[usize] = match compact.len() {
        6 => &[2, 2, 2],
        7 => grouping.widths(),
        8 => &[2, 2, 3, 1],
        _ => return compact,
    };

    // compact is pure ASCII, so byte offsets are char offsets.
    let mut parts = Vec::with_capacity(widths.len());
    let mut start = 0;
    for width in widths {
        parts.push(&compact[start..start + width]);
        start += width;
    }
    parts.join("-")
}

/// A normalized license plate.
///
/// Holds the run-based canonical form. Construction only fails for input
/// that contains no letters or digits at all.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LicensePlate(String);

impl LicensePlate {
    /// Normalizes `raw` into a plate.
    pub fn parse(raw: &str) -> Result<Self, IdentError> {
        let normalized = normalize_plate_by_runs(raw);
        if normalized.is_empty() {
            return Err(IdentError::Empty {
                kind: "license plate",
            });
        }
        Ok(Self(normalized))
    }

    /// Returns the plate without hyphens, as used for registry lookups.
    #[must_use]
    pub fn compact(&self) -> String {
        self.0.replace('-', "")
    }
}

crate::macros::string_identifier!(LicensePlate);
