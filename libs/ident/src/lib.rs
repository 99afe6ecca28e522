//! # intake-ident
//!
//! Normalization and check-digit validation for the identifiers captured on
//! a vehicle work order.
//!
//! ## Identifiers
//!
//! - **License plate**: reformatted for display, never rejected
//!   ([`normalize_plate`], [`normalize_plate_by_length_template`]).
//! - **VIN**: 17 characters with an ISO 3779 check character at position 9
//!   ([`is_valid_vin`]).
//! - **IMEI**: 15 digits ending in a Luhn check digit; 14-digit input is
//!   completed ([`luhn_check_digit`], [`is_valid_imei`], [`reconcile_imei`]).
//!
//! Every function here is pure and total: the boolean and `Option` forms never
//! fail, and the typed constructors ([`LicensePlate`], [`Vin`], [`Imei`])
//! report what is wrong through [`IdentError`].
//!
//! ```
//! use intake_ident::{is_valid_imei, is_valid_vin, luhn_check_digit, normalize_plate};
//!
//! assert_eq!(normalize_plate("vgk91x"), "VGK-91-X");
//! assert!(is_valid_vin("1HGCM82633A004352"));
//! assert_eq!(luhn_check_digit("49015420323718"), Some(7));
//! assert!(is_valid_imei("490154203237187"));
//! ```

mod error;
mod imei;
mod macros;
mod plate;
mod types;
mod vin;

pub use error::IdentError;
pub use imei::{
    imei_from_scan, is_valid_imei, luhn_check_digit, reconcile_imei, Imei, IMEI_BODY_LENGTH,
    IMEI_LENGTH,
};
pub use plate::{
    compact_plate, normalize_plate, normalize_plate_by_length_template, normalize_plate_by_runs,
    LicensePlate, SevenCharGrouping,
};
pub use types::*;
pub use vin::{
    is_valid_vin, sanitize_vin, vin_check_char, vin_from_scan, Vin, VIN_CHECK_INDEX, VIN_LENGTH,
};

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
