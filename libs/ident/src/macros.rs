//! Macros for identifier newtypes.
//!
//! Every identifier here round-trips through its string form: `Display`
//! writes it, an inherent `parse(&str) -> Result<Self, IdentError>` reads it
//! back, and serde goes through the same pair so deserialized values are
//! always re-validated.

/// `FromStr`, `Serialize` and `Deserialize` on top of `Display` + `parse`.
macro_rules! parse_via_str {
    ($name:ident) => {
        impl std::str::FromStr for $name {
            type Err = $crate::IdentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A ULID-backed id rendered as `{prefix}_{ulid}`.
///
/// ```ignore
/// define_id!(WorkOrderId, "wo");
///
/// let parsed: WorkOrderId = "wo_01HV4Z2WQXKJNM8GPQY6VBKC3D".parse()?;
/// ```
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::Ulid);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// A fresh id; ids created later sort after earlier ones.
            #[must_use]
            pub fn new() -> Self {
                Self($crate::Ulid::new())
            }

            pub fn parse(s: &str) -> Result<Self, $crate::IdentError> {
                if s.is_empty() {
                    return Err($crate::IdentError::Empty { kind: "ID" });
                }
                let (prefix, ulid) = s
                    .split_once('_')
                    .ok_or($crate::IdentError::MissingSeparator)?;
                if prefix != Self::PREFIX {
                    return Err($crate::IdentError::InvalidPrefix {
                        expected: Self::PREFIX,
                        actual: prefix.to_string(),
                    });
                }
                ulid.parse::<$crate::Ulid>()
                    .map(Self)
                    .map_err(|e| $crate::IdentError::InvalidUlid(e.to_string()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", Self::PREFIX, self.0)
            }
        }

        $crate::macros::parse_via_str!($name);
    };
}

/// A validated string identifier stored in canonical form in field `.0`.
///
/// The type provides `parse`; this adds `as_str`, `AsRef<str>`, `Display`
/// and the string round trip.
macro_rules! string_identifier {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        $crate::macros::parse_via_str!($name);
    };
}

pub(crate) use define_id;
pub(crate) use parse_via_str;
pub(crate) use string_identifier;
