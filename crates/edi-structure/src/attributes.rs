//! Scalar attributes shared by every node of a message structure
//!
//! The persisted JSON carries all of these as strings (`"Mandatory"`, `"99"`,
//! `"String (AN)"`), so each type owns its textual form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Scope value written on every node
pub const SCOPE_USED: &str = "Used";

/// Whether a segment, composite or element must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requirement {
    /// Must appear at least once
    Mandatory,
    /// May be omitted
    #[default]
    Conditional,
}

impl Requirement {
    /// Map a directory status flag (`M`/`C`) to a requirement
    pub fn from_flag(flag: char) -> Self {
        if flag.eq_ignore_ascii_case(&'M') {
            Self::Mandatory
        } else {
            Self::Conditional
        }
    }

    pub fn is_mandatory(self) -> bool {
        matches!(self, Self::Mandatory)
    }

    /// Minimum occurrence implied by this requirement
    pub fn min_occurs(self) -> u32 {
        match self {
            Self::Mandatory => 1,
            Self::Conditional => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mandatory => "Mandatory",
            Self::Conditional => "Conditional",
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Requirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "mandatory" => Ok(Self::Mandatory),
            "c" | "conditional" | "" => Ok(Self::Conditional),
            _ => Err(Error::invalid_attribute("Requirement", s)),
        }
    }
}

impl Serialize for Requirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Upper occurrence bound of a segment or group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl MaxOccurs {
    pub fn is_one(self) -> bool {
        self == Self::Bounded(1)
    }

    /// Value used in descriptor `max` attributes (`n` for unbounded)
    pub fn descriptor_value(self) -> String {
        match self {
            Self::Bounded(n) => n.to_string(),
            Self::Unbounded => "n".to_string(),
        }
    }
}

impl Default for MaxOccurs {
    fn default() -> Self {
        Self::Bounded(1)
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl FromStr for MaxOccurs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" => Ok(Self::default()),
            "unbounded" | "n" | "*" => Ok(Self::Unbounded),
            digits => digits
                .parse()
                .map(Self::Bounded)
                .map_err(|_| Error::invalid_attribute("Max", s)),
        }
    }
}

impl Serialize for MaxOccurs {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MaxOccurs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match TextOrNumber::deserialize(deserializer)? {
            TextOrNumber::Text(raw) => raw.parse().map_err(serde::de::Error::custom),
            TextOrNumber::Number(n) => u32::try_from(n)
                .map(Self::Bounded)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Data type of an element, derived from its directory format token
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DataType {
    /// `an` format class
    #[default]
    Alphanumeric,
    /// `n` format class
    Numeric,
    /// `a` format class
    Alpha,
    /// Composite data element
    Composite,
    /// Any other letter class, kept verbatim
    Other(String),
}

impl DataType {
    /// Map a format letter class (`an`, `n`, `a`) to a data type
    pub fn from_letter_class(class: &str) -> Self {
        match class {
            "an" => Self::Alphanumeric,
            "n" => Self::Numeric,
            "a" => Self::Alpha,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Alphanumeric => "String (AN)",
            Self::Numeric => "Numeric (N)",
            Self::Alpha => "A",
            Self::Composite => "Composite (composite)",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for DataType {
    fn from(label: &str) -> Self {
        match label {
            "String (AN)" => Self::Alphanumeric,
            "Numeric (N)" => Self::Numeric,
            "A" => Self::Alpha,
            "Composite (composite)" => Self::Composite,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// Position of the `index`-th entry of a directory listing (`0010`, `0020`, ...)
pub fn listing_position(index: usize) -> String {
    format!("{:04}", (index + 1) * 10)
}

/// Position of a top-level item inside a segment (`010`, `020`, ...)
pub fn item_position(counter: u32) -> String {
    format!("{counter:03}")
}

/// Position of the `index`-th (0-based) element of a composite at `parent`
pub fn component_position(parent: &str, index: usize) -> String {
    format!("{parent}{:03}", index + 1)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(u64),
}

/// Serde adapter for counts persisted as decimal strings (`"1"`, `"35"`)
///
/// Reading also accepts bare JSON numbers and tolerates a leading range marker
/// (`"..35"`) left behind by older extractions.
pub mod text_number {
    use super::TextOrNumber;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        match TextOrNumber::deserialize(deserializer)? {
            TextOrNumber::Text(raw) => {
                let digits = raw.trim().trim_start_matches('.');
                if digits.is_empty() {
                    return Ok(0);
                }
                digits.parse().map_err(serde::de::Error::custom)
            }
            TextOrNumber::Number(n) => u32::try_from(n).map_err(serde::de::Error::custom),
        }
    }
}
