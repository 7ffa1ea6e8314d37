//! Dialect table
//!
//! Everything that differs between target dialects lives in one
//! [`DialectSpec`] per dialect. Emitters look values up here and never branch
//! on separator characters or envelope names themselves.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// EDIFACT separators
pub const EDIFACT_SEGMENT_TERMINATOR: &str = "'";
pub const EDIFACT_ELEMENT_SEPARATOR: &str = "+";
pub const EDIFACT_COMPONENT_SEPARATOR: &str = ":";

/// X12 separators; the terminator is spelled as ixDOC expects it
pub const X12_SEGMENT_TERMINATOR: &str = "\\n";
pub const X12_ELEMENT_SEPARATOR: &str = "|";
pub const X12_COMPONENT_SEPARATOR: &str = ">";

/// Separators of a delimited dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators {
    /// Segment terminator (`segChar`)
    pub segment: &'static str,
    /// Field separator between elements (`elChar`)
    pub element: &'static str,
    /// Sub-field separator inside composites (`compChar`)
    pub component: &'static str,
}

/// How a delimited dialect wraps the message body in an interchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Fragments included before the message body
    pub header: &'static [&'static str],
    /// Fragments included after the message body
    pub trailer: &'static [&'static str],
    /// Prefix of the body entity name (`x` for `x850`)
    pub body_prefix: &'static str,
}

/// Table entry for one dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectSpec {
    pub name: &'static str,
    /// Directory below the fragment root (`edifact`, `x12`, `idoc`)
    pub fragment_dir: &'static str,
    /// Root wrapper of the emitted document
    pub root_wrapper: &'static str,
    /// `None` for fixed-width dialects
    pub separators: Option<Separators>,
    /// `None` when the body is emitted inline
    pub envelope: Option<Envelope>,
}

const EDIFACT: DialectSpec = DialectSpec {
    name: "EDIFACT",
    fragment_dir: "edifact",
    root_wrapper: "INTERCHANGE",
    separators: Some(Separators {
        segment: EDIFACT_SEGMENT_TERMINATOR,
        element: EDIFACT_ELEMENT_SEPARATOR,
        component: EDIFACT_COMPONENT_SEPARATOR,
    }),
    envelope: Some(Envelope {
        header: &["unb"],
        trailer: &["unz"],
        body_prefix: "",
    }),
};

const X12: DialectSpec = DialectSpec {
    name: "X12",
    fragment_dir: "x12",
    root_wrapper: "INTERCHANGE",
    separators: Some(Separators {
        segment: X12_SEGMENT_TERMINATOR,
        element: X12_ELEMENT_SEPARATOR,
        component: X12_COMPONENT_SEPARATOR,
    }),
    envelope: Some(Envelope {
        header: &["isa", "gs"],
        trailer: &["ge", "iea"],
        body_prefix: "x",
    }),
};

const IDOC: DialectSpec = DialectSpec {
    name: "IDOC",
    fragment_dir: "idoc",
    root_wrapper: "TRANSACTION",
    separators: None,
    envelope: None,
};

/// Target dialect of a format descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Edifact,
    X12,
    Idoc,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Edifact, Dialect::X12, Dialect::Idoc];

    pub fn spec(self) -> &'static DialectSpec {
        match self {
            Self::Edifact => &EDIFACT,
            Self::X12 => &X12,
            Self::Idoc => &IDOC,
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Whether the dialect is segment/field delimited (EDIFACT, X12)
    pub fn is_delimited(self) -> bool {
        self.spec().separators.is_some()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|dialect| dialect.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnsupportedDialect(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect_names() {
        assert_eq!("EDIFACT".parse::<Dialect>().unwrap(), Dialect::Edifact);
        assert_eq!("x12".parse::<Dialect>().unwrap(), Dialect::X12);
        assert_eq!(" IDoc ".parse::<Dialect>().unwrap(), Dialect::Idoc);
    }

    #[test]
    fn test_unknown_dialect_is_unsupported() {
        let err = "TRADACOMS".parse::<Dialect>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedDialect(ref name) if name == "TRADACOMS"));
    }

    #[test]
    fn test_table_entries() {
        let edifact = Dialect::Edifact.spec().separators.unwrap();
        assert_eq!((edifact.segment, edifact.element, edifact.component), ("'", "+", ":"));

        let x12 = Dialect::X12.spec().separators.unwrap();
        assert_eq!((x12.segment, x12.element, x12.component), ("\\n", "|", ">"));
        assert_eq!(Dialect::X12.spec().envelope.unwrap().body_prefix, "x");

        assert!(!Dialect::Idoc.is_delimited());
        assert_eq!(Dialect::Idoc.spec().root_wrapper, "TRANSACTION");
    }
}
