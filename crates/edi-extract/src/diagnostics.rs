//! Non-fatal extraction diagnostics
//!
//! Unparseable lines and listing entries are dropped and extraction goes on.
//! Each drop is recorded so callers can report what was left out.

use std::fmt;

/// Why an input item was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Detail line matching neither the composite nor the element pattern
    UnrecognizedLine,
    /// Element line without a requirement flag or format token
    MalformedElement,
    /// Indented element with no open composite above it
    OrphanElement,
    /// Composite line indented under another item
    NestedComposite,
    /// Listing entry with neither a group heading nor a segment link
    UnrecognizedEntry,
    /// Segment link whose text is not a three-letter tag
    InvalidSegmentTag,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnrecognizedLine => "unrecognized line",
            Self::MalformedElement => "malformed element line",
            Self::OrphanElement => "indented element outside a composite",
            Self::NestedComposite => "composite nested under another item",
            Self::UnrecognizedEntry => "listing entry is neither a group nor a segment",
            Self::InvalidSegmentTag => "segment tag is not three letters",
        };
        f.write_str(text)
    }
}

/// An input item dropped during extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// Where the item came from (`listing` or `segment <TAG>`)
    pub context: String,
    /// 1-based line number or listing entry index
    pub index: usize,
    /// Offending text, trimmed
    pub text: String,
    pub reason: SkipReason,
}

impl Skipped {
    pub fn new(
        context: impl Into<String>,
        index: usize,
        text: impl Into<String>,
        reason: SkipReason,
    ) -> Self {
        Self {
            context: context.into(),
            index,
            text: text.into(),
            reason,
        }
    }
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}: {} ({:?})", self.context, self.index, self.reason, self.text)
    }
}
