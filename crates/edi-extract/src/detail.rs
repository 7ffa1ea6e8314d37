//! Segment detail extraction
//!
//! A segment's detail block lists its composites and elements one per line,
//! with component elements indented below their composite:
//!
//! ```text
//! C002 DOCUMENT/MESSAGE NAME                  C    1
//!    1001  Document name code                 C      an..3
//!    1000  Document name                      C      an..35
//! 1225 Message function code                  C    1 an..3
//! ```
//!
//! Lines are classified independently of each other by [`classify_line`];
//! nesting is rebuilt afterwards from the indentation levels alone.

use std::sync::LazyLock;

use edi_structure::attributes::{component_position, item_position};
use edi_structure::{Composite, DataType, Element, ElementNode, Requirement};
use regex::Regex;
use tracing::{debug, trace};

use crate::diagnostics::{SkipReason, Skipped};

/// Spaces per indentation level in detail blocks
pub const DEFAULT_TAB_WIDTH: usize = 3;

/// Position step between top-level items of a segment
const POSITION_STEP: u32 = 10;

/// Code at the start of a line, optionally after a 3-digit position column
static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{3}\s+)?(?P<code>[SC]\d{3,4}|\d{4})(?:\s+(?P<payload>.*))?$")
        .expect("line pattern is a valid regex")
});

static ELEMENT_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?)\s+(?P<req>[MC])(?:\s+\d+)?\s+(?P<format>[a-z]+(?:\d*\.\.\d+|\d+))\s*$")
        .expect("element payload pattern is a valid regex")
});

static COMPOSITE_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?)\s+(?P<req>[MC])(?:\s+\d+)?\s*$")
        .expect("composite payload pattern is a valid regex")
});

static FORMAT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<class>[a-z]+)(?:(?P<min>\d+)?\.\.(?P<max>\d+)|(?P<fixed>\d+))$")
        .expect("format token pattern is a valid regex")
});

/// Configuration for detail parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailConfig {
    /// Leading spaces that make up one indentation level (tabs count as one level)
    pub tab_width: usize,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
        }
    }
}

impl DetailConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the indentation width; zero is treated as one
    pub fn tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width.max(1);
        self
    }
}

/// Kind of a recognized detail line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Composite,
    Element,
}

/// A detail line split into kind, indentation level, code and remaining text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine<'a> {
    pub kind: LineKind,
    /// Indentation level (leading spaces divided by the tab width)
    pub indent: usize,
    pub code: &'a str,
    pub payload: &'a str,
}

/// Data type and length range parsed from a format token such as `an..35`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatToken {
    pub data_type: DataType,
    pub min_length: u32,
    pub max_length: u32,
}

/// Result of parsing one segment's detail block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentDetail {
    /// Top-level composites and elements in document order
    pub elements: Vec<ElementNode>,
    /// Lines dropped while parsing
    pub skipped: Vec<Skipped>,
}

/// Classify one detail line; `None` for lines that are not composites or elements
pub fn classify_line(line: &str, tab_width: usize) -> Option<ClassifiedLine<'_>> {
    let tab_width = tab_width.max(1);
    let trimmed = line.trim();
    let caps = LINE_PATTERN.captures(trimmed)?;
    let code = caps.name("code")?.as_str();
    let payload = caps.name("payload").map_or("", |m| m.as_str().trim());

    let kind = if code.starts_with(['S', 'C']) {
        LineKind::Composite
    } else {
        LineKind::Element
    };

    Some(ClassifiedLine {
        kind,
        indent: leading_width(line, tab_width) / tab_width,
        code,
        payload,
    })
}

fn leading_width(line: &str, tab_width: usize) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { tab_width } else { 1 })
        .sum()
}

/// Parse a format token (`an3`, `n..14`, `an1..35`); the minimum defaults to 1
pub fn parse_format_token(token: &str) -> Option<FormatToken> {
    let caps = FORMAT_TOKEN.captures(token.trim())?;
    let data_type = DataType::from_letter_class(caps.name("class")?.as_str());

    let (min_length, max_length) = match caps.name("fixed") {
        Some(fixed) => (1, fixed.as_str().parse().ok()?),
        None => {
            let min = match caps.name("min") {
                Some(min) => min.as_str().parse().ok()?,
                None => 1,
            };
            (min, caps.name("max")?.as_str().parse().ok()?)
        }
    };

    Some(FormatToken {
        data_type,
        min_length,
        max_length,
    })
}

/// Parse the detail block of segment `tag` into its composites and elements
pub fn parse_segment_detail(tag: &str, text: &str, config: &DetailConfig) -> SegmentDetail {
    let context = format!("segment {tag}");
    let mut builder = TreeBuilder::new(context.clone());

    let mut classified = Vec::new();
    for (number, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        match classify_line(raw, config.tab_width) {
            Some(line) => classified.push((number + 1, line)),
            None => {
                trace!("Skipping unrecognized line in {}: {:?}", context, raw.trim());
                builder.skip(number + 1, raw, SkipReason::UnrecognizedLine);
            }
        }
    }

    // Blocks indented as a whole start at their shallowest line
    let base = classified.iter().map(|(_, line)| line.indent).min().unwrap_or(0);
    for (number, line) in &classified {
        builder.push(*number, line, line.indent - base);
    }

    let detail = builder.finish();
    debug!(
        "Parsed {} items for segment {} ({} lines skipped)",
        detail.elements.len(),
        tag,
        detail.skipped.len()
    );
    detail
}

fn parse_element(line: &ClassifiedLine<'_>) -> Option<Element> {
    let caps = ELEMENT_PAYLOAD.captures(line.payload)?;
    let name = caps.name("name")?.as_str().trim();
    let flag = caps.name("req")?.as_str().chars().next()?;
    let format = parse_format_token(caps.name("format")?.as_str())?;

    Some(
        Element::new(line.code, name, Requirement::from_flag(flag)).with_format(
            format.data_type,
            format.min_length,
            format.max_length,
        ),
    )
}

fn split_composite_payload(payload: &str) -> (String, Requirement) {
    match COMPOSITE_PAYLOAD.captures(payload) {
        Some(caps) => {
            let name = caps.name("name").map_or("", |m| m.as_str()).trim().to_string();
            let flag = caps
                .name("req")
                .and_then(|m| m.as_str().chars().next())
                .unwrap_or('C');
            (name, Requirement::from_flag(flag))
        }
        None => (payload.trim().to_string(), Requirement::Conditional),
    }
}

/// Rebuilds the composite/element tree from indentation levels
struct TreeBuilder {
    context: String,
    items: Vec<ElementNode>,
    open: Vec<Composite>,
    counter: u32,
    skipped: Vec<Skipped>,
}

impl TreeBuilder {
    fn new(context: String) -> Self {
        Self {
            context,
            items: Vec::new(),
            open: Vec::new(),
            counter: POSITION_STEP,
            skipped: Vec::new(),
        }
    }

    fn next_position(&mut self) -> String {
        let position = item_position(self.counter);
        self.counter += POSITION_STEP;
        position
    }

    fn skip(&mut self, number: usize, text: &str, reason: SkipReason) {
        self.skipped
            .push(Skipped::new(&self.context, number, text.trim(), reason));
    }

    fn push(&mut self, number: usize, line: &ClassifiedLine<'_>, level: usize) {
        while self.open.len() > level {
            self.close_top();
        }

        match line.kind {
            LineKind::Composite => {
                if level > 0 {
                    debug!("Skipping nested composite {} in {}", line.code, self.context);
                    self.skip(number, line.code, SkipReason::NestedComposite);
                    return;
                }
                let (name, requirement) = split_composite_payload(line.payload);
                let position = self.next_position();
                self.open
                    .push(Composite::new(line.code, name, requirement).with_position(position));
            }
            LineKind::Element => {
                let Some(element) = parse_element(line) else {
                    debug!("Skipping malformed element {} in {}", line.code, self.context);
                    self.skip(number, &format!("{} {}", line.code, line.payload), SkipReason::MalformedElement);
                    return;
                };

                if level == 0 {
                    let position = self.next_position();
                    self.items.push(ElementNode::Simple(element.with_position(position)));
                } else if let Some(parent) = self.open.last_mut() {
                    let position = component_position(&parent.position, parent.elements.len());
                    parent.elements.push(element.with_position(position));
                } else {
                    self.skip(number, line.code, SkipReason::OrphanElement);
                }
            }
        }
    }

    fn close_top(&mut self) {
        if let Some(composite) = self.open.pop() {
            self.items.push(ElementNode::Composite(composite));
        }
    }

    fn finish(mut self) -> SegmentDetail {
        while !self.open.is_empty() {
            self.close_top();
        }
        SegmentDetail {
            elements: self.items,
            skipped: self.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BGM_DETAIL: &str = "\
C002 DOCUMENT/MESSAGE NAME                      C    1
   1001  Document name code                     C      an..3
   1131  Code list identification code          C      an..17
   3055  Code list responsible agency code      C      an..3
   1000  Document name                          C      an..35
C106 DOCUMENT/MESSAGE IDENTIFICATION            C    1
   1004  Document identifier                    C      an..35
1225 Message function code                      C    1 an..3
4343 Response type code                         C    1 an..3
";

    fn composite(node: &ElementNode) -> &Composite {
        match node {
            ElementNode::Composite(c) => c,
            ElementNode::Simple(e) => panic!("expected composite, found element {}", e.code),
        }
    }

    fn simple(node: &ElementNode) -> &Element {
        match node {
            ElementNode::Simple(e) => e,
            ElementNode::Composite(c) => panic!("expected element, found composite {}", c.code),
        }
    }

    #[test]
    fn test_classify_line_kinds_and_indent() {
        let line = classify_line("   1001  Document name code   C  an..3", 3).unwrap();
        assert_eq!(line.kind, LineKind::Element);
        assert_eq!(line.indent, 1);
        assert_eq!(line.code, "1001");
        assert_eq!(line.payload, "Document name code   C  an..3");

        let line = classify_line("C002 DOCUMENT/MESSAGE NAME C 1", 3).unwrap();
        assert_eq!(line.kind, LineKind::Composite);
        assert_eq!(line.indent, 0);

        let line = classify_line("S009 MESSAGE IDENTIFIER M 1", 3).unwrap();
        assert_eq!(line.kind, LineKind::Composite);

        let line = classify_line("\t\t3055 Agency C an..3", 3).unwrap();
        assert_eq!(line.indent, 2);
    }

    #[test]
    fn test_classify_line_rejects_prose() {
        assert!(classify_line("Function: To indicate the type of document.", 3).is_none());
        assert!(classify_line("BGM  BEGINNING OF MESSAGE", 3).is_none());
        assert!(classify_line("10045 too many digits", 3).is_none());
        assert!(classify_line("", 3).is_none());
    }

    #[test]
    fn test_classify_line_strips_position_column() {
        let line = classify_line("020    1004 Document identifier  M 1 an..35", 3).unwrap();
        assert_eq!(line.code, "1004");
        assert_eq!(line.kind, LineKind::Element);
    }

    #[test]
    fn test_parse_format_token() {
        let token = parse_format_token("an..35").unwrap();
        assert_eq!(token.data_type, DataType::Alphanumeric);
        assert_eq!((token.min_length, token.max_length), (1, 35));

        let token = parse_format_token("n1..14").unwrap();
        assert_eq!(token.data_type, DataType::Numeric);
        assert_eq!((token.min_length, token.max_length), (1, 14));

        let token = parse_format_token("a3").unwrap();
        assert_eq!(token.data_type, DataType::Alpha);
        assert_eq!((token.min_length, token.max_length), (1, 3));

        let token = parse_format_token("an2..6").unwrap();
        assert_eq!((token.min_length, token.max_length), (2, 6));

        assert!(parse_format_token("an").is_none());
        assert!(parse_format_token("35").is_none());
    }

    #[test]
    fn test_parse_segment_detail_builds_composites() {
        let detail = parse_segment_detail("BGM", BGM_DETAIL, &DetailConfig::default());
        assert!(detail.skipped.is_empty(), "unexpected skips: {:?}", detail.skipped);
        assert_eq!(detail.elements.len(), 4);

        let c002 = composite(&detail.elements[0]);
        assert_eq!(c002.code, "C002");
        assert_eq!(c002.name, "DOCUMENT/MESSAGE NAME");
        assert_eq!(c002.requirement, Requirement::Conditional);
        assert_eq!(c002.position, "010");
        let codes: Vec<&str> = c002.elements.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["1001", "1131", "3055", "1000"]);
        assert_eq!(c002.elements[0].position, "010001");
        assert_eq!(c002.elements[3].position, "010004");
        assert_eq!(c002.elements[3].max_length, 35);

        let c106 = composite(&detail.elements[1]);
        assert_eq!(c106.position, "020");
        assert_eq!(c106.elements.len(), 1);

        let e1225 = simple(&detail.elements[2]);
        assert_eq!(e1225.position, "030");
        assert_eq!(e1225.name, "Message function code");
        assert_eq!(e1225.max_length, 3);

        assert_eq!(simple(&detail.elements[3]).position, "040");
    }

    #[test]
    fn test_requirement_flag_is_a_standalone_token() {
        let text = "C082 PARTY IDENTIFICATION DETAILS  M 1\n   3039 Party identifier  M  an..35\n";
        let detail = parse_segment_detail("NAD", text, &DetailConfig::default());
        let c082 = composite(&detail.elements[0]);
        assert_eq!(c082.requirement, Requirement::Mandatory);
        assert_eq!(c082.elements[0].requirement, Requirement::Mandatory);

        let text = "C002 DOCUMENT/MESSAGE NAME  C 1\n";
        let detail = parse_segment_detail("BGM", text, &DetailConfig::default());
        assert_eq!(composite(&detail.elements[0]).requirement, Requirement::Conditional);
    }

    #[test]
    fn test_unrecognized_and_malformed_lines_are_skipped() {
        let text = "\
Function: To indicate the beginning of a message.

C002 DOCUMENT/MESSAGE NAME   C 1
   1001  Document name code
1225 Message function code   C 1 an..3
";
        let detail = parse_segment_detail("BGM", text, &DetailConfig::default());
        assert_eq!(detail.elements.len(), 2);
        assert!(composite(&detail.elements[0]).elements.is_empty());
        assert_eq!(simple(&detail.elements[1]).position, "020");

        let reasons: Vec<SkipReason> = detail.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(reasons, vec![SkipReason::UnrecognizedLine, SkipReason::MalformedElement]);
        assert_eq!(detail.skipped[0].index, 1);
        assert_eq!(detail.skipped[1].index, 4);
        assert_eq!(detail.skipped[0].context, "segment BGM");
    }

    #[test]
    fn test_position_column_layout() {
        let text = "\
010    C002 DOCUMENT/MESSAGE NAME                     C    1
       1001  Document name code                       C      an..3
020    1004 Document identifier                       M    1 an..35
";
        let detail = parse_segment_detail("BGM", text, &DetailConfig::default());
        assert_eq!(detail.elements.len(), 2);
        assert_eq!(composite(&detail.elements[0]).elements.len(), 1);
        let e1004 = simple(&detail.elements[1]);
        assert_eq!(e1004.requirement, Requirement::Mandatory);
        assert_eq!(e1004.position, "020");
    }

    #[test]
    fn test_uniformly_indented_block_is_normalized() {
        let text = "    C002 NAME   C 1\n       1001  Code  C  an..3\n    1225 Function   C 1 an..3\n";
        let detail = parse_segment_detail("BGM", text, &DetailConfig::default());
        assert_eq!(detail.elements.len(), 2);
        assert_eq!(composite(&detail.elements[0]).elements.len(), 1);
    }

    #[test]
    fn test_orphan_and_nested_items_are_skipped() {
        let text = "   1001  Code  C  an..3\nC002 NAME  C 1\n      C003 INNER  C 1\n";
        // The shallowest line is the composite, so the first element is indented under nothing
        let detail = parse_segment_detail("XXX", text, &DetailConfig::default());
        let reasons: Vec<SkipReason> = detail.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(reasons, vec![SkipReason::OrphanElement, SkipReason::NestedComposite]);
        assert_eq!(detail.elements.len(), 1);
    }

    #[test]
    fn test_tab_width_is_configurable() {
        let text = "C002 NAME  C 1\n  1001  Code  C  an..3\n";
        let narrow = parse_segment_detail("BGM", text, &DetailConfig::new().tab_width(2));
        assert_eq!(composite(&narrow.elements[0]).elements.len(), 1);

        // With the default width two spaces stay on level 0
        let default = parse_segment_detail("BGM", text, &DetailConfig::default());
        assert_eq!(default.elements.len(), 2);
    }
}
