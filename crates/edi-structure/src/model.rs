//! Tree node types for a message structure
#![allow(clippy::must_use_candidate)] // Constructor/builder API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::attributes::{DataType, MaxOccurs, Requirement, SCOPE_USED, text_number};

fn default_scope() -> String {
    SCOPE_USED.to_string()
}

fn default_min_length() -> u32 {
    1
}

fn composite_type() -> DataType {
    DataType::Composite
}

/// Root of a compiled message definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageStructure {
    /// Standard name (e.g., EDIFACT)
    pub standard: String,

    /// Directory revision (e.g., D97A)
    pub revision: String,

    /// Message type (e.g., ORDERS)
    pub document: String,

    /// Top-level segments and groups in wire order
    #[serde(default)]
    pub segments: Vec<StructureNode>,
}

/// A top-level or nested entry of a message: segment or segment group
///
/// An entry is read as a group when it carries a `Segments` list or an
/// `SG<n>` code. A malformed child fails the whole entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StructureNode {
    Group(Group),
    Segment(Segment),
}

/// A repeatable block of segments and nested groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    #[serde(rename = "Min", default, with = "text_number")]
    pub min_occurs: u32,

    /// Absent when the definition gave no bound; emitters pick their default
    #[serde(rename = "Max", default, skip_serializing_if = "Option::is_none")]
    pub max_occurs: Option<MaxOccurs>,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default)]
    pub position: String,

    /// Synthetic group code (`SG<n>`)
    #[serde(rename = "Segment")]
    pub code: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub requirement: Requirement,

    /// Child segments and groups in wire order
    pub segments: Vec<StructureNode>,
}

/// One structural line of a message, identified by its tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Segment {
    #[serde(rename = "Min", default, with = "text_number")]
    pub min_occurs: u32,

    #[serde(rename = "Max", default)]
    pub max_occurs: MaxOccurs,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default)]
    pub position: String,

    /// Three-letter segment tag
    #[serde(rename = "Segment")]
    pub tag: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub requirement: Requirement,

    /// Simple elements and composites in wire order
    #[serde(default)]
    pub elements: Vec<ElementNode>,
}

/// A segment-level data item: composite or simple element
///
/// An item is read as a composite when it carries an `Elements` list or a
/// `C<nnn>`/`S<nnn>` code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ElementNode {
    Composite(Composite),
    Simple(Element),
}

fn code_of(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn is_group_code(code: &str) -> bool {
    code.strip_prefix("SG")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn is_composite_code(code: &str) -> bool {
    let mut chars = code.chars();
    matches!(chars.next(), Some('C' | 'S'))
        && code.len() == 4
        && chars.all(|c| c.is_ascii_digit())
}

impl<'de> Deserialize<'de> for StructureNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let code = code_of(&value, "Segment");

        if value.get("Segments").is_some() || is_group_code(&code) {
            let mut group =
                Group::deserialize(value).map_err(|e| D::Error::custom(format!("group {code}: {e}")))?;
            group.min_occurs = group.min_occurs.max(group.requirement.min_occurs());
            Ok(Self::Group(group))
        } else {
            let mut segment =
                Segment::deserialize(value).map_err(|e| D::Error::custom(format!("segment {code}: {e}")))?;
            segment.min_occurs = segment.min_occurs.max(segment.requirement.min_occurs());
            Ok(Self::Segment(segment))
        }
    }
}

impl<'de> Deserialize<'de> for ElementNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let code = code_of(&value, "Element");

        if value.get("Elements").is_some() || is_composite_code(&code) {
            Composite::deserialize(value)
                .map(Self::Composite)
                .map_err(|e| D::Error::custom(format!("composite {code}: {e}")))
        } else {
            Element::deserialize(value)
                .map(Self::Simple)
                .map_err(|e| D::Error::custom(format!("element {code}: {e}")))
        }
    }
}

/// A composite data element grouping several simple elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Composite {
    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default)]
    pub position: String,

    /// Composite code (`C`/`S` followed by digits)
    #[serde(rename = "Element")]
    pub code: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub requirement: Requirement,

    #[serde(rename = "Type", default = "composite_type")]
    pub data_type: DataType,

    /// Component elements in wire order
    pub elements: Vec<Element>,
}

/// A simple data element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Element {
    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default)]
    pub position: String,

    /// Four-digit element code
    #[serde(rename = "Element")]
    pub code: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub requirement: Requirement,

    #[serde(rename = "Type", default)]
    pub data_type: DataType,

    #[serde(rename = "Min", default = "default_min_length", with = "text_number")]
    pub min_length: u32,

    /// Maximum length; 0 when the directory gave none
    #[serde(rename = "Max", default, with = "text_number")]
    pub max_length: u32,
}

impl MessageStructure {
    /// Create an empty structure for a (standard, revision, document) request
    pub fn new(
        standard: impl Into<String>,
        revision: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            standard: standard.into(),
            revision: revision.into(),
            document: document.into(),
            segments: Vec::new(),
        }
    }

    /// Set the top-level entries
    pub fn with_segments(mut self, segments: Vec<StructureNode>) -> Self {
        self.segments = segments;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments and groups in the whole tree
    pub fn segment_count(&self) -> usize {
        self.segments.iter().map(StructureNode::node_count).sum()
    }

    /// Find a group anywhere in the tree by its code
    pub fn find_group(&self, code: &str) -> Option<&Group> {
        find_group_in(&self.segments, code)
    }

    /// Visit every node depth-first with its nesting depth (0 = top level)
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a StructureNode, usize)) {
        fn recurse<'a>(
            nodes: &'a [StructureNode],
            depth: usize,
            visit: &mut impl FnMut(&'a StructureNode, usize),
        ) {
            for node in nodes {
                visit(node, depth);
                if let StructureNode::Group(group) = node {
                    recurse(&group.segments, depth + 1, visit);
                }
            }
        }
        recurse(&self.segments, 0, &mut visit);
    }
}

fn find_group_in<'a>(nodes: &'a [StructureNode], code: &str) -> Option<&'a Group> {
    nodes.iter().find_map(|node| match node {
        StructureNode::Group(group) if group.code == code => Some(group),
        StructureNode::Group(group) => find_group_in(&group.segments, code),
        StructureNode::Segment(_) => None,
    })
}

impl StructureNode {
    /// Segment tag or group code
    pub fn code(&self) -> &str {
        match self {
            Self::Group(group) => &group.code,
            Self::Segment(segment) => &segment.tag,
        }
    }

    pub fn position(&self) -> &str {
        match self {
            Self::Group(group) => &group.position,
            Self::Segment(segment) => &segment.position,
        }
    }

    /// This node plus all of its descendants
    pub fn node_count(&self) -> usize {
        match self {
            Self::Group(group) => 1 + group.segments.iter().map(Self::node_count).sum::<usize>(),
            Self::Segment(_) => 1,
        }
    }
}

impl Group {
    /// Create a conditional group; `min` is always 0
    pub fn new(code: impl Into<String>, max_occurs: MaxOccurs) -> Self {
        let code = code.into();
        Self {
            min_occurs: 0,
            max_occurs: Some(max_occurs),
            scope: default_scope(),
            position: String::new(),
            name: code.clone(),
            code,
            description: String::new(),
            requirement: Requirement::Conditional,
            segments: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_segments(mut self, segments: Vec<StructureNode>) -> Self {
        self.segments = segments;
        self
    }
}

impl Segment {
    /// Create a segment; `min` follows the requirement
    pub fn new(tag: impl Into<String>, requirement: Requirement) -> Self {
        let tag = tag.into();
        Self {
            min_occurs: requirement.min_occurs(),
            max_occurs: MaxOccurs::default(),
            scope: default_scope(),
            position: String::new(),
            name: tag.clone(),
            tag,
            description: String::new(),
            requirement,
            elements: Vec::new(),
        }
    }

    pub fn with_max(mut self, max_occurs: MaxOccurs) -> Self {
        self.max_occurs = max_occurs;
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_elements(mut self, elements: Vec<ElementNode>) -> Self {
        self.elements = elements;
        self
    }
}

impl ElementNode {
    pub fn code(&self) -> &str {
        match self {
            Self::Composite(composite) => &composite.code,
            Self::Simple(element) => &element.code,
        }
    }

    pub fn requirement(&self) -> Requirement {
        match self {
            Self::Composite(composite) => composite.requirement,
            Self::Simple(element) => element.requirement,
        }
    }
}

impl Composite {
    pub fn new(code: impl Into<String>, name: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            scope: default_scope(),
            position: String::new(),
            code: code.into(),
            name: name.into(),
            description: String::new(),
            requirement,
            data_type: DataType::Composite,
            elements: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }
}

impl Element {
    pub fn new(code: impl Into<String>, name: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            scope: default_scope(),
            position: String::new(),
            code: code.into(),
            name: name.into(),
            description: String::new(),
            requirement,
            data_type: DataType::default(),
            min_length: 1,
            max_length: 0,
        }
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    /// Set data type and length range
    pub fn with_format(mut self, data_type: DataType, min_length: u32, max_length: u32) -> Self {
        self.data_type = data_type;
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }
}
