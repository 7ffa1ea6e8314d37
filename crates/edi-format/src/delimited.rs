//! Message body emission for delimited dialects (EDIFACT, X12)
//!
//! ```text
//! <MESSAGE format="none" max="n" requirement="mandatory">
//!   <!-- EDIFACT-D97A-ORDERS -->
//!   <BGM end="'" lastEnd="true" emptyEnd="false" errorLevel="true" requirement="mandatory" min="1">
//!     <TAG end="+" key="true" min="1">BGM</TAG>
//!     <C002 end="+">
//!       <E1001 end=":" maxSize="3"/>
//!     </C002>
//!     <E1225 end="+" maxSize="3"/>
//!   </BGM>
//!   <SG1 format="none" max="9999">
//!     ...
//!   </SG1>
//! </MESSAGE>
//! ```

use edi_structure::{Composite, Element, ElementNode, Group, MessageStructure, Segment, StructureNode};
use tracing::trace;

use crate::dialect::Separators;
use crate::writer::XmlOut;
use crate::{EmitOptions, Result};

const MESSAGE: &str = "MESSAGE";
const TAG: &str = "TAG";

/// Emit the `MESSAGE` fragment of `structure`
pub(crate) fn emit_body(
    structure: &MessageStructure,
    separators: &Separators,
    options: &EmitOptions,
) -> Result<String> {
    let mut out = XmlOut::new();
    let emitter = BodyEmitter {
        separators,
        options,
    };

    out.open(
        MESSAGE,
        &vec![
            ("format", "none".to_string()),
            ("max", "n".to_string()),
            ("requirement", "mandatory".to_string()),
        ],
    )?;
    out.comment(&format!(
        "{}-{}-{}",
        structure.standard, structure.revision, structure.document
    ))?;
    for node in &structure.segments {
        emitter.node(&mut out, node)?;
    }
    out.close(MESSAGE)?;
    out.finish()
}

struct BodyEmitter<'a> {
    separators: &'a Separators,
    options: &'a EmitOptions,
}

impl BodyEmitter<'_> {
    fn node(&self, out: &mut XmlOut, node: &StructureNode) -> Result<()> {
        match node {
            StructureNode::Group(group) => self.group(out, group),
            StructureNode::Segment(segment) => self.segment(out, segment),
        }
    }

    fn group(&self, out: &mut XmlOut, group: &Group) -> Result<()> {
        let max = group
            .max_occurs
            .map_or_else(|| self.options.default_group_max.clone(), |max| max.descriptor_value());
        let attrs = vec![("format", "none".to_string()), ("max", max)];

        if group.segments.is_empty() {
            return out.empty(&group.code, &attrs);
        }
        out.open(&group.code, &attrs)?;
        for child in &group.segments {
            self.node(out, child)?;
        }
        out.close(&group.code)
    }

    fn segment(&self, out: &mut XmlOut, segment: &Segment) -> Result<()> {
        trace!("Emitting segment {}", segment.tag);
        let mut attrs = vec![
            ("end", self.separators.segment.to_string()),
            ("lastEnd", "true".to_string()),
            ("emptyEnd", "false".to_string()),
            ("errorLevel", "true".to_string()),
            ("requirement", segment.requirement.as_str().to_lowercase()),
        ];
        if segment.requirement.is_mandatory() {
            attrs.push(("min", "1".to_string()));
        }
        if !segment.max_occurs.is_one() {
            attrs.push(("max", segment.max_occurs.descriptor_value()));
        }

        out.open(&segment.tag, &attrs)?;
        out.text_element(
            TAG,
            &vec![
                ("end", self.separators.element.to_string()),
                ("key", "true".to_string()),
                ("min", "1".to_string()),
            ],
            &segment.tag,
        )?;
        for item in &segment.elements {
            match item {
                ElementNode::Composite(composite) => self.composite(out, composite)?,
                ElementNode::Simple(element) => self.element(out, element, self.separators.element)?,
            }
        }
        out.close(&segment.tag)
    }

    fn composite(&self, out: &mut XmlOut, composite: &Composite) -> Result<()> {
        let mut attrs = vec![("end", self.separators.element.to_string())];
        if composite.requirement.is_mandatory() {
            attrs.push(("min", "1".to_string()));
        }

        if composite.elements.is_empty() {
            return out.empty(&composite.code, &attrs);
        }
        out.open(&composite.code, &attrs)?;
        for element in &composite.elements {
            self.element(out, element, self.separators.component)?;
        }
        out.close(&composite.code)
    }

    fn element(&self, out: &mut XmlOut, element: &Element, end: &str) -> Result<()> {
        let mut attrs = vec![("end", end.to_string())];
        if element.max_length > 0 {
            attrs.push(("maxSize", element.max_length.to_string()));
        }
        if element.requirement.is_mandatory() {
            attrs.push(("min", "1".to_string()));
        }
        out.empty(&format!("E{}", element.code), &attrs)
    }
}
