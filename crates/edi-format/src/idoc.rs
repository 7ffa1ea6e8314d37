//! IDOC format descriptors
//!
//! IDOC descriptors are flat: a fixed `EDI_DC40` control record followed by
//! one fixed-width record block per segment. Nesting only survives as group
//! wrappers opened by `<SG>_GROUP_BEGIN` and closed by `<SG>_GROUP_END`
//! records of the linear record list.

use edi_structure::attributes::text_number;
use edi_structure::{Element, ElementNode, MaxOccurs, MessageStructure, StructureNode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::writer::{Attrs, XmlOut};
use crate::{Error, Result};

const GROUP_BEGIN_SUFFIX: &str = "_GROUP_BEGIN";
const GROUP_END_SUFFIX: &str = "_GROUP_END";

/// Length of fields that do not declare one
pub const DEFAULT_FIELD_LENGTH: u32 = 6;

/// Administrative fields repeated in every segment record
const SEGMENT_ADMIN_FIELDS: [(&str, u32); 5] = [
    ("MANDT", 3),
    ("DOCNUM", 16),
    ("SEGNUM", DEFAULT_FIELD_LENGTH),
    ("PSGNUM", DEFAULT_FIELD_LENGTH),
    ("HLEVEL", DEFAULT_FIELD_LENGTH),
];

const SEGNAM_LENGTH: u32 = 30;

/// The SAP `EDI_DC40` control record: (field, length)
const CONTROL_RECORD: [(&str, u32); 36] = [
    ("TABNAM", 10),
    ("MANDT", 3),
    ("DOCNUM", 16),
    ("DOCREL", 4),
    ("STATUS", 2),
    ("DIRECT", 1),
    ("OUTMOD", 1),
    ("EXPRSS", 1),
    ("TEST", 1),
    ("IDOCTYP", 30),
    ("CIMTYP", 30),
    ("MESTYP", 30),
    ("MESCOD", 3),
    ("MESFCT", 3),
    ("STD", 1),
    ("STDVRS", 6),
    ("STDMES", 6),
    ("SNDPOR", 10),
    ("SNDPRT", 2),
    ("SNDPFC", 2),
    ("SNDPRN", 10),
    ("SNDSAD", 21),
    ("SNDLAD", 70),
    ("RCVPOR", 10),
    ("RCVPRT", 2),
    ("RCVPFC", 2),
    ("RCVPRN", 10),
    ("RCVSAD", 21),
    ("RCVLAD", 70),
    ("CREDAT", 8),
    ("CRETIM", 6),
    ("REFINT", 14),
    ("REFGRP", 14),
    ("REFMES", 14),
    ("ARCKEY", 70),
    ("SERIAL", 20),
];

const CONTROL_TABLE_NAME: &str = "EDI_DC40_U";

/// One entry of the linear IDOC record list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord", into = "RawRecord")]
pub enum IdocRecord {
    GroupBegin { group: String, max_occurs: MaxOccurs },
    GroupEnd { group: String },
    Segment {
        /// Value of the `SEGNAM` key field
        segment: String,
        /// Element name of the record block
        type_name: String,
        max_occurs: MaxOccurs,
    },
    Field {
        name: String,
        length: u32,
        description: String,
    },
}

/// Record as it appears in IDOC JSON definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<MaxOccurs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    segment: Option<String>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, with = "text_number", skip_serializing_if = "is_zero")]
    length: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<RawRecord> for IdocRecord {
    type Error = String;

    fn try_from(raw: RawRecord) -> std::result::Result<Self, Self::Error> {
        let max_occurs = raw.max.unwrap_or_default();

        if let Some(position) = non_empty(raw.position) {
            if let Some(group) = position.strip_suffix(GROUP_BEGIN_SUFFIX) {
                return Ok(Self::GroupBegin {
                    group: group.to_string(),
                    max_occurs,
                });
            }
            if let Some(group) = position.strip_suffix(GROUP_END_SUFFIX) {
                return Ok(Self::GroupEnd {
                    group: group.to_string(),
                });
            }
        }
        if let Some(segment) = non_empty(raw.segment) {
            let type_name = non_empty(raw.type_name).unwrap_or_else(|| segment.clone());
            return Ok(Self::Segment {
                segment,
                type_name,
                max_occurs,
            });
        }
        if let Some(name) = non_empty(raw.field) {
            let length = if raw.length == 0 {
                DEFAULT_FIELD_LENGTH
            } else {
                raw.length
            };
            return Ok(Self::Field {
                name,
                length,
                description: raw.description,
            });
        }
        Err("record is neither a group marker, a segment nor a field".to_string())
    }
}

impl From<IdocRecord> for RawRecord {
    fn from(record: IdocRecord) -> Self {
        match record {
            IdocRecord::GroupBegin { group, max_occurs } => Self {
                position: Some(format!("{group}{GROUP_BEGIN_SUFFIX}")),
                max: Some(max_occurs),
                ..Self::default()
            },
            IdocRecord::GroupEnd { group } => Self {
                position: Some(format!("{group}{GROUP_END_SUFFIX}")),
                ..Self::default()
            },
            IdocRecord::Segment {
                segment,
                type_name,
                max_occurs,
            } => Self {
                max: Some(max_occurs),
                segment: Some(segment),
                type_name: Some(type_name),
                ..Self::default()
            },
            IdocRecord::Field {
                name,
                length,
                description,
            } => Self {
                field: Some(name),
                length,
                description,
                ..Self::default()
            },
        }
    }
}

/// Parse an IDOC record list from JSON, dropping entries that are not records
pub fn records_from_json(json: &str) -> Result<Vec<IdocRecord>> {
    let raw: Vec<RawRecord> =
        serde_json::from_str(json).map_err(|e| Error::Records(format!("JSON parse error: {e}")))?;

    let mut records = Vec::with_capacity(raw.len());
    for (index, entry) in raw.into_iter().enumerate() {
        match IdocRecord::try_from(entry) {
            Ok(record) => records.push(record),
            Err(reason) => debug!("Skipping IDOC record #{}: {}", index, reason),
        }
    }
    Ok(records)
}

/// Flatten a message structure into IDOC records
///
/// Groups become `_GROUP_BEGIN`/`_GROUP_END` pairs; composites are dissolved
/// into fields of their component elements.
pub fn linearize(structure: &MessageStructure) -> Vec<IdocRecord> {
    let mut records = Vec::new();
    for node in &structure.segments {
        linearize_node(node, &mut records);
    }
    records
}

fn linearize_node(node: &StructureNode, records: &mut Vec<IdocRecord>) {
    match node {
        StructureNode::Group(group) => {
            records.push(IdocRecord::GroupBegin {
                group: group.code.clone(),
                max_occurs: group.max_occurs.unwrap_or_default(),
            });
            for child in &group.segments {
                linearize_node(child, records);
            }
            records.push(IdocRecord::GroupEnd {
                group: group.code.clone(),
            });
        }
        StructureNode::Segment(segment) => {
            records.push(IdocRecord::Segment {
                segment: segment.tag.clone(),
                type_name: segment.tag.clone(),
                max_occurs: segment.max_occurs,
            });
            for item in &segment.elements {
                match item {
                    ElementNode::Simple(element) => records.push(field_record(element)),
                    ElementNode::Composite(composite) => {
                        records.extend(composite.elements.iter().map(field_record));
                    }
                }
            }
        }
    }
}

fn field_record(element: &Element) -> IdocRecord {
    IdocRecord::Field {
        name: format!("E{}", element.code),
        length: if element.max_length == 0 {
            DEFAULT_FIELD_LENGTH
        } else {
            element.max_length
        },
        description: element.name.clone(),
    }
}

fn fixed_field(out: &mut XmlOut, name: &str, length: u32, key: bool, description: &str, content: Option<&str>) -> Result<()> {
    let mut attrs: Attrs = vec![("format", "fixed".to_string()), ("length", length.to_string())];
    if key {
        attrs.push(("key", "true".to_string()));
        attrs.push(("min", "1".to_string()));
    }
    if !description.is_empty() {
        attrs.push(("description", description.to_string()));
    }
    match content {
        Some(text) => out.text_element(name, &attrs, text),
        None => out.empty(name, &attrs),
    }
}

/// Emit the IDOC descriptor document for `records`
pub(crate) fn emit_records(records: &[IdocRecord], reference: &str, wrapper: &str) -> Result<String> {
    let mut out = XmlOut::new();
    out.declaration()?;
    out.open(
        "ixDOC",
        &vec![("format", "variable".to_string()), ("end", "\\r\\n or \\n".to_string())],
    )?;
    out.comment(reference)?;
    out.open(wrapper, &vec![("format", "none".to_string()), ("max", "n".to_string())])?;

    out.open(
        "EDI_DC40",
        &vec![("min", "1".to_string()), ("errorLevel", "true".to_string())],
    )?;
    for (index, (name, length)) in CONTROL_RECORD.iter().enumerate() {
        let content = (index == 0).then_some(CONTROL_TABLE_NAME);
        fixed_field(&mut out, name, *length, index == 0, "", content)?;
    }
    out.close("EDI_DC40")?;

    let mut open_segment: Option<&str> = None;
    let mut open_groups: Vec<String> = Vec::new();

    for record in records {
        match record {
            IdocRecord::GroupBegin { group, max_occurs } => {
                close_segment(&mut out, &mut open_segment)?;
                let name = format!("{group}_GROUP");
                let mut attrs: Attrs = vec![("format", "none".to_string())];
                if !max_occurs.is_one() {
                    attrs.push(("max", max_occurs.descriptor_value()));
                }
                out.open(&name, &attrs)?;
                open_groups.push(name);
            }
            IdocRecord::GroupEnd { group } => {
                close_segment(&mut out, &mut open_segment)?;
                let expected = format!("{group}_GROUP");
                match open_groups.pop() {
                    Some(name) if name == expected => out.close(&name)?,
                    Some(name) => {
                        return Err(Error::InvalidModel(format!(
                            "{group}{GROUP_END_SUFFIX} closes {name}"
                        )));
                    }
                    None => {
                        return Err(Error::InvalidModel(format!(
                            "{group}{GROUP_END_SUFFIX} without a matching begin"
                        )));
                    }
                }
            }
            IdocRecord::Segment {
                segment,
                type_name,
                max_occurs,
            } => {
                close_segment(&mut out, &mut open_segment)?;
                trace!("Emitting IDOC segment {} ({})", type_name, segment);
                let mut attrs: Attrs = Vec::new();
                if !max_occurs.is_one() {
                    attrs.push(("max", max_occurs.descriptor_value()));
                }
                attrs.push(("errorLevel", "true".to_string()));
                out.open(type_name, &attrs)?;
                fixed_field(&mut out, "SEGNAM", SEGNAM_LENGTH, true, "", Some(segment))?;
                for (name, length) in SEGMENT_ADMIN_FIELDS {
                    fixed_field(&mut out, name, length, false, "", None)?;
                }
                open_segment = Some(type_name);
            }
            IdocRecord::Field {
                name,
                length,
                description,
            } => {
                if open_segment.is_none() {
                    return Err(Error::InvalidModel(format!("field {name} outside a segment")));
                }
                fixed_field(&mut out, name, *length, false, description, None)?;
            }
        }
    }

    close_segment(&mut out, &mut open_segment)?;
    while let Some(name) = open_groups.pop() {
        warn!("Closing unterminated IDOC group {}", name);
        out.close(&name)?;
    }

    out.close(wrapper)?;
    out.close("ixDOC")?;
    out.finish()
}

fn close_segment(out: &mut XmlOut, open_segment: &mut Option<&str>) -> Result<()> {
    match open_segment.take() {
        Some(name) => out.close(name),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edi_structure::{Composite, Group, Requirement, Segment};

    fn sample() -> MessageStructure {
        let mut composite = Composite::new("C002", "DOCUMENT/MESSAGE NAME", Requirement::Conditional);
        composite.elements.push(
            Element::new("1001", "Document name code", Requirement::Conditional).with_format(
                edi_structure::DataType::Alphanumeric,
                1,
                3,
            ),
        );
        let bgm = Segment::new("BGM", Requirement::Mandatory).with_elements(vec![
            ElementNode::Composite(composite),
            ElementNode::Simple(Element::new("1225", "Message function code", Requirement::Conditional)),
        ]);
        let group = Group::new("SG1", MaxOccurs::Bounded(99))
            .with_segments(vec![StructureNode::Segment(Segment::new("RFF", Requirement::Mandatory))]);

        MessageStructure::new("IDOC", "", "ORDERS05")
            .with_segments(vec![StructureNode::Segment(bgm), StructureNode::Group(group)])
    }

    #[test]
    fn test_linearize_flattens_groups_and_composites() {
        let records = linearize(&sample());
        assert_eq!(
            records,
            vec![
                IdocRecord::Segment {
                    segment: "BGM".into(),
                    type_name: "BGM".into(),
                    max_occurs: MaxOccurs::Bounded(1),
                },
                IdocRecord::Field {
                    name: "E1001".into(),
                    length: 3,
                    description: "Document name code".into(),
                },
                IdocRecord::Field {
                    name: "E1225".into(),
                    length: DEFAULT_FIELD_LENGTH,
                    description: "Message function code".into(),
                },
                IdocRecord::GroupBegin {
                    group: "SG1".into(),
                    max_occurs: MaxOccurs::Bounded(99),
                },
                IdocRecord::Segment {
                    segment: "RFF".into(),
                    type_name: "RFF".into(),
                    max_occurs: MaxOccurs::Bounded(1),
                },
                IdocRecord::GroupEnd { group: "SG1".into() },
            ]
        );
    }

    #[test]
    fn test_records_from_json() {
        let json = r#"[
            {"Position": "E1EDK01_GROUP_BEGIN", "Max": "1"},
            {"Segment": "E2EDK01005", "Type": "E1EDK01", "Max": 1},
            {"Field": "CURCY", "Length": "3", "Description": "Currency"},
            {"Field": "WKURS", "Description": "Exchange rate"},
            {"Comment": "not a record"},
            {"Position": "E1EDK01_GROUP_END"}
        ]"#;

        let records = records_from_json(json).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(
            records[1],
            IdocRecord::Segment {
                segment: "E2EDK01005".into(),
                type_name: "E1EDK01".into(),
                max_occurs: MaxOccurs::Bounded(1),
            }
        );
        assert!(matches!(&records[2], IdocRecord::Field { length: 3, .. }));
        assert!(matches!(&records[3], IdocRecord::Field { length: DEFAULT_FIELD_LENGTH, .. }));
        assert_eq!(records[4], IdocRecord::GroupEnd { group: "E1EDK01".into() });
    }

    #[test]
    fn test_record_json_shape() {
        let record = IdocRecord::GroupBegin {
            group: "SG1".into(),
            max_occurs: MaxOccurs::Unbounded,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Position":"SG1_GROUP_BEGIN","Max":"unbounded"}"#);
        assert_eq!(serde_json::from_str::<IdocRecord>(&json).unwrap(), record);
    }

    #[test]
    fn test_emit_records_layout() {
        let xml = emit_records(&linearize(&sample()), "ORDERS0", "TRANSACTION").unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ixDOC format=\"variable\" end=\"\\r\\n or \\n\">"));
        assert!(xml.contains("<!-- ORDERS0 -->"));
        assert!(xml.contains(
            "<TABNAM format=\"fixed\" length=\"10\" key=\"true\" min=\"1\">EDI_DC40_U</TABNAM>"
        ));
        assert!(xml.contains("<SERIAL format=\"fixed\" length=\"20\"/>"));
        assert!(xml.contains("<BGM errorLevel=\"true\">"));
        assert!(xml.contains("<SEGNAM format=\"fixed\" length=\"30\" key=\"true\" min=\"1\">BGM</SEGNAM>"));
        assert!(xml.contains("<DOCNUM format=\"fixed\" length=\"16\"/>"));
        assert!(xml.contains("<E1001 format=\"fixed\" length=\"3\" description=\"Document name code\"/>"));
        assert!(xml.contains("<SG1_GROUP format=\"none\" max=\"99\">"));

        // RFF is closed before its group
        let rff_end = xml.find("</RFF>").unwrap();
        let group_end = xml.find("</SG1_GROUP>").unwrap();
        assert!(rff_end < group_end);
        assert!(xml.ends_with("</TRANSACTION>\n</ixDOC>\n"));
    }

    #[test]
    fn test_unbalanced_group_end_is_rejected() {
        let records = vec![IdocRecord::GroupEnd { group: "SG1".into() }];
        let err = emit_records(&records, "X", "TRANSACTION").unwrap_err();
        assert!(matches!(err, Error::InvalidModel(_)));
    }

    #[test]
    fn test_field_outside_segment_is_rejected() {
        let records = vec![IdocRecord::Field {
            name: "CURCY".into(),
            length: 3,
            description: String::new(),
        }];
        assert!(emit_records(&records, "X", "TRANSACTION").is_err());
    }
}
