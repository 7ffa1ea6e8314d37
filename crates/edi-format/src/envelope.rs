//! Interchange wrapper of delimited dialects
//!
//! The wrapper only declares entities for the envelope fragments and the
//! message body and references them in order; the fragments themselves live
//! under the fragment root.

use crate::dialect::{Dialect, Envelope, Separators};
use crate::naming::{body_entity, fragment_path};

const INDENT: &str = "    ";

/// ixDOC document including the envelope fragments and the message body
pub(crate) fn interchange_document(
    dialect: Dialect,
    separators: &Separators,
    envelope: &Envelope,
    revision: &str,
    document: &str,
    fragment_root: &str,
) -> String {
    let spec = dialect.spec();
    let root = fragment_root.trim_end_matches('/');
    let body = body_entity(dialect, document);

    let mut entities: Vec<(String, String)> = envelope
        .header
        .iter()
        .map(|name| (name.to_string(), format!("{root}/{}/{name}.xml", spec.fragment_dir)))
        .collect();
    entities.push((body, format!("{root}/{}", fragment_path(dialect, revision, document))));
    entities.extend(
        envelope
            .trailer
            .iter()
            .map(|name| (name.to_string(), format!("{root}/{}/{name}.xml", spec.fragment_dir))),
    );

    let mut lines = vec![
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
        "<!DOCTYPE doc [".to_string(),
    ];
    lines.extend(
        entities
            .iter()
            .map(|(name, system)| format!("{INDENT}<!ENTITY {name} SYSTEM \"{system}\">")),
    );
    lines.push("]>".to_string());
    lines.push(format!(
        "<ixDOC format=\"variable\" segChar=\"{}\" elChar=\"{}\" compChar=\"{}\" emptyEnd=\"true\" lastEnd=\"false\">",
        separators.segment, separators.element, separators.component
    ));
    lines.push(format!("{INDENT}<{} format=\"none\" max=\"n\">", spec.root_wrapper));
    lines.extend(entities.iter().map(|(name, _)| format!("{INDENT}{INDENT}&{name};")));
    lines.push(format!("{INDENT}</{}>", spec.root_wrapper));
    lines.push("</ixDOC>".to_string());

    let mut content = lines.join("\n");
    content.push('\n');
    content
}
