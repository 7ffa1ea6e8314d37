//! File and reference names derived from a message request

use crate::dialect::Dialect;

/// IDOC reference name: the message code without its version digit
///
/// `ORDERS02` and `ORDERS05` both give `ORDERS0`.
pub fn reference_name(message: &str) -> String {
    let keep = message.chars().count().saturating_sub(1);
    message.chars().take(keep).collect()
}

/// File name of the data normalizer descriptor
///
/// `DN__<Standard>-<Revision>-<Document>.xml` for delimited dialects and
/// `DN__IDoc-Fixed-<Document>-<Reference>.xml` for IDOC.
pub fn descriptor_file_name(dialect: Dialect, standard: &str, revision: &str, document: &str) -> String {
    match dialect {
        Dialect::Idoc => format!("DN__IDoc-Fixed-{}-{}.xml", document, reference_name(document)),
        Dialect::Edifact | Dialect::X12 => format!("DN__{standard}-{revision}-{document}.xml"),
    }
}

/// Path of the message body fragment below the fragment root
pub fn fragment_path(dialect: Dialect, revision: &str, document: &str) -> String {
    let dir = dialect.spec().fragment_dir;
    match dialect {
        Dialect::Idoc => format!("{dir}/{}.xml", document.to_uppercase()),
        Dialect::Edifact | Dialect::X12 => format!(
            "{dir}/{}/{}.xml",
            revision.to_uppercase(),
            document.to_uppercase()
        ),
    }
}

/// Entity name the interchange uses for the message body
pub fn body_entity(dialect: Dialect, document: &str) -> String {
    let prefix = dialect.spec().envelope.map_or("", |envelope| envelope.body_prefix);
    format!("{prefix}{document}")
}
