//! Thin layer over `quick_xml::Writer`
//!
//! Attribute values are written with only `&`, `<` and `"` escaped, so
//! separator characters such as `'` and `>` stay readable in `end` attributes.

use quick_xml::Writer;
use quick_xml::escape::minimal_escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::{Error, Result};

const INDENT_WIDTH: usize = 2;

/// Ordered attribute list of one element
pub(crate) type Attrs = Vec<(&'static str, String)>;

pub(crate) struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    pub(crate) fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH),
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Xml(e.to_string()))
    }

    pub(crate) fn declaration(&mut self) -> Result<()> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    pub(crate) fn comment(&mut self, text: &str) -> Result<()> {
        let body = format!(" {} ", text.replace("--", "-"));
        self.write(Event::Comment(BytesText::from_escaped(body)))
    }

    pub(crate) fn open(&mut self, name: &str, attrs: &Attrs) -> Result<()> {
        self.write(Event::Start(start_tag(name, attrs)))
    }

    pub(crate) fn close(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &Attrs) -> Result<()> {
        self.write(Event::Empty(start_tag(name, attrs)))
    }

    /// `<name attrs>text</name>` on one line
    pub(crate) fn text_element(&mut self, name: &str, attrs: &Attrs, text: &str) -> Result<()> {
        self.open(name, attrs)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    pub(crate) fn finish(self) -> Result<String> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))
    }
}

fn start_tag<'a>(name: &'a str, attrs: &'a Attrs) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attrs {
        let escaped = escape_attribute(value);
        start.push_attribute(Attribute::from((key.as_bytes(), escaped.as_bytes())));
    }
    start
}

/// `minimal_escape` covers `&` and `<`; values are double-quoted
fn escape_attribute(value: &str) -> String {
    minimal_escape(value).replace('"', "&quot;")
}
