//! HTML helpers over the `scraper` DOM
//!
//! Directory pages encode structure in presentation markup: every listing
//! entry is an `.isotope-container`, and an entry belongs to a group when it
//! sits inside a `.collapse` region whose preceding sibling heading names that
//! group.

use scraper::{ElementRef, Html, Selector};

use crate::{Error, Result};

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Markup(format!("invalid selector '{css}': {e:?}")))
}

/// Collapse whitespace runs into single spaces and trim
pub(crate) fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated text of every descendant matching `selector`
pub(crate) fn text_of_all(element: ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

pub(crate) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Closest element carrying `class`, starting at `element` itself
pub(crate) fn closest_with_class<'a>(element: ElementRef<'a>, class: &str) -> Option<ElementRef<'a>> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|el| has_class(*el, class))
}

/// Immediately preceding sibling element, if it is a `tag` element
pub(crate) fn previous_sibling_tag<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .prev_siblings()
        .find_map(ElementRef::wrap)
        .filter(|el| el.value().name() == tag)
}

/// Text of a segment detail block
///
/// Detail pages carry the listing in `.segment-content pre`. Input without any
/// `<pre>` block is returned unchanged, so plain detail text passes through.
pub fn detail_text(markup: &str) -> Result<String> {
    if !markup.contains("<pre") {
        return Ok(markup.to_string());
    }

    let document = Html::parse_document(markup);
    let scoped = selector(".segment-content pre")?;
    let any_pre = selector("pre")?;

    let block = document
        .select(&scoped)
        .next()
        .or_else(|| document.select(&any_pre).next());

    Ok(block
        .map(|pre| pre.text().collect::<String>())
        .unwrap_or_default())
}
