//! Directory listing extraction
//!
//! Reads a message's directory page into an ordered list of group and segment
//! markers. Every marker remembers its index in the listing; that index, not
//! the order markers are attached in, decides the final sibling order.
//!
//! Group nesting is discovered once for the whole page and kept as a
//! [`GroupHierarchy`]: a child group may be listed before the entry of the
//! group that encloses it, so assembly needs the complete map up front.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use edi_structure::{ElementNode, MaxOccurs, Requirement};
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

use crate::detail::{DetailConfig, parse_segment_detail};
use crate::diagnostics::{SkipReason, Skipped};
use crate::markup::{closest_with_class, detail_text, normalize_ws, previous_sibling_tag, selector, text_of_all};
use crate::source::MarkupSource;
use crate::{Error, Result};

const LISTING_CONTEXT: &str = "listing";

static GROUP_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SG(\d+)").expect("group code pattern is a valid regex"));

static GROUP_OCCURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"C\((\d+)\)").expect("group occurrence pattern is a valid regex"));

static SEGMENT_OCCURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([MC])\((\d+)\)").expect("segment occurrence pattern is a valid regex"));

static SEGMENT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("segment tag pattern is a valid regex"));

/// A segment group entry of the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMarker {
    /// Group code (`SG<n>`)
    pub code: String,
    pub max_occurs: MaxOccurs,
    pub description: String,
    /// Index of the entry in the listing
    pub original_position: usize,
}

/// A segment entry of the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMarker {
    pub tag: String,
    pub description: String,
    pub requirement: Requirement,
    pub max_occurs: MaxOccurs,
    /// Index of the entry in the listing
    pub original_position: usize,
    /// Group whose region encloses the entry
    pub parent: Option<String>,
}

/// A listing entry in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Group(GroupMarker),
    Segment(SegmentMarker),
}

impl Marker {
    pub fn original_position(&self) -> usize {
        match self {
            Self::Group(group) => group.original_position,
            Self::Segment(segment) => segment.original_position,
        }
    }
}

/// A marker whose segment detail has been parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedMarker {
    Group(GroupMarker),
    Segment {
        marker: SegmentMarker,
        elements: Vec<ElementNode>,
    },
}

/// Parent/child relationships between groups, built once per page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupHierarchy {
    parent_of: BTreeMap<String, String>,
    children: BTreeMap<String, Vec<String>>,
}

impl GroupHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `child` is nested directly under `parent`
    ///
    /// A group has at most one parent; relinking it elsewhere is a defect in
    /// the listing and is reported rather than resolved.
    pub fn link(&mut self, parent: impl Into<String>, child: impl Into<String>) -> Result<()> {
        let parent = parent.into();
        let child = child.into();

        if parent == child {
            return Err(Error::invariant(child, "group is nested under itself"));
        }
        if let Some(existing) = self.parent_of.get(&child) {
            if *existing == parent {
                return Ok(());
            }
            return Err(Error::invariant(
                child,
                format!("nested under both {existing} and {parent}"),
            ));
        }

        self.children.entry(parent.clone()).or_default().push(child.clone());
        self.parent_of.insert(child, parent);
        Ok(())
    }

    pub fn parent_of(&self, child: &str) -> Option<&str> {
        self.parent_of.get(child).map(String::as_str)
    }

    /// Direct sub-groups of `parent` in discovery order
    pub fn children_of(&self, parent: &str) -> &[String] {
        self.children.get(parent).map_or(&[], Vec::as_slice)
    }

    /// Whether `code` is nested under another group
    pub fn is_sub_group(&self, code: &str) -> bool {
        self.parent_of.contains_key(code)
    }

    pub fn is_empty(&self) -> bool {
        self.parent_of.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parent_of.len()
    }
}

/// All markers of a directory page plus the group hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub markers: Vec<Marker>,
    pub hierarchy: GroupHierarchy,
    pub skipped: Vec<Skipped>,
}

/// A listing whose segments carry their parsed details
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedListing {
    pub markers: Vec<ResolvedMarker>,
    pub hierarchy: GroupHierarchy,
    pub skipped: Vec<Skipped>,
}

/// Group code (`SG<n>`) named in a heading
fn group_code(text: &str) -> Option<String> {
    GROUP_CODE.captures(text).map(|caps| format!("SG{}", &caps[1]))
}

/// Group named by the heading just before the closest enclosing `.collapse`
fn enclosing_group(entry: ElementRef<'_>) -> Option<String> {
    let region = closest_with_class(entry, "collapse")?;
    let heading = previous_sibling_tag(region, "h3")?;
    group_code(&heading.text().collect::<String>())
}

fn parse_count(raw: &str) -> MaxOccurs {
    raw.parse().map_or_else(|_| MaxOccurs::default(), MaxOccurs::Bounded)
}

/// Read the directory page of a message into markers and group hierarchy
pub fn read_listing(markup: &str) -> Result<DirectoryListing> {
    let document = Html::parse_document(markup);
    let entries = selector(".isotope-container")?;
    let headings = selector("h3")?;
    let segment_links = selector("h3.deep a")?;
    let paragraphs = selector("p")?;

    let mut listing = DirectoryListing::default();
    let mut seen_groups: BTreeMap<String, usize> = BTreeMap::new();

    for (index, entry) in document.select(&entries).enumerate() {
        let title = text_of_all(entry, &headings);
        let description = normalize_ws(&text_of_all(entry, &paragraphs));
        let parent = enclosing_group(entry);

        if let Some(code) = group_code(&title) {
            if let Some(first) = seen_groups.insert(code.clone(), index) {
                return Err(Error::invariant(
                    code,
                    format!("listed twice (entries {first} and {index})"),
                ));
            }

            let max_occurs = GROUP_OCCURS
                .captures(&title)
                .map_or_else(MaxOccurs::default, |caps| parse_count(&caps[1]));

            if let Some(parent) = parent {
                debug!("Relationship detected: {} is parent of {}", parent, code);
                listing.hierarchy.link(parent, code.clone())?;
            }

            listing.markers.push(Marker::Group(GroupMarker {
                code,
                max_occurs,
                description,
                original_position: index,
            }));
            continue;
        }

        let tag = normalize_ws(&text_of_all(entry, &segment_links));
        if tag.is_empty() {
            listing.skipped.push(Skipped::new(
                LISTING_CONTEXT,
                index,
                normalize_ws(&title),
                SkipReason::UnrecognizedEntry,
            ));
            continue;
        }
        if !SEGMENT_TAG.is_match(&tag) {
            listing
                .skipped
                .push(Skipped::new(LISTING_CONTEXT, index, tag, SkipReason::InvalidSegmentTag));
            continue;
        }

        // Occurrence annotation sits in the entry text outside its heading
        let full_text = entry.text().collect::<String>();
        let remainder = full_text.replacen(&title, "", 1);
        let (requirement, max_occurs) = match SEGMENT_OCCURS.captures(&remainder) {
            Some(caps) => {
                let requirement = if remainder.contains("M(") {
                    Requirement::Mandatory
                } else {
                    Requirement::Conditional
                };
                (requirement, parse_count(&caps[2]))
            }
            None => (Requirement::Conditional, MaxOccurs::default()),
        };

        listing.markers.push(Marker::Segment(SegmentMarker {
            tag,
            description,
            requirement,
            max_occurs,
            original_position: index,
            parent,
        }));
    }

    info!(
        "Read {} listing entries ({} group relationships, {} skipped)",
        listing.markers.len(),
        listing.hierarchy.len(),
        listing.skipped.len()
    );
    Ok(listing)
}

impl DirectoryListing {
    /// Parse the detail of every segment marker through `source`
    ///
    /// Details are best-effort: a segment whose detail cannot be supplied gets
    /// no elements and extraction continues. Each tag is fetched once.
    pub fn resolve(
        self,
        source: &dyn MarkupSource,
        revision: &str,
        config: &DetailConfig,
    ) -> ResolvedListing {
        let DirectoryListing {
            markers,
            hierarchy,
            mut skipped,
        } = self;

        let mut details: BTreeMap<String, Vec<ElementNode>> = BTreeMap::new();
        let mut resolved = Vec::with_capacity(markers.len());

        for marker in markers {
            match marker {
                Marker::Group(group) => resolved.push(ResolvedMarker::Group(group)),
                Marker::Segment(segment) => {
                    if !details.contains_key(&segment.tag) {
                        let (elements, mut lines_skipped) =
                            segment_elements(source, revision, &segment.tag, config);
                        skipped.append(&mut lines_skipped);
                        details.insert(segment.tag.clone(), elements);
                    }
                    let elements = details.get(&segment.tag).cloned().unwrap_or_default();
                    resolved.push(ResolvedMarker::Segment {
                        marker: segment,
                        elements,
                    });
                }
            }
        }

        ResolvedListing {
            markers: resolved,
            hierarchy,
            skipped,
        }
    }
}

/// Fetch and parse the detail of one segment; failures yield no elements
pub(crate) fn segment_elements(
    source: &dyn MarkupSource,
    revision: &str,
    tag: &str,
    config: &DetailConfig,
) -> (Vec<ElementNode>, Vec<Skipped>) {
    let text = source
        .segment_detail(revision, tag)
        .and_then(|markup| detail_text(&markup));

    match text {
        Ok(text) => {
            let detail = parse_segment_detail(tag, &text, config);
            (detail.elements, detail.skipped)
        }
        Err(e) => {
            warn!("Error extracting segment details for {}: {}", tag, e);
            (Vec::new(), Vec::new())
        }
    }
}
