//! Order-preserving assembly of listing markers into a message tree
//!
//! Segments are placed into the group whose region encloses them. Groups are
//! attached depth-first through the [`GroupHierarchy`], so a sub-group ends up
//! under its parent no matter where its entry sits in the listing. Sibling
//! order at every depth is restored from the listing index afterwards.

use std::collections::{BTreeMap, BTreeSet};

use edi_structure::attributes::listing_position;
use edi_structure::{Group, MessageStructure, Segment, StructureNode};
use tracing::{debug, info, warn};

use crate::directory::{GroupHierarchy, GroupMarker, ResolvedMarker};
use crate::{Error, Result};

/// A node together with the listing index it sorts by
#[derive(Debug)]
struct Placed {
    order: usize,
    node: StructureNode,
}

/// A group whose children are still being collected
#[derive(Debug)]
struct PendingGroup {
    marker: GroupMarker,
    children: Vec<Placed>,
}

/// Assemble resolved markers into the top-level sequence of `structure`
///
/// Every group named as a child in `hierarchy` is nested exactly once under
/// its parent. A group whose parent has no entry in the listing is promoted to
/// the top level. Groups that cannot be reached from the top level (a nesting
/// cycle) are reported as an [`Error::AssemblyInvariantViolation`].
pub fn assemble(
    structure: MessageStructure,
    markers: Vec<ResolvedMarker>,
    hierarchy: &GroupHierarchy,
) -> Result<MessageStructure> {
    let mut pending: BTreeMap<String, PendingGroup> = BTreeMap::new();
    let mut group_order: Vec<String> = Vec::new();
    let mut root: Vec<Placed> = Vec::new();

    // Groups first, so segments listed before their group's entry still find it
    let mut segments = Vec::new();
    for marker in markers {
        match marker {
            ResolvedMarker::Group(group) => {
                if pending.contains_key(&group.code) {
                    return Err(Error::invariant(group.code, "listed twice"));
                }
                group_order.push(group.code.clone());
                pending.insert(
                    group.code.clone(),
                    PendingGroup {
                        marker: group,
                        children: Vec::new(),
                    },
                );
            }
            ResolvedMarker::Segment { marker, elements } => segments.push((marker, elements)),
        }
    }

    for (marker, elements) in segments {
        let order = marker.original_position;
        let node = StructureNode::Segment(
            Segment::new(&marker.tag, marker.requirement)
                .with_max(marker.max_occurs)
                .with_position(listing_position(order))
                .with_description(&marker.description)
                .with_elements(elements),
        );
        let placed = Placed { order, node };

        match marker.parent.as_deref().and_then(|code| pending.get_mut(code)) {
            Some(group) => {
                debug!("Adding segment {} to parent group {}", marker.tag, group.marker.code);
                group.children.push(placed);
            }
            None => {
                if let Some(parent) = &marker.parent {
                    warn!("Parent group {} of segment {} not found, placing at top level", parent, marker.tag);
                }
                root.push(placed);
            }
        }
    }

    let mut emitted = BTreeSet::new();
    for code in &group_order {
        if emitted.contains(code) {
            continue;
        }
        let top_level = match hierarchy.parent_of(code) {
            None => true,
            Some(parent) if !group_order.iter().any(|known| known == parent) => {
                warn!("Parent group {} of {} not listed, promoting to top level", parent, code);
                true
            }
            Some(_) => false,
        };
        if top_level {
            root.push(attach_group(code, &mut pending, hierarchy, &mut emitted)?);
        }
    }

    if let Some(code) = pending.keys().next() {
        return Err(Error::invariant(code.clone(), "unreachable from the top level"));
    }

    let segments = into_sorted_nodes(root);
    let assembled = structure.with_segments(segments);
    info!(
        "Assembled {} {} {}: {} top-level entries, {} nodes in total",
        assembled.standard,
        assembled.revision,
        assembled.document,
        assembled.segments.len(),
        assembled.segment_count()
    );
    Ok(assembled)
}

/// Attach `code` and, depth-first, every sub-group below it
fn attach_group(
    code: &str,
    pending: &mut BTreeMap<String, PendingGroup>,
    hierarchy: &GroupHierarchy,
    emitted: &mut BTreeSet<String>,
) -> Result<Placed> {
    if !emitted.insert(code.to_string()) {
        return Err(Error::invariant(code, "attached more than once"));
    }
    let Some(PendingGroup { marker, mut children }) = pending.remove(code) else {
        return Err(Error::invariant(code, "no listing entry"));
    };

    for child in hierarchy.children_of(code) {
        if !pending.contains_key(child) && !emitted.contains(child) {
            debug!("Sub-group {} of {} has no listing entry, skipping", child, code);
            continue;
        }
        debug!("Nesting group {} under {}", child, code);
        children.push(attach_group(child, pending, hierarchy, emitted)?);
    }

    let order = marker.original_position;
    let group = Group::new(marker.code, marker.max_occurs)
        .with_position(listing_position(order))
        .with_description(marker.description)
        .with_segments(into_sorted_nodes(children));

    Ok(Placed {
        order,
        node: StructureNode::Group(group),
    })
}

/// Stable sort by listing index, dropping the index
fn into_sorted_nodes(mut placed: Vec<Placed>) -> Vec<StructureNode> {
    placed.sort_by_key(|p| p.order);
    placed.into_iter().map(|p| p.node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::SegmentMarker;
    use edi_structure::{MaxOccurs, Requirement};

    fn group(code: &str, position: usize) -> ResolvedMarker {
        ResolvedMarker::Group(GroupMarker {
            code: code.to_string(),
            max_occurs: MaxOccurs::Bounded(9),
            description: format!("{code} description"),
            original_position: position,
        })
    }

    fn segment(tag: &str, position: usize, parent: Option<&str>) -> ResolvedMarker {
        ResolvedMarker::Segment {
            marker: SegmentMarker {
                tag: tag.to_string(),
                description: String::new(),
                requirement: Requirement::Mandatory,
                max_occurs: MaxOccurs::Bounded(1),
                original_position: position,
                parent: parent.map(str::to_string),
            },
            elements: Vec::new(),
        }
    }

    fn codes(nodes: &[StructureNode]) -> Vec<&str> {
        nodes.iter().map(StructureNode::code).collect()
    }

    fn empty() -> MessageStructure {
        MessageStructure::new("EDIFACT", "D97A", "ORDERS")
    }

    #[test]
    fn test_sub_group_nested_exactly_once() {
        let mut hierarchy = GroupHierarchy::new();
        hierarchy.link("SG2", "SG3").unwrap();

        let markers = vec![
            segment("UNH", 0, None),
            group("SG2", 1),
            segment("NAD", 2, Some("SG2")),
            group("SG3", 3),
            segment("CTA", 4, Some("SG3")),
            segment("UNT", 5, None),
        ];

        let structure = assemble(empty(), markers, &hierarchy).unwrap();
        assert_eq!(codes(&structure.segments), ["UNH", "SG2", "UNT"]);

        let sg2 = structure.find_group("SG2").unwrap();
        assert_eq!(codes(&sg2.segments), ["NAD", "SG3"]);
        let sg3 = structure.find_group("SG3").unwrap();
        assert_eq!(codes(&sg3.segments), ["CTA"]);

        let mut seen = 0;
        structure.walk(|node, _| {
            if node.code() == "SG3" {
                seen += 1;
            }
        });
        assert_eq!(seen, 1);
        assert_eq!(structure.segment_count(), 6);
    }

    #[test]
    fn test_order_follows_listing_index_not_marker_order() {
        let mut hierarchy = GroupHierarchy::new();
        hierarchy.link("SG1", "SG2").unwrap();

        // Child group and its segment arrive before the parent entry
        let markers = vec![
            group("SG2", 4),
            segment("LOC", 5, Some("SG2")),
            segment("BGM", 1, None),
            group("SG1", 2),
            segment("RFF", 3, Some("SG1")),
            segment("UNH", 0, None),
        ];

        let structure = assemble(empty(), markers, &hierarchy).unwrap();
        assert_eq!(codes(&structure.segments), ["UNH", "BGM", "SG1"]);
        assert_eq!(structure.segments[0].position(), "0010");
        assert_eq!(structure.segments[2].position(), "0030");

        let sg1 = structure.find_group("SG1").unwrap();
        assert_eq!(codes(&sg1.segments), ["RFF", "SG2"]);
        assert_eq!(sg1.segments[1].position(), "0050");
    }

    /// Every ordering of `items` (Heap's algorithm)
    fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        fn heap<T: Clone>(k: usize, items: &mut Vec<T>, out: &mut Vec<Vec<T>>) {
            if k <= 1 {
                out.push(items.clone());
                return;
            }
            for i in 0..k {
                heap(k - 1, items, out);
                let swap_with = if k % 2 == 0 { i } else { 0 };
                if i + 1 < k {
                    items.swap(swap_with, k - 1);
                }
            }
        }

        let mut items = items.to_vec();
        let mut out = Vec::new();
        heap(items.len(), &mut items, &mut out);
        out
    }

    #[test]
    fn test_sibling_order_is_the_same_for_every_marker_permutation() {
        let mut hierarchy = GroupHierarchy::new();
        hierarchy.link("SG1", "SG2").unwrap();

        let markers = vec![
            segment("UNH", 0, None),
            segment("BGM", 1, None),
            group("SG1", 2),
            segment("RFF", 3, Some("SG1")),
            group("SG2", 4),
            segment("LOC", 5, Some("SG2")),
            segment("UNT", 6, None),
        ];

        let expected = assemble(empty(), markers.clone(), &hierarchy).unwrap();
        assert_eq!(codes(&expected.segments), ["UNH", "BGM", "SG1", "UNT"]);
        assert_eq!(codes(&expected.find_group("SG1").unwrap().segments), ["RFF", "SG2"]);
        assert_eq!(codes(&expected.find_group("SG2").unwrap().segments), ["LOC"]);

        let orderings = permutations(&markers);
        assert_eq!(orderings.len(), 5040);
        for ordering in orderings {
            let structure = assemble(empty(), ordering.clone(), &hierarchy).unwrap();
            assert_eq!(structure, expected, "marker order {:?}", ordering);
        }
    }

    #[test]
    fn test_group_with_unlisted_parent_is_promoted() {
        let mut hierarchy = GroupHierarchy::new();
        hierarchy.link("SG9", "SG10").unwrap();

        let markers = vec![group("SG10", 0), segment("PRI", 1, Some("SG10"))];
        let structure = assemble(empty(), markers, &hierarchy).unwrap();

        assert_eq!(codes(&structure.segments), ["SG10"]);
        assert_eq!(codes(&structure.find_group("SG10").unwrap().segments), ["PRI"]);
    }

    #[test]
    fn test_segment_with_unknown_parent_goes_to_root() {
        let markers = vec![segment("UNH", 0, None), segment("FTX", 1, Some("SG7"))];
        let structure = assemble(empty(), markers, &GroupHierarchy::new()).unwrap();
        assert_eq!(codes(&structure.segments), ["UNH", "FTX"]);
    }

    #[test]
    fn test_nesting_cycle_is_an_invariant_violation() {
        let mut hierarchy = GroupHierarchy::new();
        hierarchy.link("SG1", "SG2").unwrap();
        hierarchy.link("SG2", "SG1").unwrap();

        let markers = vec![group("SG1", 0), group("SG2", 1)];
        let err = assemble(empty(), markers, &hierarchy).unwrap_err();
        assert!(matches!(err, Error::AssemblyInvariantViolation { .. }));
    }

    #[test]
    fn test_duplicate_group_marker_is_rejected() {
        let markers = vec![group("SG1", 0), group("SG1", 1)];
        let err = assemble(empty(), markers, &GroupHierarchy::new()).unwrap_err();
        assert!(err.to_string().contains("SG1"));
    }

    #[test]
    fn test_group_attributes() {
        let structure = assemble(empty(), vec![group("SG1", 3)], &GroupHierarchy::new()).unwrap();
        let sg1 = structure.find_group("SG1").unwrap();
        assert_eq!(sg1.min_occurs, 0);
        assert_eq!(sg1.max_occurs, Some(MaxOccurs::Bounded(9)));
        assert_eq!(sg1.requirement, Requirement::Conditional);
        assert_eq!(sg1.position, "0040");
        assert_eq!(sg1.description, "SG1 description");
    }
}
