use std::collections::HashMap;

use tracing::{debug, trace};

use crate::task::Tag;

pub const DEFAULT_DELIMITER: &str = "/";

/// One segment of a hierarchical tag name.
///
/// A node with no `tag` is a ghost: it only exists to connect the segments of
/// deeper tags and never renders as a clickable leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTreeNode {
    pub segment: String,
    pub full_path: String,
    pub tag: Option<Tag>,
    pub children: Vec<TagTreeNode>,
}

impl TagTreeNode {
    pub fn is_ghost(&self) -> bool {
        self.tag.is_none()
    }

    pub fn is_renderable_leaf(&self) -> bool {
        self.children.is_empty() && self.tag.is_some()
    }

    /// First color found depth-first, starting with this node.
    pub fn effective_color(&self) -> Option<&str> {
        if let Some(color) = self.tag.as_ref().and_then(|tag| tag.color.as_deref()) {
            return Some(color);
        }
        self.children.iter().find_map(TagTreeNode::effective_color)
    }

    /// Tags in this subtree, this node included.
    pub fn tag_count(&self) -> usize {
        usize::from(self.tag.is_some()) + self.descendant_tag_count()
    }

    pub fn descendant_tag_count(&self) -> usize {
        self.children.iter().map(TagTreeNode::tag_count).sum()
    }
}

pub fn build_tree(tags: &[Tag]) -> Vec<TagTreeNode> {
    build_tree_with(tags, DEFAULT_DELIMITER)
}

#[derive(Debug)]
struct Slot {
    segment: String,
    full_path: String,
    tag: Option<Tag>,
    children: Vec<usize>,
}

/// Builds the tree for `tags`, splitting names on `delimiter`.
///
/// Segments are trimmed and empty ones dropped, so `"Area//Sub "` and
/// `"Area/Sub"` land on the same node. Siblings keep first-seen order. When
/// two tags resolve to the same path, the first keeps the node.
#[tracing::instrument(level = "debug", skip(tags), fields(tag_count = tags.len()))]
pub fn build_tree_with(tags: &[Tag], delimiter: &str) -> Vec<TagTreeNode> {
    let delimiter = if delimiter.is_empty() {
        DEFAULT_DELIMITER
    } else {
        delimiter
    };

    let mut slots: Vec<Slot> = Vec::new();
    let mut by_path: HashMap<String, usize> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();

    for tag in tags {
        let segments: Vec<&str> = tag
            .name
            .split(delimiter)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect();

        if segments.is_empty() {
            debug!(tag_id = tag.id, name = %tag.name, "skipping tag with empty name");
            continue;
        }

        let mut parent: Option<usize> = None;
        let mut path = String::new();

        for segment in &segments {
            if !path.is_empty() {
                path.push_str(delimiter);
            }
            path.push_str(segment);

            let idx = match by_path.get(&path) {
                Some(idx) => *idx,
                None => {
                    let idx = slots.len();
                    slots.push(Slot {
                        segment: segment.to_string(),
                        full_path: path.clone(),
                        tag: None,
                        children: Vec::new(),
                    });
                    by_path.insert(path.clone(), idx);
                    match parent {
                        Some(parent_idx) => slots[parent_idx].children.push(idx),
                        None => roots.push(idx),
                    }
                    trace!(path = %path, "created tag tree node");
                    idx
                }
            };
            parent = Some(idx);
        }

        if let Some(idx) = parent {
            let slot = &mut slots[idx];
            if slot.tag.is_none() {
                slot.tag = Some(tag.clone());
            } else {
                debug!(
                    path = %slot.full_path,
                    kept = ?slot.tag.as_ref().map(|t| t.id),
                    dropped = tag.id,
                    "duplicate tag path; keeping first"
                );
            }
        }
    }

    roots.iter().map(|idx| assemble(&slots, *idx)).collect()
}

fn assemble(slots: &[Slot], idx: usize) -> TagTreeNode {
    let slot = &slots[idx];
    TagTreeNode {
        segment: slot.segment.clone(),
        full_path: slot.full_path.clone(),
        tag: slot.tag.clone(),
        children: slot
            .children
            .iter()
            .map(|child| assemble(slots, *child))
            .collect(),
    }
}

pub fn find<'a>(nodes: &'a [TagTreeNode], full_path: &str) -> Option<&'a TagTreeNode> {
    nodes.iter().find_map(|node| {
        if node.full_path == full_path {
            Some(node)
        } else {
            find(&node.children, full_path)
        }
    })
}

/// Pre-order walk with depths, the order a sidebar lists nodes in.
pub fn flatten(nodes: &[TagTreeNode]) -> Vec<(usize, &TagTreeNode)> {
    fn walk<'a>(nodes: &'a [TagTreeNode], depth: usize, out: &mut Vec<(usize, &'a TagTreeNode)>) {
        for node in nodes {
            out.push((depth, node));
            walk(&node.children, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    walk(nodes, 0, &mut out);
    out
}
