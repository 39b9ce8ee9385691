use std::collections::HashMap;

use super::{ROOT, TemplateError};

/// Index of a block in a template's block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    pub const ROOT: BlockId = BlockId(0);
}

/// One piece of a block's current content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Literal text, including anything already resolved into this block.
    Text(String),
    /// Where a block was extracted. A resolved unit carries the slots of its
    /// own children up into the parent. Never part of the rendered text.
    Slot(BlockId),
}

/// A block discovered during preprocessing.
#[derive(Debug, Clone)]
pub(crate) struct BlockNode {
    /// Qualified path, always starting with [`ROOT`].
    pub path: String,
    pub parent: Option<BlockId>,
    pub segments: Vec<Segment>,
}

/// Arena of blocks addressed by [`BlockId`], with a path index.
///
/// Node 0 is always the root. Children are pushed after their parent, so
/// iteration order is discovery order.
#[derive(Debug, Clone)]
pub(crate) struct BlockTable {
    nodes: Vec<BlockNode>,
    by_path: HashMap<String, BlockId>,
}

impl BlockTable {
    pub fn new() -> Self {
        let root = BlockNode {
            path: ROOT.to_string(),
            parent: None,
            segments: Vec::new(),
        };
        Self {
            by_path: HashMap::from([(root.path.clone(), BlockId::ROOT)]),
            nodes: vec![root],
        }
    }

    /// Register `name` as a child of `parent`.
    ///
    /// Fails if `parent` already has a child with that name.
    pub fn add_child(&mut self, parent: BlockId, name: &str) -> Result<BlockId, TemplateError> {
        let path = format!("{}.{name}", self.node(parent).path);
        if self.by_path.contains_key(&path) {
            return Err(TemplateError::DuplicateBlock { path });
        }

        let id = BlockId(self.nodes.len());
        self.by_path.insert(path.clone(), id);
        self.nodes.push(BlockNode {
            path,
            parent: Some(parent),
            segments: Vec::new(),
        });
        Ok(id)
    }

    pub fn node(&self, id: BlockId) -> &BlockNode {
        &self.nodes[id.0]
    }

    pub fn set_segments(&mut self, id: BlockId, segments: Vec<Segment>) {
        self.nodes[id.0].segments = segments;
    }

    pub fn lookup(&self, path: &str) -> Option<BlockId> {
        self.by_path.get(path).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockNode> {
        self.nodes.iter()
    }

    /// Current content of `id` as text, with each slot written as its placeholder.
    #[cfg(test)]
    pub fn flatten(&self, id: BlockId) -> String {
        let mut out = String::new();
        for segment in &self.node(id).segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(block) => out.push_str(&self.node(*block).path),
            }
        }
        out
    }

    /// Insert `resolved` into `parent` directly before the slot of `child`.
    ///
    /// The slot stays in place, so splicing the same child again appends after
    /// the previous unit. Returns false if `parent` has no slot for `child`.
    pub fn splice(&mut self, parent: BlockId, child: BlockId, resolved: Vec<Segment>) -> bool {
        let segments = &mut self.nodes[parent.0].segments;
        let Some(slot) = segments.iter().position(|s| *s == Segment::Slot(child)) else {
            return false;
        };

        let tail = segments.split_off(slot);
        for segment in resolved.into_iter().chain(tail) {
            push_segment(segments, segment);
        }
        true
    }
}

/// Append `segment`, merging adjacent text and dropping empty text.
fn push_segment(segments: &mut Vec<Segment>, segment: Segment) {
    match segment {
        Segment::Text(text) if text.is_empty() => {}
        Segment::Text(text) => {
            if let Some(Segment::Text(last)) = segments.last_mut() {
                last.push_str(&text);
            } else {
                segments.push(Segment::Text(text));
            }
        }
        slot @ Segment::Slot(_) => segments.push(slot),
    }
}

/// The text of `segments` with every slot left out.
pub(crate) fn text_without_slots(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Text(text) => Some(text.as_str()),
            Segment::Slot(_) => None,
        })
        .collect()
}
