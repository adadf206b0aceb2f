use std::collections::HashMap;
use uuid::Uuid;

use crate::hierarchy::error::EntityError;
use crate::hierarchy::node::{Entity, HierarchyNode};

/// How far below an entity a listing reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListDepth {
    /// Direct children only (level 0)
    Direct,
    /// Every descendant (level -1)
    All,
    /// Descendants at most `n` hops below (level n > 0)
    UpTo(u32),
}

impl ListDepth {
    pub fn from_level(level: i32) -> Result<Self, EntityError> {
        match level {
            -1 => Ok(ListDepth::All),
            0 => Ok(ListDepth::Direct),
            n if n > 0 => Ok(ListDepth::UpTo(n as u32)),
            _ => Err(EntityError::InvalidArgument(
                "invalid level: must be -1 (all levels), 0 (direct children only), or a positive integer"
                    .to_string(),
            )),
        }
    }

    /// Deepest relative depth included, `None` when unbounded.
    pub fn max_hops(&self) -> Option<i32> {
        match self {
            ListDepth::Direct => Some(1),
            ListDepth::All => None,
            ListDepth::UpTo(n) => Some(i32::try_from(*n).unwrap_or(i32::MAX)),
        }
    }

    pub fn includes(&self, hops: i32) -> bool {
        hops >= 1 && self.max_hops().map_or(true, |max| hops <= max)
    }
}

/// Listing order: depth, then name, then id so ties are deterministic.
pub fn sort_entities(entities: &mut [Entity]) {
    entities.sort_by(|a, b| {
        a.depth()
            .cmp(&b.depth())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Nest a flat set of rows under `root_id`.
///
/// Rows are ordered by depth, so walking them backwards visits every child
/// before its parent; each node is moved into its parent's `children` once it
/// is complete. One pass, no recursion.
pub fn assemble(root_id: Uuid, mut nodes: Vec<HierarchyNode>) -> Result<HierarchyNode, EntityError> {
    nodes.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });

    let index: HashMap<Uuid, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id, i))
        .collect();
    let root_index = *index
        .get(&root_id)
        .ok_or(EntityError::EntityNotFound(root_id))?;

    let mut slots: Vec<Option<HierarchyNode>> = nodes.into_iter().map(Some).collect();

    for i in (0..slots.len()).rev() {
        if i == root_index {
            continue;
        }
        let Some(mut node) = slots[i].take() else {
            continue;
        };
        // Children were pushed deepest-last-name-first
        node.children.reverse();

        let parent = node
            .parent_id
            .and_then(|parent_id| index.get(&parent_id).copied())
            .and_then(|p| slots[p].as_mut());
        match parent {
            Some(parent) => parent.children.push(node),
            None => tracing::warn!(
                "Dropping entity {} from hierarchy of {}: parent not in result set",
                node.id,
                root_id
            ),
        }
    }

    let mut root = slots[root_index]
        .take()
        .ok_or(EntityError::EntityNotFound(root_id))?;
    root.children.reverse();
    Ok(root)
}
