use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::hierarchy::error::EntityError;
use crate::hierarchy::kind::{Attachment, CategoryKind};
use crate::hierarchy::path::EntityPath;

/// Input for both creation operations
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub category_id: Uuid,
    pub name: String,
    pub user_id: Option<String>,
    pub details: Map<String, Value>,
}

/// A persisted node of the hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub attachment: Attachment,
    pub parent_id: Option<Uuid>,
    pub path: EntityPath,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Build a new node with a fresh id, placed under `parent` (a path) or as a
    /// root. Attachment is decided by `kind`.
    pub fn create(
        input: NewEntity,
        kind: &CategoryKind,
        parent: Option<&EntityPath>,
    ) -> Result<Self, EntityError> {
        let attachment = Attachment::resolve(kind, input.user_id.as_deref(), input.details)?;
        let id = Uuid::new_v4();
        let (parent_id, path) = match parent {
            Some(parent_path) => (Some(parent_path.leaf()), EntityPath::child(parent_path, id)),
            None => (None, EntityPath::root(id)),
        };
        let now = Utc::now();
        Ok(Self {
            id,
            name: input.name,
            category_id: input.category_id,
            attachment,
            parent_id,
            path,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn depth(&self) -> i32 {
        self.path.depth()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.attachment.user_id()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Category data joined onto a node when assembling a hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
}

/// A node of an assembled tree. `children` is always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub id: Uuid,
    pub name: String,
    pub category: CategoryRef,
    pub user_id: Option<String>,
    pub parent_id: Option<Uuid>,
    pub path: EntityPath,
    pub depth: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub details: Map<String, Value>,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn from_entity(entity: Entity, category: CategoryRef) -> Self {
        let depth = entity.depth();
        let (user_id, details) = match entity.attachment {
            Attachment::Owner(user_id) => (Some(user_id), Map::new()),
            Attachment::Details(details) => (None, details),
        };
        Self {
            id: entity.id,
            name: entity.name,
            category,
            user_id,
            parent_id: entity.parent_id,
            path: entity.path,
            depth,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            details,
            children: Vec::new(),
        }
    }

    /// Every descendant in pre-order, without the node itself.
    pub fn descendants(&self) -> Vec<&HierarchyNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&HierarchyNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub fn find(&self, id: Uuid) -> Option<&HierarchyNode> {
        if self.id == id {
            return Some(self);
        }
        self.descendants().into_iter().find(|node| node.id == id)
    }
}

// Unwind iteratively so very deep trees cannot overflow the stack on drop
impl Drop for HierarchyNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// Decode a stored details column. Anything other than a JSON object yields
/// an empty payload instead of an error.
pub fn decode_details(entity_id: Uuid, raw: Option<Value>) -> Map<String, Value> {
    match raw {
        Some(Value::Object(map)) => map,
        None | Some(Value::Null) => Map::new(),
        Some(other) => {
            tracing::warn!(
                "Entity {} has undecodable details ({}), substituting empty payload",
                entity_id,
                json_type_name(&other)
            );
            Map::new()
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
