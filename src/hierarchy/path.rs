use serde::Serialize;
use uuid::Uuid;

/// Materialized ancestry of an entity: root first, the entity itself last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EntityPath(Vec<Uuid>);

impl EntityPath {
    pub fn root(id: Uuid) -> Self {
        Self(vec![id])
    }

    /// Path of a new child: the parent's path with `id` appended.
    pub fn child(parent: &EntityPath, id: Uuid) -> Self {
        let mut ids = Vec::with_capacity(parent.0.len() + 1);
        ids.extend_from_slice(&parent.0);
        ids.push(id);
        Self(ids)
    }

    /// Rebuild from stored ids. Returns `None` for an empty sequence.
    pub fn from_ids(ids: Vec<Uuid>) -> Option<Self> {
        if ids.is_empty() {
            None
        } else {
            Some(Self(ids))
        }
    }

    pub fn depth(&self) -> i32 {
        self.0.len() as i32 - 1
    }

    pub fn leaf(&self) -> Uuid {
        self.0[self.0.len() - 1]
    }

    pub fn parent(&self) -> Option<Uuid> {
        self.0.len().checked_sub(2).map(|i| self.0[i])
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.0.contains(&id)
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.0
    }
}

impl std::fmt::Display for EntityPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<String> = self.0.iter().map(|id| id.simple().to_string()).collect();
        f.write_str(&joined.join("."))
    }
}
