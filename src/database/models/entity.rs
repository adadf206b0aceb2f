use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::hierarchy::node::decode_details;
use crate::hierarchy::{Attachment, CategoryKind, CategoryRef, Entity, EntityError, EntityPath, HierarchyNode};

/// Raw `z_entity` row
#[derive(Debug, Clone, FromRow)]
pub struct EntityRow {
    pub entity_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub user_id: Option<String>,
    pub details: Option<Value>,
    pub parent_id: Option<Uuid>,
    pub path: Vec<Uuid>,
    pub depth: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `z_entity` row joined with its category
#[derive(Debug, Clone, FromRow)]
pub struct EntityCategoryRow {
    #[sqlx(flatten)]
    pub entity: EntityRow,
    pub category_name: String,
    pub category_type: String,
}

impl TryFrom<EntityRow> for Entity {
    type Error = EntityError;

    fn try_from(row: EntityRow) -> Result<Self, Self::Error> {
        let path = EntityPath::from_ids(row.path)
            .ok_or_else(|| EntityError::Integrity(format!("entity {} has an empty path", row.entity_id)))?;
        if path.depth() != row.depth || path.leaf() != row.entity_id || path.parent() != row.parent_id {
            return Err(EntityError::Integrity(format!(
                "entity {} path {} disagrees with depth {} / parent {:?}",
                row.entity_id, path, row.depth, row.parent_id
            )));
        }

        let attachment = match row.user_id {
            Some(user_id) => Attachment::Owner(user_id),
            None => Attachment::Details(decode_details(row.entity_id, row.details)),
        };

        Ok(Entity {
            id: row.entity_id,
            name: row.name,
            category_id: row.category_id,
            attachment,
            parent_id: row.parent_id,
            path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<EntityCategoryRow> for HierarchyNode {
    type Error = EntityError;

    fn try_from(row: EntityCategoryRow) -> Result<Self, Self::Error> {
        let kind = CategoryKind::parse(&row.category_type).ok_or_else(|| {
            EntityError::Integrity(format!("category {} has no kind", row.entity.category_id))
        })?;
        let category = CategoryRef {
            id: row.entity.category_id,
            name: row.category_name,
            kind,
        };
        let entity = Entity::try_from(row.entity)?;
        Ok(HierarchyNode::from_entity(entity, category))
    }
}
