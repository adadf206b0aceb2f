use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::hierarchy::CategoryKind;

/// Raw `z_category` row
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub category_id: Uuid,
    pub name: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub created_at: DateTime<Utc>,
}

impl CategoryRow {
    /// Convert to the domain type; a row with an unset kind yields `None`.
    pub fn into_category(self) -> Option<Category> {
        let kind = CategoryKind::parse(&self.kind)?;
        Some(Category {
            id: self.category_id,
            name: self.name,
            kind,
            created_at: self.created_at,
        })
    }
}
