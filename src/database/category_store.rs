use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Category, CategoryRow};
use crate::hierarchy::CategoryKind;

/// Read/write access to the category catalog.
///
/// `kind_of` is the classifier the entity store consults; the rest backs
/// category management.
#[async_trait]
pub trait CategoryCatalog: Send + Sync {
    /// Resolve a category's kind. `None` when the id is unknown or the stored
    /// kind is unset.
    async fn kind_of(&self, category_id: Uuid) -> Result<Option<CategoryKind>, DatabaseError>;

    async fn insert(&self, category: &Category) -> Result<(), DatabaseError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, DatabaseError>;

    async fn list_by_kind(&self, kind: &CategoryKind) -> Result<Vec<Category>, DatabaseError>;

    async fn list_all(&self) -> Result<Vec<Category>, DatabaseError>;
}

/// Kind lookup usable with a pool or inside an open transaction
pub async fn kind_of_with<'e, E>(executor: E, category_id: Uuid) -> Result<Option<CategoryKind>, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let raw: Option<String> = sqlx::query_scalar("SELECT type FROM z_category WHERE category_id = $1")
        .bind(category_id)
        .fetch_optional(executor)
        .await?;

    Ok(raw.and_then(|kind| {
        let parsed = CategoryKind::parse(&kind);
        if parsed.is_none() {
            tracing::warn!("Category {} has an empty kind", category_id);
        }
        parsed
    }))
}

#[derive(Clone)]
pub struct PgCategoryCatalog {
    pool: PgPool,
}

impl PgCategoryCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_categories(rows: Vec<CategoryRow>) -> Vec<Category> {
        rows.into_iter()
            .filter_map(|row| {
                let id = row.category_id;
                let category = row.into_category();
                if category.is_none() {
                    tracing::warn!("Skipping category {} with an empty kind", id);
                }
                category
            })
            .collect()
    }
}

#[async_trait]
impl CategoryCatalog for PgCategoryCatalog {
    async fn kind_of(&self, category_id: Uuid) -> Result<Option<CategoryKind>, DatabaseError> {
        kind_of_with(&self.pool, category_id).await
    }

    async fn insert(&self, category: &Category) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO z_category (category_id, name, type, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(category.kind.as_str())
        .bind(category.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, DatabaseError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT category_id, name, type, created_at FROM z_category WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(CategoryRow::into_category))
    }

    async fn list_by_kind(&self, kind: &CategoryKind) -> Result<Vec<Category>, DatabaseError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT category_id, name, type, created_at
             FROM z_category
             WHERE lower(type) = $1
             ORDER BY name",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(Self::into_categories(rows))
    }

    async fn list_all(&self) -> Result<Vec<Category>, DatabaseError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT category_id, name, type, created_at
             FROM z_category
             ORDER BY type, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(Self::into_categories(rows))
    }
}
