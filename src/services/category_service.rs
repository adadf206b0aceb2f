use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::category_store::{CategoryCatalog, PgCategoryCatalog};
use crate::database::manager::DatabaseError;
use crate::database::models::Category;
use crate::hierarchy::CategoryKind;

#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("Invalid category: {0}")]
    InvalidArgument(String),
    #[error("Category already exists: {0}")]
    AlreadyExists(String),
    #[error("Database manager error: {0}")]
    Database(#[from] DatabaseError),
}

pub struct CategoryService {
    catalog: Arc<dyn CategoryCatalog>,
}

impl CategoryService {
    pub fn new(catalog: Arc<dyn CategoryCatalog>) -> Self {
        Self { catalog }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(Arc::new(PgCategoryCatalog::new(pool)))
    }

    /// Register a new category. Names are unique across the catalog.
    pub async fn add_category(&self, name: &str, kind: &str) -> Result<Category, CategoryError> {
        let name = Self::validate_name(name)?;
        let kind = CategoryKind::parse(kind)
            .ok_or_else(|| CategoryError::InvalidArgument("category type cannot be empty".to_string()))?;

        if self.catalog.find_by_name(&name).await?.is_some() {
            return Err(CategoryError::AlreadyExists(name));
        }

        let category = Category {
            id: Uuid::new_v4(),
            name,
            kind,
            created_at: Utc::now(),
        };

        // A concurrent insert can still win the race; the unique index reports it
        match self.catalog.insert(&category).await {
            Ok(()) => {}
            Err(DatabaseError::Sqlx(sqlx::Error::Database(db_err))) if db_err.is_unique_violation() => {
                return Err(CategoryError::AlreadyExists(category.name));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!("Added category '{}' ({})", category.name, category.kind);
        Ok(category)
    }

    /// `None` when no category carries that name
    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>, CategoryError> {
        Ok(self.catalog.find_by_name(name.trim()).await?)
    }

    pub async fn get_categories_by_kind(&self, kind: &str) -> Result<Vec<Category>, CategoryError> {
        let kind = CategoryKind::parse(kind)
            .ok_or_else(|| CategoryError::InvalidArgument("category type cannot be empty".to_string()))?;
        Ok(self.catalog.list_by_kind(&kind).await?)
    }

    pub async fn list_all_categories(&self) -> Result<Vec<Category>, CategoryError> {
        Ok(self.catalog.list_all().await?)
    }

    fn validate_name(name: &str) -> Result<String, CategoryError> {
        let name = name.trim();
        let len = name.chars().count();
        if !(2..=50).contains(&len) {
            return Err(CategoryError::InvalidArgument(format!(
                "category name must be between 2 and 50 characters, got {}",
                len
            )));
        }
        Ok(name.to_string())
    }
}
