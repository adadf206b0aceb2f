use sqlx::PgPool;
use std::sync::Arc;

use crate::database::manager::DatabaseError;
use crate::database::models::{ProfileUpdate, UserProfile};
use crate::database::user_store::{PgUserStore, UserStore};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Invalid user request: {0}")]
    InvalidArgument(String),
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("Database manager error: {0}")]
    Database(#[from] DatabaseError),
}

pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(Arc::new(PgUserStore::new(pool)))
    }

    pub async fn get_user_details(&self, user_id: &str) -> Result<UserProfile, UserError> {
        let user_id = require_user_id(user_id)?;
        self.store
            .find(user_id)
            .await?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))
    }

    /// Create or update the caller's profile. A parent link is only recorded
    /// on creation and must name another existing user.
    pub async fn update_user_details(
        &self,
        user_id: &str,
        mut update: ProfileUpdate,
    ) -> Result<UserProfile, UserError> {
        let user_id = require_user_id(user_id)?;
        update.parent_id = update.parent_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());

        if let Some(parent_id) = &update.parent_id {
            if parent_id == user_id {
                return Err(UserError::InvalidArgument("a user cannot be their own parent".to_string()));
            }
            if self.store.find(parent_id).await?.is_none() {
                return Err(UserError::InvalidArgument(format!("parent user {} does not exist", parent_id)));
            }
        }

        Ok(self.store.upsert(user_id, &update).await?)
    }

    pub async fn check_has_parent(&self, user_id: &str) -> Result<bool, UserError> {
        let user_id = require_user_id(user_id)?;
        self.store
            .has_parent(user_id)
            .await?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))
    }

    /// Users whose profile names `user_id` as parent
    pub async fn list_child_users(&self, user_id: &str) -> Result<Vec<UserProfile>, UserError> {
        let user_id = require_user_id(user_id)?;
        Ok(self.store.children_of(user_id).await?)
    }
}

fn require_user_id(user_id: &str) -> Result<&str, UserError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(UserError::InvalidArgument("user ID cannot be empty".to_string()));
    }
    Ok(user_id)
}
