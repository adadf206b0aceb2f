use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{ProfileUpdate, UserProfile, UserRow};

/// Account profiles keyed by the caller's user id
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError>;

    /// Create the profile, or update the editable fields of an existing one
    async fn upsert(&self, user_id: &str, update: &ProfileUpdate) -> Result<UserProfile, DatabaseError>;

    /// `None` when the user has no profile
    async fn has_parent(&self, user_id: &str) -> Result<Option<bool>, DatabaseError>;

    /// Profiles whose parent is `parent_id`, oldest first
    async fn children_of(&self, parent_id: &str) -> Result<Vec<UserProfile>, DatabaseError>;
}

const USER_COLUMNS: &str =
    "user_id, email, first_name, last_name, phone, address, parent_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM z_users WHERE user_id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserProfile::from))
    }

    async fn upsert(&self, user_id: &str, update: &ProfileUpdate) -> Result<UserProfile, DatabaseError> {
        let address = serde_json::to_value(&update.address)
            .map_err(|e| DatabaseError::QueryError(format!("failed to encode address: {}", e)))?;

        let sql = format!(
            "INSERT INTO z_users
                (user_id, email, first_name, last_name, phone, address, parent_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             ON CONFLICT (user_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                updated_at = EXCLUDED.updated_at
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .bind(&update.email)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.phone)
            .bind(address)
            .bind(update.parent_id.as_deref())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        tracing::info!("Saved profile for user {}", user_id);
        Ok(row.into())
    }

    async fn has_parent(&self, user_id: &str) -> Result<Option<bool>, DatabaseError> {
        let has_parent: Option<bool> =
            sqlx::query_scalar("SELECT parent_id IS NOT NULL FROM z_users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(has_parent)
    }

    async fn children_of(&self, parent_id: &str) -> Result<Vec<UserProfile>, DatabaseError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM z_users WHERE parent_id = $1 ORDER BY created_at, user_id"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(UserProfile::from).collect())
    }
}
