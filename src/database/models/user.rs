use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Postal address kept as one JSON document on the user row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street1: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub street2: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub zip: String,
}

/// Raw `z_users` row
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Value>,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account profile of a caller. `parent_id` links a user to the account that
/// referred or manages it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Address,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller may set on their own profile. `email` and `parent_id`
/// only take effect when the profile is first created.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: Address,
    pub parent_id: Option<String>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        let address = match row.address {
            None | Some(Value::Null) => Address::default(),
            Some(raw) => serde_json::from_value(raw).unwrap_or_else(|e| {
                tracing::warn!("User {} has an unreadable address: {}", row.user_id, e);
                Address::default()
            }),
        };
        Self {
            id: row.user_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            address,
            parent_id: row.parent_id.filter(|id| !id.is_empty()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
