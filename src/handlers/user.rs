use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::app::AppState;
use crate::database::models::{Address, ProfileUpdate, UserProfile};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CallerIdentity};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailsRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub street1: String,
    #[serde(default)]
    pub street2: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub zip: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl UserDetailsRequest {
    /// Collect every field problem at once
    fn validate(&self) -> Result<(), ApiError> {
        let mut field_errors = HashMap::new();
        let required = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("phone", &self.phone),
            ("street1", &self.street1),
            ("city", &self.city),
            ("region", &self.region),
            ("country", &self.country),
            ("zip", &self.zip),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                field_errors.insert(field.to_string(), "is required".to_string());
            }
        }
        if !is_email(self.email.trim()) {
            field_errors.insert("email".to_string(), "must be a valid email address".to_string());
        }

        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Invalid request", Some(field_errors)))
        }
    }

    fn into_update(self) -> ProfileUpdate {
        ProfileUpdate {
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: Address {
                street1: self.street1.trim().to_string(),
                street2: self.street2.trim().to_string(),
                city: self.city.trim().to_string(),
                region: self.region.trim().to_string(),
                country: self.country.trim().to_string(),
                zip: self.zip.trim().to_string(),
            },
            parent_id: self.parent_id,
        }
    }
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
        }
        None => false,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserProfile> for UserResponse {
    fn from(user: UserProfile) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            address: user.address,
            parent_id: user.parent_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HasParentResponse {
    pub has_parent_id: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildUsersResponse {
    pub users: Vec<UserResponse>,
    pub count: usize,
}

/// GET /user/details
pub async fn get_details(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<UserResponse> {
    let user = state.users.get_user_details(&caller.user_id).await?;
    Ok(ApiResponse::success(user.into()))
}

/// POST /user/details
pub async fn update_details(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    payload: Result<Json<UserDetailsRequest>, JsonRejection>,
) -> ApiResult<UserResponse> {
    let Json(req) = payload?;
    req.validate()?;

    let user = state
        .users
        .update_user_details(&caller.user_id, req.into_update())
        .await?;
    Ok(ApiResponse::success(user.into()))
}

/// GET /user/check-parent-id
pub async fn check_parent(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<HasParentResponse> {
    let has_parent_id = state.users.check_has_parent(&caller.user_id).await?;
    Ok(ApiResponse::success(HasParentResponse { has_parent_id }))
}

/// GET /user/children
pub async fn list_children(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<ChildUsersResponse> {
    let users: Vec<UserResponse> = state
        .users
        .list_child_users(&caller.user_id)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(ApiResponse::success(ChildUsersResponse {
        count: users.len(),
        users,
    }))
}
