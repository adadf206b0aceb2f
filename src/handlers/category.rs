use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Category;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            kind: category.kind.to_string(),
            created_at: category.created_at,
        }
    }
}

/// POST /category
pub async fn add_category(
    State(state): State<AppState>,
    payload: Result<Json<AddCategoryRequest>, JsonRejection>,
) -> ApiResult<CategoryResponse> {
    let Json(req) = payload?;
    let category = state.categories.add_category(&req.name, &req.kind).await?;
    Ok(ApiResponse::created(category.into()))
}

/// GET /category/all
pub async fn list_all(State(state): State<AppState>) -> ApiResult<Vec<CategoryResponse>> {
    let categories = state.categories.list_all_categories().await?;
    Ok(ApiResponse::success(categories.into_iter().map(Into::into).collect()))
}

/// GET /category/type/:kind
pub async fn list_by_kind(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Vec<CategoryResponse>> {
    let categories = state.categories.get_categories_by_kind(&kind).await?;
    Ok(ApiResponse::success(categories.into_iter().map(Into::into).collect()))
}
