use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::config;
use crate::error::ApiError;
use crate::hierarchy::{Attachment, Entity, HierarchyNode};
use crate::middleware::{ApiResponse, ApiResult, CallerIdentity};

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRootRequest {
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubRequest {
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
    #[serde(default)]
    pub parent_entity_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEntity {
    pub entity_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenQuery {
    #[serde(default)]
    pub recursive: bool,
    pub level: Option<i32>,
    pub category_type: Option<String>,
}

impl ChildrenQuery {
    /// Non-recursive requests only ever see direct children
    fn effective_level(&self) -> i32 {
        match (self.recursive, self.level) {
            (false, _) => 0,
            (true, Some(level)) if level != 0 => level,
            (true, _) => -1,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyQuery {
    pub max_depth: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub category_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    pub path: String,
    pub depth: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Entity> for EntityResponse {
    fn from(entity: Entity) -> Self {
        let depth = entity.depth();
        let path = entity.path.to_string();
        let (user_id, details) = match entity.attachment {
            Attachment::Owner(user_id) => (Some(user_id), None),
            Attachment::Details(details) => (None, Some(details)),
        };
        Self {
            id: entity.id,
            name: entity.name,
            user_id,
            category_id: entity.category_id,
            parent_id: entity.parent_id,
            details,
            path,
            depth,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityChildrenResponse {
    pub parent_id: Uuid,
    pub children: Vec<EntityResponse>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityHierarchyResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub category_id: Uuid,
    pub category_name: String,
    pub category_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    pub depth: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub children: Vec<EntityHierarchyResponse>,
    /// Set when children exist below the render cut-off
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl EntityHierarchyResponse {
    /// Render `node` with at most `levels` generations of children below it.
    /// Recursion is bounded by the configured maximum render depth.
    pub fn render(node: &HierarchyNode, levels: u32) -> Self {
        let (children, truncated) = if levels == 0 {
            (Vec::new(), !node.children.is_empty())
        } else {
            let children = node
                .children
                .iter()
                .map(|child| Self::render(child, levels - 1))
                .collect();
            (children, false)
        };

        Self {
            id: node.id,
            name: node.name.clone(),
            user_id: node.user_id.clone(),
            category_id: node.category.id,
            category_name: node.category.name.clone(),
            category_type: node.category.kind.to_string(),
            parent_id: node.parent_id,
            details: node.user_id.is_none().then(|| node.details.clone()),
            depth: node.depth,
            created_at: node.created_at,
            updated_at: node.updated_at,
            children,
            truncated,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HasEntityResponse {
    pub has_entity: bool,
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    let len = name.trim().chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(ApiError::field_error(
            "name",
            format!("must be between {} and {} characters", NAME_MIN_CHARS, NAME_MAX_CHARS),
        ));
    }
    Ok(())
}

fn validate_uuid(field: &str, value: &str) -> Result<(), ApiError> {
    Uuid::parse_str(value.trim())
        .map(|_| ())
        .map_err(|_| ApiError::field_error(field, "must be a valid UUID"))
}

/// POST /entity/root
pub async fn create_root(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    payload: Result<Json<CreateRootRequest>, JsonRejection>,
) -> ApiResult<CreatedEntity> {
    let Json(req) = payload?;
    validate_uuid("categoryId", &req.category_id)?;
    validate_name(&req.name)?;

    let entity_id = state
        .entities
        .create_root_entity(&req.category_id, &req.name, &caller.user_id, req.details)
        .await?;

    tracing::info!("User {} created root entity {}", caller.user_id, entity_id);
    Ok(ApiResponse::created(CreatedEntity { entity_id }))
}

/// POST /entity/sub
pub async fn create_sub(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    payload: Result<Json<CreateSubRequest>, JsonRejection>,
) -> ApiResult<CreatedEntity> {
    let Json(req) = payload?;
    validate_uuid("categoryId", &req.category_id)?;
    validate_name(&req.name)?;
    let parent_entity_id = req.parent_entity_id.unwrap_or_default();
    if !parent_entity_id.trim().is_empty() {
        validate_uuid("parentEntityId", &parent_entity_id)?;
    }

    let entity_id = state
        .entities
        .create_sub_entity(
            &req.category_id,
            &req.name,
            &caller.user_id,
            req.details,
            &parent_entity_id,
        )
        .await?;

    tracing::info!("User {} created sub-entity {}", caller.user_id, entity_id);
    Ok(ApiResponse::created(CreatedEntity { entity_id }))
}

/// GET /entity/:entity_id/children
pub async fn list_children(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Query(query): Query<ChildrenQuery>,
) -> ApiResult<EntityChildrenResponse> {
    let category_type = query.category_type.clone().unwrap_or_default();
    let children = state
        .entities
        .list_entity_children(&entity_id.to_string(), query.effective_level(), &category_type)
        .await?;

    let children: Vec<EntityResponse> = children.into_iter().map(EntityResponse::from).collect();
    Ok(ApiResponse::success(EntityChildrenResponse {
        parent_id: entity_id,
        count: children.len(),
        children,
    }))
}

/// GET /entity/:entity_id/hierarchy
pub async fn get_hierarchy(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Query(query): Query<HierarchyQuery>,
) -> ApiResult<EntityHierarchyResponse> {
    let tree = state.entities.get_entity_hierarchy(&entity_id.to_string()).await?;
    let levels = config::config().hierarchy.render_depth(query.max_depth);
    Ok(ApiResponse::success(EntityHierarchyResponse::render(&tree, levels)))
}

/// GET /user/has-entity
pub async fn has_entity(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<HasEntityResponse> {
    let has_entity = state.entities.check_entity_exists(&caller.user_id).await?;
    Ok(ApiResponse::success(HasEntityResponse { has_entity }))
}
