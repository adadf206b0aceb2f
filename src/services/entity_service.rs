use serde_json::{Map, Value};
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config;
use crate::database::category_store::{CategoryCatalog, PgCategoryCatalog};
use crate::database::entity_store::{EntityStore, PgEntityStore};
use crate::hierarchy::{CategoryKind, Entity, EntityError, HierarchyNode, ListDepth, NewEntity};

/// Entity operations with argument validation in front of the store.
///
/// Performs no I/O of its own; store errors pass through unchanged.
pub struct EntityService {
    store: Arc<dyn EntityStore>,
    categories: Arc<dyn CategoryCatalog>,
    deadline: Option<Duration>,
}

impl EntityService {
    pub fn new(store: Arc<dyn EntityStore>, categories: Arc<dyn CategoryCatalog>) -> Self {
        Self {
            store,
            categories,
            deadline: None,
        }
    }

    /// Postgres-backed service using the configured operation timeout
    pub fn from_pool(pool: PgPool) -> Self {
        let timeout_ms = config::config().api.operation_timeout_ms;
        let service = Self::new(
            Arc::new(PgEntityStore::new(pool.clone())),
            Arc::new(PgCategoryCatalog::new(pool)),
        );
        if timeout_ms > 0 {
            service.with_deadline(Duration::from_millis(timeout_ms))
        } else {
            service
        }
    }

    /// Abort any operation that runs longer than `deadline`. The store future
    /// is dropped on expiry, which rolls back an open transaction.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    async fn guarded<T, F>(&self, operation: F) -> Result<T, EntityError>
    where
        F: Future<Output = Result<T, EntityError>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, operation)
                .await
                .map_err(|_| EntityError::Cancelled(deadline))?,
            None => operation.await,
        }
    }

    /// Determines if any entity exists for a given user
    pub async fn check_entity_exists(&self, user_id: &str) -> Result<bool, EntityError> {
        require_non_empty("user ID", user_id)?;
        self.guarded(self.store.check_presence(user_id)).await
    }

    /// Creates a new top-level entity without a parent
    pub async fn create_root_entity(
        &self,
        category_id: &str,
        entity_name: &str,
        user_id: &str,
        details: Option<Map<String, Value>>,
    ) -> Result<Uuid, EntityError> {
        let input = new_entity(category_id, entity_name, user_id, details)?;
        self.guarded(self.store.create_root(input)).await
    }

    /// Creates a new entity as a child of `parent_entity_id`, or of the
    /// caller's first entity when no parent is given
    pub async fn create_sub_entity(
        &self,
        category_id: &str,
        entity_name: &str,
        user_id: &str,
        details: Option<Map<String, Value>>,
        parent_entity_id: &str,
    ) -> Result<Uuid, EntityError> {
        let input = new_entity(category_id, entity_name, user_id, details)?;
        let parent_id = if parent_entity_id.trim().is_empty() {
            None
        } else {
            Some(parse_id("parent entity ID", parent_entity_id)?)
        };
        self.guarded(self.store.create_sub(input, parent_id)).await
    }

    /// Lists descendants of an entity.
    /// level: 0 for direct children only, -1 for all descendants, or a positive depth.
    /// category_type: filter by category kind; empty means no filter.
    pub async fn list_entity_children(
        &self,
        entity_id: &str,
        level: i32,
        category_type: &str,
    ) -> Result<Vec<Entity>, EntityError> {
        let entity_id = parse_id("entity ID", entity_id)?;
        let depth = ListDepth::from_level(level)?;
        let kind = CategoryKind::parse(category_type);
        debug!("Listing children of {} at {:?} filtered by {:?}", entity_id, depth, kind);
        self.guarded(self.store.list_children(entity_id, depth, kind.as_ref()))
            .await
    }

    /// Direct children, or every descendant when `recursive`
    pub async fn get_child_entities(&self, entity_id: &str, recursive: bool) -> Result<Vec<Entity>, EntityError> {
        let level = if recursive { -1 } else { 0 };
        self.list_entity_children(entity_id, level, "").await
    }

    /// Retrieves an entity and all its descendants as a nested tree
    pub async fn get_entity_hierarchy(&self, root_entity_id: &str) -> Result<HierarchyNode, EntityError> {
        let root_id = parse_id("root entity ID", root_entity_id)?;
        self.guarded(self.store.get_hierarchy(root_id)).await
    }

    /// Retrieves the kind of a category by its ID
    pub async fn get_category_kind(&self, category_id: &str) -> Result<CategoryKind, EntityError> {
        let category_id = parse_id("category ID", category_id)?;
        self.guarded(async {
            self.categories
                .kind_of(category_id)
                .await?
                .ok_or(EntityError::CategoryNotFound(category_id))
        })
        .await
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), EntityError> {
    if value.trim().is_empty() {
        return Err(EntityError::InvalidArgument(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn parse_id(field: &str, value: &str) -> Result<Uuid, EntityError> {
    require_non_empty(field, value)?;
    Uuid::parse_str(value.trim())
        .map_err(|_| EntityError::InvalidArgument(format!("{} must be a valid UUID", field)))
}

fn new_entity(
    category_id: &str,
    entity_name: &str,
    user_id: &str,
    details: Option<Map<String, Value>>,
) -> Result<NewEntity, EntityError> {
    let category_id = parse_id("category ID", category_id)?;
    require_non_empty("entity name", entity_name)?;
    let user_id = Some(user_id.trim()).filter(|id| !id.is_empty()).map(str::to_string);

    Ok(NewEntity {
        category_id,
        name: entity_name.trim().to_string(),
        user_id,
        details: details.unwrap_or_default(),
    })
}
