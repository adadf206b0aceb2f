use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config;
use crate::database::category_store::kind_of_with;
use crate::database::models::{EntityCategoryRow, EntityRow};
use crate::hierarchy::tree::assemble;
use crate::hierarchy::{CategoryKind, Entity, EntityError, EntityPath, HierarchyNode, ListDepth, NewEntity};

/// Persistence for the entity tree
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert a node without a parent and return its id
    async fn create_root(&self, input: NewEntity) -> Result<Uuid, EntityError>;

    /// Insert a node under `parent_id`, or under the first entity owned by
    /// `input.user_id` when no parent is given. Atomic; failures come back as
    /// `EntityError::CreateSubFailed`.
    async fn create_sub(&self, input: NewEntity, parent_id: Option<Uuid>) -> Result<Uuid, EntityError>;

    /// Whether any entity is owned by `user_id`
    async fn check_presence(&self, user_id: &str) -> Result<bool, EntityError>;

    /// Descendants of `entity_id` within `depth`, optionally restricted to one
    /// category kind, ordered by depth then name
    async fn list_children(
        &self,
        entity_id: Uuid,
        depth: ListDepth,
        kind: Option<&CategoryKind>,
    ) -> Result<Vec<Entity>, EntityError>;

    /// `root_id` and every descendant, nested
    async fn get_hierarchy(&self, root_id: Uuid) -> Result<HierarchyNode, EntityError>;
}

const ENTITY_COLUMNS: &str = "e.entity_id, e.category_id, e.name, e.user_id, e.details, \
                              e.parent_id, e.path, e.depth, e.created_at, e.updated_at";

#[derive(Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert<'e, E>(executor: E, entity: &Entity) -> Result<(), EntityError>
    where
        E: PgExecutor<'e>,
    {
        let details = entity.attachment.details().map(|d| Value::Object(d.clone()));
        sqlx::query(
            "INSERT INTO z_entity
                (entity_id, category_id, name, user_id, details, parent_id, path, depth, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(entity.id)
        .bind(entity.category_id)
        .bind(&entity.name)
        .bind(entity.user_id())
        .bind(details)
        .bind(entity.parent_id)
        .bind(entity.path.ids().to_vec())
        .bind(entity.depth())
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    async fn owns_any<'e, E>(executor: E, user_id: &str) -> Result<bool, EntityError>
    where
        E: PgExecutor<'e>,
    {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM z_entity WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    async fn resolve_kind<'e, E>(executor: E, category_id: Uuid) -> Result<CategoryKind, EntityError>
    where
        E: PgExecutor<'e>,
    {
        kind_of_with(executor, category_id)
            .await?
            .ok_or(EntityError::CategoryNotFound(category_id))
    }

    /// Body of `create_sub`; the caller owns commit and rollback.
    async fn create_sub_in(
        tx: &mut Transaction<'_, Postgres>,
        input: NewEntity,
        parent_id: Option<Uuid>,
    ) -> Result<Uuid, EntityError> {
        let user_id = input.user_id.clone().filter(|id| !id.is_empty());

        // Parent rows are locked so they cannot change before the insert lands
        let parent_path: Vec<Uuid> = match parent_id {
            Some(parent_id) => sqlx::query_scalar("SELECT path FROM z_entity WHERE entity_id = $1 FOR SHARE")
                .bind(parent_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(EntityError::EntityNotFound(parent_id))?,
            None => {
                let owner = user_id.clone().unwrap_or_default();
                let first_owned: Option<Vec<Uuid>> = sqlx::query_scalar(
                    "SELECT path FROM z_entity
                     WHERE user_id = $1
                     ORDER BY depth, created_at, entity_id
                     LIMIT 1
                     FOR SHARE",
                )
                .bind(owner.as_str())
                .fetch_optional(&mut **tx)
                .await?;
                first_owned.ok_or(EntityError::ParentResolutionFailed(owner))?
            }
        };
        let parent_path = EntityPath::from_ids(parent_path)
            .ok_or_else(|| EntityError::Integrity("parent entity has an empty path".to_string()))?;

        let kind = Self::resolve_kind(&mut **tx, input.category_id).await?;
        let entity = Entity::create(input, &kind, Some(&parent_path))?;

        if let Some(owner) = &user_id {
            if !Self::owns_any(&mut **tx, owner).await? {
                return Err(EntityError::NoExistingEntities(owner.clone()));
            }
        }

        Self::insert(&mut **tx, &entity).await?;
        Ok(entity.id)
    }

    async fn depth_of(&self, entity_id: Uuid) -> Result<i32, EntityError> {
        sqlx::query_scalar("SELECT depth FROM z_entity WHERE entity_id = $1")
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(EntityError::EntityNotFound(entity_id))
    }

    fn warn_if_slow(operation: &str, started: Instant) {
        let settings = &config::config().database;
        let elapsed = started.elapsed();
        if settings.enable_slow_query_warning && elapsed.as_millis() as u64 > settings.slow_query_threshold_ms {
            warn!("Slow {} query: {:?}", operation, elapsed);
        }
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn create_root(&self, input: NewEntity) -> Result<Uuid, EntityError> {
        let kind = Self::resolve_kind(&self.pool, input.category_id).await?;
        let entity = Entity::create(input, &kind, None)?;
        Self::insert(&self.pool, &entity).await?;

        info!("Created root entity {} ({})", entity.id, kind);
        Ok(entity.id)
    }

    async fn create_sub(&self, input: NewEntity, parent_id: Option<Uuid>) -> Result<Uuid, EntityError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EntityError::create_sub_failed(e.into()))?;

        match Self::create_sub_in(&mut tx, input, parent_id).await {
            Ok(entity_id) => {
                tx.commit()
                    .await
                    .map_err(|e| EntityError::create_sub_failed(e.into()))?;
                info!("Created sub-entity {}", entity_id);
                Ok(entity_id)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed sub-entity creation also failed: {}", rollback_err);
                }
                debug!("Sub-entity creation rolled back: {}", err);
                Err(EntityError::create_sub_failed(err))
            }
        }
    }

    async fn check_presence(&self, user_id: &str) -> Result<bool, EntityError> {
        Self::owns_any(&self.pool, user_id).await
    }

    async fn list_children(
        &self,
        entity_id: Uuid,
        depth: ListDepth,
        kind: Option<&CategoryKind>,
    ) -> Result<Vec<Entity>, EntityError> {
        let started = Instant::now();
        let parent_depth = self.depth_of(entity_id).await?;
        let deepest = depth.max_hops().map(|hops| parent_depth.saturating_add(hops));

        // The kind filter is applied per row, never to prune the walk
        let sql = format!(
            "SELECT {ENTITY_COLUMNS}
             FROM z_entity e
             JOIN z_category c ON c.category_id = e.category_id
             WHERE e.path @> ARRAY[$1]::uuid[]
               AND e.entity_id <> $1
               AND ($2::int IS NULL OR e.depth <= $2)
               AND ($3::text IS NULL OR lower(c.type) = $3)
             ORDER BY e.depth, e.name COLLATE \"C\", e.entity_id"
        );
        let rows = sqlx::query_as::<_, EntityRow>(&sql)
            .bind(entity_id)
            .bind(deepest)
            .bind(kind.map(|k| k.as_str().to_string()))
            .fetch_all(&self.pool)
            .await?;
        Self::warn_if_slow("list_children", started);

        debug!("Listed {} descendants of {} ({:?})", rows.len(), entity_id, depth);
        rows.into_iter().map(Entity::try_from).collect()
    }

    async fn get_hierarchy(&self, root_id: Uuid) -> Result<HierarchyNode, EntityError> {
        let started = Instant::now();
        let sql = format!(
            "SELECT {ENTITY_COLUMNS}, c.name AS category_name, c.type AS category_type
             FROM z_entity e
             JOIN z_category c ON c.category_id = e.category_id
             WHERE e.path @> ARRAY[$1]::uuid[]
             ORDER BY e.depth, e.name COLLATE \"C\", e.entity_id"
        );
        let rows = sqlx::query_as::<_, EntityCategoryRow>(&sql)
            .bind(root_id)
            .fetch_all(&self.pool)
            .await?;
        Self::warn_if_slow("get_hierarchy", started);

        if rows.is_empty() {
            return Err(EntityError::EntityNotFound(root_id));
        }
        let nodes = rows
            .into_iter()
            .map(HierarchyNode::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        assemble(root_id, nodes)
    }
}
