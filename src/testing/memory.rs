use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::category_store::CategoryCatalog;
use crate::database::entity_store::EntityStore;
use crate::database::manager::DatabaseError;
use crate::database::models::{Category, CategoryRow, ProfileUpdate, UserProfile};
use crate::database::user_store::UserStore;
use crate::hierarchy::tree::{assemble, sort_entities};
use crate::hierarchy::{
    CategoryKind, CategoryRef, Entity, EntityError, EntityPath, HierarchyNode, ListDepth, NewEntity,
};

/// Category catalog held in memory. Kinds are stored raw, so a row with an
/// empty kind can be seeded the way a hand-edited table would hold it.
#[derive(Default)]
pub struct MemoryCategoryCatalog {
    rows: RwLock<Vec<CategoryRow>>,
}

impl MemoryCategoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing validation
    pub fn seed(&self, name: &str, raw_kind: &str) -> Uuid {
        let id = Uuid::new_v4();
        if let Ok(mut rows) = self.rows.write() {
            rows.push(CategoryRow {
                category_id: id,
                name: name.to_string(),
                kind: raw_kind.to_string(),
                created_at: Utc::now(),
            });
        }
        id
    }

    pub fn category_ref(&self, category_id: Uuid) -> Option<CategoryRef> {
        let rows = self.rows.read().ok()?;
        let row = rows.iter().find(|row| row.category_id == category_id)?;
        Some(CategoryRef {
            id: row.category_id,
            name: row.name.clone(),
            kind: CategoryKind::parse(&row.kind)?,
        })
    }

    fn snapshot(&self) -> Result<Vec<CategoryRow>, DatabaseError> {
        self.rows
            .read()
            .map(|rows| rows.clone())
            .map_err(|_| DatabaseError::QueryError("category catalog lock poisoned".to_string()))
    }
}

#[async_trait]
impl CategoryCatalog for MemoryCategoryCatalog {
    async fn kind_of(&self, category_id: Uuid) -> Result<Option<CategoryKind>, DatabaseError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .find(|row| row.category_id == category_id)
            .and_then(|row| CategoryKind::parse(&row.kind)))
    }

    async fn insert(&self, category: &Category) -> Result<(), DatabaseError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DatabaseError::QueryError("category catalog lock poisoned".to_string()))?;
        if rows.iter().any(|row| row.name == category.name) {
            return Err(DatabaseError::QueryError(format!(
                "duplicate category name '{}'",
                category.name
            )));
        }
        rows.push(CategoryRow {
            category_id: category.id,
            name: category.name.clone(),
            kind: category.kind.to_string(),
            created_at: category.created_at,
        });
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, DatabaseError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .find(|row| row.name == name)
            .and_then(CategoryRow::into_category))
    }

    async fn list_by_kind(&self, kind: &CategoryKind) -> Result<Vec<Category>, DatabaseError> {
        let mut rows: Vec<CategoryRow> = self
            .snapshot()?
            .into_iter()
            .filter(|row| row.kind.to_lowercase() == kind.as_str())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows.into_iter().filter_map(CategoryRow::into_category).collect())
    }

    async fn list_all(&self) -> Result<Vec<Category>, DatabaseError> {
        let mut rows = self.snapshot()?;
        rows.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
        Ok(rows.into_iter().filter_map(CategoryRow::into_category).collect())
    }
}

/// Entity store held in memory. A single lock around the whole table stands in
/// for the transaction that makes `create_sub` atomic.
pub struct MemoryEntityStore {
    categories: Arc<MemoryCategoryCatalog>,
    entities: Mutex<Vec<Entity>>,
}

impl MemoryEntityStore {
    pub fn new(categories: Arc<MemoryCategoryCatalog>) -> Self {
        Self {
            categories,
            entities: Mutex::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entities.lock().await.len()
    }

    pub async fn get(&self, entity_id: Uuid) -> Option<Entity> {
        self.entities
            .lock()
            .await
            .iter()
            .find(|entity| entity.id == entity_id)
            .cloned()
    }

    async fn resolve_kind(&self, category_id: Uuid) -> Result<CategoryKind, EntityError> {
        self.categories
            .kind_of(category_id)
            .await?
            .ok_or(EntityError::CategoryNotFound(category_id))
    }

    /// Validate and build a sub-entity against the current table without
    /// writing anything
    async fn plan_sub(
        &self,
        entities: &[Entity],
        input: NewEntity,
        parent_id: Option<Uuid>,
    ) -> Result<Entity, EntityError> {
        let user_id = input.user_id.clone().filter(|id| !id.is_empty());

        let parent_path: EntityPath = match parent_id {
            Some(parent_id) => entities
                .iter()
                .find(|entity| entity.id == parent_id)
                .map(|entity| entity.path.clone())
                .ok_or(EntityError::EntityNotFound(parent_id))?,
            None => {
                let owner = user_id.clone().unwrap_or_default();
                let first_owned = entities
                    .iter()
                    .filter(|entity| entity.user_id() == Some(owner.as_str()))
                    .min_by(|a, b| {
                        a.depth()
                            .cmp(&b.depth())
                            .then_with(|| a.created_at.cmp(&b.created_at))
                            .then_with(|| a.id.cmp(&b.id))
                    })
                    .map(|entity| entity.path.clone());
                first_owned.ok_or(EntityError::ParentResolutionFailed(owner))?
            }
        };

        let kind = self.resolve_kind(input.category_id).await?;
        let entity = Entity::create(input, &kind, Some(&parent_path))?;

        if let Some(owner) = &user_id {
            if !entities.iter().any(|entity| entity.user_id() == Some(owner.as_str())) {
                return Err(EntityError::NoExistingEntities(owner.clone()));
            }
        }
        Ok(entity)
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn create_root(&self, input: NewEntity) -> Result<Uuid, EntityError> {
        let kind = self.resolve_kind(input.category_id).await?;
        let entity = Entity::create(input, &kind, None)?;
        let id = entity.id;
        self.entities.lock().await.push(entity);
        Ok(id)
    }

    async fn create_sub(&self, input: NewEntity, parent_id: Option<Uuid>) -> Result<Uuid, EntityError> {
        let mut entities = self.entities.lock().await;
        let entity = self
            .plan_sub(&entities, input, parent_id)
            .await
            .map_err(EntityError::create_sub_failed)?;
        let id = entity.id;
        entities.push(entity);
        Ok(id)
    }

    async fn check_presence(&self, user_id: &str) -> Result<bool, EntityError> {
        let entities = self.entities.lock().await;
        Ok(entities.iter().any(|entity| entity.user_id() == Some(user_id)))
    }

    async fn list_children(
        &self,
        entity_id: Uuid,
        depth: ListDepth,
        kind: Option<&CategoryKind>,
    ) -> Result<Vec<Entity>, EntityError> {
        let entities = self.entities.lock().await;
        let parent_depth = entities
            .iter()
            .find(|entity| entity.id == entity_id)
            .map(Entity::depth)
            .ok_or(EntityError::EntityNotFound(entity_id))?;

        let mut found = Vec::new();
        for entity in entities.iter().filter(|entity| {
            entity.id != entity_id
                && entity.path.contains(entity_id)
                && depth.includes(entity.depth() - parent_depth)
        }) {
            if let Some(wanted) = kind {
                if self.categories.kind_of(entity.category_id).await?.as_ref() != Some(wanted) {
                    continue;
                }
            }
            found.push(entity.clone());
        }
        sort_entities(&mut found);
        Ok(found)
    }

    async fn get_hierarchy(&self, root_id: Uuid) -> Result<HierarchyNode, EntityError> {
        let members: Vec<Entity> = {
            let entities = self.entities.lock().await;
            entities
                .iter()
                .filter(|entity| entity.path.contains(root_id))
                .cloned()
                .collect()
        };
        if members.is_empty() {
            return Err(EntityError::EntityNotFound(root_id));
        }

        let mut nodes = Vec::with_capacity(members.len());
        for entity in members {
            let category = self.categories.category_ref(entity.category_id).ok_or_else(|| {
                EntityError::Integrity(format!("category {} has no kind", entity.category_id))
            })?;
            nodes.push(HierarchyNode::from_entity(entity, category));
        }
        assemble(root_id, nodes)
    }
}

/// Delays every call before delegating, for exercising deadlines
pub struct SlowEntityStore {
    inner: Arc<MemoryEntityStore>,
    delay: Duration,
}

impl SlowEntityStore {
    pub fn new(inner: Arc<MemoryEntityStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl EntityStore for SlowEntityStore {
    async fn create_root(&self, input: NewEntity) -> Result<Uuid, EntityError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create_root(input).await
    }

    async fn create_sub(&self, input: NewEntity, parent_id: Option<Uuid>) -> Result<Uuid, EntityError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create_sub(input, parent_id).await
    }

    async fn check_presence(&self, user_id: &str) -> Result<bool, EntityError> {
        tokio::time::sleep(self.delay).await;
        self.inner.check_presence(user_id).await
    }

    async fn list_children(
        &self,
        entity_id: Uuid,
        depth: ListDepth,
        kind: Option<&CategoryKind>,
    ) -> Result<Vec<Entity>, EntityError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_children(entity_id, depth, kind).await
    }

    async fn get_hierarchy(&self, root_id: Uuid) -> Result<HierarchyNode, EntityError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_hierarchy(root_id).await
    }
}

/// Profile store held in memory, in insertion order
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<UserProfile>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|user| user.id == user_id).cloned())
    }

    async fn upsert(&self, user_id: &str, update: &ProfileUpdate) -> Result<UserProfile, DatabaseError> {
        let mut users = self.users.lock().await;
        let now = Utc::now();
        if let Some(user) = users.iter_mut().find(|user| user.id == user_id) {
            user.first_name = Some(update.first_name.clone());
            user.last_name = Some(update.last_name.clone());
            user.phone = Some(update.phone.clone());
            user.address = update.address.clone();
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = UserProfile {
            id: user_id.to_string(),
            email: update.email.clone(),
            first_name: Some(update.first_name.clone()),
            last_name: Some(update.last_name.clone()),
            phone: Some(update.phone.clone()),
            address: update.address.clone(),
            parent_id: update.parent_id.clone(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn has_parent(&self, user_id: &str) -> Result<Option<bool>, DatabaseError> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|user| user.id == user_id)
            .map(|user| user.parent_id.is_some()))
    }

    async fn children_of(&self, parent_id: &str) -> Result<Vec<UserProfile>, DatabaseError> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .filter(|user| user.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect())
    }
}
