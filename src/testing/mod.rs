mod memory;

pub use memory::{MemoryCategoryCatalog, MemoryEntityStore, MemoryUserStore, SlowEntityStore};

use std::sync::Arc;
use uuid::Uuid;

use crate::app::AppState;
use crate::services::{CategoryService, EntityService, UserService};

/// In-memory catalog and store seeded with one category per kind
pub struct Fixture {
    pub catalog: Arc<MemoryCategoryCatalog>,
    pub store: Arc<MemoryEntityStore>,
    pub users: Arc<MemoryUserStore>,
    pub user: Uuid,
    pub location: Uuid,
    pub office: Uuid,
    pub organization: Uuid,
    /// A category row whose kind was never set
    pub blank: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        let catalog = Arc::new(MemoryCategoryCatalog::new());
        let user = catalog.seed("Member", "user");
        let location = catalog.seed("Headquarters", "location");
        let office = catalog.seed("Office", "office");
        let organization = catalog.seed("Company", "organization");
        let blank = catalog.seed("Unclassified", "");
        let store = Arc::new(MemoryEntityStore::new(catalog.clone()));

        Self {
            catalog,
            store,
            users: Arc::new(MemoryUserStore::new()),
            user,
            location,
            office,
            organization,
            blank,
        }
    }

    pub fn service(&self) -> EntityService {
        EntityService::new(self.store.clone(), self.catalog.clone())
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            self.service(),
            CategoryService::new(self.catalog.clone()),
            UserService::new(self.users.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entity_store::EntityStore;
    use crate::hierarchy::{CategoryKind, EntityError, HierarchyNode, ListDepth, NewEntity, StructuralKind};
    use serde_json::{json, Map, Value};

    fn new_entity(category_id: Uuid, name: &str, user_id: Option<&str>) -> NewEntity {
        NewEntity {
            category_id,
            name: name.to_string(),
            user_id: user_id.map(str::to_string),
            details: Map::new(),
        }
    }

    fn flatten_ids(tree: &HierarchyNode) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = tree.descendants().into_iter().map(|n| n.id).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn roots_and_children_carry_consistent_paths() {
        let fx = Fixture::new();
        let store = &fx.store;

        let root = store.create_root(new_entity(fx.location, "HQ", None)).await.unwrap();
        let root_entity = store.get(root).await.unwrap();
        assert_eq!(root_entity.depth(), 0);
        assert_eq!(root_entity.path.ids(), &[root]);

        let child = store
            .create_sub(new_entity(fx.office, "Floor", None), Some(root))
            .await
            .unwrap();
        let grandchild = store
            .create_sub(new_entity(fx.office, "Desk", None), Some(child))
            .await
            .unwrap();

        let child_entity = store.get(child).await.unwrap();
        let grandchild_entity = store.get(grandchild).await.unwrap();
        assert_eq!(child_entity.path.ids(), &[root, child]);
        assert_eq!(grandchild_entity.path.ids(), &[root, child, grandchild]);
        assert_eq!(grandchild_entity.depth(), child_entity.depth() + 1);
        assert_eq!(grandchild_entity.parent_id, Some(child));
    }

    #[tokio::test]
    async fn user_kind_without_user_id_never_persists() {
        let fx = Fixture::new();
        let store = &fx.store;

        let err = store.create_root(new_entity(fx.user, "Alice", None)).await.unwrap_err();
        assert!(matches!(err, EntityError::InvalidArgument(_)));

        let root = store.create_root(new_entity(fx.location, "HQ", None)).await.unwrap();
        let err = store
            .create_sub(new_entity(fx.user, "Alice", Some("")), Some(root))
            .await
            .unwrap_err();
        assert!(matches!(err, EntityError::CreateSubFailed(_)));
        assert!(matches!(err.cause(), EntityError::InvalidArgument(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn structural_kinds_keep_details_and_drop_user_id() {
        let fx = Fixture::new();
        let mut details = Map::new();
        details.insert("floor".into(), json!(1));
        let input = NewEntity {
            category_id: fx.location,
            name: "HQ".into(),
            user_id: Some("u1".into()),
            details,
        };
        let root = fx.store.create_root(input).await.unwrap();

        let entity = fx.store.get(root).await.unwrap();
        assert_eq!(entity.user_id(), None);
        assert_eq!(entity.attachment.details().and_then(|d| d.get("floor")), Some(&json!(1)));
        assert!(!fx.store.check_presence("u1").await.unwrap());
    }

    #[tokio::test]
    async fn user_without_holdings_cannot_attach() {
        let fx = Fixture::new();
        let store = &fx.store;
        let root = store.create_root(new_entity(fx.location, "HQ", None)).await.unwrap();

        let err = store
            .create_sub(new_entity(fx.user, "Room A", Some("u1")), Some(root))
            .await
            .unwrap_err();
        assert!(matches!(err.cause(), EntityError::NoExistingEntities(id) if id == "u1"));
        assert_eq!(store.len().await, 1);
        assert!(!store.check_presence("u1").await.unwrap());
    }

    #[tokio::test]
    async fn implicit_parent_is_users_first_entity() {
        let fx = Fixture::new();
        let store = &fx.store;

        let home = store.create_root(new_entity(fx.user, "Alice", Some("u1"))).await.unwrap();
        assert!(store.check_presence("u1").await.unwrap());

        let device = store
            .create_sub(new_entity(fx.user, "Tracker", Some("u1")), None)
            .await
            .unwrap();
        assert_eq!(store.get(device).await.unwrap().parent_id, Some(home));

        // Still attaches under the shallowest holding
        let second = store
            .create_sub(new_entity(fx.user, "Phone", Some("u1")), None)
            .await
            .unwrap();
        assert_eq!(store.get(second).await.unwrap().parent_id, Some(home));
    }

    #[tokio::test]
    async fn implicit_parent_without_holdings_fails() {
        let fx = Fixture::new();
        let err = fx
            .store
            .create_sub(new_entity(fx.office, "Room", None), None)
            .await
            .unwrap_err();
        assert!(matches!(err.cause(), EntityError::ParentResolutionFailed(_)));

        let err = fx
            .store
            .create_sub(new_entity(fx.user, "Room", Some("u9")), None)
            .await
            .unwrap_err();
        assert!(matches!(err.cause(), EntityError::ParentResolutionFailed(id) if id == "u9"));
        assert_eq!(fx.store.len().await, 0);
    }

    #[tokio::test]
    async fn unknown_or_unclassified_category_fails() {
        let fx = Fixture::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            fx.store.create_root(new_entity(missing, "HQ", None)).await,
            Err(EntityError::CategoryNotFound(id)) if id == missing
        ));
        assert!(matches!(
            fx.store.create_root(new_entity(fx.blank, "HQ", None)).await,
            Err(EntityError::CategoryNotFound(_))
        ));

        let root = fx.store.create_root(new_entity(fx.location, "HQ", None)).await.unwrap();
        let err = fx
            .store
            .create_sub(new_entity(missing, "Room", None), Some(root))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = fx
            .store
            .create_sub(new_entity(fx.office, "Room", None), Some(missing))
            .await
            .unwrap_err();
        assert!(matches!(err.cause(), EntityError::EntityNotFound(id) if *id == missing));
    }

    #[tokio::test]
    async fn listing_levels_and_order() {
        let fx = Fixture::new();
        let store = &fx.store;
        let r = store.create_root(new_entity(fx.organization, "Acme", None)).await.unwrap();
        let b = store.create_sub(new_entity(fx.location, "Berlin", None), Some(r)).await.unwrap();
        let a = store.create_sub(new_entity(fx.location, "Amsterdam", None), Some(r)).await.unwrap();
        let o = store.create_sub(new_entity(fx.office, "Canal St", None), Some(a)).await.unwrap();
        let d = store.create_sub(new_entity(fx.office, "Desk", None), Some(o)).await.unwrap();

        let direct = store.list_children(r, ListDepth::Direct, None).await.unwrap();
        assert_eq!(direct.iter().map(|e| e.id).collect::<Vec<_>>(), vec![a, b]);
        assert!(direct.iter().all(|e| e.parent_id == Some(r)));

        let two = store.list_children(r, ListDepth::UpTo(2), None).await.unwrap();
        assert_eq!(two.iter().map(|e| e.id).collect::<Vec<_>>(), vec![a, b, o]);

        let all = store.list_children(r, ListDepth::All, None).await.unwrap();
        assert_eq!(all.iter().map(|e| e.id).collect::<Vec<_>>(), vec![a, b, o, d]);
        for pair in all.windows(2) {
            assert!((pair[0].depth(), &pair[0].name) <= (pair[1].depth(), &pair[1].name));
        }

        // Relative to a non-root parent
        let below_a = store.list_children(a, ListDepth::Direct, None).await.unwrap();
        assert_eq!(below_a.iter().map(|e| e.id).collect::<Vec<_>>(), vec![o]);
    }

    #[tokio::test]
    async fn kind_filter_applies_per_row() {
        let fx = Fixture::new();
        let store = &fx.store;
        let r = store.create_root(new_entity(fx.organization, "Acme", None)).await.unwrap();
        let l = store.create_sub(new_entity(fx.location, "Berlin", None), Some(r)).await.unwrap();
        let o = store.create_sub(new_entity(fx.office, "Mitte", None), Some(l)).await.unwrap();

        let office = CategoryKind::Structural(StructuralKind::Office);
        let offices = store.list_children(r, ListDepth::All, Some(&office)).await.unwrap();
        assert_eq!(offices.iter().map(|e| e.id).collect::<Vec<_>>(), vec![o]);

        let none = store.list_children(r, ListDepth::Direct, Some(&office)).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn recursive_listing_matches_flattened_hierarchy() {
        let fx = Fixture::new();
        let store = &fx.store;
        let r = store.create_root(new_entity(fx.organization, "Acme", None)).await.unwrap();
        let mut frontier = vec![r];
        for level in 0..3 {
            let mut next = Vec::new();
            for parent in &frontier {
                for i in 0..3 {
                    let name = format!("n{level}-{i}");
                    next.push(store.create_sub(new_entity(fx.office, &name, None), Some(*parent)).await.unwrap());
                }
            }
            frontier = next;
        }

        let mut listed: Vec<Uuid> = store
            .list_children(r, ListDepth::All, None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        listed.sort();
        let tree = store.get_hierarchy(r).await.unwrap();
        assert_eq!(listed.len(), 3 + 9 + 27);
        assert_eq!(listed, flatten_ids(&tree));
    }

    #[tokio::test]
    async fn hierarchy_shape_and_leaf() {
        let fx = Fixture::new();
        let store = &fx.store;
        let r = store.create_root(new_entity(fx.location, "R", None)).await.unwrap();
        let c2 = store.create_sub(new_entity(fx.office, "C2", None), Some(r)).await.unwrap();
        let c1 = store.create_sub(new_entity(fx.office, "C1", None), Some(r)).await.unwrap();
        let g = store.create_sub(new_entity(fx.office, "G", None), Some(c1)).await.unwrap();

        let tree = store.get_hierarchy(r).await.unwrap();
        assert_eq!(tree.children.iter().map(|c| c.id).collect::<Vec<_>>(), vec![c1, c2]);
        assert_eq!(tree.children[0].children.iter().map(|c| c.id).collect::<Vec<_>>(), vec![g]);
        assert!(tree.children[1].children.is_empty());
        assert_eq!(tree.category.kind, CategoryKind::Structural(StructuralKind::Location));

        let leaf = store.get_hierarchy(g).await.unwrap();
        assert!(leaf.children.is_empty());
        assert_eq!(leaf.depth, 2);
    }

    #[tokio::test]
    async fn nonexistent_ids_are_not_found() {
        let fx = Fixture::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            fx.store.get_hierarchy(missing).await,
            Err(EntityError::EntityNotFound(id)) if id == missing
        ));
        assert!(matches!(
            fx.store.list_children(missing, ListDepth::All, None).await,
            Err(EntityError::EntityNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn concurrent_sub_creation_under_one_parent() {
        let fx = Fixture::new();
        let r = fx.store.create_root(new_entity(fx.location, "HQ", None)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = fx.store.clone();
            let input = new_entity(fx.office, &format!("Room {i:02}"), None);
            handles.push(tokio::spawn(async move { store.create_sub(input, Some(r)).await }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);

        let children = fx.store.list_children(r, ListDepth::Direct, None).await.unwrap();
        assert_eq!(children.len(), 16);
        assert!(children.iter().all(|c| c.path.ids() == [r, c.id]));
    }

    #[tokio::test]
    async fn hierarchy_serializes_children_even_when_empty() {
        let fx = Fixture::new();
        let r = fx.store.create_root(new_entity(fx.location, "HQ", None)).await.unwrap();
        let tree = fx.store.get_hierarchy(r).await.unwrap();
        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(value["children"], Value::Array(Vec::new()));
    }
}
