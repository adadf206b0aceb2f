pub mod category_store;
pub mod entity_store;
pub mod manager;
pub mod models;
pub mod schema;
pub mod user_store;

pub use category_store::{CategoryCatalog, PgCategoryCatalog};
pub use entity_store::{EntityStore, PgEntityStore};
pub use manager::{DatabaseError, DatabaseManager};
pub use user_store::{PgUserStore, UserStore};
