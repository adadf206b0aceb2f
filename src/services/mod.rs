pub mod category_service;
pub mod entity_service;
pub mod user_service;

pub use category_service::{CategoryError, CategoryService};
pub use entity_service::EntityService;
pub use user_service::{UserError, UserService};
