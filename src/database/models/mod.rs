pub mod category;
pub mod entity;
pub mod user;

pub use category::{Category, CategoryRow};
pub use entity::{EntityCategoryRow, EntityRow};
pub use user::{Address, ProfileUpdate, UserProfile, UserRow};
