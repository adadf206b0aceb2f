pub mod category;
pub mod entity;
pub mod migrate;
