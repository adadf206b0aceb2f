// Entity hierarchy domain: kinds, paths, nodes and tree assembly.
// Storage lives in crate::database, orchestration in crate::services.

pub mod error;
pub mod kind;
pub mod node;
pub mod path;
pub mod tree;

pub use error::EntityError;
pub use kind::{Attachment, CategoryKind, StructuralKind};
pub use node::{CategoryRef, Entity, HierarchyNode, NewEntity};
pub use path::EntityPath;
pub use tree::ListDepth;
