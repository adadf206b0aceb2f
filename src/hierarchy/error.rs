use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// Errors raised by the entity hierarchy engine
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Category with ID {0} not found")]
    CategoryNotFound(Uuid),

    #[error("Entity with ID {0} not found")]
    EntityNotFound(Uuid),

    #[error("No parent entity could be resolved for user {0}")]
    ParentResolutionFailed(String),

    #[error("User with ID {0} does not have any existing entities")]
    NoExistingEntities(String),

    #[error("Failed to create sub-entity: {0}")]
    CreateSubFailed(#[source] Box<EntityError>),

    #[error("Operation cancelled after {0:?}")]
    Cancelled(Duration),

    #[error("Stored entity violates hierarchy invariants: {0}")]
    Integrity(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl EntityError {
    pub fn create_sub_failed(cause: EntityError) -> Self {
        match cause {
            // Never double-wrap
            EntityError::CreateSubFailed(_) => cause,
            other => EntityError::CreateSubFailed(Box::new(other)),
        }
    }

    /// The innermost error, looking through `CreateSubFailed`.
    pub fn cause(&self) -> &EntityError {
        match self {
            EntityError::CreateSubFailed(inner) => inner.cause(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.cause(),
            EntityError::EntityNotFound(_) | EntityError::CategoryNotFound(_)
        )
    }
}

impl From<sqlx::Error> for EntityError {
    fn from(err: sqlx::Error) -> Self {
        EntityError::Store(DatabaseError::Sqlx(err))
    }
}
