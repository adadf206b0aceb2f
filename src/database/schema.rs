use sqlx::PgPool;
use tracing::info;

use crate::database::manager::DatabaseError;

/// Table and index definitions, applied in order. Every statement is
/// idempotent so `apply` can run on each deploy.
pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS z_category (
        category_id UUID PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        type        TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS z_entity (
        entity_id   UUID PRIMARY KEY,
        category_id UUID NOT NULL REFERENCES z_category (category_id),
        name        TEXT NOT NULL CHECK (name <> ''),
        user_id     TEXT,
        details     JSONB,
        parent_id   UUID REFERENCES z_entity (entity_id),
        path        UUID[] NOT NULL,
        depth       INTEGER NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT z_entity_depth_matches_path CHECK (depth = cardinality(path) - 1),
        CONSTRAINT z_entity_path_ends_with_self CHECK (path[cardinality(path)] = entity_id),
        CONSTRAINT z_entity_single_attachment CHECK ((user_id IS NULL) <> (details IS NULL)),
        CONSTRAINT z_entity_root_has_no_parent CHECK ((parent_id IS NULL) = (depth = 0))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS z_entity_path_idx ON z_entity USING GIN (path)",
    "CREATE INDEX IF NOT EXISTS z_entity_parent_idx ON z_entity (parent_id)",
    "CREATE INDEX IF NOT EXISTS z_entity_user_idx ON z_entity (user_id) WHERE user_id IS NOT NULL",
    r#"
    CREATE TABLE IF NOT EXISTS z_users (
        user_id     TEXT PRIMARY KEY,
        email       TEXT NOT NULL,
        first_name  TEXT,
        last_name   TEXT,
        phone       TEXT,
        address     JSONB,
        parent_id   TEXT REFERENCES z_users (user_id),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT z_users_not_own_parent CHECK (parent_id <> user_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS z_users_parent_idx ON z_users (parent_id) WHERE parent_id IS NOT NULL",
];

/// Advisory lock key held while the schema is applied
const SCHEMA_LOCK_KEY: i64 = 0x7a6f_6c61_7269_73;

/// Create the tables if they do not exist yet. Concurrent callers are
/// serialized on an advisory lock, so several instances may start at once.
pub async fn apply(pool: &PgPool) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!("Applied {} schema statements", STATEMENTS.len());
    Ok(())
}
