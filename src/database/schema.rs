use sqlx::PgPool;

use crate::database::manager::DatabaseError;

/// Bootstrap the collections. The store is document-flexible by design:
/// no foreign keys - referential checks (category exists, category is
/// unreferenced) are application-level, matching the original store's
/// semantics.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        avatar TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL,
        description TEXT,
        color TEXT NOT NULL DEFAULT '#6B7280',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT categories_name_key UNIQUE (name),
        CONSTRAINT categories_slug_key UNIQUE (slug)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        content TEXT NOT NULL,
        excerpt TEXT,
        category_id UUID NOT NULL,
        author_id UUID NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}',
        featured_image TEXT,
        is_published BOOLEAN NOT NULL DEFAULT TRUE,
        view_count INTEGER NOT NULL DEFAULT 0,
        comments JSONB NOT NULL DEFAULT '[]',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT posts_title_key UNIQUE (title),
        CONSTRAINT posts_slug_key UNIQUE (slug)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS posts_category_id_idx ON posts (category_id)",
    "CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC)",
];

pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
