//! Table definitions for the backing store.
//!
//! Timestamps are integer Unix milliseconds; ids are snowflakes stored as
//! signed integers. Uniqueness and check constraints here are the backstop
//! for races the repository layer cannot pre-check (duplicate handles,
//! follow/favorite edges).

use sqlx::SqlitePool;

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY,
        handle TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        credential_hash TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS posts (
        post_id INTEGER PRIMARY KEY,
        author_id INTEGER NOT NULL REFERENCES users (user_id),
        body TEXT NOT NULL,
        parent_post_id INTEGER REFERENCES posts (post_id),
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS favorites (
        user_id INTEGER NOT NULL REFERENCES users (user_id),
        post_id INTEGER NOT NULL REFERENCES posts (post_id),
        created_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, post_id)
    )",
    "CREATE TABLE IF NOT EXISTS follows (
        follower_id INTEGER NOT NULL REFERENCES users (user_id),
        followee_id INTEGER NOT NULL REFERENCES users (user_id),
        created_at INTEGER NOT NULL,
        PRIMARY KEY (follower_id, followee_id),
        CHECK (follower_id <> followee_id)
    )",
    "CREATE TABLE IF NOT EXISTS hashtag_mentions (
        post_id INTEGER NOT NULL REFERENCES posts (post_id),
        term TEXT NOT NULL,
        PRIMARY KEY (post_id, term)
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        token_hash BLOB PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users (user_id),
        created_at INTEGER NOT NULL,
        expires_after_seconds INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_posts_author
        ON posts (author_id, created_at DESC, post_id DESC)",
    "CREATE INDEX IF NOT EXISTS idx_posts_parent ON posts (parent_post_id)",
    "CREATE INDEX IF NOT EXISTS idx_posts_created
        ON posts (created_at DESC, post_id DESC)",
    "CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows (followee_id)",
    "CREATE INDEX IF NOT EXISTS idx_hashtag_mentions_term
        ON hashtag_mentions (term)",
];

/// Applies the schema to a fresh or existing database. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
