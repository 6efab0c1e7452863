use quill_common::{
    model::{
        Id, ModelValidationError, QuillSnowflake, QuillSnowflakeGenerator, page::Cursor,
        post::PostMarker, user::UserMarker,
    },
    snowflake::NodeId,
};
use sqlx::{SqliteConnection, SqlitePool};
use std::{
    fmt::{Display, Formatter},
    sync::{Mutex, PoisonError},
};
use thiserror::Error;

mod favorites;
mod follows;
mod posts;
mod sessions;
mod users;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Entity {
    User,
    Post,
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Entity::User => "user",
            Entity::Post => "post",
        })
    }
}

/// Store-level failure taxonomy. Every variant except [`DbError::Unavailable`]
/// is terminal for the call that produced it.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("The {0} was not found")]
    NotFound(Entity),
    #[error("The handle is already taken")]
    DuplicateHandle,
    #[error("A user cannot follow themselves")]
    SelfFollow,
    #[error("The follow relationship already exists")]
    AlreadyFollowing,
    #[error("The follow relationship does not exist")]
    NotFollowing,
    #[error("The post is already favorited")]
    AlreadyFavorited,
    #[error("The post is not favorited")]
    NotFavorited,
    #[error("The backing store is unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
}

impl DbError {
    /// Whether the caller may retry the operation with backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Unavailable(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        DbError::Unavailable(error)
    }
}

/// The repository layer: typed entity operations over one connection pool.
///
/// Ids are minted here so creation order and id order agree; every write runs
/// as a single transaction.
pub struct DbClient {
    pool: SqlitePool,
    snowflake_generator: Mutex<QuillSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool, node_id: NodeId) -> Self {
        let snowflake_generator = Mutex::new(QuillSnowflakeGenerator::new(node_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    fn next_id(&self) -> QuillSnowflake {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn id_param<Marker>(id: Id<Marker>) -> i64 {
    id.snowflake().get().cast_signed()
}

/// Keyset bound for `(created_at, id) < (?, ?)` clauses; no cursor means no
/// upper bound.
fn cursor_bounds(after: Option<Cursor>) -> (i64, i64) {
    after.map_or((i64::MAX, i64::MAX), |cursor| {
        (cursor.position().get(), cursor.id().cast_signed())
    })
}

async fn user_exists(conn: &mut SqliteConnection, user_id: Id<UserMarker>) -> Result<bool> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE user_id = ?)")
            .bind(id_param(user_id))
            .fetch_one(conn)
            .await?;

    Ok(exists)
}

async fn post_exists(conn: &mut SqliteConnection, post_id: Id<PostMarker>) -> Result<bool> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM posts WHERE post_id = ?)")
            .bind(id_param(post_id))
            .fetch_one(conn)
            .await?;

    Ok(exists)
}
