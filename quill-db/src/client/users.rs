use crate::{
    client::{DbClient, DbError, Result, id_param, is_unique_violation},
    record::{CredentialRecord, ProfileCountsRecord, UserRecord},
};
use quill_common::model::{
    Id, UnixMillis,
    auth::StoredCredential,
    search::SearchQuery,
    user::{CreateUser, ProfileCounts, User, UserHandle, UserMarker},
};

impl DbClient {
    pub async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let id = self.next_id();
        let created_at = id.timestamp();

        let result = sqlx::query(
            "INSERT INTO users (user_id, handle, display_name, credential_hash, created_at)
            VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.get().cast_signed())
        .bind(user.handle.get())
        .bind(user.display_name.get())
        .bind(user.credential_hash.get())
        .bind(UnixMillis::from(created_at).get())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(User {
                id: id.into(),
                handle: user.handle.clone(),
                display_name: user.display_name.clone(),
                created_at,
            }),
            Err(error) if is_unique_violation(&error) => Err(DbError::DuplicateHandle),
            Err(error) => Err(error.into()),
        }
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, handle, display_name, created_at
            FROM users
            WHERE user_id = ?",
        )
        .bind(id_param(user_id))
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, handle, display_name, created_at
            FROM users
            WHERE handle = ?",
        )
        .bind(handle.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// The stored hash for a handle, for login verification. Deliberately
    /// separate from [`DbClient::fetch_user_by_handle`] so credential hashes
    /// never travel with the profile model.
    pub async fn fetch_credential(&self, handle: &UserHandle) -> Result<Option<StoredCredential>> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            "SELECT user_id, credential_hash
            FROM users
            WHERE handle = ?",
        )
        .bind(handle.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(StoredCredential::from))
    }

    /// Users whose handle or display name contains the query,
    /// case-insensitively. Shortest display name first (the closest thing to
    /// relevance a substring match has), then handle for determinism.
    pub async fn search_users(&self, query: &SearchQuery) -> Result<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, handle, display_name, created_at
            FROM users
            WHERE handle COLLATE NOCASE LIKE ?1 ESCAPE '\\'
                OR display_name COLLATE NOCASE LIKE ?1 ESCAPE '\\'
            ORDER BY LENGTH(display_name) ASC, handle ASC",
        )
        .bind(query.like_pattern())
        .fetch_all(&self.pool)
        .await?;

        let users = records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?;
        Ok(users)
    }

    /// Per-profile counters, computed in one round trip (the profile view
    /// shows all four together).
    pub async fn fetch_profile_counts(&self, user_id: Id<UserMarker>) -> Result<ProfileCounts> {
        let record = sqlx::query_as::<_, ProfileCountsRecord>(
            "SELECT
                (SELECT COUNT(*) FROM posts WHERE author_id = ?1) AS post_count,
                (SELECT COUNT(*) FROM favorites WHERE user_id = ?1) AS favorites_count,
                (SELECT COUNT(*) FROM follows WHERE followee_id = ?1) AS followers_count,
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?1) AS following_count",
        )
        .bind(id_param(user_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }
}
