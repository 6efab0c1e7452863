use crate::{
    client::{
        DbClient, DbError, Entity, Result, cursor_bounds, id_param, is_unique_violation,
        post_exists, user_exists,
    },
    record::FavoritedPostRecord,
};
use quill_common::model::{
    Id, UnixMillis,
    page::{Cursor, PageLimit},
    post::{FavoritedPost, PostMarker},
    user::UserMarker,
};
use time::UtcDateTime;

impl DbClient {
    /// Favorites a post for a user. Favoriting one's own post is allowed; a
    /// second favorite of the same post is [`DbError::AlreadyFavorited`],
    /// whether detected by a racing insert or a clean retry.
    pub async fn create_favorite(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if !user_exists(&mut tx, user_id).await? {
            return Err(DbError::NotFound(Entity::User));
        }
        if !post_exists(&mut tx, post_id).await? {
            return Err(DbError::NotFound(Entity::Post));
        }

        let result =
            sqlx::query("INSERT INTO favorites (user_id, post_id, created_at) VALUES (?, ?, ?)")
                .bind(id_param(user_id))
                .bind(id_param(post_id))
                .bind(UnixMillis::from(UtcDateTime::now()).get())
                .execute(&mut *tx)
                .await;

        match result {
            Ok(_) => {
                tx.commit().await?;
                Ok(())
            }
            Err(error) if is_unique_violation(&error) => Err(DbError::AlreadyFavorited),
            Err(error) => Err(error.into()),
        }
    }

    pub async fn delete_favorite(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<()> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND post_id = ?")
            .bind(id_param(user_id))
            .bind(id_param(post_id))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            Err(DbError::NotFavorited)
        } else {
            Ok(())
        }
    }

    /// The user's favorited posts, most recently favorited first, keyset on
    /// the favorite instant.
    pub async fn fetch_favorited_posts(
        &self,
        user_id: Id<UserMarker>,
        after: Option<Cursor>,
        limit: PageLimit,
    ) -> Result<Vec<FavoritedPost>> {
        let (after_millis, after_id) = cursor_bounds(after);

        let records = sqlx::query_as::<_, FavoritedPostRecord>(
            "SELECT
                posts.post_id,
                posts.body,
                posts.parent_post_id,
                posts.created_at,
                users.user_id AS author_id,
                users.handle AS author_handle,
                users.display_name AS author_display_name,
                users.created_at AS author_created_at,
                favorites.created_at AS favorited_at
            FROM favorites
            JOIN posts ON posts.post_id = favorites.post_id
            JOIN users ON users.user_id = posts.author_id
            WHERE favorites.user_id = ?1
                AND (favorites.created_at, favorites.post_id) < (?2, ?3)
            ORDER BY favorites.created_at DESC, favorites.post_id DESC
            LIMIT ?4",
        )
        .bind(id_param(user_id))
        .bind(after_millis)
        .bind(after_id)
        .bind(i64::from(limit.get()))
        .fetch_all(&self.pool)
        .await?;

        let favorited = records
            .into_iter()
            .map(FavoritedPost::try_from)
            .collect::<Result<_, _>>()?;
        Ok(favorited)
    }
}
