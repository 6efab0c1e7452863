use crate::{
    client::{DbClient, DbError, Entity, Result, cursor_bounds, id_param, post_exists},
    record::{PostRecord, PostStatsRecord, UserRecord},
};
use quill_common::model::{
    Id, ModelValidationError, UnixMillis,
    page::{Cursor, PageLimit},
    post::{CreatePost, Post, PostMarker, PostStats},
    search::SearchQuery,
    user::{User, UserMarker},
};

/// Shared head of every post-returning query: one row per post, author
/// columns aliased for the record decoder.
const POST_SELECT: &str = "
    SELECT
        posts.post_id,
        posts.body,
        posts.parent_post_id,
        posts.created_at,
        users.user_id AS author_id,
        users.handle AS author_handle,
        users.display_name AS author_display_name,
        users.created_at AS author_created_at
    FROM posts
    JOIN users ON users.user_id = posts.author_id";

fn decode_posts(records: Vec<PostRecord>) -> Result<Vec<Post>> {
    let posts = records
        .into_iter()
        .map(Post::try_from)
        .collect::<Result<_, ModelValidationError>>()?;
    Ok(posts)
}

impl DbClient {
    /// Creates a post, verifying the author (and parent, for replies) inside
    /// the same transaction that performs the insert. Hashtag mentions are
    /// extracted from the body and stored alongside.
    pub async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut tx = self.pool.begin().await?;

        let author_record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, handle, display_name, created_at
            FROM users
            WHERE user_id = ?",
        )
        .bind(id_param(post.author))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound(Entity::User))?;
        let author = User::try_from(author_record)?;

        if let Some(parent) = post.parent
            && !post_exists(&mut tx, parent).await?
        {
            return Err(DbError::NotFound(Entity::Post));
        }

        let id = self.next_id();
        let created_at = id.timestamp();

        sqlx::query(
            "INSERT INTO posts (post_id, author_id, body, parent_post_id, created_at)
            VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.get().cast_signed())
        .bind(id_param(post.author))
        .bind(post.body.get())
        .bind(post.parent.map(id_param))
        .bind(UnixMillis::from(created_at).get())
        .execute(&mut *tx)
        .await?;

        for term in post.body.hashtags() {
            sqlx::query("INSERT INTO hashtag_mentions (post_id, term) VALUES (?, ?)")
                .bind(id.get().cast_signed())
                .bind(term)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Post {
            id: id.into(),
            author,
            body: post.body.clone(),
            parent: post.parent,
            created_at,
        })
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let sql = format!("{POST_SELECT} WHERE posts.post_id = ?");
        let record = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(id_param(post_id))
            .fetch_optional(&self.pool)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// Posts authored by users the given user follows, optionally including
    /// the user's own, newest first.
    pub async fn fetch_timeline(
        &self,
        user_id: Id<UserMarker>,
        include_self: bool,
        after: Option<Cursor>,
        limit: PageLimit,
    ) -> Result<Vec<Post>> {
        let sql = format!(
            "{POST_SELECT}
            WHERE (posts.author_id IN
                    (SELECT followee_id FROM follows WHERE follower_id = ?1)
                OR (?2 AND posts.author_id = ?1))
                AND (posts.created_at, posts.post_id) < (?3, ?4)
            ORDER BY posts.created_at DESC, posts.post_id DESC
            LIMIT ?5"
        );
        let (after_millis, after_id) = cursor_bounds(after);

        let records = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(id_param(user_id))
            .bind(include_self)
            .bind(after_millis)
            .bind(after_id)
            .bind(i64::from(limit.get()))
            .fetch_all(&self.pool)
            .await?;

        decode_posts(records)
    }

    pub async fn fetch_user_posts(
        &self,
        user_id: Id<UserMarker>,
        after: Option<Cursor>,
        limit: PageLimit,
    ) -> Result<Vec<Post>> {
        let sql = format!(
            "{POST_SELECT}
            WHERE posts.author_id = ?1
                AND (posts.created_at, posts.post_id) < (?2, ?3)
            ORDER BY posts.created_at DESC, posts.post_id DESC
            LIMIT ?4"
        );
        let (after_millis, after_id) = cursor_bounds(after);

        let records = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(id_param(user_id))
            .bind(after_millis)
            .bind(after_id)
            .bind(i64::from(limit.get()))
            .fetch_all(&self.pool)
            .await?;

        decode_posts(records)
    }

    pub async fn fetch_replies(
        &self,
        post_id: Id<PostMarker>,
        after: Option<Cursor>,
        limit: PageLimit,
    ) -> Result<Vec<Post>> {
        let sql = format!(
            "{POST_SELECT}
            WHERE posts.parent_post_id = ?1
                AND (posts.created_at, posts.post_id) < (?2, ?3)
            ORDER BY posts.created_at DESC, posts.post_id DESC
            LIMIT ?4"
        );
        let (after_millis, after_id) = cursor_bounds(after);

        let records = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(id_param(post_id))
            .bind(after_millis)
            .bind(after_id)
            .bind(i64::from(limit.get()))
            .fetch_all(&self.pool)
            .await?;

        decode_posts(records)
    }

    /// Posts whose body contains the query case-insensitively, or that
    /// mention it as a hashtag, newest first.
    pub async fn search_posts(&self, query: &SearchQuery) -> Result<Vec<Post>> {
        let sql = format!(
            "{POST_SELECT}
            WHERE posts.body COLLATE NOCASE LIKE ?1 ESCAPE '\\'
                OR posts.post_id IN
                    (SELECT post_id FROM hashtag_mentions WHERE term = ?2)
            ORDER BY posts.created_at DESC, posts.post_id DESC"
        );

        let records = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(query.like_pattern())
            .bind(query.hashtag_term())
            .fetch_all(&self.pool)
            .await?;

        decode_posts(records)
    }

    pub async fn fetch_post_stats(&self, post_id: Id<PostMarker>) -> Result<PostStats> {
        let record = sqlx::query_as::<_, PostStatsRecord>(
            "SELECT
                (SELECT COUNT(*) FROM posts WHERE parent_post_id = ?1) AS reply_count,
                (SELECT COUNT(*) FROM favorites WHERE post_id = ?1) AS favorite_count",
        )
        .bind(id_param(post_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }
}
