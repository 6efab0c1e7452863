use crate::{
    client::{DbClient, DbError, Entity, Result, id_param, is_unique_violation, user_exists},
    record::UserRecord,
};
use quill_common::model::{
    Id, UnixMillis,
    user::{User, UserMarker},
};
use time::UtcDateTime;

impl DbClient {
    /// Adds a follow edge. Both users are verified inside the transaction;
    /// a racing duplicate insert is caught by the primary key and reported as
    /// [`DbError::AlreadyFollowing`].
    pub async fn create_follow(
        &self,
        follower: Id<UserMarker>,
        followee: Id<UserMarker>,
    ) -> Result<()> {
        if follower == followee {
            return Err(DbError::SelfFollow);
        }

        let mut tx = self.pool.begin().await?;

        if !user_exists(&mut tx, follower).await? || !user_exists(&mut tx, followee).await? {
            return Err(DbError::NotFound(Entity::User));
        }

        let result = sqlx::query(
            "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(id_param(follower))
        .bind(id_param(followee))
        .bind(UnixMillis::from(UtcDateTime::now()).get())
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {
                tx.commit().await?;
                Ok(())
            }
            Err(error) if is_unique_violation(&error) => Err(DbError::AlreadyFollowing),
            Err(error) => Err(error.into()),
        }
    }

    pub async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        followee: Id<UserMarker>,
    ) -> Result<()> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(id_param(follower))
            .bind(id_param(followee))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            Err(DbError::NotFollowing)
        } else {
            Ok(())
        }
    }

    pub async fn fetch_followers(&self, user_id: Id<UserMarker>) -> Result<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT users.user_id, users.handle, users.display_name, users.created_at
            FROM follows
            JOIN users ON users.user_id = follows.follower_id
            WHERE follows.followee_id = ?
            ORDER BY users.handle ASC",
        )
        .bind(id_param(user_id))
        .fetch_all(&self.pool)
        .await?;

        let users = records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?;
        Ok(users)
    }

    pub async fn fetch_following(&self, user_id: Id<UserMarker>) -> Result<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT users.user_id, users.handle, users.display_name, users.created_at
            FROM follows
            JOIN users ON users.user_id = follows.followee_id
            WHERE follows.follower_id = ?
            ORDER BY users.handle ASC",
        )
        .bind(id_param(user_id))
        .fetch_all(&self.pool)
        .await?;

        let users = records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?;
        Ok(users)
    }
}
