use crate::{
    client::{DbClient, Result, id_param},
    record::SessionRecord,
};
use quill_common::model::{
    UnixMillis,
    auth::{Session, SessionTokenHash},
};

impl DbClient {
    pub async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_after_seconds)
            VALUES (?, ?, ?, ?)",
        )
        .bind(session.token_hash.as_bytes())
        .bind(id_param(session.user))
        .bind(UnixMillis::from(session.created_at).get())
        .bind(session.expires_after.map(|ttl| ttl.get().whole_seconds()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_session(&self, token_hash: &SessionTokenHash) -> Result<Option<Session>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT user_id, token_hash, created_at, expires_after_seconds
            FROM sessions
            WHERE token_hash = ?",
        )
        .bind(token_hash.as_bytes())
        .fetch_optional(&self.pool)
        .await?;

        let session = record.map(Session::try_from).transpose()?;
        Ok(session)
    }

    /// Removes a session. Returns whether one existed, so logout can be
    /// idempotent at the service layer.
    pub async fn delete_session(&self, token_hash: &SessionTokenHash) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash.as_bytes())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
