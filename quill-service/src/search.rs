use crate::error::Result;
use quill_common::model::{ModelValidationError, post::Post, search::SearchQuery, user::User};
use quill_db::client::DbClient;
use std::sync::Arc;

/// Substring search over users and posts. Each call issues a fresh query, so
/// result sequences are finite and restartable.
pub struct SearchService {
    db: Arc<DbClient>,
}

impl SearchService {
    #[must_use]
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }

    /// Users whose handle or display name contains `query`,
    /// case-insensitively, most relevant first.
    pub async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        let query = SearchQuery::new(query).map_err(ModelValidationError::from)?;
        Ok(self.db.search_users(&query).await?)
    }

    /// Posts whose body contains `query` case-insensitively, or that mention
    /// it as a hashtag, newest first.
    pub async fn search_posts(&self, query: &str) -> Result<Vec<Post>> {
        let query = SearchQuery::new(query).map_err(ModelValidationError::from)?;
        Ok(self.db.search_posts(&query).await?)
    }
}
