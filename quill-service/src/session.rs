use crate::error::{Result, ServiceError};
use quill_common::model::{
    Id, ModelValidationError,
    auth::{Credential, PositiveDuration, Session, SessionToken},
    user::{CreateUser, DisplayName, User, UserHandle, UserMarker},
};
use quill_db::client::DbClient;
use std::sync::Arc;
use time::UtcDateTime;
use tracing::debug;

/// Signup, login, and session validation.
///
/// `session_ttl` bounds how long a minted session stays valid; `None` means
/// sessions live until logout.
pub struct SessionService {
    db: Arc<DbClient>,
    session_ttl: Option<PositiveDuration>,
}

impl SessionService {
    #[must_use]
    pub fn new(db: Arc<DbClient>, session_ttl: Option<PositiveDuration>) -> Self {
        Self { db, session_ttl }
    }

    /// Registers a user. The plaintext credential is hashed here; the
    /// repository only ever stores the hash.
    pub async fn signup(&self, handle: &str, display_name: &str, credential: &str) -> Result<User> {
        let handle = UserHandle::new(handle.to_owned()).map_err(ModelValidationError::from)?;
        let display_name =
            DisplayName::new(display_name.to_owned()).map_err(ModelValidationError::from)?;
        let credential =
            Credential::new(credential.to_owned()).map_err(ModelValidationError::from)?;

        let credential_hash = credential.hash()?;
        let user = self
            .db
            .create_user(&CreateUser {
                handle,
                display_name,
                credential_hash,
            })
            .await?;

        debug!(user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Verifies a handle/credential pair and mints a session token.
    ///
    /// Unknown handle, malformed handle, and wrong credential are all
    /// [`ServiceError::InvalidCredentials`]; the unknown-handle path burns a
    /// hash so its timing matches the known-handle path.
    pub async fn login(&self, handle: &str, credential: &str) -> Result<SessionToken> {
        let Ok(credential) = Credential::new(credential.to_owned()) else {
            return Err(ServiceError::InvalidCredentials);
        };
        let Ok(handle) = UserHandle::new(handle.to_owned()) else {
            credential.burn_hash();
            return Err(ServiceError::InvalidCredentials);
        };

        let Some(stored) = self.db.fetch_credential(&handle).await? else {
            credential.burn_hash();
            debug!(handle = handle.get(), "login failed: unknown handle");
            return Err(ServiceError::InvalidCredentials);
        };

        if !stored.hash.verify(&credential)? {
            debug!(handle = handle.get(), "login failed: credential mismatch");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = SessionToken::mint(stored.user);
        let token_hash = token.hash()?;

        self.db
            .create_session(&Session {
                user: stored.user,
                token_hash,
                created_at: UtcDateTime::now(),
                expires_after: self.session_ttl,
            })
            .await?;

        debug!(user_id = %stored.user, "login succeeded");
        Ok(token)
    }

    /// Resolves a bearer token string back to the user it was minted for.
    pub async fn authenticate(&self, token: &str) -> Result<Id<UserMarker>> {
        let token = token
            .parse::<SessionToken>()
            .map_err(|_| ServiceError::InvalidCredentials)?;
        let token_hash = token.hash()?;

        let Some(session) = self.db.fetch_session(&token_hash).await? else {
            return Err(ServiceError::InvalidCredentials);
        };

        if session.is_expired_at(UtcDateTime::now()) {
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(session.user)
    }

    /// Ends a session. Returns whether one was actually removed; a repeated
    /// logout is a no-op, not an error.
    pub async fn logout(&self, token: &str) -> Result<bool> {
        let token = token
            .parse::<SessionToken>()
            .map_err(|_| ServiceError::InvalidCredentials)?;
        let token_hash = token.hash()?;

        Ok(self.db.delete_session(&token_hash).await?)
    }
}
