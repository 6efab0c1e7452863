//! Credential and session-token primitives.
//!
//! Plaintext never leaves this module: credentials are argon2-hashed into PHC
//! strings at signup, and session tokens are random values of which only an
//! argon2 hash is persisted. Verification goes through the argon2 verifier,
//! which compares in constant time.

use crate::model::{Id, user::UserMarker};
use argon2::{
    Argon2, Params,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use base64::{DecodeError, Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const CREDENTIAL_MIN_LEN: usize = 8;
pub const CREDENTIAL_MAX_LEN: usize = 128;

pub const SESSION_TOKEN_CORE_LEN: usize = 32;
pub const SESSION_TOKEN_SALT_LEN: usize = 16;
pub const SESSION_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

// Fixed salt for the dummy hash burned when a login names an unknown handle.
const BURN_SALT: &[u8] = b"quill-login-burn";

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum HashError {
    #[error("Hashing failed: {0}")]
    Hash(argon2::Error),
    #[error("The stored hash string is invalid: {0}")]
    Format(password_hash::Error),
}

/// A plaintext credential as presented by a caller. Redacted in debug output.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Credential(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The credential length is out of range")]
pub struct InvalidCredentialError;

impl Credential {
    pub fn new(credential: String) -> Result<Self, InvalidCredentialError> {
        let length = credential.chars().count();
        if (CREDENTIAL_MIN_LEN..=CREDENTIAL_MAX_LEN).contains(&length) {
            Ok(Self(credential))
        } else {
            Err(InvalidCredentialError)
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn hash(&self) -> Result<CredentialHash, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(self.as_bytes(), &salt)
            .map_err(HashError::Format)?;

        Ok(CredentialHash(hash.to_string()))
    }

    /// Runs a hash over a fixed salt and discards the result, so a login
    /// against an unknown handle takes as long as one against a known handle.
    pub fn burn_hash(&self) {
        let mut out = [0; SESSION_TOKEN_HASH_LEN];
        let _ = Argon2::default().hash_password_into(self.as_bytes(), BURN_SALT, &mut out);
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&"[redacted]").finish()
    }
}

/// An argon2 PHC hash string as stored in the users relation.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CredentialHash(String);

impl CredentialHash {
    #[must_use]
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Constant-time verification of a presented credential against this
    /// hash. `Ok(false)` is a mismatch; `Err` means the stored hash itself
    /// could not be used.
    pub fn verify(&self, credential: &Credential) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(&self.0).map_err(HashError::Format)?;

        match Argon2::default().verify_password(credential.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(error) => Err(HashError::Format(error)),
        }
    }
}

impl Debug for CredentialHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CredentialHash").field(&"[redacted]").finish()
    }
}

/// The user id and hash the store holds for a handle, as needed to check a
/// login attempt.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct StoredCredential {
    pub user: Id<UserMarker>,
    pub hash: CredentialHash,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum SessionTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// A bearer session token. The token string carries the user id plus random
/// core and salt parts; the store only ever sees the hash.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionToken {
    user_id: Id<UserMarker>,
    core: [u8; SESSION_TOKEN_CORE_LEN],
    salt: [u8; SESSION_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionTokenHash(pub Box<[u8; SESSION_TOKEN_HASH_LEN]>);

impl SessionToken {
    #[must_use]
    pub fn mint(user_id: Id<UserMarker>) -> Self {
        Self {
            user_id,
            core: rand::random(),
            salt: rand::random(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.user_id
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let encoded_core = BASE64_URL_SAFE_NO_PAD.encode(self.core);
        let encoded_salt = BASE64_URL_SAFE_NO_PAD.encode(self.salt);

        format!("{user_id}:{encoded_core}:{encoded_salt}")
    }

    pub fn hash(&self) -> Result<SessionTokenHash, HashError> {
        let mut hash = Box::new([0; SESSION_TOKEN_HASH_LEN]);
        Argon2::default()
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(HashError::Hash)?;

        Ok(SessionTokenHash(hash))
    }
}

impl FromStr for SessionToken {
    type Err = SessionTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let core_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = u64::from_str(user_id_part)
            .map_err(Self::Err::InvalidUserId)?
            .into();
        let core = BASE64_URL_SAFE_NO_PAD
            .decode(core_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidCoreLength)?;
        let salt = BASE64_URL_SAFE_NO_PAD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            core,
            salt,
        })
    }
}

impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl SessionTokenHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &*self.0
    }
}

impl Debug for SessionTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionTokenHash")
            .field(&"[redacted]")
            .finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The session token hash had an invalid length")]
pub struct InvalidSessionTokenHashError;

impl TryFrom<Box<[u8]>> for SessionTokenHash {
    type Error = InvalidSessionTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        Ok(Self(
            value.try_into().map_err(|_| InvalidSessionTokenHashError)?,
        ))
    }
}

/// A login session as persisted in the sessions relation.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Session {
    pub user: Id<UserMarker>,
    pub token_hash: SessionTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Session {
    #[must_use]
    pub fn is_expired_at(&self, now: UtcDateTime) -> bool {
        matches!(self.expires_after, Some(ttl) if self.created_at + ttl.get() < now)
    }
}

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn new_unchecked(duration: Duration) -> Self {
        Self::new(duration).expect("Duration was not positive.")
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }
}

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        auth::{Credential, PositiveDuration, Session, SessionToken},
        user::UserMarker,
    };
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn credential_length_bounds() {
        assert!(Credential::new("12345678".to_owned()).is_ok());
        assert!(Credential::new("1234567".to_owned()).is_err());
        assert!(Credential::new("x".repeat(128)).is_ok());
        assert!(Credential::new("x".repeat(129)).is_err());
    }

    #[test]
    fn credential_hash_verifies_only_the_original() {
        let credential = Credential::new("correct horse battery".to_owned()).unwrap();
        let other = Credential::new("incorrect horse".to_owned()).unwrap();
        let hash = credential.hash().unwrap();

        assert_eq!(hash.verify(&credential), Ok(true));
        assert_eq!(hash.verify(&other), Ok(false));
    }

    #[test]
    fn session_token_round_trips_through_string_form() {
        let user_id = Id::<UserMarker>::from(99_u64);
        let token = SessionToken::mint(user_id);

        let parsed: SessionToken = token.as_token_str().parse().unwrap();
        assert_eq!(parsed, token);
        assert_eq!(parsed.user_id(), user_id);
        assert_eq!(parsed.hash().unwrap(), token.hash().unwrap());
    }

    #[test]
    fn distinct_tokens_have_distinct_hashes() {
        let user_id = Id::<UserMarker>::from(7_u64);
        let first = SessionToken::mint(user_id);
        let second = SessionToken::mint(user_id);

        assert_ne!(first, second);
        assert_ne!(first.hash().unwrap(), second.hash().unwrap());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!("no-separators".parse::<SessionToken>().is_err());
        assert!("1:short".parse::<SessionToken>().is_err());
        assert!("abc:def:ghi".parse::<SessionToken>().is_err());
    }

    #[test]
    fn session_expiry() {
        let created_at = utc_datetime!(2025-01-01 12:00);
        let token_hash = SessionToken::mint(Id::from(1_u64)).hash().unwrap();

        let bounded = Session {
            user: Id::from(1_u64),
            token_hash: token_hash.clone(),
            created_at,
            expires_after: Some(PositiveDuration::new_unchecked(Duration::hours(1))),
        };
        assert!(!bounded.is_expired_at(created_at + Duration::minutes(59)));
        assert!(bounded.is_expired_at(created_at + Duration::minutes(61)));

        let unbounded = Session {
            expires_after: None,
            ..bounded
        };
        assert!(!unbounded.is_expired_at(created_at + Duration::days(365)));
    }
}
