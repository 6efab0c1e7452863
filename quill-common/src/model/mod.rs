pub mod auth;
pub mod page;
pub mod post;
pub mod search;
pub mod user;

use crate::{
    model::{
        auth::{InvalidCredentialError, InvalidSessionTokenHashError, NonPositiveDurationError},
        post::InvalidPostBodyError,
        search::InvalidSearchQueryError,
        user::{InvalidDisplayNameError, InvalidUserHandleError},
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

/// A value decoded from the store or received from a caller failed domain
/// validation.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserHandle(#[from] InvalidUserHandleError),
    #[error(transparent)]
    DisplayName(#[from] InvalidDisplayNameError),
    #[error(transparent)]
    PostBody(#[from] InvalidPostBodyError),
    #[error(transparent)]
    SearchQuery(#[from] InvalidSearchQueryError),
    #[error(transparent)]
    Credential(#[from] InvalidCredentialError),
    #[error(transparent)]
    TokenHash(#[from] InvalidSessionTokenHashError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    Timestamp(#[from] InvalidTimestampError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct QuillEpoch;
impl Epoch for QuillEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2024-01-01 00:00);
}

pub type QuillSnowflake = Snowflake<QuillEpoch>;
pub type QuillSnowflakeGenerator = SnowflakeGenerator<QuillEpoch>;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(QuillSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: QuillSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> QuillSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<QuillSnowflake> for Id<Marker> {
    fn from(value: QuillSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for QuillSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(QuillSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

/// Millisecond-precision Unix timestamp, the representation timestamps take
/// in the backing store.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixMillis(i64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Timestamp out of range: {0}")]
pub struct InvalidTimestampError(i64);

impl UnixMillis {
    #[must_use]
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<UtcDateTime> for UnixMillis {
    fn from(value: UtcDateTime) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self((value.unix_timestamp_nanos() / 1_000_000) as i64)
    }
}

impl TryFrom<UnixMillis> for UtcDateTime {
    type Error = InvalidTimestampError;

    fn try_from(value: UnixMillis) -> Result<Self, Self::Error> {
        UtcDateTime::from_unix_timestamp_nanos(i128::from(value.0) * 1_000_000)
            .map_err(|_| InvalidTimestampError(value.0))
    }
}
