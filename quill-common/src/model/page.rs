//! Keyset pagination over time-ordered result sets.
//!
//! A [`Cursor`] names the last-seen position as `(creation instant, id)`, so
//! pages remain stable under concurrent inserts: rows that existed when
//! pagination began are neither skipped nor repeated.

use crate::model::UnixMillis;
use base64::{DecodeError, Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use std::{
    fmt::{Display, Formatter},
    num::ParseIntError,
    str::FromStr,
    string::FromUtf8Error,
};
use thiserror::Error;

pub const PAGE_LIMIT_MAX: u32 = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PageLimit(u32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The page limit is out of range: {0}")]
pub struct InvalidPageLimitError(u32);

impl PageLimit {
    #[must_use]
    pub fn new(limit: u32) -> Option<Self> {
        (1..=PAGE_LIMIT_MAX).contains(&limit).then_some(Self(limit))
    }

    #[must_use]
    pub fn new_unchecked(limit: u32) -> Self {
        Self::new(limit).expect("PageLimit out of range.")
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_usize(self) -> usize {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.0 as usize
        }
    }
}

impl TryFrom<u32> for PageLimit {
    type Error = InvalidPageLimitError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidPageLimitError(value))
    }
}

/// An opaque position in an ordered result set.
///
/// The token form is base64 over `{millis}:{id}`; callers treat it as a black
/// box and hand it back verbatim to fetch the next page.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Cursor {
    position: UnixMillis,
    id: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum CursorDecodeError {
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The token is not text: {0}")]
    NotText(#[from] FromUtf8Error),
    #[error("The token is missing the ':' separator")]
    MissingSeparator,
    #[error("A token part is not a number: {0}")]
    InvalidNumber(#[from] ParseIntError),
}

impl Cursor {
    #[must_use]
    pub fn new(position: UnixMillis, id: u64) -> Self {
        Self { position, id }
    }

    #[must_use]
    pub fn position(self) -> UnixMillis {
        self.position
    }

    #[must_use]
    pub fn id(self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(format!("{}:{}", self.position.get(), self.id))
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_token_str())
    }
}

impl FromStr for Cursor {
    type Err = CursorDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = String::from_utf8(BASE64_URL_SAFE_NO_PAD.decode(s)?)?;
        let (millis_part, id_part) = decoded
            .split_once(':')
            .ok_or(CursorDecodeError::MissingSeparator)?;

        Ok(Self {
            position: UnixMillis::new(i64::from_str(millis_part)?),
            id: u64::from_str(id_part)?,
        })
    }
}

/// A page request: resume after `after` (or from the top), return at most
/// `limit` items.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct PageRequest {
    pub after: Option<Cursor>,
    pub limit: PageLimit,
}

impl PageRequest {
    #[must_use]
    pub fn first(limit: PageLimit) -> Self {
        Self { after: None, limit }
    }

    #[must_use]
    pub fn after(cursor: Cursor, limit: PageLimit) -> Self {
        Self {
            after: Some(cursor),
            limit,
        }
    }
}

/// One page of results. `next_cursor` is present iff the page was full, i.e.
/// there may be more.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}
