use crate::model::{
    Id,
    user::{User, UserMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const POST_BODY_MAX_LEN: usize = 500;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub body: PostBody,
    /// Present iff the post is a reply.
    pub parent: Option<Id<PostMarker>>,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub body: PostBody,
    pub parent: Option<Id<PostMarker>>,
}

/// A post joined with the instant a given user favorited it.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct FavoritedPost {
    pub post: Post,
    pub favorited_at: UtcDateTime,
}

/// Engagement counters for a single post.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct PostStats {
    pub replies: u64,
    pub favorites: u64,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostBody(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The post body is invalid: {0:?}")]
pub struct InvalidPostBodyError(String);

impl PostBody {
    /// A body has visible content and at most [`POST_BODY_MAX_LEN`]
    /// characters.
    pub fn new(body: String) -> Result<Self, InvalidPostBodyError> {
        let valid = !body.trim().is_empty() && body.chars().count() <= POST_BODY_MAX_LEN;

        if valid {
            Ok(PostBody(body))
        } else {
            Err(InvalidPostBodyError(body))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Lowercased hashtag terms mentioned in the body, in order of first
    /// occurrence, without duplicates. A term is the run of alphanumeric or
    /// underscore characters after a `#`.
    #[must_use]
    pub fn hashtags(&self) -> Vec<String> {
        let mut terms = Vec::new();
        let mut rest = self.0.as_str();

        while let Some(position) = rest.find('#') {
            rest = &rest[position + 1..];
            let end = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());

            if end > 0 {
                let term = rest[..end].to_lowercase();
                if !terms.contains(&term) {
                    terms.push(term);
                }
            }

            rest = &rest[end..];
        }

        terms
    }
}

impl<'de> Deserialize<'de> for PostBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostBody::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"PostBody"))
    }
}
