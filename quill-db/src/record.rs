//! Row shapes as they come off the store, decoded exactly once into domain
//! models at this boundary.

use quill_common::model::{
    ModelValidationError, UnixMillis,
    auth::{CredentialHash, PositiveDuration, Session, StoredCredential},
    post::{FavoritedPost, Post, PostBody, PostStats},
    user::{DisplayName, ProfileCounts, User, UserHandle},
};
use sqlx::FromRow;
use time::Duration;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: i64,
    pub handle: String,
    pub display_name: String,
    pub created_at: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub body: String,
    pub parent_post_id: Option<i64>,
    pub created_at: i64,
    pub author_id: i64,
    pub author_handle: String,
    pub author_display_name: String,
    pub author_created_at: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct FavoritedPostRecord {
    #[sqlx(flatten)]
    pub post: PostRecord,
    pub favorited_at: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CredentialRecord {
    pub user_id: i64,
    pub credential_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct SessionRecord {
    pub user_id: i64,
    pub token_hash: Vec<u8>,
    pub created_at: i64,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct ProfileCountsRecord {
    pub post_count: i64,
    pub favorites_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostStatsRecord {
    pub reply_count: i64,
    pub favorite_count: i64,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_id.cast_unsigned().into(),
            handle: UserHandle::new(value.handle)?,
            display_name: DisplayName::new(value.display_name)?,
            created_at: UnixMillis::new(value.created_at).try_into()?,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.cast_unsigned().into(),
            author: User {
                id: value.author_id.cast_unsigned().into(),
                handle: UserHandle::new(value.author_handle)?,
                display_name: DisplayName::new(value.author_display_name)?,
                created_at: UnixMillis::new(value.author_created_at).try_into()?,
            },
            body: PostBody::new(value.body)?,
            parent: value.parent_post_id.map(|id| id.cast_unsigned().into()),
            created_at: UnixMillis::new(value.created_at).try_into()?,
        })
    }
}

impl TryFrom<FavoritedPostRecord> for FavoritedPost {
    type Error = ModelValidationError;

    fn try_from(value: FavoritedPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            post: value.post.try_into()?,
            favorited_at: UnixMillis::new(value.favorited_at).try_into()?,
        })
    }
}

impl From<CredentialRecord> for StoredCredential {
    fn from(value: CredentialRecord) -> Self {
        Self {
            user: value.user_id.cast_unsigned().into(),
            hash: CredentialHash::new(value.credential_hash),
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = ModelValidationError;

    fn try_from(value: SessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_id.cast_unsigned().into(),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: UnixMillis::new(value.created_at).try_into()?,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| PositiveDuration::try_from(Duration::seconds(seconds)))
                .transpose()?,
        })
    }
}

impl From<ProfileCountsRecord> for ProfileCounts {
    fn from(value: ProfileCountsRecord) -> Self {
        Self {
            posts: value.post_count.cast_unsigned(),
            favorites: value.favorites_count.cast_unsigned(),
            followers: value.followers_count.cast_unsigned(),
            following: value.following_count.cast_unsigned(),
        }
    }
}

impl From<PostStatsRecord> for PostStats {
    fn from(value: PostStatsRecord) -> Self {
        Self {
            replies: value.reply_count.cast_unsigned(),
            favorites: value.favorite_count.cast_unsigned(),
        }
    }
}
