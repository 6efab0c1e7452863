use crate::error::Result;
use quill_common::model::{
    Id, UnixMillis,
    page::{Cursor, Page, PageLimit, PageRequest},
    post::{Post, PostMarker, PostStats},
    user::{ProfileCounts, User, UserMarker},
};
use quill_db::client::{DbClient, DbError, Entity};
use std::sync::Arc;

/// How many posts ride along with a profile view.
pub const PROFILE_RECENT_POSTS: u32 = 3;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum TimelineScope {
    #[default]
    Following,
    FollowingAndSelf,
}

impl TimelineScope {
    #[must_use]
    fn includes_self(self) -> bool {
        matches!(self, TimelineScope::FollowingAndSelf)
    }
}

/// A display-ready profile: the user, their latest posts, and counters.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Profile {
    pub user: User,
    pub recent_posts: Vec<Post>,
    pub counts: ProfileCounts,
}

/// Read-side composition over the repository layer: feeds, profiles,
/// favorites, and post detail views.
pub struct TimelineService {
    db: Arc<DbClient>,
}

impl TimelineService {
    #[must_use]
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }

    /// The user's feed: posts by followees (and the user, per `scope`),
    /// newest first, keyset-paginated.
    pub async fn timeline(
        &self,
        user_id: Id<UserMarker>,
        scope: TimelineScope,
        page: PageRequest,
    ) -> Result<Page<Post>> {
        self.require_user(user_id).await?;

        let posts = self
            .db
            .fetch_timeline(user_id, scope.includes_self(), page.after, page.limit)
            .await?;

        Ok(page_of_posts(posts, page.limit))
    }

    pub async fn profile(&self, user_id: Id<UserMarker>) -> Result<Profile> {
        let user = self.require_user(user_id).await?;

        let recent_posts = self
            .db
            .fetch_user_posts(user_id, None, PageLimit::new_unchecked(PROFILE_RECENT_POSTS))
            .await?;
        let counts = self.db.fetch_profile_counts(user_id).await?;

        Ok(Profile {
            user,
            recent_posts,
            counts,
        })
    }

    /// All of a user's own posts, newest first.
    pub async fn user_posts(
        &self,
        user_id: Id<UserMarker>,
        page: PageRequest,
    ) -> Result<Page<Post>> {
        self.require_user(user_id).await?;

        let posts = self
            .db
            .fetch_user_posts(user_id, page.after, page.limit)
            .await?;

        Ok(page_of_posts(posts, page.limit))
    }

    /// Posts the user favorited, most recently favorited first.
    pub async fn favorites(&self, user_id: Id<UserMarker>, page: PageRequest) -> Result<Page<Post>> {
        self.require_user(user_id).await?;

        let favorited = self
            .db
            .fetch_favorited_posts(user_id, page.after, page.limit)
            .await?;

        let next_cursor = (favorited.len() >= page.limit.as_usize())
            .then(|| {
                favorited.last().map(|favorite| {
                    Cursor::new(
                        UnixMillis::from(favorite.favorited_at),
                        favorite.post.id.into(),
                    )
                })
            })
            .flatten();

        Ok(Page {
            items: favorited.into_iter().map(|favorite| favorite.post).collect(),
            next_cursor,
        })
    }

    pub async fn post(&self, post_id: Id<PostMarker>) -> Result<Post> {
        let post = self
            .db
            .fetch_post(post_id)
            .await?
            .ok_or(DbError::NotFound(Entity::Post))?;

        Ok(post)
    }

    /// Reply and favorite counts for a post.
    pub async fn post_stats(&self, post_id: Id<PostMarker>) -> Result<PostStats> {
        self.post(post_id).await?;

        Ok(self.db.fetch_post_stats(post_id).await?)
    }

    /// Replies to a post, newest first.
    pub async fn replies(&self, post_id: Id<PostMarker>, page: PageRequest) -> Result<Page<Post>> {
        self.post(post_id).await?;

        let posts = self
            .db
            .fetch_replies(post_id, page.after, page.limit)
            .await?;

        Ok(page_of_posts(posts, page.limit))
    }

    pub async fn followers(&self, user_id: Id<UserMarker>) -> Result<Vec<User>> {
        self.require_user(user_id).await?;

        Ok(self.db.fetch_followers(user_id).await?)
    }

    pub async fn following(&self, user_id: Id<UserMarker>) -> Result<Vec<User>> {
        self.require_user(user_id).await?;

        Ok(self.db.fetch_following(user_id).await?)
    }

    async fn require_user(&self, user_id: Id<UserMarker>) -> Result<User> {
        let user = self
            .db
            .fetch_user(user_id)
            .await?
            .ok_or(DbError::NotFound(Entity::User))?;

        Ok(user)
    }
}

fn page_of_posts(posts: Vec<Post>, limit: PageLimit) -> Page<Post> {
    let next_cursor = (posts.len() >= limit.as_usize())
        .then(|| {
            posts
                .last()
                .map(|post| Cursor::new(UnixMillis::from(post.created_at), post.id.into()))
        })
        .flatten();

    Page {
        items: posts,
        next_cursor,
    }
}
