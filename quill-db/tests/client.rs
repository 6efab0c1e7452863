use quill_common::{
    model::{
        auth::{CredentialHash, PositiveDuration, Session, SessionToken},
        page::{Cursor, PageLimit},
        post::{CreatePost, Post, PostBody},
        search::SearchQuery,
        user::{CreateUser, DisplayName, User, UserHandle},
    },
    snowflake::NodeId,
};
use quill_db::{
    client::{DbClient, DbError, Entity},
    schema,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use time::{Duration, UtcDateTime};

async fn client() -> DbClient {
    let options = "sqlite::memory:"
        .parse::<SqliteConnectOptions>()
        .expect("valid sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect to in-memory sqlite");
    schema::apply(&pool).await.expect("apply schema");

    DbClient::new(pool, NodeId::new_unchecked(1))
}

fn new_user(handle: &str, display_name: &str) -> CreateUser {
    CreateUser {
        handle: UserHandle::new(handle.to_owned()).expect("valid handle"),
        display_name: DisplayName::new(display_name.to_owned()).expect("valid display name"),
        credential_hash: CredentialHash::new("$argon2id$unused-in-db-tests".to_owned()),
    }
}

async fn post_by(db: &DbClient, author: &User, body: &str) -> Post {
    db.create_post(&CreatePost {
        author: author.id,
        body: PostBody::new(body.to_owned()).expect("valid body"),
        parent: None,
    })
    .await
    .expect("create post")
}

fn query(text: &str) -> SearchQuery {
    SearchQuery::new(text).expect("valid query")
}

fn limit(limit: u32) -> PageLimit {
    PageLimit::new_unchecked(limit)
}

#[tokio::test]
async fn created_user_round_trips() {
    let db = client().await;

    let created = db.create_user(&new_user("alice", "Alice L")).await.unwrap();

    let by_id = db.fetch_user(created.id).await.unwrap();
    assert_eq!(by_id.as_ref(), Some(&created));

    let by_handle = db.fetch_user_by_handle(&created.handle).await.unwrap();
    assert_eq!(by_handle, Some(created));
}

#[tokio::test]
async fn duplicate_handle_is_rejected() {
    let db = client().await;

    db.create_user(&new_user("alice", "Alice the First"))
        .await
        .unwrap();
    let result = db.create_user(&new_user("alice", "Alice the Second")).await;

    assert!(matches!(result, Err(DbError::DuplicateHandle)));
}

#[tokio::test]
async fn fetch_credential_returns_the_stored_hash() {
    let db = client().await;

    let created = db.create_user(&new_user("alice", "Alice")).await.unwrap();
    let stored = db
        .fetch_credential(&created.handle)
        .await
        .unwrap()
        .expect("credential present");

    assert_eq!(stored.user, created.id);
    assert_eq!(stored.hash.get(), "$argon2id$unused-in-db-tests");

    let absent = db
        .fetch_credential(&UserHandle::new("nobody".to_owned()).unwrap())
        .await
        .unwrap();
    assert!(absent.is_none());
}

#[tokio::test]
async fn created_post_round_trips_with_author() {
    let db = client().await;

    let author = db.create_user(&new_user("bob", "Bob")).await.unwrap();
    let post = post_by(&db, &author, "first post").await;

    let fetched = db.fetch_post(post.id).await.unwrap();
    assert_eq!(fetched, Some(post.clone()));
    assert_eq!(post.author, author);
    assert_eq!(post.parent, None);
}

#[tokio::test]
async fn post_requires_existing_author() {
    let db = client().await;

    let result = db
        .create_post(&CreatePost {
            author: 12345_u64.into(),
            body: PostBody::new("orphan".to_owned()).unwrap(),
            parent: None,
        })
        .await;

    assert!(matches!(result, Err(DbError::NotFound(Entity::User))));
}

#[tokio::test]
async fn reply_requires_existing_parent() {
    let db = client().await;
    let author = db.create_user(&new_user("bob", "Bob")).await.unwrap();

    let missing_parent = db
        .create_post(&CreatePost {
            author: author.id,
            body: PostBody::new("reply to nothing".to_owned()).unwrap(),
            parent: Some(999_u64.into()),
        })
        .await;
    assert!(matches!(missing_parent, Err(DbError::NotFound(Entity::Post))));

    let parent = post_by(&db, &author, "parent").await;
    let reply = db
        .create_post(&CreatePost {
            author: author.id,
            body: PostBody::new("the reply".to_owned()).unwrap(),
            parent: Some(parent.id),
        })
        .await
        .unwrap();

    assert_eq!(reply.parent, Some(parent.id));
    let replies = db.fetch_replies(parent.id, None, limit(10)).await.unwrap();
    assert_eq!(replies, [reply]);
}

#[tokio::test]
async fn follow_lifecycle() {
    let db = client().await;
    let alice = db.create_user(&new_user("alice", "Alice")).await.unwrap();
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();

    assert!(matches!(
        db.create_follow(alice.id, alice.id).await,
        Err(DbError::SelfFollow)
    ));
    assert!(matches!(
        db.create_follow(alice.id, 777_u64.into()).await,
        Err(DbError::NotFound(Entity::User))
    ));

    db.create_follow(alice.id, bob.id).await.unwrap();
    assert!(matches!(
        db.create_follow(alice.id, bob.id).await,
        Err(DbError::AlreadyFollowing)
    ));

    assert_eq!(db.fetch_followers(bob.id).await.unwrap(), [alice.clone()]);
    assert_eq!(db.fetch_following(alice.id).await.unwrap(), [bob.clone()]);

    db.delete_follow(alice.id, bob.id).await.unwrap();
    assert!(matches!(
        db.delete_follow(alice.id, bob.id).await,
        Err(DbError::NotFollowing)
    ));
    assert!(db.fetch_followers(bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn favorite_lifecycle() {
    let db = client().await;
    let alice = db.create_user(&new_user("alice", "Alice")).await.unwrap();
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();
    let post = post_by(&db, &bob, "favorite me").await;

    assert!(matches!(
        db.create_favorite(alice.id, 404_u64.into()).await,
        Err(DbError::NotFound(Entity::Post))
    ));

    db.create_favorite(alice.id, post.id).await.unwrap();
    assert!(matches!(
        db.create_favorite(alice.id, post.id).await,
        Err(DbError::AlreadyFavorited)
    ));

    let favorited = db
        .fetch_favorited_posts(alice.id, None, limit(10))
        .await
        .unwrap();
    assert_eq!(favorited.len(), 1);
    assert_eq!(favorited[0].post, post);

    db.delete_favorite(alice.id, post.id).await.unwrap();
    assert!(matches!(
        db.delete_favorite(alice.id, post.id).await,
        Err(DbError::NotFavorited)
    ));
    assert!(db
        .fetch_favorited_posts(alice.id, None, limit(10))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn favoriting_your_own_post_is_allowed() {
    let db = client().await;
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();
    let post = post_by(&db, &bob, "self-regard").await;

    db.create_favorite(bob.id, post.id).await.unwrap();

    let favorited = db
        .fetch_favorited_posts(bob.id, None, limit(10))
        .await
        .unwrap();
    assert_eq!(favorited[0].post.id, post.id);
}

#[tokio::test]
async fn timeline_contains_exactly_followees_posts() {
    let db = client().await;
    let alice = db.create_user(&new_user("alice", "Alice")).await.unwrap();
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();
    let carol = db.create_user(&new_user("carol", "Carol")).await.unwrap();
    let dave = db.create_user(&new_user("dave", "Dave")).await.unwrap();

    db.create_follow(alice.id, bob.id).await.unwrap();
    db.create_follow(alice.id, carol.id).await.unwrap();

    let own = post_by(&db, &alice, "from alice herself").await;
    let from_bob = post_by(&db, &bob, "from bob").await;
    let from_carol = post_by(&db, &carol, "from carol").await;
    post_by(&db, &dave, "from unrelated dave").await;

    let timeline = db
        .fetch_timeline(alice.id, false, None, limit(10))
        .await
        .unwrap();
    assert_eq!(timeline, [from_carol.clone(), from_bob.clone()]);

    let with_self = db
        .fetch_timeline(alice.id, true, None, limit(10))
        .await
        .unwrap();
    assert_eq!(with_self, [from_carol, from_bob, own]);
}

#[tokio::test]
async fn timeline_pages_do_not_skip_or_repeat() {
    let db = client().await;
    let alice = db.create_user(&new_user("alice", "Alice")).await.unwrap();
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();
    db.create_follow(alice.id, bob.id).await.unwrap();

    let mut posts = Vec::new();
    for n in 0..5 {
        posts.push(post_by(&db, &bob, &format!("post number {n}")).await);
    }

    let mut seen = Vec::new();
    let mut after: Option<Cursor> = None;
    loop {
        let page = db
            .fetch_timeline(alice.id, false, after, limit(2))
            .await
            .unwrap();
        if page.is_empty() {
            break;
        }
        after = page
            .last()
            .map(|post| Cursor::new(post.created_at.into(), post.id.into()));
        seen.extend(page);
    }

    posts.reverse();
    assert_eq!(seen, posts);
}

#[tokio::test]
async fn user_posts_are_newest_first() {
    let db = client().await;
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();

    let first = post_by(&db, &bob, "first").await;
    let second = post_by(&db, &bob, "second").await;

    let posts = db.fetch_user_posts(bob.id, None, limit(10)).await.unwrap();
    assert_eq!(posts, [second, first]);
}

#[tokio::test]
async fn search_users_matches_case_insensitively() {
    let db = client().await;
    db.create_user(&new_user("wonderland", "Alice Liddell"))
        .await
        .unwrap();
    db.create_user(&new_user("alison", "Ali")).await.unwrap();
    db.create_user(&new_user("bob", "Bob")).await.unwrap();

    let found = db.search_users(&query("ALI")).await.unwrap();

    // Shortest display name wins the relevance ordering.
    let handles: Vec<_> = found.iter().map(|user| user.handle.get()).collect();
    assert_eq!(handles, ["alison", "wonderland"]);
}

#[tokio::test]
async fn search_users_treats_like_wildcards_literally() {
    let db = client().await;
    db.create_user(&new_user("percent", "100% real"))
        .await
        .unwrap();
    db.create_user(&new_user("plain", "Plain Jane")).await.unwrap();

    let found = db.search_users(&query("0% r")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].handle.get(), "percent");

    let all_percent = db.search_users(&query("%")).await.unwrap();
    assert_eq!(all_percent.len(), 1);
    assert_eq!(all_percent[0].handle.get(), "percent");
}

#[tokio::test]
async fn search_posts_matches_bodies_and_hashtags() {
    let db = client().await;
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();

    let hello_world = post_by(&db, &bob, "Hello world").await;
    let shouting = post_by(&db, &bob, "WELL HELLO there").await;
    post_by(&db, &bob, "goodbye all").await;
    let tagged = post_by(&db, &bob, "morning #Greetings everyone").await;

    let hello = db.search_posts(&query("hello")).await.unwrap();
    assert_eq!(hello, [shouting, hello_world]);

    let by_tag = db.search_posts(&query("#greetings")).await.unwrap();
    assert_eq!(by_tag, [tagged]);

    assert!(db.search_posts(&query("absent")).await.unwrap().is_empty());
}

#[tokio::test]
async fn profile_counts_track_activity() {
    let db = client().await;
    let alice = db.create_user(&new_user("alice", "Alice")).await.unwrap();
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();
    let carol = db.create_user(&new_user("carol", "Carol")).await.unwrap();

    let post = post_by(&db, &alice, "count me").await;
    db.create_follow(bob.id, alice.id).await.unwrap();
    db.create_follow(carol.id, alice.id).await.unwrap();
    db.create_follow(alice.id, bob.id).await.unwrap();
    db.create_favorite(alice.id, post.id).await.unwrap();

    let counts = db.fetch_profile_counts(alice.id).await.unwrap();
    assert_eq!(counts.posts, 1);
    assert_eq!(counts.favorites, 1);
    assert_eq!(counts.followers, 2);
    assert_eq!(counts.following, 1);
}

#[tokio::test]
async fn post_stats_count_replies_and_favorites() {
    let db = client().await;
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();
    let carol = db.create_user(&new_user("carol", "Carol")).await.unwrap();
    let post = post_by(&db, &bob, "measure me").await;

    db.create_post(&CreatePost {
        author: carol.id,
        body: PostBody::new("a reply".to_owned()).unwrap(),
        parent: Some(post.id),
    })
    .await
    .unwrap();
    db.create_favorite(carol.id, post.id).await.unwrap();
    db.create_favorite(bob.id, post.id).await.unwrap();

    let stats = db.fetch_post_stats(post.id).await.unwrap();
    assert_eq!(stats.replies, 1);
    assert_eq!(stats.favorites, 2);
}

#[tokio::test]
async fn session_round_trip() {
    let db = client().await;
    let alice = db.create_user(&new_user("alice", "Alice")).await.unwrap();

    let token = SessionToken::mint(alice.id);
    let token_hash = token.hash().unwrap();
    let session = Session {
        user: alice.id,
        token_hash: token_hash.clone(),
        created_at: UtcDateTime::now(),
        expires_after: Some(PositiveDuration::new_unchecked(Duration::hours(12))),
    };

    db.create_session(&session).await.unwrap();

    let fetched = db
        .fetch_session(&token_hash)
        .await
        .unwrap()
        .expect("session present");
    assert_eq!(fetched.user, alice.id);
    assert_eq!(fetched.token_hash, token_hash);
    assert_eq!(fetched.expires_after, session.expires_after);

    assert!(db.delete_session(&token_hash).await.unwrap());
    assert!(!db.delete_session(&token_hash).await.unwrap());
    assert!(db.fetch_session(&token_hash).await.unwrap().is_none());
}

#[tokio::test]
async fn favorited_posts_page_by_favorite_time() {
    let db = client().await;
    let alice = db.create_user(&new_user("alice", "Alice")).await.unwrap();
    let bob = db.create_user(&new_user("bob", "Bob")).await.unwrap();

    let first = post_by(&db, &bob, "favorited first").await;
    let second = post_by(&db, &bob, "favorited second").await;
    db.create_favorite(alice.id, first.id).await.unwrap();
    db.create_favorite(alice.id, second.id).await.unwrap();

    let page_one = db
        .fetch_favorited_posts(alice.id, None, limit(1))
        .await
        .unwrap();
    assert_eq!(page_one.len(), 1);
    assert_eq!(page_one[0].post, second);

    let after = Cursor::new(
        page_one[0].favorited_at.into(),
        page_one[0].post.id.into(),
    );
    let page_two = db
        .fetch_favorited_posts(alice.id, Some(after), limit(1))
        .await
        .unwrap();
    assert_eq!(page_two.len(), 1);
    assert_eq!(page_two[0].post, first);
}
