use chyrp_common::{
    model::{
        Id,
        auth::{PasswordDigest, Session, SessionToken},
        category::{CategoryName, DEFAULT_CATEGORIES},
        comment::{CommentMessage, CreateComment},
        hashtag::parse_hashtags,
        media::{MAX_POST_FILES, MediaKind, MediaPath},
        post::{CreatePost, PostContent, PostMarker, PostUpdate},
        user::{CreateUser, DisplayName, User, Username},
    },
    snowflake::{ProcessId, WorkerId},
    util::PositiveDuration,
};
use chyrp_db::{DbClient, DbError};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};

fn client(pool: PgPool) -> DbClient {
    DbClient::new(pool, WorkerId::new(1).unwrap(), ProcessId::new(1).unwrap())
}

async fn register(db: &DbClient, username: &str) -> User {
    let username = Username::new(username.to_owned()).unwrap();

    db.create_user(&CreateUser {
        display_name: DisplayName::from(username.clone()),
        username,
        password_hash: PasswordDigest::hash("hunter2").unwrap(),
    })
    .await
    .unwrap()
}

fn new_post(author: &User, files: usize) -> CreatePost {
    CreatePost {
        author: author.id,
        content: PostContent::new("Title".to_owned(), "Body".to_owned()).unwrap(),
        category: None,
        hashtags: Vec::new(),
        image: None,
        video: None,
        files: (0..files)
            .map(|i| MediaPath::for_upload(MediaKind::PostFile, &format!("file{i}.pdf")).unwrap())
            .collect(),
        is_draft: false,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn registered_users_can_log_in(pool: PgPool) {
    let db = client(pool);
    let user = register(&db, "alice").await;
    assert_eq!(user.display_name.get(), "alice");

    let credentials = db
        .fetch_credentials(&user.username)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(credentials.user, user);
    assert!(credentials.password_hash.verify("hunter2").unwrap());
    assert!(!credentials.password_hash.verify("hunter3").unwrap());

    let unknown = Username::new("bob".to_owned()).unwrap();
    assert!(db.fetch_credentials(&unknown).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn usernames_are_unique(pool: PgPool) {
    let db = client(pool);
    register(&db, "alice").await;

    let username = Username::new("alice".to_owned()).unwrap();
    let err = db
        .create_user(&CreateUser {
            display_name: DisplayName::from(username.clone()),
            username,
            password_hash: PasswordDigest::hash("other").unwrap(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::DuplicateUsername), "{err:?}");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn sessions_are_found_by_hash_until_deleted(pool: PgPool) {
    let db = client(pool);
    let user = register(&db, "alice").await;

    let token = SessionToken::generate_random(user.id);
    let session = Session {
        user: user.id,
        token_hash: token.hash().unwrap(),
        created_at: OffsetDateTime::now_utc() - Duration::hours(2),
        expires_after: PositiveDuration::from_seconds(60),
    };
    db.create_session(&session).await.unwrap();

    let stored = db
        .fetch_session(&session.token_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.user, user.id);
    assert!(stored.is_expired_at(OffsetDateTime::now_utc()));

    assert_eq!(db.delete_expired_sessions().await.unwrap(), 1);
    assert!(db.fetch_session(&session.token_hash).await.unwrap().is_none());
    assert!(!db.delete_session(&session.token_hash).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn seeding_is_idempotent(pool: PgPool) {
    let db = client(pool);
    let names: Vec<_> = DEFAULT_CATEGORIES
        .iter()
        .map(|name| CategoryName::new((*name).to_owned()).unwrap())
        .collect();

    let first = db.seed_categories(&names).await.unwrap();
    assert_eq!(first.created.len(), DEFAULT_CATEGORIES.len());
    assert!(first.existing.is_empty());

    let second = db.seed_categories(&names).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.existing.len(), DEFAULT_CATEGORIES.len());

    let categories = db.fetch_categories().await.unwrap();
    assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
    assert_eq!(categories[0].name.get(), "Education");

    let mut with_new = names.clone();
    with_new.push(CategoryName::new("Art".to_owned()).unwrap());
    let third = db.seed_categories(&with_new).await.unwrap();
    let created: Vec<_> = third.created.iter().map(CategoryName::get).collect();
    assert_eq!(created, ["Art"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn hashtags_are_normalized_and_shared(pool: PgPool) {
    let db = client(pool.clone());
    let user = register(&db, "alice").await;

    let mut post = new_post(&user, 0);
    post.hashtags = parse_hashtags("#Foo, bar ,, FOO").unwrap();
    let first = db.create_post(&post).await.unwrap();

    post.hashtags = parse_hashtags("foo").unwrap();
    let second = db.create_post(&post).await.unwrap();

    let first = db.fetch_post(first, None).await.unwrap().unwrap();
    let hashtags: Vec<_> = first.post.hashtags.iter().map(|tag| tag.get()).collect();
    assert_eq!(hashtags, ["bar", "foo"]);

    let second = db.fetch_post(second, None).await.unwrap().unwrap();
    assert_eq!(second.post.hashtags.len(), 1);

    let hashtag_rows: i64 = sqlx::query_scalar("SELECT count(*) FROM posts.hashtags")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(hashtag_rows, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn posts_hold_at_most_three_files(pool: PgPool) {
    let db = client(pool);
    let user = register(&db, "alice").await;

    let post_id = db.create_post(&new_post(&user, MAX_POST_FILES)).await.unwrap();
    let post = db.fetch_post(post_id, None).await.unwrap().unwrap();
    assert_eq!(post.post.files.len(), MAX_POST_FILES);

    let err = db
        .create_post(&new_post(&user, MAX_POST_FILES + 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::AttachmentLimit(_)), "{err:?}");
    assert_eq!(db.fetch_posts().await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn likes_are_unique_and_toggle(pool: PgPool) {
    let db = client(pool);
    let author = register(&db, "alice").await;
    let fan = register(&db, "bob").await;
    let post_id = db.create_post(&new_post(&author, 0)).await.unwrap();

    let like = db.create_like(fan.id, post_id).await.unwrap();
    assert_eq!(like.user, fan);
    let err = db.create_like(fan.id, post_id).await.unwrap_err();
    assert!(matches!(err, DbError::DuplicateLike), "{err:?}");

    let missing: Id<PostMarker> = Id::from(1_u64);
    let err = db.create_like(fan.id, missing).await.unwrap_err();
    assert!(matches!(err, DbError::PostNotFound(_)), "{err:?}");

    assert!(db.delete_like_by_pair(fan.id, post_id).await.unwrap());
    assert!(!db.delete_like_by_pair(fan.id, post_id).await.unwrap());

    let toggled = db.toggle_like(fan.id, post_id).await.unwrap();
    assert!(toggled.liked);
    assert_eq!(toggled.like_count, 1);

    let detail = db.fetch_post(post_id, Some(fan.id)).await.unwrap().unwrap();
    assert!(detail.liked_by_viewer);
    let anonymous = db.fetch_post(post_id, None).await.unwrap().unwrap();
    assert!(!anonymous.liked_by_viewer);
    assert_eq!(anonymous.like_count, 1);

    let toggled = db.toggle_like(fan.id, post_id).await.unwrap();
    assert!(!toggled.liked);
    assert_eq!(toggled.like_count, 0);
    let detail = db.fetch_post(post_id, Some(fan.id)).await.unwrap().unwrap();
    assert!(!detail.liked_by_viewer);
    assert_eq!(detail.like_count, 0);

    let ghost = Id::from(1_u64);
    let err = db.create_like(ghost, post_id).await.unwrap_err();
    assert!(matches!(err, DbError::UserNotFound(id) if id == ghost), "{err:?}");
    let err = db.toggle_like(ghost, post_id).await.unwrap_err();
    assert!(matches!(err, DbError::UserNotFound(_)), "{err:?}");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn comments_are_listed_in_order(pool: PgPool) {
    let db = client(pool);
    let user = register(&db, "alice").await;
    let post_id = db.create_post(&new_post(&user, 0)).await.unwrap();

    for message in ["first", "second"] {
        db.create_comment(&CreateComment {
            post: post_id,
            author: user.id,
            message: CommentMessage::new(message.to_owned()).unwrap(),
        })
        .await
        .unwrap();
    }

    let comments = db.fetch_comments(post_id).await.unwrap();
    let messages: Vec<_> = comments.iter().map(|comment| comment.message.get()).collect();
    assert_eq!(messages, ["first", "second"]);
    assert_eq!(comments[0].author, user);

    let err = db
        .create_comment(&CreateComment {
            post: Id::from(1_u64),
            author: user.id,
            message: CommentMessage::new("lost".to_owned()).unwrap(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::PostNotFound(_)), "{err:?}");

    let err = db
        .create_comment(&CreateComment {
            post: post_id,
            author: Id::from(1_u64),
            message: CommentMessage::new("ghost".to_owned()).unwrap(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UserNotFound(_)), "{err:?}");

    assert!(db.delete_comment(comments[0].id).await.unwrap());
    assert!(db.fetch_comment(comments[0].id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn posts_can_be_edited_and_deleted(pool: PgPool) {
    let db = client(pool);
    let user = register(&db, "alice").await;
    let names = [CategoryName::new("Travel".to_owned()).unwrap()];
    db.seed_categories(&names).await.unwrap();
    let travel = db.fetch_categories().await.unwrap().remove(0);

    let mut post = new_post(&user, 1);
    post.category = Some(travel.id);
    post.image = Some(MediaPath::for_upload(MediaKind::PostImage, "cover.png").unwrap());
    let post_id = db.create_post(&post).await.unwrap();

    let before = db.fetch_post(post_id, None).await.unwrap().unwrap();
    assert_eq!(before.post.category.as_ref(), Some(&travel));

    let update = PostUpdate {
        content: Some(PostContent::new("Renamed".to_owned(), "Body".to_owned()).unwrap()),
        category: Some(None),
        is_draft: Some(true),
    };
    assert!(db.update_post(post_id, &update).await.unwrap());

    let after = db.fetch_post(post_id, None).await.unwrap().unwrap();
    assert_eq!(after.post.content.title(), "Renamed");
    assert_eq!(after.post.category, None);
    assert!(after.post.is_draft);
    assert!(after.post.modified_at >= before.post.modified_at);

    let deleted = db.delete_post(post_id).await.unwrap().unwrap();
    assert_eq!(deleted.media.len(), 2);
    assert!(db.fetch_post(post_id, None).await.unwrap().is_none());
    assert!(db.delete_post(post_id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn edited_comments_keep_their_sent_at(pool: PgPool) {
    let db = client(pool.clone());
    let user = register(&db, "alice").await;
    let post_id = db.create_post(&new_post(&user, 0)).await.unwrap();

    let comment = db
        .create_comment(&CreateComment {
            post: post_id,
            author: user.id,
            message: CommentMessage::new("first draft".to_owned()).unwrap(),
        })
        .await
        .unwrap();

    let edited = db
        .update_comment(comment.id, &CommentMessage::new("final".to_owned()).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(edited.message.get(), "final");
    assert_eq!(edited.sent_at, comment.sent_at);

    sqlx::query("UPDATE interactions.comments SET sent_at = now() - INTERVAL '1 day'")
        .execute(&pool)
        .await
        .unwrap();
    let stored = db.fetch_comment(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.sent_at, comment.sent_at);

    let missing = db
        .update_comment(Id::from(1_u64), &CommentMessage::new("lost".to_owned()).unwrap())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn unknown_categories_are_ignored(pool: PgPool) {
    let db = client(pool);
    let user = register(&db, "alice").await;

    let mut post = new_post(&user, 0);
    post.category = Some(Id::from(1_u64));
    let post_id = db.create_post(&post).await.unwrap();

    let detail = db.fetch_post(post_id, None).await.unwrap().unwrap();
    assert_eq!(detail.post.category, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires PostgreSQL database"]
async fn posts_are_listed_newest_first(pool: PgPool) {
    let db = client(pool);
    let user = register(&db, "alice").await;

    let mut older = new_post(&user, 0);
    older.created_at -= Duration::minutes(5);
    let older = db.create_post(&older).await.unwrap();
    let newer = db.create_post(&new_post(&user, 0)).await.unwrap();

    let ids: Vec<_> = db
        .fetch_posts()
        .await
        .unwrap()
        .into_iter()
        .map(|post| post.id)
        .collect();
    assert_eq!(ids, [newer, older]);
}
