//! JSON shapes of the API responses.

use crate::{server::Result, storage::MediaStore};
use chyrp_common::model::{
    Id,
    category::CategoryMarker,
    comment::{Comment, CommentMarker},
    like::{Like, LikeMarker, LikeToggle},
    post::{PostDetail, PostFileMarker, PostMarker, PostSummary},
    user::{User, UserMarker},
};
use serde::Serialize;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const LISTING_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct MessageView {
    pub message: &'static str,
}

impl MessageView {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct HomeView {
    pub display_name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub display_name: String,
    pub profile_pic: Option<String>,
}

impl ProfileView {
    pub fn new(user: &User, media: &MediaStore) -> Self {
        Self {
            username: user.username.get().to_owned(),
            display_name: user.display_name.get().to_owned(),
            profile_pic: user.profile_pic.as_ref().map(|path| media.url(path)),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct CsrfView {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct UserView {
    pub id: Id<UserMarker>,
    pub username: String,
    pub display_name: String,
    pub profile_pic: Option<String>,
}

impl UserView {
    pub fn new(user: &User, media: &MediaStore) -> Self {
        Self {
            id: user.id,
            username: user.username.get().to_owned(),
            display_name: user.display_name.get().to_owned(),
            profile_pic: user.profile_pic.as_ref().map(|path| media.url(path)),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct CreatedPostView {
    pub message: &'static str,
    pub id: Id<PostMarker>,
    pub dropped_attachments: usize,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostListItemView {
    pub id: Id<PostMarker>,
    pub title: String,
    /// Preview of the body.
    pub content: String,
    pub username: String,
    pub display_name: String,
    pub profile_pic: Option<String>,
    pub image: Option<String>,
    /// Category name.
    pub category: Option<String>,
    pub is_draft: bool,
    pub created_at: String,
}

impl PostListItemView {
    pub fn new(post: &PostSummary, media: &MediaStore) -> Result<Self> {
        Ok(Self {
            id: post.id,
            title: post.content.title().to_owned(),
            content: post.preview().into_owned(),
            username: post.author.username.get().to_owned(),
            display_name: post.author.display_name.get().to_owned(),
            profile_pic: post.author.profile_pic.as_ref().map(|path| media.url(path)),
            image: post.image.as_ref().map(|path| media.url(path)),
            category: post.category_name.clone(),
            is_draft: post.is_draft,
            created_at: post.created_at.format(LISTING_TIME_FORMAT)?,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostFileView {
    pub id: Id<PostFileMarker>,
    pub file: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostDetailView {
    pub id: Id<PostMarker>,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub category: Option<Id<CategoryMarker>>,
    pub category_name: Option<String>,
    pub is_draft: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    pub hashtags: Vec<String>,
    pub display_name: String,
    pub username: String,
    pub profile_pic: Option<String>,
    pub like_count: u64,
    pub liked_by_me: bool,
    pub files: Vec<PostFileView>,
}

impl PostDetailView {
    pub fn new(detail: &PostDetail, media: &MediaStore) -> Self {
        let post = &detail.post;

        Self {
            id: post.id,
            title: post.content.title().to_owned(),
            content: post.content.content().to_owned(),
            image: post.image.as_ref().map(|path| media.url(path)),
            video: post.video.as_ref().map(|path| media.url(path)),
            category: post.category.as_ref().map(|category| category.id),
            category_name: post
                .category
                .as_ref()
                .map(|category| category.name.get().to_owned()),
            is_draft: post.is_draft,
            created_at: post.created_at,
            modified_at: post.modified_at,
            hashtags: post
                .hashtags
                .iter()
                .map(|hashtag| hashtag.get().to_owned())
                .collect(),
            display_name: post.author.display_name.get().to_owned(),
            username: post.author.username.get().to_owned(),
            profile_pic: post.author.profile_pic.as_ref().map(|path| media.url(path)),
            like_count: detail.like_count,
            liked_by_me: detail.liked_by_viewer,
            files: post
                .files
                .iter()
                .map(|file| PostFileView {
                    id: file.id,
                    file: media.url(&file.file),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct CommentView {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub user: UserView,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

impl CommentView {
    pub fn new(comment: &Comment, media: &MediaStore) -> Self {
        Self {
            id: comment.id,
            post: comment.post,
            user: UserView::new(&comment.author, media),
            message: comment.message.get().to_owned(),
            sent_at: comment.sent_at,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct LikeView {
    pub id: Id<LikeMarker>,
    pub post: Id<PostMarker>,
    pub user: UserView,
}

impl LikeView {
    pub fn new(like: &Like, media: &MediaStore) -> Self {
        Self {
            id: like.id,
            post: like.post,
            user: UserView::new(&like.user, media),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct LikeToggleView {
    pub liked: bool,
    pub like_count: u64,
}

impl From<LikeToggle> for LikeToggleView {
    fn from(toggle: LikeToggle) -> Self {
        Self {
            liked: toggle.liked,
            like_count: toggle.like_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{server::views::PostListItemView, storage::MediaStore};
    use chyrp_common::model::{
        Id,
        media::MediaPath,
        post::{PREVIEW_MAX_CHARS, PostContent, PostSummary},
        user::{DisplayName, User, Username},
    };
    use std::path::PathBuf;
    use time::macros::datetime;

    fn summary(body: String) -> PostSummary {
        let username = Username::new("alice".to_owned()).unwrap();

        PostSummary {
            id: Id::from(5_u64),
            author: User {
                id: Id::from(1_u64),
                display_name: DisplayName::from(username.clone()),
                username,
                profile_pic: Some(MediaPath::from_stored("profile_pics/ab_me.png".to_owned())),
            },
            content: PostContent::new("Hello".to_owned(), body).unwrap(),
            image: None,
            category_name: Some("Travel".to_owned()),
            is_draft: true,
            created_at: datetime!(2025-03-04 05:06:07 UTC),
        }
    }

    #[test]
    fn listing_shows_preview_and_minute_precision() {
        let media = MediaStore::new(PathBuf::from("uploads"), "/media/".to_owned());
        let view = PostListItemView::new(&summary("x".repeat(PREVIEW_MAX_CHARS + 1)), &media)
            .unwrap();

        assert_eq!(view.created_at, "2025-03-04 05:06");
        assert_eq!(view.content, format!("{}...", "x".repeat(PREVIEW_MAX_CHARS)));
        assert_eq!(view.profile_pic.as_deref(), Some("/media/profile_pics/ab_me.png"));
        assert_eq!(view.category.as_deref(), Some("Travel"));
    }

    #[test]
    fn ids_serialize_as_strings() {
        let media = MediaStore::new(PathBuf::from("uploads"), "/media/".to_owned());
        let view = PostListItemView::new(&summary("short".to_owned()), &media).unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["id"], "5");
        assert_eq!(json["content"], "short");
    }
}
