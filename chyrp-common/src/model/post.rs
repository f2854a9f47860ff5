use crate::{
    model::{
        Id,
        category::{Category, CategoryMarker},
        hashtag::HashtagName,
        media::MediaPath,
        user::{User, UserMarker},
    },
    util::truncate_with_ellipsis,
};
use std::borrow::Cow;
use thiserror::Error;
use time::OffsetDateTime;

pub const TITLE_MAX_LEN: usize = 255;
pub const PREVIEW_MAX_CHARS: usize = 200;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostFileMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub content: PostContent,
    pub image: Option<MediaPath>,
    pub video: Option<MediaPath>,
    pub category: Option<Category>,
    pub hashtags: Vec<HashtagName>,
    pub files: Vec<PostFile>,
    pub is_draft: bool,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

/// A post as seen by one particular viewer.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostDetail {
    pub post: Post,
    pub like_count: u64,
    pub liked_by_viewer: bool,
}

/// The listing form of a post, without attachments, hashtags or like state.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostSummary {
    pub id: Id<PostMarker>,
    pub author: User,
    pub content: PostContent,
    pub image: Option<MediaPath>,
    pub category_name: Option<String>,
    pub is_draft: bool,
    pub created_at: OffsetDateTime,
}

impl PostSummary {
    #[must_use]
    pub fn preview(&self) -> Cow<'_, str> {
        self.content.preview()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostFile {
    pub id: Id<PostFileMarker>,
    pub file: MediaPath,
}

/// Title and body of a post. Both are non-empty, the title is at most [`TITLE_MAX_LEN`]
/// characters.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostContent {
    title: String,
    content: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostContentError {
    #[error("Title and content are required.")]
    Missing,
    #[error("Title must be at most {TITLE_MAX_LEN} characters.")]
    TitleTooLong,
}

impl PostContent {
    pub fn new(title: String, content: String) -> Result<Self, InvalidPostContentError> {
        let title = title.trim().to_owned();
        if title.is_empty() || content.trim().is_empty() {
            return Err(InvalidPostContentError::Missing);
        }
        if title.chars().count() > TITLE_MAX_LEN {
            return Err(InvalidPostContentError::TitleTooLong);
        }

        Ok(Self { title, content })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The first [`PREVIEW_MAX_CHARS`] characters of the body, followed by `...` if cut.
    #[must_use]
    pub fn preview(&self) -> Cow<'_, str> {
        truncate_with_ellipsis(&self.content, PREVIEW_MAX_CHARS)
    }

    /// Replaces whichever parts are given, validating the result as a whole.
    pub fn edited(
        &self,
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Self, InvalidPostContentError> {
        Self::new(
            title.unwrap_or_else(|| self.title.clone()),
            content.unwrap_or_else(|| self.content.clone()),
        )
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub content: PostContent,
    /// Unknown categories are dropped silently by the store.
    pub category: Option<Id<CategoryMarker>>,
    pub hashtags: Vec<HashtagName>,
    pub image: Option<MediaPath>,
    pub video: Option<MediaPath>,
    pub files: Vec<MediaPath>,
    pub is_draft: bool,
    pub created_at: OffsetDateTime,
}

/// Changes to a post. `None` leaves the field untouched; `Some(None)` clears the category.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostUpdate {
    pub content: Option<PostContent>,
    pub category: Option<Option<Id<CategoryMarker>>>,
    pub is_draft: Option<bool>,
}

/// Media left behind by a deleted post.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct DeletedPost {
    pub media: Vec<MediaPath>,
}

#[cfg(test)]
mod tests {
    use crate::model::post::{InvalidPostContentError, PREVIEW_MAX_CHARS, PostContent};

    fn content(body: &str) -> PostContent {
        PostContent::new("Title".to_owned(), body.to_owned()).unwrap()
    }

    #[test]
    fn short_content_is_previewed_unchanged() {
        let body = "b".repeat(PREVIEW_MAX_CHARS);
        assert_eq!(content(&body).preview(), body);
        assert_eq!(content("hello").preview(), "hello");
    }

    #[test]
    fn long_content_is_cut_with_ellipsis() {
        let body = format!("{}{}", "a".repeat(PREVIEW_MAX_CHARS), "tail");
        assert_eq!(
            content(&body).preview(),
            format!("{}...", "a".repeat(PREVIEW_MAX_CHARS))
        );
    }

    #[test]
    fn missing_parts_are_rejected() {
        assert_eq!(
            PostContent::new(String::new(), "body".to_owned()),
            Err(InvalidPostContentError::Missing)
        );
        assert_eq!(
            PostContent::new("title".to_owned(), " \n".to_owned()),
            Err(InvalidPostContentError::Missing)
        );
        assert_eq!(
            PostContent::new("t".repeat(256), "body".to_owned()),
            Err(InvalidPostContentError::TitleTooLong)
        );
    }

    #[test]
    fn edits_keep_untouched_parts() {
        let original = PostContent::new("Old".to_owned(), "Body".to_owned()).unwrap();
        let edited = original.edited(Some("New".to_owned()), None).unwrap();

        assert_eq!(edited.title(), "New");
        assert_eq!(edited.content(), "Body");
        assert!(original.edited(Some(String::new()), None).is_err());
    }
}
