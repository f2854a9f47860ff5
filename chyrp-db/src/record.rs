use chyrp_common::{
    model::{
        ModelValidationError,
        auth::{PasswordDigest, Session, UserCredentials},
        category::{Category, CategoryName},
        comment::{Comment, CommentMessage},
        hashtag::HashtagName,
        like::Like,
        media::MediaPath,
        post::{Post, PostContent, PostDetail, PostFile, PostSummary},
        user::{DisplayName, User, Username},
    },
    util::PositiveDuration,
};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub username: String,
    pub display_name: String,
    pub profile_pic: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    #[sqlx(flatten)]
    pub user: UserRecord,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct SessionRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CategoryRecord {
    pub category_snowflake: i64,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub is_draft: bool,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
    #[sqlx(flatten)]
    pub author: UserRecord,
    pub category_snowflake: Option<i64>,
    pub category_name: Option<String>,
    pub like_count: i64,
    pub liked_by_viewer: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostSummaryRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub is_draft: bool,
    pub created_at: OffsetDateTime,
    #[sqlx(flatten)]
    pub author: UserRecord,
    pub category_name: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostFileRecord {
    pub post_file_snowflake: i64,
    pub file: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub message: String,
    pub sent_at: OffsetDateTime,
    #[sqlx(flatten)]
    pub author: UserRecord,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct LikeRecord {
    pub like_snowflake: i64,
    pub post_snowflake: i64,
    #[sqlx(flatten)]
    pub user: UserRecord,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            username: Username::new(value.username)?,
            display_name: DisplayName::new(value.display_name)?,
            profile_pic: value.profile_pic.map(MediaPath::from_stored),
        })
    }
}

impl TryFrom<CredentialsRecord> for UserCredentials {
    type Error = ModelValidationError;

    fn try_from(value: CredentialsRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user.try_into()?,
            password_hash: PasswordDigest::from_phc(value.password_hash),
        })
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = ModelValidationError;

    fn try_from(value: SessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| PositiveDuration::try_from(Duration::seconds(seconds)))
                .transpose()?,
        })
    }
}

impl TryFrom<CategoryRecord> for Category {
    type Error = ModelValidationError;

    fn try_from(value: CategoryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.category_snowflake.cast_unsigned().into(),
            name: CategoryName::new(value.name)?,
        })
    }
}

impl From<PostFileRecord> for PostFile {
    fn from(value: PostFileRecord) -> Self {
        Self {
            id: value.post_file_snowflake.cast_unsigned().into(),
            file: MediaPath::from_stored(value.file),
        }
    }
}

impl FullPostRecord {
    pub fn into_detail(
        self,
        hashtags: Vec<String>,
        files: Vec<PostFileRecord>,
    ) -> Result<PostDetail, ModelValidationError> {
        let category = match (self.category_snowflake, self.category_name) {
            (Some(category_snowflake), Some(name)) => Some(Category::try_from(CategoryRecord {
                category_snowflake,
                name,
            })?),
            _ => None,
        };

        let post = Post {
            id: self.post_snowflake.cast_unsigned().into(),
            author: self.author.try_into()?,
            content: PostContent::new(self.title, self.content)?,
            image: self.image.map(MediaPath::from_stored),
            video: self.video.map(MediaPath::from_stored),
            category,
            hashtags: hashtags.into_iter().map(HashtagName::from_stored).collect(),
            files: files.into_iter().map(PostFile::from).collect(),
            is_draft: self.is_draft,
            created_at: self.created_at,
            modified_at: self.modified_at,
        };

        Ok(PostDetail {
            post,
            like_count: self.like_count.cast_unsigned(),
            liked_by_viewer: self.liked_by_viewer,
        })
    }
}

impl TryFrom<PostSummaryRecord> for PostSummary {
    type Error = ModelValidationError;

    fn try_from(value: PostSummaryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author: value.author.try_into()?,
            content: PostContent::new(value.title, value.content)?,
            image: value.image.map(MediaPath::from_stored),
            category_name: value.category_name,
            is_draft: value.is_draft,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            author: value.author.try_into()?,
            message: CommentMessage::new(value.message)?,
            sent_at: value.sent_at,
        })
    }
}

impl TryFrom<LikeRecord> for Like {
    type Error = ModelValidationError;

    fn try_from(value: LikeRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.like_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            user: value.user.try_into()?,
        })
    }
}
