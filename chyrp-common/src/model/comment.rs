use crate::model::{
    Id,
    post::PostMarker,
    user::{User, UserMarker},
};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author: User,
    pub message: CommentMessage,
    pub sent_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateComment {
    pub post: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub message: CommentMessage,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMessage(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Comment message may not be blank.")]
pub struct EmptyCommentError;

impl CommentMessage {
    pub fn new(message: String) -> Result<Self, EmptyCommentError> {
        if message.trim().is_empty() {
            Err(EmptyCommentError)
        } else {
            Ok(Self(message))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}
