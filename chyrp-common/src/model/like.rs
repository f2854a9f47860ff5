use crate::model::{Id, post::PostMarker, user::User};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LikeMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Like {
    pub id: Id<LikeMarker>,
    pub post: Id<PostMarker>,
    pub user: User,
}

/// State of a like button after it was pressed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: u64,
}
