use crate::server::ServerRouter;
use chyrp_common::model::{Id, post::PostMarker};
use serde::{Deserialize, Deserializer, de::Error};

mod auth;
mod categories;
mod comments;
mod likes;
mod posts;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(auth::routes())
        .merge(categories::routes())
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(likes::routes())
}

/// `?post=<id>` on collection listings. Without it, or with an empty value, the listing is empty.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct PostFilter {
    #[serde(default, deserialize_with = "deserialize_blank_as_none")]
    post: Option<Id<PostMarker>>,
}

fn deserialize_blank_as_none<'de, D>(deserializer: D) -> Result<Option<Id<PostMarker>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => id.parse().map(Some).map_err(D::Error::custom),
    }
}

