use crate::{
    server::{
        Result, ServerError, ServerRouter,
        auth::{AuthenticatedUser, CsrfProtected},
        json::{Created, Json},
        routes::PostFilter,
        views::{LikeToggleView, LikeView},
    },
    storage::MediaStore,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use axum_extra::{
    extract::WithRejection,
    routing::{RouterExt, TypedPath},
};
use chyrp_common::model::{Id, like::LikeMarker, post::PostMarker};
use chyrp_db::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_likes)
        .typed_post(create_like)
        .typed_delete(unlike)
        .typed_post(toggle_like)
        .typed_get(get_like)
        .typed_delete(delete_like)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/likes/", rejection(ServerError))]
struct LikesPath();

async fn list_likes(
    LikesPath(): LikesPath,
    WithRejection(Query(filter), _): WithRejection<Query<PostFilter>, ServerError>,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
) -> Result<Json<Vec<LikeView>>> {
    let Some(post_id) = filter.post else {
        return Ok(Json(Vec::new()));
    };

    let likes = db
        .fetch_likes(post_id)
        .await?
        .iter()
        .map(|like| LikeView::new(like, &media))
        .collect();

    Ok(Json(likes))
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct LikeTarget {
    post: Id<PostMarker>,
}

async fn create_like(
    LikesPath(): LikesPath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    Json(LikeTarget { post }): Json<LikeTarget>,
) -> Result<Created<LikeView>> {
    let like = db.create_like(user.user_id(), post).await?;
    debug!(like_id = %like.id, post_id = %post, "Created like");

    Ok(Created(LikeView::new(&like, &media)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/likes/unlike/", rejection(ServerError))]
struct UnlikePath();

async fn unlike(
    UnlikePath(): UnlikePath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
    Json(LikeTarget { post }): Json<LikeTarget>,
) -> Result<StatusCode> {
    if !db.delete_like_by_pair(user.user_id(), post).await? {
        return Err(ServerError::NotLiked(post));
    }
    debug!(post_id = %post, "Removed like");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/likes/toggle/", rejection(ServerError))]
struct TogglePath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct ToggleTarget {
    post_id: Id<PostMarker>,
}

async fn toggle_like(
    TogglePath(): TogglePath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
    Json(ToggleTarget { post_id }): Json<ToggleTarget>,
) -> Result<Json<LikeToggleView>> {
    let toggle = db.toggle_like(user.user_id(), post_id).await?;
    debug!(%post_id, liked = toggle.liked, "Toggled like");

    Ok(Json(toggle.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/likes/{id}/", rejection(ServerError))]
struct LikePath {
    id: Id<LikeMarker>,
}

async fn get_like(
    LikePath { id }: LikePath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
) -> Result<Json<LikeView>> {
    let like = db
        .fetch_like(id)
        .await?
        .ok_or(ServerError::LikeByIdNotFound(id))?;

    Ok(Json(LikeView::new(&like, &media)))
}

async fn delete_like(
    LikePath { id }: LikePath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
) -> Result<StatusCode> {
    let like = db
        .fetch_like(id)
        .await?
        .ok_or(ServerError::LikeByIdNotFound(id))?;

    if like.user.id != user.user_id() {
        return Err(ServerError::NotOwner);
    }

    if !db.delete_like(id).await? {
        return Err(ServerError::LikeByIdNotFound(id));
    }
    debug!(like_id = %id, "Deleted like");

    Ok(StatusCode::NO_CONTENT)
}
