use crate::{
    server::{
        Result, ServerError, ServerRouter,
        auth::{AuthenticatedUser, CsrfProtected},
        json::{Created, Json},
        routes::PostFilter,
        views::CommentView,
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
use chyrp_common::model::{
    Id, ModelValidationError,
    comment::{CommentMarker, CommentMessage, CreateComment},
    post::PostMarker,
};
use chyrp_db::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_post(create_comment)
        .typed_get(get_comment)
        .typed_patch(update_comment)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/", rejection(ServerError))]
struct CommentsPath();

async fn list_comments(
    CommentsPath(): CommentsPath,
    WithRejection(Query(filter), _): WithRejection<Query<PostFilter>, ServerError>,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
) -> Result<Json<Vec<CommentView>>> {
    let Some(post_id) = filter.post else {
        return Ok(Json(Vec::new()));
    };

    let comments = db
        .fetch_comments(post_id)
        .await?
        .iter()
        .map(|comment| CommentView::new(comment, &media))
        .collect();

    Ok(Json(comments))
}

#[derive(Clone, Debug, Deserialize)]
struct NewComment {
    post: Id<PostMarker>,
    message: String,
}

async fn create_comment(
    CommentsPath(): CommentsPath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    Json(body): Json<NewComment>,
) -> Result<Created<CommentView>> {
    let message = CommentMessage::new(body.message).map_err(ModelValidationError::from)?;

    let comment = db
        .create_comment(&CreateComment {
            post: body.post,
            author: user.user_id(),
            message,
        })
        .await?;
    debug!(comment_id = %comment.id, post_id = %comment.post, "Created comment");

    Ok(Created(CommentView::new(&comment, &media)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/", rejection(ServerError))]
struct CommentPath {
    id: Id<CommentMarker>,
}

async fn get_comment(
    CommentPath { id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
) -> Result<Json<CommentView>> {
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok(Json(CommentView::new(&comment, &media)))
}

#[derive(Clone, Debug, Deserialize)]
struct EditedComment {
    message: String,
}

async fn update_comment(
    CommentPath { id }: CommentPath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    Json(body): Json<EditedComment>,
) -> Result<Json<CommentView>> {
    let message = CommentMessage::new(body.message).map_err(ModelValidationError::from)?;

    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    if comment.author.id != user.user_id() {
        return Err(ServerError::NotOwner);
    }

    let updated = db
        .update_comment(id, &message)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;
    debug!(comment_id = %id, "Edited comment");

    Ok(Json(CommentView::new(&updated, &media)))
}

async fn delete_comment(
    CommentPath { id }: CommentPath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
) -> Result<StatusCode> {
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    if comment.author.id != user.user_id() {
        return Err(ServerError::NotOwner);
    }

    if !db.delete_comment(id).await? {
        return Err(ServerError::CommentByIdNotFound(id));
    }
    debug!(comment_id = %id, "Deleted comment");

    Ok(StatusCode::NO_CONTENT)
}
