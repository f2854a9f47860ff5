use crate::{
    server::{
        Result, ServerError, ServerRouter,
        auth::{AuthenticatedUser, CsrfProtected},
        json::{Created, Json},
        views::{CreatedPostView, PostDetailView, PostListItemView},
    },
    storage::MediaStore,
};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
};
use axum_extra::{
    extract::WithRejection,
    routing::{RouterExt, TypedPath},
};
use chyrp_common::model::{
    Id, ModelValidationError,
    category::CategoryMarker,
    hashtag::parse_hashtags,
    media::{MAX_POST_FILES, MediaKind, MediaPath},
    post::{CreatePost, PostContent, PostMarker, PostUpdate},
};
use chyrp_db::DbClient;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_post)
        .typed_get(list_posts)
        .typed_get(get_post)
        .typed_patch(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create/", rejection(ServerError))]
struct CreatePostPath();

/// Text fields and files of the post creation form.
#[derive(Debug, Default)]
struct PostForm {
    title: String,
    content: String,
    category: String,
    hashtags: String,
    is_draft: Option<String>,
    image: Option<(String, Bytes)>,
    video: Option<(String, Bytes)>,
    attachments: Vec<(String, Bytes)>,
}

impl PostForm {
    async fn read(multipart: &mut Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            let file_name = field.file_name().map(ToOwned::to_owned);

            match (name.as_str(), file_name) {
                ("title", _) => form.title = field.text().await?,
                ("content", _) => form.content = field.text().await?,
                ("category", _) => form.category = field.text().await?,
                ("hashtags", _) => form.hashtags = field.text().await?,
                ("is_draft", _) => form.is_draft = Some(field.text().await?),
                // Browsers send an empty part for file inputs left blank.
                (_, Some(file_name)) if file_name.is_empty() => {}
                ("image", Some(file_name)) => form.image = Some((file_name, field.bytes().await?)),
                ("video", Some(file_name)) => form.video = Some((file_name, field.bytes().await?)),
                ("attachments", Some(file_name)) => {
                    form.attachments.push((file_name, field.bytes().await?));
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

fn parse_draft_flag(value: Option<&str>) -> bool {
    value.is_none_or(|value| {
        !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "off" | "no"
        )
    })
}

/// Assigns a storage path to an uploaded file, rejecting disallowed extensions.
fn plan_upload(
    kind: MediaKind,
    (file_name, contents): (String, Bytes),
) -> Result<(MediaPath, Bytes), ModelValidationError> {
    Ok((MediaPath::for_upload(kind, &file_name)?, contents))
}

/// Keeps the first [`MAX_POST_FILES`] attachments and reports how many were dropped.
fn cap_attachments<T>(mut attachments: Vec<T>) -> (Vec<T>, usize) {
    let dropped = attachments.len().saturating_sub(MAX_POST_FILES);
    attachments.truncate(MAX_POST_FILES);

    (attachments, dropped)
}

async fn create_post(
    CreatePostPath(): CreatePostPath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ServerError>,
) -> Result<Created<CreatedPostView>> {
    let form = PostForm::read(&mut multipart).await?;

    let content = PostContent::new(form.title, form.content).map_err(ModelValidationError::from)?;
    let hashtags = parse_hashtags(&form.hashtags).map_err(ModelValidationError::from)?;
    let category = form.category.trim().parse::<Id<CategoryMarker>>().ok();

    let image = form
        .image
        .map(|upload| plan_upload(MediaKind::PostImage, upload))
        .transpose()?;
    let video = form
        .video
        .map(|upload| plan_upload(MediaKind::PostVideo, upload))
        .transpose()?;

    let (attachments, dropped_attachments) = cap_attachments(form.attachments);
    let attachments = attachments
        .into_iter()
        .map(|upload| plan_upload(MediaKind::PostFile, upload))
        .collect::<Result<Vec<_>, _>>()?;

    let uploads: Vec<&(MediaPath, Bytes)> = image
        .iter()
        .chain(video.iter())
        .chain(attachments.iter())
        .collect();

    let mut written = Vec::with_capacity(uploads.len());
    for (path, contents) in uploads {
        if let Err(err) = media.write(path, contents).await {
            media.remove_all(&written).await;
            return Err(ServerError::MediaWrite(err));
        }
        written.push(path.clone());
    }

    let post = CreatePost {
        author: user.user_id(),
        content,
        category,
        hashtags,
        image: image.map(|(path, _)| path),
        video: video.map(|(path, _)| path),
        files: attachments.into_iter().map(|(path, _)| path).collect(),
        is_draft: parse_draft_flag(form.is_draft.as_deref()),
        created_at: OffsetDateTime::now_utc(),
    };

    let id = match db.create_post(&post).await {
        Ok(id) => id,
        Err(err) => {
            media.remove_all(&written).await;
            return Err(err.into());
        }
    };

    if dropped_attachments > 0 {
        debug!(post_id = %id, dropped_attachments, "Dropped excess attachments");
    }
    info!(post_id = %id, author = %user.user_id(), "Created post");

    Ok(Created(CreatedPostView {
        message: "Post created successfully",
        id,
        dropped_attachments,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/", rejection(ServerError))]
struct PostsPath();

async fn list_posts(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
) -> Result<Json<Vec<PostListItemView>>> {
    let posts = db
        .fetch_posts()
        .await?
        .iter()
        .map(|post| PostListItemView::new(post, &media))
        .collect::<Result<Vec<_>>>()?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    viewer: Option<AuthenticatedUser>,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
) -> Result<Json<PostDetailView>> {
    let post = db
        .fetch_post(id, viewer.map(AuthenticatedUser::user_id))
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(PostDetailView::new(&post, &media)))
}

/// Distinguishes an absent field from an explicit `null`.
fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct PostPatch {
    title: Option<String>,
    content: Option<String>,
    /// `null` removes the category.
    #[serde(default, deserialize_with = "deserialize_present")]
    category: Option<Option<Id<CategoryMarker>>>,
    is_draft: Option<bool>,
}

async fn update_post(
    PostPath { id }: PostPath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    Json(patch): Json<PostPatch>,
) -> Result<Json<PostDetailView>> {
    let viewer = Some(user.user_id());
    let current = db
        .fetch_post(id, viewer)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if current.post.author.id != user.user_id() {
        return Err(ServerError::NotOwner);
    }

    let content = if patch.title.is_some() || patch.content.is_some() {
        let edited = current
            .post
            .content
            .edited(patch.title, patch.content)
            .map_err(ModelValidationError::from)?;
        Some(edited)
    } else {
        None
    };

    let update = PostUpdate {
        content,
        category: patch.category,
        is_draft: patch.is_draft,
    };

    if !db.update_post(id, &update).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    let updated = db
        .fetch_post(id, viewer)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    info!(post_id = %id, "Updated post");

    Ok(Json(PostDetailView::new(&updated, &media)))
}

async fn delete_post(
    PostPath { id }: PostPath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
) -> Result<StatusCode> {
    let owner = db
        .fetch_post_owner(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if owner != user.user_id() {
        return Err(ServerError::NotOwner);
    }

    let deleted = db
        .delete_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    media.remove_all(&deleted.media).await;
    info!(post_id = %id, "Deleted post");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::server::routes::posts::{PostPatch, cap_attachments, parse_draft_flag};
    use chyrp_common::model::Id;

    #[test]
    fn posts_are_drafts_unless_told_otherwise() {
        assert!(parse_draft_flag(None));
        assert!(parse_draft_flag(Some("true")));
        assert!(parse_draft_flag(Some("on")));
        assert!(!parse_draft_flag(Some("false")));
        assert!(!parse_draft_flag(Some(" False ")));
        assert!(!parse_draft_flag(Some("0")));
    }

    #[test]
    fn excess_attachments_are_dropped_in_order() {
        let (kept, dropped) = cap_attachments(vec!["a.pdf", "b.txt", "c.zip", "d.rar", "e.docx"]);
        assert_eq!(kept, ["a.pdf", "b.txt", "c.zip"]);
        assert_eq!(dropped, 2);

        let (kept, dropped) = cap_attachments(vec!["a.pdf"]);
        assert_eq!(kept, ["a.pdf"]);
        assert_eq!(dropped, 0);

        let (kept, dropped) = cap_attachments(Vec::<&str>::new());
        assert!(kept.is_empty());
        assert_eq!(dropped, 0);
    }

    #[test]
    fn patch_tells_missing_category_from_null() {
        let untouched: PostPatch = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        assert_eq!(untouched.category, None);
        assert_eq!(untouched.title.as_deref(), Some("New"));

        let cleared: PostPatch = serde_json::from_str(r#"{"category":null}"#).unwrap();
        assert_eq!(cleared.category, Some(None));

        let set: PostPatch = serde_json::from_str(r#"{"category":"12"}"#).unwrap();
        assert_eq!(set.category, Some(Some(Id::from(12_u64))));
    }
}
