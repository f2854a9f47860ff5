use crate::{
    server::{
        CookieSettings, Result, ServerError, ServerRouter,
        auth::{AuthenticatedUser, CsrfProtected, current_or_new_csrf_token, end_session, start_session},
        json::Json,
        views::{CsrfView, HomeView, MessageView, ProfileView},
    },
    storage::MediaStore,
};
use axum::extract::{Multipart, State};
use axum_extra::{
    extract::{CookieJar, WithRejection},
    routing::{RouterExt, TypedPath},
};
use chyrp_common::model::{
    ModelValidationError,
    auth::PasswordDigest,
    media::{MediaKind, MediaPath},
    user::{CreateUser, DisplayName, ProfileUpdate, Username},
};
use chyrp_db::DbClient;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(home)
        .typed_post(login)
        .typed_post(register)
        .typed_post(logout)
        .typed_get(me)
        .typed_patch(update_me)
        .typed_get(csrf_token)
}

/// Verified against when the username is unknown, so both failures cost the same.
static DECOY_PASSWORD_HASH: LazyLock<Option<PasswordDigest>> =
    LazyLock::new(|| PasswordDigest::hash("decoy password").ok());

#[derive(Clone, Eq, PartialEq, Default, Deserialize)]
struct CredentialsBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl CredentialsBody {
    fn is_incomplete(&self) -> bool {
        self.username.is_empty() || self.password.is_empty()
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/home/", rejection(ServerError))]
struct HomePath();

async fn home(
    HomePath(): HomePath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<HomeView>> {
    let user = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::InvalidSession)?;

    Ok(Json(HomeView {
        display_name: user.display_name.get().to_owned(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/login/", rejection(ServerError))]
struct LoginPath();

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    State(cookie_settings): State<CookieSettings>,
    jar: CookieJar,
    Json(body): Json<CredentialsBody>,
) -> Result<(CookieJar, Json<MessageView>)> {
    if body.is_incomplete() {
        return Err(ServerError::MissingCredentials);
    }

    let credentials = match Username::new(body.username) {
        Ok(username) => db.fetch_credentials(&username).await?,
        Err(_) => None,
    };

    let Some(credentials) = credentials else {
        if let Some(decoy) = &*DECOY_PASSWORD_HASH {
            decoy.verify(&body.password)?;
        }
        return Err(ServerError::InvalidCredentials);
    };

    if !credentials.password_hash.verify(&body.password)? {
        return Err(ServerError::InvalidCredentials);
    }

    let user_id = credentials.user.id;
    let cookie = start_session(&db, cookie_settings, user_id).await?;
    info!(%user_id, "User logged in");

    Ok((jar.add(cookie), Json(MessageView::new("Login successful"))))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/register/", rejection(ServerError))]
struct RegisterPath();

async fn register(
    RegisterPath(): RegisterPath,
    State(db): State<Arc<DbClient>>,
    State(cookie_settings): State<CookieSettings>,
    jar: CookieJar,
    Json(body): Json<CredentialsBody>,
) -> Result<(CookieJar, Json<MessageView>)> {
    if body.is_incomplete() {
        return Err(ServerError::MissingCredentials);
    }

    let username = Username::new(body.username).map_err(ModelValidationError::from)?;
    let password_hash = PasswordDigest::hash(&body.password)?;

    let user = db
        .create_user(&CreateUser {
            display_name: DisplayName::from(username.clone()),
            username,
            password_hash,
        })
        .await?;
    info!(user_id = %user.id, username = user.username.get(), "Registered user");

    let cookie = start_session(&db, cookie_settings, user.id).await?;

    Ok((jar.add(cookie), Json(MessageView::new("Registration successful"))))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/logout/", rejection(ServerError))]
struct LogoutPath();

async fn logout(
    LogoutPath(): LogoutPath,
    State(db): State<Arc<DbClient>>,
    State(cookie_settings): State<CookieSettings>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageView>)> {
    end_session(&db, &jar).await?;

    Ok((
        jar.add(cookie_settings.session_removal_cookie()),
        Json(MessageView::new("Logged out successfully")),
    ))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/me/", rejection(ServerError))]
struct MePath();

async fn me(
    MePath(): MePath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
) -> Result<Json<ProfileView>> {
    let user = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::InvalidSession)?;

    Ok(Json(ProfileView::new(&user, &media)))
}

/// Multipart form with an optional `display_name` and an optional `profile_pic` image.
async fn update_me(
    MePath(): MePath,
    user: AuthenticatedUser,
    _: CsrfProtected,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ServerError>,
) -> Result<Json<ProfileView>> {
    let mut update = ProfileUpdate::default();
    let mut picture = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();

        match name.as_str() {
            "display_name" => {
                let display_name =
                    DisplayName::new(field.text().await?).map_err(ModelValidationError::from)?;
                update.display_name = Some(display_name);
            }
            "profile_pic" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                if file_name.is_empty() {
                    continue;
                }

                let path = MediaPath::for_upload(MediaKind::ProfilePicture, &file_name)
                    .map_err(ModelValidationError::from)?;
                picture = Some((path, field.bytes().await?));
            }
            _ => {}
        }
    }

    if let Some((path, contents)) = picture {
        media
            .write(&path, &contents)
            .await
            .map_err(ServerError::MediaWrite)?;
        update.profile_pic = Some(path);
    }

    let (user, replaced) = match db.update_profile(user.user_id(), &update).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            media.remove_all(update.profile_pic.as_slice()).await;
            return Err(ServerError::InvalidSession);
        }
        Err(err) => {
            media.remove_all(update.profile_pic.as_slice()).await;
            return Err(err.into());
        }
    };

    if let Some(replaced) = replaced {
        media.remove(&replaced).await;
    }
    info!(user_id = %user.id, "Updated profile");

    Ok(Json(ProfileView::new(&user, &media)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/csrf/", rejection(ServerError))]
struct CsrfPath();

async fn csrf_token(
    CsrfPath(): CsrfPath,
    State(cookie_settings): State<CookieSettings>,
    jar: CookieJar,
) -> (CookieJar, Json<CsrfView>) {
    let token = current_or_new_csrf_token(&jar);
    let view = CsrfView {
        csrf_token: token.get().to_owned(),
    };

    (jar.add(cookie_settings.csrf_cookie(&token)), Json(view))
}
