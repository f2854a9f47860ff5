use crate::server::{Result, ServerError};
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{StatusCode, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chyrp_common::{
    model::{
        Id,
        auth::{CsrfToken, Session, SessionToken},
        user::UserMarker,
    },
    util::PositiveDuration,
};
use chyrp_db::DbClient;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "x-csrftoken";

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CookieSettings {
    pub secure: bool,
    /// `None` keeps sessions alive until logout.
    pub session_lifetime: Option<PositiveDuration>,
}

impl CookieSettings {
    fn session_cookie(self, token: &SessionToken) -> Cookie<'static> {
        let mut cookie = Cookie::build((SESSION_COOKIE, token.as_token_str()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure);

        if let Some(lifetime) = self.session_lifetime {
            cookie = cookie.max_age(lifetime.get());
        }

        cookie.build()
    }

    #[must_use]
    pub fn session_removal_cookie(self) -> Cookie<'static> {
        let mut cookie = Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build();
        cookie.make_removal();

        cookie
    }

    /// Readable by scripts so the frontend can echo it in [`CSRF_HEADER`].
    #[must_use]
    pub fn csrf_cookie(self, token: &CsrfToken) -> Cookie<'static> {
        Cookie::build((CSRF_COOKIE, token.get().to_owned()))
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }
}

/// Creates a server-side session for `user_id` and returns the cookie carrying its token.
pub async fn start_session(
    db: &DbClient,
    settings: CookieSettings,
    user_id: Id<UserMarker>,
) -> Result<Cookie<'static>> {
    let token = SessionToken::generate_random(user_id);

    let session = Session {
        user: user_id,
        token_hash: token.hash()?,
        created_at: OffsetDateTime::now_utc(),
        expires_after: settings.session_lifetime,
    };
    db.create_session(&session).await?;
    debug!(%user_id, "Started session");

    Ok(settings.session_cookie(&token))
}

/// Ends the session presented in `jar`, if any. Unparsable cookies are ignored.
pub async fn end_session(db: &DbClient, jar: &CookieJar) -> Result<()> {
    let Some(token) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<SessionToken>().ok())
    else {
        return Ok(());
    };

    if db.delete_session(&token.hash()?).await? {
        debug!(user_id = %token.user_id, "Ended session");
    }

    Ok(())
}

/// The user behind the session cookie of a request.
///
/// As `Option<AuthenticatedUser>`, a missing, malformed or expired session yields `None`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let request_token: SessionToken = jar
            .get(SESSION_COOKIE)
            .ok_or(ServerError::MissingSession)?
            .value()
            .parse()?;

        let token_hash = request_token.hash()?;

        let session = Arc::<DbClient>::from_ref(state)
            .fetch_session(&token_hash)
            .await?
            .ok_or(ServerError::InvalidSession)?;

        if session.user != request_token.user_id
            || session.is_expired_at(OffsetDateTime::now_utc())
        {
            return Err(ServerError::InvalidSession);
        }

        Ok(Self { id: session.user })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <Self as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(err) if err.status() == StatusCode::UNAUTHORIZED => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Requires the [`CSRF_HEADER`] of a request to echo its [`CSRF_COOKIE`].
///
/// Extract it after [`AuthenticatedUser`] so anonymous requests are rejected as such first.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CsrfProtected;

impl<S> FromRequestParts<S> for CsrfProtected
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let expected = jar
            .get(CSRF_COOKIE)
            .and_then(|cookie| CsrfToken::parse(cookie.value()))
            .ok_or(ServerError::Csrf)?;

        let presented = parts
            .headers
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ServerError::Csrf)?;

        if expected.matches(presented) {
            Ok(Self)
        } else {
            Err(ServerError::Csrf)
        }
    }
}

/// The CSRF token already held by the client, or a fresh one.
pub fn current_or_new_csrf_token(jar: &CookieJar) -> CsrfToken {
    jar.get(CSRF_COOKIE)
        .and_then(|cookie| CsrfToken::parse(cookie.value()))
        .unwrap_or_else(CsrfToken::generate_random)
}
