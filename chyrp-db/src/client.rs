use chyrp_common::{
    model::{
        ChyrpSnowflakeGenerator, Id, ModelValidationError, media::MAX_POST_FILES, post::PostMarker,
        user::UserMarker,
    },
    snowflake::{ProcessId, SnowflakeError, WorkerId},
};
use sqlx::{PgPool, migrate::MigrateError};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error("Could not generate an id: {0}")]
    Snowflake(#[from] SnowflakeError),
    #[error("Username already exists.")]
    DuplicateUsername,
    #[error("Already liked.")]
    DuplicateLike,
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserNotFound(Id<UserMarker>),
    #[error("Cannot attach more than {max} files to post {0}.", max = MAX_POST_FILES)]
    AttachmentLimit(Id<PostMarker>),
}

#[derive(Debug)]
pub struct DbClient {
    pub(crate) pool: PgPool,
    snowflake_generator: Mutex<ChyrpSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(ChyrpSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        debug!("Database migrations applied");

        Ok(())
    }

    pub(crate) fn next_id<Marker>(&self) -> Result<Id<Marker>> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        Ok(Id::new(snowflake))
    }
}

/// Database representation of an id.
pub(crate) fn key<Marker>(id: Id<Marker>) -> i64 {
    id.snowflake().get().cast_signed()
}

pub(crate) fn id_from_key<Marker>(key: i64) -> Id<Marker> {
    key.cast_unsigned().into()
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

/// Classifies a write to a table referencing both a user and a post.
/// A violated `*_user_snowflake_fkey` means the user is gone, any other foreign key the post.
pub(crate) fn missing_reference(
    err: sqlx::Error,
    user_id: Id<UserMarker>,
    post_id: Id<PostMarker>,
) -> DbError {
    let user_missing = err
        .as_database_error()
        .filter(|db_err| db_err.is_foreign_key_violation())
        .map(|db_err| {
            db_err
                .constraint()
                .is_some_and(|constraint| constraint.ends_with("user_snowflake_fkey"))
        });

    match user_missing {
        Some(true) => DbError::UserNotFound(user_id),
        Some(false) => DbError::PostNotFound(post_id),
        None => DbError::Sqlx(err),
    }
}
