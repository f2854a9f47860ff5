use crate::{
    client::{DbClient, DbError, Result, is_unique_violation, key},
    record::{CredentialsRecord, UserRecord},
};
use chyrp_common::model::{
    Id,
    auth::UserCredentials,
    media::MediaPath,
    user::{CreateUser, ProfileUpdate, User, UserMarker, Username},
};
use sqlx::{query_as, query_scalar};

impl DbClient {
    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic
            FROM
                users.users
            WHERE
                users.user_snowflake = $1
            ",
        )
        .bind(key(user_id))
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_credentials(&self, username: &Username) -> Result<Option<UserCredentials>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic,
                users.password_hash
            FROM
                users.users
            WHERE
                users.username = $1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(UserCredentials::try_from).transpose()?;
        Ok(credentials)
    }

    /// Fails with [`DbError::DuplicateUsername`] if the name is taken, including when another
    /// registration wins a race for it.
    pub async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let user_id = self.next_id::<UserMarker>()?;

        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (user_snowflake, username, display_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING user_snowflake, username, display_name, profile_pic
            ",
        )
        .bind(key(user_id))
        .bind(user.username.get())
        .bind(user.display_name.get())
        .bind(user.password_hash.as_phc())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                DbError::DuplicateUsername
            } else {
                DbError::from(err)
            }
        })?;

        Ok(record.try_into()?)
    }

    /// Returns the updated user and the profile picture it replaced, if any.
    pub async fn update_profile(
        &self,
        user_id: Id<UserMarker>,
        update: &ProfileUpdate,
    ) -> Result<Option<(User, Option<MediaPath>)>> {
        let mut tx = self.pool.begin().await?;

        let previous_pic: Option<Option<String>> = query_scalar(
            "
            SELECT users.profile_pic
            FROM users.users
            WHERE users.user_snowflake = $1
            FOR UPDATE
            ",
        )
        .bind(key(user_id))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(previous_pic) = previous_pic else {
            return Ok(None);
        };

        let record = query_as::<_, UserRecord>(
            "
            UPDATE users.users
            SET
                display_name = COALESCE($2, display_name),
                profile_pic = COALESCE($3, profile_pic)
            WHERE user_snowflake = $1
            RETURNING user_snowflake, username, display_name, profile_pic
            ",
        )
        .bind(key(user_id))
        .bind(update.display_name.as_ref().map(|name| name.get()))
        .bind(update.profile_pic.as_ref().map(MediaPath::get))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let replaced = update
            .profile_pic
            .as_ref()
            .and(previous_pic)
            .map(MediaPath::from_stored);

        Ok(Some((record.try_into()?, replaced)))
    }
}
