use crate::{
    client::{DbClient, Result, key},
    record::SessionRecord,
};
use chyrp_common::model::auth::{Session, SessionTokenHash};
use sqlx::{query, query_as};

impl DbClient {
    pub async fn create_session(&self, session: &Session) -> Result<()> {
        query(
            "
            INSERT INTO users.sessions (token_hash, user_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&session.token_hash.0[..])
        .bind(key(session.user))
        .bind(session.created_at)
        .bind(
            session
                .expires_after
                .map(|expires_after| expires_after.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_session(&self, token_hash: &SessionTokenHash) -> Result<Option<Session>> {
        let record = query_as::<_, SessionRecord>(
            "
            SELECT
                sessions.user_snowflake,
                sessions.token_hash,
                sessions.created_at,
                sessions.expires_after_seconds
            FROM
                users.sessions
            WHERE
                sessions.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let session = record.map(Session::try_from).transpose()?;
        Ok(session)
    }

    /// Returns whether a session was deleted.
    pub async fn delete_session(&self, token_hash: &SessionTokenHash) -> Result<bool> {
        let result = query("DELETE FROM users.sessions WHERE token_hash = $1")
            .bind(&token_hash.0[..])
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expired_sessions(&self) -> Result<u64> {
        let result = query(
            "
            DELETE FROM users.sessions
            WHERE expires_after_seconds IS NOT NULL
                AND created_at + expires_after_seconds * INTERVAL '1 second' < now()
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
