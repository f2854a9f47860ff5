use crate::{
    client::{DbClient, DbError, Result, key, missing_reference},
    record::LikeRecord,
};
use chyrp_common::model::{
    Id,
    like::{Like, LikeMarker, LikeToggle},
    post::PostMarker,
    user::UserMarker,
};
use sqlx::{Executor, Postgres, query, query_as, query_scalar};

impl DbClient {
    pub async fn fetch_likes(&self, post_id: Id<PostMarker>) -> Result<Vec<Like>> {
        let records = query_as::<_, LikeRecord>(
            "
            SELECT
                likes.like_snowflake,
                likes.post_snowflake,
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic
            FROM
                interactions.likes
                JOIN users.users ON users.user_snowflake = likes.user_snowflake
            WHERE
                likes.post_snowflake = $1
            ORDER BY
                likes.like_snowflake
            ",
        )
        .bind(key(post_id))
        .fetch_all(&self.pool)
        .await?;

        let likes = records
            .into_iter()
            .map(Like::try_from)
            .collect::<Result<_, _>>()?;

        Ok(likes)
    }

    pub async fn fetch_like(&self, like_id: Id<LikeMarker>) -> Result<Option<Like>> {
        let record = query_as::<_, LikeRecord>(
            "
            SELECT
                likes.like_snowflake,
                likes.post_snowflake,
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic
            FROM
                interactions.likes
                JOIN users.users ON users.user_snowflake = likes.user_snowflake
            WHERE
                likes.like_snowflake = $1
            ",
        )
        .bind(key(like_id))
        .fetch_optional(&self.pool)
        .await?;

        let like = record.map(Like::try_from).transpose()?;
        Ok(like)
    }

    /// Fails with [`DbError::DuplicateLike`] if the user already likes the post and with
    /// [`DbError::PostNotFound`] if the post does not exist.
    /// A deleted user yields [`DbError::UserNotFound`].
    pub async fn create_like(&self, user_id: Id<UserMarker>, post_id: Id<PostMarker>) -> Result<Like> {
        let like_id = self.next_id::<LikeMarker>()?;

        let record = query_as::<_, LikeRecord>(
            "
            WITH inserted AS (
                INSERT INTO interactions.likes (like_snowflake, user_snowflake, post_snowflake)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_snowflake, post_snowflake) DO NOTHING
                RETURNING like_snowflake, user_snowflake, post_snowflake
            )
            SELECT
                inserted.like_snowflake,
                inserted.post_snowflake,
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic
            FROM
                inserted
                JOIN users.users ON users.user_snowflake = inserted.user_snowflake
            ",
        )
        .bind(key(like_id))
        .bind(key(user_id))
        .bind(key(post_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| missing_reference(err, user_id, post_id))?;

        let record = record.ok_or(DbError::DuplicateLike)?;
        Ok(record.try_into()?)
    }

    /// Removes the like of `user_id` on `post_id`. Returns whether there was one.
    pub async fn delete_like_by_pair(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        let result = query(
            "DELETE FROM interactions.likes WHERE user_snowflake = $1 AND post_snowflake = $2",
        )
        .bind(key(user_id))
        .bind(key(post_id))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns whether a like was deleted.
    pub async fn delete_like(&self, like_id: Id<LikeMarker>) -> Result<bool> {
        let result = query("DELETE FROM interactions.likes WHERE like_snowflake = $1")
            .bind(key(like_id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Likes the post if the user does not like it yet, unlikes it otherwise.
    pub async fn toggle_like(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<LikeToggle> {
        let mut tx = self.pool.begin().await?;

        // Holding the post row keeps it from being deleted under us.
        let post = query_scalar::<_, i64>(
            "SELECT post_snowflake FROM posts.posts WHERE post_snowflake = $1 FOR SHARE",
        )
        .bind(key(post_id))
        .fetch_optional(&mut *tx)
        .await?;

        if post.is_none() {
            return Err(DbError::PostNotFound(post_id));
        }

        let removed = query(
            "DELETE FROM interactions.likes WHERE user_snowflake = $1 AND post_snowflake = $2",
        )
        .bind(key(user_id))
        .bind(key(post_id))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let liked = if removed == 0 {
            let like_id = self.next_id::<LikeMarker>()?;

            query(
                "
                INSERT INTO interactions.likes (like_snowflake, user_snowflake, post_snowflake)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_snowflake, post_snowflake) DO NOTHING
                ",
            )
            .bind(key(like_id))
            .bind(key(user_id))
            .bind(key(post_id))
            .execute(&mut *tx)
            .await
            .map_err(|err| missing_reference(err, user_id, post_id))?;

            true
        } else {
            false
        };

        let like_count = count_likes(&mut *tx, post_id).await?;
        tx.commit().await?;

        Ok(LikeToggle { liked, like_count })
    }
}

async fn count_likes<'e>(
    executor: impl Executor<'e, Database = Postgres>,
    post_id: Id<PostMarker>,
) -> Result<u64> {
    let count = query_scalar::<_, i64>(
        "SELECT count(*) FROM interactions.likes WHERE post_snowflake = $1",
    )
    .bind(key(post_id))
    .fetch_one(executor)
    .await?;

    Ok(count.cast_unsigned())
}
