use crate::{
    client::{DbClient, Result, key, missing_reference},
    record::CommentRecord,
};
use chyrp_common::model::{
    Id,
    comment::{Comment, CommentMarker, CommentMessage, CreateComment},
    post::PostMarker,
};
use sqlx::{query, query_as};

impl DbClient {
    /// Comments on a post, oldest first.
    pub async fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.message,
                comments.sent_at,
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic
            FROM
                interactions.comments
                JOIN users.users ON users.user_snowflake = comments.user_snowflake
            WHERE
                comments.post_snowflake = $1
            ORDER BY
                comments.sent_at,
                comments.comment_snowflake
            ",
        )
        .bind(key(post_id))
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;

        Ok(comments)
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.message,
                comments.sent_at,
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic
            FROM
                interactions.comments
                JOIN users.users ON users.user_snowflake = comments.user_snowflake
            WHERE
                comments.comment_snowflake = $1
            ",
        )
        .bind(key(comment_id))
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    /// Fails with [`DbError::PostNotFound`](crate::DbError::PostNotFound) if the post does not exist and with
    /// [`DbError::UserNotFound`](crate::DbError::UserNotFound) if the author does not.
    pub async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let comment_id = self.next_id::<CommentMarker>()?;

        let record = query_as::<_, CommentRecord>(
            "
            WITH inserted AS (
                INSERT INTO interactions.comments (comment_snowflake, user_snowflake, post_snowflake, message)
                VALUES ($1, $2, $3, $4)
                RETURNING comment_snowflake, user_snowflake, post_snowflake, message, sent_at
            )
            SELECT
                inserted.comment_snowflake,
                inserted.post_snowflake,
                inserted.message,
                inserted.sent_at,
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic
            FROM
                inserted
                JOIN users.users ON users.user_snowflake = inserted.user_snowflake
            ",
        )
        .bind(key(comment_id))
        .bind(key(comment.author))
        .bind(key(comment.post))
        .bind(comment.message.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| missing_reference(err, comment.author, comment.post))?;

        Ok(record.try_into()?)
    }

    /// Replaces the message. `sent_at` stays as it was.
    pub async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        message: &CommentMessage,
    ) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(
            "
            WITH updated AS (
                UPDATE interactions.comments
                SET message = $2
                WHERE comment_snowflake = $1
                RETURNING comment_snowflake, user_snowflake, post_snowflake, message, sent_at
            )
            SELECT
                updated.comment_snowflake,
                updated.post_snowflake,
                updated.message,
                updated.sent_at,
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic
            FROM
                updated
                JOIN users.users ON users.user_snowflake = updated.user_snowflake
            ",
        )
        .bind(key(comment_id))
        .bind(message.get())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    /// Returns whether a comment was deleted.
    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let result = query("DELETE FROM interactions.comments WHERE comment_snowflake = $1")
            .bind(key(comment_id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
