use crate::{
    client::{DbClient, DbError, Result, id_from_key, key},
    record::{FullPostRecord, PostFileRecord, PostSummaryRecord},
};
use chyrp_common::model::{
    Id,
    hashtag::{HashtagMarker, HashtagName},
    media::{MAX_POST_FILES, MediaPath},
    post::{CreatePost, DeletedPost, PostDetail, PostFile, PostFileMarker, PostMarker, PostSummary, PostUpdate},
    user::UserMarker,
};
use sqlx::{Postgres, Transaction, query, query_as, query_scalar};
use tracing::debug;

impl DbClient {
    /// Writes the post together with its hashtag links and files in one transaction.
    ///
    /// Fails with [`DbError::AttachmentLimit`] if more than [`MAX_POST_FILES`] files are given.
    /// An unknown category is ignored.
    pub async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let post_id = self.next_id::<PostMarker>()?;
        let mut tx = self.pool.begin().await?;

        query(
            "
            INSERT INTO posts.posts (
                post_snowflake,
                user_snowflake,
                title,
                content,
                image,
                video,
                category_snowflake,
                is_draft,
                created_at,
                modified_at
            )
            VALUES (
                $1,
                $2,
                $3,
                $4,
                $5,
                $6,
                (SELECT category_snowflake FROM posts.categories WHERE category_snowflake = $7),
                $8,
                $9,
                $9
            )
            ",
        )
        .bind(key(post_id))
        .bind(key(post.author))
        .bind(post.content.title())
        .bind(post.content.content())
        .bind(post.image.as_ref().map(MediaPath::get))
        .bind(post.video.as_ref().map(MediaPath::get))
        .bind(post.category.map(key))
        .bind(post.is_draft)
        .bind(post.created_at)
        .execute(&mut *tx)
        .await?;

        for hashtag in &post.hashtags {
            let hashtag_key = self.find_or_insert_hashtag_in(&mut tx, hashtag).await?;

            query(
                "
                INSERT INTO posts.post_hashtags (post_snowflake, hashtag_snowflake)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(key(post_id))
            .bind(hashtag_key)
            .execute(&mut *tx)
            .await?;
        }

        for file in &post.files {
            self.insert_post_file_in(&mut tx, post_id, file).await?;
        }

        tx.commit().await?;
        debug!(%post_id, "Created post");

        Ok(post_id)
    }

    /// `viewer` decides `liked_by_viewer`; anonymous viewers never like anything.
    pub async fn fetch_post(
        &self,
        post_id: Id<PostMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Option<PostDetail>> {
        let Some(record) = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.title,
                posts.content,
                posts.image,
                posts.video,
                posts.is_draft,
                posts.created_at,
                posts.modified_at,
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic,
                categories.category_snowflake,
                categories.name AS category_name,
                (
                    SELECT count(*)
                    FROM interactions.likes
                    WHERE likes.post_snowflake = posts.post_snowflake
                ) AS like_count,
                EXISTS (
                    SELECT 1
                    FROM interactions.likes
                    WHERE likes.post_snowflake = posts.post_snowflake
                        AND likes.user_snowflake = $2
                ) AS liked_by_viewer
            FROM
                posts.posts
                JOIN users.users ON users.user_snowflake = posts.user_snowflake
                LEFT JOIN posts.categories ON categories.category_snowflake = posts.category_snowflake
            WHERE
                posts.post_snowflake = $1
            ",
        )
        .bind(key(post_id))
        .bind(viewer.map(key))
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let hashtags = query_scalar::<_, String>(
            "
            SELECT hashtags.name
            FROM
                posts.post_hashtags
                JOIN posts.hashtags ON hashtags.hashtag_snowflake = post_hashtags.hashtag_snowflake
            WHERE post_hashtags.post_snowflake = $1
            ORDER BY hashtags.name
            ",
        )
        .bind(key(post_id))
        .fetch_all(&self.pool)
        .await?;

        let files = query_as::<_, PostFileRecord>(
            "
            SELECT post_files.post_file_snowflake, post_files.file
            FROM posts.post_files
            WHERE post_files.post_snowflake = $1
            ORDER BY post_files.post_file_snowflake
            ",
        )
        .bind(key(post_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(record.into_detail(hashtags, files)?))
    }

    /// All posts, newest first.
    pub async fn fetch_posts(&self) -> Result<Vec<PostSummary>> {
        let records = query_as::<_, PostSummaryRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.title,
                posts.content,
                posts.image,
                posts.is_draft,
                posts.created_at,
                users.user_snowflake,
                users.username,
                users.display_name,
                users.profile_pic,
                categories.name AS category_name
            FROM
                posts.posts
                JOIN users.users ON users.user_snowflake = posts.user_snowflake
                LEFT JOIN posts.categories ON categories.category_snowflake = posts.category_snowflake
            ORDER BY
                posts.created_at DESC,
                posts.post_snowflake DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(PostSummary::try_from)
            .collect::<Result<_, _>>()?;

        Ok(posts)
    }

    pub async fn fetch_post_owner(&self, post_id: Id<PostMarker>) -> Result<Option<Id<UserMarker>>> {
        let owner = query_scalar::<_, i64>(
            "SELECT posts.user_snowflake FROM posts.posts WHERE posts.post_snowflake = $1",
        )
        .bind(key(post_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner.map(id_from_key))
    }

    /// Returns `false` if the post does not exist.
    pub async fn update_post(&self, post_id: Id<PostMarker>, update: &PostUpdate) -> Result<bool> {
        let result = query(
            "
            UPDATE posts.posts
            SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                category_snowflake = CASE
                    WHEN $4::BOOLEAN THEN (
                        SELECT category_snowflake FROM posts.categories WHERE category_snowflake = $5
                    )
                    ELSE category_snowflake
                END,
                is_draft = COALESCE($6, is_draft)
            WHERE post_snowflake = $1
            ",
        )
        .bind(key(post_id))
        .bind(update.content.as_ref().map(|content| content.title()))
        .bind(update.content.as_ref().map(|content| content.content()))
        .bind(update.category.is_some())
        .bind(update.category.flatten().map(key))
        .bind(update.is_draft)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the post and everything hanging off it, returning the media it referenced.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<Option<DeletedPost>> {
        let mut tx = self.pool.begin().await?;

        let files = query_scalar::<_, String>(
            "SELECT post_files.file FROM posts.post_files WHERE post_files.post_snowflake = $1",
        )
        .bind(key(post_id))
        .fetch_all(&mut *tx)
        .await?;

        let Some((image, video)) = query_as::<_, (Option<String>, Option<String>)>(
            "DELETE FROM posts.posts WHERE post_snowflake = $1 RETURNING image, video",
        )
        .bind(key(post_id))
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        tx.commit().await?;

        let media = image
            .into_iter()
            .chain(video)
            .chain(files)
            .map(MediaPath::from_stored)
            .collect();

        Ok(Some(DeletedPost { media }))
    }

    async fn find_or_insert_hashtag_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &HashtagName,
    ) -> Result<i64> {
        let hashtag_id = self.next_id::<HashtagMarker>()?;

        // The no-op update makes RETURNING yield the existing row on conflict.
        let hashtag_key = query_scalar::<_, i64>(
            "
            INSERT INTO posts.hashtags (hashtag_snowflake, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING hashtag_snowflake
            ",
        )
        .bind(key(hashtag_id))
        .bind(name.get())
        .fetch_one(&mut **tx)
        .await?;

        Ok(hashtag_key)
    }

    async fn insert_post_file_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        post_id: Id<PostMarker>,
        file: &MediaPath,
    ) -> Result<PostFile> {
        // Concurrent attachers serialize on the post row, so the count below stays accurate.
        let locked = query_scalar::<_, i64>(
            "SELECT post_snowflake FROM posts.posts WHERE post_snowflake = $1 FOR UPDATE",
        )
        .bind(key(post_id))
        .fetch_optional(&mut **tx)
        .await?;

        if locked.is_none() {
            return Err(DbError::PostNotFound(post_id));
        }

        let attached = query_scalar::<_, i64>(
            "SELECT count(*) FROM posts.post_files WHERE post_snowflake = $1",
        )
        .bind(key(post_id))
        .fetch_one(&mut **tx)
        .await?;

        if usize::try_from(attached).is_ok_and(|attached| attached >= MAX_POST_FILES) {
            return Err(DbError::AttachmentLimit(post_id));
        }

        let post_file_id = self.next_id::<PostFileMarker>()?;

        let record = query_as::<_, PostFileRecord>(
            "
            INSERT INTO posts.post_files (post_file_snowflake, post_snowflake, file)
            VALUES ($1, $2, $3)
            RETURNING post_file_snowflake, file
            ",
        )
        .bind(key(post_file_id))
        .bind(key(post_id))
        .bind(file.get())
        .fetch_one(&mut **tx)
        .await?;

        Ok(record.into())
    }
}
