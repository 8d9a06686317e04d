use super::{DBClient, ReactionExt};
use crate::dtos::{CommentDto, CommentRow};
use crate::models::Comment;
use chrono::Utc;

const COMMENT_COLUMNS: &str = "id, thread_id, user_id, parent_id, content, score, depth, \
     is_deleted, created_at, updated_at, edited_at";

/// Comment database operations trait
pub trait CommentExt {
    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>, sqlx::Error>;

    /// Non-deleted comments of a thread, oldest first, as seen by `viewer`
    async fn get_comments(
        &self,
        thread_id: i64,
        viewer: Option<i64>,
    ) -> Result<Vec<CommentDto>, sqlx::Error>;

    /// Inserts the comment and bumps the thread's comment count together.
    async fn create_comment(
        &self,
        thread_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        depth: i64,
        content: &str,
    ) -> Result<Comment, sqlx::Error>;

    /// Owner-only update. `None` when no live comment matched id and owner.
    async fn update_comment(
        &self,
        comment_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Option<Comment>, sqlx::Error>;

    /// Owner-only soft delete. Returns whether a row was deleted.
    async fn delete_comment(&self, comment_id: i64, user_id: i64) -> Result<bool, sqlx::Error>;
}

impl CommentExt for DBClient {
    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?"))
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_comments(
        &self,
        thread_id: i64,
        viewer: Option<i64>,
    ) -> Result<Vec<CommentDto>, sqlx::Error> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.thread_id, c.user_id, c.parent_id, c.content, c.score, c.depth,
                   c.is_deleted, c.created_at, c.updated_at, c.edited_at,
                   u.name AS author_name, u.photo_url AS author_photo_url,
                   (SELECT v.vote_type FROM votes v WHERE v.comment_id = c.id AND v.user_id = ?) AS user_vote,
                   (SELECT group_concat(r.reaction_type) FROM reactions r
                     WHERE r.comment_id = c.id AND r.user_id = ?) AS user_reactions
            FROM comments c
            INNER JOIN users u ON u.id = c.user_id
            WHERE c.thread_id = ? AND c.is_deleted = 0
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(viewer)
        .bind(viewer)
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.comment.id).collect();
        let mut counts = self.get_reaction_counts("comment_id", &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let comment_counts = counts.remove(&row.comment.id).unwrap_or_default();
                CommentDto::from_row(row, comment_counts)
            })
            .collect())
    }

    async fn create_comment(
        &self,
        thread_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        depth: i64,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let comment = sqlx::query_as(&format!(
            "INSERT INTO comments (thread_id, user_id, parent_id, content, score, depth, is_deleted, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 0, ?, 0, ?, ?) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(thread_id)
        .bind(user_id)
        .bind(parent_id)
        .bind(content)
        .bind(depth)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE threads SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(thread_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(comment)
    }

    async fn update_comment(
        &self,
        comment_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as(&format!(
            "UPDATE comments SET content = ?, updated_at = ?, edited_at = ? \
             WHERE id = ? AND user_id = ? AND is_deleted = 0 \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(content)
        .bind(now)
        .bind(now)
        .bind(comment_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_comment(&self, comment_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let thread_id: Option<i64> = sqlx::query_scalar(
            "UPDATE comments SET is_deleted = 1, updated_at = ? \
             WHERE id = ? AND user_id = ? AND is_deleted = 0 \
             RETURNING thread_id",
        )
        .bind(Utc::now())
        .bind(comment_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(thread_id) = thread_id else {
            return Ok(false);
        };

        sqlx::query(
            "UPDATE threads SET comment_count = MAX(comment_count - 1, 0) WHERE id = ?",
        )
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
