use super::{DBClient, ReactionExt};
use crate::dtos::{ThreadDto, ThreadRow};
use crate::models::{Thread, ThreadSort};
use chrono::Utc;

const THREAD_COLUMNS: &str = "id, user_id, title, content, score, comment_count, view_count, \
     is_pinned, is_locked, created_at, updated_at, edited_at";

/// Thread joined with author and the viewer's vote and reactions. The viewer
/// id is bound twice; a NULL viewer matches nothing.
const THREAD_VIEW_SELECT: &str = r#"
    SELECT t.id, t.user_id, t.title, t.content, t.score, t.comment_count, t.view_count,
           t.is_pinned, t.is_locked, t.created_at, t.updated_at, t.edited_at,
           u.name AS author_name, u.photo_url AS author_photo_url,
           (SELECT v.vote_type FROM votes v WHERE v.thread_id = t.id AND v.user_id = ?) AS user_vote,
           (SELECT group_concat(r.reaction_type) FROM reactions r
             WHERE r.thread_id = t.id AND r.user_id = ?) AS user_reactions
    FROM threads t
    INNER JOIN users u ON u.id = t.user_id
"#;

/// Thread database operations trait
pub trait ThreadExt {
    async fn create_thread(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Thread, sqlx::Error>;

    /// Bare thread row, for existence, ownership and lock checks
    async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>, sqlx::Error>;

    /// Thread as shown to `viewer` (anonymous when `None`)
    async fn get_thread_view(
        &self,
        thread_id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<ThreadDto>, sqlx::Error>;

    async fn get_threads(
        &self,
        sort: ThreadSort,
        page: i64,
        per_page: i64,
        viewer: Option<i64>,
    ) -> Result<Vec<ThreadDto>, sqlx::Error>;

    async fn get_thread_count(&self) -> Result<i64, sqlx::Error>;

    /// Owner-only update. `None` when no row matched both id and owner.
    async fn update_thread(
        &self,
        thread_id: i64,
        user_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Thread>, sqlx::Error>;

    async fn increment_view_count(&self, thread_id: i64) -> Result<(), sqlx::Error>;
}

impl ThreadExt for DBClient {
    async fn create_thread(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Thread, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as(&format!(
            "INSERT INTO threads (user_id, title, content, score, comment_count, view_count, is_pinned, is_locked, created_at, updated_at) \
             VALUES (?, ?, ?, 0, 0, 0, 0, 0, ?, ?) \
             RETURNING {THREAD_COLUMNS}"
        ))
        .bind(user_id)
        .bind(title)
        .bind(content)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?"))
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_thread_view(
        &self,
        thread_id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<ThreadDto>, sqlx::Error> {
        let row: Option<ThreadRow> = sqlx::query_as(&format!("{THREAD_VIEW_SELECT} WHERE t.id = ?"))
            .bind(viewer)
            .bind(viewer)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut counts = self.get_reaction_counts("thread_id", &[thread_id]).await?;
        let thread_counts = counts.remove(&thread_id).unwrap_or_default();
        Ok(Some(ThreadDto::from_row(row, thread_counts)))
    }

    async fn get_threads(
        &self,
        sort: ThreadSort,
        page: i64,
        per_page: i64,
        viewer: Option<i64>,
    ) -> Result<Vec<ThreadDto>, sqlx::Error> {
        let offset = (page - 1) * per_page;

        // ORDER BY comes from a fixed set of clauses, so it is formatted in.
        let query = format!(
            "{THREAD_VIEW_SELECT} ORDER BY {} LIMIT ? OFFSET ?",
            sort.order_by()
        );

        let rows: Vec<ThreadRow> = sqlx::query_as(&query)
            .bind(viewer)
            .bind(viewer)
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.thread.id).collect();
        let mut counts = self.get_reaction_counts("thread_id", &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let thread_counts = counts.remove(&row.thread.id).unwrap_or_default();
                ThreadDto::from_row(row, thread_counts)
            })
            .collect())
    }

    async fn get_thread_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM threads")
            .fetch_one(&self.pool)
            .await
    }

    async fn update_thread(
        &self,
        thread_id: i64,
        user_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Thread>, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as(&format!(
            "UPDATE threads SET title = ?, content = ?, updated_at = ?, edited_at = ? \
             WHERE id = ? AND user_id = ? \
             RETURNING {THREAD_COLUMNS}"
        ))
        .bind(title)
        .bind(content)
        .bind(now)
        .bind(now)
        .bind(thread_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn increment_view_count(&self, thread_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE threads SET view_count = view_count + 1 WHERE id = ?")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
