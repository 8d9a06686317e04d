use super::DBClient;
use crate::models::{Chapter, ChapterSummary};

const CHAPTER_COLUMNS: &str = r#"id, number, title, slug, description, content, icon, pages, read_time, featured, "order", created_at, updated_at"#;

pub trait ChapterExt {
    /// All chapters without their content, in display order
    async fn get_chapters(&self) -> Result<Vec<ChapterSummary>, sqlx::Error>;

    async fn get_chapter_by_id(&self, id: i64) -> Result<Option<Chapter>, sqlx::Error>;

    async fn get_chapter_by_slug(&self, slug: &str) -> Result<Option<Chapter>, sqlx::Error>;
}

impl ChapterExt for DBClient {
    async fn get_chapters(&self) -> Result<Vec<ChapterSummary>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, number, title, slug, description, icon, pages, read_time, featured
            FROM chapters
            ORDER BY "order" ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_chapter_by_id(&self, id: i64) -> Result<Option<Chapter>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_chapter_by_slug(&self, slug: &str) -> Result<Option<Chapter>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {CHAPTER_COLUMNS} FROM chapters WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }
}
