use super::DBClient;
use crate::models::{PdfResource, Resource};

pub trait ResourceExt {
    async fn get_resources(&self) -> Result<Vec<Resource>, sqlx::Error>;

    /// PDF resources only, ordered by their number
    async fn get_pdf_resources(&self) -> Result<Vec<PdfResource>, sqlx::Error>;

    async fn get_resource(&self, id: i64) -> Result<Option<Resource>, sqlx::Error>;
}

impl ResourceExt for DBClient {
    async fn get_resources(&self) -> Result<Vec<Resource>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, type, title, description, file_url, file_size, pages, duration, icon, "order", created_at, updated_at
            FROM resources
            ORDER BY "order" ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_pdf_resources(&self) -> Result<Vec<PdfResource>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, number, title, description, file_url, file_size, pages, icon, summary
            FROM resources
            WHERE type = 'pdf'
            ORDER BY number ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_resource(&self, id: i64) -> Result<Option<Resource>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, type, title, description, file_url, file_size, pages, duration, icon, "order", created_at, updated_at
            FROM resources
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
