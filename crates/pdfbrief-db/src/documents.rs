//! Document and summary repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use pdfbrief_core::{
    Document, DocumentDetail, DocumentListItem, DocumentRepository, Error, Result, SummaryRecord,
    SummaryStatus,
};

/// PostgreSQL implementation of DocumentRepository.
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: Pool<Postgres>,
}

impl PgDocumentRepository {
    /// Create a new PgDocumentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

async fn insert_document<'e, E: PgExecutor<'e>>(executor: E, doc: &Document) -> Result<()> {
    sqlx::query(
        "INSERT INTO pdf_files (id, original_name, stored_path, size_bytes, mime_type, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(doc.id)
    .bind(&doc.original_name)
    .bind(&doc.stored_path)
    .bind(doc.size_bytes)
    .bind(&doc.mime_type)
    .bind(doc.created_at)
    .bind(doc.updated_at)
    .execute(executor)
    .await
    .map_err(Error::Database)?;
    Ok(())
}

async fn insert_summary<'e, E: PgExecutor<'e>>(executor: E, summary: &SummaryRecord) -> Result<()> {
    sqlx::query(
        "INSERT INTO pdf_summaries (id, pdf_id, summary_text, status, process_time_ms, error_message, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(summary.id)
    .bind(summary.pdf_id)
    .bind(&summary.summary_text)
    .bind(summary.status.as_str())
    .bind(summary.process_time_ms)
    .bind(&summary.error_message)
    .bind(summary.created_at)
    .bind(summary.updated_at)
    .execute(executor)
    .await
    .map_err(Error::Database)?;
    Ok(())
}

fn parse_status(raw: Option<String>) -> Result<Option<SummaryStatus>> {
    raw.map(|s| s.parse::<SummaryStatus>()).transpose()
}

fn detail_from_row(r: &PgRow) -> Result<DocumentDetail> {
    let document = Document {
        id: r.get("id"),
        original_name: r.get("original_name"),
        stored_path: r.get("stored_path"),
        size_bytes: r.get("size_bytes"),
        mime_type: r.get("mime_type"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    };

    let summary_id: Option<Uuid> = r.get("summary_id");
    let status = parse_status(r.get("status"))?;
    let summary = match (summary_id, status) {
        (Some(id), Some(status)) => Some(SummaryRecord {
            id,
            pdf_id: document.id,
            status,
            summary_text: r.get("summary_text"),
            process_time_ms: r.get("process_time_ms"),
            error_message: r.get("error_message"),
            created_at: r.get("summary_created_at"),
            updated_at: r.get("summary_updated_at"),
        }),
        _ => None,
    };

    Ok(DocumentDetail { document, summary })
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn create_document(&self, doc: &Document) -> Result<()> {
        insert_document(&self.pool, doc).await
    }

    async fn create_pending_summary(&self, summary: &SummaryRecord) -> Result<()> {
        insert_summary(&self.pool, summary).await
    }

    async fn create_document_with_summary(
        &self,
        doc: &Document,
        summary: &SummaryRecord,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        insert_document(&mut *tx, doc).await?;
        insert_summary(&mut *tx, summary).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "documents",
            op = "create",
            pdf_id = %doc.id,
            size_bytes = doc.size_bytes,
            "Inserted document with pending summary"
        );
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentListItem>> {
        let rows = sqlx::query(
            r#"
            SELECT f.id, f.original_name, f.size_bytes, f.created_at,
                   s.status, s.process_time_ms
            FROM pdf_files f
            LEFT JOIN pdf_summaries s ON s.pdf_id = f.id
            ORDER BY f.created_at DESC, f.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|r| {
                Ok(DocumentListItem {
                    id: r.get("id"),
                    original_name: r.get("original_name"),
                    size_bytes: r.get("size_bytes"),
                    created_at: r.get("created_at"),
                    status: parse_status(r.get("status"))?,
                    process_time_ms: r.get("process_time_ms"),
                })
            })
            .collect()
    }

    async fn get_document_with_summary(&self, id: Uuid) -> Result<Option<DocumentDetail>> {
        let row = sqlx::query(
            r#"
            SELECT f.id, f.original_name, f.stored_path, f.size_bytes, f.mime_type,
                   f.created_at, f.updated_at,
                   s.id AS summary_id, s.status, s.summary_text, s.process_time_ms,
                   s.error_message, s.created_at AS summary_created_at,
                   s.updated_at AS summary_updated_at
            FROM pdf_files f
            LEFT JOIN pdf_summaries s ON s.pdf_id = f.id
            WHERE f.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(detail_from_row).transpose()
    }

    async fn update_summary_success(
        &self,
        pdf_id: Uuid,
        summary_text: &str,
        process_time_ms: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE pdf_summaries
             SET status = 'success', summary_text = $2, process_time_ms = $3,
                 error_message = NULL, updated_at = NOW()
             WHERE pdf_id = $1",
        )
        .bind(pdf_id)
        .bind(summary_text)
        .bind(process_time_ms)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_summary_failed(&self, pdf_id: Uuid, error_message: &str) -> Result<bool> {
        // summary_text and process_time_ms from an earlier success stay as they are.
        let result = sqlx::query(
            "UPDATE pdf_summaries
             SET status = 'failed', error_message = $2, updated_at = NOW()
             WHERE pdf_id = $1",
        )
        .bind(pdf_id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_document(&self, id: Uuid) -> Result<Option<String>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // pdf_summaries rows go with it via ON DELETE CASCADE.
        let stored_path: Option<String> =
            sqlx::query_scalar("DELETE FROM pdf_files WHERE id = $1 RETURNING stored_path")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(stored_path)
    }
}
