use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::{DatabaseManager, DatabaseError};
use crate::database::models::Document;

/// Fields for a document row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub public_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub uploaded_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Document>, DatabaseError>;

    async fn insert(&self, new: NewDocument) -> Result<Document, DatabaseError>;

    /// Persist filename, content type, size, and updated-at of an existing row.
    async fn update(&self, doc: &Document) -> Result<Document, DatabaseError>;

    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;

    /// Existence check across the protocol join relation.
    async fn is_referenced(&self, document_id: i64) -> Result<bool, DatabaseError>;
}

const SELECT_DOCUMENT: &str = r#"
    SELECT d.id, d.public_id, d.filename, d.content_type, d.size_bytes, d.storage_path,
           d.uploaded_by, u.username AS uploaded_by_username, d.created_at, d.updated_at
    FROM document d
    LEFT JOIN app_user u ON u.id = d.uploaded_by
"#;

pub struct PgDocumentRepository;

impl PgDocumentRepository {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Document, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let sql = format!("{} WHERE d.id = $1", SELECT_DOCUMENT);
        let doc = sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_one(&pool)
            .await?;
        Ok(doc)
    }
}

impl Default for PgDocumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let sql = format!("{} WHERE d.public_id = $1", SELECT_DOCUMENT);
        let doc = sqlx::query_as::<_, Document>(&sql)
            .bind(public_id)
            .fetch_optional(&pool)
            .await?;
        Ok(doc)
    }

    async fn insert(&self, new: NewDocument) -> Result<Document, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO document
                (public_id, filename, content_type, size_bytes, storage_path, uploaded_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(new.public_id)
        .bind(&new.filename)
        .bind(&new.content_type)
        .bind(new.size_bytes)
        .bind(&new.storage_path)
        .bind(new.uploaded_by)
        .bind(new.created_at)
        .bind(new.updated_at)
        .fetch_one(&pool)
        .await?;

        self.fetch_by_id(id).await
    }

    async fn update(&self, doc: &Document) -> Result<Document, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        sqlx::query(
            r#"
            UPDATE document
            SET filename = $1, content_type = $2, size_bytes = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(&doc.filename)
        .bind(&doc.content_type)
        .bind(doc.size_bytes)
        .bind(doc.updated_at)
        .bind(doc.id)
        .execute(&pool)
        .await?;

        self.fetch_by_id(doc.id).await
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        sqlx::query("DELETE FROM document WHERE id = $1")
            .bind(id)
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn is_referenced(&self, document_id: i64) -> Result<bool, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM protocol_document WHERE document_id = $1")
                .bind(document_id)
                .fetch_one(&pool)
                .await?;
        Ok(count.0 > 0)
    }
}
