use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::{DatabaseManager, DatabaseError};
use crate::database::models::{Document, Protocol};

/// Fields for a protocol row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewProtocol {
    pub public_id: Uuid,
    pub code: String,
    pub status: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProtocolRepository: Send + Sync {
    /// Eager-loads the attached document set.
    async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Protocol>, DatabaseError>;

    async fn insert(&self, new: NewProtocol, document_ids: &[i64]) -> Result<Protocol, DatabaseError>;

    /// Persist status, updater, and updated-at; the document set is untouched.
    async fn update(&self, protocol: &Protocol) -> Result<Protocol, DatabaseError>;

    /// Same as `update` but also replaces the whole document set (clear then add).
    async fn update_with_documents(
        &self,
        protocol: &Protocol,
        document_ids: &[i64],
    ) -> Result<Protocol, DatabaseError>;
}

pub struct PgProtocolRepository;

impl PgProtocolRepository {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_documents(&self, protocol_id: i64) -> Result<Vec<Document>, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let docs = sqlx::query_as::<_, Document>(
            r#"
            SELECT d.id, d.public_id, d.filename, d.content_type, d.size_bytes, d.storage_path,
                   d.uploaded_by, u.username AS uploaded_by_username, d.created_at, d.updated_at
            FROM document d
            JOIN protocol_document pd ON pd.document_id = d.id
            LEFT JOIN app_user u ON u.id = d.uploaded_by
            WHERE pd.protocol_id = $1
            ORDER BY d.id
            "#,
        )
        .bind(protocol_id)
        .fetch_all(&pool)
        .await?;
        Ok(docs)
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Protocol, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let mut protocol = sqlx::query_as::<_, Protocol>("SELECT * FROM protocol WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await?;
        protocol.documents = self.fetch_documents(id).await?;
        Ok(protocol)
    }
}

impl Default for PgProtocolRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolRepository for PgProtocolRepository {
    async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Protocol>, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let protocol = sqlx::query_as::<_, Protocol>("SELECT * FROM protocol WHERE public_id = $1")
            .bind(public_id)
            .fetch_optional(&pool)
            .await?;

        match protocol {
            Some(mut p) => {
                p.documents = self.fetch_documents(p.id).await?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, new: NewProtocol, document_ids: &[i64]) -> Result<Protocol, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let mut tx = pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO protocol
                (public_id, code, status, created_by, updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(new.public_id)
        .bind(&new.code)
        .bind(&new.status)
        .bind(new.created_by)
        .bind(new.updated_by)
        .bind(new.created_at)
        .bind(new.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        for doc_id in document_ids {
            sqlx::query("INSERT INTO protocol_document (protocol_id, document_id) VALUES ($1, $2)")
                .bind(id)
                .bind(doc_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.fetch_by_id(id).await
    }

    async fn update(&self, protocol: &Protocol) -> Result<Protocol, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        sqlx::query("UPDATE protocol SET status = $1, updated_by = $2, updated_at = $3 WHERE id = $4")
            .bind(&protocol.status)
            .bind(protocol.updated_by)
            .bind(protocol.updated_at)
            .bind(protocol.id)
            .execute(&pool)
            .await?;

        self.fetch_by_id(protocol.id).await
    }

    async fn update_with_documents(
        &self,
        protocol: &Protocol,
        document_ids: &[i64],
    ) -> Result<Protocol, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE protocol SET status = $1, updated_by = $2, updated_at = $3 WHERE id = $4")
            .bind(&protocol.status)
            .bind(protocol.updated_by)
            .bind(protocol.updated_at)
            .bind(protocol.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM protocol_document WHERE protocol_id = $1")
            .bind(protocol.id)
            .execute(&mut *tx)
            .await?;

        for doc_id in document_ids {
            sqlx::query("INSERT INTO protocol_document (protocol_id, document_id) VALUES ($1, $2)")
                .bind(protocol.id)
                .bind(doc_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.fetch_by_id(protocol.id).await
    }
}
