use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{Document, Protocol, ProtocolStatus};
use crate::database::repositories::{
    DocumentRepository, NewProtocol, ProtocolRepository, UserRepository,
};

use super::ServiceError;

/// Protocol lifecycle: document-reference validation, permissive status
/// transitions, audit stamping.
#[derive(Clone)]
pub struct ProtocolService {
    protocols: Arc<dyn ProtocolRepository>,
    documents: Arc<dyn DocumentRepository>,
    users: Arc<dyn UserRepository>,
}

impl ProtocolService {
    pub fn new(
        protocols: Arc<dyn ProtocolRepository>,
        documents: Arc<dyn DocumentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { protocols, documents, users }
    }

    pub async fn get_by_public_id(&self, id: Uuid) -> Result<Protocol, ServiceError> {
        self.protocols
            .find_by_public_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Protocol not found".to_string()))
    }

    pub async fn create(
        &self,
        document_ids: &[Uuid],
        state: Option<ProtocolStatus>,
        acting_username: Option<&str>,
    ) -> Result<Protocol, ServiceError> {
        if document_ids.is_empty() {
            return Err(ServiceError::InvalidInput(
                "At least one document must be provided".to_string(),
            ));
        }

        let docs = self.resolve_documents(document_ids).await?;
        let creator = self.resolve_user(acting_username).await?;

        let public_id = Uuid::new_v4();
        let code = generate_code();
        let status = state.unwrap_or(ProtocolStatus::New);
        let now = Utc::now();

        let new = NewProtocol {
            public_id,
            code,
            status: status.as_str().to_string(),
            created_by: creator,
            updated_by: creator,
            created_at: now,
            updated_at: now,
        };
        let row_ids: Vec<i64> = docs.iter().map(|d| d.id).collect();

        let saved = self
            .protocols
            .insert(new, &row_ids)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))?;
        debug!(
            "Protocol created: id={}, public_id={}, code={}, docs={}",
            saved.id,
            saved.public_id,
            saved.code,
            row_ids.len()
        );
        Ok(saved)
    }

    pub async fn update_all(
        &self,
        id: Uuid,
        state: ProtocolStatus,
        document_ids: &[Uuid],
        acting_username: Option<&str>,
    ) -> Result<Protocol, ServiceError> {
        let mut protocol = self.get_by_public_id(id).await?;

        if document_ids.is_empty() {
            return Err(ServiceError::InvalidInput(
                "At least one document must be provided".to_string(),
            ));
        }

        let docs = self.resolve_documents(document_ids).await?;
        let updater = self.resolve_user(acting_username).await?;

        protocol.status = state.as_str().to_string();
        protocol.updated_by = updater;
        protocol.updated_at = Utc::now();
        let row_ids: Vec<i64> = docs.iter().map(|d| d.id).collect();

        self.protocols
            .update_with_documents(&protocol, &row_ids)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }

    pub async fn update_state(
        &self,
        id: Uuid,
        state: ProtocolStatus,
        acting_username: Option<&str>,
    ) -> Result<Protocol, ServiceError> {
        let mut protocol = self.get_by_public_id(id).await?;
        let updater = self.resolve_user(acting_username).await?;

        protocol.status = state.as_str().to_string();
        protocol.updated_by = updater;
        protocol.updated_at = Utc::now();

        self.protocols
            .update(&protocol)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }

    /// Resolve every referenced document, collecting all misses before failing.
    async fn resolve_documents(&self, document_ids: &[Uuid]) -> Result<Vec<Document>, ServiceError> {
        let mut docs: Vec<Document> = Vec::new();
        let mut missing: Vec<Uuid> = Vec::new();

        for doc_id in document_ids {
            match self.documents.find_by_public_id(*doc_id).await? {
                Some(doc) => {
                    if !docs.iter().any(|d| d.id == doc.id) {
                        docs.push(doc);
                    }
                }
                None => {
                    if !missing.contains(doc_id) {
                        missing.push(*doc_id);
                    }
                }
            }
        }

        if !missing.is_empty() {
            let listed = missing.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ");
            return Err(ServiceError::InvalidInput(format!("Unknown document IDs: [{}]", listed)));
        }

        Ok(docs)
    }

    async fn resolve_user(&self, username: Option<&str>) -> Result<Option<i64>, ServiceError> {
        match username {
            Some(username) => Ok(self.users.find_by_username(username).await?.map(|u| u.id)),
            None => Ok(None),
        }
    }
}

/// Human-readable protocol code: `PR-` plus 8 uppercase hex chars from a random
/// UUID. Collisions are statistically negligible and not retried.
fn generate_code() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("PR-{}", hex[..8].to_uppercase())
}
