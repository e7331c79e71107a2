use std::sync::Arc;

use crate::database::repositories::{PgDocumentRepository, PgProtocolRepository, PgUserRepository};
use crate::services::{AuthService, DocumentService, ProtocolService};
use crate::storage::S3Storage;

/// Shared handler state. Services hold trait objects, so nothing here touches
/// the database or the object store until a request does.
#[derive(Clone)]
pub struct AppState {
    pub documents: DocumentService,
    pub protocols: ProtocolService,
    pub auth: AuthService,
}

impl AppState {
    pub async fn initialize() -> Self {
        let storage = Arc::new(S3Storage::from_config().await);
        let documents = Arc::new(PgDocumentRepository::new());
        let protocols = Arc::new(PgProtocolRepository::new());
        let users = Arc::new(PgUserRepository::new());

        Self {
            documents: DocumentService::new(documents.clone(), users.clone(), storage),
            protocols: ProtocolService::new(protocols, documents, users.clone()),
            auth: AuthService::new(users),
        }
    }
}
