use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::database::models::Document;
use crate::database::repositories::{DocumentRepository, NewDocument, UserRepository};
use crate::storage::{build_object_key, ObjectStorage};

use super::ServiceError;

/// Orchestrates the two-store write path for documents: blob first, row second,
/// with best-effort compensation when the second step fails.
#[derive(Clone)]
pub struct DocumentService {
    documents: Arc<dyn DocumentRepository>,
    users: Arc<dyn UserRepository>,
    storage: Arc<dyn ObjectStorage>,
}

impl DocumentService {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        users: Arc<dyn UserRepository>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self { documents, users, storage }
    }

    pub async fn get_by_public_id(&self, id: Uuid) -> Result<Document, ServiceError> {
        self.documents
            .find_by_public_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Document not found".to_string()))
    }

    pub async fn create(
        &self,
        content: &[u8],
        name: &str,
        extension: &str,
        acting_username: Option<&str>,
    ) -> Result<Document, ServiceError> {
        if content.is_empty() {
            return Err(ServiceError::InvalidInput(
                "File must be provided and non-empty".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("Name must be provided".to_string()));
        }
        if extension.trim().is_empty() {
            return Err(ServiceError::InvalidInput("Type must be provided".to_string()));
        }

        debug!("Creating document: name='{}', type='{}', username={:?}", name, extension, acting_username);

        // Absent or unresolvable username means an anonymous upload, not an error.
        let uploaded_by = match acting_username {
            Some(username) => self.users.find_by_username(username).await?,
            None => None,
        };
        trace!(
            "Uploader resolved: {}",
            uploaded_by.as_ref().map(|u| u.username.as_str()).unwrap_or("anonymous")
        );

        let public_id = Uuid::new_v4();
        let object_key = build_object_key(&public_id.to_string(), extension);
        trace!("Generated identifiers: public_id={}, object_key='{}'", public_id, object_key);

        // Blob first. On failure nothing was persisted, so there is nothing to undo.
        self.storage.put(&object_key, content, extension).await?;
        debug!("Upload finished: key='{}'", object_key);

        let now = Utc::now();
        let new = NewDocument {
            public_id,
            filename: name.to_string(),
            content_type: extension.to_string(),
            size_bytes: content.len() as i64,
            storage_path: object_key.clone(),
            uploaded_by: uploaded_by.as_ref().map(|u| u.id),
            created_at: now,
            updated_at: now,
        };

        match self.documents.insert(new).await {
            Ok(saved) => {
                debug!("Document persisted: id={}, public_id={}", saved.id, saved.public_id);
                Ok(saved)
            }
            Err(db_err) => {
                // Compensating delete of the just-written blob. Attempted once;
                // its own failure is logged and the caller sees the original error.
                error!(
                    "DB persist failed for public_id={}, attempting storage cleanup for key='{}': {}",
                    public_id, object_key, db_err
                );
                if let Err(cleanup_err) = self.storage.delete(&object_key).await {
                    error!("Storage cleanup failed: key='{}': {}", object_key, cleanup_err);
                } else {
                    debug!("Storage cleanup successful: key='{}'", object_key);
                }
                Err(ServiceError::Persistence(db_err.to_string()))
            }
        }
    }

    pub async fn update_metadata(
        &self,
        id: Uuid,
        name: Option<&str>,
        extension: Option<&str>,
    ) -> Result<Document, ServiceError> {
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        let extension = extension.map(str::trim).filter(|s| !s.is_empty());

        if name.is_none() && extension.is_none() {
            return Err(ServiceError::InvalidInput("No fields to update".to_string()));
        }

        let mut doc = self.get_by_public_id(id).await?;
        debug!("Updating document metadata: public_id={}", id);

        if let Some(name) = name {
            doc.filename = name.to_string();
        }
        if let Some(extension) = extension {
            doc.content_type = extension.to_string();
        }
        doc.updated_at = Utc::now();

        self.documents
            .update(&doc)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }

    pub async fn replace_content(&self, id: Uuid, content: &[u8]) -> Result<Document, ServiceError> {
        if content.is_empty() {
            return Err(ServiceError::InvalidInput(
                "File must be provided and non-empty".to_string(),
            ));
        }

        let mut doc = self.get_by_public_id(id).await?;
        debug!(
            "Replacing document content: public_id={}, key='{}', new_size={}",
            id,
            doc.storage_path,
            content.len()
        );

        // Overwrite in place; the key is reused, no new key is minted. A failed
        // write leaves the row untouched.
        self.storage
            .put(&doc.storage_path, content, &doc.content_type)
            .await?;

        doc.size_bytes = content.len() as i64;
        doc.updated_at = Utc::now();

        // The old content is already overwritten; a row-save failure here is the
        // accepted inconsistency window, surfaced without a storage rollback.
        self.documents
            .update(&doc)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let doc = self.get_by_public_id(id).await?;

        if self.documents.is_referenced(doc.id).await? {
            return Err(ServiceError::Conflict(
                "Document is referenced by a protocol".to_string(),
            ));
        }

        debug!("Deleting document: public_id={}, key='{}'", id, doc.storage_path);

        // Blob first; the row stays while its content still exists under it.
        self.storage.delete(&doc.storage_path).await?;

        self.documents
            .delete(doc.id)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Effect, MemoryDocuments, MemoryStorage, MemoryUsers, new_journal};

    fn service(
        documents: Arc<MemoryDocuments>,
        users: Arc<MemoryUsers>,
        storage: Arc<MemoryStorage>,
    ) -> DocumentService {
        DocumentService::new(documents, users, storage)
    }

    #[tokio::test]
    async fn create_persists_blob_then_row() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::with_user(42, "john"));
        let storage = Arc::new(MemoryStorage::new(journal.clone()));

        let svc = service(documents.clone(), users, storage.clone());
        let saved = svc.create(b"dummy", "invoice", "pdf", Some("john")).await.unwrap();

        assert_eq!(saved.filename, "invoice");
        assert_eq!(saved.content_type, "pdf");
        assert_eq!(saved.size_bytes, 5);
        assert_eq!(saved.uploaded_by, Some(42));
        assert!(saved.storage_path.starts_with("documents/"));
        assert!(saved.storage_path.ends_with(".pdf"));

        // Ordering invariant: storage write strictly before the database insert.
        let effects = journal.lock().unwrap().clone();
        let put_pos = effects.iter().position(|e| matches!(e, Effect::StoragePut(_))).unwrap();
        let insert_pos = effects.iter().position(|e| matches!(e, Effect::DocumentInsert(_))).unwrap();
        assert!(put_pos < insert_pos);

        // Round trip through the repository.
        let found = svc.get_by_public_id(saved.public_id).await.unwrap();
        assert_eq!(found.filename, "invoice");
        assert_eq!(found.size_bytes, 5);
    }

    #[tokio::test]
    async fn create_with_unresolvable_username_is_anonymous() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal));

        let svc = service(documents, users, storage);
        let saved = svc.create(b"x", "n", "pdf", Some("ghost")).await.unwrap();
        assert_eq!(saved.uploaded_by, None);
    }

    #[tokio::test]
    async fn create_rejects_empty_inputs_before_any_effect() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal.clone()));
        let svc = service(documents, users, storage);

        for (content, name, ext) in [
            (&b""[..], "n", "pdf"),
            (&b"x"[..], "  ", "pdf"),
            (&b"x"[..], "n", ""),
        ] {
            let err = svc.create(content, name, ext, None).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
        assert!(journal.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_storage_failure_leaves_no_row() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal.clone()).failing_put());

        let svc = service(documents.clone(), users, storage);
        let err = svc.create(b"x", "n", "pdf", None).await.unwrap_err();

        assert!(matches!(err, ServiceError::StorageUnavailable(_)));
        assert_eq!(documents.row_count(), 0);
        assert!(!journal.lock().unwrap().iter().any(|e| matches!(e, Effect::DocumentInsert(_))));
    }

    #[tokio::test]
    async fn create_db_failure_compensates_with_blob_delete() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()).failing_insert());
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal.clone()));

        let svc = service(documents, users, storage.clone());
        let err = svc.create(b"x", "n", "pdf", None).await.unwrap_err();

        assert!(matches!(err, ServiceError::Persistence(_)));
        // The just-written blob was deleted again.
        assert_eq!(storage.object_count(), 0);
        let effects = journal.lock().unwrap().clone();
        assert!(effects.iter().any(|e| matches!(e, Effect::StorageDelete(_))));
    }

    #[tokio::test]
    async fn create_db_failure_with_failing_cleanup_still_reports_persistence() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()).failing_insert());
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal).failing_delete());

        let svc = service(documents, users, storage);
        // Cleanup failure is swallowed; the caller sees the original DB failure.
        let err = svc.create(b"x", "n", "pdf", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Persistence(_)));
    }

    #[tokio::test]
    async fn update_metadata_requires_at_least_one_field() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal));
        let svc = service(documents, users, storage);

        let saved = svc.create(b"x", "old", "pdf", None).await.unwrap();
        let err = svc.update_metadata(saved.public_id, None, Some("  ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_metadata_applies_only_provided_fields() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal));
        let svc = service(documents, users, storage);

        let saved = svc.create(b"x", "old", "pdf", None).await.unwrap();
        let updated = svc.update_metadata(saved.public_id, Some("new-name"), None).await.unwrap();

        assert_eq!(updated.filename, "new-name");
        assert_eq!(updated.content_type, "pdf");
        assert!(updated.updated_at >= saved.updated_at);
    }

    #[tokio::test]
    async fn update_metadata_unknown_document_is_not_found() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal));
        let svc = service(documents, users, storage);

        let err = svc.update_metadata(Uuid::new_v4(), Some("n"), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn replace_content_overwrites_same_key_and_updates_size() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal));
        let svc = service(documents, users, storage.clone());

        let saved = svc.create(b"short", "n", "pdf", None).await.unwrap();
        let replaced = svc.replace_content(saved.public_id, b"much longer body").await.unwrap();

        assert_eq!(replaced.storage_path, saved.storage_path);
        assert_eq!(replaced.size_bytes, 16);
        assert_eq!(storage.object_count(), 1);
    }

    #[tokio::test]
    async fn replace_content_storage_failure_leaves_row_untouched() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal.clone()));
        let svc = service(documents.clone(), users.clone(), storage);

        let saved = svc.create(b"short", "n", "pdf", None).await.unwrap();

        let failing = Arc::new(MemoryStorage::new(new_journal()).failing_put());
        let svc = service(documents, users, failing);
        let err = svc.replace_content(saved.public_id, b"xx").await.unwrap_err();

        assert!(matches!(err, ServiceError::StorageUnavailable(_)));
        let current = svc.get_by_public_id(saved.public_id).await.unwrap();
        assert_eq!(current.size_bytes, 5);
    }

    #[tokio::test]
    async fn delete_referenced_document_conflicts_without_side_effects() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal.clone()));
        let svc = service(documents.clone(), users, storage.clone());

        let saved = svc.create(b"x", "n", "pdf", None).await.unwrap();
        documents.mark_referenced(saved.id);

        let before = journal.lock().unwrap().len();
        let err = svc.delete(saved.public_id).await.unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        // Neither a blob delete nor a row delete happened.
        assert_eq!(journal.lock().unwrap().len(), before);
        assert_eq!(storage.object_count(), 1);
        assert_eq!(documents.row_count(), 1);
    }

    #[tokio::test]
    async fn delete_removes_blob_before_row() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal.clone()));
        let svc = service(documents.clone(), users, storage);

        let saved = svc.create(b"x", "n", "pdf", None).await.unwrap();
        svc.delete(saved.public_id).await.unwrap();

        let effects = journal.lock().unwrap().clone();
        let blob_pos = effects.iter().position(|e| matches!(e, Effect::StorageDelete(_))).unwrap();
        let row_pos = effects.iter().position(|e| matches!(e, Effect::DocumentDelete(_))).unwrap();
        assert!(blob_pos < row_pos);
        assert_eq!(documents.row_count(), 0);
    }

    #[tokio::test]
    async fn delete_keeps_row_when_blob_delete_fails() {
        let journal = new_journal();
        let documents = Arc::new(MemoryDocuments::new(journal.clone()));
        let users = Arc::new(MemoryUsers::empty());
        let storage = Arc::new(MemoryStorage::new(journal.clone()));
        let svc = service(documents.clone(), users.clone(), storage);

        let saved = svc.create(b"x", "n", "pdf", None).await.unwrap();

        let failing = Arc::new(MemoryStorage::new(new_journal()).failing_delete());
        let svc = service(documents.clone(), users, failing);
        let err = svc.delete(saved.public_id).await.unwrap_err();

        assert!(matches!(err, ServiceError::StorageUnavailable(_)));
        assert_eq!(documents.row_count(), 1);
    }
}
