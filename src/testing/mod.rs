//! In-memory doubles for the repository and storage seams. They record every
//! side effect into a shared journal so tests can assert effect ordering
//! (blob-before-row and the compensation path).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Document, Protocol, User};
use crate::database::repositories::{
    DocumentRepository, NewDocument, NewProtocol, ProtocolRepository, UserRepository,
};
use crate::storage::{ObjectStorage, StorageError};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StoragePut(String),
    StorageDelete(String),
    DocumentInsert(Uuid),
    DocumentUpdate(i64),
    DocumentDelete(i64),
    ProtocolInsert(Uuid),
    ProtocolUpdate(i64),
}

pub type Journal = Arc<Mutex<Vec<Effect>>>;

pub fn new_journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

// ---------- storage ----------

pub struct MemoryStorage {
    journal: Journal,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_put: bool,
    fail_delete: bool,
}

impl MemoryStorage {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            objects: Mutex::new(HashMap::new()),
            fail_put: false,
            fail_delete: false,
        }
    }

    pub fn failing_put(mut self) -> Self {
        self.fail_put = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, key: &str, content: &[u8], _content_type: &str) -> Result<(), StorageError> {
        if self.fail_put {
            return Err(StorageError::PutFailed {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.journal.lock().unwrap().push(Effect::StoragePut(key.to_string()));
        self.objects.lock().unwrap().insert(key.to_string(), content.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_delete {
            return Err(StorageError::DeleteFailed {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.journal.lock().unwrap().push(Effect::StorageDelete(key.to_string()));
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------- documents ----------

pub struct MemoryDocuments {
    journal: Journal,
    rows: Mutex<Vec<Document>>,
    referenced: Mutex<HashSet<i64>>,
    next_id: AtomicI64,
    fail_insert: bool,
    fail_update: bool,
}

impl MemoryDocuments {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            rows: Mutex::new(Vec::new()),
            referenced: Mutex::new(HashSet::new()),
            next_id: AtomicI64::new(1),
            fail_insert: false,
            fail_update: false,
        }
    }

    pub fn failing_insert(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn mark_referenced(&self, id: i64) {
        self.referenced.lock().unwrap().insert(id);
    }

    pub fn get(&self, id: i64) -> Option<Document> {
        self.rows.lock().unwrap().iter().find(|d| d.id == id).cloned()
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocuments {
    async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Document>, DatabaseError> {
        Ok(self.rows.lock().unwrap().iter().find(|d| d.public_id == public_id).cloned())
    }

    async fn insert(&self, new: NewDocument) -> Result<Document, DatabaseError> {
        if self.fail_insert {
            return Err(DatabaseError::QueryError("injected insert failure".to_string()));
        }
        let doc = Document {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            public_id: new.public_id,
            filename: new.filename,
            content_type: new.content_type,
            size_bytes: new.size_bytes,
            storage_path: new.storage_path,
            uploaded_by: new.uploaded_by,
            uploaded_by_username: None,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };
        self.journal.lock().unwrap().push(Effect::DocumentInsert(doc.public_id));
        self.rows.lock().unwrap().push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, doc: &Document) -> Result<Document, DatabaseError> {
        if self.fail_update {
            return Err(DatabaseError::QueryError("injected update failure".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|d| d.id == doc.id)
            .ok_or_else(|| DatabaseError::NotFound("document row missing".to_string()))?;
        *row = doc.clone();
        self.journal.lock().unwrap().push(Effect::DocumentUpdate(doc.id));
        Ok(doc.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        self.journal.lock().unwrap().push(Effect::DocumentDelete(id));
        self.rows.lock().unwrap().retain(|d| d.id != id);
        Ok(())
    }

    async fn is_referenced(&self, document_id: i64) -> Result<bool, DatabaseError> {
        Ok(self.referenced.lock().unwrap().contains(&document_id))
    }
}

// ---------- protocols ----------

pub struct MemoryProtocols {
    journal: Journal,
    documents: Arc<MemoryDocuments>,
    rows: Mutex<Vec<Protocol>>,
    links: Mutex<Vec<(i64, i64)>>,
    next_id: AtomicI64,
    fail_insert: bool,
}

impl MemoryProtocols {
    pub fn new(journal: Journal, documents: Arc<MemoryDocuments>) -> Self {
        Self {
            journal,
            documents,
            rows: Mutex::new(Vec::new()),
            links: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            fail_insert: false,
        }
    }

    pub fn failing_insert(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn attach_documents(&self, mut protocol: Protocol) -> Protocol {
        let links = self.links.lock().unwrap();
        protocol.documents = links
            .iter()
            .filter(|(pid, _)| *pid == protocol.id)
            .filter_map(|(_, did)| self.documents.get(*did))
            .collect();
        protocol
    }
}

#[async_trait]
impl ProtocolRepository for MemoryProtocols {
    async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Protocol>, DatabaseError> {
        let found = self.rows.lock().unwrap().iter().find(|p| p.public_id == public_id).cloned();
        Ok(found.map(|p| self.attach_documents(p)))
    }

    async fn insert(&self, new: NewProtocol, document_ids: &[i64]) -> Result<Protocol, DatabaseError> {
        if self.fail_insert {
            return Err(DatabaseError::QueryError("injected insert failure".to_string()));
        }
        let protocol = Protocol {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            public_id: new.public_id,
            code: new.code,
            title: None,
            description: None,
            status: new.status,
            created_by: new.created_by,
            updated_by: new.updated_by,
            created_at: new.created_at,
            updated_at: new.updated_at,
            documents: Vec::new(),
        };
        self.journal.lock().unwrap().push(Effect::ProtocolInsert(protocol.public_id));
        {
            let mut links = self.links.lock().unwrap();
            for did in document_ids {
                links.push((protocol.id, *did));
            }
        }
        self.rows.lock().unwrap().push(protocol.clone());
        Ok(self.attach_documents(protocol))
    }

    async fn update(&self, protocol: &Protocol) -> Result<Protocol, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|p| p.id == protocol.id)
            .ok_or_else(|| DatabaseError::NotFound("protocol row missing".to_string()))?;
        row.status = protocol.status.clone();
        row.updated_by = protocol.updated_by;
        row.updated_at = protocol.updated_at;
        let updated = row.clone();
        drop(rows);
        self.journal.lock().unwrap().push(Effect::ProtocolUpdate(protocol.id));
        Ok(self.attach_documents(updated))
    }

    async fn update_with_documents(
        &self,
        protocol: &Protocol,
        document_ids: &[i64],
    ) -> Result<Protocol, DatabaseError> {
        {
            let mut links = self.links.lock().unwrap();
            links.retain(|(pid, _)| *pid != protocol.id);
            for did in document_ids {
                links.push((protocol.id, *did));
            }
        }
        self.update(protocol).await
    }
}

// ---------- users ----------

pub struct MemoryUsers {
    users: Vec<User>,
    roles: HashMap<i64, Vec<String>>,
    authorities: HashMap<i64, Vec<String>>,
}

impl MemoryUsers {
    pub fn empty() -> Self {
        Self {
            users: Vec::new(),
            roles: HashMap::new(),
            authorities: HashMap::new(),
        }
    }

    pub fn with_user(id: i64, username: &str) -> Self {
        Self::with_raw_hash(id, username, "$2b$12$placeholderplaceholderplaceholderplace")
    }

    /// User whose stored hash actually matches `password`.
    pub fn with_credentials(id: i64, username: &str, password: &str) -> Self {
        let hash = bcrypt::hash(password, 4).expect("bcrypt hash");
        Self::with_raw_hash(id, username, &hash)
    }

    pub fn with_raw_hash(id: i64, username: &str, hash: &str) -> Self {
        let now = Utc::now();
        let user = User {
            id,
            public_id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash.to_string(),
            created_at: now,
            updated_at: now,
            last_login: now,
        };
        Self {
            users: vec![user],
            roles: HashMap::new(),
            authorities: HashMap::new(),
        }
    }

    pub fn grant(mut self, user_id: i64, roles: &[&str], authorities: &[&str]) -> Self {
        self.roles.insert(user_id, roles.iter().map(|s| s.to_string()).collect());
        self.authorities.insert(user_id, authorities.iter().map(|s| s.to_string()).collect());
        self
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.iter().find(|u| u.username == username).cloned())
    }

    async fn role_names(&self, user_id: i64) -> Result<Vec<String>, DatabaseError> {
        Ok(self.roles.get(&user_id).cloned().unwrap_or_default())
    }

    async fn authority_names(&self, user_id: i64) -> Result<Vec<String>, DatabaseError> {
        Ok(self.authorities.get(&user_id).cloned().unwrap_or_default())
    }

    async fn touch_last_login(&self, _user_id: i64, _at: DateTime<Utc>) -> Result<(), DatabaseError> {
        Ok(())
    }
}
