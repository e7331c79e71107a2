//! Wire models and the entity-to-model mapping layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{Document, Protocol, ProtocolStatus};
use crate::services::ServiceError;

// ---------- requests ----------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentUpdateMetadataRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProtocolCreateRequest {
    pub document_ids: Vec<Uuid>,
    pub state: Option<ProtocolStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ProtocolUpdateRequest {
    pub state: ProtocolStatus,
    pub document_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ProtocolStateUpdateRequest {
    pub state: ProtocolStatus,
}

// ---------- responses ----------

#[derive(Debug, Serialize)]
pub struct DocumentModel {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size_bytes: i64,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProtocolModel {
    pub id: Uuid,
    pub code: String,
    pub state: ProtocolStatus,
    pub document_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------- mappers ----------

pub fn document_to_model(doc: &Document) -> DocumentModel {
    DocumentModel {
        id: doc.public_id,
        name: doc.filename.clone(),
        content_type: doc.content_type.clone(),
        size_bytes: doc.size_bytes,
        created_by: doc.uploaded_by_username.clone(),
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    }
}

/// A persisted status that maps to no known variant is surfaced as a
/// persistence error instead of being coerced to a default.
pub fn protocol_to_model(protocol: &Protocol) -> Result<ProtocolModel, ServiceError> {
    let state = protocol.status().ok_or_else(|| {
        ServiceError::Persistence(format!(
            "unknown persisted protocol status '{}' for protocol {}",
            protocol.status, protocol.public_id
        ))
    })?;

    Ok(ProtocolModel {
        id: protocol.public_id,
        code: protocol.code.clone(),
        state,
        document_ids: protocol.documents.iter().map(|d| d.public_id).collect(),
        created_at: protocol.created_at,
        updated_at: protocol.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_protocol(status: &str) -> Protocol {
        let now = Utc::now();
        Protocol {
            id: 1,
            public_id: Uuid::new_v4(),
            code: "PR-0A1B2C3D".to_string(),
            title: None,
            description: None,
            status: status.to_string(),
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
            documents: Vec::new(),
        }
    }

    #[test]
    fn document_mapping_exposes_public_fields_only() {
        let now = Utc::now();
        let doc = Document {
            id: 9,
            public_id: Uuid::new_v4(),
            filename: "invoice".to_string(),
            content_type: "pdf".to_string(),
            size_bytes: 10,
            storage_path: "documents/x.pdf".to_string(),
            uploaded_by: Some(3),
            uploaded_by_username: Some("john".to_string()),
            created_at: now,
            updated_at: now,
        };

        let model = document_to_model(&doc);
        assert_eq!(model.id, doc.public_id);
        assert_eq!(model.name, "invoice");
        assert_eq!(model.content_type, "pdf");
        assert_eq!(model.size_bytes, 10);
        assert_eq!(model.created_by.as_deref(), Some("john"));

        let json = serde_json::to_value(&model).unwrap();
        assert!(json.get("storage_path").is_none());
        assert_eq!(json["type"], "pdf");
    }

    #[test]
    fn protocol_mapping_carries_state_and_document_ids() {
        let protocol = sample_protocol("PREPARE_FOR_SHIPMENT");
        let model = protocol_to_model(&protocol).unwrap();
        assert_eq!(model.state, ProtocolStatus::PrepareForShipment);
        assert!(model.document_ids.is_empty());
    }

    #[test]
    fn unknown_persisted_status_fails_loudly() {
        let protocol = sample_protocol("SHIPPED");
        let err = protocol_to_model(&protocol).unwrap_err();
        assert!(matches!(err, ServiceError::Persistence(_)));
    }
}
