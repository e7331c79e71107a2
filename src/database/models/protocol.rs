use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Document;

/// Persisted protocol status. Stored as text; a row whose status maps to no
/// variant is surfaced as a persistence error rather than coerced to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolStatus {
    New,
    PrepareForShipment,
    Canceled,
}

impl ProtocolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolStatus::New => "NEW",
            ProtocolStatus::PrepareForShipment => "PREPARE_FOR_SHIPMENT",
            ProtocolStatus::Canceled => "CANCELED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(ProtocolStatus::New),
            "PREPARE_FOR_SHIPMENT" => Some(ProtocolStatus::PrepareForShipment),
            "CANCELED" => Some(ProtocolStatus::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Protocol {
    pub id: i64,
    pub public_id: Uuid,
    pub code: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Raw status column; use `status()` for the typed view.
    pub status: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Attached document set, eagerly loaded by the repository.
    #[sqlx(skip)]
    pub documents: Vec<Document>,
}

impl Protocol {
    pub fn status(&self) -> Option<ProtocolStatus> {
        ProtocolStatus::from_str(&self.status)
    }
}
