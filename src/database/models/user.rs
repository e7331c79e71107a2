use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::Principal;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub public_id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl Principal for User {
    fn username(&self) -> &str {
        &self.username
    }

    fn credential_hash(&self) -> &str {
        &self.password_hash
    }

    // The schema carries no enabled/locked columns; accounts are always active.
    fn is_enabled(&self) -> bool {
        true
    }

    fn is_locked(&self) -> bool {
        false
    }
}
