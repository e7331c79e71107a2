use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::manager::{DatabaseManager, DatabaseError};
use crate::database::models::User;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    /// Code names of the roles granted to the user.
    async fn role_names(&self, user_id: i64) -> Result<Vec<String>, DatabaseError>;

    /// Code names of the authorities granted through the user's roles.
    async fn authority_names(&self, user_id: i64) -> Result<Vec<String>, DatabaseError>;

    async fn touch_last_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), DatabaseError>;
}

pub struct PgUserRepository;

impl PgUserRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PgUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let user = sqlx::query_as::<_, User>("SELECT * FROM app_user WHERE username = $1")
            .bind(username)
            .fetch_optional(&pool)
            .await?;
        Ok(user)
    }

    async fn role_names(&self, user_id: i64) -> Result<Vec<String>, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT r.code_name
            FROM role r
            JOIN user_role ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.code_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn authority_names(&self, user_id: i64) -> Result<Vec<String>, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT a.code_name
            FROM authority a
            JOIN role_authority ra ON ra.authority_id = a.id
            JOIN user_role ur ON ur.role_id = ra.role_id
            WHERE ur.user_id = $1
            ORDER BY a.code_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn touch_last_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        sqlx::query("UPDATE app_user SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(user_id)
            .execute(&pool)
            .await?;
        Ok(())
    }
}
