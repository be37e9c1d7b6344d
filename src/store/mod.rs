//! Claims and user storage.
//!
//! The claims store owns the per-principal claims blob; the user store owns
//! the profile record consulted at login and for token revocation. Both are
//! traits so the HTTP layer can run against Postgres in production and the
//! in-memory backend in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::claims::ClaimsBlob;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors from claims/user storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid role value: {0}")]
    InvalidRole(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("claims serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Profile record for a platform account. `system_role` mirrors the claims
/// blob for query convenience and can lag behind it if the second write of
/// a role change fails (repaired by `refresh_claims`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub system_role: String,
    pub tokens_revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-principal claims blob operations, keyed by principal id.
///
/// Writes are last-writer-wins: each mutation reads the whole blob, merges
/// in memory, recomputes permissions and writes the whole blob back. Two
/// concurrent mutations for the same principal can race and the later
/// writer's snapshot wins.
#[async_trait]
pub trait ClaimsStore: Send + Sync {
    /// Current claims for the principal, or the least-privileged default
    /// when nothing is stored yet.
    async fn get_claims(&self, user_id: &str) -> Result<ClaimsBlob, StoreError>;

    /// Replace the system role, recompute permissions and persist. Also
    /// mirrors the role onto the profile record; the two writes are not
    /// transactional.
    async fn set_system_role(&self, user_id: &str, role: &str) -> Result<ClaimsBlob, StoreError>;

    /// Grant or overwrite the role for one church in the church-role map.
    async fn set_church_role(
        &self,
        user_id: &str,
        church_id: &str,
        role: &str,
    ) -> Result<ClaimsBlob, StoreError>;

    /// Drop the church from the church-role map. A missing entry is not an
    /// error.
    async fn remove_church_role(
        &self,
        user_id: &str,
        church_id: &str,
    ) -> Result<ClaimsBlob, StoreError>;

    /// Re-derive permissions from the stored roles without changing them.
    /// Repairs drift after a role-table change or a failed profile write.
    async fn refresh_claims(&self, user_id: &str) -> Result<ClaimsBlob, StoreError>;

    /// Connectivity check for /health.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Account lookups and token revocation.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Mark every token issued at or before `at` as revoked.
    async fn revoke_tokens(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Revocation cut for the principal, if any. `None` when the principal
    /// has no profile record or has never logged out.
    async fn tokens_revoked_at(
        &self,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError>;
}
