use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::claims::ClaimsBlob;
use crate::roles::{ChurchRole, SystemRole};

use super::{ClaimsStore, StoreError, UserRecord, UserStore};

/// In-memory backend with the same semantics as [`super::PgStore`]. Used by
/// the test suite and for local runs without Postgres (`APP_STORE=memory`).
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    claims: RwLock<HashMap<String, ClaimsBlob>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserRecord) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    async fn write_claims(&self, user_id: &str, claims: ClaimsBlob) {
        self.claims.write().await.insert(user_id.to_string(), claims);
    }
}

#[async_trait]
impl ClaimsStore for MemoryStore {
    async fn get_claims(&self, user_id: &str) -> Result<ClaimsBlob, StoreError> {
        Ok(self
            .claims
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_else(ClaimsBlob::default_claims))
    }

    async fn set_system_role(&self, user_id: &str, role: &str) -> Result<ClaimsBlob, StoreError> {
        let role =
            SystemRole::parse(role).ok_or_else(|| StoreError::InvalidRole(role.to_string()))?;

        let mut claims = self.get_claims(user_id).await?;
        claims.system_role = role.as_str().to_string();
        claims.recalculate();
        claims.updated_at = Utc::now();
        self.write_claims(user_id, claims.clone()).await;

        // Mirror onto the profile record, as the Postgres store does
        if let Some(user) = self.users.write().await.get_mut(user_id) {
            user.system_role = role.as_str().to_string();
        }

        Ok(claims)
    }

    async fn set_church_role(
        &self,
        user_id: &str,
        church_id: &str,
        role: &str,
    ) -> Result<ClaimsBlob, StoreError> {
        let role =
            ChurchRole::parse(role).ok_or_else(|| StoreError::InvalidRole(role.to_string()))?;

        let mut claims = self.get_claims(user_id).await?;
        claims
            .church_roles
            .insert(church_id.to_string(), role.as_str().to_string());
        claims.recalculate();
        claims.updated_at = Utc::now();
        self.write_claims(user_id, claims.clone()).await;
        Ok(claims)
    }

    async fn remove_church_role(
        &self,
        user_id: &str,
        church_id: &str,
    ) -> Result<ClaimsBlob, StoreError> {
        let mut claims = self.get_claims(user_id).await?;
        claims.church_roles.remove(church_id);
        claims.recalculate();
        claims.updated_at = Utc::now();
        self.write_claims(user_id, claims.clone()).await;
        Ok(claims)
    }

    async fn refresh_claims(&self, user_id: &str) -> Result<ClaimsBlob, StoreError> {
        let mut claims = self.get_claims(user_id).await?;
        claims.recalculate();
        claims.refreshed_at = Some(Utc::now());
        self.write_claims(user_id, claims.clone()).await;
        Ok(claims)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn revoke_tokens(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;
        user.tokens_revoked_at = Some(at);
        Ok(())
    }

    async fn tokens_revoked_at(
        &self,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .and_then(|u| u.tokens_revoked_at))
    }
}
