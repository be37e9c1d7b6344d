use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::claims::ClaimsBlob;
use crate::roles::{ChurchRole, SystemRole};

use super::{ClaimsStore, StoreError, UserRecord, UserStore};

/// Postgres-backed claims and user storage. The claims blob is a JSONB
/// column keyed by principal id; profile records live in `users`.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                display_name TEXT,
                photo_url TEXT,
                email_verified BOOLEAN NOT NULL DEFAULT FALSE,
                system_role TEXT NOT NULL DEFAULT 'user',
                tokens_revoked_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_claims (
                user_id TEXT PRIMARY KEY,
                claims JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert the whole blob. Last writer wins; there is no version check.
    async fn write_claims(&self, user_id: &str, claims: &ClaimsBlob) -> Result<(), StoreError> {
        let value = serde_json::to_value(claims)?;
        sqlx::query(
            r#"
            INSERT INTO user_claims (user_id, claims)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET claims = EXCLUDED.claims
            "#,
        )
        .bind(user_id)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ClaimsStore for PgStore {
    async fn get_claims(&self, user_id: &str) -> Result<ClaimsBlob, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT claims FROM user_claims WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((value,)) => match serde_json::from_value(value) {
                Ok(claims) => Ok(claims),
                Err(e) => {
                    // A malformed legacy blob must not lock the account out
                    // of every authorization check
                    tracing::warn!("Corrupt claims blob for '{}': {}", user_id, e);
                    Ok(ClaimsBlob::default_claims())
                }
            },
            None => Ok(ClaimsBlob::default_claims()),
        }
    }

    async fn set_system_role(&self, user_id: &str, role: &str) -> Result<ClaimsBlob, StoreError> {
        let role =
            SystemRole::parse(role).ok_or_else(|| StoreError::InvalidRole(role.to_string()))?;

        let mut claims = self.get_claims(user_id).await?;
        claims.system_role = role.as_str().to_string();
        claims.recalculate();
        claims.updated_at = Utc::now();
        self.write_claims(user_id, &claims).await?;

        // Second, non-transactional write: mirror the role onto the profile
        // record. If this fails the claims above are already persisted and
        // the profile lags until a retry or refresh.
        let result = sqlx::query("UPDATE users SET system_role = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            tracing::warn!("No profile record for '{}' while mirroring system role", user_id);
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
        self.write_claims(user_id, &claims).await?;
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
        self.write_claims(user_id, &claims).await?;
        Ok(claims)
    }

    async fn refresh_claims(&self, user_id: &str) -> Result<ClaimsBlob, StoreError> {
        let mut claims = self.get_claims(user_id).await?;
        claims.recalculate();
        claims.refreshed_at = Some(Utc::now());
        self.write_claims(user_id, &claims).await?;
        Ok(claims)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, password_hash, display_name, photo_url,
                   email_verified, system_role, tokens_revoked_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, password_hash, display_name, photo_url,
                   email_verified, system_role, tokens_revoked_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn revoke_tokens(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE users SET tokens_revoked_at = $2, updated_at = now() WHERE id = $1")
                .bind(user_id)
                .bind(at)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn tokens_revoked_at(
        &self,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: Option<(Option<DateTime<Utc>>,)> =
            sqlx::query_as("SELECT tokens_revoked_at FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(at,)| at))
    }
}
