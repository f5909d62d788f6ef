//! services/api/src/adapters/identity.rs
//!
//! The identity adapter: accounts, password hashing, browser sessions and
//! emailed one-time tokens, stored in PostgreSQL. Implements the
//! `IdentityGateway` port. Email delivery itself happens outside this service;
//! tokens are written to `auth_tokens` for the mail relay to pick up.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use retirement_core::domain::{AuthSession, Identity, OAuthProvider};
use retirement_core::ports::{IdentityGateway, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

const SIGNUP_TOKEN_TTL_HOURS: i64 = 24;
const RECOVERY_TOKEN_TTL_HOURS: i64 = 1;

/// Kind of emailed token, matching the `auth_tokens.kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Signup,
    Recovery,
}

impl TokenKind {
    fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Signup => "signup",
            TokenKind::Recovery => "recovery",
        }
    }

    fn ttl(&self) -> Duration {
        match self {
            TokenKind::Signup => Duration::hours(SIGNUP_TOKEN_TTL_HOURS),
            TokenKind::Recovery => Duration::hours(RECOVERY_TOKEN_TTL_HOURS),
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An identity provider backed by the `users`, `auth_sessions` and `auth_tokens` tables.
#[derive(Clone)]
pub struct PgIdentityAdapter {
    pool: PgPool,
    session_ttl: Duration,
    oauth_authorize_url: Option<Url>,
}

impl PgIdentityAdapter {
    /// Creates a new `PgIdentityAdapter`.
    pub fn new(pool: PgPool, session_ttl: Duration, oauth_authorize_url: Option<Url>) -> Self {
        Self {
            pool,
            session_ttl,
            oauth_authorize_url,
        }
    }

    async fn open_session(&self, identity: Identity) -> PortResult<AuthSession> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_ttl;
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(identity.id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(AuthSession {
            token,
            identity,
            expires_at,
        })
    }

    async fn issue_token(&self, user_id: Uuid, kind: TokenKind) -> PortResult<()> {
        let token = Uuid::new_v4().simple().to_string();
        sqlx::query(
            "INSERT INTO auth_tokens (token, user_id, kind, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(Utc::now() + kind.ttl())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        info!("Issued {} token for user {}", kind.as_str(), user_id);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> PortResult<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password, email_confirmed_at FROM users \
             WHERE lower(email) = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)
    }
}

/// Addresses are stored and compared trimmed and lower-cased.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::Unexpected("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, hashed: &str) -> PortResult<bool> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        PortError::Unexpected("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Builds the provider redirect for `provider`, returning to `redirect_url` afterwards.
pub fn oauth_redirect(base: &Url, provider: OAuthProvider, redirect_url: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("provider", provider.as_str())
        .append_pair("redirect_to", redirect_url);
    url
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
    email_confirmed_at: Option<DateTime<Utc>>,
}
impl UserRecord {
    fn to_domain(self) -> Identity {
        Identity {
            id: self.user_id,
            email: self.email,
            email_confirmed_at: self.email_confirmed_at,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: String,
    expires_at: DateTime<Utc>,
    user_id: Uuid,
    email: String,
    email_confirmed_at: Option<DateTime<Utc>>,
}
impl SessionRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            token: self.id,
            identity: Identity {
                id: self.user_id,
                email: self.email,
                email_confirmed_at: self.email_confirmed_at,
            },
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct TokenRecord {
    user_id: Uuid,
    kind: String,
}

//=========================================================================================
// `IdentityGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityGateway for PgIdentityAdapter {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             ON CONFLICT ((lower(email))) DO NOTHING \
             RETURNING user_id, email, hashed_password, email_confirmed_at",
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::Conflict(format!("{} is already registered", email)))?;

        let identity = record.to_domain();
        self.issue_token(identity.id, TokenKind::Signup).await?;
        self.open_session(identity).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let record = self
            .find_by_email(email)
            .await?
            .ok_or(PortError::Unauthorized)?;
        if !verify_password(password, &record.hashed_password)? {
            return Err(PortError::Unauthorized);
        }
        self.open_session(record.to_domain()).await
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_url: &str,
    ) -> PortResult<String> {
        let base = self
            .oauth_authorize_url
            .as_ref()
            .ok_or_else(|| PortError::Unexpected("OAuth sign-in is not configured".to_string()))?;
        Ok(oauth_redirect(base, provider, redirect_url).to_string())
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> PortResult<()> {
        // Unknown addresses succeed silently so the endpoint can't probe for accounts.
        match self.find_by_email(email).await? {
            Some(record) => self.issue_token(record.user_id, TokenKind::Recovery).await,
            None => Ok(()),
        }
    }

    async fn update_password(&self, user_id: Uuid, new_password: &str) -> PortResult<()> {
        let password_hash = hash_password(new_password)?;
        let result = sqlx::query("UPDATE users SET hashed_password = $1 WHERE user_id = $2")
            .bind(&password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn resend_verification(&self, email: &str) -> PortResult<()> {
        let record = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("No account for {}", email)))?;
        if record.email_confirmed_at.is_some() {
            return Err(PortError::Conflict(format!("{} is already confirmed", email)));
        }
        self.issue_token(record.user_id, TokenKind::Signup).await
    }

    async fn verify_token(&self, token: &str) -> PortResult<AuthSession> {
        let record = sqlx::query_as::<_, TokenRecord>(
            "DELETE FROM auth_tokens WHERE token = $1 AND expires_at > NOW() \
             RETURNING user_id, kind",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;

        if record.kind == TokenKind::Signup.as_str() {
            sqlx::query(
                "UPDATE users SET email_confirmed_at = COALESCE(email_confirmed_at, NOW()) \
                 WHERE user_id = $1",
            )
            .bind(record.user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        }

        let identity = self.get_user(record.user_id).await?;
        self.open_session(identity).await
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<Identity> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password, email_confirmed_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_session(&self, token: &str) -> PortResult<Option<AuthSession>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT s.id, s.expires_at, u.user_id, u.email, u.email_confirmed_at \
             FROM auth_sessions s JOIN users u ON u.user_id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn admin_delete_user(&self, user_id: Uuid) -> PortResult<()> {
        // Sessions and tokens go with the user through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_differing_in_case_normalize_to_one_address() {
        assert_eq!(normalize_email(" Bob@X.com "), "bob@x.com");
        assert_eq!(normalize_email("Bob@X.com"), normalize_email("bob@x.com"));
    }

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn oauth_redirect_encodes_the_return_address() {
        let base = Url::parse("https://auth.example.com/authorize").unwrap();
        let url = oauth_redirect(&base, OAuthProvider::Apple, "http://localhost:4200/auth/callback");
        assert_eq!(
            url.as_str(),
            "https://auth.example.com/authorize?provider=apple&redirect_to=http%3A%2F%2Flocalhost%3A4200%2Fauth%2Fcallback"
        );
    }
}
