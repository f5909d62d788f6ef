//! crates/retirement_core/src/session.rs
//!
//! The session store: the single answer to "who is signed in".
//!
//! Every call that changes the signed-in identity updates the cached value
//! before it returns, so subscribers see the transition first.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{AuthSession, Identity, OAuthProvider};
use crate::observable::{Observable, Subscription};
use crate::ports::{IdentityGateway, PortError, PortResult};

#[derive(Clone)]
pub struct SessionStore {
    gateway: Arc<dyn IdentityGateway>,
    session: Observable<Option<AuthSession>>,
}

impl SessionStore {
    /// Creates a signed-out store.
    pub fn new(gateway: Arc<dyn IdentityGateway>) -> Self {
        Self {
            gateway,
            session: Observable::new(None),
        }
    }

    /// Startup probe. Resolves `token` through the gateway and caches the result.
    ///
    /// Gateway failures are logged and leave the store signed out; nothing is retried.
    pub async fn restore(&self, token: &str) -> Option<Identity> {
        match self.gateway.get_session(token).await {
            Ok(session) => {
                self.on_session_changed(session);
            }
            Err(e) => {
                warn!("Session probe failed, continuing signed out: {}", e);
                self.on_session_changed(None);
            }
        }
        self.current_identity()
    }

    /// Applies a session-changed notification from the gateway.
    pub fn on_session_changed(&self, session: Option<AuthSession>) {
        debug!(
            user_id = ?session.as_ref().map(|s| s.identity.id),
            "Session changed"
        );
        self.session.set(session);
    }

    /// The cached identity. Never touches the network.
    pub fn current_identity(&self) -> Option<Identity> {
        self.session.get().map(|s| s.identity)
    }

    pub fn current_session(&self) -> Option<AuthSession> {
        self.session.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.get().is_some()
    }

    /// Calls `on_change` with the current identity now and on every transition.
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        self.session
            .subscribe(move |session| on_change(session.as_ref().map(|s| &s.identity)))
    }

    /// The session as a channel for async consumers. The first item is the
    /// current value.
    pub fn updates(&self) -> (Subscription, mpsc::UnboundedReceiver<Option<AuthSession>>) {
        self.session.updates()
    }

    pub(crate) fn gateway(&self) -> &Arc<dyn IdentityGateway> {
        &self.gateway
    }

    // --- Identity operations ---

    pub async fn sign_up(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let session = self.gateway.sign_up(email, password).await?;
        info!("Signed up user {}", session.identity.id);
        self.on_session_changed(Some(session.clone()));
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let session = self.gateway.sign_in(email, password).await?;
        info!("Signed in user {}", session.identity.id);
        self.on_session_changed(Some(session.clone()));
        Ok(session)
    }

    /// Returns the provider URL to redirect to. The session changes only once the
    /// provider calls back.
    pub async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_url: &str,
    ) -> PortResult<String> {
        self.gateway.sign_in_with_oauth(provider, redirect_url).await
    }

    /// Signs out. The cached identity is cleared only once the gateway confirms.
    pub async fn sign_out(&self) -> PortResult<()> {
        if let Some(session) = self.session.get() {
            self.gateway.sign_out(&session.token).await?;
            info!("Signed out user {}", session.identity.id);
        }
        self.on_session_changed(None);
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> PortResult<()> {
        self.gateway.reset_password(email).await
    }

    pub async fn update_password(&self, new_password: &str) -> PortResult<()> {
        let user_id = self.require_user_id()?;
        self.gateway.update_password(user_id, new_password).await
    }

    /// Sends the signup confirmation again to the signed-in user's address.
    pub async fn resend_verification(&self) -> PortResult<()> {
        let identity = self.current_identity().ok_or(PortError::Unauthorized)?;
        self.gateway.resend_verification(&identity.email).await
    }

    pub async fn verify_token(&self, token: &str) -> PortResult<AuthSession> {
        let session = self.gateway.verify_token(token).await?;
        self.on_session_changed(Some(session.clone()));
        Ok(session)
    }

    /// Fetches a fresh copy of the signed-in user and refreshes the cache with it.
    pub async fn current_user(&self) -> PortResult<Identity> {
        let session = self.session.get().ok_or(PortError::Unauthorized)?;
        let identity = self.gateway.get_user(session.identity.id).await?;
        if identity != session.identity {
            self.on_session_changed(Some(AuthSession {
                identity: identity.clone(),
                ..session
            }));
        }
        Ok(identity)
    }

    fn require_user_id(&self) -> PortResult<Uuid> {
        self.current_identity()
            .map(|identity| identity.id)
            .ok_or(PortError::Unauthorized)
    }
}
