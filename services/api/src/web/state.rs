//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-session user contexts.

use crate::config::Config;
use chrono::Utc;
use retirement_core::{
    BlobStorage, DocumentUploader, IdentityGateway, ProfileError, ProfileRepository,
    ProfileResult, ProfileStore, SessionStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityGateway>,
    pub rows: Arc<dyn ProfileRepository>,
    pub blobs: Arc<dyn BlobStorage>,
    /// Open user contexts, keyed by session token.
    contexts: RwLock<HashMap<String, Arc<UserContext>>>,
}

//=========================================================================================
// UserContext (Specific to One Signed-In Session)
//=========================================================================================

/// The stores of one signed-in session. REST handlers and the change feed of
/// the same session share these, so a write made over REST reaches the feed.
pub struct UserContext {
    pub token: String,
    pub session: SessionStore,
    pub profile: ProfileStore,
    pub documents: DocumentUploader,
}

impl UserContext {
    /// Signed in and not past the session's expiry.
    pub fn is_live(&self) -> bool {
        self.session
            .current_session()
            .is_some_and(|s| s.expires_at > Utc::now())
    }

    fn belongs_to(&self, user_id: Uuid) -> bool {
        self.session
            .current_identity()
            .is_some_and(|identity| identity.id == user_id)
    }
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        identity: Arc<dyn IdentityGateway>,
        rows: Arc<dyn ProfileRepository>,
        blobs: Arc<dyn BlobStorage>,
    ) -> Self {
        Self {
            config,
            identity,
            rows,
            blobs,
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// A signed-out session store bound to the identity gateway.
    pub fn new_session(&self) -> SessionStore {
        SessionStore::new(self.identity.clone())
    }

    /// Loads the profile of a freshly signed-in session and registers it.
    pub async fn open_context(&self, session: SessionStore) -> ProfileResult<Arc<UserContext>> {
        let token = session
            .current_session()
            .map(|s| s.token)
            .ok_or(ProfileError::NotAuthenticated)?;

        let profile = ProfileStore::open(session.clone(), self.rows.clone()).await?;
        let documents = DocumentUploader::new(session.clone(), self.rows.clone(), self.blobs.clone());
        let context = Arc::new(UserContext {
            token: token.clone(),
            session,
            profile,
            documents,
        });

        let mut contexts = self.contexts.write().await;
        let before = contexts.len();
        contexts.retain(|_, c| c.is_live());
        if contexts.len() < before {
            debug!("Swept {} expired user contexts", before - contexts.len());
        }
        contexts.insert(token, context.clone());
        info!("Opened user context ({} active)", contexts.len());
        Ok(context)
    }

    /// Finds the context for `token`, restoring it from the gateway when this
    /// process has not seen the token yet. `Ok(None)` means the token is unknown
    /// or expired.
    pub async fn context_for_token(&self, token: &str) -> ProfileResult<Option<Arc<UserContext>>> {
        let cached = self.contexts.read().await.get(token).cloned();
        if let Some(context) = cached {
            if context.is_live() {
                return Ok(Some(context));
            }
            debug!("Dropping expired user context");
            self.drop_context(token).await;
            return Ok(None);
        }

        let session = self.new_session();
        if session.restore(token).await.is_none() {
            return Ok(None);
        }
        self.open_context(session).await.map(Some)
    }

    pub async fn drop_context(&self, token: &str) {
        self.contexts.write().await.remove(token);
    }

    pub async fn context_count(&self) -> usize {
        self.contexts.read().await.len()
    }

    /// Deletes the account behind `context`: stored documents, profile rows and
    /// the identity. Every open context of that user is then closed, so other
    /// devices can neither read nor write the deleted profile.
    pub async fn delete_account(&self, context: &UserContext) -> ProfileResult<()> {
        let user_id = context
            .session
            .current_identity()
            .map(|identity| identity.id)
            .ok_or(ProfileError::NotAuthenticated)?;

        context.documents.remove_all().await?;
        context.profile.delete_account().await?;
        self.drop_context(&context.token).await;
        self.close_user_contexts(user_id).await;
        Ok(())
    }

    /// Removes every context of `user_id` and signs each one out, which also
    /// ends their change feeds.
    pub async fn close_user_contexts(&self, user_id: Uuid) {
        let closed: Vec<Arc<UserContext>> = {
            let mut contexts = self.contexts.write().await;
            let tokens: Vec<String> = contexts
                .iter()
                .filter(|(_, c)| c.belongs_to(user_id))
                .map(|(token, _)| token.clone())
                .collect();
            tokens
                .iter()
                .filter_map(|token| contexts.remove(token))
                .collect()
        };
        for context in &closed {
            context.session.on_session_changed(None);
        }
        info!("Closed {} user contexts of {}", closed.len(), user_id);
    }
}
