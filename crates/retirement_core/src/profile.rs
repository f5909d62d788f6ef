//! crates/retirement_core/src/profile.rs
//!
//! The profile store: caches the signed-in user's personal info and financial
//! goals, persists edits, records version history and derives completeness.
//!
//! Per record the store moves `Unloaded -> Loaded`, and each write goes
//! `Loaded -> Updating -> Loaded`. A failed write returns to the previous value;
//! there is no resting error state.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::completeness::compute_completeness;
use crate::domain::{FinancialGoals, FinancialProfile, PersonalInfo, ProfileSnapshot, ProfileVersion};
use crate::error::{ProfileError, ProfileResult};
use crate::observable::{Observable, Subscription};
use crate::ports::ProfileRepository;
use crate::session::SessionStore;

/// The document written by `export_snapshot`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileExport<'a> {
    personal_info: &'a Option<PersonalInfo>,
    financial_goals: &'a Option<FinancialGoals>,
    export_date: DateTime<Utc>,
}

pub struct ProfileStore {
    session: SessionStore,
    rows: Arc<dyn ProfileRepository>,
    personal_info: Observable<Option<PersonalInfo>>,
    financial_goals: Observable<Option<FinancialGoals>>,
    completeness: Observable<u8>,
    loaded: AtomicBool,
    /// Serializes writes so the published value always matches the last stored one.
    write_lock: Mutex<()>,
}

impl ProfileStore {
    /// Creates an unloaded store. Call `initialize` before reading.
    pub fn new(session: SessionStore, rows: Arc<dyn ProfileRepository>) -> Self {
        Self {
            session,
            rows,
            personal_info: Observable::new(None),
            financial_goals: Observable::new(None),
            completeness: Observable::new(0),
            loaded: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates the store and loads the signed-in user's records.
    pub async fn open(
        session: SessionStore,
        rows: Arc<dyn ProfileRepository>,
    ) -> ProfileResult<Self> {
        let store = Self::new(session, rows);
        store.initialize().await?;
        Ok(store)
    }

    /// Fetches both records and publishes them. Missing rows publish `None`.
    pub async fn initialize(&self) -> ProfileResult<()> {
        let user_id = self.require_user_id()?;

        let (personal, financial) = tokio::try_join!(
            self.rows.fetch_personal_info(user_id),
            self.rows.fetch_financial_goals(user_id),
        )
        .map_err(|e| {
            error!("Error loading profile data for {}: {}", user_id, e);
            ProfileError::Fetch(e)
        })?;

        self.personal_info.set(personal);
        self.financial_goals.set(financial);
        self.refresh_completeness();
        self.loaded.store(true, Ordering::SeqCst);
        info!("Profile loaded for user {}", user_id);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    // --- Current values and subscriptions ---

    pub fn personal_info(&self) -> Option<PersonalInfo> {
        self.personal_info.get()
    }

    pub fn financial_goals(&self) -> Option<FinancialGoals> {
        self.financial_goals.get()
    }

    pub fn completeness(&self) -> u8 {
        self.completeness.get()
    }

    pub fn subscribe_personal_info<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(&Option<PersonalInfo>) + Send + Sync + 'static,
    {
        self.personal_info.subscribe(on_change)
    }

    pub fn subscribe_financial_goals<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(&Option<FinancialGoals>) + Send + Sync + 'static,
    {
        self.financial_goals.subscribe(on_change)
    }

    pub fn subscribe_completeness<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(&u8) + Send + Sync + 'static,
    {
        self.completeness.subscribe(on_change)
    }

    /// The three value streams, for async consumers.
    pub fn personal_info_stream(&self) -> &Observable<Option<PersonalInfo>> {
        &self.personal_info
    }

    pub fn financial_goals_stream(&self) -> &Observable<Option<FinancialGoals>> {
        &self.financial_goals
    }

    pub fn completeness_stream(&self) -> &Observable<u8> {
        &self.completeness
    }

    // --- Writes ---

    /// Stores `info`, publishes it, recomputes completeness and returns the new
    /// `personal` version. On failure nothing is published.
    pub async fn update_personal_info(&self, info: PersonalInfo) -> ProfileResult<ProfileVersion> {
        let snapshot = ProfileSnapshot::Personal(info);
        self.save(snapshot).await
    }

    /// Same as `update_personal_info`, for the `financial` record.
    pub async fn update_financial_goals(
        &self,
        goals: FinancialGoals,
    ) -> ProfileResult<ProfileVersion> {
        let snapshot = ProfileSnapshot::Financial(goals);
        self.save(snapshot).await
    }

    /// Re-applies a past snapshot. This is a normal write and records a new version.
    pub async fn restore_version(&self, version: &ProfileVersion) -> ProfileResult<ProfileVersion> {
        info!("Restoring {} version {}", version.snapshot.kind().as_str(), version.id);
        self.save(version.snapshot.clone()).await
    }

    async fn save(&self, snapshot: ProfileSnapshot) -> ProfileResult<ProfileVersion> {
        let user_id = self.require_user_id()?;
        let _guard = self.write_lock.lock().await;

        let version = self
            .rows
            .upsert_with_version(user_id, &snapshot)
            .await
            .map_err(|e| {
                error!("Error updating {} info: {}", snapshot.kind().as_str(), e);
                ProfileError::Write(e)
            })?;

        match snapshot {
            ProfileSnapshot::Personal(info) => self.personal_info.set(Some(info)),
            ProfileSnapshot::Financial(goals) => self.financial_goals.set(Some(goals)),
        }
        self.refresh_completeness();
        Ok(version)
    }

    /// Saves the quick financial profile form. Not cached and not versioned.
    pub async fn save_financial_profile(&self, profile: &FinancialProfile) -> ProfileResult<()> {
        let user_id = self.require_user_id()?;
        self.rows
            .upsert_financial_profile(user_id, profile)
            .await
            .map_err(ProfileError::Write)
    }

    // --- Derived values ---

    /// Completeness of the cached records, 0..=100.
    pub fn compute_completeness(&self) -> u8 {
        let personal = self.personal_info.get();
        let financial = self.financial_goals.get();
        compute_completeness(personal.as_ref(), financial.as_ref())
    }

    fn refresh_completeness(&self) {
        let score = self.compute_completeness();
        debug!("Profile completeness is now {}%", score);
        self.completeness.set(score);
    }

    /// Serializes the cached records as pretty JSON. No network call.
    pub fn export_snapshot(&self) -> ProfileResult<Bytes> {
        let personal_info = self.personal_info.get();
        let financial_goals = self.financial_goals.get();
        let export = ProfileExport {
            personal_info: &personal_info,
            financial_goals: &financial_goals,
            export_date: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&export)?;
        Ok(Bytes::from(json))
    }

    // --- History ---

    /// Every version of the signed-in user's profile, newest first.
    pub async fn list_versions(&self) -> ProfileResult<Vec<ProfileVersion>> {
        let user_id = self.require_user_id()?;
        self.rows.list_versions(user_id).await.map_err(|e| {
            error!("Error getting version history: {}", e);
            ProfileError::Fetch(e)
        })
    }

    // --- Account ---

    /// Deletes the user's rows, then the identity itself.
    ///
    /// Rows go first, in one transaction, so a failed identity deletion leaves
    /// a signed-in account with an empty profile rather than orphaned rows.
    /// Calling again after a partial failure finishes the job.
    pub async fn delete_account(&self) -> ProfileResult<()> {
        let user_id = self.require_user_id()?;
        let _guard = self.write_lock.lock().await;

        self.rows.delete_user_data(user_id).await.map_err(|e| {
            error!("Error deleting profile rows for {}: {}", user_id, e);
            ProfileError::Write(e)
        })?;
        self.personal_info.set(None);
        self.financial_goals.set(None);
        self.refresh_completeness();

        self.session
            .gateway()
            .admin_delete_user(user_id)
            .await
            .map_err(|e| {
                error!("Error deleting account {}: {}", user_id, e);
                ProfileError::Write(e)
            })?;

        info!("Deleted account {}", user_id);
        self.session.on_session_changed(None);
        Ok(())
    }

    fn require_user_id(&self) -> ProfileResult<Uuid> {
        self.session
            .current_identity()
            .map(|identity| identity.id)
            .ok_or(ProfileError::NotAuthenticated)
    }
}
