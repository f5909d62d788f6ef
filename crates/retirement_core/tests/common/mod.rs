//! An in-memory gateway for exercising the stores without a backend.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, NaiveDate, Utc};
use retirement_core::{
    AuthSession, BlobStorage, Document, FinancialGoals, FinancialProfile, Identity,
    IdentityGateway, InvestmentStrategy, OAuthProvider, PersonalInfo, PortError, PortResult,
    ProfileRepository, ProfileSnapshot, ProfileVersion, SessionStore, UploadOptions,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, (Identity, String)>,
    sessions: HashMap<String, AuthSession>,
    personal_info: HashMap<Uuid, PersonalInfo>,
    financial_goals: HashMap<Uuid, FinancialGoals>,
    financial_profiles: HashMap<Uuid, FinancialProfile>,
    versions: Vec<ProfileVersion>,
    documents: Vec<Document>,
    blobs: HashMap<String, Bytes>,
}

#[derive(Default)]
pub struct InMemoryGateway {
    tables: Mutex<Tables>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_identity_delete: AtomicBool,
    pub fail_session_probe: AtomicBool,
}

impl InMemoryGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn version_count(&self, user_id: Uuid) -> usize {
        self.tables
            .lock()
            .unwrap()
            .versions
            .iter()
            .filter(|v| v.user_id == user_id)
            .count()
    }

    pub fn stored_personal_info(&self, user_id: Uuid) -> Option<PersonalInfo> {
        self.tables.lock().unwrap().personal_info.get(&user_id).cloned()
    }

    pub fn stored_financial_profile(&self, user_id: Uuid) -> Option<FinancialProfile> {
        self.tables.lock().unwrap().financial_profiles.get(&user_id).cloned()
    }

    pub fn user_exists(&self, user_id: Uuid) -> bool {
        self.tables.lock().unwrap().users.contains_key(&user_id)
    }

    /// Marks the user's address confirmed, as the provider would after a link click.
    pub fn confirm_email(&self, user_id: Uuid) {
        if let Some((identity, _)) = self.tables.lock().unwrap().users.get_mut(&user_id) {
            identity.email_confirmed_at = Some(Utc::now());
        }
    }

    pub fn blob_paths(&self) -> Vec<String> {
        self.tables.lock().unwrap().blobs.keys().cloned().collect()
    }

    pub fn row_count(&self, user_id: Uuid) -> usize {
        let t = self.tables.lock().unwrap();
        t.personal_info.contains_key(&user_id) as usize
            + t.financial_goals.contains_key(&user_id) as usize
            + t.financial_profiles.contains_key(&user_id) as usize
            + t.versions.iter().filter(|v| v.user_id == user_id).count()
            + t.documents.iter().filter(|d| d.user_id == user_id).count()
    }

    fn check(flag: &AtomicBool, what: &str) -> PortResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(PortError::Unexpected(format!("{} unavailable", what)))
        } else {
            Ok(())
        }
    }

    fn open_session(tables: &mut Tables, identity: Identity) -> AuthSession {
        let session = AuthSession {
            token: Uuid::new_v4().to_string(),
            identity,
            expires_at: Utc::now() + Duration::days(30),
        };
        tables.sessions.insert(session.token.clone(), session.clone());
        session
    }
}

#[async_trait]
impl IdentityGateway for InMemoryGateway {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let mut t = self.tables.lock().unwrap();
        if t.users.values().any(|(i, _)| i.email == email) {
            return Err(PortError::Conflict(format!("{} is already registered", email)));
        }
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            email_confirmed_at: None,
        };
        t.users.insert(identity.id, (identity.clone(), password.to_string()));
        Ok(Self::open_session(&mut t, identity))
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let mut t = self.tables.lock().unwrap();
        let identity = t
            .users
            .values()
            .find(|(i, p)| i.email == email && p == password)
            .map(|(i, _)| i.clone())
            .ok_or(PortError::Unauthorized)?;
        Ok(Self::open_session(&mut t, identity))
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_url: &str,
    ) -> PortResult<String> {
        Ok(format!(
            "https://auth.example.com/authorize?provider={}&redirect_to={}",
            provider.as_str(),
            redirect_url
        ))
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        self.tables.lock().unwrap().sessions.remove(token);
        Ok(())
    }

    async fn reset_password(&self, _email: &str) -> PortResult<()> {
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, new_password: &str) -> PortResult<()> {
        let mut t = self.tables.lock().unwrap();
        let entry = t
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(user_id.to_string()))?;
        entry.1 = new_password.to_string();
        Ok(())
    }

    async fn resend_verification(&self, _email: &str) -> PortResult<()> {
        Ok(())
    }

    async fn verify_token(&self, token: &str) -> PortResult<AuthSession> {
        self.tables
            .lock()
            .unwrap()
            .sessions
            .get(token)
            .cloned()
            .ok_or(PortError::Unauthorized)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<Identity> {
        self.tables
            .lock()
            .unwrap()
            .users
            .get(&user_id)
            .map(|(i, _)| i.clone())
            .ok_or_else(|| PortError::NotFound(user_id.to_string()))
    }

    async fn get_session(&self, token: &str) -> PortResult<Option<AuthSession>> {
        Self::check(&self.fail_session_probe, "identity service")?;
        Ok(self.tables.lock().unwrap().sessions.get(token).cloned())
    }

    async fn admin_delete_user(&self, user_id: Uuid) -> PortResult<()> {
        Self::check(&self.fail_identity_delete, "identity admin")?;
        let mut t = self.tables.lock().unwrap();
        t.users.remove(&user_id);
        t.sessions.retain(|_, s| s.identity.id != user_id);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryGateway {
    async fn fetch_personal_info(&self, user_id: Uuid) -> PortResult<Option<PersonalInfo>> {
        Self::check(&self.fail_reads, "row storage")?;
        Ok(self.tables.lock().unwrap().personal_info.get(&user_id).cloned())
    }

    async fn fetch_financial_goals(&self, user_id: Uuid) -> PortResult<Option<FinancialGoals>> {
        Self::check(&self.fail_reads, "row storage")?;
        Ok(self.tables.lock().unwrap().financial_goals.get(&user_id).cloned())
    }

    async fn upsert_with_version(
        &self,
        user_id: Uuid,
        snapshot: &ProfileSnapshot,
    ) -> PortResult<ProfileVersion> {
        Self::check(&self.fail_writes, "row storage")?;
        let mut t = self.tables.lock().unwrap();
        match snapshot {
            ProfileSnapshot::Personal(info) => {
                t.personal_info.insert(user_id, info.clone());
            }
            ProfileSnapshot::Financial(goals) => {
                t.financial_goals.insert(user_id, goals.clone());
            }
        }
        let version = ProfileVersion {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            snapshot: snapshot.clone(),
        };
        t.versions.push(version.clone());
        Ok(version)
    }

    async fn upsert_financial_profile(
        &self,
        user_id: Uuid,
        profile: &FinancialProfile,
    ) -> PortResult<()> {
        Self::check(&self.fail_writes, "row storage")?;
        self.tables
            .lock()
            .unwrap()
            .financial_profiles
            .insert(user_id, profile.clone());
        Ok(())
    }

    async fn list_versions(&self, user_id: Uuid) -> PortResult<Vec<ProfileVersion>> {
        Self::check(&self.fail_reads, "row storage")?;
        // Insertion order breaks ties between equal timestamps.
        let t = self.tables.lock().unwrap();
        Ok(t.versions
            .iter()
            .rev()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_document(&self, document: &Document) -> PortResult<()> {
        Self::check(&self.fail_writes, "row storage")?;
        self.tables.lock().unwrap().documents.push(document.clone());
        Ok(())
    }

    async fn list_documents(&self, user_id: Uuid) -> PortResult<Vec<Document>> {
        Self::check(&self.fail_reads, "row storage")?;
        let t = self.tables.lock().unwrap();
        Ok(t.documents
            .iter()
            .rev()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_user_data(&self, user_id: Uuid) -> PortResult<()> {
        Self::check(&self.fail_writes, "row storage")?;
        let mut t = self.tables.lock().unwrap();
        t.personal_info.remove(&user_id);
        t.financial_goals.remove(&user_id);
        t.financial_profiles.remove(&user_id);
        t.versions.retain(|v| v.user_id != user_id);
        t.documents.retain(|d| d.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for InMemoryGateway {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        options: UploadOptions,
    ) -> PortResult<String> {
        Self::check(&self.fail_writes, "blob storage")?;
        let key = format!("{}/{}", bucket, path);
        let mut t = self.tables.lock().unwrap();
        if !options.upsert && t.blobs.contains_key(&key) {
            return Err(PortError::Conflict(format!("{} already exists", path)));
        }
        t.blobs.insert(key, data);
        Ok(path.to_string())
    }

    async fn remove_prefix(&self, bucket: &str, prefix: &str) -> PortResult<()> {
        Self::check(&self.fail_writes, "blob storage")?;
        let full = format!("{}/{}", bucket, prefix);
        self.tables
            .lock()
            .unwrap()
            .blobs
            .retain(|key, _| !key.starts_with(&full));
        Ok(())
    }
}

/// A gateway plus a session store already signed in as a fresh user.
pub async fn signed_in() -> (Arc<InMemoryGateway>, SessionStore, Identity) {
    let gateway = InMemoryGateway::new();
    let session = SessionStore::new(gateway.clone());
    let auth = session
        .sign_up("saver@example.com", "correct horse battery")
        .await
        .expect("sign up");
    (gateway, session, auth.identity)
}

pub fn complete_personal_info() -> PersonalInfo {
    PersonalInfo {
        first_name: Some("A".into()),
        last_name: Some("B".into()),
        date_of_birth: NaiveDate::from_ymd_opt(1975, 4, 2),
        gender: Some("female".into()),
        email: Some("saver@example.com".into()),
        phone: Some("5551234567".into()),
        address: Some("1 Main St".into()),
        city: Some("Springfield".into()),
        state: Some("IL".into()),
        zip_code: Some("62701".into()),
        email_notifications: true,
        sms_notifications: false,
        marketing_emails: false,
    }
}

pub fn complete_financial_goals() -> FinancialGoals {
    FinancialGoals {
        retirement_age: Some(67),
        target_income: Some(70_000.0),
        current_income: Some(90_000.0),
        risk_tolerance: Some(5),
        investment_strategy: Some(InvestmentStrategy::Moderate),
        expected_return: Some(6.0),
        current_savings: Some(150_000.0),
        monthly_contribution: Some(1_200.0),
        employer_match: Some(4.0),
    }
}
