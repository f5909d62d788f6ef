//! services/api/src/adapters/db.rs
//!
//! This module contains the row-storage adapter, the concrete implementation
//! of the `ProfileRepository` port from the `core` crate. It handles all
//! profile, history and document rows in PostgreSQL using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use retirement_core::domain::{
    Document, FinancialGoals, FinancialProfile, InvestmentStrategy, PersonalInfo, ProfileSnapshot,
    ProfileVersion, VersionKind,
};
use retirement_core::ports::{PortError, PortResult, ProfileRepository};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ProfileRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct PersonalInfoRecord {
    first_name: Option<String>,
    last_name: Option<String>,
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    email_notifications: bool,
    sms_notifications: bool,
    marketing_emails: bool,
}
impl PersonalInfoRecord {
    fn to_domain(self) -> PersonalInfo {
        PersonalInfo {
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            email: self.email,
            phone: self.phone,
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            email_notifications: self.email_notifications,
            sms_notifications: self.sms_notifications,
            marketing_emails: self.marketing_emails,
        }
    }
}

#[derive(FromRow)]
struct FinancialGoalsRecord {
    retirement_age: Option<i32>,
    target_income: Option<f64>,
    current_income: Option<f64>,
    risk_tolerance: Option<i32>,
    investment_strategy: Option<String>,
    expected_return: Option<f64>,
    current_savings: Option<f64>,
    monthly_contribution: Option<f64>,
    employer_match: Option<f64>,
}
impl FinancialGoalsRecord {
    fn to_domain(self) -> PortResult<FinancialGoals> {
        let investment_strategy = self
            .investment_strategy
            .map(|s| s.parse::<InvestmentStrategy>())
            .transpose()
            .map_err(PortError::Unexpected)?;
        Ok(FinancialGoals {
            retirement_age: self.retirement_age,
            target_income: self.target_income,
            current_income: self.current_income,
            risk_tolerance: self.risk_tolerance,
            investment_strategy,
            expected_return: self.expected_return,
            current_savings: self.current_savings,
            monthly_contribution: self.monthly_contribution,
            employer_match: self.employer_match,
        })
    }
}

#[derive(FromRow)]
struct VersionRecord {
    id: Uuid,
    user_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    data: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
}
impl VersionRecord {
    fn to_domain(self) -> PortResult<ProfileVersion> {
        let kind: VersionKind = self.kind.parse().map_err(PortError::Unexpected)?;
        let snapshot = ProfileSnapshot::from_parts(kind, self.data.0).map_err(|e| {
            PortError::Unexpected(format!("Corrupt profile version {}: {}", self.id, e))
        })?;
        Ok(ProfileVersion {
            id: self.id,
            user_id: self.user_id,
            created_at: self.created_at,
            snapshot,
        })
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    user_id: Uuid,
    file_name: String,
    storage_path: String,
    file_type: String,
    description: Option<String>,
    file_size: i64,
    status: String,
    created_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            user_id: self.user_id,
            file_name: self.file_name,
            storage_path: self.storage_path,
            file_type: self.file_type,
            description: self.description,
            file_size: self.file_size,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Upsert Helpers (run inside the caller's transaction)
//=========================================================================================

async fn upsert_personal_info(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    info: &PersonalInfo,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO personal_info (user_id, first_name, last_name, date_of_birth, gender, email, \
         phone, address, city, state, zip_code, email_notifications, sms_notifications, marketing_emails) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (user_id) DO UPDATE SET \
         first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name, \
         date_of_birth = EXCLUDED.date_of_birth, gender = EXCLUDED.gender, email = EXCLUDED.email, \
         phone = EXCLUDED.phone, address = EXCLUDED.address, city = EXCLUDED.city, \
         state = EXCLUDED.state, zip_code = EXCLUDED.zip_code, \
         email_notifications = EXCLUDED.email_notifications, \
         sms_notifications = EXCLUDED.sms_notifications, \
         marketing_emails = EXCLUDED.marketing_emails, updated_at = NOW()",
    )
    .bind(user_id)
    .bind(&info.first_name)
    .bind(&info.last_name)
    .bind(info.date_of_birth)
    .bind(&info.gender)
    .bind(&info.email)
    .bind(&info.phone)
    .bind(&info.address)
    .bind(&info.city)
    .bind(&info.state)
    .bind(&info.zip_code)
    .bind(info.email_notifications)
    .bind(info.sms_notifications)
    .bind(info.marketing_emails)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_financial_goals(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    goals: &FinancialGoals,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO financial_goals (user_id, retirement_age, target_income, current_income, \
         risk_tolerance, investment_strategy, expected_return, current_savings, \
         monthly_contribution, employer_match) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (user_id) DO UPDATE SET \
         retirement_age = EXCLUDED.retirement_age, target_income = EXCLUDED.target_income, \
         current_income = EXCLUDED.current_income, risk_tolerance = EXCLUDED.risk_tolerance, \
         investment_strategy = EXCLUDED.investment_strategy, \
         expected_return = EXCLUDED.expected_return, current_savings = EXCLUDED.current_savings, \
         monthly_contribution = EXCLUDED.monthly_contribution, \
         employer_match = EXCLUDED.employer_match, updated_at = NOW()",
    )
    .bind(user_id)
    .bind(goals.retirement_age)
    .bind(goals.target_income)
    .bind(goals.current_income)
    .bind(goals.risk_tolerance)
    .bind(goals.investment_strategy.map(|s| s.as_str()))
    .bind(goals.expected_return)
    .bind(goals.current_savings)
    .bind(goals.monthly_contribution)
    .bind(goals.employer_match)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

//=========================================================================================
// `ProfileRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProfileRepository for DbAdapter {
    async fn fetch_personal_info(&self, user_id: Uuid) -> PortResult<Option<PersonalInfo>> {
        let record = sqlx::query_as::<_, PersonalInfoRecord>(
            "SELECT first_name, last_name, date_of_birth, gender, email, phone, address, city, \
             state, zip_code, email_notifications, sms_notifications, marketing_emails \
             FROM personal_info WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn fetch_financial_goals(&self, user_id: Uuid) -> PortResult<Option<FinancialGoals>> {
        let record = sqlx::query_as::<_, FinancialGoalsRecord>(
            "SELECT retirement_age, target_income, current_income, risk_tolerance, \
             investment_strategy, expected_return, current_savings, monthly_contribution, \
             employer_match FROM financial_goals WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(|r| r.to_domain()).transpose()
    }

    async fn upsert_with_version(
        &self,
        user_id: Uuid,
        snapshot: &ProfileSnapshot,
    ) -> PortResult<ProfileVersion> {
        let (kind, data) = snapshot
            .to_parts()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let upserted = match snapshot {
            ProfileSnapshot::Personal(info) => upsert_personal_info(&mut tx, user_id, info).await,
            ProfileSnapshot::Financial(goals) => upsert_financial_goals(&mut tx, user_id, goals).await,
        };
        upserted.map_err(unexpected)?;

        let version_id = Uuid::new_v4();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO profile_versions (id, user_id, type, data) VALUES ($1, $2, $3, $4) \
             RETURNING created_at",
        )
        .bind(version_id)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(Json(&data))
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;

        Ok(ProfileVersion {
            id: version_id,
            user_id,
            created_at,
            snapshot: snapshot.clone(),
        })
    }

    async fn upsert_financial_profile(
        &self,
        user_id: Uuid,
        profile: &FinancialProfile,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO financial_profiles (user_id, annual_income, current_savings, \
             retirement_age, risk_tolerance) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id) DO UPDATE SET annual_income = EXCLUDED.annual_income, \
             current_savings = EXCLUDED.current_savings, retirement_age = EXCLUDED.retirement_age, \
             risk_tolerance = EXCLUDED.risk_tolerance, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(profile.annual_income)
        .bind(profile.current_savings)
        .bind(profile.retirement_age)
        .bind(&profile.risk_tolerance)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_versions(&self, user_id: Uuid) -> PortResult<Vec<ProfileVersion>> {
        let records = sqlx::query_as::<_, VersionRecord>(
            "SELECT id, user_id, type, data, created_at FROM profile_versions \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn insert_document(&self, document: &Document) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO documents (id, user_id, file_name, storage_path, file_type, description, \
             file_size, status, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(document.id)
        .bind(document.user_id)
        .bind(&document.file_name)
        .bind(&document.storage_path)
        .bind(&document.file_type)
        .bind(&document.description)
        .bind(document.file_size)
        .bind(&document.status)
        .bind(document.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("{} is already recorded", document.storage_path))
            }
            other => unexpected(other),
        })?;
        Ok(())
    }

    async fn list_documents(&self, user_id: Uuid) -> PortResult<Vec<Document>> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, user_id, file_name, storage_path, file_type, description, file_size, \
             status, created_at FROM documents WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let documents = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(documents)
    }

    async fn delete_user_data(&self, user_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        for table in [
            "personal_info",
            "financial_goals",
            "financial_profiles",
            "profile_versions",
            "documents",
        ] {
            sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", table))
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }
}
