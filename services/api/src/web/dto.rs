//! services/api/src/web/dto.rs
//!
//! Request and response bodies for the REST API. These carry the OpenAPI
//! schemas; the core domain types stay free of HTTP concerns.

use chrono::{DateTime, NaiveDate, Utc};
use retirement_core::domain::{
    Document, FinancialGoals, FinancialProfile, Identity, PersonalInfo, ProfileVersion,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Auth
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyTokenRequest {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    pub new_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct OAuthQuery {
    pub redirect_to: String,
}

#[derive(Serialize, ToSchema)]
pub struct OAuthResponse {
    pub url: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub email_confirmed: bool,
}

impl From<&Identity> for AuthResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.id,
            email: identity.email.clone(),
            email_confirmed: identity.email_confirmed_at.is_some(),
        }
    }
}

//=========================================================================================
// Profile
//=========================================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PersonalInfoPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[serde(default)]
    pub email_notifications: bool,
    #[serde(default)]
    pub sms_notifications: bool,
    #[serde(default)]
    pub marketing_emails: bool,
}

impl From<PersonalInfo> for PersonalInfoPayload {
    fn from(info: PersonalInfo) -> Self {
        Self {
            first_name: info.first_name,
            last_name: info.last_name,
            date_of_birth: info.date_of_birth,
            gender: info.gender,
            email: info.email,
            phone: info.phone,
            address: info.address,
            city: info.city,
            state: info.state,
            zip_code: info.zip_code,
            email_notifications: info.email_notifications,
            sms_notifications: info.sms_notifications,
            marketing_emails: info.marketing_emails,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct FinancialGoalsPayload {
    pub retirement_age: Option<i32>,
    pub target_income: Option<f64>,
    pub current_income: Option<f64>,
    pub risk_tolerance: Option<i32>,
    /// One of `conservative`, `moderate`, `aggressive`, `custom`.
    pub investment_strategy: Option<String>,
    pub expected_return: Option<f64>,
    pub current_savings: Option<f64>,
    pub monthly_contribution: Option<f64>,
    pub employer_match: Option<f64>,
}

impl From<FinancialGoals> for FinancialGoalsPayload {
    fn from(goals: FinancialGoals) -> Self {
        Self {
            retirement_age: goals.retirement_age,
            target_income: goals.target_income,
            current_income: goals.current_income,
            risk_tolerance: goals.risk_tolerance,
            investment_strategy: goals.investment_strategy.map(|s| s.to_string()),
            expected_return: goals.expected_return,
            current_savings: goals.current_savings,
            monthly_contribution: goals.monthly_contribution,
            employer_match: goals.employer_match,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FinancialProfilePayload {
    pub annual_income: f64,
    pub current_savings: f64,
    pub retirement_age: i32,
    pub risk_tolerance: String,
}

impl From<FinancialProfilePayload> for FinancialProfile {
    fn from(payload: FinancialProfilePayload) -> Self {
        Self {
            annual_income: payload.annual_income,
            current_savings: payload.current_savings,
            retirement_age: payload.retirement_age,
            risk_tolerance: payload.risk_tolerance.trim().to_string(),
        }
    }
}

/// The signed-in user's cached profile.
#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub personal_info: Option<PersonalInfoPayload>,
    pub financial_goals: Option<FinancialGoalsPayload>,
    pub completeness: u8,
}

#[derive(Serialize, ToSchema)]
pub struct CompletenessResponse {
    pub completeness: u8,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileVersionResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// `personal` or `financial`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The record as it was saved.
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

impl TryFrom<ProfileVersion> for ProfileVersionResponse {
    type Error = serde_json::Error;

    fn try_from(version: ProfileVersion) -> Result<Self, Self::Error> {
        let (kind, data) = version.snapshot.to_parts()?;
        Ok(Self {
            id: version.id,
            created_at: version.created_at,
            kind: kind.as_str().to_string(),
            data,
        })
    }
}

//=========================================================================================
// Documents
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub file_type: String,
    pub description: Option<String>,
    pub file_size: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            file_name: doc.file_name,
            storage_path: doc.storage_path,
            file_type: doc.file_type,
            description: doc.description,
            file_size: doc.file_size,
            status: doc.status,
            created_at: doc.created_at,
        }
    }
}
