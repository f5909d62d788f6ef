//! crates/retirement_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! These structs are independent of any database. They derive `serde` because
//! version snapshots and profile exports are JSON documents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The user record owned by the identity provider. Stores only cache it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

// Returned by every call that signs someone in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

/// OAuth providers the login page offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthProvider {
    Google,
    Apple,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Apple => "apple",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "apple" => Ok(OAuthProvider::Apple),
            other => Err(format!("unsupported OAuth provider '{}'", other)),
        }
    }
}

/// Personal details captured by the first step of the profile wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStrategy {
    Conservative,
    Moderate,
    Aggressive,
    Custom,
}

impl InvestmentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentStrategy::Conservative => "conservative",
            InvestmentStrategy::Moderate => "moderate",
            InvestmentStrategy::Aggressive => "aggressive",
            InvestmentStrategy::Custom => "custom",
        }
    }
}

impl fmt::Display for InvestmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestmentStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conservative" => Ok(InvestmentStrategy::Conservative),
            "moderate" => Ok(InvestmentStrategy::Moderate),
            "aggressive" => Ok(InvestmentStrategy::Aggressive),
            "custom" => Ok(InvestmentStrategy::Custom),
            other => Err(format!("unknown investment strategy '{}'", other)),
        }
    }
}

/// Retirement targets captured by the second step of the profile wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialGoals {
    pub retirement_age: Option<i32>,
    pub target_income: Option<f64>,
    pub current_income: Option<f64>,
    /// 1 (cautious) to 10 (aggressive).
    pub risk_tolerance: Option<i32>,
    pub investment_strategy: Option<InvestmentStrategy>,
    /// Expected annual return, in percent.
    pub expected_return: Option<f64>,
    pub current_savings: Option<f64>,
    pub monthly_contribution: Option<f64>,
    pub employer_match: Option<f64>,
}

/// The quick financial profile form, kept in its own table and never versioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialProfile {
    pub annual_income: f64,
    pub current_savings: f64,
    pub retirement_age: i32,
    pub risk_tolerance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Personal,
    Financial,
}

impl VersionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionKind::Personal => "personal",
            VersionKind::Financial => "financial",
        }
    }
}

impl FromStr for VersionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(VersionKind::Personal),
            "financial" => Ok(VersionKind::Financial),
            other => Err(format!("unknown profile version type '{}'", other)),
        }
    }
}

/// The record payload captured at the time of a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProfileSnapshot {
    Personal(PersonalInfo),
    Financial(FinancialGoals),
}

impl ProfileSnapshot {
    pub fn kind(&self) -> VersionKind {
        match self {
            ProfileSnapshot::Personal(_) => VersionKind::Personal,
            ProfileSnapshot::Financial(_) => VersionKind::Financial,
        }
    }

    /// Splits the snapshot into its tag and JSON payload, the shape it is stored in.
    pub fn to_parts(&self) -> Result<(VersionKind, serde_json::Value), serde_json::Error> {
        let data = match self {
            ProfileSnapshot::Personal(info) => serde_json::to_value(info)?,
            ProfileSnapshot::Financial(goals) => serde_json::to_value(goals)?,
        };
        Ok((self.kind(), data))
    }

    pub fn from_parts(kind: VersionKind, data: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            VersionKind::Personal => ProfileSnapshot::Personal(serde_json::from_value(data)?),
            VersionKind::Financial => ProfileSnapshot::Financial(serde_json::from_value(data)?),
        })
    }
}

/// An append-only history entry. Never updated once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileVersion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub snapshot: ProfileSnapshot,
}

/// An uploaded financial document awaiting analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub file_type: String,
    pub description: Option<String>,
    pub file_size: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
