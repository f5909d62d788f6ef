//! services/api/src/web/validation.rs
//!
//! Form rules for the profile wizard and the auth pages. Payloads are checked
//! here, before they reach the stores; every problem is reported at once.

use chrono::Utc;
use regex::Regex;
use retirement_core::domain::{FinancialGoals, FinancialProfile, InvestmentStrategy, PersonalInfo};
use retirement_core::ProfileError;
use std::sync::LazyLock;

use crate::web::dto::{FinancialGoalsPayload, FinancialProfilePayload, PersonalInfoPayload};

pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("valid phone regex"));
static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}(?:-[0-9]{4})?$").expect("valid zip regex"));

/// Collects problems and turns them into one `ProfileError::Validation`.
#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, problem: impl Into<String>) {
        self.0.push(problem.into());
    }

    fn into_result<T>(self, value: T) -> Result<T, ProfileError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ProfileError::Validation(self.0.join("; ")))
        }
    }
}

/// Trims the value and drops it when nothing is left.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_text(problems: &mut Problems, name: &str, value: Option<String>) -> Option<String> {
    let value = clean(value);
    if value.is_none() {
        problems.push(format!("{} is required", name));
    }
    value
}

fn required_number<T: Copy>(problems: &mut Problems, name: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        problems.push(format!("{} is required", name));
    }
    value
}

fn in_range<T>(problems: &mut Problems, name: &str, value: Option<T>, min: T, max: Option<T>)
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    let Some(v) = value else { return };
    let too_high = max.is_some_and(|max| v > max);
    if v < min || too_high {
        match max {
            Some(max) => problems.push(format!("{} must be between {} and {}", name, min, max)),
            None => problems.push(format!("{} must be at least {}", name, min)),
        }
    }
}

/// Returns the address trimmed and lower-cased.
pub fn validate_email(email: &str) -> Result<String, ProfileError> {
    let email = email.trim();
    if EMAIL_RE.is_match(email) {
        Ok(email.to_lowercase())
    } else {
        Err(ProfileError::Validation("Please enter a valid email".to_string()))
    }
}

pub fn validate_password(password: &str) -> Result<(), ProfileError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ProfileError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_personal_info(payload: PersonalInfoPayload) -> Result<PersonalInfo, ProfileError> {
    let mut problems = Problems::default();

    let first_name = required_text(&mut problems, "first_name", payload.first_name);
    let last_name = required_text(&mut problems, "last_name", payload.last_name);
    let address = required_text(&mut problems, "address", payload.address);
    let city = required_text(&mut problems, "city", payload.city);
    let state = required_text(&mut problems, "state", payload.state);

    let date_of_birth = payload.date_of_birth;
    match date_of_birth {
        None => problems.push("date_of_birth is required"),
        Some(dob) if dob > Utc::now().date_naive() => {
            problems.push("date_of_birth cannot be in the future")
        }
        Some(_) => {}
    }

    let email = required_text(&mut problems, "email", payload.email);
    if let Some(email) = &email {
        if !EMAIL_RE.is_match(email) {
            problems.push("email is not a valid address");
        }
    }

    let zip_code = required_text(&mut problems, "zip_code", payload.zip_code);
    if let Some(zip) = &zip_code {
        if !ZIP_RE.is_match(zip) {
            problems.push("zip_code must be 5 digits, optionally followed by -4 digits");
        }
    }

    let phone = clean(payload.phone);
    if let Some(phone) = &phone {
        if !PHONE_RE.is_match(phone) {
            problems.push("phone must be 10 digits");
        }
    }

    problems.into_result(PersonalInfo {
        first_name,
        last_name,
        date_of_birth,
        gender: clean(payload.gender),
        email,
        phone,
        address,
        city,
        state,
        zip_code,
        email_notifications: payload.email_notifications,
        sms_notifications: payload.sms_notifications,
        marketing_emails: payload.marketing_emails,
    })
}

pub fn validate_financial_goals(
    payload: FinancialGoalsPayload,
) -> Result<FinancialGoals, ProfileError> {
    let mut problems = Problems::default();

    let retirement_age = required_number(&mut problems, "retirement_age", payload.retirement_age);
    in_range(&mut problems, "retirement_age", retirement_age, 45, Some(85));

    let risk_tolerance = required_number(&mut problems, "risk_tolerance", payload.risk_tolerance);
    in_range(&mut problems, "risk_tolerance", risk_tolerance, 1, Some(10));

    let expected_return = required_number(&mut problems, "expected_return", payload.expected_return);
    in_range(&mut problems, "expected_return", expected_return, 0.0, Some(20.0));

    let mut money = |name: &str, value: Option<f64>| {
        let value = required_number(&mut problems, name, value);
        in_range(&mut problems, name, value, 0.0, None);
        value
    };
    let target_income = money("target_income", payload.target_income);
    let current_income = money("current_income", payload.current_income);
    let current_savings = money("current_savings", payload.current_savings);
    let monthly_contribution = money("monthly_contribution", payload.monthly_contribution);
    let employer_match = money("employer_match", payload.employer_match);

    let investment_strategy = match clean(payload.investment_strategy) {
        None => {
            problems.push("investment_strategy is required");
            None
        }
        Some(raw) => match raw.to_ascii_lowercase().parse::<InvestmentStrategy>() {
            Ok(strategy) => Some(strategy),
            Err(e) => {
                problems.push(e);
                None
            }
        },
    };

    problems.into_result(FinancialGoals {
        retirement_age,
        target_income,
        current_income,
        risk_tolerance,
        investment_strategy,
        expected_return,
        current_savings,
        monthly_contribution,
        employer_match,
    })
}

pub fn validate_financial_profile(
    payload: FinancialProfilePayload,
) -> Result<FinancialProfile, ProfileError> {
    let mut problems = Problems::default();
    in_range(&mut problems, "annual_income", Some(payload.annual_income), 0.0, None);
    in_range(&mut problems, "current_savings", Some(payload.current_savings), 0.0, None);
    in_range(&mut problems, "retirement_age", Some(payload.retirement_age), 55, Some(75));
    if payload.risk_tolerance.trim().is_empty() {
        problems.push("risk_tolerance is required");
    }
    problems.into_result(payload.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn personal() -> PersonalInfoPayload {
        PersonalInfoPayload {
            first_name: Some(" Ada ".into()),
            last_name: Some("Lovelace".into()),
            date_of_birth: NaiveDate::from_ymd_opt(1970, 1, 1),
            email: Some("ada@example.com".into()),
            phone: Some("".into()),
            address: Some("1 Main St".into()),
            city: Some("Springfield".into()),
            state: Some("IL".into()),
            zip_code: Some("62701-1234".into()),
            ..Default::default()
        }
    }

    fn financial() -> FinancialGoalsPayload {
        FinancialGoalsPayload {
            retirement_age: Some(65),
            target_income: Some(60_000.0),
            current_income: Some(80_000.0),
            risk_tolerance: Some(5),
            investment_strategy: Some("Moderate".into()),
            expected_return: Some(7.0),
            current_savings: Some(0.0),
            monthly_contribution: Some(500.0),
            employer_match: Some(3.0),
        }
    }

    fn message(err: ProfileError) -> String {
        match err {
            ProfileError::Validation(msg) => msg,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_personal_info_is_trimmed() {
        let info = validate_personal_info(personal()).unwrap();
        assert_eq!(info.first_name.as_deref(), Some("Ada"));
        assert_eq!(info.phone, None);
    }

    #[test]
    fn personal_info_problems_are_reported_together() {
        let payload = PersonalInfoPayload {
            first_name: None,
            email: Some("not-an-email".into()),
            zip_code: Some("1234".into()),
            phone: Some("555-1234".into()),
            ..personal()
        };
        let msg = message(validate_personal_info(payload).unwrap_err());
        assert!(msg.contains("first_name is required"));
        assert!(msg.contains("email is not a valid address"));
        assert!(msg.contains("zip_code"));
        assert!(msg.contains("phone must be 10 digits"));
    }

    #[test]
    fn future_birth_dates_are_rejected() {
        let payload = PersonalInfoPayload {
            date_of_birth: Some(Utc::now().date_naive() + chrono::Duration::days(2)),
            ..personal()
        };
        let msg = message(validate_personal_info(payload).unwrap_err());
        assert!(msg.contains("future"));
    }

    #[test]
    fn valid_financial_goals_parse_the_strategy() {
        let goals = validate_financial_goals(financial()).unwrap();
        assert_eq!(goals.investment_strategy, Some(InvestmentStrategy::Moderate));
        assert_eq!(goals.current_savings, Some(0.0));
    }

    #[test]
    fn financial_ranges_are_enforced() {
        let payload = FinancialGoalsPayload {
            retirement_age: Some(40),
            risk_tolerance: Some(11),
            expected_return: Some(25.0),
            monthly_contribution: Some(-1.0),
            investment_strategy: Some("yolo".into()),
            ..financial()
        };
        let msg = message(validate_financial_goals(payload).unwrap_err());
        assert!(msg.contains("retirement_age must be between 45 and 85"));
        assert!(msg.contains("risk_tolerance must be between 1 and 10"));
        assert!(msg.contains("expected_return must be between 0 and 20"));
        assert!(msg.contains("monthly_contribution must be at least 0"));
        assert!(msg.contains("unknown investment strategy"));
    }

    #[test]
    fn missing_financial_fields_are_required() {
        let msg = message(validate_financial_goals(FinancialGoalsPayload::default()).unwrap_err());
        for field in ["retirement_age", "target_income", "investment_strategy", "employer_match"] {
            assert!(msg.contains(&format!("{} is required", field)), "{}", msg);
        }
    }

    #[test]
    fn financial_profile_retirement_age_window() {
        let payload = FinancialProfilePayload {
            annual_income: 50_000.0,
            current_savings: 10_000.0,
            retirement_age: 80,
            risk_tolerance: "low".into(),
        };
        let msg = message(validate_financial_profile(payload).unwrap_err());
        assert!(msg.contains("retirement_age must be between 55 and 75"));
    }

    #[test]
    fn passwords_and_emails() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert_eq!(validate_email(" a@b.co ").unwrap(), "a@b.co");
        assert_eq!(validate_email("Bob@Example.COM").unwrap(), "bob@example.com");
        assert!(validate_email("a@b").is_err());
    }
}
