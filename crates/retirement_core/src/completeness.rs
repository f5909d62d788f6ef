//! crates/retirement_core/src/completeness.rs
//!
//! Profile completeness: the share of required fields that hold a value.
//!
//! A field is filled when it is present. Strings must also contain something
//! other than whitespace. Numbers count as filled whatever their value, so an
//! explicit income of `0` is a real answer, not a missing one.

use crate::domain::{FinancialGoals, PersonalInfo};

pub const REQUIRED_PERSONAL_FIELDS: usize = 8;
pub const REQUIRED_FINANCIAL_FIELDS: usize = 7;

fn text_filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl PersonalInfo {
    /// Number of the 8 required personal fields that are filled.
    pub fn filled_required_fields(&self) -> usize {
        [
            text_filled(&self.first_name),
            text_filled(&self.last_name),
            self.date_of_birth.is_some(),
            text_filled(&self.email),
            text_filled(&self.address),
            text_filled(&self.city),
            text_filled(&self.state),
            text_filled(&self.zip_code),
        ]
        .into_iter()
        .filter(|filled| *filled)
        .count()
    }
}

impl FinancialGoals {
    /// Number of the 7 required financial fields that are filled.
    pub fn filled_required_fields(&self) -> usize {
        [
            self.retirement_age.is_some(),
            self.target_income.is_some(),
            self.current_income.is_some(),
            self.risk_tolerance.is_some(),
            self.investment_strategy.is_some(),
            self.current_savings.is_some(),
            self.monthly_contribution.is_some(),
        ]
        .into_iter()
        .filter(|filled| *filled)
        .count()
    }
}

/// Percentage (0..=100) of required fields filled across the records that exist.
///
/// An absent record contributes nothing to either side of the ratio, so a
/// complete personal record alone scores 100.
pub fn compute_completeness(
    personal: Option<&PersonalInfo>,
    financial: Option<&FinancialGoals>,
) -> u8 {
    let mut filled = 0;
    let mut total = 0;

    if let Some(info) = personal {
        filled += info.filled_required_fields();
        total += REQUIRED_PERSONAL_FIELDS;
    }
    if let Some(goals) = financial {
        filled += goals.filled_required_fields();
        total += REQUIRED_FINANCIAL_FIELDS;
    }

    if total == 0 {
        return 0;
    }
    let percentage = (filled as f64 / total as f64) * 100.0;
    percentage.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InvestmentStrategy;
    use chrono::NaiveDate;

    fn complete_personal() -> PersonalInfo {
        PersonalInfo {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            date_of_birth: NaiveDate::from_ymd_opt(1970, 12, 10),
            email: Some("ada@example.com".into()),
            address: Some("12 St James's Square".into()),
            city: Some("London".into()),
            state: Some("LDN".into()),
            zip_code: Some("12345".into()),
            ..Default::default()
        }
    }

    fn complete_financial() -> FinancialGoals {
        FinancialGoals {
            retirement_age: Some(65),
            target_income: Some(80_000.0),
            current_income: Some(95_000.0),
            risk_tolerance: Some(6),
            investment_strategy: Some(InvestmentStrategy::Moderate),
            current_savings: Some(120_000.0),
            monthly_contribution: Some(1_500.0),
            ..Default::default()
        }
    }

    #[test]
    fn both_absent_scores_zero() {
        assert_eq!(compute_completeness(None, None), 0);
    }

    #[test]
    fn everything_filled_scores_hundred() {
        let info = complete_personal();
        let goals = complete_financial();
        assert_eq!(compute_completeness(Some(&info), Some(&goals)), 100);
    }

    #[test]
    fn complete_personal_alone_scores_hundred() {
        let info = complete_personal();
        assert_eq!(compute_completeness(Some(&info), None), 100);
    }

    #[test]
    fn complete_personal_with_empty_goals_is_eight_of_fifteen() {
        let info = complete_personal();
        let goals = FinancialGoals::default();
        assert_eq!(compute_completeness(Some(&info), Some(&goals)), 53);
    }

    #[test]
    fn blank_strings_do_not_count() {
        let info = PersonalInfo {
            first_name: Some("   ".into()),
            last_name: Some(String::new()),
            ..complete_personal()
        };
        assert_eq!(info.filled_required_fields(), 6);
        assert_eq!(compute_completeness(Some(&info), None), 75);
    }

    #[test]
    fn zero_is_an_explicit_value() {
        let goals = FinancialGoals {
            current_savings: Some(0.0),
            monthly_contribution: Some(0.0),
            ..complete_financial()
        };
        assert_eq!(goals.filled_required_fields(), 7);
    }

    #[test]
    fn optional_fields_are_ignored() {
        let mut info = PersonalInfo::default();
        info.gender = Some("f".into());
        info.phone = Some("5551234567".into());
        let mut goals = FinancialGoals::default();
        goals.expected_return = Some(6.5);
        goals.employer_match = Some(3.0);
        assert_eq!(compute_completeness(Some(&info), Some(&goals)), 0);
    }

    #[test]
    fn score_never_decreases_as_fields_are_filled() {
        let target = complete_personal();
        let goals_target = complete_financial();
        let mut info = PersonalInfo::default();
        let mut goals = FinancialGoals::default();
        let mut last = compute_completeness(Some(&info), Some(&goals));

        let personal_steps: Vec<fn(&mut PersonalInfo, &PersonalInfo)> = vec![
            |i, t| i.first_name = t.first_name.clone(),
            |i, t| i.last_name = t.last_name.clone(),
            |i, t| i.date_of_birth = t.date_of_birth,
            |i, t| i.email = t.email.clone(),
            |i, t| i.address = t.address.clone(),
            |i, t| i.city = t.city.clone(),
            |i, t| i.state = t.state.clone(),
            |i, t| i.zip_code = t.zip_code.clone(),
        ];
        for step in personal_steps {
            step(&mut info, &target);
            let score = compute_completeness(Some(&info), Some(&goals));
            assert!(score >= last && score <= 100);
            last = score;
        }

        let financial_steps: Vec<fn(&mut FinancialGoals, &FinancialGoals)> = vec![
            |g, t| g.retirement_age = t.retirement_age,
            |g, t| g.target_income = t.target_income,
            |g, t| g.current_income = t.current_income,
            |g, t| g.risk_tolerance = t.risk_tolerance,
            |g, t| g.investment_strategy = t.investment_strategy,
            |g, t| g.current_savings = t.current_savings,
            |g, t| g.monthly_contribution = t.monthly_contribution,
        ];
        for step in financial_steps {
            step(&mut goals, &goals_target);
            let score = compute_completeness(Some(&info), Some(&goals));
            assert!(score >= last && score <= 100);
            last = score;
        }
        assert_eq!(last, 100);
    }
}
