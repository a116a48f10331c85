use serde::{Deserialize, Serialize};

use crate::{CalcError, MAX_YEARS, check_amount, check_rate, round2};

const MAX_PAYOUT_YEARS: u32 = 40;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PensionInput {
    pub current_age: u32,
    pub retirement_age: u32,
    pub current_savings: f64,
    pub monthly_contribution: f64,
    pub annual_return_pct: f64,
    #[serde(default)]
    pub contribution_growth_pct: f64,
    pub payout_years: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PensionYear {
    pub year: u32,
    pub age: u32,
    /// Cumulative contributions, excluding the starting savings.
    pub contributed: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PensionProjection {
    pub years: Vec<PensionYear>,
    pub final_balance: f64,
    pub total_contributed: f64,
    pub monthly_payout: f64,
}

/// Project savings up to retirement, then size a level monthly payout that
/// exhausts the balance over `payout_years`.
pub fn project(input: &PensionInput) -> Result<PensionProjection, CalcError> {
    let horizon = i64::from(input.retirement_age) - i64::from(input.current_age);
    if horizon < 1 || horizon > i64::from(MAX_YEARS) {
        return Err(CalcError::HorizonOutOfRange { got: horizon, max: MAX_YEARS });
    }
    if input.payout_years == 0 || input.payout_years > MAX_PAYOUT_YEARS {
        return Err(CalcError::Invalid(format!(
            "payout_years must be between 1 and {}",
            MAX_PAYOUT_YEARS
        )));
    }
    check_amount("current_savings", input.current_savings)?;
    check_amount("monthly_contribution", input.monthly_contribution)?;
    check_rate("annual_return_pct", input.annual_return_pct)?;
    check_rate("contribution_growth_pct", input.contribution_growth_pct)?;

    let monthly_rate = input.annual_return_pct / 100.0 / 12.0;
    let growth = 1.0 + input.contribution_growth_pct / 100.0;

    let mut balance = input.current_savings;
    let mut contribution = input.monthly_contribution;
    let mut contributed = 0.0;
    let mut years = Vec::with_capacity(horizon as usize);

    for year in 1..=horizon as u32 {
        for _ in 0..12 {
            balance = balance * (1.0 + monthly_rate) + contribution;
            contributed += contribution;
        }
        years.push(PensionYear {
            year,
            age: input.current_age + year,
            contributed: round2(contributed),
            balance: round2(balance),
        });
        contribution *= growth;
    }

    Ok(PensionProjection {
        years,
        final_balance: round2(balance),
        total_contributed: round2(contributed),
        monthly_payout: round2(annuity_payment(balance, monthly_rate, input.payout_years * 12)),
    })
}

/// Level payment that amortises `principal` over `months` at `rate` per month.
fn annuity_payment(principal: f64, rate: f64, months: u32) -> f64 {
    if rate == 0.0 {
        return principal / f64::from(months);
    }
    principal * rate / (1.0 - (1.0 + rate).powi(-(months as i32)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PensionInput {
        PensionInput {
            current_age: 40,
            retirement_age: 50,
            current_savings: 1_000.0,
            monthly_contribution: 100.0,
            annual_return_pct: 0.0,
            contribution_growth_pct: 0.0,
            payout_years: 10,
        }
    }

    #[test]
    fn zero_rate_is_plain_sum() {
        let out = project(&input()).unwrap();
        assert_eq!(out.years.len(), 10);
        assert_eq!(out.final_balance, 13_000.0);
        assert_eq!(out.total_contributed, 12_000.0);
        assert_eq!(out.years[0].age, 41);
        assert_eq!(out.years[9].age, 50);
        assert!((out.monthly_payout - 13_000.0 / 120.0).abs() < 0.01);
    }

    #[test]
    fn contribution_growth_applies_after_each_year() {
        let mut i = input();
        i.retirement_age = 42;
        i.current_savings = 0.0;
        i.contribution_growth_pct = 10.0;
        let out = project(&i).unwrap();
        // 12 * 100 + 12 * 110
        assert_eq!(out.total_contributed, 2_520.0);
    }

    #[test]
    fn positive_rate_matches_future_value_formula() {
        let mut i = input();
        i.current_savings = 0.0;
        i.annual_return_pct = 6.0;
        let out = project(&i).unwrap();

        let r: f64 = 0.005;
        let n = 120;
        let fv = 100.0 * ((1.0 + r).powi(n) - 1.0) / r;
        assert!((out.final_balance - fv).abs() < 0.02, "{} vs {}", out.final_balance, fv);

        let payout = fv * r / (1.0 - (1.0 + r).powi(-120));
        assert!((out.monthly_payout - payout).abs() < 0.02);
    }

    #[test]
    fn horizon_is_bounded() {
        let mut i = input();
        i.retirement_age = 75;
        i.current_age = 30;
        assert_eq!(
            project(&i).unwrap_err(),
            CalcError::HorizonOutOfRange { got: 45, max: MAX_YEARS }
        );

        i.retirement_age = 30;
        assert!(project(&i).is_err());
    }

    #[test]
    fn rejects_negative_contribution() {
        let mut i = input();
        i.monthly_contribution = -5.0;
        assert_eq!(
            project(&i).unwrap_err(),
            CalcError::NegativeAmount { field: "monthly_contribution" }
        );
    }
}
