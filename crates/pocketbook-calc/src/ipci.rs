use serde::{Deserialize, Serialize};

use crate::{CalcError, MAX_YEARS, check_amount, check_rate, round2};

/// Inflation-adjusted compound interest input.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpciInput {
    pub initial_capital: f64,
    #[serde(default)]
    pub monthly_contribution: f64,
    pub annual_return_pct: f64,
    pub annual_inflation_pct: f64,
    pub years: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IpciYear {
    pub year: u32,
    /// Cumulative money put in, including the initial capital.
    pub contributed: f64,
    pub nominal_balance: f64,
    /// Nominal balance deflated to today's money.
    pub real_balance: f64,
    pub interest_earned: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IpciProjection {
    pub years: Vec<IpciYear>,
    pub final_nominal: f64,
    pub final_real: f64,
    pub real_annual_return_pct: f64,
}

pub fn project(input: &IpciInput) -> Result<IpciProjection, CalcError> {
    if input.years == 0 || input.years > MAX_YEARS {
        return Err(CalcError::HorizonOutOfRange { got: i64::from(input.years), max: MAX_YEARS });
    }
    check_amount("initial_capital", input.initial_capital)?;
    check_amount("monthly_contribution", input.monthly_contribution)?;
    check_rate("annual_return_pct", input.annual_return_pct)?;
    check_rate("annual_inflation_pct", input.annual_inflation_pct)?;

    let monthly_rate = input.annual_return_pct / 100.0 / 12.0;
    let inflation = 1.0 + input.annual_inflation_pct / 100.0;

    let mut balance = input.initial_capital;
    let mut contributed = input.initial_capital;
    let mut deflator = 1.0;
    let mut years = Vec::with_capacity(input.years as usize);

    for year in 1..=input.years {
        for _ in 0..12 {
            balance = balance * (1.0 + monthly_rate) + input.monthly_contribution;
            contributed += input.monthly_contribution;
        }
        deflator *= inflation;
        years.push(IpciYear {
            year,
            contributed: round2(contributed),
            nominal_balance: round2(balance),
            real_balance: round2(balance / deflator),
            interest_earned: round2(balance - contributed),
        });
    }

    // Fisher relation
    let real_rate = (1.0 + input.annual_return_pct / 100.0) / inflation - 1.0;

    Ok(IpciProjection {
        years,
        final_nominal: round2(balance),
        final_real: round2(balance / deflator),
        real_annual_return_pct: round2(real_rate * 100.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflation_erodes_idle_capital() {
        let out = project(&IpciInput {
            initial_capital: 10_000.0,
            monthly_contribution: 0.0,
            annual_return_pct: 0.0,
            annual_inflation_pct: 2.0,
            years: 2,
        })
        .unwrap();

        assert_eq!(out.final_nominal, 10_000.0);
        assert_eq!(out.final_real, round2(10_000.0 / (1.02 * 1.02)));
        assert_eq!(out.years[1].interest_earned, 0.0);
        assert_eq!(out.real_annual_return_pct, -1.96);
    }

    #[test]
    fn interest_is_balance_minus_contributions() {
        let out = project(&IpciInput {
            initial_capital: 1_000.0,
            monthly_contribution: 50.0,
            annual_return_pct: 12.0,
            annual_inflation_pct: 0.0,
            years: 1,
        })
        .unwrap();

        let row = &out.years[0];
        assert_eq!(row.contributed, 1_600.0);
        let expected = 1_000.0 * 1.01f64.powi(12) + 50.0 * (1.01f64.powi(12) - 1.0) / 0.01;
        assert!((row.nominal_balance - expected).abs() < 0.01);
        assert!((row.interest_earned - (expected - 1_600.0)).abs() < 0.02);
        assert_eq!(row.real_balance, row.nominal_balance);
    }

    #[test]
    fn years_are_bounded() {
        let input = IpciInput {
            initial_capital: 1.0,
            monthly_contribution: 0.0,
            annual_return_pct: 1.0,
            annual_inflation_pct: 1.0,
            years: 31,
        };
        assert_eq!(
            project(&input).unwrap_err(),
            CalcError::HorizonOutOfRange { got: 31, max: MAX_YEARS }
        );
    }
}
