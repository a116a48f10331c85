//! Closed-form personal-finance calculators.
//!
//! Every calculator is a pure function over a small, bounded horizon. Inputs
//! are validated up front and rejected with a [`CalcError`] describing the
//! offending field.

pub mod inheritance;
pub mod ipci;
pub mod pension;

use thiserror::Error;

/// Longest accumulation horizon any calculator accepts, in years.
pub const MAX_YEARS: u32 = 30;

#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("{field} must be a finite, non-negative amount")]
    NegativeAmount { field: &'static str },

    #[error("{field} must be a percentage above -100 and at most 100")]
    RateOutOfRange { field: &'static str },

    #[error("horizon must be between 1 and {max} years, got {got}")]
    HorizonOutOfRange { got: i64, max: u32 },

    #[error("{0}")]
    Invalid(String),
}

pub(crate) fn check_amount(field: &'static str, value: f64) -> Result<(), CalcError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CalcError::NegativeAmount { field })
    }
}

pub(crate) fn check_rate(field: &'static str, pct: f64) -> Result<(), CalcError> {
    if pct.is_finite() && pct > -100.0 && pct <= 100.0 {
        Ok(())
    } else {
        Err(CalcError::RateOutOfRange { field })
    }
}

/// Round to whole cents.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
