use serde::{Deserialize, Serialize};

use crate::{CalcError, check_amount, round2};

const MAX_HEIRS: usize = 20;

/// Tolerance when checking that explicit shares add up to 100 %.
const SHARE_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Spouse,
    Child,
    Parent,
    Sibling,
    Other,
}

impl Relationship {
    /// Amount each heir of this kind receives tax-free.
    pub fn allowance(self) -> f64 {
        match self {
            Relationship::Spouse | Relationship::Child => 100_000.0,
            Relationship::Parent => 50_000.0,
            Relationship::Sibling => 16_000.0,
            Relationship::Other => 0.0,
        }
    }

    /// Flat rate applied above the allowance.
    pub fn tax_rate(self) -> f64 {
        match self {
            Relationship::Spouse | Relationship::Child => 0.07,
            Relationship::Parent => 0.10,
            Relationship::Sibling => 0.15,
            Relationship::Other => 0.25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Heir {
    pub name: String,
    pub relationship: Relationship,
    pub share_pct: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InheritanceInput {
    pub estate_value: f64,
    #[serde(default)]
    pub debts: f64,
    #[serde(default)]
    pub funeral_costs: f64,
    pub heirs: Vec<Heir>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeirShare {
    pub name: String,
    pub relationship: Relationship,
    pub share_pct: f64,
    pub gross: f64,
    pub allowance: f64,
    pub taxable: f64,
    pub tax: f64,
    pub net_received: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InheritanceSplit {
    pub net_estate: f64,
    /// Debts and costs exceed the estate; heirs receive nothing.
    pub insolvent: bool,
    pub heirs: Vec<HeirShare>,
    pub total_tax: f64,
    pub total_received: f64,
}

/// Split a net estate between heirs, either by explicit percentages or
/// equally, and estimate each heir's tax.
pub fn split(input: &InheritanceInput) -> Result<InheritanceSplit, CalcError> {
    check_amount("estate_value", input.estate_value)?;
    check_amount("debts", input.debts)?;
    check_amount("funeral_costs", input.funeral_costs)?;

    if input.heirs.is_empty() {
        return Err(CalcError::Invalid("at least one heir is required".into()));
    }
    if input.heirs.len() > MAX_HEIRS {
        return Err(CalcError::Invalid(format!("at most {} heirs are supported", MAX_HEIRS)));
    }

    let shares = resolve_shares(&input.heirs)?;

    let remaining = input.estate_value - input.debts - input.funeral_costs;
    let insolvent = remaining < 0.0;
    let net_estate = remaining.max(0.0);

    let mut heirs = Vec::with_capacity(input.heirs.len());
    let mut total_tax = 0.0;
    let mut total_received = 0.0;

    for (heir, share_pct) in input.heirs.iter().zip(shares) {
        let gross = net_estate * share_pct / 100.0;
        let allowance = heir.relationship.allowance();
        let taxable = (gross - allowance).max(0.0);
        let tax = taxable * heir.relationship.tax_rate();
        let net_received = gross - tax;

        total_tax += tax;
        total_received += net_received;

        heirs.push(HeirShare {
            name: heir.name.clone(),
            relationship: heir.relationship,
            share_pct: round2(share_pct),
            gross: round2(gross),
            allowance,
            taxable: round2(taxable),
            tax: round2(tax),
            net_received: round2(net_received),
        });
    }

    Ok(InheritanceSplit {
        net_estate: round2(net_estate),
        insolvent,
        heirs,
        total_tax: round2(total_tax),
        total_received: round2(total_received),
    })
}

fn resolve_shares(heirs: &[Heir]) -> Result<Vec<f64>, CalcError> {
    let explicit = heirs.iter().filter(|h| h.share_pct.is_some()).count();

    if explicit == 0 {
        let equal = 100.0 / heirs.len() as f64;
        return Ok(vec![equal; heirs.len()]);
    }
    if explicit != heirs.len() {
        return Err(CalcError::Invalid(
            "either every heir or no heir must have share_pct".into(),
        ));
    }

    let shares: Vec<f64> = heirs.iter().filter_map(|h| h.share_pct).collect();
    if shares.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(CalcError::Invalid("share_pct must be non-negative".into()));
    }
    let total: f64 = shares.iter().sum();
    if (total - 100.0).abs() > SHARE_EPSILON {
        return Err(CalcError::Invalid(format!("shares must sum to 100, got {}", round2(total))));
    }
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heir(name: &str, relationship: Relationship, share_pct: Option<f64>) -> Heir {
        Heir {
            name: name.into(),
            relationship,
            share_pct,
        }
    }

    #[test]
    fn equal_split_with_taxes() {
        let out = split(&InheritanceInput {
            estate_value: 500_000.0,
            debts: 80_000.0,
            funeral_costs: 20_000.0,
            heirs: vec![
                heir("Ana", Relationship::Child, None),
                heir("Luis", Relationship::Other, None),
            ],
        })
        .unwrap();

        assert_eq!(out.net_estate, 400_000.0);
        assert!(!out.insolvent);
        // child: 200k gross, 100k taxable at 7 %
        assert_eq!(out.heirs[0].gross, 200_000.0);
        assert_eq!(out.heirs[0].tax, 7_000.0);
        // other: no allowance, 25 %
        assert_eq!(out.heirs[1].tax, 50_000.0);
        assert_eq!(out.total_tax, 57_000.0);
        assert_eq!(out.total_received, 343_000.0);
    }

    #[test]
    fn explicit_shares_must_sum_to_hundred() {
        let mut input = InheritanceInput {
            estate_value: 100_000.0,
            debts: 0.0,
            funeral_costs: 0.0,
            heirs: vec![
                heir("A", Relationship::Spouse, Some(60.0)),
                heir("B", Relationship::Child, Some(30.0)),
            ],
        };
        assert!(split(&input).is_err());

        input.heirs[1].share_pct = Some(40.0);
        let out = split(&input).unwrap();
        assert_eq!(out.heirs[0].gross, 60_000.0);
        assert_eq!(out.heirs[0].tax, 0.0);
    }

    #[test]
    fn mixing_explicit_and_implicit_is_rejected() {
        let input = InheritanceInput {
            estate_value: 100_000.0,
            debts: 0.0,
            funeral_costs: 0.0,
            heirs: vec![
                heir("A", Relationship::Spouse, Some(60.0)),
                heir("B", Relationship::Child, None),
            ],
        };
        assert!(matches!(split(&input), Err(CalcError::Invalid(_))));
    }

    #[test]
    fn insolvent_estate_pays_nothing() {
        let out = split(&InheritanceInput {
            estate_value: 10_000.0,
            debts: 15_000.0,
            funeral_costs: 0.0,
            heirs: vec![heir("A", Relationship::Sibling, None)],
        })
        .unwrap();
        assert!(out.insolvent);
        assert_eq!(out.net_estate, 0.0);
        assert_eq!(out.total_received, 0.0);
    }

    #[test]
    fn relationship_deserializes_lowercase() {
        let h: Heir =
            serde_json::from_str(r#"{"name":"A","relationship":"parent","share_pct":null}"#).unwrap();
        assert_eq!(h.relationship, Relationship::Parent);
    }
}
