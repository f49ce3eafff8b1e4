//! Hard-coded rule tables for mining risk domains and company ESG categories.
//!
//! Thresholds use the units metrics are reported in: emissions in tCO2e,
//! water in m³, waste in tonnes, heights in metres, rates per 200k hours.

use super::rules::{Condition, RiskRule, RuleTable};
use crate::models::score::{ENVIRONMENTAL, GOVERNANCE, OPERATIONAL, SOCIAL, TAILINGS};

fn above(metric: &str, threshold: f64, points: f64, label: &str) -> RiskRule {
    RiskRule::new(
        Condition::Above {
            metric: metric.to_string(),
            threshold,
        },
        points,
        label,
    )
}

fn below(metric: &str, threshold: f64, points: f64, label: &str) -> RiskRule {
    RiskRule::new(
        Condition::Below {
            metric: metric.to_string(),
            threshold,
        },
        points,
        label,
    )
}

fn equals(metric: &str, value: &str, points: f64, label: &str) -> RiskRule {
    RiskRule::new(
        Condition::Equals {
            metric: metric.to_string(),
            value: value.to_string(),
        },
        points,
        label,
    )
}

fn flag(metric: &str, points: f64, label: &str) -> RiskRule {
    RiskRule::new(
        Condition::Flag {
            metric: metric.to_string(),
        },
        points,
        label,
    )
}

pub fn tailings_table() -> RuleTable {
    RuleTable::new(
        TAILINGS,
        50.0,
        vec![
            equals("riskClassification", "extreme", 60.0, "Extreme consequence classification"),
            equals("riskClassification", "very high", 45.0, "Very high consequence classification"),
            equals("riskClassification", "high", 30.0, "High consequence classification"),
            equals("constructionMethod", "upstream", 20.0, "Upstream-raised dam construction"),
            above("damHeight", 50.0, 15.0, "Dam height above 50 m"),
            above("storageVolume", 10_000_000.0, 15.0, "Stored volume above 10 Mm³"),
            above("populationDownstream", 1_000.0, 15.0, "More than 1,000 people downstream"),
            above("daysSinceInspection", 365.0, 10.0, "No independent inspection in the last year"),
        ],
    )
}

pub fn environmental_table() -> RuleTable {
    RuleTable::new(
        ENVIRONMENTAL,
        30.0,
        vec![
            above("scope1Emissions", 10_000.0, 30.0, "Scope 1 emissions above 10,000 tCO2e"),
            above("scope1Emissions", 100_000.0, 20.0, "Scope 1 emissions above 100,000 tCO2e"),
            above("waterWithdrawal", 100_000.0, 25.0, "Water withdrawal above 100,000 m³"),
            above("wasteGenerated", 50_000.0, 15.0, "Waste generated above 50,000 t"),
            above("environmentalIncidents", 0.0, 20.0, "Reportable environmental incidents"),
            flag("biodiversitySensitiveArea", 15.0, "Operations in or near biodiversity-sensitive areas"),
        ],
    )
}

pub fn mining_social_table() -> RuleTable {
    RuleTable::new(
        SOCIAL,
        30.0,
        vec![
            above("fatalities", 0.0, 40.0, "Work-related fatalities"),
            above("lostTimeInjuryRate", 2.0, 20.0, "Lost-time injury rate above 2.0"),
            above("communityGrievances", 10.0, 15.0, "More than 10 community grievances"),
            flag("indigenousLandOverlap", 20.0, "Operations overlap indigenous land"),
            below("localEmploymentPct", 30.0, 10.0, "Local employment below 30%"),
        ],
    )
}

pub fn operational_table() -> RuleTable {
    RuleTable::new(
        OPERATIONAL,
        50.0,
        vec![
            above("regulatoryViolations", 0.0, 25.0, "Regulatory violations recorded"),
            above("permitsPending", 2.0, 15.0, "More than two permits pending"),
            above("energyIntensity", 500.0, 15.0, "Energy intensity above 500 GJ per kt ore"),
            below("equipmentAvailabilityPct", 80.0, 20.0, "Equipment availability below 80%"),
            below("remainingMineLifeYears", 5.0, 15.0, "Less than five years of mine life remaining"),
        ],
    )
}

/// Mining risk domains in breakdown order.
pub fn mining_tables() -> Vec<RuleTable> {
    vec![
        tailings_table(),
        environmental_table(),
        mining_social_table(),
        operational_table(),
    ]
}

pub fn company_social_table() -> RuleTable {
    RuleTable::new(
        SOCIAL,
        50.0,
        vec![
            above("fatalities", 0.0, 40.0, "Work-related fatalities"),
            above("lostTimeInjuryRate", 2.0, 25.0, "Lost-time injury rate above 2.0"),
            above("employeeTurnoverPct", 20.0, 20.0, "Employee turnover above 20%"),
            below("femaleWorkforcePct", 30.0, 15.0, "Women below 30% of workforce"),
            below("trainingHoursPerEmployee", 10.0, 10.0, "Less than 10 training hours per employee"),
        ],
    )
}

pub fn governance_table() -> RuleTable {
    RuleTable::new(
        GOVERNANCE,
        50.0,
        vec![
            below("boardIndependencePct", 50.0, 30.0, "Board independence below 50%"),
            above("ethicsViolations", 0.0, 25.0, "Confirmed ethics violations"),
            above("dataBreaches", 0.0, 20.0, "Reported data breaches"),
            flag("ceoChairDuality", 15.0, "CEO also chairs the board"),
            below("femaleBoardPct", 30.0, 10.0, "Women below 30% of board seats"),
        ],
    )
}

/// Company ESG categories in breakdown order.
pub fn company_tables() -> Vec<RuleTable> {
    vec![environmental_table(), company_social_table(), governance_table()]
}

/// Climate transition exposure. With no disclosure at all the company is
/// assumed fully exposed.
pub fn climate_table() -> RuleTable {
    RuleTable::new(
        "climate",
        100.0,
        vec![
            above("scope1Emissions", 10_000.0, 25.0, "Material direct emissions"),
            above("scope2Emissions", 10_000.0, 15.0, "Material purchased-energy emissions"),
            above("scope3Emissions", 100_000.0, 20.0, "Material value-chain emissions"),
            below("renewableEnergyPct", 25.0, 20.0, "Renewable energy below 25%"),
            below("emissionsTargetSet", 1.0, 20.0, "No emissions reduction target"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::score::{InputValue, RiskInputs, RiskLevel};

    fn numbers(pairs: &[(&str, f64)]) -> RiskInputs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), InputValue::Number(*v)))
            .collect()
    }

    #[test]
    fn emissions_and_water_scenario_is_medium() {
        let risk = environmental_table().evaluate(&numbers(&[
            ("scope1Emissions", 15_000.0),
            ("waterWithdrawal", 150_000.0),
        ]));
        assert_eq!(risk.score, 55);
        assert_eq!(risk.level, RiskLevel::Medium);
        assert_eq!(risk.triggered.len(), 2);
    }

    #[test]
    fn extreme_tailings_classification_adds_sixty() {
        let mut inputs = RiskInputs::new();
        inputs.insert(
            "riskClassification".to_string(),
            InputValue::Text("extreme".to_string()),
        );
        let risk = tailings_table().evaluate(&inputs);
        assert_eq!(risk.score, 60);
        assert_eq!(risk.level, RiskLevel::Medium);
    }

    #[test]
    fn defaults_differ_per_table() {
        let empty = RiskInputs::new();
        assert_eq!(tailings_table().evaluate(&empty).score, 50);
        assert_eq!(environmental_table().evaluate(&empty).score, 30);
        assert_eq!(mining_social_table().evaluate(&empty).score, 30);
        assert_eq!(operational_table().evaluate(&empty).score, 50);
        assert_eq!(governance_table().evaluate(&empty).score, 50);
        assert_eq!(climate_table().evaluate(&empty).score, 100);
    }

    #[test]
    fn emissions_risk_is_monotonic() {
        let mut last = 0;
        for emissions in [0.0, 9_999.0, 10_000.0, 10_001.0, 50_000.0, 100_001.0, 1e9] {
            let risk = environmental_table().evaluate(&numbers(&[("scope1Emissions", emissions)]));
            assert!(risk.score >= last);
            last = risk.score;
        }
        assert_eq!(last, 50);
    }

    #[test]
    fn weak_governance_is_high_risk() {
        let mut inputs = numbers(&[
            ("boardIndependencePct", 20.0),
            ("ethicsViolations", 2.0),
            ("dataBreaches", 1.0),
        ]);
        inputs.insert("ceoChairDuality".to_string(), InputValue::Flag(true));
        let risk = governance_table().evaluate(&inputs);
        assert_eq!(risk.score, 90);
        assert_eq!(risk.level, RiskLevel::High);
    }
}
