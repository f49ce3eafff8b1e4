use serde::{Deserialize, Serialize};

/// Impact-materiality sub-factors, each on a 0–100 scale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactFactors {
    pub scale: f64,
    pub scope: f64,
    pub irremediability: f64,
    pub likelihood: f64,
}

/// Financial-materiality sub-factors as impact percentages (0–100), plus likelihood (0–100).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialFactors {
    pub revenue_impact: f64,
    pub cost_impact: f64,
    pub asset_impact: f64,
    pub liability_impact: f64,
    pub likelihood: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialityTopic {
    pub topic: String,
    pub impact: ImpactFactors,
    pub financial: FinancialFactors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialityAssessment {
    pub topic: String,
    pub impact_materiality: f64,
    pub financial_materiality: f64,
    pub is_material: bool,
    pub priority: Priority,
    pub recommendation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialityMatrix {
    pub assessments: Vec<MaterialityAssessment>,
    pub material_count: usize,
}
