use crate::models::materiality::{
    FinancialFactors, ImpactFactors, MaterialityAssessment, MaterialityMatrix, MaterialityTopic,
    Priority,
};

/// A dimension at or above this score makes the topic material.
pub const MATERIALITY_THRESHOLD: f64 = 50.0;

/// 0.4·scale + 0.3·scope + 0.2·irremediability + 0.1·likelihood, clamped to [0, 100].
pub fn impact_score(factors: &ImpactFactors) -> f64 {
    let score = 0.4 * factors.scale
        + 0.3 * factors.scope
        + 0.2 * factors.irremediability
        + 0.1 * factors.likelihood;
    clamp_score(score)
}

/// Weighted impact percentages scaled by likelihood, clamped to [0, 100].
///
/// Likelihood multiplies here while it is an additive term in `impact_score`.
pub fn financial_score(factors: &FinancialFactors) -> f64 {
    let magnitude = 0.3 * factors.revenue_impact
        + 0.3 * factors.cost_impact
        + 0.2 * factors.asset_impact
        + 0.2 * factors.liability_impact;
    let likelihood = (factors.likelihood / 100.0).clamp(0.0, 1.0);
    clamp_score(magnitude * likelihood)
}

/// ≥75 critical, ≥50 high, ≥25 medium, else low.
pub fn priority_for(average: f64) -> Priority {
    if average >= 75.0 {
        Priority::Critical
    } else if average >= 50.0 {
        Priority::High
    } else if average >= 25.0 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Combine already-computed dimension scores into an assessment.
pub fn combine(topic: &str, impact: f64, financial: f64) -> MaterialityAssessment {
    let impact = clamp_score(impact);
    let financial = clamp_score(financial);
    let is_material = impact >= MATERIALITY_THRESHOLD || financial >= MATERIALITY_THRESHOLD;
    let priority = priority_for((impact + financial) / 2.0);

    MaterialityAssessment {
        topic: topic.to_string(),
        impact_materiality: impact,
        financial_materiality: financial,
        is_material,
        priority,
        recommendation: recommendations(topic, impact, financial, priority),
    }
}

pub fn assess_topic(topic: &MaterialityTopic) -> MaterialityAssessment {
    combine(
        &topic.topic,
        impact_score(&topic.impact),
        financial_score(&topic.financial),
    )
}

/// Assess every topic; the result is ordered by combined score, highest first.
pub fn assess_topics(topics: &[MaterialityTopic]) -> MaterialityMatrix {
    let mut assessments: Vec<MaterialityAssessment> = topics.iter().map(assess_topic).collect();
    assessments.sort_by(|a, b| {
        let avg_a = a.impact_materiality + a.financial_materiality;
        let avg_b = b.impact_materiality + b.financial_materiality;
        avg_b.total_cmp(&avg_a).then_with(|| a.topic.cmp(&b.topic))
    });
    let material_count = assessments.iter().filter(|a| a.is_material).count();

    MaterialityMatrix {
        assessments,
        material_count,
    }
}

fn recommendations(topic: &str, impact: f64, financial: f64, priority: Priority) -> Vec<String> {
    let mut out = Vec::new();

    if priority == Priority::Critical {
        out.push(format!(
            "Escalate {topic} to board-level oversight and set time-bound targets"
        ));
    }
    if impact >= MATERIALITY_THRESHOLD {
        out.push(format!(
            "Disclose how impacts related to {topic} are identified, managed, and remediated"
        ));
    }
    if financial >= MATERIALITY_THRESHOLD {
        out.push(format!(
            "Integrate {topic} into enterprise risk management and financial planning"
        ));
    }
    if priority == Priority::High || priority == Priority::Critical {
        out.push(format!("Track {topic} KPIs quarterly against a baseline"));
    }
    if out.is_empty() {
        out.push(format!("Monitor {topic} and reassess at the next annual review"));
    }

    out
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
