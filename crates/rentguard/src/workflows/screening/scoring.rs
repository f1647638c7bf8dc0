use serde::Serialize;

use super::domain::{AnalysisResult, LeaseClause, RiskLevel, ScamLikelihood, TrustGrade};

const MAX_CONCERNING_RATIO: f64 = 0.8;
const CONCERNING_PENALTY_WEIGHT: f64 = 8.0;

/// Where the displayed score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Authoritative,
    Derived,
}

/// Numbers the display layer renders for one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayMetrics {
    pub score: u8,
    pub grade: TrustGrade,
    pub risk_level: RiskLevel,
    pub source: ScoreSource,
    /// Points removed for concerning clauses; zero when the score is authoritative.
    pub concerning_penalty: u8,
}

/// Normalizes a remote classification into score, grade, and risk tier.
///
/// Authoritative values from the service win field by field. Missing ones are derived from
/// the (possibly derived) score. The local fallback never produces `VeryHighRisk`.
pub fn compute_display_metrics(result: &AnalysisResult) -> DisplayMetrics {
    let (score, source, concerning_penalty) = match result.trustworthiness_score {
        Some(score) => (score, ScoreSource::Authoritative, 0),
        None => {
            let penalty = concerning_penalty(&result.clauses);
            (
                derive_score(result.scam_likelihood, &result.clauses),
                ScoreSource::Derived,
                penalty,
            )
        }
    };

    let grade = result
        .trustworthiness_grade
        .unwrap_or_else(|| grade_for_score(score));
    let risk_level = result
        .risk_level
        .unwrap_or_else(|| risk_level_for_score(score));

    DisplayMetrics {
        score,
        grade,
        risk_level,
        source,
        concerning_penalty,
    }
}

pub const fn base_score(likelihood: ScamLikelihood) -> u8 {
    match likelihood {
        ScamLikelihood::Low => 92,
        ScamLikelihood::Medium => 78,
        ScamLikelihood::High => 50,
    }
}

/// `round(min(0.8, concerning / total) * 8)`, zero for an empty clause list.
pub fn concerning_penalty(clauses: &[LeaseClause]) -> u8 {
    if clauses.is_empty() {
        return 0;
    }

    let concerning = clauses.iter().filter(|clause| clause.is_concerning).count();
    let ratio = (concerning as f64 / clauses.len() as f64).min(MAX_CONCERNING_RATIO);
    (ratio * CONCERNING_PENALTY_WEIGHT).round() as u8
}

pub fn derive_score(likelihood: ScamLikelihood, clauses: &[LeaseClause]) -> u8 {
    let score = i32::from(base_score(likelihood)) - i32::from(concerning_penalty(clauses));
    score.clamp(0, 100) as u8
}

pub const fn grade_for_score(score: u8) -> TrustGrade {
    match score {
        85.. => TrustGrade::A,
        70..=84 => TrustGrade::B,
        55..=69 => TrustGrade::C,
        40..=54 => TrustGrade::D,
        _ => TrustGrade::F,
    }
}

pub const fn risk_level_for_score(score: u8) -> RiskLevel {
    match score {
        70.. => RiskLevel::LowRisk,
        45..=69 => RiskLevel::MediumRisk,
        _ => RiskLevel::HighRisk,
    }
}
