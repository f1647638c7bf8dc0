use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classify::SubmissionError;
use crate::workflows::DocumentBlob;

/// Output language requested from the analysis service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Spanish,
    Chinese,
    Hindi,
    Korean,
    Bengali,
    Swahili,
    Arabic,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::English,
        Language::Spanish,
        Language::Chinese,
        Language::Hindi,
        Language::Korean,
        Language::Bengali,
        Language::Swahili,
        Language::Arabic,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Spanish => "spanish",
            Language::Chinese => "chinese",
            Language::Hindi => "hindi",
            Language::Korean => "korean",
            Language::Bengali => "bengali",
            Language::Swahili => "swahili",
            Language::Arabic => "arabic",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|language| language.as_str() == wanted)
            .ok_or_else(|| format!("unsupported language '{raw}'"))
    }
}

/// Scalar fields sent alongside every analysis call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_address: Option<String>,
    pub language: Language,
    pub voice_output: bool,
}

/// Everything a user handed over for one screening attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub files: Vec<DocumentBlob>,
    pub listing_url: Option<String>,
    pub address: Option<String>,
    pub language: Language,
    pub voice_output: bool,
}

impl AnalysisRequest {
    /// At least one of files, listing URL, or address must be present.
    pub fn has_input(&self) -> bool {
        !self.files.is_empty() || present(&self.listing_url) || present(&self.address)
    }

    pub fn fields(&self) -> AnalysisFields {
        AnalysisFields {
            listing_url: self.listing_url.clone().filter(|value| !value.trim().is_empty()),
            property_address: self.address.clone().filter(|value| !value.trim().is_empty()),
            language: self.language,
            voice_output: self.voice_output,
        }
    }
}

fn present(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScamLikelihood {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrustGrade {
    A,
    B,
    C,
    D,
    F,
}

impl TrustGrade {
    pub const fn label(self) -> &'static str {
        match self {
            TrustGrade::A => "A",
            TrustGrade::B => "B",
            TrustGrade::C => "C",
            TrustGrade::D => "D",
            TrustGrade::F => "F",
        }
    }
}

/// Coarse risk bucket. `VeryHighRisk` is only ever supplied by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    LowRisk,
    #[serde(rename = "Medium Risk")]
    MediumRisk,
    #[serde(rename = "High Risk")]
    HighRisk,
    #[serde(rename = "Very High Risk")]
    VeryHighRisk,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::LowRisk => "Low Risk",
            RiskLevel::MediumRisk => "Medium Risk",
            RiskLevel::HighRisk => "High Risk",
            RiskLevel::VeryHighRisk => "Very High Risk",
        }
    }
}

/// Lease clause as returned by the remote analysis, in source document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseClause {
    #[serde(rename = "text")]
    pub original_text: String,
    pub simplified_text: String,
    #[serde(default)]
    pub is_concerning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_reference: Option<String>,
}

/// Immutable result of one remote analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub scam_likelihood: ScamLikelihood,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trustworthiness_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trustworthiness_grade: Option<TrustGrade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub explanation: String,
    #[serde(rename = "simplified_clauses", default)]
    pub clauses: Vec<LeaseClause>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_items: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl AnalysisResult {
    pub fn concerning_clauses(&self) -> impl Iterator<Item = &LeaseClause> {
        self.clauses.iter().filter(|clause| clause.is_concerning)
    }

    pub fn concerning_clause_count(&self) -> usize {
        self.concerning_clauses().count()
    }
}

/// Accepts RFC 3339, naive ISO timestamps (taken as UTC), or bare dates. Anything else is
/// dropped rather than failing the whole result.
pub(crate) fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// User facing stage shown while an analysis is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Extracting,
    IdentifyingClauses,
    ScreeningIndicators,
    Finalizing,
}

impl ProgressStage {
    pub const fn from_progress(progress: u8) -> Self {
        match progress {
            0..=24 => ProgressStage::Extracting,
            25..=49 => ProgressStage::IdentifyingClauses,
            50..=74 => ProgressStage::ScreeningIndicators,
            _ => ProgressStage::Finalizing,
        }
    }

    /// One-based ordinal, 1 through 4.
    pub const fn ordinal(self) -> u8 {
        match self {
            ProgressStage::Extracting => 1,
            ProgressStage::IdentifyingClauses => 2,
            ProgressStage::ScreeningIndicators => 3,
            ProgressStage::Finalizing => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ProgressStage::Extracting => "Uploading and extracting document content...",
            ProgressStage::IdentifyingClauses => "Identifying potential concerning clauses...",
            ProgressStage::ScreeningIndicators => "Analyzing for potential scam indicators...",
            ProgressStage::Finalizing => "Finalizing the lease analysis...",
        }
    }
}

/// Lifecycle of a single submission slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Uploading {
        progress: u8,
        stage: ProgressStage,
    },
    Succeeded(Box<AnalysisResult>),
    Failed(SubmissionError),
}

impl SubmissionState {
    pub(crate) fn uploading(progress: u8) -> Self {
        SubmissionState::Uploading {
            progress,
            stage: ProgressStage::from_progress(progress),
        }
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self, SubmissionState::Uploading { .. })
    }

    /// Progress shown to the user; a settled success always reads 100.
    pub fn progress(&self) -> Option<u8> {
        match self {
            SubmissionState::Uploading { progress, .. } => Some(*progress),
            SubmissionState::Succeeded(_) => Some(100),
            SubmissionState::Idle | SubmissionState::Failed(_) => None,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            SubmissionState::Succeeded(result) => Some(&**result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SubmissionError> {
        match self {
            SubmissionState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Uploading { .. } => "uploading",
            SubmissionState::Succeeded(_) => "succeeded",
            SubmissionState::Failed(_) => "failed",
        }
    }
}
