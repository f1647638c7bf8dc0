use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tracing::debug;

use super::{HealthStatus, RentalAnalysisBackend, ReportAck, SuspectLeaserQuery, TransportError};
use crate::workflows::reporting::SuspectLeaser;
use crate::workflows::screening::{
    AnalysisFields, AnalysisResult, LeaseClause, RiskLevel, ScamLikelihood, TrustGrade,
};
use crate::workflows::DocumentBlob;

/// Offline stand-in for the analysis service. Every analysis returns the same sample result,
/// and suspect leasers live in memory.
#[derive(Debug)]
pub struct DemoBackend {
    leasers: Mutex<BTreeMap<String, SuspectLeaser>>,
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::with_leasers(sample_leasers())
    }
}

impl DemoBackend {
    pub fn with_leasers(leasers: impl IntoIterator<Item = SuspectLeaser>) -> Self {
        let leasers = leasers
            .into_iter()
            .map(|leaser| (leaser.id.clone(), leaser))
            .collect();
        Self {
            leasers: Mutex::new(leasers),
        }
    }

    pub fn leaser(&self, id: &str) -> Option<SuspectLeaser> {
        self.leasers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn sample_for(&self, source: &str) -> AnalysisResult {
        debug!(source, "serving demo analysis");
        sample_result()
    }
}

#[async_trait]
impl RentalAnalysisBackend for DemoBackend {
    async fn analyze_rental(
        &self,
        _fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        Ok(self.sample_for("listing"))
    }

    async fn upload_document(
        &self,
        document: &DocumentBlob,
        _fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        Ok(self.sample_for(&document.file_name))
    }

    async fn upload_documents(
        &self,
        documents: &[DocumentBlob],
        _fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        Ok(self.sample_for(&format!("{} documents", documents.len())))
    }

    async fn health(&self) -> Result<HealthStatus, TransportError> {
        Ok(HealthStatus {
            status: "demo".to_string(),
            message: "Serving built-in sample results".to_string(),
        })
    }

    async fn report_suspect_leaser(&self, leaser_id: &str) -> Result<ReportAck, TransportError> {
        let mut leasers = self.leasers.lock().unwrap_or_else(PoisonError::into_inner);
        let leaser = leasers.get_mut(leaser_id).ok_or_else(|| TransportError::Status {
            status: 404,
            message: "Suspect leaser not found".to_string(),
        })?;
        leaser.reported_count += 1;

        Ok(ReportAck {
            success: true,
            reported_count: Some(leaser.reported_count),
            message: Some("Report submitted successfully".to_string()),
        })
    }

    async fn search_suspect_leasers(
        &self,
        query: &SuspectLeaserQuery,
    ) -> Result<Vec<SuspectLeaser>, TransportError> {
        let criteria: Vec<(&str, String)> = query
            .filled_fields()
            .map(|(key, value)| (key, value.to_lowercase()))
            .collect();
        if criteria.is_empty() {
            return Ok(Vec::new());
        }

        let leasers = self.leasers.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(leasers
            .values()
            .filter(|leaser| {
                criteria
                    .iter()
                    .all(|(key, needle)| leaser_matches(leaser, key, needle))
            })
            .take(10)
            .cloned()
            .collect())
    }
}

fn leaser_matches(leaser: &SuspectLeaser, key: &str, needle: &str) -> bool {
    let contains = |value: &str| value.to_lowercase().contains(needle);
    match key {
        "name" => contains(&leaser.name),
        "email" => leaser.email.as_deref().map(contains).unwrap_or(false),
        "phone" => leaser.phone.as_deref().map(contains).unwrap_or(false),
        "address" => leaser.addresses.iter().any(|address| contains(address)),
        _ => false,
    }
}

fn clause(original: &str, simplified: &str, reason: Option<&str>) -> LeaseClause {
    LeaseClause {
        original_text: original.to_string(),
        simplified_text: simplified.to_string(),
        is_concerning: reason.is_some(),
        reason: reason.map(str::to_string),
        legal_reference: None,
    }
}

/// Sample high-risk lease analysis.
pub fn sample_result() -> AnalysisResult {
    AnalysisResult {
        id: Some("demo-lease".to_string()),
        scam_likelihood: ScamLikelihood::High,
        trustworthiness_score: Some(55),
        trustworthiness_grade: Some(TrustGrade::D),
        risk_level: Some(RiskLevel::HighRisk),
        explanation: "This lease looks like a standard residential agreement at first glance, \
            but it combines aggressive financial terms, limits on tenant rights, and a demand \
            for wire transfers. The high application fee, steep late fees, and the landlord's \
            right of entry without notice are the most problematic terms. Have a tenant rights \
            lawyer review it before signing."
            .to_string(),
        clauses: vec![
            clause(
                "Tenant shall pay a non-refundable application fee of $500 via wire transfer within 24 hours of submitting application.",
                "You must pay a $500 non-refundable application fee through wire transfer within 1 day of applying.",
                Some("Unusually high application fee and the requirement for wire transfer are red flags."),
            ),
            clause(
                "Landlord may enter premises at any time without prior notice for inspection or maintenance purposes.",
                "The landlord can enter your home anytime without telling you first.",
                Some("This violates standard tenant rights to reasonable notice before entry."),
            ),
            clause(
                "Late payment of rent shall incur a fee of 15% of monthly rent plus $50 per day until paid in full.",
                "If your rent is late, you'll be charged 15% of your monthly rent plus $50 for each day it remains unpaid.",
                Some("These late fees are excessive and may violate laws that limit late fees."),
            ),
            clause(
                "Security deposit shall be equal to two months' rent.",
                "Your security deposit is twice your monthly rent amount.",
                Some("A two-month security deposit is higher than standard in many markets."),
            ),
            clause(
                "The premises shall be used solely as a residence for Tenant(s) named herein.",
                "Only the people named in this lease can live in the rental unit.",
                None,
            ),
            clause(
                "Tenant shall maintain the Premises in a clean and sanitary condition.",
                "You must keep the property clean and in good condition.",
                None,
            ),
        ],
        suggested_questions: vec![
            "Can I pay the security deposit after viewing the property in person?".to_string(),
            "Can we modify the lease to require 24-hour notice before entry?".to_string(),
            "Is the landlord willing to accept payment methods other than wire transfer?"
                .to_string(),
            "What is the justification for the $500 application fee?".to_string(),
        ],
        action_items: Some(vec![
            "Have a tenant rights lawyer review the lease before signing.".to_string(),
            "Insist on a traceable payment method instead of a wire transfer.".to_string(),
            "Document the condition of the property with photos before moving in.".to_string(),
        ]),
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single(),
    }
}

fn sample_leasers() -> Vec<SuspectLeaser> {
    vec![
        SuspectLeaser {
            id: "e03f5b5f-1963-4de8-8017-0718dfa6065f".to_string(),
            name: "John Smith".to_string(),
            email: Some("suspicious_landlord@example.com".to_string()),
            phone: Some("555-123-4567".to_string()),
            addresses: vec![
                "123 Scam Avenue, Faketown, NY".to_string(),
                "456 Fraud Street, Scamville, CA".to_string(),
            ],
            flags: vec![
                "multiple reported scams".to_string(),
                "non-existent properties".to_string(),
                "asks for wire transfers".to_string(),
            ],
            reported_count: 3,
            created_at: Utc.with_ymd_and_hms(2025, 4, 5, 1, 38, 47).single(),
        },
        SuspectLeaser {
            id: "7a1b83f4-5c2d-4e6f-8a9b-0c1d2e3f4a5b".to_string(),
            name: "Jane Wilson".to_string(),
            email: Some("scam_master@fakeemail.net".to_string()),
            phone: Some("555-987-6543".to_string()),
            addresses: vec!["789 Phishing Lane, Scamtown, CA".to_string()],
            flags: vec![
                "requests payment before showing property".to_string(),
                "uses fake property listings".to_string(),
            ],
            reported_count: 5,
            created_at: Utc.with_ymd_and_hms(2025, 3, 15, 14, 22, 10).single(),
        },
    ]
}
