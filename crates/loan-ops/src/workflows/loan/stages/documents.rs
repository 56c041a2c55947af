use chrono::NaiveDate;
use std::collections::BTreeSet;

use super::super::domain::{DocumentKind, LoanRecord};
use super::super::pipeline::PipelineContext;
use super::result::{CheckResult, Issue, IssueKind, StageName, StageOutcome, StageResult};
use super::Stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredDocument {
    pub kind: DocumentKind,
    pub expires_on: NaiveDate,
}

/// Missing and expired documents for a record on a given day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFindings {
    /// Required but not received, in required order.
    pub missing: Vec<DocumentKind>,
    /// Received but past expiry, in received order.
    pub expired: Vec<ExpiredDocument>,
}

impl DocumentFindings {
    pub fn is_clear(&self) -> bool {
        self.missing.is_empty() && self.expired.is_empty()
    }
}

pub fn check_documents(record: &LoanRecord, as_of: NaiveDate) -> DocumentFindings {
    let received: BTreeSet<&DocumentKind> = record
        .received_documents
        .iter()
        .map(|document| &document.kind)
        .collect();

    let missing = record
        .required_documents
        .iter()
        .filter(|kind| !received.contains(kind))
        .cloned()
        .collect();

    let expired = record
        .received_documents
        .iter()
        .filter(|document| document.is_expired(as_of))
        .filter_map(|document| {
            document.expires_on.map(|expires_on| ExpiredDocument {
                kind: document.kind.clone(),
                expires_on,
            })
        })
        .collect();

    DocumentFindings { missing, expired }
}

/// Compares the required checklist with what is on file.
#[derive(Debug, Default)]
pub struct DocumentCheckStage;

impl Stage for DocumentCheckStage {
    fn name(&self) -> StageName {
        StageName::Documents
    }

    fn run(&self, context: &PipelineContext<'_>) -> StageResult {
        let record = context.record;
        let catalog = context.catalog;
        let findings = check_documents(record, context.as_of);

        let checks = record
            .required_documents
            .iter()
            .map(|kind| {
                let label = catalog.label_for(kind);
                match record.received(kind) {
                    None => CheckResult::new(kind.as_str(), false, format!("{label} not received")),
                    Some(document) if document.is_expired(context.as_of) => CheckResult::new(
                        kind.as_str(),
                        false,
                        format!(
                            "{label} expired on {}",
                            document
                                .expires_on
                                .map(|date| date.to_string())
                                .unwrap_or_default()
                        ),
                    ),
                    Some(document) => CheckResult::new(
                        kind.as_str(),
                        true,
                        format!("{label} received {}", document.received_on),
                    ),
                }
            })
            .collect();

        let mut issues = Vec::with_capacity(findings.missing.len() + findings.expired.len());
        for kind in &findings.missing {
            issues.push(Issue::warning(
                IssueKind::MissingDocument,
                kind.as_str(),
                format!("{} has not been received", catalog.label_for(kind)),
            ));
        }
        for expired in &findings.expired {
            let category = catalog
                .get(&expired.kind)
                .map(|template| format!(" ({} document)", template.category.label()))
                .unwrap_or_default();
            issues.push(Issue::warning(
                IssueKind::ExpiredDocument,
                expired.kind.as_str(),
                format!(
                    "{}{} expired on {}",
                    catalog.label_for(&expired.kind),
                    category,
                    expired.expires_on
                ),
            ));
        }

        let (outcome, narrative) = if findings.is_clear() {
            let narrative = if record.required_documents.is_empty() {
                "No documents are required for this loan.".to_string()
            } else {
                format!(
                    "All {} required documents are on file and current.",
                    record.required_documents.len()
                )
            };
            (StageOutcome::Passed, narrative)
        } else {
            (
                StageOutcome::Failed,
                format!(
                    "{} missing and {} expired document(s) must be collected before verification can proceed.",
                    findings.missing.len(),
                    findings.expired.len()
                ),
            )
        };

        StageResult {
            stage: StageName::Documents,
            outcome,
            checks,
            issues,
            narrative,
            artifact: None,
        }
    }
}
