use chrono::NaiveDate;
use serde::Serialize;

use super::super::domain::{LoanId, LoanRecord, LoanStatus, LoanType};
use super::super::pipeline::PipelineOutcome;
use super::super::stages::{
    FundingPackage, IssueKind, LoanException, Severity, StageName, StageOutcome, StageResult,
};

#[derive(Debug, Clone, Serialize)]
pub struct StageSummaryView {
    pub stage: StageName,
    pub stage_label: &'static str,
    pub outcome: StageOutcome,
    pub outcome_label: &'static str,
    pub narrative: String,
    pub checks_passed: usize,
    pub checks_total: usize,
    pub warning_issues: usize,
    pub critical_issues: usize,
}

impl StageSummaryView {
    fn from_result(result: &StageResult) -> Self {
        let count = |severity: Severity| {
            result
                .issues
                .iter()
                .filter(|issue| issue.severity == severity)
                .count()
        };
        Self {
            stage: result.stage,
            stage_label: result.stage.label(),
            outcome: result.outcome,
            outcome_label: result.outcome.label(),
            narrative: result.narrative.clone(),
            checks_passed: result.checks.iter().filter(|check| check.passed).count(),
            checks_total: result.checks.len(),
            warning_issues: count(Severity::Warning),
            critical_issues: count(Severity::Critical),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionView {
    pub stage_label: &'static str,
    pub kind: IssueKind,
    pub kind_label: &'static str,
    pub severity_label: &'static str,
    pub occurrences: usize,
    pub subjects: Vec<String>,
    pub proposed_resolution: &'static str,
    pub escalate: bool,
}

impl From<&LoanException> for ExceptionView {
    fn from(exception: &LoanException) -> Self {
        Self {
            stage_label: exception.stage.label(),
            kind: exception.kind,
            kind_label: exception.kind.label(),
            severity_label: exception.severity.label(),
            occurrences: exception.occurrences,
            subjects: exception.subjects.clone(),
            proposed_resolution: exception.proposed_resolution,
            escalate: exception.escalate,
        }
    }
}

/// JSON view of a pipeline run returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct LoanReportSummary {
    pub loan_id: LoanId,
    pub borrower_name: String,
    pub loan_type: LoanType,
    pub as_of: NaiveDate,
    pub stages: Vec<StageSummaryView>,
    pub exceptions: Vec<ExceptionView>,
    pub escalation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding: Option<FundingPackage>,
    pub final_status: LoanStatus,
    pub final_status_label: &'static str,
    pub funded: bool,
}

impl LoanReportSummary {
    pub fn from_outcome(outcome: &PipelineOutcome) -> Self {
        Self {
            loan_id: outcome.loan_id.clone(),
            borrower_name: outcome.borrower_name.clone(),
            loan_type: outcome.loan_type,
            as_of: outcome.as_of,
            stages: outcome
                .results
                .iter()
                .map(StageSummaryView::from_result)
                .collect(),
            exceptions: outcome
                .exceptions
                .exceptions
                .iter()
                .map(ExceptionView::from)
                .collect(),
            escalation: outcome.exceptions.escalation,
            funding: outcome.funding.clone(),
            final_status: outcome.final_status,
            final_status_label: outcome.final_status.label(),
            funded: outcome.funded,
        }
    }
}

/// Listing entry for a stored loan file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanSummary {
    pub loan_id: LoanId,
    pub borrower_name: String,
    pub loan_type: LoanType,
    pub loan_amount: f64,
    pub status: LoanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<NaiveDate>,
}

impl From<&LoanRecord> for LoanSummary {
    fn from(record: &LoanRecord) -> Self {
        Self {
            loan_id: record.loan_id.clone(),
            borrower_name: record.borrower.name.clone(),
            loan_type: record.loan_type,
            loan_amount: record.principal,
            status: record.status,
            approval_date: record.approval_date,
        }
    }
}
