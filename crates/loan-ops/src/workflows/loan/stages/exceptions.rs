use serde::Serialize;
use std::collections::HashMap;

use super::super::pipeline::PipelineContext;
use super::result::{
    CheckResult, Issue, IssueKind, Severity, StageArtifact, StageName, StageOutcome, StageResult,
};
use super::Stage;

/// Same-kind warnings at or above this count force escalation.
pub const ESCALATION_WARNING_THRESHOLD: usize = 3;

/// Proposed resolution for each issue kind.
pub const fn resolution_for(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::MissingDocument => {
            "Request the outstanding documents from the borrower and reprocess once received."
        }
        IssueKind::ExpiredDocument => {
            "Obtain a current replacement; expired documents cannot support funding."
        }
        IssueKind::VerificationFailure => {
            "Reconcile the document against the borrower record or request a corrected copy."
        }
        IssueKind::ComplianceViolation => {
            "Route to the compliance officer; no funding activity until the rule is satisfied."
        }
        IssueKind::FundingBoundsExceeded => {
            "Adjust the loan terms or obtain credit committee approval for the disbursement."
        }
        IssueKind::StageBlocked => "Resolve the upstream stage and reprocess.",
    }
}

/// Aggregated, deduplicated issue that needs resolution before funding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanException {
    pub stage: StageName,
    pub kind: IssueKind,
    pub severity: Severity,
    pub occurrences: usize,
    pub subjects: Vec<String>,
    pub detail: String,
    pub proposed_resolution: &'static str,
    pub escalate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionReport {
    pub exceptions: Vec<LoanException>,
    pub escalation: bool,
    pub critical_issues: usize,
    pub warning_issues: usize,
}

impl ExceptionReport {
    pub fn has_critical(&self) -> bool {
        self.exceptions
            .iter()
            .any(|exception| exception.severity == Severity::Critical)
    }
}

/// Deduplicate issues by (stage, kind) and decide escalation.
///
/// Issues below `Warning` are ignored. Escalation is raised by any critical
/// issue, or by `ESCALATION_WARNING_THRESHOLD` warnings of the same kind
/// counted before deduplication.
pub fn analyze_issues<'a, I>(issues: I) -> ExceptionReport
where
    I: IntoIterator<Item = (StageName, &'a Issue)>,
{
    let mut exceptions: Vec<LoanException> = Vec::new();
    let mut warnings_by_kind: HashMap<IssueKind, usize> = HashMap::new();
    let mut critical_issues = 0;
    let mut warning_issues = 0;

    for (stage, issue) in issues {
        match issue.severity {
            Severity::Info => continue,
            Severity::Warning => {
                warning_issues += 1;
                *warnings_by_kind.entry(issue.kind).or_default() += 1;
            }
            Severity::Critical => critical_issues += 1,
        }

        match exceptions
            .iter_mut()
            .find(|exception| exception.stage == stage && exception.kind == issue.kind)
        {
            Some(existing) => {
                existing.occurrences += 1;
                existing.severity = existing.severity.max(issue.severity);
                if let Some(subject) = &issue.subject {
                    if !existing.subjects.contains(subject) {
                        existing.subjects.push(subject.clone());
                    }
                }
            }
            None => exceptions.push(LoanException {
                stage,
                kind: issue.kind,
                severity: issue.severity,
                occurrences: 1,
                subjects: issue.subject.iter().cloned().collect(),
                detail: issue.detail.clone(),
                proposed_resolution: resolution_for(issue.kind),
                escalate: false,
            }),
        }
    }

    for exception in &mut exceptions {
        let same_kind_warnings = warnings_by_kind
            .get(&exception.kind)
            .copied()
            .unwrap_or_default();
        exception.escalate = exception.severity == Severity::Critical
            || same_kind_warnings >= ESCALATION_WARNING_THRESHOLD;
    }

    let escalation = critical_issues > 0
        || warnings_by_kind
            .values()
            .any(|count| *count >= ESCALATION_WARNING_THRESHOLD);

    ExceptionReport {
        exceptions,
        escalation,
        critical_issues,
        warning_issues,
    }
}

/// Collects warning and critical issues from earlier stages into exceptions.
#[derive(Debug, Default)]
pub struct ExceptionStage;

impl Stage for ExceptionStage {
    fn name(&self) -> StageName {
        StageName::Exceptions
    }

    fn run(&self, context: &PipelineContext<'_>) -> StageResult {
        let report = analyze_issues(context.results().iter().flat_map(|result| {
            result
                .issues_at_least(Severity::Warning)
                .map(move |issue| (result.stage, issue))
        }));

        let checks = report
            .exceptions
            .iter()
            .map(|exception| {
                CheckResult::new(
                    format!("{}: {}", exception.stage.label(), exception.kind.label()),
                    false,
                    format!(
                        "{} occurrence(s), {}{}",
                        exception.occurrences,
                        exception.severity.label().to_lowercase(),
                        if exception.escalate { ", escalated" } else { "" }
                    ),
                )
            })
            .collect();

        let (outcome, narrative) = if report.exceptions.is_empty() {
            (
                StageOutcome::Passed,
                "No exceptions raised by earlier stages.".to_string(),
            )
        } else {
            (
                StageOutcome::Failed,
                format!(
                    "{} exception(s) from {} warning and {} critical issue(s); escalation {}.",
                    report.exceptions.len(),
                    report.warning_issues,
                    report.critical_issues,
                    if report.escalation {
                        "required"
                    } else {
                        "not required"
                    }
                ),
            )
        };

        StageResult {
            stage: StageName::Exceptions,
            outcome,
            checks,
            issues: Vec::new(),
            narrative,
            artifact: Some(StageArtifact::Exceptions(report)),
        }
    }
}
