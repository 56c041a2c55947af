use serde::Serialize;

use super::communication::BorrowerMessage;
use super::exceptions::ExceptionReport;
use super::funding::FundingPackage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Documents,
    Verification,
    Compliance,
    Exceptions,
    Funding,
    Communication,
}

impl StageName {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Documents,
            Self::Verification,
            Self::Compliance,
            Self::Exceptions,
            Self::Funding,
            Self::Communication,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Documents => "Document Check",
            Self::Verification => "Verification",
            Self::Compliance => "Compliance Review",
            Self::Exceptions => "Exception Analysis",
            Self::Funding => "Funding",
            Self::Communication => "Borrower Communication",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Passed,
    Failed,
    Blocked,
}

impl StageOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::Blocked => "BLOCKED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingDocument,
    ExpiredDocument,
    VerificationFailure,
    ComplianceViolation,
    FundingBoundsExceeded,
    StageBlocked,
}

impl IssueKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingDocument => "Missing document",
            Self::ExpiredDocument => "Expired document",
            Self::VerificationFailure => "Verification failure",
            Self::ComplianceViolation => "Compliance violation",
            Self::FundingBoundsExceeded => "Funding bounds exceeded",
            Self::StageBlocked => "Stage blocked",
        }
    }
}

/// Structured finding attached to a stage result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub detail: String,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        subject: Option<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            subject,
            detail: detail.into(),
        }
    }

    pub fn warning(kind: IssueKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, Some(subject.into()), detail)
    }

    pub fn critical(kind: IssueKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, Severity::Critical, Some(subject.into()), detail)
    }

    pub fn blocked(detail: impl Into<String>) -> Self {
        Self::new(IssueKind::StageBlocked, Severity::Info, None, detail)
    }
}

/// Named pass/fail line item (a document, a rule, a funding gate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

/// Typed payload a stage hands to later stages and the report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageArtifact {
    Exceptions(ExceptionReport),
    Funding(FundingPackage),
    Message(BorrowerMessage),
}

/// Output of exactly one stage; never modified after the stage returns it.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: StageName,
    pub outcome: StageOutcome,
    pub checks: Vec<CheckResult>,
    pub issues: Vec<Issue>,
    pub narrative: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<StageArtifact>,
}

impl StageResult {
    pub fn passed(&self) -> bool {
        self.outcome == StageOutcome::Passed
    }

    pub fn issues_at_least(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(move |issue| issue.severity >= severity)
    }
}
