use std::fmt;

use super::super::domain::LoanRecord;
use super::super::pipeline::PipelineContext;
use super::result::{CheckResult, Issue, IssueKind, StageName, StageOutcome, StageResult};
use super::Stage;

/// Named regulatory predicate over a loan record.
#[derive(Clone, Copy)]
pub struct ComplianceRule {
    pub code: &'static str,
    pub title: &'static str,
    pub failure: &'static str,
    predicate: fn(&LoanRecord) -> bool,
}

impl fmt::Debug for ComplianceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceRule")
            .field("code", &self.code)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl ComplianceRule {
    pub fn holds(&self, record: &LoanRecord) -> bool {
        (self.predicate)(record)
    }
}

pub const COMPLIANCE_RULES: [ComplianceRule; 4] = [
    ComplianceRule {
        code: "AML",
        title: "Anti-money-laundering screening",
        failure: "AML screening has not cleared the borrower",
        predicate: aml_cleared,
    },
    ComplianceRule {
        code: "KYC",
        title: "Know-your-customer identity verification",
        failure: "borrower identity is not fully verified (KYC attestation, date of birth and SSN last four required)",
        predicate: kyc_complete,
    },
    ComplianceRule {
        code: "TILA",
        title: "Truth in Lending disclosure",
        failure: "TILA disclosure has not been delivered to the borrower",
        predicate: tila_disclosed,
    },
    ComplianceRule {
        code: "ECOA",
        title: "Equal Credit Opportunity Act notice",
        failure: "ECOA notice has not been delivered to the borrower",
        predicate: ecoa_noticed,
    },
];

fn aml_cleared(record: &LoanRecord) -> bool {
    record.compliance.aml_cleared
}

fn kyc_complete(record: &LoanRecord) -> bool {
    let ssn_ok = record
        .borrower
        .ssn_last4
        .as_deref()
        .map(|digits| digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false);

    record.compliance.kyc_verified && record.borrower.date_of_birth.is_some() && ssn_ok
}

fn tila_disclosed(record: &LoanRecord) -> bool {
    record.compliance.tila_disclosure_delivered
}

fn ecoa_noticed(record: &LoanRecord) -> bool {
    record.compliance.ecoa_notice_delivered
}

/// Evaluates the regulatory rule table.
#[derive(Debug, Default)]
pub struct ComplianceStage;

impl Stage for ComplianceStage {
    fn name(&self) -> StageName {
        StageName::Compliance
    }

    fn run(&self, context: &PipelineContext<'_>) -> StageResult {
        let record = context.record;

        let mut checks = Vec::with_capacity(COMPLIANCE_RULES.len());
        let mut issues = Vec::new();

        for rule in &COMPLIANCE_RULES {
            let holds = rule.holds(record);
            let detail = if holds { rule.title } else { rule.failure };
            checks.push(CheckResult::new(rule.code, holds, detail));
            if !holds {
                issues.push(Issue::critical(
                    IssueKind::ComplianceViolation,
                    rule.code,
                    rule.failure,
                ));
            }
        }

        let violations = issues.len();
        let (outcome, narrative) = if violations > 0 {
            let codes: Vec<&str> = checks
                .iter()
                .filter(|check| !check.passed)
                .map(|check| check.name.as_str())
                .collect();
            (
                StageOutcome::Failed,
                format!(
                    "{} of {} compliance rules failed ({}).",
                    violations,
                    COMPLIANCE_RULES.len(),
                    codes.join(", ")
                ),
            )
        } else if !context.passed(StageName::Verification) {
            issues.push(Issue::blocked(
                "compliance sign-off is blocked until verification passes",
            ));
            (
                StageOutcome::Blocked,
                "All compliance rules hold, but sign-off waits on document verification."
                    .to_string(),
            )
        } else {
            (
                StageOutcome::Passed,
                format!("All {} compliance rules satisfied.", COMPLIANCE_RULES.len()),
            )
        };

        StageResult {
            stage: StageName::Compliance,
            outcome,
            checks,
            issues,
            narrative,
            artifact: None,
        }
    }
}
