use serde::{Deserialize, Serialize};

use super::super::domain::LoanId;
use super::super::pipeline::PipelineContext;
use super::result::{
    CheckResult, Issue, IssueKind, Severity, StageArtifact, StageName, StageOutcome, StageResult,
};
use super::Stage;

const DEFAULT_PROCESSING_FEE: f64 = 995.0;
const DEFAULT_MINIMUM_DISBURSEMENT: f64 = 1_000.0;
const DEFAULT_MAXIMUM_DISBURSEMENT: f64 = 2_000_000.0;

/// Fee and disbursement bounds applied by the funding stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingPolicy {
    pub processing_fee: f64,
    pub minimum_disbursement: f64,
    pub maximum_disbursement: f64,
}

impl Default for FundingPolicy {
    fn default() -> Self {
        Self {
            processing_fee: DEFAULT_PROCESSING_FEE,
            minimum_disbursement: DEFAULT_MINIMUM_DISBURSEMENT,
            maximum_disbursement: DEFAULT_MAXIMUM_DISBURSEMENT,
        }
    }
}

impl FundingPolicy {
    pub fn fees(&self) -> Vec<FeeLine> {
        vec![FeeLine {
            name: "Processing fee".to_string(),
            amount: self.processing_fee,
        }]
    }

    pub fn within_bounds(&self, disbursement: f64) -> bool {
        disbursement >= self.minimum_disbursement && disbursement <= self.maximum_disbursement
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeLine {
    pub name: String,
    pub amount: f64,
}

/// Disbursement artifact, produced only when the loan clears every gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingPackage {
    pub loan_id: LoanId,
    pub principal: f64,
    pub fees: Vec<FeeLine>,
    pub total_fees: f64,
    pub disbursement_amount: f64,
    pub conditions: Vec<String>,
}

/// Computes the disbursement once compliance and exception analysis allow it.
#[derive(Debug, Default)]
pub struct FundingStage;

impl Stage for FundingStage {
    fn name(&self) -> StageName {
        StageName::Funding
    }

    fn run(&self, context: &PipelineContext<'_>) -> StageResult {
        let record = context.record;
        let policy = context.policy;
        let compliance_passed = context.passed(StageName::Compliance);
        let exceptions = context.exception_report();
        let critical_open = exceptions
            .map(|report| report.has_critical())
            .unwrap_or(false);

        let mut checks = vec![
            CheckResult::new(
                "compliance cleared",
                compliance_passed,
                if compliance_passed {
                    "compliance review passed"
                } else {
                    "compliance review has not passed"
                },
            ),
            CheckResult::new(
                "no critical exceptions",
                !critical_open,
                if critical_open {
                    "unresolved critical exception on file"
                } else {
                    "no critical exceptions on file"
                },
            ),
        ];

        if !compliance_passed || critical_open {
            let reason = if !compliance_passed {
                "funding is blocked because compliance review has not passed"
            } else {
                "funding is blocked by an unresolved critical exception"
            };
            return StageResult {
                stage: StageName::Funding,
                outcome: StageOutcome::Blocked,
                checks,
                issues: vec![Issue::blocked(reason)],
                narrative: format!("No funding package created: {reason}."),
                artifact: None,
            };
        }

        let fees = policy.fees();
        let total_fees: f64 = fees.iter().map(|fee| fee.amount).sum();
        let disbursement_amount = record.principal - total_fees;
        let within_bounds = policy.within_bounds(disbursement_amount);

        checks.push(CheckResult::new(
            "disbursement within bounds",
            within_bounds,
            format!(
                "${:.2} against bounds ${:.2} - ${:.2}",
                disbursement_amount, policy.minimum_disbursement, policy.maximum_disbursement
            ),
        ));

        if !within_bounds {
            let detail = format!(
                "disbursement ${:.2} falls outside the permitted range ${:.2} - ${:.2}",
                disbursement_amount, policy.minimum_disbursement, policy.maximum_disbursement
            );
            return StageResult {
                stage: StageName::Funding,
                outcome: StageOutcome::Failed,
                checks,
                issues: vec![Issue::critical(
                    IssueKind::FundingBoundsExceeded,
                    "disbursement",
                    detail.clone(),
                )],
                narrative: format!("Funding rejected: {detail}."),
                artifact: None,
            };
        }

        let mut conditions: Vec<String> = record
            .loan_type
            .closing_conditions()
            .into_iter()
            .map(str::to_string)
            .collect();
        if let Some(report) = exceptions {
            conditions.extend(
                report
                    .exceptions
                    .iter()
                    .filter(|exception| exception.severity == Severity::Warning)
                    .map(|exception| {
                        format!(
                            "Resolve {} before closing: {}",
                            exception.kind.label().to_lowercase(),
                            exception.proposed_resolution
                        )
                    }),
            );
        }

        let package = FundingPackage {
            loan_id: record.loan_id.clone(),
            principal: record.principal,
            fees,
            total_fees,
            disbursement_amount,
            conditions,
        };

        StageResult {
            stage: StageName::Funding,
            outcome: StageOutcome::Passed,
            checks,
            issues: Vec::new(),
            narrative: format!(
                "Funding package ready: ${:.2} principal less ${:.2} in fees disburses ${:.2}.",
                package.principal, package.total_fees, package.disbursement_amount
            ),
            artifact: Some(StageArtifact::Funding(package)),
        }
    }
}
