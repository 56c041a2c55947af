use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::catalog::DocumentCatalog;
use super::domain::{
    LoanId, LoanRecord, LoanStatus, LoanType, MalformedLoanRecord, StatusTrail, TransitionError,
};
use super::report::{render_markdown, LoanReportSummary};
use super::stages::{
    BorrowerMessage, CommunicationStage, ComplianceStage, DocumentCheckStage, ExceptionReport,
    ExceptionStage, FundingPackage, FundingPolicy, FundingStage, Stage, StageArtifact, StageName,
    StageResult, VerificationStage,
};

/// Read-only view handed to each stage: the record plus every earlier result.
pub struct PipelineContext<'a> {
    pub record: &'a LoanRecord,
    pub catalog: &'a DocumentCatalog,
    pub policy: &'a FundingPolicy,
    pub as_of: NaiveDate,
    results: &'a [StageResult],
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        record: &'a LoanRecord,
        catalog: &'a DocumentCatalog,
        policy: &'a FundingPolicy,
        as_of: NaiveDate,
        results: &'a [StageResult],
    ) -> Self {
        Self {
            record,
            catalog,
            policy,
            as_of,
            results,
        }
    }

    pub fn results(&self) -> &'a [StageResult] {
        self.results
    }

    pub fn result(&self, stage: StageName) -> Option<&'a StageResult> {
        self.results.iter().find(|result| result.stage == stage)
    }

    /// False when the stage failed, was blocked, or has not run yet.
    pub fn passed(&self, stage: StageName) -> bool {
        self.result(stage)
            .map(StageResult::passed)
            .unwrap_or(false)
    }

    pub fn exception_report(&self) -> Option<&'a ExceptionReport> {
        self.results
            .iter()
            .find_map(|result| match &result.artifact {
                Some(StageArtifact::Exceptions(report)) => Some(report),
                _ => None,
            })
    }

    pub fn funding_package(&self) -> Option<&'a FundingPackage> {
        self.results
            .iter()
            .find_map(|result| match &result.artifact {
                Some(StageArtifact::Funding(package)) => Some(package),
                _ => None,
            })
    }
}

/// Fatal pipeline errors; recoverable findings travel as issues instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("malformed loan record: {0}")]
    Malformed(#[from] MalformedLoanRecord),
    #[error("stage runner for {expected:?} returned a result labelled {returned:?}")]
    StageContract {
        expected: StageName,
        returned: StageName,
    },
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

/// Fixed six-stage pipeline. Stage runners may be swapped for externally backed ones.
pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
    catalog: DocumentCatalog,
    policy: FundingPolicy,
}

impl PipelineRunner {
    pub fn new(policy: FundingPolicy) -> Self {
        Self {
            stages: vec![
                Box::new(DocumentCheckStage),
                Box::new(VerificationStage),
                Box::new(ComplianceStage),
                Box::new(ExceptionStage),
                Box::new(FundingStage),
                Box::new(CommunicationStage),
            ],
            catalog: DocumentCatalog::standard(),
            policy,
        }
    }

    /// Replace the runner occupying the slot named by `stage.name()`.
    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        let name = stage.name();
        if let Some(slot) = self.stages.iter_mut().find(|slot| slot.name() == name) {
            *slot = stage;
        }
        self
    }

    pub fn run(
        &self,
        record: &LoanRecord,
        as_of: NaiveDate,
    ) -> Result<PipelineOutcome, PipelineError> {
        if let Err(error) = record.validate(&self.catalog) {
            warn!(loan_id = %record.loan_id, %error, "rejecting malformed loan record");
            return Err(error.into());
        }

        let mut results: Vec<StageResult> = Vec::with_capacity(self.stages.len());
        for (expected, stage) in StageName::ordered().into_iter().zip(&self.stages) {
            let context =
                PipelineContext::new(record, &self.catalog, &self.policy, as_of, &results);
            let result = stage.run(&context);
            if result.stage != expected {
                return Err(PipelineError::StageContract {
                    expected,
                    returned: result.stage,
                });
            }
            info!(
                loan_id = %record.loan_id,
                stage = expected.label(),
                outcome = result.outcome.label(),
                issues = result.issues.len(),
                "stage complete"
            );
            results.push(result);
        }

        let status_trail = status_trail(&results)?;
        let final_status = status_trail.current();

        let exceptions = results
            .iter()
            .find_map(|result| match &result.artifact {
                Some(StageArtifact::Exceptions(report)) => Some(report.clone()),
                _ => None,
            })
            .unwrap_or_default();
        let funding = results.iter().find_map(|result| match &result.artifact {
            Some(StageArtifact::Funding(package)) => Some(package.clone()),
            _ => None,
        });
        let message = results.iter().find_map(|result| match &result.artifact {
            Some(StageArtifact::Message(message)) => Some(message.clone()),
            _ => None,
        });
        let funded = funding.is_some();

        info!(
            loan_id = %record.loan_id,
            final_status = final_status.label(),
            funded,
            escalation = exceptions.escalation,
            "pipeline complete"
        );

        Ok(PipelineOutcome {
            loan_id: record.loan_id.clone(),
            borrower_name: record.borrower.name.clone(),
            loan_type: record.loan_type,
            principal: record.principal,
            as_of,
            previous_status: record.status,
            results,
            exceptions,
            funding,
            message,
            final_status,
            status_trail,
            funded,
        })
    }
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new(FundingPolicy::default())
    }
}

fn status_trail(results: &[StageResult]) -> Result<StatusTrail, TransitionError> {
    let passed = |stage: StageName| {
        results
            .iter()
            .find(|result| result.stage == stage)
            .map(StageResult::passed)
            .unwrap_or(false)
    };

    let mut trail = StatusTrail::start();

    if !passed(StageName::Documents) {
        trail.advance(LoanStatus::Exception)?;
        trail.advance(LoanStatus::Collecting)?;
        return Ok(trail);
    }

    trail.advance(LoanStatus::Verifying)?;
    if !passed(StageName::Verification) {
        trail.advance(LoanStatus::Exception)?;
        trail.advance(LoanStatus::Verifying)?;
        return Ok(trail);
    }

    trail.advance(LoanStatus::ComplianceReview)?;
    if !passed(StageName::Compliance) {
        trail.advance(LoanStatus::Exception)?;
        return Ok(trail);
    }

    trail.advance(LoanStatus::Funding)?;
    if !passed(StageName::Funding) {
        trail.advance(LoanStatus::Exception)?;
        return Ok(trail);
    }

    trail.advance(LoanStatus::Complete)?;
    Ok(trail)
}

/// Everything one run produced, in stage order.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub loan_id: LoanId,
    pub borrower_name: String,
    pub loan_type: LoanType,
    pub principal: f64,
    pub as_of: NaiveDate,
    pub previous_status: LoanStatus,
    pub results: Vec<StageResult>,
    pub exceptions: ExceptionReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding: Option<FundingPackage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<BorrowerMessage>,
    pub final_status: LoanStatus,
    pub status_trail: StatusTrail,
    pub funded: bool,
}

impl PipelineOutcome {
    pub fn result(&self, stage: StageName) -> Option<&StageResult> {
        self.results.iter().find(|result| result.stage == stage)
    }

    pub fn summary(&self) -> LoanReportSummary {
        LoanReportSummary::from_outcome(self)
    }

    pub fn report_markdown(&self) -> String {
        render_markdown(self, None)
    }
}
