//! The six pipeline stages and the result types they exchange.
//!
//! Each stage is a [`Stage`] implementation: a synchronous function from the
//! accumulated [`PipelineContext`] to a [`StageResult`]. Stages never mutate the
//! loan record and never perform I/O.

mod communication;
mod compliance;
mod documents;
mod exceptions;
mod funding;
mod result;
mod verification;

pub use communication::{BorrowerMessage, CommunicationStage, MessageTemplate};
pub use compliance::{ComplianceRule, ComplianceStage, COMPLIANCE_RULES};
pub use documents::{check_documents, DocumentCheckStage, DocumentFindings, ExpiredDocument};
pub use exceptions::{
    analyze_issues, resolution_for, ExceptionReport, ExceptionStage, LoanException,
    ESCALATION_WARNING_THRESHOLD,
};
pub use funding::{FeeLine, FundingPackage, FundingPolicy, FundingStage};
pub use result::{
    CheckResult, Issue, IssueKind, Severity, StageArtifact, StageName, StageOutcome, StageResult,
};
pub use verification::{VerificationRule, VerificationStage};

use super::pipeline::PipelineContext;

/// Capability shared by every pipeline step, including externally backed runners.
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    fn run(&self, context: &PipelineContext<'_>) -> StageResult;
}
