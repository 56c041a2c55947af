//! Post-approval loan operations.
//!
//! A loan file moves through six fixed stages (document check, verification,
//! compliance review, exception analysis, funding, borrower communication). Each
//! stage returns a structured result; the runner drives the loan status state
//! machine from those results and the report module renders the outcome.

pub mod catalog;
pub mod domain;
pub mod pipeline;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod stages;

#[cfg(test)]
mod tests;

pub use catalog::{DocumentCatalog, DocumentCategory, DocumentTemplate};
pub use domain::{
    Borrower, ComplianceAttestations, DocumentKind, LoanId, LoanRecord, LoanStatus, LoanType,
    MalformedLoanRecord, ReceivedDocument, StatusTrail, TransitionError,
};
pub use pipeline::{PipelineContext, PipelineError, PipelineOutcome, PipelineRunner};
pub use report::{render_markdown, LoanReportSummary, LoanSummary, ReportStamp};
pub use repository::{ArchiveError, DiscardArchive, LoanRepository, ReportArchive, RepositoryError};
pub use router::{loan_router, ProcessRequest};
pub use service::{LoanOperationsService, LoanServiceError, ProcessedLoan};
pub use stages::{
    BorrowerMessage, FundingPackage, FundingPolicy, Issue, IssueKind, MessageTemplate, Severity,
    Stage, StageName, StageOutcome, StageResult,
};
