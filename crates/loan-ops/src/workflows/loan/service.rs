use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::domain::{LoanId, LoanRecord};
use super::pipeline::{PipelineError, PipelineOutcome, PipelineRunner};
use super::report::{render_markdown, LoanSummary, ReportStamp};
use super::repository::{ArchiveError, LoanRepository, ReportArchive, RepositoryError};

/// Service composing the loan repository, the pipeline runner, and the report archive.
pub struct LoanOperationsService<R, A> {
    repository: Arc<R>,
    archive: Arc<A>,
    runner: Arc<PipelineRunner>,
}

/// A finished run together with its rendered report.
#[derive(Debug, Clone)]
pub struct ProcessedLoan {
    pub outcome: PipelineOutcome,
    pub markdown: String,
    pub stored_at: Option<String>,
}

impl<R, A> LoanOperationsService<R, A>
where
    R: LoanRepository + 'static,
    A: ReportArchive + 'static,
{
    pub fn new(repository: Arc<R>, archive: Arc<A>, runner: PipelineRunner) -> Self {
        Self {
            repository,
            archive,
            runner: Arc::new(runner),
        }
    }

    /// Load a stored loan file and run it through the pipeline.
    pub fn process(
        &self,
        loan_id: &LoanId,
        as_of: NaiveDate,
    ) -> Result<ProcessedLoan, LoanServiceError> {
        let record = self
            .repository
            .fetch(loan_id)?
            .ok_or_else(|| LoanServiceError::NotFound(loan_id.clone()))?;
        self.process_record(&record, as_of)
    }

    /// Run an inline loan record that was never stored.
    pub fn process_record(
        &self,
        record: &LoanRecord,
        as_of: NaiveDate,
    ) -> Result<ProcessedLoan, LoanServiceError> {
        let started = Instant::now();
        let outcome = self.runner.run(record, as_of)?;
        let stamp = ReportStamp {
            generated_at: Local::now().naive_local(),
            processing: started.elapsed(),
        };
        let markdown = render_markdown(&outcome, Some(&stamp));
        let stored_at = self.archive.store(&outcome.loan_id, &markdown)?;

        info!(
            loan_id = %outcome.loan_id,
            funded = outcome.funded,
            stored_at = stored_at.as_deref().unwrap_or("-"),
            "loan processed"
        );

        Ok(ProcessedLoan {
            outcome,
            markdown,
            stored_at,
        })
    }

    pub fn summary(&self, loan_id: &LoanId) -> Result<LoanSummary, LoanServiceError> {
        let record = self
            .repository
            .fetch(loan_id)?
            .ok_or_else(|| LoanServiceError::NotFound(loan_id.clone()))?;
        Ok(LoanSummary::from(&record))
    }

    pub fn summaries(&self) -> Result<Vec<LoanSummary>, LoanServiceError> {
        let mut summaries: Vec<LoanSummary> = self
            .repository
            .list()?
            .iter()
            .map(LoanSummary::from)
            .collect();
        summaries.sort_by(|left, right| left.loan_id.cmp(&right.loan_id));
        Ok(summaries)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoanServiceError {
    #[error("loan {0} not found")]
    NotFound(LoanId),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl LoanServiceError {
    /// True when the loan file itself is at fault rather than the service.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Pipeline(PipelineError::Malformed(_))
                | Self::Repository(RepositoryError::Malformed { .. })
                | Self::Archive(ArchiveError::UnsafeLoanId(_))
        )
    }
}
