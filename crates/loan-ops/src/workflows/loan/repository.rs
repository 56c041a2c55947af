use super::domain::{LoanId, LoanRecord, MalformedLoanRecord};

/// Source of loan files so the service can be exercised without a filesystem.
pub trait LoanRepository: Send + Sync {
    fn fetch(&self, id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError>;

    /// Every well-formed loan file; malformed entries are skipped by implementations.
    fn list(&self) -> Result<Vec<LoanRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("loan file {loan_id} is malformed: {source}")]
    Malformed {
        loan_id: LoanId,
        #[source]
        source: MalformedLoanRecord,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Destination for rendered reports (a directory, an object store, a test double).
pub trait ReportArchive: Send + Sync {
    /// Returns the location the report was written to, if the archive has one.
    fn store(&self, loan_id: &LoanId, markdown: &str) -> Result<Option<String>, ArchiveError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("loan id {0:?} cannot name a report file")]
    UnsafeLoanId(LoanId),
    #[error("report archive unavailable: {0}")]
    Unavailable(String),
}

/// Archive that keeps nothing; used when reports are only returned to the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardArchive;

impl ReportArchive for DiscardArchive {
    fn store(&self, _loan_id: &LoanId, _markdown: &str) -> Result<Option<String>, ArchiveError> {
        Ok(None)
    }
}
