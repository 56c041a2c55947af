use chrono::NaiveDate;
use loan_ops::workflows::loan::{
    ArchiveError, LoanId, LoanRecord, LoanRepository, ReportArchive, RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) loans_dir: PathBuf,
}

/// Loan files stored as `<dir>/<loan_id>.json`.
#[derive(Debug, Clone)]
pub(crate) struct DirectoryLoanRepository {
    dir: PathBuf,
}

impl DirectoryLoanRepository {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, id: &LoanId) -> Option<[PathBuf; 2]> {
        if !id.is_path_safe() {
            return None;
        }
        Some([self.dir.join(format!("{id}.json")), self.dir.join(&id.0)])
    }
}

fn read_record(path: &Path, loan_id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError> {
    match fs::File::open(path) {
        Ok(file) => LoanRecord::from_reader(file)
            .map(Some)
            .map_err(|source| RepositoryError::Malformed {
                loan_id: loan_id.clone(),
                source,
            }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(RepositoryError::Unavailable(format!(
            "{}: {err}",
            path.display()
        ))),
    }
}

impl LoanRepository for DirectoryLoanRepository {
    fn fetch(&self, id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError> {
        let Some(candidates) = self.candidates(id) else {
            return Ok(None);
        };
        for path in candidates {
            if path.is_file() {
                return read_record(&path, id);
            }
        }
        Ok(None)
    }

    fn list(&self) -> Result<Vec<LoanRecord>, RepositoryError> {
        let mut records = Vec::new();
        for path in loan_files(&self.dir)? {
            let loan_id = LoanId(
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            match read_record(&path, &loan_id) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(error) => warn!(path = %path.display(), %error, "skipping loan file"),
            }
        }
        records.sort_by(|left, right| left.loan_id.cmp(&right.loan_id));
        Ok(records)
    }
}

/// JSON files in the loan directory; a missing directory holds no loans.
pub(crate) fn loan_files(dir: &Path) -> Result<Vec<PathBuf>, RepositoryError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(RepositoryError::Unavailable(format!(
                "{}: {err}",
                dir.display()
            )))
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json")
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Writes reports to `<dir>/<loan_id>_operations_report.md`.
#[derive(Debug, Clone)]
pub(crate) struct FileReportArchive {
    dir: PathBuf,
}

impl FileReportArchive {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub(crate) fn report_path(&self, loan_id: &LoanId) -> PathBuf {
        self.dir.join(format!("{loan_id}_operations_report.md"))
    }
}

impl ReportArchive for FileReportArchive {
    fn store(&self, loan_id: &LoanId, markdown: &str) -> Result<Option<String>, ArchiveError> {
        if !loan_id.is_path_safe() {
            return Err(ArchiveError::UnsafeLoanId(loan_id.clone()));
        }
        let unavailable = |err: std::io::Error| {
            ArchiveError::Unavailable(format!("{}: {err}", self.dir.display()))
        };
        fs::create_dir_all(&self.dir).map_err(unavailable)?;
        let path = self.report_path(loan_id);
        fs::write(&path, markdown).map_err(unavailable)?;
        Ok(Some(path.display().to_string()))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
