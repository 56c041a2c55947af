use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::loan::catalog::DocumentCatalog;
use crate::workflows::loan::domain::{
    Borrower, ComplianceAttestations, DocumentKind, LoanId, LoanRecord, LoanStatus, LoanType,
    ReceivedDocument,
};
use crate::workflows::loan::pipeline::PipelineContext;
use crate::workflows::loan::repository::{
    ArchiveError, LoanRepository, ReportArchive, RepositoryError,
};
use crate::workflows::loan::stages::{FundingPolicy, Stage, StageResult};
use crate::workflows::loan::{LoanOperationsService, PipelineRunner};

pub(super) const BORROWER_NAME: &str = "Dana Whitfield";
pub(super) const BORROWER_ADDRESS: &str = "418 Walnut Street, Des Moines, IA 50309";

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn as_of() -> NaiveDate {
    date(2025, 10, 15)
}

pub(super) fn borrower() -> Borrower {
    Borrower {
        name: BORROWER_NAME.to_string(),
        email: Some("dana.whitfield@example.com".to_string()),
        address: BORROWER_ADDRESS.to_string(),
        date_of_birth: Some(date(1986, 4, 12)),
        ssn_last4: Some("4821".to_string()),
    }
}

/// A clean received document: pdf, signed, matching borrower name and address.
pub(super) fn document(kind: &str) -> ReceivedDocument {
    ReceivedDocument {
        kind: DocumentKind::new(kind),
        received_on: date(2025, 9, 20),
        expires_on: None,
        format: Some("pdf".to_string()),
        signed: true,
        borrower_name: Some(BORROWER_NAME.to_string()),
        address: Some(BORROWER_ADDRESS.to_string()),
    }
}

pub(super) fn kinds(values: &[&str]) -> Vec<DocumentKind> {
    values.iter().map(|value| DocumentKind::new(*value)).collect()
}

pub(super) fn all_clear() -> ComplianceAttestations {
    ComplianceAttestations {
        aml_cleared: true,
        kyc_verified: true,
        tila_disclosure_delivered: true,
        ecoa_notice_delivered: true,
    }
}

const MORTGAGE_DOCUMENTS: [&str; 6] = [
    "tax_return",
    "w2",
    "pay_stub",
    "bank_statement",
    "appraisal",
    "title_insurance",
];

/// Every document received and valid, every compliance rule satisfied.
pub(super) fn funded_record() -> LoanRecord {
    LoanRecord {
        loan_id: LoanId("LOAN002".to_string()),
        loan_type: LoanType::Mortgage,
        borrower: borrower(),
        principal: 350_000.0,
        approval_date: Some(date(2025, 9, 15)),
        required_documents: kinds(&MORTGAGE_DOCUMENTS),
        received_documents: MORTGAGE_DOCUMENTS.iter().map(|kind| document(kind)).collect(),
        status: LoanStatus::Collecting,
        compliance: all_clear(),
    }
}

/// Three required documents, nothing received.
pub(super) fn missing_documents_record() -> LoanRecord {
    LoanRecord {
        loan_id: LoanId("LOAN001".to_string()),
        required_documents: kinds(&["tax_return", "title_insurance", "flood_cert"]),
        received_documents: Vec::new(),
        ..funded_record()
    }
}

/// Expired pay stub plus a bank statement carrying a different address.
pub(super) fn expired_and_mismatched_record() -> LoanRecord {
    let mut record = funded_record();
    record.loan_id = LoanId("LOAN003".to_string());
    for document in &mut record.received_documents {
        match document.kind.as_str() {
            "pay_stub" => {
                document.received_on = date(2025, 8, 1);
                document.expires_on = Some(date(2025, 9, 30));
            }
            "bank_statement" => {
                document.address = Some("77 Birch Lane, Ames, IA 50010".to_string());
            }
            _ => {}
        }
    }
    record
}

pub(super) fn catalog() -> DocumentCatalog {
    DocumentCatalog::standard()
}

/// Runs a single stage against a record with the given earlier results.
pub(super) fn run_stage(
    stage: &dyn Stage,
    record: &LoanRecord,
    prior: &[StageResult],
) -> StageResult {
    let catalog = catalog();
    let policy = FundingPolicy::default();
    let context = PipelineContext::new(record, &catalog, &policy, as_of(), prior);
    stage.run(&context)
}

/// Results of every stage before `count`, produced by the standard runner's stages.
pub(super) fn prior_results(record: &LoanRecord, count: usize) -> Vec<StageResult> {
    let outcome = PipelineRunner::default()
        .run(record, as_of())
        .expect("record is well formed");
    outcome.results.into_iter().take(count).collect()
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<BTreeMap<LoanId, LoanRecord>>,
}

impl MemoryRepository {
    pub(super) fn with_records(records: impl IntoIterator<Item = LoanRecord>) -> Self {
        let repository = Self::default();
        {
            let mut guard = repository.records.lock().expect("repository mutex poisoned");
            for record in records {
                guard.insert(record.loan_id.clone(), record);
            }
        }
        repository
    }
}

impl LoanRepository for MemoryRepository {
    fn fetch(&self, id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<LoanRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("repository mutex poisoned")
            .values()
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRepository;

impl LoanRepository for UnavailableRepository {
    fn fetch(&self, _id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("loan share offline".to_string()))
    }

    fn list(&self) -> Result<Vec<LoanRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("loan share offline".to_string()))
    }
}

#[derive(Clone, Default)]
pub(super) struct MemoryArchive {
    reports: Arc<Mutex<Vec<(LoanId, String)>>>,
}

impl MemoryArchive {
    pub(super) fn reports(&self) -> Vec<(LoanId, String)> {
        self.reports.lock().expect("archive mutex poisoned").clone()
    }
}

impl ReportArchive for MemoryArchive {
    fn store(&self, loan_id: &LoanId, markdown: &str) -> Result<Option<String>, ArchiveError> {
        self.reports
            .lock()
            .expect("archive mutex poisoned")
            .push((loan_id.clone(), markdown.to_string()));
        Ok(Some(format!("memory://{loan_id}")))
    }
}

pub(super) fn build_service() -> (
    LoanOperationsService<MemoryRepository, MemoryArchive>,
    MemoryArchive,
) {
    let archive = MemoryArchive::default();
    let repository = MemoryRepository::with_records([
        missing_documents_record(),
        funded_record(),
        expired_and_mismatched_record(),
    ]);
    let service = LoanOperationsService::new(
        Arc::new(repository),
        Arc::new(archive.clone()),
        PipelineRunner::default(),
    );
    (service, archive)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
