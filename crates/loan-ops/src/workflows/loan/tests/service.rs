use super::common::*;
use std::sync::Arc;

use crate::workflows::loan::domain::{LoanId, LoanStatus};
use crate::workflows::loan::{LoanOperationsService, LoanServiceError, PipelineRunner};

#[test]
fn process_runs_stored_loan_and_archives_the_report() {
    let (service, archive) = build_service();

    let processed = service
        .process(&LoanId("LOAN002".to_string()), as_of())
        .expect("loan processes");

    assert!(processed.outcome.funded);
    assert_eq!(processed.stored_at.as_deref(), Some("memory://LOAN002"));
    assert!(processed.markdown.contains("_Generated "));
    let reports = archive.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, LoanId("LOAN002".to_string()));
}

#[test]
fn unknown_loan_is_not_found() {
    let (service, archive) = build_service();

    let error = service
        .process(&LoanId("LOAN999".to_string()), as_of())
        .expect_err("unknown loan");

    assert!(matches!(error, LoanServiceError::NotFound(_)));
    assert!(archive.reports().is_empty());
}

#[test]
fn inline_malformed_record_is_flagged_as_malformed() {
    let (service, _) = build_service();
    let mut record = funded_record();
    record.principal = 0.0;

    let error = service
        .process_record(&record, as_of())
        .expect_err("zero principal");

    assert!(error.is_malformed());
}

#[test]
fn summaries_are_sorted_by_loan_id() {
    let (service, _) = build_service();

    let summaries = service.summaries().expect("summaries");

    let ids: Vec<&str> = summaries
        .iter()
        .map(|summary| summary.loan_id.0.as_str())
        .collect();
    assert_eq!(ids, ["LOAN001", "LOAN002", "LOAN003"]);
    assert_eq!(summaries[1].loan_amount, 350_000.0);
    assert_eq!(summaries[1].status, LoanStatus::Collecting);
}

#[test]
fn repository_outage_surfaces_as_error() {
    let service = LoanOperationsService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryArchive::default()),
        PipelineRunner::default(),
    );

    let error = service.summaries().expect_err("repository offline");

    assert!(matches!(error, LoanServiceError::Repository(_)));
    assert!(!error.is_malformed());
}
