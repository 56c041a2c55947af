use chrono::NaiveDate;
use loan_ops::workflows::loan::{
    stages::{IssueKind, StageName, StageOutcome},
    FundingPolicy, LoanRecord, LoanStatus, MalformedLoanRecord, MessageTemplate, PipelineError,
    PipelineRunner,
};

fn evaluation_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 15).expect("valid evaluation date")
}

fn sample(name: &str) -> LoanRecord {
    let path = format!(
        "{}/../../sample_loans/{name}.json",
        env!("CARGO_MANIFEST_DIR")
    );
    let file = std::fs::File::open(&path).expect("sample loan file present");
    LoanRecord::from_reader(file).expect("sample loan parses")
}

#[test]
fn missing_documents_keep_the_loan_collecting() {
    let outcome = PipelineRunner::default()
        .run(&sample("LOAN001"), evaluation_date())
        .expect("pipeline completes");

    let documents = outcome
        .result(StageName::Documents)
        .expect("document check ran");
    assert_eq!(documents.outcome, StageOutcome::Failed);
    let missing: Vec<&str> = documents
        .issues
        .iter()
        .filter(|issue| issue.kind == IssueKind::MissingDocument)
        .filter_map(|issue| issue.subject.as_deref())
        .collect();
    assert_eq!(missing, ["tax_return", "title_insurance", "flood_cert"]);

    assert_eq!(outcome.final_status, LoanStatus::Collecting);
    assert!(!outcome.funded);

    let report = outcome.report_markdown();
    assert!(report.contains("Document Check [FAIL]"));
    assert!(report.contains("Federal Tax Return has not been received"));
    assert!(report.contains("Title Insurance Commitment has not been received"));
    assert!(report.contains("Flood Zone Certification has not been received"));
    assert!(report.contains("- **Funded:** false"));
}

#[test]
fn clean_file_funds_principal_less_processing_fee() {
    let policy = FundingPolicy::default();
    let record = sample("LOAN002");

    let outcome = PipelineRunner::new(policy.clone())
        .run(&record, evaluation_date())
        .expect("pipeline completes");

    assert!(outcome.funded);
    assert_eq!(outcome.final_status, LoanStatus::Complete);
    assert_eq!(outcome.previous_status, LoanStatus::ComplianceReview);
    let package = outcome.funding.as_ref().expect("funding package");
    assert_eq!(
        package.disbursement_amount,
        record.principal - policy.processing_fee
    );
    assert_eq!(package.disbursement_amount, 411_505.0);
    assert!(outcome
        .results
        .iter()
        .take(5)
        .all(|result| result.outcome == StageOutcome::Passed));
    assert_eq!(
        outcome.message.as_ref().map(|message| message.template),
        Some(MessageTemplate::FundingComplete)
    );

    let report = outcome.report_markdown();
    assert!(report.contains("## Funding Package"));
    assert!(report.contains("- **Disbursement amount:** $411505.00"));
    assert!(report.contains("- **Funded:** true"));
}

#[test]
fn expired_income_and_address_mismatch_yield_two_exceptions() {
    let outcome = PipelineRunner::default()
        .run(&sample("LOAN003"), evaluation_date())
        .expect("pipeline completes");

    assert_eq!(outcome.exceptions.exceptions.len(), 2);
    assert!(!outcome.exceptions.escalation);
    let kinds: Vec<IssueKind> = outcome
        .exceptions
        .exceptions
        .iter()
        .map(|exception| exception.kind)
        .collect();
    assert_eq!(
        kinds,
        [IssueKind::ExpiredDocument, IssueKind::VerificationFailure]
    );

    let funding = outcome.result(StageName::Funding).expect("funding ran");
    assert_eq!(funding.outcome, StageOutcome::Blocked);
    assert!(outcome.funding.is_none());
    assert!(!outcome.funded);
}

#[test]
fn compliance_violations_escalate_and_hold_funding() {
    let outcome = PipelineRunner::default()
        .run(&sample("LOAN004"), evaluation_date())
        .expect("pipeline completes");

    let compliance = outcome
        .result(StageName::Compliance)
        .expect("compliance ran");
    assert_eq!(compliance.outcome, StageOutcome::Failed);
    assert!(outcome.exceptions.escalation);
    assert_eq!(outcome.final_status, LoanStatus::Exception);
    assert_eq!(
        outcome.message.as_ref().map(|message| message.template),
        Some(MessageTemplate::FundingOnHold)
    );
}

#[test]
fn malformed_record_aborts_before_the_first_stage() {
    let raw = r#"{
        "loan_id": "LOAN900",
        "loan_type": "personal",
        "borrower": { "name": "Sam Ortiz", "address": "1 Main St" },
        "principal": 15000.0,
        "required_documents": ["pay_stub", "pay_stub"]
    }"#;

    let error = LoanRecord::from_json_str(raw).expect_err("duplicate requirement");
    assert!(matches!(
        error,
        MalformedLoanRecord::DuplicateRequiredDocument(_)
    ));

    let mut record = sample("LOAN002");
    record.required_documents.push(record.required_documents[0].clone());
    let error = PipelineRunner::default()
        .run(&record, evaluation_date())
        .expect_err("runner validates first");
    assert!(matches!(error, PipelineError::Malformed(_)));
}

#[test]
fn unknown_loan_type_fails_to_parse() {
    let raw = r#"{
        "loan_id": "LOAN901",
        "loan_type": "boat",
        "borrower": { "name": "Sam Ortiz", "address": "1 Main St" },
        "principal": 15000.0
    }"#;

    assert!(matches!(
        LoanRecord::from_json_str(raw),
        Err(MalformedLoanRecord::Parse(_))
    ));
}
