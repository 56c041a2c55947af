use super::common::*;

use crate::workflows::loan::catalog::DocumentCatalog;
use crate::workflows::loan::pipeline::PipelineContext;
use crate::workflows::loan::stages::{
    FundingPolicy, FundingStage, IssueKind, Severity, Stage, StageArtifact, StageOutcome,
};

#[test]
fn clean_file_disburses_principal_less_processing_fee() {
    let record = funded_record();
    let prior = prior_results(&record, 4);

    let result = run_stage(&FundingStage, &record, &prior);

    assert_eq!(result.outcome, StageOutcome::Passed);
    let Some(StageArtifact::Funding(package)) = &result.artifact else {
        panic!("funding package expected");
    };
    assert_eq!(package.total_fees, 995.0);
    assert_eq!(package.disbursement_amount, 349_005.0);
    assert!(package
        .conditions
        .iter()
        .any(|condition| condition.contains("deed of trust")));
}

#[test]
fn no_package_when_compliance_failed() {
    let mut record = funded_record();
    record.compliance.tila_disclosure_delivered = false;
    let prior = prior_results(&record, 4);

    let result = run_stage(&FundingStage, &record, &prior);

    assert_eq!(result.outcome, StageOutcome::Blocked);
    assert!(result.artifact.is_none());
}

#[test]
fn blocked_when_upstream_stages_did_not_pass() {
    let record = expired_and_mismatched_record();
    let prior = prior_results(&record, 4);

    let result = run_stage(&FundingStage, &record, &prior);

    assert_eq!(result.outcome, StageOutcome::Blocked);
    assert!(result
        .issues
        .iter()
        .all(|issue| issue.severity == Severity::Info));
}

#[test]
fn disbursement_outside_bounds_is_a_critical_failure() {
    let mut record = funded_record();
    record.principal = 1_500.0;
    let prior = prior_results(&record, 4);

    let result = run_stage(&FundingStage, &record, &prior);

    assert_eq!(result.outcome, StageOutcome::Failed);
    assert!(result.artifact.is_none());
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].kind, IssueKind::FundingBoundsExceeded);
    assert_eq!(result.issues[0].severity, Severity::Critical);
}

#[test]
fn configured_policy_drives_the_fee() {
    let record = funded_record();
    let prior = prior_results(&record, 4);
    let catalog = DocumentCatalog::standard();
    let policy = FundingPolicy {
        processing_fee: 1_250.0,
        ..FundingPolicy::default()
    };
    let context = PipelineContext::new(&record, &catalog, &policy, as_of(), &prior);

    let result = FundingStage.run(&context);

    let Some(StageArtifact::Funding(package)) = &result.artifact else {
        panic!("funding package expected");
    };
    assert_eq!(package.disbursement_amount, 348_750.0);
}
