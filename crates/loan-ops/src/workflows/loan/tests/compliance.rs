use super::common::*;

use crate::workflows::loan::stages::{
    ComplianceStage, IssueKind, Severity, StageOutcome, COMPLIANCE_RULES,
};

#[test]
fn all_rules_hold_for_a_clean_file() {
    let record = funded_record();
    let prior = prior_results(&record, 2);

    let result = run_stage(&ComplianceStage, &record, &prior);

    assert_eq!(result.outcome, StageOutcome::Passed);
    assert_eq!(result.checks.len(), COMPLIANCE_RULES.len());
    assert!(result.checks.iter().all(|check| check.passed));
}

#[test]
fn each_failed_rule_raises_a_critical_violation() {
    let mut record = funded_record();
    record.compliance.aml_cleared = false;
    record.compliance.ecoa_notice_delivered = false;
    let prior = prior_results(&record, 2);

    let result = run_stage(&ComplianceStage, &record, &prior);

    assert_eq!(result.outcome, StageOutcome::Failed);
    let codes: Vec<&str> = result
        .issues
        .iter()
        .filter_map(|issue| issue.subject.as_deref())
        .collect();
    assert_eq!(codes, ["AML", "ECOA"]);
    assert!(result.issues.iter().all(|issue| {
        issue.kind == IssueKind::ComplianceViolation && issue.severity == Severity::Critical
    }));
}

#[test]
fn kyc_requires_identity_details_not_just_the_attestation() {
    let mut record = funded_record();
    record.borrower.ssn_last4 = Some("48A1".to_string());

    let kyc = COMPLIANCE_RULES
        .iter()
        .find(|rule| rule.code == "KYC")
        .expect("KYC rule present");
    assert!(!kyc.holds(&record));

    record.borrower.ssn_last4 = Some("4821".to_string());
    record.borrower.date_of_birth = None;
    assert!(!kyc.holds(&record));
}

#[test]
fn sign_off_waits_on_verification() {
    let record = expired_and_mismatched_record();
    let prior = prior_results(&record, 2);

    let result = run_stage(&ComplianceStage, &record, &prior);

    assert_eq!(result.outcome, StageOutcome::Blocked);
    assert!(result.checks.iter().all(|check| check.passed));
    assert!(result
        .issues
        .iter()
        .all(|issue| issue.severity == Severity::Info));
}
