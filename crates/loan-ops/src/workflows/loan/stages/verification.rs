use super::super::catalog::DocumentCatalog;
use super::super::domain::{Borrower, ReceivedDocument};
use super::super::pipeline::PipelineContext;
use super::result::{CheckResult, Issue, IssueKind, StageName, StageOutcome, StageResult};
use super::Stage;

const ACCEPTED_FORMATS: [&str; 5] = ["pdf", "png", "jpg", "jpeg", "tiff"];

/// Validity rules applied to every received document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationRule {
    Format,
    Signature,
    BorrowerName,
    Address,
}

impl VerificationRule {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Format,
            Self::Signature,
            Self::BorrowerName,
            Self::Address,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Signature => "signature",
            Self::BorrowerName => "borrower name",
            Self::Address => "address",
        }
    }

    /// Returns the failure detail, or `None` when the document satisfies the rule.
    pub fn evaluate(
        self,
        document: &ReceivedDocument,
        borrower: &Borrower,
        catalog: &DocumentCatalog,
    ) -> Option<String> {
        let label = catalog.label_for(&document.kind);
        match self {
            Self::Format => match document.format.as_deref() {
                None => Some(format!("{label} has no recorded file format")),
                Some(format) => {
                    let normalized = format.trim().trim_start_matches('.').to_ascii_lowercase();
                    if ACCEPTED_FORMATS.contains(&normalized.as_str()) {
                        None
                    } else {
                        Some(format!("{label} has unsupported format '{format}'"))
                    }
                }
            },
            Self::Signature => {
                if catalog.requires_signature(&document.kind) && !document.signed {
                    Some(format!("{label} is missing the borrower signature"))
                } else {
                    None
                }
            }
            Self::BorrowerName => match document.borrower_name.as_deref() {
                Some(name) if normalize_name(name) != normalize_name(&borrower.name) => Some(
                    format!("{label} is issued to '{name}', not '{}'", borrower.name),
                ),
                _ => None,
            },
            Self::Address => match document.address.as_deref() {
                Some(address) if normalize_address(address) != normalize_address(&borrower.address) => {
                    Some(format!(
                        "address on {label} does not match the borrower address on file"
                    ))
                }
                _ => None,
            },
        }
    }
}

fn normalize_name(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_address(value: &str) -> String {
    let stripped: String = value
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalize_name(&stripped)
}

/// Checks each received document for format, signature and consistency with the borrower.
#[derive(Debug, Default)]
pub struct VerificationStage;

impl Stage for VerificationStage {
    fn name(&self) -> StageName {
        StageName::Verification
    }

    fn run(&self, context: &PipelineContext<'_>) -> StageResult {
        let record = context.record;
        let documents_passed = context.passed(StageName::Documents);

        let mut checks = Vec::with_capacity(record.received_documents.len());
        let mut issues = Vec::new();

        for document in &record.received_documents {
            let failures: Vec<String> = VerificationRule::ordered()
                .into_iter()
                .filter_map(|rule| rule.evaluate(document, &record.borrower, context.catalog))
                .collect();

            let detail = if failures.is_empty() {
                "format, signature and borrower data consistent".to_string()
            } else {
                failures.join("; ")
            };
            checks.push(CheckResult::new(
                document.kind.as_str(),
                failures.is_empty(),
                detail,
            ));

            for failure in failures {
                issues.push(Issue::warning(
                    IssueKind::VerificationFailure,
                    document.kind.as_str(),
                    failure,
                ));
            }
        }

        let failed_documents = checks.iter().filter(|check| !check.passed).count();

        let (outcome, narrative) = if !documents_passed {
            issues.push(Issue::blocked(
                "verification is blocked until the document check passes",
            ));
            (
                StageOutcome::Blocked,
                format!(
                    "Verification blocked pending document collection; {} of {} received document(s) failed preliminary checks.",
                    failed_documents,
                    checks.len()
                ),
            )
        } else if failed_documents == 0 {
            (
                StageOutcome::Passed,
                format!("All {} received document(s) verified.", checks.len()),
            )
        } else {
            (
                StageOutcome::Failed,
                format!(
                    "{} of {} received document(s) failed verification.",
                    failed_documents,
                    checks.len()
                ),
            )
        };

        StageResult {
            stage: StageName::Verification,
            outcome,
            checks,
            issues,
            narrative,
            artifact: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_comparison_ignores_case_and_punctuation() {
        assert_eq!(
            normalize_address("12 Elm St., Des Moines,  IA"),
            normalize_address("12 elm st des moines ia")
        );
        assert_ne!(
            normalize_address("12 Elm St"),
            normalize_address("14 Elm St")
        );
    }
}
