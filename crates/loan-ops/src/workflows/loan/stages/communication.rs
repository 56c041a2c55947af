use serde::Serialize;

use super::super::catalog::DocumentCatalog;
use super::super::domain::{DocumentKind, LoanRecord};
use super::super::pipeline::PipelineContext;
use super::result::{
    CheckResult, IssueKind, Severity, StageArtifact, StageName, StageOutcome, StageResult,
};
use super::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageTemplate {
    MissingDocuments,
    VerificationFailed,
    FundingOnHold,
    FundingComplete,
}

impl MessageTemplate {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingDocuments => "Missing documents notice",
            Self::VerificationFailed => "Verification failed notice",
            Self::FundingOnHold => "Funding on hold notice",
            Self::FundingComplete => "Funding complete notice",
        }
    }
}

/// Borrower-facing draft; delivery happens outside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorrowerMessage {
    pub template: MessageTemplate,
    pub recipient_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Picks the notice matching the pipeline outcome and fills in borrower details.
#[derive(Debug, Default)]
pub struct CommunicationStage;

impl Stage for CommunicationStage {
    fn name(&self) -> StageName {
        StageName::Communication
    }

    fn run(&self, context: &PipelineContext<'_>) -> StageResult {
        let record = context.record;

        let template = if context.funding_package().is_some() {
            MessageTemplate::FundingComplete
        } else if !context.passed(StageName::Documents) {
            MessageTemplate::MissingDocuments
        } else if !context.passed(StageName::Verification) {
            MessageTemplate::VerificationFailed
        } else {
            MessageTemplate::FundingOnHold
        };

        let body = match template {
            MessageTemplate::FundingComplete => funding_complete_body(context),
            MessageTemplate::MissingDocuments => missing_documents_body(context),
            MessageTemplate::VerificationFailed => detail_list_body(
                record,
                "We could not verify some of the documents in your loan file:",
                &collect_details(context, StageName::Verification, IssueKind::VerificationFailure),
                "Please send corrected copies so we can continue processing.",
            ),
            MessageTemplate::FundingOnHold => detail_list_body(
                record,
                "Funding for your loan is on hold while we resolve the following:",
                &hold_reasons(context),
                "Your loan officer will contact you with next steps.",
            ),
        };

        let message = BorrowerMessage {
            template,
            recipient_name: record.borrower.name.clone(),
            recipient_email: record.borrower.email.clone(),
            subject: subject_for(template, record),
            body,
        };

        StageResult {
            stage: StageName::Communication,
            outcome: StageOutcome::Passed,
            checks: vec![CheckResult::new(
                "template",
                true,
                template.label(),
            )],
            issues: Vec::new(),
            narrative: format!(
                "Drafted {} for {}.",
                template.label().to_lowercase(),
                record.borrower.name
            ),
            artifact: Some(StageArtifact::Message(message)),
        }
    }
}

fn subject_for(template: MessageTemplate, record: &LoanRecord) -> String {
    let loan_id = &record.loan_id;
    match template {
        MessageTemplate::MissingDocuments => format!("Documents needed for loan {loan_id}"),
        MessageTemplate::VerificationFailed => {
            format!("Document verification issue on loan {loan_id}")
        }
        MessageTemplate::FundingOnHold => format!("Funding update for loan {loan_id}"),
        MessageTemplate::FundingComplete => format!("Your loan {loan_id} has funded"),
    }
}

fn greeting(record: &LoanRecord) -> String {
    format!("Dear {},\n\n", record.borrower.name)
}

fn missing_documents_body(context: &PipelineContext<'_>) -> String {
    let record = context.record;
    let catalog: &DocumentCatalog = context.catalog;
    let mut body = greeting(record);
    body.push_str(&format!(
        "To keep your {} loan {} moving, we still need the following:\n",
        record.loan_type.label().to_lowercase(),
        record.loan_id
    ));

    if let Some(result) = context.result(StageName::Documents) {
        for issue in &result.issues {
            let Some(subject) = &issue.subject else {
                continue;
            };
            let label = catalog.label_for(&DocumentKind::new(subject.as_str()));
            match issue.kind {
                IssueKind::MissingDocument => body.push_str(&format!("- {label}\n")),
                IssueKind::ExpiredDocument => {
                    body.push_str(&format!("- {label} (current copy; the one on file has expired)\n"))
                }
                _ => {}
            }
        }
    }

    body.push_str("\nPlease upload these at your earliest convenience.\n");
    body
}

fn funding_complete_body(context: &PipelineContext<'_>) -> String {
    let record = context.record;
    let mut body = greeting(record);
    if let Some(package) = context.funding_package() {
        body.push_str(&format!(
            "Your loan {} has been approved for funding. ${:.2} will be disbursed after ${:.2} in fees are deducted from the ${:.2} principal.\n",
            record.loan_id, package.disbursement_amount, package.total_fees, package.principal
        ));
        if !package.conditions.is_empty() {
            body.push_str("\nClosing conditions:\n");
            for condition in &package.conditions {
                body.push_str(&format!("- {condition}\n"));
            }
        }
    }
    body
}

fn detail_list_body(record: &LoanRecord, intro: &str, details: &[String], closing: &str) -> String {
    let mut body = greeting(record);
    body.push_str(intro);
    body.push('\n');
    for detail in details {
        body.push_str(&format!("- {detail}\n"));
    }
    body.push('\n');
    body.push_str(closing);
    body.push('\n');
    body
}

fn collect_details(context: &PipelineContext<'_>, stage: StageName, kind: IssueKind) -> Vec<String> {
    context
        .result(stage)
        .map(|result| {
            result
                .issues
                .iter()
                .filter(|issue| issue.kind == kind)
                .map(|issue| issue.detail.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn hold_reasons(context: &PipelineContext<'_>) -> Vec<String> {
    let mut reasons: Vec<String> = [StageName::Compliance, StageName::Funding]
        .into_iter()
        .filter_map(|stage| context.result(stage))
        .flat_map(|result| result.issues_at_least(Severity::Warning))
        .map(|issue| issue.detail.clone())
        .collect();

    if reasons.is_empty() {
        if let Some(result) = context.result(StageName::Funding) {
            reasons.extend(result.issues.iter().map(|issue| issue.detail.clone()));
        }
    }
    reasons
}
