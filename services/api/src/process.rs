use crate::infra::{parse_date, DirectoryLoanRepository, FileReportArchive};
use chrono::{Local, NaiveDate};
use clap::Args;
use loan_ops::config::AppConfig;
use loan_ops::error::AppError;
use loan_ops::telemetry;
use loan_ops::workflows::loan::{
    DiscardArchive, LoanId, LoanOperationsService, LoanRecord, LoanRepository, LoanSummary,
    MalformedLoanRecord, PipelineRunner, ProcessedLoan, ReportArchive, RepositoryError,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ProcessArgs {
    /// Loan identifier, resolved against the loan files directory. Optional with --file.
    #[arg(required_unless_present = "file")]
    pub(crate) loan_id: Option<String>,
    /// Read the loan record from this file instead of the loan files directory
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Override the configured report output directory
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
    /// Print the markdown report to stdout instead of writing it to disk
    #[arg(long)]
    pub(crate) stdout: bool,
}

pub(crate) fn run_process(args: ProcessArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_cli(&config.telemetry)?;

    let ProcessArgs {
        loan_id,
        file,
        as_of,
        output_dir,
        stdout,
    } = args;

    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let loan_id = loan_id.map(LoanId);
    let repository = Arc::new(DirectoryLoanRepository::new(&config.storage.loans_dir));
    let runner = PipelineRunner::new(config.funding.clone());

    let source = resolve_source(file, loan_id)?;

    let processed = if stdout {
        let service = LoanOperationsService::new(repository, Arc::new(DiscardArchive), runner);
        process_with(&service, source, as_of)?
    } else {
        let output_dir = output_dir.unwrap_or_else(|| config.storage.output_dir.clone());
        let archive = Arc::new(FileReportArchive::new(output_dir));
        let service = LoanOperationsService::new(repository, archive, runner);
        process_with(&service, source, as_of)?
    };

    if stdout {
        print!("{}", processed.markdown);
    } else {
        render_summary(&processed);
    }
    Ok(())
}

enum LoanSource {
    Stored(LoanId),
    Inline(LoanRecord),
}

fn resolve_source(file: Option<PathBuf>, loan_id: Option<LoanId>) -> Result<LoanSource, AppError> {
    match (file, loan_id) {
        (Some(path), expected) => Ok(LoanSource::Inline(load_record(path, expected.as_ref())?)),
        (None, Some(loan_id)) => Ok(LoanSource::Stored(loan_id)),
        (None, None) => Err(AppError::InvalidInput(
            "process needs a loan id or --file".to_string(),
        )),
    }
}

/// Reads an inline loan file; a given loan id must match the one inside the file.
fn load_record(path: PathBuf, expected: Option<&LoanId>) -> Result<LoanRecord, AppError> {
    let file_id = || {
        LoanId(
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )
    };
    let malformed = |loan_id: LoanId, source: MalformedLoanRecord| {
        AppError::Service(RepositoryError::Malformed { loan_id, source }.into())
    };

    let file = std::fs::File::open(&path)?;
    let record = LoanRecord::from_reader(file)
        .map_err(|source| malformed(expected.cloned().unwrap_or_else(file_id), source))?;

    match expected {
        Some(expected) if *expected != record.loan_id => Err(malformed(
            expected.clone(),
            MalformedLoanRecord::LoanIdMismatch {
                expected: expected.clone(),
                found: record.loan_id.clone(),
            },
        )),
        _ => Ok(record),
    }
}

fn process_with<R, A>(
    service: &LoanOperationsService<R, A>,
    source: LoanSource,
    as_of: NaiveDate,
) -> Result<ProcessedLoan, AppError>
where
    R: LoanRepository + 'static,
    A: ReportArchive + 'static,
{
    let processed = match source {
        LoanSource::Inline(record) => service.process_record(&record, as_of)?,
        LoanSource::Stored(loan_id) => service.process(&loan_id, as_of)?,
    };
    Ok(processed)
}

fn render_summary(processed: &ProcessedLoan) {
    let outcome = &processed.outcome;
    println!(
        "Loan {} ({}, {}) evaluated as of {}",
        outcome.loan_id,
        outcome.borrower_name,
        outcome.loan_type.label(),
        outcome.as_of
    );
    for result in &outcome.results {
        println!(
            "  {:<24} {:<8} {}",
            result.stage.label(),
            result.outcome.label(),
            result.narrative
        );
    }
    println!(
        "Final status: {} | funded: {} | escalation: {}",
        outcome.final_status.label(),
        outcome.funded,
        outcome.exceptions.escalation
    );
    if let Some(package) = &outcome.funding {
        println!("Disbursement: ${:.2}", package.disbursement_amount);
    }
    if let Some(path) = &processed.stored_at {
        println!("Report written to {path}");
    }
}

pub(crate) fn run_loans() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_cli(&config.telemetry)?;

    let service = LoanOperationsService::new(
        Arc::new(DirectoryLoanRepository::new(&config.storage.loans_dir)),
        Arc::new(DiscardArchive),
        PipelineRunner::new(config.funding.clone()),
    );
    let summaries = service.summaries()?;

    if summaries.is_empty() {
        println!(
            "No loan files found in {}",
            config.storage.loans_dir.display()
        );
        return Ok(());
    }

    println!(
        "{:<10} {:<22} {:<28} {:>14} {:<18} Approved",
        "Loan", "Borrower", "Type", "Amount", "Status"
    );
    for summary in &summaries {
        println!("{}", summary_line(summary));
    }
    Ok(())
}

fn summary_line(summary: &LoanSummary) -> String {
    format!(
        "{:<10} {:<22} {:<28} {:>14.2} {:<18} {}",
        summary.loan_id.to_string(),
        summary.borrower_name,
        summary.loan_type.label(),
        summary.loan_amount,
        summary.status.label(),
        summary
            .approval_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "-".to_string())
    )
}
