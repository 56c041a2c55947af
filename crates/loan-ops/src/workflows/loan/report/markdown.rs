use chrono::NaiveDateTime;
use std::fmt::{self, Write};
use std::time::Duration;

use super::super::pipeline::PipelineOutcome;
use super::super::stages::{FundingPackage, StageResult};

/// Generation metadata added to reports written to disk.
#[derive(Debug, Clone, Copy)]
pub struct ReportStamp {
    pub generated_at: NaiveDateTime,
    pub processing: Duration,
}

/// Render the operations report for one pipeline run.
pub fn render_markdown(outcome: &PipelineOutcome, stamp: Option<&ReportStamp>) -> String {
    let mut out = String::new();
    write_report(&mut out, outcome, stamp).expect("write operations report");
    out
}

fn write_report(
    out: &mut String,
    outcome: &PipelineOutcome,
    stamp: Option<&ReportStamp>,
) -> fmt::Result {
    writeln!(out, "# Loan Operations Report: {}", outcome.loan_id)?;
    writeln!(out)?;
    if let Some(stamp) = stamp {
        writeln!(
            out,
            "_Generated {} in {:.2}s_",
            stamp.generated_at.format("%Y-%m-%d %H:%M:%S"),
            stamp.processing.as_secs_f64()
        )?;
        writeln!(out)?;
    }

    writeln!(out, "- **Borrower:** {}", outcome.borrower_name)?;
    writeln!(out, "- **Loan type:** {}", outcome.loan_type.label())?;
    writeln!(out, "- **Principal:** ${:.2}", outcome.principal)?;
    writeln!(out, "- **Evaluated as of:** {}", outcome.as_of)?;
    writeln!(
        out,
        "- **Previous status:** {}",
        outcome.previous_status.label()
    )?;

    for (index, result) in outcome.results.iter().enumerate() {
        writeln!(out)?;
        write_stage(out, index + 1, result)?;
    }

    writeln!(out)?;
    writeln!(out, "## Final Status")?;
    writeln!(out)?;
    writeln!(out, "- **Status:** {}", outcome.final_status.label())?;
    let trail: Vec<&str> = outcome
        .status_trail
        .steps()
        .iter()
        .map(|status| status.label())
        .collect();
    writeln!(out, "- **Status trail:** {}", trail.join(" -> "))?;
    writeln!(out, "- **Funded:** {}", outcome.funded)?;
    writeln!(
        out,
        "- **Escalation required:** {}",
        outcome.exceptions.escalation
    )?;

    if let Some(package) = &outcome.funding {
        writeln!(out)?;
        write_funding(out, package)?;
    }

    Ok(())
}

fn write_stage(out: &mut String, position: usize, result: &StageResult) -> fmt::Result {
    writeln!(
        out,
        "## {}. {} [{}]",
        position,
        result.stage.label(),
        result.outcome.label()
    )?;
    writeln!(out)?;
    writeln!(out, "{}", result.narrative)?;

    if !result.checks.is_empty() {
        writeln!(out)?;
        writeln!(out, "| Check | Result | Detail |")?;
        writeln!(out, "| --- | --- | --- |")?;
        for check in &result.checks {
            writeln!(
                out,
                "| {} | {} | {} |",
                escape_cell(&check.name),
                if check.passed { "pass" } else { "fail" },
                escape_cell(&check.detail)
            )?;
        }
    }

    if !result.issues.is_empty() {
        writeln!(out)?;
        writeln!(out, "**Issues**")?;
        writeln!(out)?;
        for issue in &result.issues {
            match &issue.subject {
                Some(subject) => writeln!(
                    out,
                    "- [{}] {} ({}): {}",
                    issue.severity.label(),
                    issue.kind.label(),
                    subject,
                    issue.detail
                )?,
                None => writeln!(
                    out,
                    "- [{}] {}: {}",
                    issue.severity.label(),
                    issue.kind.label(),
                    issue.detail
                )?,
            }
        }
    }

    Ok(())
}

fn write_funding(out: &mut String, package: &FundingPackage) -> fmt::Result {
    writeln!(out, "## Funding Package")?;
    writeln!(out)?;
    writeln!(out, "- **Principal:** ${:.2}", package.principal)?;
    for fee in &package.fees {
        writeln!(out, "- **{}:** ${:.2}", fee.name, fee.amount)?;
    }
    writeln!(out, "- **Total fees:** ${:.2}", package.total_fees)?;
    writeln!(
        out,
        "- **Disbursement amount:** ${:.2}",
        package.disbursement_amount
    )?;
    if !package.conditions.is_empty() {
        writeln!(out)?;
        writeln!(out, "**Closing conditions**")?;
        writeln!(out)?;
        for condition in &package.conditions {
            writeln!(out, "- {condition}")?;
        }
    }
    Ok(())
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}
