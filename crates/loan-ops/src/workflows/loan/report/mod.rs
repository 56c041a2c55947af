mod markdown;
pub mod views;

pub use markdown::{render_markdown, ReportStamp};
pub use views::{ExceptionView, LoanReportSummary, LoanSummary, StageSummaryView};
