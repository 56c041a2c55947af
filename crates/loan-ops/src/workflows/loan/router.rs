use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::{LoanId, LoanRecord};
use super::repository::{LoanRepository, ReportArchive};
use super::service::{LoanOperationsService, LoanServiceError, ProcessedLoan};

/// Request body for `POST /api/v1/process`: exactly one of a stored loan id or an inline record.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub loan_id: Option<String>,
    #[serde(default)]
    pub record: Option<LoanRecord>,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Router builder exposing loan listing and pipeline processing.
pub fn loan_router<R, A>(service: Arc<LoanOperationsService<R, A>>) -> Router
where
    R: LoanRepository + 'static,
    A: ReportArchive + 'static,
{
    Router::new()
        .route("/api/v1/loans", get(list_handler::<R, A>))
        .route("/api/v1/loans/:loan_id", get(summary_handler::<R, A>))
        .route("/api/v1/process", post(process_handler::<R, A>))
        .with_state(service)
}

pub(crate) async fn list_handler<R, A>(
    State(service): State<Arc<LoanOperationsService<R, A>>>,
) -> Response
where
    R: LoanRepository + 'static,
    A: ReportArchive + 'static,
{
    match run_blocking(move || service.summaries()).await {
        Ok(loans) => {
            let payload = json!({
                "count": loans.len(),
                "loans": loans,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn summary_handler<R, A>(
    State(service): State<Arc<LoanOperationsService<R, A>>>,
    Path(loan_id): Path<String>,
) -> Response
where
    R: LoanRepository + 'static,
    A: ReportArchive + 'static,
{
    match run_blocking(move || service.summary(&LoanId(loan_id))).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn process_handler<R, A>(
    State(service): State<Arc<LoanOperationsService<R, A>>>,
    Json(request): Json<ProcessRequest>,
) -> Response
where
    R: LoanRepository + 'static,
    A: ReportArchive + 'static,
{
    let as_of = request
        .as_of
        .unwrap_or_else(|| Local::now().date_naive());

    let processed = match (request.record, request.loan_id) {
        (Some(record), None) => {
            run_blocking(move || service.process_record(&record, as_of)).await
        }
        (None, Some(loan_id)) => {
            run_blocking(move || service.process(&LoanId(loan_id), as_of)).await
        }
        (Some(_), Some(_)) => {
            return bad_request("request must include loan_id or record, not both");
        }
        (None, None) => {
            return bad_request("request must include either loan_id or record");
        }
    };

    match processed {
        Ok(processed) => (StatusCode::OK, Json(processed_view(&processed))).into_response(),
        Err(response) => response,
    }
}

/// Runs a service call on the blocking pool and maps failures to responses.
async fn run_blocking<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, LoanServiceError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(error_response),
        Err(join_error) => {
            let payload = json!({
                "error": format!("loan operations task failed: {join_error}"),
            });
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response())
        }
    }
}

fn bad_request(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn processed_view(processed: &ProcessedLoan) -> serde_json::Value {
    json!({
        "summary": processed.outcome.summary(),
        "funded": processed.outcome.funded,
        "report_markdown": processed.markdown,
        "output_file": processed.stored_at,
    })
}

fn error_response(error: LoanServiceError) -> Response {
    let status = match &error {
        LoanServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        other if other.is_malformed() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
