mod cli;
mod infra;
mod process;
mod routes;
mod server;

use loan_ops::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
