use crate::process::{run_loans, run_process, ProcessArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_ops::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Operations",
    about = "Run the post-approval loan operations pipeline as a service or from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one loan file through the pipeline and write its operations report
    Process(ProcessArgs),
    /// List the loan files available for processing
    Loans,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Process(args) => run_process(args),
        Command::Loans => run_loans(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn process_accepts_date_and_stdout_flags() {
        let cli = Cli::try_parse_from([
            "loan-ops-api",
            "process",
            "LOAN002",
            "--as-of",
            "2025-10-15",
            "--stdout",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Process(args)) => {
                assert_eq!(args.loan_id.as_deref(), Some("LOAN002"));
                assert!(args.stdout);
                assert_eq!(args.as_of.map(|date| date.to_string()).as_deref(), Some("2025-10-15"));
            }
            other => panic!("expected process command, got {other:?}"),
        }
    }

    #[test]
    fn process_takes_a_file_without_a_loan_id() {
        let cli = Cli::try_parse_from(["loan-ops-api", "process", "--file", "loan.json"])
            .expect("arguments parse");

        match cli.command {
            Some(Command::Process(args)) => {
                assert!(args.loan_id.is_none());
                assert_eq!(args.file.as_deref(), Some(std::path::Path::new("loan.json")));
            }
            other => panic!("expected process command, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["loan-ops-api", "process"]).is_err());
    }

    #[test]
    fn process_rejects_malformed_dates() {
        assert!(Cli::try_parse_from(["loan-ops-api", "process", "LOAN002", "--as-of", "tomorrow"])
            .is_err());
    }
}
