//! session-keeper demo server entry point.

use std::process::ExitCode;

use session_keeper::{
    api,
    cli::{self, Args},
    config::Config,
    logging, SessionManager,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

async fn run(args: &Args) -> Result<(), ExitCode> {
    let config = Config::load(args).map_err(|e| {
        eprintln!("error: {}", e);
        ExitCode::FAILURE
    })?;

    if logging::init_with_filter(config.log_filter()).is_err() {
        eprintln!("warning: logging was already initialized");
    }

    info!("session-keeper v{}", env!("CARGO_PKG_VERSION"));

    let manager = SessionManager::from_settings(&config.session).map_err(|e| {
        error!(error = %e, "invalid session configuration");
        ExitCode::FAILURE
    })?;

    api::serve(&config.bind_address(), manager)
        .await
        .map_err(|e| {
            error!(error = %e, "server stopped");
            ExitCode::FAILURE
        })
}
