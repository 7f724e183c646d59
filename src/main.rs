//! Component N: CLI glue (binary entry point).
//!
//! Parses flags, loads [`Config`], builds a [`llmloom::job::JobOptions`] or
//! dispatches a tokenizer count, wires a ctrlc handler to the shared
//! [`CancelToken`], and maps the engine's result to a process exit code.

use clap::Parser;
use llmloom::cancel::CancelToken;
use llmloom::cli::{Cli, Commands};
use llmloom::tokenizer::pool::WorkerPool;
use llmloom::{batch, Config};
use tracing::error;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let command = cli.command;
    let exit_code = match &command {
        Commands::Tokenize { .. } => run_tokenize(command).await,
        Commands::Run { .. } => run_job(command, &config).await,
    };

    std::process::exit(exit_code);
}

async fn run_job(command: Commands, config: &Config) -> i32 {
    let Some(options) = command.into_job_options() else {
        error!("internal error: Run command did not produce job options");
        return 1;
    };

    let cancel = CancelToken::new();
    install_signal_handler(cancel.clone());

    match batch::run(options, config, cancel).await {
        Ok(code) => code,
        Err(e) if e.kind() == llmloom::ErrorKind::ProcessingAlreadyComplete => 0,
        Err(e) => {
            error!(error = %e, "job failed");
            1
        }
    }
}

async fn run_tokenize(command: Commands) -> i32 {
    let Commands::Tokenize { file, tokenizer, add_special_tokens } = command else {
        unreachable!("dispatch guarantees Tokenize here");
    };

    let text = match std::fs::read_to_string(&file) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, file = %file, "could not read input file");
            return 1;
        }
    };

    let pool = WorkerPool::new();
    match pool.count_batch(&tokenizer, vec![text], add_special_tokens).await {
        Ok(counts) => {
            println!("{}", counts.first().copied().unwrap_or(0));
            0
        }
        Err(e) => {
            error!(error = %e, tokenizer = %tokenizer, "tokenization failed");
            1
        }
    }
}

/// First SIGINT requests a graceful stop; a second forces abort. Installed
/// once per process; subsequent signals after "forceful" are no-ops since
/// the state only escalates.
fn install_signal_handler(cancel: CancelToken) {
    let requested_once = std::sync::atomic::AtomicBool::new(false);
    let handler_result = ctrlc::set_handler(move || {
        if requested_once.swap(true, std::sync::atomic::Ordering::SeqCst) {
            cancel.force();
        } else {
            cancel.request();
        }
    });
    if let Err(e) = handler_result {
        error!(error = %e, "failed to install signal handler");
    }
}
