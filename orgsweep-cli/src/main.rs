mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use orgsweep::{ProcessRunner, Runner};

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::builder()
        .with_default_directive(cli.verbose.tracing_level_filter().into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout);
    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(&args);

    let config = args.config();
    let scanner = Arc::new(ProcessRunner::new(&config.scanner));
    let runner = match Runner::new(config, scanner) {
        Ok(r) => r,
        Err(e) => {
            error!("failed to initialize: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match runner.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("run aborted: {e:#}");
            ExitCode::FAILURE
        }
    }
}
