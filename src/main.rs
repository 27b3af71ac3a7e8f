use std::process::ExitCode;

use xfunction::{Runner, RunnerConfig};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Runner::new(RunnerConfig::default().with_detected_handler()).run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Failed to write output document");
            ExitCode::FAILURE
        }
    }
}
