//! Command-line entry point.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use json_i18n_sync::cli::{
    self,
    Cli,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{
    EnvFilter,
    Layer,
    fmt,
};

/// Logs go to stderr so stdout stays clean for JSON output.
fn init_tracing(log_file: Option<&Path>) -> std::io::Result<Option<WorkerGuard>> {
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path.file_name().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "--log-file must name a file")
            })?;
            let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
            std::fs::create_dir_all(directory)?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console_layer).with(file_layer).init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: cannot open log file: {err}");
            return ExitCode::FAILURE;
        }
    };

    match cli::run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::debug!(?err, "Command failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
