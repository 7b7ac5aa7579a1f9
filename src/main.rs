use std::process::ExitCode;
use std::sync::Arc;

use arpwatch::config::{log_level, Cli, Config};
use arpwatch::error::{ConfigError, ReportError};
use arpwatch::interfaces;
use arpwatch::report::{ReportServer, Reporter};
use arpwatch::shutdown::Shutdown;
use arpwatch::sniff::PcapSource;
use arpwatch::supervisor::Supervisor;
use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("failed to install signal handler")]
    Signal(#[from] ctrlc::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(log_level(cli.verbose));

    match Config::try_from(cli).map_err(AppError::from).and_then(run) {
        Ok(()) => {
            info!("exited");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match std::error::Error::source(&err) {
                Some(source) => error!(error = %err, %source, "exited with error"),
                None => error!(error = %err, "exited with error"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}

fn run(config: Config) -> Result<(), AppError> {
    let available = interfaces::host_interfaces().map_err(ConfigError::InterfaceListing)?;

    let shutdown = Arc::new(Shutdown::new());
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            if shutdown.is_triggered() {
                warn!("already shutting down");
                return;
            }
            info!("signalled, shutting down");
            shutdown.trigger();
        })?;
    }

    let source = Arc::new(PcapSource::new(config.capture.clone()));
    let supervisor = Supervisor::new(source, shutdown.signal()).promiscuous(config.promiscuous);

    // Resolve before the endpoint starts so a bad interface list exits early.
    let selected = interfaces::resolve(&config.interfaces, available)?;

    let server = config
        .report_addr
        .map(|addr| {
            ReportServer::spawn(
                Reporter::new(supervisor.tables(), supervisor.interfaces()),
                addr,
            )
        })
        .transpose()?;

    let report = supervisor.run(selected);
    info!(
        stopped = report.stopped(),
        skipped = report.skipped(),
        failed = report.failed(),
        "all watchers finished"
    );

    if let Some(server) = server {
        server.stop();
    }
    Ok(())
}
