use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use gather_server::config::Config;
use gather_server::prelude::*;
use gather_server::{init_tracing, version};

/// Runs shorter than this are treated as crash loops
const MIN_RUN_TIME: Duration = Duration::from_secs(3);
const CRASH_LOOP_PAUSE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    let started = Instant::now();
    let config = Config::parse();

    if config.version {
        return match version::print_to(&mut std::io::stdout()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let code = match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", version::PROGRAM);
            ExitCode::FAILURE
        }
    };

    // Slow down supervisor respawns of a process that dies right away
    if started.elapsed() < MIN_RUN_TIME {
        tokio::time::sleep(CRASH_LOOP_PAUSE).await;
    }
    code
}

async fn run(config: Config) -> Result<(), ServeError> {
    let logger = init_tracing(&config.log_settings())?;

    let mut start_log = process_logger(&logger);
    for (key, value) in version::log_pairs() {
        start_log = start_log.with_field(key, &value);
    }
    start_log.info("starting");

    let fetcher = HttpFetcher::new(&config.metadata_base, config.metadata_timeout())?;
    let context = AppContext::new(Arc::new(fetcher))
        .with_sections(config.sections())
        .with_gather_timeout(config.metadata_timeout())
        .with_metadata_file(config.metadata_file.clone())
        .with_logger(logger.clone());

    let registry = PageRegistry::new()
        .page(Page::new("aws", PageKind::Metadata))?
        .page(
            Page::new("poetry/", PageKind::StaticDir(config.poetry_dir.clone()))
                .only_if(Precondition::DirectoryExists(config.poetry_dir.clone())),
        )?
        .page(Page::new("favicon.ico", PageKind::NotFound).unindexed())?
        .resolve(logger.as_ref());

    let server = Axum::bind(config.listen_addr()?);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        let logger = logger.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                logger.info("interrupted, shutting down");
                shutdown.cancel();
            }
        }
    });

    let result = server
        .serve(registry, context, shutdown, None::<fn(std::net::SocketAddr)>)
        .await;
    if let Err(e) = &result {
        logger.with_error(e).error("web server error exited");
    }
    result
}

/// Logger carrying the process identity
#[cfg(unix)]
fn process_logger(logger: &SharedLogger) -> SharedLogger {
    logger
        .with_field("uid", &nix::unistd::getuid())
        .with_field("gid", &nix::unistd::getgid())
        .with_field("pid", &std::process::id())
}

#[cfg(not(unix))]
fn process_logger(logger: &SharedLogger) -> SharedLogger {
    logger.with_field("pid", &std::process::id())
}
