use anyhow::Context;
use configview::{app, config};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};
use tokio::net::TcpListener;
use tracing_appender::rolling;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{layer as fmt_layer, time::ChronoLocal},
    prelude::*,
    EnvFilter, Registry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let store = config::load().context("failed to load configuration")?;
    let config = config::AppConfig::from_store(&store);
    setup_tracing(&config)?;

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server:bind address {:?}", config.server.bind))?;

    tracing::info!(entries = store.len(), "configuration loaded");
    tracing::info!(%addr, "starting server");

    let app = app::build_router(Arc::new(store));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app).await.context("server failed")?;

    Ok(())
}

/// Events from this crate (library and binary) go to the log file as well as stdout.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

fn is_own_target(target: &str) -> bool {
    target == OWN_TARGET || target.starts_with(&format!("{OWN_TARGET}::"))
}

/// Splits `logging:file` into the appender's directory and file name.
fn log_file_parts(file: &str) -> anyhow::Result<(PathBuf, String)> {
    let path = Path::new(file);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid log file path {file:?}"))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((directory, file_name.to_string()))
}

fn setup_tracing(config: &config::AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.logging.level.as_deref().unwrap_or("info"))
    });

    let (directory, file_name) = log_file_parts(&config.logging.file)?;
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("failed to create log directory {directory:?}"))?;
    let (non_blocking, guard) =
        tracing_appender::non_blocking(rolling::never(directory, file_name));

    static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
    let _ = FILE_GUARD.set(guard);

    let own = filter_fn(|meta| is_own_target(meta.target()));
    let others = filter_fn(|meta| !is_own_target(meta.target()));

    let stdout_own = fmt_layer()
        .with_timer(ChronoLocal::rfc_3339())
        .with_file(true)
        .with_line_number(true)
        .with_filter(own.clone());

    let stdout_others = fmt_layer()
        .with_timer(ChronoLocal::rfc_3339())
        .with_filter(others);

    let file_layer = fmt_layer()
        .with_writer(non_blocking)
        .with_timer(ChronoLocal::rfc_3339())
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(own);

    Registry::default()
        .with(env_filter)
        .with(stdout_own)
        .with(stdout_others)
        .with(file_layer)
        .try_init()
        .context("failed to init tracing subscriber")?;

    Ok(())
}
