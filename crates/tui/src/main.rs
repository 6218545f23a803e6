mod app;
mod form;
mod theme;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use gamevault_core::{
    config::{self, AppConfig},
    Catalog, Dispatcher, HostOs, LibraryStore,
};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::{app::App, theme::Theme};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.log_dir)?;
    info!(config = %config_path.display(), library = %config.library_path.display(), "Starting");

    let (theme, rejected) = Theme::from_config(&config.theme);
    if !rejected.is_empty() {
        warn!(?rejected, "Some theme colours were invalid and replaced by defaults");
    }

    let (catalog, summary) = Catalog::open(LibraryStore::new(&config.library_path));
    let mut app = App::new(
        catalog,
        Dispatcher::system(),
        HostOs::current(),
        theme,
        config.platforms,
    );
    app.report_load(&summary);
    app.run().await
}

fn init_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("gamevault.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
