// Gambit entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config
// 4. Open database and restore the session
// 5. Load the catalog if the command needs one
// 6. Run the command and print its output

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use gambit_app::commands::{self, Cli};
use gambit_app::lichess::LichessSource;
use gambit_app::loader::{CatalogLoader, LoaderSettings};
use gambit_core::catalog::{self, CatalogSource, PlayerCatalog, StaticSource};
use gambit_core::config::{self, CatalogSourceKind, Config, ConfigError};
use gambit_core::db::Database;
use gambit_core::draw::StdRandom;
use gambit_core::session::{GameSession, SessionSettings};
use gambit_core::store::KeyValueStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse the command line
    let cli = Cli::parse();
    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to resolve working directory")?,
    };

    // 2. Initialize tracing
    init_tracing(&base_dir)?;
    info!("Gambit starting: {:?}", cli.command);

    // 3. Load config
    let config = load_config(&base_dir)?;
    info!(
        "Config loaded: catalog source {:?}, {} players",
        config.catalog.source, config.catalog.count
    );

    // 4. Open database and restore the session
    let db_path = config.database_path().context("failed to resolve database path")?;
    let db = open_database(&db_path)?;
    info!("Database opened at {}", db_path.display());
    let store: Arc<dyn KeyValueStore> = Arc::new(db);
    let mut session = GameSession::restore(store.clone(), SessionSettings::from(&config));

    // 5. Load the catalog
    let catalog = if cli.command.needs_catalog() {
        load_catalog(&config, &base_dir, store).await?
    } else {
        PlayerCatalog::ready(Vec::new())
    };

    // 6. Run the command
    let mut rng = StdRandom::from_entropy();
    let output = commands::execute(&cli.command, &mut session, &catalog, &mut rng)?;
    println!("{output}");

    info!("Gambit finished");
    Ok(())
}

/// Load `config/gambit.toml`, falling back to the compiled-in defaults when
/// neither `config/` nor `defaults/` exists under `base_dir`.
fn load_config(base_dir: &Path) -> anyhow::Result<Config> {
    match config::load_config(base_dir) {
        Ok(config) => Ok(config),
        Err(ConfigError::DefaultsCopyError { message }) => {
            warn!("{}; using built-in defaults", message);
            Config::builtin().context("built-in defaults are invalid")
        }
        Err(e) => Err(e).context("failed to load configuration"),
    }
}

fn open_database(path: &Path) -> anyhow::Result<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path_str = path
        .to_str()
        .with_context(|| format!("database path is not valid UTF-8: {}", path.display()))?;
    Database::open(path_str).context("failed to open database")
}

async fn load_catalog(
    config: &Config,
    base_dir: &Path,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<PlayerCatalog> {
    let cfg = &config.catalog;
    let local = match cfg.source {
        CatalogSourceKind::Static => StaticSource::builtin(),
        CatalogSourceKind::Csv => {
            let relative = cfg.csv_path.as_deref().unwrap_or_default();
            let path: PathBuf = base_dir.join(relative);
            let players = catalog::load_csv(&path).context("failed to load catalog CSV")?;
            StaticSource::new(players)
        }
        CatalogSourceKind::Remote => {
            let timeout = Duration::from_secs(cfg.request_timeout_secs);
            let source = LichessSource::new(&cfg.api_base, timeout)
                .context("failed to build HTTP client")?;
            let loader = CatalogLoader::new(
                Arc::new(source),
                store,
                LoaderSettings {
                    count: cfg.count,
                    cache_ttl: Duration::from_secs(cfg.cache_ttl_secs),
                    request_timeout: timeout,
                },
            );
            let load = loader.load().await;
            info!(
                "Catalog ready: {} players ({:?})",
                load.catalog.len(),
                load.origin
            );
            return Ok(load.catalog);
        }
    };
    let players = local
        .fetch_top(cfg.count)
        .await
        .with_context(|| format!("failed to read {} catalog", local.name()))?;
    info!("Catalog ready: {} players from {}", players.len(), local.name());
    Ok(PlayerCatalog::ready(players))
}

/// Initialize tracing to log to a file so command output stays clean.
fn init_tracing(base_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("gambit.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gambit=info,gambit_core=info,gambit_app=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
