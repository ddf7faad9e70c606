use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use digidex::app::{App, AppEvent};
use digidex::config::Config;
use digidex::identity::{IdentityService, LocalIdentityService};
use digidex::storage::{Database, DocumentStore};
use digidex::ui;

/// Get the config directory path (~/.config/digidex/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("digidex"))
}

#[derive(Parser, Debug)]
#[command(name = "digidex", about = "Terminal catalog browser with synced favorites")]
struct Args {
    /// Config file (default: ~/.config/digidex/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the catalog listing URL
    #[arg(long, value_name = "URL")]
    catalog_url: Option<String>,

    /// Override the application id that scopes favorites
    #[arg(long, value_name = "ID")]
    app_id: Option<String>,

    /// Document store file (default: ~/.config/digidex/digidex.db)
    #[arg(long, value_name = "FILE", conflicts_with = "no_store")]
    store: Option<PathBuf>,

    /// Run without a document store; favorites are disabled
    #[arg(long)]
    no_store: bool,

    /// Forget this device's identity and start with a new one
    #[arg(long)]
    reset_identity: bool,
}

/// Send logs to `digidex.log` when `RUST_LOG` is set. The terminal belongs
/// to the UI, so nothing is written to stderr.
fn init_logging(config_dir: &std::path::Path) -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        return Ok(());
    }
    let log_path = config_dir.join("digidex.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// SEC-007: user-only access to the config directory.
#[cfg(unix)]
fn restrict_dir(config_dir: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(config_dir, std::fs::Permissions::from_mode(0o700)) {
        tracing::warn!(
            path = %config_dir.display(),
            error = %e,
            "Failed to set config directory permissions to 0700"
        );
    }
}

#[cfg(not(unix))]
fn restrict_dir(_config_dir: &std::path::Path) {}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }
    restrict_dir(&config_dir);
    init_logging(&config_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    if let Some(url) = args.catalog_url {
        config.catalog_url = url;
    }
    if let Some(app_id) = args.app_id {
        config.app_id = app_id;
    }
    if let Some(path) = args.store {
        config.store.path = Some(path);
    }
    if args.no_store {
        config.store.enabled = false;
    }
    config.validate().context("Invalid configuration")?;
    tracing::info!(?config, "Starting digidex");

    let db = if config.store.enabled {
        let path = config
            .store
            .path
            .clone()
            .unwrap_or_else(|| config_dir.join("digidex.db"));
        let db = Database::open_optional(&path).await;
        if db.is_none() {
            eprintln!(
                "Warning: could not open {}; favorites are disabled.",
                path.display()
            );
        }
        db
    } else {
        tracing::info!("Store disabled by configuration");
        None
    };

    if args.reset_identity {
        match &db {
            Some(db) => {
                if LocalIdentityService::reset(db)
                    .await
                    .context("Failed to reset identity")?
                {
                    println!("Identity reset.");
                }
            }
            None => eprintln!("Warning: no store open; nothing to reset."),
        }
    }

    let (store, identity): (
        Option<Arc<dyn DocumentStore>>,
        Option<Arc<dyn IdentityService>>,
    ) = match db {
        Some(db) => match LocalIdentityService::restore(db.clone()).await {
            Ok(service) => (Some(Arc::new(db)), Some(Arc::new(service))),
            Err(e) => {
                tracing::warn!(error = %e, "Identity service unavailable");
                (Some(Arc::new(db)), None)
            }
        },
        None => (None, None),
    };

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    let mut app = App::new(&config, store).context("Failed to create application")?;
    app.start(identity, config.session_token(), &event_tx);

    ui::run(&mut app, event_tx, event_rx).await?;

    Ok(())
}
