//! hyprboard daemon
//!
//! Follows Hyprland focus changes and restores each window's keyboard layout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hyprboard::daemon;
use hyprboard::hypr_ipc::{ControlClient, EventStream};
use hyprboard::notify;
use hyprboard::store::LayoutStore;
use hyprboard::switcher::Switcher;
use hyprboard::xkb::LayoutRegistry;

#[derive(Parser, Debug)]
#[command(name = "hyprboardd")]
#[command(about = "Per-window keyboard layout switcher for Hyprland")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/hyprboard/config.kdl")]
    config: String,

    /// Where to remember layouts (*.db, *.json, or - for memory only)
    #[arg(short, long)]
    state_file: Option<String>,

    /// XKB rules catalog with layout descriptions
    #[arg(long)]
    evdev_xml_path: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();
    let mut config = hyprboard_config::load_config(&config_path)
        .with_context(|| format!("load configuration from {}", config_path.display()))?;

    if let Some(state_file) = &args.state_file {
        config.global.state_file = expand(state_file);
    }
    if let Some(xkb_rules) = &args.evdev_xml_path {
        config.global.xkb_rules = expand(xkb_rules);
    }

    let default_level = if args.debug {
        "debug"
    } else {
        config.global.log_level.as_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("Loaded configuration from {}", config_path.display());

    let registry = LayoutRegistry::load(&config.global.xkb_rules)?;
    tracing::info!(
        "Loaded {} layout(s) from {}",
        registry.len(),
        config.global.xkb_rules.display()
    );

    let events = EventStream::connect()
        .await
        .context("connect to Hyprland event socket")?;
    let control = ControlClient::connect(config.global.request_timeout)
        .await
        .context("connect to Hyprland control socket")?;
    tracing::info!("Connected to Hyprland at {}", events.socket_path().display());

    let store = Arc::new(
        LayoutStore::open(&config.global.state_file)
            .await
            .with_context(|| format!("open state file {}", config.global.state_file.display()))?,
    );

    let switcher = Switcher::new(events, control, Arc::new(registry), Arc::clone(&store));

    let result = daemon::supervise(
        switcher,
        Arc::clone(&store),
        config.global.flush_interval,
        daemon::shutdown_signal(),
    )
    .await;

    notify::notify_stopping();
    store.close().await;

    if result.is_ok() {
        tracing::info!("Stopped");
    }

    result
}

fn expand(path: &str) -> PathBuf {
    if path == "-" {
        return PathBuf::from(path);
    }
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
