//! hyprboard CLI
//!
//! Inspection tool for hyprboard: configuration, keyboards, the layout
//! catalog and remembered layouts.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;

use hyprboard::hypr_ipc::{ControlClient, KeyboardControl};
use hyprboard::store::{ActiveLayoutStore, LayoutStore, StoreBackend};
use hyprboard::xkb::LayoutRegistry;
use hyprboard_config::Config;

#[derive(Parser, Debug)]
#[command(name = "hyprboard")]
#[command(about = "Per-window keyboard layout switcher for Hyprland")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/hyprboard/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// List keyboards and their configured layouts
    Keyboards,

    /// List layouts from the XKB catalog
    Layouts {
        /// Only show layouts whose name contains this text
        filter: Option<String>,
    },

    /// Show the layouts remembered for a window
    State {
        /// Window class, as reported by Hyprland
        window: String,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Keyboards => cmd_keyboards(&load(&config_path)?).await,
        Commands::Layouts { filter } => cmd_layouts(&load(&config_path)?, filter.as_deref()),
        Commands::State { window } => cmd_state(&load(&config_path)?, &window).await,
    }
}

fn load(config_path: &Path) -> miette::Result<Config> {
    Ok(hyprboard_config::load_config(config_path)?)
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    if !config_path.exists() {
        println!("No configuration file, defaults apply");
    }

    let config = load(config_path)?;
    let global = &config.global;

    println!("Configuration is valid!");
    println!("  Log level:      {}", global.log_level.as_filter());
    println!("  State file:     {}", global.state_file.display());
    println!("  XKB rules:      {}", global.xkb_rules.display());
    println!("  Flush interval: {}s", global.flush_interval.as_secs());
    match global.request_timeout {
        Some(timeout) => println!("  Request timeout: {}ms", timeout.as_millis()),
        None => println!("  Request timeout: none"),
    }

    StoreBackend::from_path(&global.state_file).into_diagnostic()?;

    Ok(())
}

async fn cmd_keyboards(config: &Config) -> miette::Result<()> {
    // Names are a nicety; the listing works without the catalog
    let registry = match LayoutRegistry::load(&config.global.xkb_rules) {
        Ok(registry) => Some(registry),
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    };

    let mut control = ControlClient::connect(config.global.request_timeout)
        .await
        .into_diagnostic()?;
    let keyboards = control.list_keyboards().await.into_diagnostic()?;

    if keyboards.is_empty() {
        println!("No keyboards attached");
        return Ok(());
    }

    for keyboard in &keyboards {
        println!("{}", keyboard.name);
        for (idx, layout) in keyboard.configured().enumerate() {
            let name = registry
                .as_ref()
                .and_then(|r| r.pretty_name_for(&layout.code, &layout.variant))
                .unwrap_or("");
            println!("  {}: {:<20} {}", idx, layout.to_string(), name);
        }
    }

    Ok(())
}

fn cmd_layouts(config: &Config, filter: Option<&str>) -> miette::Result<()> {
    let registry = LayoutRegistry::load(&config.global.xkb_rules).into_diagnostic()?;
    let filter = filter.map(str::to_lowercase);

    for (name, layout) in registry.iter() {
        if let Some(filter) = &filter {
            if !name.to_lowercase().contains(filter.as_str()) {
                continue;
            }
        }
        println!("{:<24} {}", layout.to_string(), name);
    }

    Ok(())
}

async fn cmd_state(config: &Config, window: &str) -> miette::Result<()> {
    let state_file = &config.global.state_file;
    let store = LayoutStore::open(state_file).await.into_diagnostic()?;

    if store.backend() == StoreBackend::Memory {
        println!("State file is \"-\", nothing is remembered across runs");
    }

    let layouts = store.get_active_layouts(window).await.into_diagnostic()?;
    store.close().await;

    if layouts.is_empty() {
        println!("No layouts remembered for {:?}", window);
        return Ok(());
    }

    for (device, layout) in &layouts {
        println!("{:<40} {}", device, layout);
    }

    Ok(())
}
