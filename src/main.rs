//! CueMix GW - Rust implementation
//!
//! Gateway between a multi-client web monitor console and a MIDI-controlled
//! audio interface mixer.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cuemix_gw::api::{self, ApiState};
use cuemix_gw::config::AppConfig;
use cuemix_gw::mixer::MixerStore;
use cuemix_gw::output::{list_output_ports, ControlTranslator, OutputPort};
use cuemix_gw::paths::AppPaths;
use cuemix_gw::presets::PresetStore;
use cuemix_gw::sync::SyncActor;
use cuemix_gw::topology::{extract_from_path, generic_layout, AddressedChannel, ExtractRules};

/// CueMix Gateway - Shared monitor mixes for a MIDI-controlled interface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "CUEMIX_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI output ports
    #[arg(long)]
    list_ports: bool,

    /// Extract and print the channel layout of a session export, then exit
    #[arg(long, value_name = "FILE")]
    extract: Option<PathBuf>,

    /// Session export to build the startup layout from
    #[arg(long, value_name = "FILE")]
    session: Option<PathBuf>,

    /// Import presets from a JSON file into the database, then exit
    #[arg(long, value_name = "FILE")]
    import_presets: Option<PathBuf>,

    /// Export all presets to a JSON file, then exit
    #[arg(long, value_name = "FILE")]
    export_presets: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let paths = AppPaths::detect();
    let config_path = args.config.clone().unwrap_or_else(|| paths.config.clone());

    // Logging reads `logging.dir`, so config notices wait until after init
    let loaded = AppConfig::load_optional(&config_path).await?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();
    let _log_guard = init_logging(&args.log_level, config.logging.dir.as_deref())?;

    info!("Starting CueMix GW v{}...", env!("CARGO_PKG_VERSION"));
    info!(
        "Data directory: {} ({})",
        paths.base_dir().display(),
        if paths.is_portable { "portable" } else { "installed" }
    );
    if found {
        info!("Configuration file: {}", config_path.display());
    } else {
        info!("No config file at {}, using defaults", config_path.display());
    }

    if args.list_ports {
        print_ports(&config.midi.output_port);
        return Ok(());
    }

    if let Some(file) = &args.extract {
        if !print_extraction(file, &config.topology.rules) {
            std::process::exit(1);
        }
        return Ok(());
    }

    let db_path = match &config.presets.db_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            path.clone()
        }
        None => {
            paths.ensure_directories()?;
            paths.presets_db.clone()
        }
    };
    let presets = PresetStore::open_or_temporary(&db_path)?;

    if let Some(file) = &args.import_presets {
        let count = presets.import_json(file)?;
        println!("Imported {} presets from {}", count.to_string().green(), file.display());
        return Ok(());
    }

    if let Some(file) = &args.export_presets {
        let count = presets.export_json(file)?;
        println!("Exported {} presets to {}", count.to_string().green(), file.display());
        return Ok(());
    }

    let session = args.session.or_else(|| config.topology.session_file.clone());
    let layout = startup_layout(session.as_deref(), &config);

    run_app(config, layout, presets).await?;

    info!("CueMix GW shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, layout: Vec<AddressedChannel>, presets: PresetStore) -> Result<()> {
    let names: Vec<&str> = layout.iter().map(|c| c.name.as_str()).collect();
    let store = MixerStore::new(&names, config.mixer.default_fader);

    let port = OutputPort::open(&config.midi.output_port, config.midi.fallback_to_first);
    let translator = ControlTranslator::new(port);

    let sync = SyncActor::new(store, layout, presets, translator)
        .with_default_channel_count(config.mixer.default_channel_count)
        .spawn();

    let state = Arc::new(ApiState {
        sync: sync.clone(),
        static_dir: config.server.static_dir.clone(),
    });

    let result = api::start_server(state, &config.bind_addr(), shutdown_signal()).await;

    sync.shutdown();
    result
}

/// Layout from the session export, or generic channels when there is none
fn startup_layout(session: Option<&Path>, config: &AppConfig) -> Vec<AddressedChannel> {
    let fallback = config.mixer.default_channel_count;

    let Some(file) = session else {
        info!("No session export configured, starting with {} generic channels", fallback);
        return generic_layout(fallback);
    };

    match extract_from_path(file, &config.topology.rules) {
        Ok(layout) => {
            info!("Layout loaded from {} ({} channels)", file.display(), layout.len());
            layout
        }
        Err(e) => {
            warn!("{}; starting with {} generic channels", e, fallback);
            generic_layout(fallback)
        }
    }
}

fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(filter).with(console).init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "cuemix-gw.log"));

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();

    Ok(Some(guard))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn print_ports(pattern: &str) {
    println!("\n{}", "=== Available MIDI Output Ports ===".bold().cyan());

    let ports = match list_output_ports() {
        Ok(ports) => ports,
        Err(e) => {
            println!("  {} {}", "Failed to enumerate ports:".red(), e);
            return;
        }
    };

    if ports.is_empty() {
        println!("  {}", "No output ports found".dimmed());
        return;
    }

    let needle = pattern.to_lowercase();
    for name in ports {
        if name.to_lowercase().contains(&needle) {
            println!("  {} {}", "[MATCH]".green(), name.bright_white());
        } else {
            println!("          {}", name);
        }
    }
}

/// Print the extracted layout; false when extraction failed
fn print_extraction(file: &Path, rules: &ExtractRules) -> bool {
    match extract_from_path(file, rules) {
        Ok(layout) => {
            println!("\n{}", format!("=== {} ===", file.display()).bold().cyan());
            for channel in &layout {
                let kind = if channel.stereo {
                    "[STEREO]".yellow()
                } else {
                    "[MONO]  ".green()
                };
                println!("  {:>4}  {} {}", channel.chid, kind, channel.name);
            }
            println!("\n  {} channels", layout.len().to_string().bold());
            true
        }
        Err(e) => {
            eprintln!("{} {}", "Extraction failed:".red().bold(), e);
            false
        }
    }
}
