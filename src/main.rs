// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use photobooth::app::SessionExit;
use photobooth::{CameraSource, Config};
use std::path::PathBuf;
use tracing::info;

mod cli;

#[derive(Parser)]
#[command(name = "photobooth")]
#[command(about = "Two-chance photobooth capture station for kiosk sessions")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: ~/.config/photobooth/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session record to read and write
    #[arg(long, global = true)]
    record: Option<PathBuf>,

    /// Camera source: auto, test-pattern, /dev/videoN or an image file
    #[arg(long, global = true)]
    camera: Option<CameraSource>,

    /// Show the preview unmirrored
    #[arg(long, global = true)]
    no_mirror: bool,

    /// Light the device flash LED on every shot
    #[arg(long, global = true)]
    flash: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the terminal kiosk (default)
    Kiosk,

    /// Show what the session record holds
    Status,

    /// Write the saved shots as JPEG files
    Export {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Run the capture without a screen
    Auto {
        /// Also use the redo after the first try
        #[arg(long)]
        redo: bool,
    },
}

impl Cli {
    /// Config file values with command-line overrides applied
    fn resolve_config(&self) -> Result<Config, photobooth::AppError> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        if let Some(record) = &self.record {
            config.record_path = record.clone();
        }
        if let Some(camera) = &self.camera {
            config.camera = camera.clone();
        }
        if self.no_mirror {
            config.mirror_preview = false;
        }
        if self.flash {
            config.hardware_flash = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let kiosk = matches!(cli.command, None | Some(Commands::Kiosk));

    init_logging(kiosk);
    info!(version = env!("GIT_VERSION"), "Starting photobooth");

    let config = cli.resolve_config()?;

    match cli.command {
        None | Some(Commands::Kiosk) => {
            if photobooth::terminal::run(&config).await? == SessionExit::Advanced {
                println!("Both tries used. Continue to the final image.");
            }
        }
        Some(Commands::Status) => cli::show_status(&config).await?,
        Some(Commands::Export { out }) => cli::export_shots(&config, &out).await?,
        Some(Commands::Auto { redo }) => cli::run_headless(&config, redo).await?,
    }

    Ok(())
}

/// Set RUST_LOG to control the log level, e.g. RUST_LOG=photobooth=debug
///
/// The kiosk owns the terminal, so its logs go to
/// `~/.local/state/photobooth/photobooth.log` instead of stderr.
fn init_logging(kiosk: bool) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    let log_file = kiosk.then(open_log_file).flatten();
    match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        None if kiosk => {
            // No writable state dir; stay quiet rather than draw over the screen
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::sink)
                .init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
            .with_level(true)
            .init(),
    }
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = dirs::state_dir()
        .or_else(dirs::cache_dir)?
        .join("photobooth");
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("photobooth.log"))
        .ok()
}
