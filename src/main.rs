//! Pendant Monitor - Entry Point
//!
//! Small command-line front end for the jog pendant driver: lists attached
//! pendants, prints decoded input, and pushes values to the pendant display.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jog_pendant::hid::HidApiTransport;
use jog_pendant::{
    Config, CoordinateSpace, DisplayUpdate, PendantConnection, PendantDriver, PendantEvent,
    PendantState,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "pendant-monitor", about = "USB jog pendant monitor")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached pendants
    List,
    /// Print pendant input until Ctrl-C or disconnect
    Monitor {
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
        /// Integrate jog input into a simulated position shown on the display
        #[arg(long)]
        simulate: bool,
    },
    /// Show values on the pendant display
    Display {
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        y: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        z: f64,
        /// Feed rate
        #[arg(long, default_value_t = 0)]
        feed: u16,
        /// Spindle speed
        #[arg(long, default_value_t = 0)]
        spindle: u16,
        /// Show workpiece instead of machine coordinates
        #[arg(long)]
        workpiece: bool,
    },
    /// Flash the reset indicator on the display
    Reset,
    /// Print the config file location and the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path)?;

    match cli.command {
        Commands::Config => {
            println!("# {}", config_path.display());
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::List => list(config),
        Commands::Monitor { json, simulate } => monitor(config, json, simulate).await,
        Commands::Display {
            x,
            y,
            z,
            feed,
            spindle,
            workpiece,
        } => {
            let update = DisplayUpdate {
                feed_rate: feed,
                spindle_speed: spindle,
                space: if workpiece {
                    CoordinateSpace::Workpiece
                } else {
                    CoordinateSpace::Machine
                },
                ..DisplayUpdate::with_coordinates(x, y, z)
            };
            let (mut connection, _events) = open(config)?;
            connection
                .update_display(update)
                .context("Failed to update display")?;
            connection.close();
            Ok(())
        }
        Commands::Reset => {
            let (mut connection, _events) = open(config)?;
            connection
                .send_reset_sequence(&DisplayUpdate::default())
                .context("Failed to send reset sequence")?;
            connection.close();
            Ok(())
        }
    }
}

fn list(config: Config) -> Result<()> {
    let driver = PendantDriver::new(config).context("Failed to initialize HID API")?;
    let pendants = driver.discover()?;
    if pendants.is_empty() {
        println!("No pendants found");
    }
    for (index, pendant) in pendants.iter().enumerate() {
        let name = pendant.read.product.as_deref().unwrap_or("Unknown");
        if pendant.is_shared() {
            println!("{}: {} {}", index, name, pendant.read.path);
        } else {
            println!(
                "{}: {} read={} write={}",
                index, name, pendant.read.path, pendant.write.path
            );
        }
    }
    Ok(())
}

fn open(
    config: Config,
) -> Result<(PendantConnection<HidApiTransport>, jog_pendant::EventStream)> {
    let driver = PendantDriver::new(config).context("Failed to initialize HID API")?;
    let opened = driver.open_first().context("Failed to open pendant")?;
    Ok(opened)
}

/// Position integrated from jog input for `--simulate`
#[derive(Default)]
struct SimulatedPosition {
    update: DisplayUpdate,
}

impl SimulatedPosition {
    /// Apply one packet; returns true if the display needs refreshing
    fn apply(&mut self, state: &PendantState) -> bool {
        let (Some(index), Some(step)) = (state.axis.display_index(), state.feed.step_size()) else {
            return false;
        };
        if state.jog == 0 {
            return false;
        }
        self.update.coordinates[index] += f64::from(state.jog) * step;
        true
    }
}

async fn monitor(config: Config, json: bool, simulate: bool) -> Result<()> {
    let (mut connection, mut events) = open(config)?;
    info!("Monitoring pendant, press Ctrl-C to stop");

    let mut position = SimulatedPosition::default();
    if simulate {
        connection.update_display(position.update)?;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                }
                match event {
                    PendantEvent::Input(state) => {
                        if !json {
                            println!("{}", state);
                        }
                        if simulate && position.apply(&state) {
                            if let Err(e) = connection.update_display(position.update) {
                                warn!("Display update failed: {}", e);
                            }
                        }
                    }
                    PendantEvent::Disconnected { error } => {
                        warn!("Pendant disconnected: {}", error);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    connection.close();
    Ok(())
}
