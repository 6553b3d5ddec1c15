//! CLI for sensorscope: live MQTT sensor telemetry in your terminal.

mod commands;
mod plain;
mod tui;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sensorscope_core::SensorVariant;

#[derive(Parser)]
#[command(name = "sensorscope")]
#[command(about = "sensorscope: live MQTT sensor telemetry in your terminal")]
#[command(version = sensorscope_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a DHT climate sensor: temperature, humidity and heat index
    /// published as "t:h:hi".
    Climate(WatchArgs),

    /// Watch an MPU accelerometer publishing {"ax":..,"ay":..,"az":..}.
    /// Shows a 3D trajectory next to the per-axis series.
    Motion(WatchArgs),

    /// Decode one payload with a variant's decoder and print the result
    Decode {
        /// Sensor variant: climate or motion
        variant: SensorVariant,

        /// Raw payload, e.g. "23.5:60.2:24.1"
        payload: String,
    },
}

/// Options shared by the live views.
#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// MQTT broker hostname
    #[arg(long)]
    pub host: Option<String>,

    /// MQTT broker port [default: 1883]
    #[arg(long)]
    pub port: Option<u16>,

    /// MQTT topic to subscribe to
    #[arg(long)]
    pub topic: Option<String>,

    /// Samples kept per channel [default: 300 climate, 500 motion]
    #[arg(long)]
    pub buffer: Option<usize>,

    /// Redraw interval in milliseconds [default: 1000 climate, 500 motion]
    #[arg(long)]
    pub interval: Option<u64>,

    /// MQTT username
    #[arg(long)]
    pub user: Option<String>,

    /// MQTT password (requires --user)
    #[arg(long)]
    pub password: Option<String>,

    /// JSON config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print one line per redraw instead of the full-screen view
    #[arg(long)]
    pub plain: bool,

    /// Write logs here while the full-screen view is up
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Climate(args) => commands::watch::run(SensorVariant::Climate, &args),
        Commands::Motion(args) => commands::watch::run(SensorVariant::Motion, &args),
        Commands::Decode { variant, payload } => commands::decode::run(variant, &payload),
    }
}
