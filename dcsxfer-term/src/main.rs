use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use app::App;
use clap::Parser;
use dcsconnect::DcsConnection;
use dcsxfer::{
    aircraft::AircraftKind,
    config::{Config, ConfigFile},
    dcs::Link,
    geo::{self, DataEntry},
    Bridge, ClientBoundMessage, Server,
};
use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};

mod app;
mod ui;

#[derive(Parser)]
#[command(name = "dcsxfer", about = "Types navigation points into DCS cockpits")]
struct Args {
    /// Settings file, ignored when missing
    #[arg(long, default_value = "dcsxfer.toml")]
    config: PathBuf,

    /// Host running the DCS export script
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Entry list to load at startup
    #[arg(long)]
    entries: Option<PathBuf>,

    /// Pin the aircraft instead of following DCS, e.g. `f16c` or `AH-64D`
    #[arg(long)]
    aircraft: Option<AircraftKind>,

    #[arg(long, default_value = "dcsxfer.log")]
    log_file: PathBuf,

    /// Print link messages instead of drawing the UI. With `--aircraft` and
    /// `--entries`, the flagged entries are sent once.
    #[arg(long)]
    non_interactive: bool,
}

fn load_config(args: &Args) -> Result<Config, String> {
    let mut file = ConfigFile::load(&args.config).map_err(|e| e.to_string())?;
    if args.host.is_some() {
        file.host = args.host.clone();
    }
    if args.port.is_some() {
        file.port = args.port;
    }
    if args.aircraft.is_some() {
        file.auto_detect = Some(false);
    }
    file.resolve().map_err(|e| e.to_string())
}

fn load_entries(path: Option<&PathBuf>) -> Result<Vec<DataEntry>, String> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    geo::entries_from_json(&json).map_err(|e| format!("Cannot parse {}: {}", path.display(), e))
}

fn init_logging(path: &Path, level: LevelFilter) -> Result<(), String> {
    let log_file =
        File::create(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    WriteLogger::init(level, log_config, log_file).map_err(|e| e.to_string())
}

/// Prints every message until shutdown, sending `entries` once if given.
fn run_headless(
    bridge: Bridge,
    config: &Config,
    aircraft: Option<AircraftKind>,
    entries: Vec<DataEntry>,
) {
    bridge.broadcast(ClientBoundMessage::SetAutoDetect(aircraft.is_none()));
    if let Some(kind) = aircraft {
        bridge.broadcast(ClientBoundMessage::SelectAircraft(Some(config.aircraft(kind))));
        let flagged: Vec<DataEntry> = entries.into_iter().filter(|e| e.transfer).collect();
        if !flagged.is_empty() {
            bridge.broadcast(ClientBoundMessage::StartTransfer(flagged));
        }
    }

    loop {
        match bridge.recv() {
            ClientBoundMessage::Shutdown => {
                break;
            }
            ClientBoundMessage::UpdateLinkStatus(status) => {
                println!("{}", status);
            }
            ClientBoundMessage::UpdateTransferProgress(progress) => {
                println!("Transfer {}/{}", progress.current, progress.total);
            }
            message => {
                println!("{:?}", message);
            }
        }
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // The terminal is not ours yet, so stderr still reaches the user
    if let Err(e) = init_logging(&args.log_file, config.log_level) {
        eprintln!("dcsxfer: logging disabled: {}", e);
    }

    log::info!("Talking to DCS at {}", config.endpoint);

    let entries = load_entries(args.entries.as_ref())?;
    let connection = DcsConnection::open(config.endpoint, config.timeout);
    let shared_connection = Arc::new(Mutex::new(connection));
    let link = Link::new(shared_connection, config.clone());

    let mut server = Server::new();

    server.spawn_client("dcs:link", move |bridge| {
        link.run(bridge);
    });

    let aircraft = args.aircraft;
    let non_interactive = args.non_interactive;
    server.spawn_client("app", move |bridge| {
        if non_interactive {
            run_headless(bridge, &config, aircraft, entries);
        } else if let Err(e) = App::new(config, entries, aircraft).run(bridge) {
            log::error!("Terminal failed: {}", e);
        }
    });

    server.run();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("dcsxfer: {}", e);
        std::process::exit(1);
    }
}
