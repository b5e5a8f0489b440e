//! Settings file for the transfer link.
//!
//! Every key is optional; missing keys fall back to the defaults below and
//! command-line flags override both. Example:
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 42070
//! timeout_ms = 200
//! poll_period_ms = 250
//! auto_detect = true
//! f16_first_waypoint = 200
//! ah64_seat = "gunner"
//! ```

use std::{
    fs,
    net::{SocketAddr, ToSocketAddrs},
    path::{Path, PathBuf},
    time::Duration,
};

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aircraft::{self, A10c, Ah64, Ah64Seat, Aircraft, AircraftKind, F16c, Fa18c, Jf17, Ka50};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 200;
pub const DEFAULT_POLL_PERIOD_MS: u64 = 250;
pub const DEFAULT_ERROR_HOLD_SECS: u64 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot resolve endpoint {0}")]
    InvalidEndpoint(String),

    #[error("Timeout ({timeout_ms} ms) must be shorter than the poll period ({poll_period_ms} ms)")]
    TimeoutNotBelowPeriod { timeout_ms: u64, poll_period_ms: u64 },

    #[error("Timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Unknown log level \"{0}\"")]
    InvalidLogLevel(String),

    #[error("{key} = {value} is outside {first}..={last}")]
    WaypointOutOfRange {
        key: &'static str,
        value: u32,
        first: u32,
        last: u32,
    },
}

/// The configured first waypoint, or `default` when unset. Values outside
/// `first..=last` are rejected.
fn waypoint(
    key: &'static str,
    value: Option<u32>,
    default: u32,
    (first, last): (u32, u32),
) -> Result<u32, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) if (first..=last).contains(&value) => Ok(value),
        Some(value) => Err(ConfigError::WaypointOutOfRange {
            key,
            value,
            first,
            last,
        }),
    }
}

/// The settings file as written, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub timeout_ms: Option<u64>,
    pub poll_period_ms: Option<u64>,
    pub error_hold_secs: Option<u64>,
    pub auto_detect: Option<bool>,
    pub log_level: Option<String>,
    pub f16_first_waypoint: Option<u32>,
    pub jf17_first_waypoint: Option<u32>,
    pub a10c_use_mgrs: Option<bool>,
    pub ah64_seat: Option<Ah64Seat>,
}

impl ConfigFile {
    /// Reads `path`, or returns an empty file when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents)?;
        log::info!("Loaded config from {}", path.display());
        log::debug!("Config: {:?}", config);
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
        let port = self.port.unwrap_or(dcsconnect::DEFAULT_PORT);
        let endpoint = (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ConfigError::InvalidEndpoint(format!("{}:{}", host, port)))?;

        let timeout_ms = self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        let poll_period_ms = self.poll_period_ms.unwrap_or(DEFAULT_POLL_PERIOD_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if timeout_ms >= poll_period_ms {
            return Err(ConfigError::TimeoutNotBelowPeriod {
                timeout_ms,
                poll_period_ms,
            });
        }

        let level = self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
        let log_level = level
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::InvalidLogLevel(level.to_string()))?;

        let f16_first_waypoint = waypoint(
            "f16_first_waypoint",
            self.f16_first_waypoint,
            aircraft::F16C_DEFAULT_FIRST_STEERPOINT,
            (aircraft::F16C_FIRST_STEERPOINT, aircraft::F16C_LAST_STEERPOINT),
        )?;
        let jf17_first_waypoint = waypoint(
            "jf17_first_waypoint",
            self.jf17_first_waypoint,
            aircraft::JF17_DEFAULT_FIRST_WAYPOINT,
            (aircraft::JF17_FIRST_WAYPOINT, aircraft::JF17_LAST_WAYPOINT),
        )?;

        Ok(Config {
            endpoint,
            timeout: Duration::from_millis(timeout_ms),
            poll_period: Duration::from_millis(poll_period_ms),
            error_hold: Duration::from_secs(self.error_hold_secs.unwrap_or(DEFAULT_ERROR_HOLD_SECS)),
            auto_detect: self.auto_detect.unwrap_or(true),
            log_level,
            f16_first_waypoint,
            jf17_first_waypoint,
            a10c_use_mgrs: self.a10c_use_mgrs.unwrap_or(false),
            ah64_seat: self.ah64_seat.unwrap_or(Ah64Seat::Pilot),
        })
    }
}

/// Settings with every default applied and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub endpoint: SocketAddr,
    pub timeout: Duration,
    pub poll_period: Duration,
    pub error_hold: Duration,
    pub auto_detect: bool,
    pub log_level: LevelFilter,
    pub f16_first_waypoint: u32,
    pub jf17_first_waypoint: u32,
    pub a10c_use_mgrs: bool,
    pub ah64_seat: Ah64Seat,
}

impl Config {
    /// The compiler for `kind` with the per-aircraft settings applied.
    pub fn aircraft(&self, kind: AircraftKind) -> Aircraft {
        match kind {
            AircraftKind::Ka50 => Aircraft::Ka50(Ka50::new()),
            AircraftKind::Fa18c => Aircraft::Fa18c(Fa18c::new()),
            AircraftKind::F16c => Aircraft::F16c(F16c::new(self.f16_first_waypoint)),
            AircraftKind::Ah64 => Aircraft::Ah64(Ah64::new(self.ah64_seat)),
            AircraftKind::Jf17 => Aircraft::Jf17(Jf17::new(self.jf17_first_waypoint)),
            AircraftKind::A10c => Aircraft::A10c(A10c::new(self.a10c_use_mgrs)),
        }
    }
}
