use thiserror::Error;

use super::AircraftKind;

/// Why a single entry could not be turned into cockpit commands.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("No {0} point type set for this entry")]
    MissingPointSpec(AircraftKind),

    #[error("{aircraft} has no point type \"{point_type}\"")]
    UnknownPointType {
        aircraft: AircraftKind,
        point_type: String,
    },

    #[error("Point type \"{0}\" needs an option")]
    MissingOption(String),

    #[error("Invalid option \"{0}\"")]
    MalformedOption(String),

    #[error("Out of {counter} slots (maximum {limit})")]
    CapacityExceeded { counter: &'static str, limit: u32 },

    #[error("No grid reference available for MGRS entry")]
    MissingGridReference,

    #[error("Altitude is AGL but the ground elevation is unknown")]
    AglWithoutElevation,

    #[error("Weapon stations not received from DCS yet")]
    WeaponStationsUnknown,

    #[error("No {weapon} loaded on {}", station_text(.station))]
    StationUnavailable {
        weapon: &'static str,
        station: Option<u8>,
    },

    #[error("Cannot type '{0}' on this keyboard")]
    UnsupportedCharacter(char),

    #[error("Invalid point range {first}..={last}")]
    InvalidRange { first: u32, last: u32 },
}

/// A [`CompileError`] attributed to the entry that caused it.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Entry {entry_id}: {error}")]
pub struct EntryError {
    pub entry_id: usize,
    pub error: CompileError,
}

fn station_text(station: &Option<u8>) -> String {
    match station {
        Some(station) => format!("station {}", station),
        None => "any station".to_string(),
    }
}
