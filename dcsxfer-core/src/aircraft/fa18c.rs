//! F/A-18C UFC/AMPCD entry.
//!
//! Waypoints: select waypoint 0 on the HSI DATA page before the first transfer.
//! Every following waypoint is reached with the increment arrow, so slots are
//! numbered 0-59 across transfers until the aircraft is reselected.
//!
//! Pre-planned points go to the stores page of each station carrying the
//! weapon, which needs the loadout reported by DCS.

use dcsconnect::{DcsCommand, WeaponStation};

use super::{keypad, position_of, AircraftState, Cockpit, CommandSequence, CompileError};
use crate::{
    aircraft::AircraftKind,
    geo::{GeoPoint, NavPointSpec},
};

const UFC: i32 = 25;
const UFC_OSB_BASE: i32 = 3010;
const DIGIT_BASE: i32 = 3018;
const ENT: i32 = 3029;

const AMPCD: i32 = 37;
const PB_BASE: i32 = 3010;

const NORTH: char = '2';
const SOUTH: char = '8';
const EAST: char = '6';
const WEST: char = '4';

const WAYPOINT_COUNTER: &str = "fa18c-waypoint";
const LAST_WAYPOINT: u32 = 59;
const STP_COUNTER: &str = "fa18c-slamer-stp";
const STP_COUNT: u32 = 5;
const PP_COUNT: u8 = 5;
const STATIONS: [u8; 4] = [2, 3, 7, 8];

const POINT_TYPES: [&str; 6] = [
    "Waypoint",
    "JDAM PP",
    "J-SOW PP",
    "SLAM PP",
    "SLAM-ER PP",
    "SLAM-ER STP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weapon {
    Jdam,
    Jsow,
    Slam,
    SlamEr,
}

impl Weapon {
    fn name(&self) -> &'static str {
        match self {
            Weapon::Jdam => "JDAM",
            Weapon::Jsow => "J-SOW",
            Weapon::Slam => "SLAM",
            Weapon::SlamEr => "SLAM-ER",
        }
    }

    /// Store names DCS reports for this weapon family.
    fn store_prefixes(&self) -> &'static [&'static str] {
        match self {
            Weapon::Jdam => &["GBU-31", "GBU-32", "GBU-38", "GBU-54"],
            Weapon::Jsow => &["AGM-154"],
            Weapon::Slam => &["AGM-84E"],
            Weapon::SlamEr => &["AGM-84H"],
        }
    }

    fn is_loaded_as(&self, store: &str) -> bool {
        self.store_prefixes()
            .iter()
            .any(|prefix| store.starts_with(prefix))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stations {
    All,
    Only(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointType {
    Waypoint,
    Preplanned(Weapon),
    SlamErSteerpoint,
}

impl PointType {
    fn parse(label: &str) -> Option<Self> {
        Some(match position_of(&POINT_TYPES, label)? {
            0 => PointType::Waypoint,
            1 => PointType::Preplanned(Weapon::Jdam),
            2 => PointType::Preplanned(Weapon::Jsow),
            3 => PointType::Preplanned(Weapon::Slam),
            4 => PointType::Preplanned(Weapon::SlamEr),
            _ => PointType::SlamErSteerpoint,
        })
    }
}

/// Parses `"PP <n> - <All|station>"`.
fn parse_pp_option(option: &str) -> Option<(u8, Stations)> {
    let (program, stations) = option.strip_prefix("PP ")?.split_once(" - ")?;
    let program: u8 = program.trim().parse().ok()?;
    if !(1..=PP_COUNT).contains(&program) {
        return None;
    }

    let stations = match stations.trim() {
        "All" => Stations::All,
        other => {
            let station: u8 = other.parse().ok()?;
            STATIONS.contains(&station).then_some(Stations::Only(station))?
        }
    };
    Some((program, stations))
}

/// Stations carrying `weapon`, in station order.
fn stations_for(
    weapon: Weapon,
    wanted: Stations,
    loadout: &[WeaponStation],
) -> Result<Vec<u8>, CompileError> {
    let mut carrying: Vec<u8> = loadout
        .iter()
        .filter(|s| weapon.is_loaded_as(&s.name))
        .map(|s| s.station)
        .filter(|station| STATIONS.contains(station))
        .collect();
    carrying.sort_unstable();
    carrying.dedup();

    let selected: Vec<u8> = match wanted {
        Stations::All => carrying,
        Stations::Only(station) => carrying.into_iter().filter(|s| *s == station).collect(),
    };

    if selected.is_empty() {
        return Err(CompileError::StationUnavailable {
            weapon: weapon.name(),
            station: match wanted {
                Stations::All => None,
                Stations::Only(station) => Some(station),
            },
        });
    }
    Ok(selected)
}

fn ufc_osb(n: i32) -> DcsCommand {
    DcsCommand::push(UFC, UFC_OSB_BASE + n - 1)
}

fn pb(n: i32) -> DcsCommand {
    DcsCommand::push(AMPCD, PB_BASE + n)
}

fn key(c: char) -> Option<DcsCommand> {
    keypad::digit_code(DIGIT_BASE, c).map(|code| DcsCommand::push(UFC, code))
}

fn enter() -> DcsCommand {
    DcsCommand::push(UFC, ENT)
}

const WYPT_INCREMENT: i32 = 13;
const TGT_UFC: i32 = 14;
const WYPT_UFC: i32 = 15;
const STP_PAGE: i32 = 4;

/// Bezel button selecting the nth program (PP or STP) on a stores page.
fn program_pb(n: u32) -> DcsCommand {
    pb(5 + n as i32)
}

fn station_pb(station: u8) -> DcsCommand {
    match station {
        2 => pb(16),
        3 => pb(17),
        7 => pb(19),
        _ => pb(20),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fa18c;

impl Fa18c {
    pub fn new() -> Self {
        Fa18c
    }
}

/// POSN, latitude, longitude and elevation on the UFC, in `DD MM.mmmm`.
fn push_position(
    sequence: &mut CommandSequence,
    point: &GeoPoint,
    elevation_ft: f64,
) -> Result<(), CompileError> {
    let latitude = keypad::Ddm::from_degrees(point.latitude, 4);
    let longitude = keypad::Ddm::from_degrees(point.longitude, 4);

    sequence.push(ufc_osb(1));
    sequence.push(ufc_osb(1));
    keypad::type_text(
        sequence,
        &(if point.latitude < 0.0 { SOUTH } else { NORTH }).to_string(),
        key,
    )?;
    keypad::type_text(sequence, &latitude.head(2), key)?;
    sequence.push(enter());
    keypad::type_text(sequence, &latitude.tail(), key)?;
    sequence.push(enter());

    sequence.push(ufc_osb(3));
    keypad::type_text(
        sequence,
        &(if point.longitude < 0.0 { WEST } else { EAST }).to_string(),
        key,
    )?;
    keypad::type_text(sequence, &longitude.head(3), key)?;
    sequence.push(enter());
    keypad::type_text(sequence, &longitude.tail(), key)?;
    sequence.push(enter());

    sequence.push(ufc_osb(3));
    sequence.push(ufc_osb(1));
    keypad::type_text(sequence, &(elevation_ft.round().max(0.0) as u32).to_string(), key)?;
    sequence.push(enter());
    Ok(())
}

impl Cockpit for Fa18c {
    fn point_types(&self) -> Vec<&'static str> {
        POINT_TYPES.to_vec()
    }

    fn point_options_for_type(&self, point_type: &str) -> Vec<String> {
        match PointType::parse(point_type) {
            Some(PointType::Preplanned(_)) => (1..=PP_COUNT)
                .flat_map(|program| {
                    std::iter::once("All".to_string())
                        .chain(STATIONS.iter().map(|s| s.to_string()))
                        .map(move |stations| format!("PP {} - {}", program, stations))
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn compile(
        &self,
        point: &GeoPoint,
        spec: &NavPointSpec,
        state: &mut AircraftState,
    ) -> Result<CommandSequence, CompileError> {
        let point_type =
            PointType::parse(&spec.point_type).ok_or_else(|| CompileError::UnknownPointType {
                aircraft: AircraftKind::Fa18c,
                point_type: spec.point_type.clone(),
            })?;
        let elevation_ft = point
            .msl_altitude_m()
            .map(keypad::metres_to_feet)
            .ok_or(CompileError::AglWithoutElevation)?;

        let mut sequence = CommandSequence::new();
        match point_type {
            PointType::Waypoint => {
                let slot = state.claim(WAYPOINT_COUNTER, 0, LAST_WAYPOINT)?;
                if slot > 0 {
                    sequence.push(pb(WYPT_INCREMENT));
                }
                sequence.push(pb(WYPT_UFC));
                push_position(&mut sequence, point, elevation_ft)?;
                sequence.push(pb(WYPT_UFC));
            }
            PointType::Preplanned(weapon) => {
                let option = spec
                    .option
                    .as_deref()
                    .ok_or_else(|| CompileError::MissingOption(spec.point_type.clone()))?;
                let (program, wanted) = parse_pp_option(option)
                    .ok_or_else(|| CompileError::MalformedOption(option.to_string()))?;
                let loadout = state
                    .weapon_stations()
                    .ok_or(CompileError::WeaponStationsUnknown)?;

                for station in stations_for(weapon, wanted, loadout)? {
                    sequence.push(station_pb(station));
                    sequence.push(program_pb(program as u32));
                    sequence.push(pb(TGT_UFC));
                    push_position(&mut sequence, point, elevation_ft)?;
                    sequence.push(pb(TGT_UFC));
                }
            }
            PointType::SlamErSteerpoint => {
                let loadout = state
                    .weapon_stations()
                    .ok_or(CompileError::WeaponStationsUnknown)?;
                let station = stations_for(Weapon::SlamEr, Stations::All, loadout)?[0];
                let steerpoint = state.claim(STP_COUNTER, 1, STP_COUNT)?;

                sequence.push(station_pb(station));
                sequence.push(pb(STP_PAGE));
                sequence.push(program_pb(steerpoint));
                sequence.push(pb(TGT_UFC));
                push_position(&mut sequence, point, elevation_ft)?;
                sequence.push(pb(TGT_UFC));
            }
        }

        Ok(sequence)
    }
}
