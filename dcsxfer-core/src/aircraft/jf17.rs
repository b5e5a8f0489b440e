//! JF-17 UFCP destination entry.
//!
//! Waypoints 1-29 are filled in sequence from a chosen start. Pre-planned
//! targets live at destinations 31-36 and are addressed directly.

use dcsconnect::DcsCommand;

use super::{keypad, position_of, AircraftState, Cockpit, CommandSequence, CompileError};
use crate::{
    aircraft::AircraftKind,
    geo::{GeoPoint, NavPointSpec},
};

const UFCP: i32 = 46;
const DIGIT_BASE: i32 = 3202;
const DST: i32 = 3216;
const ENTR: i32 = 3213;
const PLUS_MINUS: i32 = 3214;
const LINE_SELECT: [i32; 3] = [3220, 3221, 3222];

pub const FIRST_WAYPOINT: u32 = 1;
pub const LAST_WAYPOINT: u32 = 29;
pub const DEFAULT_FIRST_WAYPOINT: u32 = 10;
const PP_OFFSET: u32 = 30;
const PP_COUNT: u32 = 6;

const COUNTER: &str = "jf17-waypoint";
const POINT_TYPES: [&str; 2] = ["Waypoint", "PP Target"];

#[derive(Debug, Clone, PartialEq)]
pub struct Jf17 {
    first_waypoint: u32,
}

impl Jf17 {
    pub fn new(first_waypoint: u32) -> Self {
        Self {
            first_waypoint: first_waypoint.clamp(FIRST_WAYPOINT, LAST_WAYPOINT),
        }
    }
}

impl Default for Jf17 {
    fn default() -> Self {
        Self::new(DEFAULT_FIRST_WAYPOINT)
    }
}

fn key(c: char) -> Option<DcsCommand> {
    keypad::digit_code(DIGIT_BASE, c).map(|code| DcsCommand::push(UFCP, code))
}

fn parse_pp(option: &str) -> Option<u32> {
    let index: u32 = option.strip_prefix("PP ")?.trim().parse().ok()?;
    (1..=PP_COUNT).contains(&index).then_some(index)
}

impl Cockpit for Jf17 {
    fn point_types(&self) -> Vec<&'static str> {
        POINT_TYPES.to_vec()
    }

    fn point_options_for_type(&self, point_type: &str) -> Vec<String> {
        match point_type {
            "PP Target" => (1..=PP_COUNT).map(|i| format!("PP {}", i)).collect(),
            _ => Vec::new(),
        }
    }

    fn compile(
        &self,
        point: &GeoPoint,
        spec: &NavPointSpec,
        state: &mut AircraftState,
    ) -> Result<CommandSequence, CompileError> {
        let destination = match position_of(&POINT_TYPES, &spec.point_type) {
            Some(0) => state.claim(COUNTER, self.first_waypoint, LAST_WAYPOINT)?,
            Some(_) => {
                let option = spec
                    .option
                    .as_deref()
                    .ok_or_else(|| CompileError::MissingOption(spec.point_type.clone()))?;
                let index =
                    parse_pp(option).ok_or_else(|| CompileError::MalformedOption(option.to_string()))?;
                PP_OFFSET + index
            }
            None => {
                return Err(CompileError::UnknownPointType {
                    aircraft: AircraftKind::Jf17,
                    point_type: spec.point_type.clone(),
                })
            }
        };

        let altitude_ft = point
            .msl_altitude_m()
            .map(keypad::metres_to_feet)
            .ok_or(CompileError::AglWithoutElevation)?;

        let mut sequence = CommandSequence::new();
        sequence.push(DcsCommand::push(UFCP, DST));
        keypad::type_text(&mut sequence, &format!("{:02}", destination), key)?;
        sequence.push(DcsCommand::push(UFCP, ENTR));

        // Hemisphere defaults to N/E; +/- flips it
        let fields = [
            (point.latitude, keypad::Dms::from_degrees(point.latitude).digits(2)),
            (point.longitude, keypad::Dms::from_degrees(point.longitude).digits(3)),
        ];
        for (line, (value, digits)) in fields.iter().enumerate() {
            sequence.push(DcsCommand::push(UFCP, LINE_SELECT[line]));
            if *value < 0.0 {
                sequence.push(DcsCommand::push(UFCP, PLUS_MINUS));
            }
            keypad::type_text(&mut sequence, digits, key)?;
            sequence.push(DcsCommand::push(UFCP, ENTR));
        }

        sequence.push(DcsCommand::push(UFCP, LINE_SELECT[2]));
        if altitude_ft < 0.0 {
            sequence.push(DcsCommand::push(UFCP, PLUS_MINUS));
        }
        keypad::type_text(&mut sequence, &(altitude_ft.abs().round() as u32).to_string(), key)?;
        sequence.push(DcsCommand::push(UFCP, ENTR));

        sequence.push(DcsCommand::push(UFCP, DST));
        Ok(sequence)
    }
}
