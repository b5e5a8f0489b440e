//! F-16C ICP/DED steerpoint entry.
//!
//! Points are written to consecutive steerpoint numbers starting from the one
//! chosen when the aircraft was selected. Coordinates use `DD MM.mmm`.

use dcsconnect::{Activation, DcsCommand};

use super::{keypad, AircraftState, Cockpit, CommandSequence, CompileError};
use crate::{
    aircraft::AircraftKind,
    geo::{GeoPoint, NavPointSpec},
};

const UFC: i32 = 17;
const DIGIT_BASE: i32 = 3002;
const ENTR: i32 = 3016;
const DCS_RTN_SEQ: i32 = 3032;
const DCS_UP_DN: i32 = 3034;

const STPT: char = '4';
const NORTH: char = '2';
const SOUTH: char = '8';
const EAST: char = '6';
const WEST: char = '4';

pub const FIRST_STEERPOINT: u32 = 1;
pub const LAST_STEERPOINT: u32 = 699;
pub const DEFAULT_FIRST_STEERPOINT: u32 = 200;

const COUNTER: &str = "f16c-steerpoint";

#[derive(Debug, Clone, PartialEq)]
pub struct F16c {
    first_steerpoint: u32,
}

impl F16c {
    pub fn new(first_steerpoint: u32) -> Self {
        Self {
            first_steerpoint: first_steerpoint.clamp(FIRST_STEERPOINT, LAST_STEERPOINT),
        }
    }

    pub fn first_steerpoint(&self) -> u32 {
        self.first_steerpoint
    }
}

impl Default for F16c {
    fn default() -> Self {
        Self::new(DEFAULT_FIRST_STEERPOINT)
    }
}

fn key(c: char) -> Option<DcsCommand> {
    keypad::digit_code(DIGIT_BASE, c).map(|code| DcsCommand::push(UFC, code))
}

fn data_down() -> DcsCommand {
    DcsCommand::new(UFC, DCS_UP_DN, 0, Activation::Release, true)
}

fn enter() -> DcsCommand {
    DcsCommand::push(UFC, ENTR)
}

impl Cockpit for F16c {
    fn point_types(&self) -> Vec<&'static str> {
        vec!["Waypoint"]
    }

    fn point_options_for_type(&self, _: &str) -> Vec<String> {
        Vec::new()
    }

    fn compile(
        &self,
        point: &GeoPoint,
        spec: &NavPointSpec,
        state: &mut AircraftState,
    ) -> Result<CommandSequence, CompileError> {
        if spec.point_type != "Waypoint" {
            return Err(CompileError::UnknownPointType {
                aircraft: AircraftKind::F16c,
                point_type: spec.point_type.clone(),
            });
        }

        let elevation_ft = point
            .msl_altitude_m()
            .map(keypad::metres_to_feet)
            .ok_or(CompileError::AglWithoutElevation)?;
        let steerpoint = state.claim(COUNTER, self.first_steerpoint, LAST_STEERPOINT)?;

        let mut sequence = CommandSequence::new();
        let type_digits = |sequence: &mut CommandSequence, text: &str| {
            keypad::type_text(sequence, text, key)
        };

        type_digits(&mut sequence, &STPT.to_string())?;
        type_digits(&mut sequence, &steerpoint.to_string())?;
        sequence.push(enter());

        sequence.push(data_down());
        type_digits(
            &mut sequence,
            &(if point.latitude < 0.0 { SOUTH } else { NORTH }).to_string(),
        )?;
        type_digits(&mut sequence, &keypad::Ddm::from_degrees(point.latitude, 3).digits(2))?;
        sequence.push(enter());

        sequence.push(data_down());
        type_digits(
            &mut sequence,
            &(if point.longitude < 0.0 { WEST } else { EAST }).to_string(),
        )?;
        type_digits(&mut sequence, &keypad::Ddm::from_degrees(point.longitude, 3).digits(3))?;
        sequence.push(enter());

        // No sign key on the ICP; below sea level is entered as 0
        sequence.push(data_down());
        type_digits(&mut sequence, &(elevation_ft.round().max(0.0) as u32).to_string())?;
        sequence.push(enter());

        sequence.push(DcsCommand::new(UFC, DCS_RTN_SEQ, 0, Activation::Release, true));
        Ok(sequence)
    }
}
