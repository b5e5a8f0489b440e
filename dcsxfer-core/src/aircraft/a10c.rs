//! A-10C CDU waypoint creation.
//!
//! The CDU has to be set to the same coordinate system (L/L or MGRS) as the one
//! chosen here before transferring.

use dcsconnect::DcsCommand;

use super::{keypad, AircraftState, Cockpit, CommandSequence, CompileError};
use crate::{
    aircraft::AircraftKind,
    geo::{GeoPoint, NavPointSpec},
};

const CDU: i32 = 9;
const DIGIT_BASE: i32 = 3015;
const LETTER_BASE: i32 = 3027;
const WP_PAGE: i32 = 3011;
const LSK_3L: i32 = 3001;
const LSK_3R: i32 = 3005;
const LSK_5L: i32 = 3002;
const LSK_7L: i32 = 3003;
const LSK_9L: i32 = 3004;
const CLR: i32 = 3057;

const NAME_LEN: usize = 12;
// The CDU needs a moment to open the new waypoint before it accepts input
const CREATE_DELAY_MS: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct A10c {
    use_mgrs: bool,
}

impl A10c {
    pub fn new(use_mgrs: bool) -> Self {
        Self { use_mgrs }
    }

    pub fn uses_mgrs(&self) -> bool {
        self.use_mgrs
    }
}

fn key(c: char) -> Option<DcsCommand> {
    keypad::digit_code(DIGIT_BASE, c)
        .or_else(|| keypad::letter_code(LETTER_BASE, c))
        .map(|code| DcsCommand::push(CDU, code))
}

fn lsk(code: i32) -> DcsCommand {
    DcsCommand::push(CDU, code)
}

impl Cockpit for A10c {
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
        _: &mut AircraftState,
    ) -> Result<CommandSequence, CompileError> {
        if spec.point_type != "Waypoint" {
            return Err(CompileError::UnknownPointType {
                aircraft: AircraftKind::A10c,
                point_type: spec.point_type.clone(),
            });
        }

        let elevation_ft = point
            .msl_altitude_m()
            .map(keypad::metres_to_feet)
            .ok_or(CompileError::AglWithoutElevation)?;

        let mut sequence = CommandSequence::new();
        sequence.push(DcsCommand::push(CDU, WP_PAGE));
        sequence.push(lsk(LSK_3L));
        sequence.push(DcsCommand::push_with_delay(CDU, LSK_7L, CREATE_DELAY_MS));

        let name = point
            .label
            .as_deref()
            .map(|label| keypad::keyboard_label(label, NAME_LEN, |c| c.is_ascii_alphanumeric()))
            .unwrap_or_default();
        if !name.is_empty() {
            keypad::type_text(&mut sequence, &name, key)?;
            sequence.push(lsk(LSK_3R));
        }

        if self.use_mgrs {
            let grid = point.grid.as_ref().ok_or(CompileError::MissingGridReference)?;
            keypad::type_text(&mut sequence, &grid.to_string(), key)?;
            sequence.push(lsk(LSK_9L));
        } else {
            let latitude = format!(
                "{}{}",
                if point.latitude < 0.0 { 'S' } else { 'N' },
                keypad::Ddm::from_degrees(point.latitude, 3).digits(2)
            );
            keypad::type_text(&mut sequence, &latitude, key)?;
            sequence.push(lsk(LSK_7L));

            let longitude = format!(
                "{}{}",
                if point.longitude < 0.0 { 'W' } else { 'E' },
                keypad::Ddm::from_degrees(point.longitude, 3).digits(3)
            );
            keypad::type_text(&mut sequence, &longitude, key)?;
            sequence.push(lsk(LSK_9L));
        }

        keypad::type_text(&mut sequence, &(elevation_ft.round().max(0.0) as u32).to_string(), key)?;
        sequence.push(lsk(LSK_5L));
        sequence.push(DcsCommand::push(CDU, CLR));

        Ok(sequence)
    }
}
