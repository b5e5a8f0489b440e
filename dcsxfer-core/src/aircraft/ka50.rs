//! Ka-50 PVI-800 navigation panel.
//!
//! The panel must be in EDIT mode before a transfer. Each point is selected by
//! its page key and slot digit, then latitude and longitude are typed as a sign
//! digit (0 = N/E, 1 = S/W) followed by `DDMMSS` / `DDDMMSS`, and ENTER stores it.
//!
//! The slot digit is a key press of its own, sent right after the page key and
//! before the latitude sign. Slots count from 1 per page; the tenth target slot
//! is the 0 key.

use dcsconnect::DcsCommand;

use super::{keypad, position_of, AircraftState, Cockpit, CommandSequence, CompileError};
use crate::{
    aircraft::AircraftKind,
    geo::{GeoPoint, NavPointSpec},
};

const PVI: i32 = 20;
const DIGIT_BASE: i32 = 3001;
const ENTER: i32 = 3018;

const POINT_TYPES: [&str; 4] = ["Waypoint", "Fixpoint", "Airfield", "Target"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointType {
    Waypoint,
    Fixpoint,
    Airfield,
    Target,
}

impl PointType {
    fn parse(label: &str) -> Option<Self> {
        match position_of(&POINT_TYPES, label)? {
            0 => Some(PointType::Waypoint),
            1 => Some(PointType::Fixpoint),
            2 => Some(PointType::Airfield),
            _ => Some(PointType::Target),
        }
    }

    fn page_key(&self) -> i32 {
        match self {
            PointType::Waypoint => 3011,
            PointType::Fixpoint => 3013,
            PointType::Airfield => 3015,
            PointType::Target => 3017,
        }
    }

    fn counter(&self) -> &'static str {
        match self {
            PointType::Waypoint => "ka50-waypoint",
            PointType::Fixpoint => "ka50-fixpoint",
            PointType::Airfield => "ka50-airfield",
            PointType::Target => "ka50-target",
        }
    }

    fn capacity(&self) -> u32 {
        match self {
            PointType::Waypoint => 6,
            PointType::Fixpoint => 4,
            PointType::Airfield => 4,
            PointType::Target => 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ka50;

impl Ka50 {
    pub fn new() -> Self {
        Ka50
    }
}

fn key(c: char) -> Option<DcsCommand> {
    keypad::digit_code(DIGIT_BASE, c).map(|code| DcsCommand::push(PVI, code))
}

fn sign_key(value: f64) -> DcsCommand {
    DcsCommand::push(PVI, DIGIT_BASE + if value < 0.0 { 1 } else { 0 })
}

impl Cockpit for Ka50 {
    fn point_types(&self) -> Vec<&'static str> {
        POINT_TYPES.to_vec()
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
        let point_type =
            PointType::parse(&spec.point_type).ok_or_else(|| CompileError::UnknownPointType {
                aircraft: AircraftKind::Ka50,
                point_type: spec.point_type.clone(),
            })?;

        let slot = state.claim(point_type.counter(), 1, point_type.capacity())?;

        let mut sequence = CommandSequence::new();
        sequence.push(DcsCommand::push(PVI, point_type.page_key()));
        // The tenth target sits on the 0 key
        sequence.push(DcsCommand::push(PVI, DIGIT_BASE + (slot % 10) as i32));

        sequence.push(sign_key(point.latitude));
        keypad::type_text(&mut sequence, &keypad::Dms::from_degrees(point.latitude).digits(2), key)?;
        sequence.push(sign_key(point.longitude));
        keypad::type_text(&mut sequence, &keypad::Dms::from_degrees(point.longitude).digits(3), key)?;

        sequence.push(DcsCommand::push(PVI, ENTER));
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aircraft::{tests::entry, Aircraft},
        geo::NavPointSpec,
    };

    fn digit(d: i32) -> DcsCommand {
        DcsCommand::push(PVI, DIGIT_BASE + d)
    }

    #[test]
    fn test_waypoint_sequence() {
        let aircraft = Aircraft::Ka50(Ka50::new());
        let entry = entry(0, 12.345, 67.89, NavPointSpec::new(AircraftKind::Ka50, "Waypoint"));
        let mut state = AircraftState::new();

        let sequence = aircraft.compile_entry(&entry, &mut state).unwrap();

        let mut expected = vec![DcsCommand::push(PVI, 3011), digit(1), digit(0)];
        expected.extend([1, 2, 2, 0, 4, 2].map(digit));
        expected.push(digit(0));
        expected.extend([0, 6, 7, 5, 3, 2, 4].map(digit));
        expected.push(DcsCommand::push(PVI, ENTER));

        assert_eq!(sequence.commands(), expected.as_slice());
        assert!(sequence.commands().iter().all(|c| c.add_depress));
    }

    #[test]
    fn test_southern_western_signs() {
        let aircraft = Aircraft::Ka50(Ka50::new());
        let entry = entry(0, -33.5, -70.25, NavPointSpec::new(AircraftKind::Ka50, "Target"));
        let sequence = aircraft.compile_entry(&entry, &mut AircraftState::new()).unwrap();
        let commands = sequence.commands();

        assert_eq!(commands[0], DcsCommand::push(PVI, 3017));
        assert_eq!(commands[2], digit(1));
        assert_eq!(commands[9], digit(1));
    }

    #[test]
    fn test_capacity_exceeded_leaves_state() {
        let aircraft = Aircraft::Ka50(Ka50::new());
        let entry = entry(0, 42.0, 42.0, NavPointSpec::new(AircraftKind::Ka50, "Fixpoint"));
        let mut state = AircraftState::new();
        for _ in 0..4 {
            aircraft.compile_entry(&entry, &mut state).unwrap();
        }

        let before = state.clone();
        let result = aircraft.compile_entry(&entry, &mut state);

        assert_eq!(
            result,
            Err(CompileError::CapacityExceeded {
                counter: "ka50-fixpoint",
                limit: 4
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_rejects_options_and_unknown_types() {
        let aircraft = Aircraft::Ka50(Ka50::new());
        let mut state = AircraftState::new();

        let unknown = entry(0, 1.0, 1.0, NavPointSpec::new(AircraftKind::Ka50, "Hazard"));
        assert!(matches!(
            aircraft.compile_entry(&unknown, &mut state),
            Err(CompileError::UnknownPointType { .. })
        ));

        let with_option = entry(
            0,
            1.0,
            1.0,
            NavPointSpec::new(AircraftKind::Ka50, "Waypoint").with_option("PP 1"),
        );
        assert!(matches!(
            aircraft.compile_entry(&with_option, &mut state),
            Err(CompileError::MalformedOption(_))
        ));
        assert_eq!(state, AircraftState::new());
    }

    #[test]
    fn test_slot_digit_follows_page_key() {
        let aircraft = Aircraft::Ka50(Ka50::new());
        let mut state = AircraftState::new();
        let target = entry(0, 42.0, 42.0, NavPointSpec::new(AircraftKind::Ka50, "Target"));

        let heads: Vec<_> = (0..10)
            .map(|_| {
                let sequence = aircraft.compile_entry(&target, &mut state).unwrap();
                sequence.commands()[..3].to_vec()
            })
            .collect();

        for (slot, head) in heads.iter().enumerate() {
            let expected_slot = digit(((slot + 1) % 10) as i32);
            assert_eq!(head, &vec![DcsCommand::push(PVI, 3017), expected_slot, digit(0)]);
        }
        assert_eq!(heads[9][1], digit(0));
    }
}
