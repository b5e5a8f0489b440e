//! AH-64D TSD point entry from either crew station.
//!
//! Points are added through the TSD POINT page and typed on the keyboard
//! unit (KU). The aircraft numbers new points itself; only the per-category
//! counts are tracked here to catch a full database before sending.

use dcsconnect::DcsCommand;
use serde::{Deserialize, Serialize};

use super::{keypad, position_of, AircraftState, Cockpit, CommandSequence, CompileError};
use crate::{
    aircraft::AircraftKind,
    geo::{GeoPoint, NavPointSpec},
};

const PILOT_MPD: i32 = 42;
const PILOT_KU: i32 = 29;
const GUNNER_MPD: i32 = 44;
const GUNNER_KU: i32 = 30;

// MPD bezel buttons
const TSD: i32 = 3029;
const L_BASE: i32 = 3018;
const B_BASE: i32 = 3012;

// KU keys
const KU_CLR: i32 = 3001;
const KU_SPACE: i32 = 3003;
const KU_ENTER: i32 = 3006;
const KU_LETTER_BASE: i32 = 3007;
const KU_MINUS: i32 = 3039;
const KU_DOT: i32 = 3040;
const KU_DIGIT_BASE: i32 = 3043;

const LABEL_LEN: usize = 3;
const CATEGORY_CAPACITY: u32 = 50;

const POINT_TYPES: [&str; 4] = ["Waypoint", "Hazard", "Control Measure", "Target"];

const WAYPOINT_IDENTS: [&str; 6] = [
    "WP - Waypoint",
    "AP - Air Control Point",
    "CC - Communication Check Point",
    "LZ - Landing Zone",
    "PP - Passage Point",
    "SP - Start Point",
];
const HAZARD_IDENTS: [&str; 4] = [
    "TU - Tower Under 1000",
    "TO - Tower Over 1000",
    "WL - Wires Power",
    "WS - Wires Telephone",
];
const CONTROL_MEASURE_IDENTS: [&str; 6] = [
    "AD - Air Defense",
    "CP - Check Point",
    "FA - FARP",
    "GU - Generic Unit",
    "TR - Troops",
    "BP - Battle Position",
];
const TARGET_IDENTS: [&str; 3] = ["TG - Target", "AV - Armored Vehicle", "TK - Tank"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ah64Seat {
    Pilot,
    Gunner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Waypoint,
    Hazard,
    ControlMeasure,
    Target,
}

impl Category {
    fn parse(label: &str) -> Option<Self> {
        Some(match position_of(&POINT_TYPES, label)? {
            0 => Category::Waypoint,
            1 => Category::Hazard,
            2 => Category::ControlMeasure,
            _ => Category::Target,
        })
    }

    fn idents(&self) -> &'static [&'static str] {
        match self {
            Category::Waypoint => &WAYPOINT_IDENTS,
            Category::Hazard => &HAZARD_IDENTS,
            Category::ControlMeasure => &CONTROL_MEASURE_IDENTS,
            Category::Target => &TARGET_IDENTS,
        }
    }

    /// Waypoints and hazards share one database.
    fn counter(&self) -> &'static str {
        match self {
            Category::Waypoint | Category::Hazard => "ah64-wp-hz",
            Category::ControlMeasure => "ah64-cm",
            Category::Target => "ah64-tg",
        }
    }

    /// The ADD page button selecting this category.
    fn add_button(&self) -> i32 {
        match self {
            Category::Waypoint => 3,
            Category::Hazard => 4,
            Category::ControlMeasure => 5,
            Category::Target => 6,
        }
    }

    /// Prefix the KU expects when a point is addressed by number.
    fn prefix(&self) -> char {
        match self {
            Category::Waypoint => 'W',
            Category::Hazard => 'H',
            Category::ControlMeasure => 'C',
            Category::Target => 'T',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ah64 {
    seat: Ah64Seat,
}

impl Ah64 {
    pub fn new(seat: Ah64Seat) -> Self {
        Self { seat }
    }

    pub fn seat(&self) -> Ah64Seat {
        self.seat
    }

    fn mpd(&self, code: i32) -> DcsCommand {
        let device = match self.seat {
            Ah64Seat::Pilot => PILOT_MPD,
            Ah64Seat::Gunner => GUNNER_MPD,
        };
        DcsCommand::push(device, code)
    }

    fn ku(&self, code: i32) -> DcsCommand {
        let device = match self.seat {
            Ah64Seat::Pilot => PILOT_KU,
            Ah64Seat::Gunner => GUNNER_KU,
        };
        DcsCommand::push(device, code)
    }

    fn ku_key(&self, c: char) -> Option<DcsCommand> {
        let code = match c {
            ' ' => Some(KU_SPACE),
            '-' => Some(KU_MINUS),
            '.' => Some(KU_DOT),
            _ => keypad::digit_code(KU_DIGIT_BASE, c).or_else(|| keypad::letter_code(KU_LETTER_BASE, c)),
        };
        code.map(|code| self.ku(code))
    }

    fn type_ku(&self, sequence: &mut CommandSequence, text: &str) -> Result<(), CompileError> {
        keypad::type_text(sequence, text, |c| self.ku_key(c))
    }

    /// Compiles the deletion of points `first..=last` of a category and frees
    /// their slots in `state`.
    pub fn delete_points(
        &self,
        point_type: &str,
        first: u32,
        last: u32,
        state: &mut AircraftState,
    ) -> Result<CommandSequence, CompileError> {
        let category = Category::parse(point_type).ok_or_else(|| CompileError::UnknownPointType {
            aircraft: AircraftKind::Ah64,
            point_type: point_type.to_string(),
        })?;
        if first == 0 || first > last || last > CATEGORY_CAPACITY {
            return Err(CompileError::InvalidRange { first, last });
        }

        let mut sequence = CommandSequence::new();
        sequence.push(self.mpd(TSD));
        sequence.push(self.mpd(B_BASE + 3));
        for number in first..=last {
            sequence.push(self.mpd(L_BASE + 1));
            sequence.push(self.ku(KU_CLR));
            self.type_ku(&mut sequence, &format!("{}{}", category.prefix(), number))?;
            sequence.push(self.ku(KU_ENTER));
            sequence.push(self.mpd(L_BASE + 3));
            sequence.push(self.mpd(L_BASE + 5));
        }

        let next = state.next(category.counter(), 1);
        let used_last = next.saturating_sub(1).min(last);
        let freed = (first..=used_last).count() as u32;
        state.set_next(category.counter(), next - freed);

        Ok(sequence)
    }
}

impl Cockpit for Ah64 {
    fn point_types(&self) -> Vec<&'static str> {
        POINT_TYPES.to_vec()
    }

    fn point_options_for_type(&self, point_type: &str) -> Vec<String> {
        Category::parse(point_type)
            .map(|category| category.idents().iter().map(|s| s.to_string()).collect())
            .unwrap_or_default()
    }

    fn compile(
        &self,
        point: &GeoPoint,
        spec: &NavPointSpec,
        state: &mut AircraftState,
    ) -> Result<CommandSequence, CompileError> {
        let category =
            Category::parse(&spec.point_type).ok_or_else(|| CompileError::UnknownPointType {
                aircraft: AircraftKind::Ah64,
                point_type: spec.point_type.clone(),
            })?;
        let option = spec
            .option
            .as_deref()
            .ok_or_else(|| CompileError::MissingOption(spec.point_type.clone()))?;
        let ident = category
            .idents()
            .iter()
            .find(|candidate| **candidate == option)
            .and_then(|candidate| candidate.split(" - ").next())
            .ok_or_else(|| CompileError::MalformedOption(option.to_string()))?;

        let altitude_ft = point
            .msl_altitude_m()
            .map(keypad::metres_to_feet)
            .ok_or(CompileError::AglWithoutElevation)?;
        state.claim(category.counter(), 1, CATEGORY_CAPACITY)?;

        let mut sequence = CommandSequence::new();
        sequence.push(self.mpd(TSD));
        sequence.push(self.mpd(B_BASE + 3));
        sequence.push(self.mpd(L_BASE + 2));
        sequence.push(self.mpd(L_BASE + category.add_button()));

        sequence.push(self.mpd(L_BASE + 1));
        sequence.push(self.ku(KU_CLR));
        self.type_ku(&mut sequence, ident)?;
        sequence.push(self.ku(KU_ENTER));

        // Free text, the KU keeps the ident when left empty
        let label = point
            .label
            .as_deref()
            .map(|label| {
                keypad::keyboard_label(label, LABEL_LEN, |c| c.is_ascii_alphanumeric() || c == ' ')
            })
            .unwrap_or_default();
        self.type_ku(&mut sequence, &label)?;
        sequence.push(self.ku(KU_ENTER));

        let latitude = keypad::Ddm::from_degrees(point.latitude, 2);
        let longitude = keypad::Ddm::from_degrees(point.longitude, 2);
        let coordinates = format!(
            "{}{}.{} {}{}.{}",
            if point.latitude < 0.0 { 'S' } else { 'N' },
            latitude.head(2),
            latitude.tail(),
            if point.longitude < 0.0 { 'W' } else { 'E' },
            longitude.head(3),
            longitude.tail(),
        );
        sequence.push(self.ku(KU_CLR));
        self.type_ku(&mut sequence, &coordinates)?;
        sequence.push(self.ku(KU_ENTER));

        sequence.push(self.ku(KU_CLR));
        self.type_ku(&mut sequence, &(altitude_ft.round() as i64).to_string())?;
        sequence.push(self.ku(KU_ENTER));

        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::{tests::entry, Aircraft};

    fn typed(aircraft: &Ah64, text: &str) -> Vec<DcsCommand> {
        text.chars().map(|c| aircraft.ku_key(c).unwrap()).collect()
    }

    #[test]
    fn test_idents_per_type() {
        let aircraft = Aircraft::Ah64(Ah64::new(Ah64Seat::Pilot));
        assert_eq!(aircraft.point_types()[0], "Waypoint");
        assert_eq!(aircraft.point_options_for_type("Waypoint")[0], "WP - Waypoint");
        assert_eq!(aircraft.point_options_for_type("Hazard").len(), 4);
        assert!(aircraft.point_options_for_type("Fixpoint").is_empty());
    }

    #[test]
    fn test_point_entry() {
        let ah64 = Ah64::new(Ah64Seat::Gunner);
        let aircraft = Aircraft::Ah64(ah64.clone());
        let mut entry = entry(
            0,
            41.601_234,
            -41.5,
            NavPointSpec::new(AircraftKind::Ah64, "Control Measure").with_option("FA - FARP"),
        );
        entry.point.label = Some("farp one".to_string());

        let sequence = aircraft.compile_entry(&entry, &mut AircraftState::new()).unwrap();
        let commands = sequence.commands();

        assert_eq!(commands[0], DcsCommand::push(GUNNER_MPD, TSD));
        assert_eq!(commands[3], DcsCommand::push(GUNNER_MPD, L_BASE + 5));
        assert_eq!(&commands[6..8], typed(&ah64, "FA").as_slice());
        assert_eq!(&commands[9..12], typed(&ah64, "FAR").as_slice());
        assert_eq!(&commands[14..32], typed(&ah64, "N4136.07 W04130.00").as_slice());
        // 162 m MSL
        assert_eq!(&commands[34..37], typed(&ah64, "531").as_slice());
        assert!(commands.iter().all(|c| c.device == GUNNER_MPD || c.device == GUNNER_KU));
    }

    #[test]
    fn test_ident_must_match_type() {
        let aircraft = Aircraft::Ah64(Ah64::new(Ah64Seat::Pilot));
        let mut state = AircraftState::new();

        let missing = entry(0, 1.0, 1.0, NavPointSpec::new(AircraftKind::Ah64, "Waypoint"));
        assert_eq!(
            aircraft.compile_entry(&missing, &mut state),
            Err(CompileError::MissingOption("Waypoint".to_string()))
        );

        let wrong = entry(
            0,
            1.0,
            1.0,
            NavPointSpec::new(AircraftKind::Ah64, "Waypoint").with_option("TU - Tower Under 1000"),
        );
        assert_eq!(
            aircraft.compile_entry(&wrong, &mut state),
            Err(CompileError::MalformedOption("TU - Tower Under 1000".to_string()))
        );
    }

    #[test]
    fn test_waypoints_and_hazards_share_capacity() {
        let aircraft = Aircraft::Ah64(Ah64::new(Ah64Seat::Pilot));
        let mut state = AircraftState::new();
        state.set_next("ah64-wp-hz", CATEGORY_CAPACITY);

        let waypoint = entry(
            0,
            1.0,
            1.0,
            NavPointSpec::new(AircraftKind::Ah64, "Waypoint").with_option("WP - Waypoint"),
        );
        let hazard = entry(
            1,
            1.0,
            1.0,
            NavPointSpec::new(AircraftKind::Ah64, "Hazard").with_option("WL - Wires Power"),
        );
        let target = entry(
            2,
            1.0,
            1.0,
            NavPointSpec::new(AircraftKind::Ah64, "Target").with_option("TG - Target"),
        );

        assert!(aircraft.compile_entry(&waypoint, &mut state).is_ok());
        assert!(matches!(
            aircraft.compile_entry(&hazard, &mut state),
            Err(CompileError::CapacityExceeded { limit: 50, .. })
        ));
        assert!(aircraft.compile_entry(&target, &mut state).is_ok());
    }

    #[test]
    fn test_delete_points() {
        let ah64 = Ah64::new(Ah64Seat::Pilot);
        let mut state = AircraftState::new();
        state.set_next("ah64-tg", 6);

        let sequence = ah64.delete_points("Target", 4, 12, &mut state).unwrap();
        assert_eq!(&sequence.commands()[4..6], typed(&ah64, "T4").as_slice());
        // Six two-character and three three-character point names
        assert_eq!(sequence.len(), 2 + 6 * 7 + 3 * 8);
        // Points 4 and 5 were in use
        assert_eq!(state.next("ah64-tg", 1), 4);
    }

    #[test]
    fn test_delete_points_rejects_bad_range() {
        let ah64 = Ah64::new(Ah64Seat::Pilot);
        let mut state = AircraftState::new();
        for (first, last) in [(0, 3), (5, 4), (1, 51)] {
            assert_eq!(
                ah64.delete_points("Waypoint", first, last, &mut state),
                Err(CompileError::InvalidRange { first, last })
            );
        }
        assert!(matches!(
            ah64.delete_points("Fixpoint", 1, 2, &mut state),
            Err(CompileError::UnknownPointType { .. })
        ));
    }
}
