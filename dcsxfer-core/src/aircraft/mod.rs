use std::{collections::BTreeMap, fmt, str::FromStr};

use dcsconnect::{DcsCommand, DcsMessage, Reply, Transport, WeaponStation};
use serde::{Deserialize, Serialize};

use crate::geo::{DataEntry, GeoPoint, NavPointSpec};

mod a10c;
mod ah64;
mod error;
mod f16c;
mod fa18c;
mod jf17;
mod ka50;
pub mod keypad;

pub use a10c::A10c;
pub use ah64::{Ah64, Ah64Seat};
pub use error::{CompileError, EntryError};
pub use f16c::{
    F16c, DEFAULT_FIRST_STEERPOINT as F16C_DEFAULT_FIRST_STEERPOINT,
    FIRST_STEERPOINT as F16C_FIRST_STEERPOINT, LAST_STEERPOINT as F16C_LAST_STEERPOINT,
};
pub use fa18c::Fa18c;
pub use jf17::{
    Jf17, DEFAULT_FIRST_WAYPOINT as JF17_DEFAULT_FIRST_WAYPOINT,
    FIRST_WAYPOINT as JF17_FIRST_WAYPOINT, LAST_WAYPOINT as JF17_LAST_WAYPOINT,
};
pub use ka50::Ka50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AircraftKind {
    #[serde(rename = "Ka-50")]
    Ka50,
    #[serde(rename = "FA-18C")]
    Fa18c,
    #[serde(rename = "F-16C")]
    F16c,
    #[serde(rename = "AH-64D")]
    Ah64,
    #[serde(rename = "JF-17")]
    Jf17,
    #[serde(rename = "A-10C")]
    A10c,
}

impl AircraftKind {
    pub const ALL: [AircraftKind; 6] = [
        AircraftKind::Ka50,
        AircraftKind::Fa18c,
        AircraftKind::F16c,
        AircraftKind::Ah64,
        AircraftKind::Jf17,
        AircraftKind::A10c,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AircraftKind::Ka50 => "Ka-50",
            AircraftKind::Fa18c => "FA-18C",
            AircraftKind::F16c => "F-16C",
            AircraftKind::Ah64 => "AH-64D",
            AircraftKind::Jf17 => "JF-17",
            AircraftKind::A10c => "A-10C",
        }
    }

    /// Maps the model name DCS reports for the player aircraft.
    pub fn from_model_name(model: &str) -> Option<Self> {
        match model {
            "Ka-50" | "Ka-50_3" => Some(AircraftKind::Ka50),
            "FA-18C_hornet" => Some(AircraftKind::Fa18c),
            "F-16C_50" => Some(AircraftKind::F16c),
            "AH-64D_BLK_II" => Some(AircraftKind::Ah64),
            "JF-17" => Some(AircraftKind::Jf17),
            "A-10C" | "A-10C_2" => Some(AircraftKind::A10c),
            _ => None,
        }
    }
}

impl fmt::Display for AircraftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AircraftKind {
    type Err = String;

    /// Accepts the display name with or without punctuation, e.g. `F-16C` or `f16c`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        AircraftKind::ALL
            .into_iter()
            .find(|kind| {
                let name: String = kind
                    .name()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                name == wanted
            })
            .ok_or_else(|| format!("Unknown aircraft: \"{}\"", s))
    }
}

/// Ordered cockpit actuations for one or more entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSequence {
    commands: Vec<DcsCommand>,
}

impl CommandSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DcsCommand) {
        self.commands.push(command);
    }

    pub fn extend(&mut self, other: CommandSequence) {
        self.commands.extend(other.commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[DcsCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DcsCommand> {
        self.commands
    }
}

impl FromIterator<DcsCommand> for CommandSequence {
    fn from_iter<I: IntoIterator<Item = DcsCommand>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

/// Running counters and host-reported data the compilers depend on.
///
/// Owned by whoever drives the transfers and reset whenever the aircraft changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AircraftState {
    counters: BTreeMap<&'static str, u32>,
    weapon_stations: Option<Vec<WeaponStation>>,
}

impl AircraftState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next value a counter would hand out.
    pub fn next(&self, counter: &'static str, first: u32) -> u32 {
        self.counters.get(counter).copied().unwrap_or(first)
    }

    pub fn set_next(&mut self, counter: &'static str, value: u32) {
        self.counters.insert(counter, value);
    }

    /// Takes the next slot of `counter`, which numbers `first..=last`.
    pub fn claim(&mut self, counter: &'static str, first: u32, last: u32) -> Result<u32, CompileError> {
        let slot = self.next(counter, first);
        if slot > last {
            return Err(CompileError::CapacityExceeded {
                counter,
                limit: last + 1 - first,
            });
        }

        self.counters.insert(counter, slot + 1);
        Ok(slot)
    }

    pub fn weapon_stations(&self) -> Option<&[WeaponStation]> {
        self.weapon_stations.as_deref()
    }

    pub fn update_weapon_stations(&mut self, stations: Vec<WeaponStation>) {
        self.weapon_stations = Some(stations);
    }
}

/// What a call to [`Aircraft::compile_entries`] produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledBatch {
    pub sequence: CommandSequence,
    pub errors: Vec<EntryError>,
}

/// Outcome of [`Aircraft::send_to_dcs`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub total_commands: usize,
    pub errors: Vec<EntryError>,
    pub delivered: bool,
}

/// Common surface of every cockpit compiler.
trait Cockpit {
    fn point_types(&self) -> Vec<&'static str>;

    fn point_options_for_type(&self, point_type: &str) -> Vec<String>;

    fn compile(
        &self,
        point: &GeoPoint,
        spec: &NavPointSpec,
        state: &mut AircraftState,
    ) -> Result<CommandSequence, CompileError>;
}

/// The supported aircraft with their per-selection settings.
#[derive(Debug, Clone, PartialEq)]
pub enum Aircraft {
    Ka50(Ka50),
    Fa18c(Fa18c),
    F16c(F16c),
    Ah64(Ah64),
    Jf17(Jf17),
    A10c(A10c),
}

impl Aircraft {
    pub fn kind(&self) -> AircraftKind {
        match self {
            Aircraft::Ka50(_) => AircraftKind::Ka50,
            Aircraft::Fa18c(_) => AircraftKind::Fa18c,
            Aircraft::F16c(_) => AircraftKind::F16c,
            Aircraft::Ah64(_) => AircraftKind::Ah64,
            Aircraft::Jf17(_) => AircraftKind::Jf17,
            Aircraft::A10c(_) => AircraftKind::A10c,
        }
    }

    fn cockpit(&self) -> &dyn Cockpit {
        match self {
            Aircraft::Ka50(a) => a,
            Aircraft::Fa18c(a) => a,
            Aircraft::F16c(a) => a,
            Aircraft::Ah64(a) => a,
            Aircraft::Jf17(a) => a,
            Aircraft::A10c(a) => a,
        }
    }

    /// Whether the poller should ask the host for the loaded stores.
    pub fn tracks_weapon_stations(&self) -> bool {
        matches!(self, Aircraft::Fa18c(_))
    }

    /// Point types in display order; the first one is the default.
    pub fn point_types(&self) -> Vec<&'static str> {
        self.cockpit().point_types()
    }

    /// Sub-options for `point_type`. Empty when there is nothing to choose.
    pub fn point_options_for_type(&self, point_type: &str) -> Vec<String> {
        self.cockpit().point_options_for_type(point_type)
    }

    /// Compiles one entry. `state` is only updated when compilation succeeds.
    pub fn compile_entry(
        &self,
        entry: &DataEntry,
        state: &mut AircraftState,
    ) -> Result<CommandSequence, CompileError> {
        let spec = entry
            .spec_for(self.kind())
            .ok_or(CompileError::MissingPointSpec(self.kind()))?;

        // Point types without a choice of options take none
        if let Some(option) = &spec.option {
            let cockpit = self.cockpit();
            if cockpit.point_types().contains(&spec.point_type.as_str())
                && cockpit.point_options_for_type(&spec.point_type).is_empty()
            {
                return Err(CompileError::MalformedOption(option.clone()));
            }
        }

        let mut scratch = state.clone();
        let sequence = self.cockpit().compile(&entry.point, spec, &mut scratch)?;
        *state = scratch;

        Ok(sequence)
    }

    /// Compiles every entry flagged for transfer, in order. Failing entries are
    /// reported and skipped.
    pub fn compile_entries(&self, entries: &[DataEntry], state: &mut AircraftState) -> CompiledBatch {
        let mut batch = CompiledBatch::default();

        for entry in entries.iter().filter(|entry| entry.transfer) {
            match self.compile_entry(entry, state) {
                Ok(sequence) => batch.sequence.extend(sequence),
                Err(error) => {
                    log::warn!("Entry {} not transferred: {}", entry.id, error);
                    batch.errors.push(EntryError {
                        entry_id: entry.id,
                        error,
                    });
                }
            }
        }

        batch
    }

    /// Compiles the flagged entries and submits them to the host as one request.
    ///
    /// `total_commands` is the number of commands submitted, which bounds the
    /// progress the host will report.
    pub fn send_to_dcs(
        &self,
        entries: &[DataEntry],
        state: &mut AircraftState,
        transport: &impl Transport,
    ) -> TransferReport {
        let CompiledBatch { sequence, errors } = self.compile_entries(entries, state);
        let total_commands = sequence.len();

        if sequence.is_empty() {
            return TransferReport {
                total_commands,
                errors,
                delivered: false,
            };
        }

        let reply = transport.send_request(&DcsMessage::with_commands(sequence.into_commands()));
        TransferReport {
            total_commands,
            errors,
            delivered: matches!(reply, Reply::Connected(_)),
        }
    }
}

/// Looks `label` up in `labels`, returning the matching index.
fn position_of(labels: &[&'static str], label: &str) -> Option<usize> {
    labels.iter().position(|candidate| *candidate == label)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records every request and answers with an empty response.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub requests: Mutex<Vec<DcsMessage>>,
    }

    impl Transport for RecordingTransport {
        fn send_request(&self, message: &DcsMessage) -> Reply {
            self.requests.lock().unwrap().push(message.clone());
            Reply::Connected(DcsMessage::default())
        }
    }

    pub fn entry(id: usize, latitude: f64, longitude: f64, spec: NavPointSpec) -> DataEntry {
        let point = GeoPoint::new(latitude, longitude, 152.0, true)
            .unwrap()
            .with_ground_elevation(10.0);
        DataEntry::new(id, point).with_spec(spec)
    }

    #[test]
    fn test_model_names() {
        assert_eq!(AircraftKind::from_model_name("Ka-50_3"), Some(AircraftKind::Ka50));
        assert_eq!(AircraftKind::from_model_name("A-10C_2"), Some(AircraftKind::A10c));
        assert_eq!(AircraftKind::from_model_name("AH-64D_BLK_II"), Some(AircraftKind::Ah64));
        assert_eq!(AircraftKind::from_model_name("Su-25T"), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("f16c".parse::<AircraftKind>(), Ok(AircraftKind::F16c));
        assert_eq!("AH-64D".parse::<AircraftKind>(), Ok(AircraftKind::Ah64));
        assert!("mig29".parse::<AircraftKind>().is_err());
    }

    #[test]
    fn test_claim_counts_up_to_limit() {
        let mut state = AircraftState::new();
        assert_eq!(state.claim("wp", 1, 2), Ok(1));
        assert_eq!(state.claim("wp", 1, 2), Ok(2));
        assert_eq!(
            state.claim("wp", 1, 2),
            Err(CompileError::CapacityExceeded {
                counter: "wp",
                limit: 2
            })
        );
        assert_eq!(state.next("wp", 1), 3);
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let aircraft = Aircraft::F16c(F16c::new(200));
        let entry = entry(0, 41.6, 41.6, NavPointSpec::new(AircraftKind::F16c, "Waypoint"));

        let mut first_state = AircraftState::new();
        let mut second_state = AircraftState::new();
        let first = aircraft.compile_entry(&entry, &mut first_state).unwrap();
        let second = aircraft.compile_entry(&entry, &mut second_state).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_state, second_state);
    }

    #[test]
    fn test_missing_spec_is_an_error() {
        let aircraft = Aircraft::Ka50(Ka50::new());
        let entry = entry(0, 1.0, 1.0, NavPointSpec::new(AircraftKind::F16c, "Waypoint"));
        let mut state = AircraftState::new();

        assert_eq!(
            aircraft.compile_entry(&entry, &mut state),
            Err(CompileError::MissingPointSpec(AircraftKind::Ka50))
        );
        assert_eq!(state, AircraftState::new());
    }

    #[test]
    fn test_send_to_dcs_counts_flagged_entries_only() {
        let aircraft = Aircraft::Ka50(Ka50::new());
        let spec = NavPointSpec::new(AircraftKind::Ka50, "Waypoint");
        let mut skipped = entry(2, 43.0, 40.0, spec.clone());
        skipped.transfer = false;
        let entries = vec![
            entry(1, 42.0, 41.0, spec.clone()),
            skipped,
            entry(3, 44.0, 39.0, spec.clone()),
        ];

        let expected = {
            let mut state = AircraftState::new();
            let first = aircraft.compile_entry(&entries[0], &mut state).unwrap();
            let third = aircraft.compile_entry(&entries[2], &mut state).unwrap();
            first.len() + third.len()
        };

        let transport = RecordingTransport::default();
        let mut state = AircraftState::new();
        let report = aircraft.send_to_dcs(&entries, &mut state, &transport);

        assert_eq!(report.total_commands, expected);
        assert!(report.delivered);
        assert!(report.errors.is_empty());
        // Only two waypoint slots were used
        assert_eq!(state.next("ka50-waypoint", 1), 3);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].commands.len(), expected);
    }

    #[test]
    fn test_failed_entry_does_not_stop_the_batch() {
        let aircraft = Aircraft::Jf17(Jf17::new(29));
        let spec = NavPointSpec::new(AircraftKind::Jf17, "Waypoint");
        let entries = vec![
            entry(0, 30.0, 70.0, spec.clone()),
            entry(1, 30.1, 70.1, spec.clone()),
            entry(2, 30.2, 70.2, NavPointSpec::new(AircraftKind::Jf17, "PP Target").with_option("PP 2")),
        ];

        let mut state = AircraftState::new();
        let batch = aircraft.compile_entries(&entries, &mut state);

        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].entry_id, 1);
        assert!(matches!(
            batch.errors[0].error,
            CompileError::CapacityExceeded { .. }
        ));
        assert!(!batch.sequence.is_empty());
    }

    #[test]
    fn test_empty_batch_sends_nothing() {
        let aircraft = Aircraft::Ka50(Ka50::new());
        let transport = RecordingTransport::default();
        let report = aircraft.send_to_dcs(&[], &mut AircraftState::new(), &transport);

        assert_eq!(report.total_commands, 0);
        assert!(!report.delivered);
        assert!(transport.requests.lock().unwrap().is_empty());
    }
}
