use std::sync::{Arc, Mutex};

use dcsconnect::{DcsMessage, Reply, Transport, WeaponStation};
use thiserror::Error;

use crate::{
    aircraft::{Aircraft, AircraftState, CompileError, EntryError, TransferReport},
    geo::DataEntry,
    types::TransferProgress,
};

#[derive(Debug, Error, PartialEq)]
pub enum TransferError {
    #[error("No aircraft selected")]
    NoAircraftSelected,

    #[error("Selected aircraft is not an AH-64D")]
    NotAh64,

    #[error(transparent)]
    Compile(#[from] CompileError),

    /// `errors` holds the entries that failed to compile in the batch that
    /// could not be delivered.
    #[error("Connection to DCS is unavailable")]
    NotDelivered { errors: Vec<EntryError> },
}

/// Progress bookkeeping for the playback the host is running.
///
/// Shared between the orchestrator, which starts sessions, and the poller,
/// which feeds it the host's command index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSession {
    total: usize,
    last_index: Option<usize>,
    running: bool,
}

impl TransferSession {
    /// Starts tracking a playback of `total` commands.
    pub fn begin(&mut self, total: usize) {
        *self = Self {
            total,
            last_index: None,
            running: total > 0,
        };
    }

    /// Applies an index reported by the host. Indices past the end or behind
    /// the last one are ignored. Returns whether the progress moved.
    pub fn observe(&mut self, index: usize) -> bool {
        if !self.running || index > self.total {
            return false;
        }
        if self.last_index.is_some_and(|last| index <= last) {
            return false;
        }

        self.last_index = Some(index);
        if index == self.total {
            log::info!("Transfer of {} commands completed", self.total);
            self.running = false;
        }
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    pub fn progress(&self) -> Option<TransferProgress> {
        (self.total > 0).then(|| TransferProgress {
            current: self.last_index.unwrap_or(0),
            total: self.total,
        })
    }
}

/// Compiles entry lists for the selected aircraft and hands them to DCS.
///
/// Owns the aircraft's running counters; they reset whenever the selection
/// changes.
pub struct Transfer<T: Transport> {
    connection: Arc<Mutex<T>>,
    session: Arc<Mutex<TransferSession>>,
    aircraft: Option<Aircraft>,
    state: AircraftState,
}

impl<T: Transport> Transfer<T> {
    pub fn new(connection: Arc<Mutex<T>>, session: Arc<Mutex<TransferSession>>) -> Self {
        Self {
            connection,
            session,
            aircraft: None,
            state: AircraftState::new(),
        }
    }

    pub fn aircraft(&self) -> Option<&Aircraft> {
        self.aircraft.as_ref()
    }

    pub fn state(&self) -> &AircraftState {
        &self.state
    }

    pub fn select_aircraft(&mut self, aircraft: Option<Aircraft>) {
        match &aircraft {
            Some(aircraft) => log::info!("Selected aircraft {}", aircraft.kind()),
            None => log::info!("Aircraft deselected"),
        }

        self.aircraft = aircraft;
        self.state = AircraftState::new();
        if let Ok(mut session) = self.session.lock() {
            session.clear();
        }
    }

    pub fn update_weapon_stations(&mut self, stations: Vec<WeaponStation>) {
        if self.state.weapon_stations() != Some(stations.as_slice()) {
            log::debug!("Weapon stations: {:?}", stations);
            self.state.update_weapon_stations(stations);
        }
    }

    /// Compiles and submits every flagged entry. The progress session is
    /// replaced while the poller is held off.
    pub fn start(&mut self, entries: &[DataEntry]) -> Result<TransferReport, TransferError> {
        let aircraft = self.aircraft.as_ref().ok_or(TransferError::NoAircraftSelected)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| TransferError::NotDelivered { errors: Vec::new() })?;
        let connection = self
            .connection
            .lock()
            .map_err(|_| TransferError::NotDelivered { errors: Vec::new() })?;

        // Slots are only consumed once the host has the commands
        let mut scratch = self.state.clone();
        let report = aircraft.send_to_dcs(entries, &mut scratch, &*connection);
        log::info!(
            "Transfer to {}: {} commands, {} entries failed",
            aircraft.kind(),
            report.total_commands,
            report.errors.len()
        );

        if report.delivered {
            self.state = scratch;
            session.begin(report.total_commands);
        } else if report.total_commands > 0 {
            return Err(TransferError::NotDelivered {
                errors: report.errors,
            });
        }
        Ok(report)
    }

    /// Asks the host to abandon playback. The reply is not waited on beyond
    /// the transport timeout and the request is not retried.
    pub fn stop(&self) {
        log::info!("Stopping transfer");
        if let Ok(connection) = self.connection.lock() {
            if let Reply::Disconnected = connection.send_request(&DcsMessage::stop()) {
                log::debug!("Stop request was not delivered");
            }
        }
        if let Ok(mut session) = self.session.lock() {
            session.stop();
        }
    }

    /// Deletes AH-64 points `first..=last` of `point_type`. Returns the number
    /// of commands submitted.
    pub fn clear_ah64_points(
        &mut self,
        point_type: &str,
        first: u32,
        last: u32,
    ) -> Result<usize, TransferError> {
        let Some(Aircraft::Ah64(ah64)) = &self.aircraft else {
            return Err(TransferError::NotAh64);
        };

        let mut scratch = self.state.clone();
        let sequence = ah64.delete_points(point_type, first, last, &mut scratch)?;
        let total = sequence.len();

        let mut session = self
            .session
            .lock()
            .map_err(|_| TransferError::NotDelivered { errors: Vec::new() })?;
        let connection = self
            .connection
            .lock()
            .map_err(|_| TransferError::NotDelivered { errors: Vec::new() })?;

        match connection.send_request(&DcsMessage::with_commands(sequence.into_commands())) {
            Reply::Connected(_) => {
                log::info!("Deleting {} points {}..={}", point_type, first, last);
                self.state = scratch;
                session.begin(total);
                Ok(total)
            }
            Reply::Disconnected => Err(TransferError::NotDelivered { errors: Vec::new() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use dcsconnect::CameraPosition;

    use super::*;
    use crate::{
        aircraft::{tests::entry, Ah64, Ah64Seat, AircraftKind, Ka50},
        dcs::Poller,
        geo::NavPointSpec,
    };

    /// Plays back submitted commands one per poll until told to stop.
    #[derive(Default)]
    struct SimulatedHost {
        queued: Mutex<Option<(usize, usize)>>,
        stopped: Mutex<bool>,
        requests: Mutex<Vec<DcsMessage>>,
    }

    impl Transport for SimulatedHost {
        fn send_request(&self, message: &DcsMessage) -> Reply {
            self.requests.lock().unwrap().push(message.clone());
            let mut queued = self.queued.lock().unwrap();

            if message.stop {
                *self.stopped.lock().unwrap() = true;
            } else if !message.commands.is_empty() {
                *self.stopped.lock().unwrap() = false;
                *queued = Some((0, message.commands.len()));
            } else if let Some((index, total)) = queued.as_mut() {
                if !*self.stopped.lock().unwrap() && *index < *total {
                    *index += 1;
                }
            }

            Reply::Connected(DcsMessage {
                camera_position: Some(CameraPosition {
                    lat: 1.0,
                    lon: 1.0,
                    alt: None,
                    elevation: None,
                }),
                current_command_index: (*queued).map(|(index, _)| index),
                ..Default::default()
            })
        }
    }

    struct Rig {
        host: Arc<Mutex<SimulatedHost>>,
        transfer: Transfer<SimulatedHost>,
        poller: Poller<SimulatedHost>,
    }

    fn rig(aircraft: Option<Aircraft>) -> Rig {
        let host = Arc::new(Mutex::new(SimulatedHost::default()));
        let session = Arc::new(Mutex::new(TransferSession::default()));
        let mut transfer = Transfer::new(host.clone(), session.clone());
        transfer.select_aircraft(aircraft);
        let poller = Poller::new(host.clone(), session, Duration::from_secs(10), false);
        Rig {
            host,
            transfer,
            poller,
        }
    }

    fn ka50_entries(count: usize) -> Vec<DataEntry> {
        (0..count)
            .map(|id| entry(id, 42.0, 42.0, NavPointSpec::new(AircraftKind::Ka50, "Waypoint")))
            .collect()
    }

    #[test]
    fn test_session_ignores_stale_indices() {
        let mut session = TransferSession::default();
        session.begin(5);
        assert!(session.observe(2));
        assert!(!session.observe(1));
        assert!(!session.observe(6));
        assert!(session.observe(5));
        assert!(!session.is_running());
        assert_eq!(
            session.progress(),
            Some(TransferProgress {
                current: 5,
                total: 5
            })
        );
    }

    #[test]
    fn test_start_needs_aircraft() {
        let mut rig = rig(None);
        assert_eq!(
            rig.transfer.start(&ka50_entries(1)),
            Err(TransferError::NoAircraftSelected)
        );
    }

    #[test]
    fn test_progress_follows_host() {
        let mut rig = rig(Some(Aircraft::Ka50(Ka50::new())));
        let report = rig.transfer.start(&ka50_entries(1)).unwrap();
        assert_eq!(report.total_commands, 18);

        let now = Instant::now();
        let mut last = 0;
        for _ in 0..20 {
            let outcome = rig.poller.tick(rig.transfer.aircraft(), now).unwrap();
            let progress = outcome.progress.unwrap();
            assert!(progress.current >= last);
            last = progress.current;
        }
        assert_eq!(last, 18);
    }

    #[test]
    fn test_stop_halts_host_index() {
        let mut rig = rig(Some(Aircraft::Ka50(Ka50::new())));
        rig.transfer.start(&ka50_entries(2)).unwrap();

        let now = Instant::now();
        for _ in 0..3 {
            rig.poller.tick(None, now);
        }
        rig.transfer.stop();

        let indices: Vec<_> = (0..3)
            .map(|_| rig.poller.tick(None, now).unwrap().host_index)
            .collect();
        assert_eq!(indices, vec![Some(3), Some(3), Some(3)]);

        let host = rig.host.lock().unwrap();
        let requests = host.requests.lock().unwrap();
        assert_eq!(requests.iter().filter(|r| r.stop).count(), 1);
    }

    #[test]
    fn test_reselecting_resets_counters_and_session() {
        let mut rig = rig(Some(Aircraft::Ka50(Ka50::new())));
        rig.transfer.start(&ka50_entries(6)).unwrap();
        assert!(rig.transfer.start(&ka50_entries(1)).unwrap().errors.len() == 1);

        rig.transfer.select_aircraft(Some(Aircraft::Ka50(Ka50::new())));
        assert_eq!(rig.transfer.state(), &AircraftState::new());
        let report = rig.transfer.start(&ka50_entries(1)).unwrap();
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_undelivered_transfer_keeps_counters() {
        struct Unplugged;
        impl Transport for Unplugged {
            fn send_request(&self, _: &DcsMessage) -> Reply {
                Reply::Disconnected
            }
        }

        let session = Arc::new(Mutex::new(TransferSession::default()));
        let mut transfer = Transfer::new(Arc::new(Mutex::new(Unplugged)), session.clone());
        transfer.select_aircraft(Some(Aircraft::Ka50(Ka50::new())));

        let entries = vec![
            entry(0, 42.0, 42.0, NavPointSpec::new(AircraftKind::Ka50, "Waypoint")),
            entry(1, 42.0, 42.0, NavPointSpec::new(AircraftKind::Ka50, "Bogus")),
        ];
        let Err(TransferError::NotDelivered { errors }) = transfer.start(&entries) else {
            panic!("transfer should not be delivered");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].entry_id, 1);
        assert!(matches!(
            errors[0].error,
            CompileError::UnknownPointType { .. }
        ));

        assert_eq!(transfer.state().next("ka50-waypoint", 1), 1);
        assert!(!session.lock().unwrap().is_running());
    }

    #[test]
    fn test_clear_ah64_points() {
        let mut rig = rig(Some(Aircraft::Ka50(Ka50::new())));
        assert_eq!(
            rig.transfer.clear_ah64_points("Waypoint", 1, 5),
            Err(TransferError::NotAh64)
        );

        rig.transfer
            .select_aircraft(Some(Aircraft::Ah64(Ah64::new(Ah64Seat::Pilot))));
        let total = rig.transfer.clear_ah64_points("Waypoint", 1, 5).unwrap();
        let outcome = rig.poller.tick(None, Instant::now()).unwrap();
        assert_eq!(outcome.progress.map(|p| p.total), Some(total));

        assert!(matches!(
            rig.transfer.clear_ah64_points("Waypoint", 5, 1),
            Err(TransferError::Compile(CompileError::InvalidRange { .. }))
        ));
    }
}
