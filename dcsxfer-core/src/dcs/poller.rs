use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use dcsconnect::{DcsMessage, Reply, Transport, WeaponStation};

use super::{
    status::{LinkStatus, StatusTracker},
    transfer::TransferSession,
};
use crate::{
    aircraft::{Aircraft, AircraftKind},
    types::TransferProgress,
};

/// Set while a poll is in flight. A tick that finds it set does nothing.
#[derive(Debug, Default)]
pub struct PollGuard {
    in_flight: AtomicBool,
}

impl PollGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<PollTicket<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PollTicket { guard: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Clears the guard when dropped.
pub struct PollTicket<'a> {
    guard: &'a PollGuard,
}

impl Drop for PollTicket<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}

/// What the host reported as the player's aircraft.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Aircraft(AircraftKind),
    /// No model, or an empty one: the player is not in a cockpit.
    NoAircraft,
    /// A model with no compiler behind it.
    Unknown(String),
}

impl Detection {
    pub fn from_model(model: Option<&str>) -> Self {
        match model.map(str::trim) {
            None | Some("") => Detection::NoAircraft,
            Some(model) => AircraftKind::from_model_name(model)
                .map(Detection::Aircraft)
                .unwrap_or_else(|| Detection::Unknown(model.to_string())),
        }
    }
}

/// Everything one poll learned from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub status: LinkStatus,
    /// Progress of the running transfer, after applying the host's index.
    pub progress: Option<TransferProgress>,
    /// The host's `currentCommandIndex` as reported.
    pub host_index: Option<usize>,
    /// Only set while auto-detecting.
    pub detected: Option<Detection>,
    pub weapon_stations: Option<Vec<WeaponStation>>,
}

pub struct Poller<T: Transport> {
    connection: Arc<Mutex<T>>,
    session: Arc<Mutex<TransferSession>>,
    guard: PollGuard,
    status: Mutex<StatusTracker>,
    auto_detect: AtomicBool,
}

impl<T: Transport> Poller<T> {
    pub fn new(
        connection: Arc<Mutex<T>>,
        session: Arc<Mutex<TransferSession>>,
        error_hold: Duration,
        auto_detect: bool,
    ) -> Self {
        Self {
            connection,
            session,
            guard: PollGuard::new(),
            status: Mutex::new(StatusTracker::new(error_hold)),
            auto_detect: AtomicBool::new(auto_detect),
        }
    }

    pub fn set_auto_detect(&self, enabled: bool) {
        self.auto_detect.store(enabled, Ordering::Release);
    }

    pub fn auto_detect(&self) -> bool {
        self.auto_detect.load(Ordering::Acquire)
    }

    pub fn request_for(&self, aircraft: Option<&Aircraft>) -> DcsMessage {
        DcsMessage {
            fetch_camera_position: true,
            fetch_aircraft_type: self.auto_detect(),
            fetch_weapon_stations: aircraft.is_some_and(Aircraft::tracks_weapon_stations),
            ..Default::default()
        }
    }

    /// Runs one poll. Returns `None` when the previous poll is still in flight.
    pub fn tick(&self, aircraft: Option<&Aircraft>, now: Instant) -> Option<PollOutcome> {
        let _ticket = self.guard.try_begin()?;

        let request = self.request_for(aircraft);
        let reply = match self.connection.lock() {
            Ok(connection) => connection.send_request(&request),
            Err(_) => Reply::Disconnected,
        };

        let status = match self.status.lock() {
            Ok(mut tracker) => tracker.update(&reply, now),
            Err(_) => LinkStatus::NotConnected,
        };

        let Reply::Connected(message) = reply else {
            return Some(PollOutcome {
                status,
                progress: None,
                host_index: None,
                detected: None,
                weapon_stations: None,
            });
        };

        let progress = self.session.lock().ok().and_then(|mut session| {
            if let Some(index) = message.current_command_index {
                session.observe(index);
            }
            session.progress()
        });

        let detected = request
            .fetch_aircraft_type
            .then(|| Detection::from_model(message.aircraft_type.as_deref()));

        let status = match (&detected, status) {
            (Some(Detection::Unknown(model)), LinkStatus::Position(_) | LinkStatus::NoCoordinates) => {
                LinkStatus::HostError(format!("Unknown aircraft: \"{}\"", model))
            }
            (_, status) => status,
        };

        Some(PollOutcome {
            status,
            progress,
            host_index: message.current_command_index,
            detected,
            weapon_stations: if request.fetch_weapon_stations {
                message.weapon_stations
            } else {
                None
            },
        })
    }
}
