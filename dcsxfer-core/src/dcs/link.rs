use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crossbeam_channel::Sender;
use dcsconnect::Transport;

use super::{
    poller::{Detection, PollOutcome},
    Poller, Transfer, TransferError, TransferSession,
};
use crate::{
    config::Config,
    types::{ClientBoundMessage, ServerBoundMessage},
    Bridge,
};

/// The one thread that talks to DCS: applies queued requests from the other
/// clients, then polls.
pub struct Link<T: Transport> {
    interval: Duration,
    config: Config,
    poller: Poller<T>,
    transfer: Transfer<T>,
}

fn broadcast(tx: &Sender<ServerBoundMessage>, message: ClientBoundMessage) {
    _ = tx.send(ServerBoundMessage::Broadcast(message));
}

impl<T: Transport> Link<T> {
    pub fn new(connection: Arc<Mutex<T>>, config: Config) -> Self {
        let session = Arc::new(Mutex::new(TransferSession::default()));
        Self {
            interval: config.poll_period,
            poller: Poller::new(
                connection.clone(),
                session.clone(),
                config.error_hold,
                config.auto_detect,
            ),
            transfer: Transfer::new(connection, session),
            config,
        }
    }

    pub fn run(mut self, bridge: Bridge) {
        bridge.recv_with_interval(self.interval, |queue, tx| {
            for message in queue {
                self.apply(message, tx);
            }

            if let Some(outcome) = self.poller.tick(self.transfer.aircraft(), Instant::now()) {
                self.publish(outcome, tx);
            }
        });
    }

    fn apply(&mut self, message: &ClientBoundMessage, tx: &Sender<ServerBoundMessage>) {
        match message {
            ClientBoundMessage::SelectAircraft(aircraft) => {
                self.transfer.select_aircraft(aircraft.clone());
            }
            ClientBoundMessage::SetAutoDetect(enabled) => {
                log::info!("Aircraft auto-detection {}", if *enabled { "on" } else { "off" });
                self.poller.set_auto_detect(*enabled);
            }
            ClientBoundMessage::StartTransfer(entries) => match self.transfer.start(entries) {
                Ok(report) => {
                    if !report.errors.is_empty() {
                        broadcast(tx, ClientBoundMessage::TransferErrors(report.errors));
                    }
                }
                Err(e) => {
                    log::warn!("Transfer not started: {}", e);
                    if let TransferError::NotDelivered { errors } = &e {
                        if !errors.is_empty() {
                            broadcast(tx, ClientBoundMessage::TransferErrors(errors.clone()));
                        }
                    }
                    broadcast(tx, ClientBoundMessage::TransferRejected(e.to_string()));
                }
            },
            ClientBoundMessage::StopTransfer => self.transfer.stop(),
            ClientBoundMessage::ClearAh64Points {
                point_type,
                first,
                last,
            } => {
                if let Err(e) = self.transfer.clear_ah64_points(point_type, *first, *last) {
                    log::warn!("Points not cleared: {}", e);
                    broadcast(tx, ClientBoundMessage::TransferRejected(e.to_string()));
                }
            }
            _ => {}
        }
    }

    fn publish(&mut self, outcome: PollOutcome, tx: &Sender<ServerBoundMessage>) {
        broadcast(tx, ClientBoundMessage::UpdateLinkStatus(outcome.status));

        if let Some(progress) = outcome.progress {
            broadcast(tx, ClientBoundMessage::UpdateTransferProgress(progress));
        }

        if let Some(stations) = outcome.weapon_stations {
            self.transfer.update_weapon_stations(stations);
        }

        match outcome.detected {
            Some(Detection::Aircraft(kind)) => {
                if self.transfer.aircraft().map(|a| a.kind()) != Some(kind) {
                    log::info!("Detected {} in DCS", kind);
                    self.transfer.select_aircraft(Some(self.config.aircraft(kind)));
                    broadcast(tx, ClientBoundMessage::AircraftDetected(Some(kind)));
                }
            }
            Some(Detection::NoAircraft) => {
                if self.transfer.aircraft().is_some() {
                    log::info!("No aircraft in DCS");
                    self.transfer.select_aircraft(None);
                    broadcast(tx, ClientBoundMessage::AircraftDetected(None));
                }
            }
            // The poller already put the model name in the status
            Some(Detection::Unknown(_)) => {
                if self.transfer.aircraft().is_some() {
                    self.transfer.select_aircraft(None);
                    broadcast(tx, ClientBoundMessage::AircraftDetected(None));
                }
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use dcsconnect::{CameraPosition, DcsMessage, Reply};

    use super::*;
    use crate::{
        aircraft::{tests::entry, Aircraft, AircraftKind, Ka50},
        config::ConfigFile,
        dcs::LinkStatus,
        geo::NavPointSpec,
        Server,
    };

    /// Reports an F-16 in the pit and acknowledges everything else.
    #[derive(Default)]
    struct ViperHost {
        requests: Mutex<Vec<DcsMessage>>,
    }

    impl Transport for ViperHost {
        fn send_request(&self, message: &DcsMessage) -> Reply {
            self.requests.lock().unwrap().push(message.clone());
            Reply::Connected(DcsMessage {
                camera_position: Some(CameraPosition {
                    lat: 36.0,
                    lon: 36.0,
                    alt: Some(100.0),
                    elevation: None,
                }),
                aircraft_type: Some("F-16C_50".to_string()),
                ..Default::default()
            })
        }
    }

    /// Reports whatever model the test last put in the pit.
    #[derive(Default)]
    struct SwappingHost {
        model: Mutex<Option<String>>,
    }

    impl Transport for SwappingHost {
        fn send_request(&self, _: &DcsMessage) -> Reply {
            Reply::Connected(DcsMessage {
                camera_position: Some(CameraPosition {
                    lat: 36.0,
                    lon: 36.0,
                    alt: None,
                    elevation: None,
                }),
                aircraft_type: self.model.lock().unwrap().clone(),
                ..Default::default()
            })
        }
    }

    fn config(auto_detect: bool) -> Config {
        let mut config = ConfigFile {
            poll_period_ms: Some(20),
            timeout_ms: Some(10),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        config.auto_detect = auto_detect;
        config
    }

    fn record(server: &mut Server) -> Arc<Mutex<Vec<ClientBoundMessage>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in = seen.clone();
        server.spawn_client("recorder", move |bridge| loop {
            match bridge.recv() {
                ClientBoundMessage::Shutdown => break,
                message => seen_in.lock().unwrap().push(message),
            }
        });
        seen
    }

    #[test]
    fn test_detects_aircraft_and_reports_status() {
        let host = Arc::new(Mutex::new(ViperHost::default()));
        let mut server = Server::new();
        let seen = record(&mut server);

        let link = Link::new(host.clone(), config(true));
        server.spawn_client("link", move |bridge| link.run(bridge));
        server.spawn_client("stopper", |bridge| {
            std::thread::sleep(Duration::from_millis(150));
            bridge.send(ServerBoundMessage::Shutdown);
        });
        server.run();

        let seen = seen.lock().unwrap();
        assert!(seen
            .iter()
            .any(|m| matches!(m, ClientBoundMessage::UpdateLinkStatus(LinkStatus::Position(_)))));
        let detections = seen
            .iter()
            .filter(|m| matches!(m, ClientBoundMessage::AircraftDetected(Some(AircraftKind::F16c))))
            .count();
        assert_eq!(detections, 1);
    }

    #[test]
    fn test_leaving_the_cockpit_deselects() {
        let host = Arc::new(Mutex::new(SwappingHost::default()));
        let mut server = Server::new();
        let seen = record(&mut server);

        let link = Link::new(host.clone(), config(true));
        server.spawn_client("link", move |bridge| link.run(bridge));
        let pit = host.clone();
        server.spawn_client("pilot", move |bridge| {
            let swap = |model: Option<&str>| {
                *pit.lock().unwrap().model.lock().unwrap() = model.map(str::to_string);
                std::thread::sleep(Duration::from_millis(100));
            };
            swap(Some("Ka-50"));
            swap(Some(""));
            swap(Some("Su-25T"));
            swap(Some("A-10C_2"));
            swap(Some("Su-25T"));
            bridge.send(ServerBoundMessage::Shutdown);
        });
        server.run();

        let seen = seen.lock().unwrap();
        let detections: Vec<_> = seen
            .iter()
            .filter_map(|m| match m {
                ClientBoundMessage::AircraftDetected(kind) => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            detections,
            vec![Some(AircraftKind::Ka50), None, Some(AircraftKind::A10c), None]
        );
        assert!(seen.iter().any(|m| matches!(
            m,
            ClientBoundMessage::UpdateLinkStatus(LinkStatus::HostError(e)) if e == "Unknown aircraft: \"Su-25T\""
        )));
    }

    #[test]
    fn test_undelivered_transfer_reports_entry_errors() {
        // Nothing listens on the other side
        struct Unplugged;
        impl Transport for Unplugged {
            fn send_request(&self, _: &DcsMessage) -> Reply {
                Reply::Disconnected
            }
        }

        let mut server = Server::new();
        let seen = record(&mut server);

        let link = Link::new(Arc::new(Mutex::new(Unplugged)), config(false));
        server.spawn_client("link", move |bridge| link.run(bridge));
        server.spawn_client("ui", |bridge| {
            bridge.broadcast(ClientBoundMessage::SelectAircraft(Some(Aircraft::Ka50(Ka50::new()))));
            bridge.broadcast(ClientBoundMessage::StartTransfer(vec![
                entry(0, 42.0, 42.0, NavPointSpec::new(AircraftKind::Ka50, "Waypoint")),
                entry(1, 42.0, 42.0, NavPointSpec::new(AircraftKind::Ka50, "Bogus")),
            ]));
            std::thread::sleep(Duration::from_millis(100));
            bridge.send(ServerBoundMessage::Shutdown);
        });
        server.run();

        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|m| matches!(
            m,
            ClientBoundMessage::TransferErrors(errors) if errors.len() == 1 && errors[0].entry_id == 1
        )));
        assert!(seen
            .iter()
            .any(|m| matches!(m, ClientBoundMessage::TransferRejected(_))));
    }

    #[test]
    fn test_pinned_aircraft_is_kept() {
        let host = Arc::new(Mutex::new(ViperHost::default()));
        let mut server = Server::new();
        let seen = record(&mut server);

        let link = Link::new(host.clone(), config(false));
        server.spawn_client("link", move |bridge| link.run(bridge));
        server.spawn_client("ui", |bridge| {
            bridge.broadcast(ClientBoundMessage::SelectAircraft(Some(Aircraft::Ka50(Ka50::new()))));
            bridge.broadcast(ClientBoundMessage::StartTransfer(vec![entry(
                0,
                42.0,
                42.0,
                NavPointSpec::new(AircraftKind::Ka50, "Waypoint"),
            )]));
            std::thread::sleep(Duration::from_millis(150));
            bridge.send(ServerBoundMessage::Shutdown);
        });
        server.run();

        let seen = seen.lock().unwrap();
        assert!(!seen
            .iter()
            .any(|m| matches!(m, ClientBoundMessage::AircraftDetected(_))));
        assert!(seen
            .iter()
            .any(|m| matches!(m, ClientBoundMessage::UpdateTransferProgress(p) if p.total == 18)));

        let host = host.lock().unwrap();
        let requests = host.requests.lock().unwrap();
        assert_eq!(requests.iter().filter(|r| !r.commands.is_empty()).count(), 1);
        assert!(requests.iter().all(|r| !r.fetch_aircraft_type));
    }
}
