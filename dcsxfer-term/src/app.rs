use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crossbeam_channel::{select, Receiver, Sender};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use dcsxfer::{
    aircraft::AircraftKind,
    config::Config,
    dcs::LinkStatus,
    geo::{self, DataEntry, GeoPoint, NavPointSpec},
    Bridge, ClientBoundMessage, ServerBoundMessage,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Position},
    prelude::{Backend, CrosstermBackend},
    style::{Color, Style, Stylize},
    widgets::{Block, BorderType, Borders},
    Terminal,
};

use crate::ui::{Command, CommandView, ConnectionView, EntriesView, TransferView};

fn is_exit_event(event: &Event) -> bool {
    matches!(event, Event::Key(KeyEvent { code: KeyCode::Char('c'), modifiers, .. }) if modifiers.contains(KeyModifiers::CONTROL))
}

pub struct App {
    config: Config,
    entries: Vec<DataEntry>,
    aircraft: Option<AircraftKind>,
}

impl App {
    pub fn new(config: Config, entries: Vec<DataEntry>, aircraft: Option<AircraftKind>) -> Self {
        Self {
            config,
            entries,
            aircraft,
        }
    }

    /// Draws the UI until shutdown. A terminal failure shuts the server down too.
    pub fn run(self, bridge: Bridge) -> std::io::Result<()> {
        let (rx, tx) = bridge.into_inner();
        let result = self.run_terminal(rx, tx.clone());
        if result.is_err() {
            _ = tx.send(ServerBoundMessage::Shutdown);
        }
        result
    }

    fn run_terminal(
        self,
        rx1: Receiver<ClientBoundMessage>,
        tx1: Sender<ServerBoundMessage>,
    ) -> std::io::Result<()> {
        let mut term = {
            let mut stdout = std::io::stdout();

            crossterm::terminal::enable_raw_mode()?;
            crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
            let backend = CrosstermBackend::new(stdout);
            Terminal::new(backend)?
        };

        let cancellation_token = Arc::new(Mutex::new(false));
        let (tx2, rx2) = crossbeam_channel::unbounded();
        let event_loop_join_handle = {
            let cancellation_token = cancellation_token.clone();
            std::thread::spawn(move || {
                loop {
                    if crossterm::event::poll(std::time::Duration::from_millis(50))? {
                        let e = crossterm::event::read()?;
                        let is_exit_event = is_exit_event(&e);
                        if tx2.send(e).is_err() {
                            break;
                        }

                        if is_exit_event {
                            break;
                        }
                    }

                    if let Ok(cancel) = cancellation_token.lock() {
                        if *cancel {
                            log::debug!("Event loop cancelled");
                            break;
                        }
                    }
                }

                std::io::Result::Ok(())
            })
        };

        let bridge = BridgeSink { tx: tx1 };
        let mut view_state = ViewState::new(self.config, self.entries, self.aircraft);
        view_state.announce_selection(&bridge);

        // First draw, let's get the UI on screen without having to wait for an event
        _ = view_state.draw(&mut term);

        loop {
            let should_draw = select! {
                recv(rx1) -> msg => {
                    match msg {
                        Ok(ClientBoundMessage::Shutdown) | Err(_) => {
                            log::info!("Shutdown message received");
                            break;
                        }
                        Ok(msg) => view_state.handle_client_message(msg),
                    }
                }
                recv(rx2) -> event => {
                    if let Ok(event) = event {
                        if is_exit_event(&event) {
                            bridge.send(ServerBoundMessage::Shutdown);
                        } else {
                            view_state.handle_user_event(&bridge, event);
                        }
                    }

                    true
                }
            };

            if should_draw {
                _ = view_state.draw(&mut term);
            }
        }

        if let Ok(mut cancellation_token) = cancellation_token.lock() {
            *cancellation_token = true;
        }

        let _ = event_loop_join_handle.join();

        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            term.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen,
        )?;

        term.show_cursor()?;

        Ok(())
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

struct ViewState<'a> {
    view_in_focus: Option<FocusedView>,
    config: Config,
    aircraft: Option<AircraftKind>,
    auto_detect: bool,
    entries_path: Option<PathBuf>,

    command_view: CommandView<'a>,
    connection_view: ConnectionView,
    entries_view: EntriesView,
    transfer_view: TransferView,
}

impl<'a> ViewState<'a> {
    fn new(config: Config, entries: Vec<DataEntry>, aircraft: Option<AircraftKind>) -> Self {
        let auto_detect = aircraft.is_none() && config.auto_detect;
        let mut connection_view = ConnectionView::new(auto_detect);
        connection_view.set_aircraft(aircraft, auto_detect);

        ViewState {
            view_in_focus: Some(FocusedView::CommandView),
            config,
            aircraft,
            auto_detect,
            entries_path: None,
            command_view: CommandView::new(),
            connection_view,
            entries_view: EntriesView::new(entries),
            transfer_view: TransferView::new(),
        }
    }

    /// Tells the link about the selection the app started with.
    fn announce_selection(&self, bridge: &BridgeSink) {
        bridge.broadcast(ClientBoundMessage::SetAutoDetect(self.auto_detect));
        if let Some(kind) = self.aircraft {
            bridge.broadcast(ClientBoundMessage::SelectAircraft(Some(self.config.aircraft(kind))));
        }
    }

    fn draw(&self, term: &mut Terminal<impl Backend>) -> std::io::Result<()> {
        let mut effects = Effects::none();
        term.draw(|frame| {
            let layout = Layout::default()
                .direction(Direction::Vertical)
                .margin(0)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Length(3),
                    Constraint::Min(0),
                    Constraint::Length(7),
                ])
                .split(frame.area());

            let layout = &layout[1..];
            const DEFAULT_MARGINS: Margin = Margin::new(1, 1);

            // Render the link status
            self.connection_view
                .draw(layout[0].inner(DEFAULT_MARGINS), frame);

            // Render the main view
            {
                let layout = Layout::default()
                    .direction(Direction::Horizontal)
                    .margin(0)
                    .constraints([Constraint::Min(60), Constraint::Length(48)])
                    .split(layout[1]);

                // Render the entries view
                {
                    let area = layout[0].inner(Margin::new(1, 0));
                    let focused = self.view_in_focus == Some(FocusedView::EntriesView);
                    let block = Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .title(match &self.entries_path {
                            Some(path) => format!(" ENTRIES [e] {} ", path.display()),
                            None => " ENTRIES [e] ".to_string(),
                        })
                        .border_style(focus_style(focused));

                    frame.render_widget(block, area);
                    self.entries_view.draw(
                        area.inner(DEFAULT_MARGINS),
                        frame,
                        self.aircraft,
                        focused,
                    );
                }

                // Render the transfer view
                {
                    let area = layout[1].inner(Margin::new(1, 0));
                    let block = Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .title(" TRANSFER ")
                        .white();

                    frame.render_widget(block, area);
                    self.transfer_view.draw(area.inner(DEFAULT_MARGINS), frame);
                }
            }

            // Render the command view
            {
                let area = layout[2].inner(DEFAULT_MARGINS);
                let focused = self.view_in_focus == Some(FocusedView::CommandView);
                let block = Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(" COMMAND [/] ")
                    .border_style(focus_style(focused));

                frame.render_widget(block, area);
                self.command_view
                    .draw(area.inner(DEFAULT_MARGINS), frame, &mut effects, focused);
            }
        })?;

        effects.apply(term);

        Ok(())
    }

    fn handle_user_event(&mut self, bridge: &BridgeSink, event: Event) {
        let propagate = match &event {
            Event::Key(KeyEvent {
                code: KeyCode::Esc, ..
            }) => {
                self.view_in_focus = None;
                false
            }
            Event::Key(KeyEvent {
                code: KeyCode::Char('/'),
                ..
            }) if event_utils::is_nav_event(&event) => {
                self.view_in_focus = Some(FocusedView::CommandView);
                false
            }
            Event::Key(KeyEvent {
                code: KeyCode::Char('e'),
                ..
            }) if event_utils::is_nav_event(&event) => {
                self.view_in_focus = Some(FocusedView::EntriesView);
                false
            }
            _ => true,
        };

        if propagate {
            match self.view_in_focus {
                Some(FocusedView::CommandView) => {
                    if let Some(command) = self.command_view.handle_user_event(event) {
                        let feedback = self.execute(bridge, command);
                        self.command_view.set_feedback(feedback);
                    }
                }
                Some(FocusedView::EntriesView) => {
                    self.entries_view.handle_user_event(event);
                }
                None => {
                    // Noop
                }
            }
        }
    }

    fn handle_client_message(&mut self, msg: ClientBoundMessage) -> bool {
        if let ClientBoundMessage::AircraftDetected(kind) = &msg {
            self.aircraft = *kind;
        }

        self.connection_view.handle_client_message(&msg);
        self.transfer_view.handle_client_message(&msg);

        true
    }

    fn select_aircraft(&mut self, bridge: &BridgeSink, aircraft: Option<AircraftKind>) {
        self.auto_detect = aircraft.is_none();
        self.aircraft = aircraft;
        self.connection_view.set_aircraft(aircraft, self.auto_detect);
        self.transfer_view.reset();

        bridge.broadcast(ClientBoundMessage::SetAutoDetect(self.auto_detect));
        bridge.broadcast(ClientBoundMessage::SelectAircraft(
            aircraft.map(|kind| self.config.aircraft(kind)),
        ));
    }

    fn execute(&mut self, bridge: &BridgeSink, command: Command) -> Result<String, String> {
        log::debug!("Executing {:?}", command);

        match command {
            Command::Exit => {
                bridge.send(ServerBoundMessage::Shutdown);
                Ok("Exiting".to_string())
            }
            Command::Aircraft(aircraft) => {
                self.select_aircraft(bridge, aircraft);
                Ok(match aircraft {
                    Some(kind) => format!("Selected {}", kind),
                    None => "Waiting for DCS to report the aircraft".to_string(),
                })
            }
            Command::Load(path) => {
                let entries = std::fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|json| geo::entries_from_json(&json).map_err(|e| e.to_string()))
                    .map_err(|e| format!("Cannot load {}: {}", path.display(), e))?;
                let count = entries.len();
                self.entries_view.replace(entries);
                self.entries_path = Some(path);
                Ok(format!("Loaded {} entries", count))
            }
            Command::Save(path) => {
                geo::entries_to_json(self.entries_view.entries())
                    .map_err(|e| e.to_string())
                    .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()))
                    .map_err(|e| format!("Cannot save {}: {}", path.display(), e))?;
                let saved = format!("Saved {}", path.display());
                self.entries_path = Some(path);
                Ok(saved)
            }
            Command::Capture(label) => {
                let LinkStatus::Position(camera) = self.connection_view.status() else {
                    return Err("No camera position from DCS".to_string());
                };

                // Over known terrain the point sits on the ground, otherwise at the camera
                let point = match camera.elevation {
                    Some(elevation) => GeoPoint::new(camera.lat, camera.lon, 0.0, true)
                        .map(|p| p.with_ground_elevation(elevation)),
                    None => GeoPoint::new(camera.lat, camera.lon, camera.alt.unwrap_or(0.0), false),
                }
                .map_err(|e| e.to_string())?;
                let point = match label {
                    Some(label) => point.with_label(label),
                    None => point,
                };
                let id = self.entries_view.push(point);
                Ok(format!("Captured entry {}", id))
            }
            Command::Toggle(id) => {
                let transfer = self.entries_view.toggle(id)?;
                Ok(format!(
                    "Entry {} {}",
                    id,
                    if transfer { "will be sent" } else { "skipped" }
                ))
            }
            Command::Set {
                id,
                point_type,
                option,
            } => {
                let kind = self.aircraft.ok_or("Select an aircraft first")?;
                let aircraft = self.config.aircraft(kind);
                if !aircraft.point_types().contains(&point_type.as_str()) {
                    return Err(format!(
                        "{} has no \"{}\" points, try: {}",
                        kind,
                        point_type,
                        aircraft.point_types().join(", ")
                    ));
                }

                let mut spec = NavPointSpec::new(kind, point_type);
                if let Some(option) = option {
                    spec = spec.with_option(option);
                }
                self.entries_view.set_spec(id, spec)?;
                Ok(format!("Entry {} set for {}", id, kind))
            }
            Command::Send => {
                let entries: Vec<DataEntry> = self
                    .entries_view
                    .entries()
                    .iter()
                    .filter(|e| e.transfer)
                    .cloned()
                    .collect();
                if entries.is_empty() {
                    return Err("Nothing to send".to_string());
                }

                let count = entries.len();
                self.transfer_view.reset();
                bridge.broadcast(ClientBoundMessage::StartTransfer(entries));
                Ok(format!("Sending {} entries", count))
            }
            Command::Stop => {
                bridge.broadcast(ClientBoundMessage::StopTransfer);
                Ok("Stop requested".to_string())
            }
            Command::Clear {
                point_type,
                first,
                last,
            } => {
                if self.aircraft != Some(AircraftKind::Ah64) {
                    return Err("Clearing points needs the AH-64D".to_string());
                }
                let cleared = format!("Clearing {} {}..={}", point_type, first, last);
                self.transfer_view.reset();
                bridge.broadcast(ClientBoundMessage::ClearAh64Points {
                    point_type,
                    first,
                    last,
                });
                Ok(cleared)
            }
        }
    }
}

pub struct BridgeSink {
    tx: Sender<ServerBoundMessage>,
}

impl BridgeSink {
    pub fn send(&self, msg: ServerBoundMessage) {
        let _ = self.tx.send(msg);
    }

    pub fn broadcast(&self, msg: ClientBoundMessage) {
        self.send(ServerBoundMessage::Broadcast(msg))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedView {
    CommandView,
    EntriesView,
}

pub struct Effects {
    cursor_position: Option<(u16, u16)>,
}

impl Effects {
    pub fn none() -> Self {
        Self {
            cursor_position: None,
        }
    }

    pub fn set_cursor_position(&mut self, x: u16, y: u16) {
        self.cursor_position = Some((x, y));
    }

    pub fn apply(&self, term: &mut Terminal<impl Backend>) {
        match self.cursor_position {
            Some((x, y)) => {
                _ = term.show_cursor();
                _ = term.set_cursor_position(Position { x, y });
            }
            None => {
                _ = term.hide_cursor();
            }
        }
    }
}

pub mod event_utils {
    use crossterm::event::{Event, KeyEvent, KeyModifiers};

    pub fn is_nav_event(e: &Event) -> bool {
        matches!(e, Event::Key(KeyEvent { modifiers, .. }) if modifiers.contains(KeyModifiers::ALT))
    }
}

#[cfg(test)]
mod tests {
    use dcsconnect::CameraPosition;
    use dcsxfer::config::ConfigFile;

    use super::*;

    fn state(aircraft: Option<AircraftKind>) -> (ViewState<'static>, BridgeSink, Receiver<ServerBoundMessage>) {
        state_with(aircraft, Vec::new())
    }

    fn state_with(
        aircraft: Option<AircraftKind>,
        entries: Vec<DataEntry>,
    ) -> (ViewState<'static>, BridgeSink, Receiver<ServerBoundMessage>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let config = ConfigFile::default().resolve().unwrap();
        (ViewState::new(config, entries, aircraft), BridgeSink { tx }, rx)
    }

    fn entries(count: usize) -> Vec<DataEntry> {
        (0..count)
            .map(|id| DataEntry::new(id, GeoPoint::new(41.0 + id as f64, 41.0, 100.0, false).unwrap()))
            .collect()
    }

    fn broadcasts(rx: &Receiver<ServerBoundMessage>) -> Vec<ClientBoundMessage> {
        rx.try_iter()
            .filter_map(|m| match m {
                ServerBoundMessage::Broadcast(message) => Some(message),
                ServerBoundMessage::Shutdown => None,
            })
            .collect()
    }

    #[test]
    fn test_pinning_aircraft_turns_detection_off() {
        let (mut state, bridge, rx) = state(None);
        assert!(state.auto_detect);

        state
            .execute(&bridge, Command::Aircraft(Some(AircraftKind::Fa18c)))
            .unwrap();
        let sent = broadcasts(&rx);
        assert!(matches!(sent[0], ClientBoundMessage::SetAutoDetect(false)));
        assert!(matches!(
            &sent[1],
            ClientBoundMessage::SelectAircraft(Some(aircraft)) if aircraft.kind() == AircraftKind::Fa18c
        ));

        state.execute(&bridge, Command::Aircraft(None)).unwrap();
        let sent = broadcasts(&rx);
        assert!(matches!(sent[0], ClientBoundMessage::SetAutoDetect(true)));
        assert!(matches!(sent[1], ClientBoundMessage::SelectAircraft(None)));
    }

    #[test]
    fn test_send_only_flagged_entries() {
        let (mut empty, bridge, _rx) = state(Some(AircraftKind::Ka50));
        assert_eq!(empty.execute(&bridge, Command::Send), Err("Nothing to send".to_string()));

        let (mut state, bridge, rx) = state_with(Some(AircraftKind::Ka50), entries(3));
        state.execute(&bridge, Command::Toggle(1)).unwrap();
        state.execute(&bridge, Command::Send).unwrap();

        let sent = broadcasts(&rx);
        let Some(ClientBoundMessage::StartTransfer(entries)) = sent.last() else {
            panic!("no transfer started: {:?}", sent);
        };
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_set_checks_point_type() {
        let (mut state, bridge, _rx) = state_with(None, entries(1));

        let set = |point_type: &str| Command::Set {
            id: 0,
            point_type: point_type.to_string(),
            option: None,
        };
        assert!(state.execute(&bridge, set("Waypoint")).is_err());

        state.handle_client_message(ClientBoundMessage::AircraftDetected(Some(AircraftKind::Ka50)));
        assert!(state.execute(&bridge, set("Steerpoint")).is_err());
        state.execute(&bridge, set("Waypoint")).unwrap();
        assert!(state.entries_view.entries()[0]
            .spec_for(AircraftKind::Ka50)
            .is_some());

        // Out of the cockpit, nothing to set points for
        state.handle_client_message(ClientBoundMessage::AircraftDetected(None));
        assert!(state.execute(&bridge, set("Waypoint")).is_err());
    }

    #[test]
    fn test_capture_uses_camera_position() {
        let (mut state, bridge, _rx) = state(None);
        assert!(state.execute(&bridge, Command::Capture(None)).is_err());

        state.handle_client_message(ClientBoundMessage::UpdateLinkStatus(LinkStatus::Position(
            CameraPosition {
                lat: 41.6,
                lon: 41.6,
                alt: Some(1500.0),
                elevation: Some(120.0),
            },
        )));
        state
            .execute(&bridge, Command::Capture(Some("Bridge".to_string())))
            .unwrap();

        let point = &state.entries_view.entries()[0].point;
        assert!(point.is_agl);
        assert_eq!(point.msl_altitude_m(), Some(120.0));
        assert_eq!(point.label.as_deref(), Some("Bridge"));
    }

    #[test]
    fn test_clear_needs_ah64() {
        let (mut state, bridge, rx) = state(Some(AircraftKind::Ka50));
        let clear = || Command::Clear {
            point_type: "Hazard".to_string(),
            first: 1,
            last: 3,
        };
        assert!(state.execute(&bridge, clear()).is_err());

        state
            .execute(&bridge, Command::Aircraft(Some(AircraftKind::Ah64)))
            .unwrap();
        state.execute(&bridge, clear()).unwrap();
        assert!(matches!(
            broadcasts(&rx).last(),
            Some(ClientBoundMessage::ClearAh64Points { first: 1, last: 3, .. })
        ));
    }
}
