use dcsxfer::{aircraft::AircraftKind, dcs::LinkStatus, ClientBoundMessage};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub struct ConnectionView {
    status: LinkStatus,
    aircraft: Option<AircraftKind>,
    auto_detect: bool,
}

impl ConnectionView {
    pub fn new(auto_detect: bool) -> Self {
        ConnectionView {
            status: LinkStatus::NotConnected,
            aircraft: None,
            auto_detect,
        }
    }

    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    pub fn set_aircraft(&mut self, aircraft: Option<AircraftKind>, auto_detect: bool) {
        self.aircraft = aircraft;
        self.auto_detect = auto_detect;
    }

    pub fn handle_client_message(&mut self, msg: &ClientBoundMessage) {
        match msg {
            ClientBoundMessage::UpdateLinkStatus(status) => {
                self.status = status.clone();
            }
            ClientBoundMessage::AircraftDetected(kind) => {
                self.aircraft = *kind;
            }
            _ => {}
        }
    }

    pub fn draw(&self, rect: Rect, frame: &mut Frame) {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(24)])
            .split(rect);

        let (marker, color) = match &self.status {
            LinkStatus::Position(_) => ("●", Color::Green),
            LinkStatus::NoCoordinates | LinkStatus::HostError(_) => ("●", Color::Yellow),
            LinkStatus::NotConnected => ("○", Color::Red),
        };

        frame.render_widget(
            Paragraph::new(format!("{} {}", marker, self.status)).style(Style::default().fg(color)),
            layout[0],
        );

        let aircraft = match self.aircraft {
            Some(kind) => Span::styled(kind.name(), Style::default().bold()),
            None => Span::styled("NO AIRCRAFT", Style::default().dark_gray()),
        };
        let mode = if self.auto_detect { " [AUTO]" } else { " [PINNED]" };

        frame.render_widget(
            Paragraph::new(Line::from(vec![aircraft, Span::raw(mode).dark_gray()])).right_aligned(),
            layout[1],
        );
    }
}
