use dcsxfer::{ClientBoundMessage, TransferProgress};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Gauge, Paragraph},
    Frame,
};

/// Most recent problems, newest first.
const MAX_NOTICES: usize = 8;

pub struct TransferView {
    progress: Option<TransferProgress>,
    notices: Vec<String>,
}

impl TransferView {
    pub fn new() -> Self {
        TransferView {
            progress: None,
            notices: Vec::new(),
        }
    }

    pub fn notice(&mut self, text: String) {
        self.notices.insert(0, text);
        self.notices.truncate(MAX_NOTICES);
    }

    pub fn reset(&mut self) {
        self.progress = None;
        self.notices.clear();
    }

    pub fn handle_client_message(&mut self, msg: &ClientBoundMessage) {
        match msg {
            ClientBoundMessage::UpdateTransferProgress(progress) => {
                self.progress = Some(*progress);
            }
            ClientBoundMessage::TransferRejected(reason) => {
                self.notice(reason.clone());
            }
            ClientBoundMessage::TransferErrors(errors) => {
                for error in errors.iter().rev() {
                    self.notice(error.to_string());
                }
            }
            ClientBoundMessage::AircraftDetected(_) => {
                self.progress = None;
            }
            _ => {}
        }
    }

    pub fn draw(&self, rect: Rect, frame: &mut Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(rect);

        let gauge = match self.progress {
            Some(progress) => Gauge::default()
                .gauge_style(Style::default().fg(if progress.is_complete() {
                    Color::Green
                } else {
                    Color::Yellow
                }))
                .ratio(progress.ratio())
                .label(format!("{} / {}", progress.current, progress.total)),
            None => Gauge::default()
                .gauge_style(Style::default().fg(Color::DarkGray))
                .ratio(0.0)
                .label("IDLE"),
        };
        frame.render_widget(gauge, layout[0]);

        let lines: Vec<Line> = self
            .notices
            .iter()
            .map(|notice| Line::from(notice.as_str()).red())
            .collect();
        frame.render_widget(Paragraph::new(lines), layout[2]);
    }
}
