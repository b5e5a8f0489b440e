use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use dcsxfer::{
    aircraft::AircraftKind,
    geo::{DataEntry, GeoPoint, NavPointSpec},
};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style, Stylize},
    text::Span,
    widgets::{Cell, Row, Table, TableState},
    Frame,
};

/// The point list and the row under the cursor.
pub struct EntriesView {
    entries: Vec<DataEntry>,
    selected: usize,
}

impl EntriesView {
    pub fn new(entries: Vec<DataEntry>) -> Self {
        EntriesView {
            entries,
            selected: 0,
        }
    }

    pub fn entries(&self) -> &[DataEntry] {
        &self.entries
    }

    pub fn replace(&mut self, entries: Vec<DataEntry>) {
        self.entries = entries;
        self.selected = 0;
    }

    /// Appends `point` under the next free id and returns that id.
    pub fn push(&mut self, point: GeoPoint) -> usize {
        let id = self.entries.iter().map(|e| e.id + 1).max().unwrap_or(0);
        self.entries.push(DataEntry::new(id, point));
        self.selected = self.entries.len() - 1;
        id
    }

    fn find_mut(&mut self, id: usize) -> Result<&mut DataEntry, String> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| format!("No entry with id {}", id))
    }

    /// Flips the transfer flag of entry `id`, returning the new value.
    pub fn toggle(&mut self, id: usize) -> Result<bool, String> {
        let entry = self.find_mut(id)?;
        entry.transfer = !entry.transfer;
        Ok(entry.transfer)
    }

    pub fn set_spec(&mut self, id: usize, spec: NavPointSpec) -> Result<(), String> {
        self.find_mut(id)?.set_spec(spec);
        Ok(())
    }

    pub fn handle_user_event(&mut self, event: Event) {
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return;
        };

        match code {
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected + 1 < self.entries.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char(' ') => {
                if let Some(entry) = self.entries.get_mut(self.selected) {
                    entry.transfer = !entry.transfer;
                }
            }
            _ => {}
        }
    }

    pub fn draw(&self, rect: Rect, frame: &mut Frame, aircraft: Option<AircraftKind>, in_focus: bool) {
        let header = Row::new(["", "ID", "LABEL", "LAT", "LON", "ALT", "POINT"])
            .style(Style::default().dark_gray());

        let rows = self.entries.iter().map(|entry| {
            let spec = aircraft
                .and_then(|kind| entry.spec_for(kind))
                .map(|spec| match &spec.option {
                    Some(option) => format!("{} : {}", spec.point_type, option),
                    None => spec.point_type.clone(),
                });
            let altitude = format!(
                "{:.0} m {}",
                entry.point.altitude_m,
                if entry.point.is_agl { "AGL" } else { "MSL" }
            );

            Row::new([
                Cell::from(if entry.transfer { "■" } else { "□" }),
                Cell::from(entry.id.to_string()),
                Cell::from(entry.point.label.clone().unwrap_or_default()),
                Cell::from(format!("{:.6}", entry.point.latitude)),
                Cell::from(format!("{:.6}", entry.point.longitude)),
                Cell::from(altitude),
                Cell::from(match spec {
                    Some(spec) => Span::raw(spec),
                    None => Span::styled("-", Style::default().dark_gray()),
                }),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(1),
                Constraint::Length(4),
                Constraint::Min(12),
                Constraint::Length(11),
                Constraint::Length(11),
                Constraint::Length(11),
                Constraint::Min(20),
            ],
        )
        .header(header)
        .highlight_style(if in_focus {
            Style::default().bg(Color::Yellow).fg(Color::Black)
        } else {
            Style::default().bg(Color::Black).bold()
        });

        let mut state = TableState::default().with_selected(
            (!self.entries.is_empty()).then_some(self.selected),
        );
        frame.render_stateful_widget(table, rect, &mut state);
    }
}
