use std::path::PathBuf;

use crossterm::event::{Event, KeyCode, KeyEvent};
use dcsxfer::aircraft::AircraftKind;
use ratatui::{
    layout::{self, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Style, Stylize},
    widgets::Paragraph,
    Frame,
};
use tui_textarea::TextArea;

use crate::app::Effects;

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Exit,
    /// `None` hands the choice back to detection.
    Aircraft(Option<AircraftKind>),
    Load(PathBuf),
    Save(PathBuf),
    Capture(Option<String>),
    Toggle(usize),
    Set {
        id: usize,
        point_type: String,
        option: Option<String>,
    },
    Send,
    Stop,
    Clear {
        point_type: String,
        first: u32,
        last: u32,
    },
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T, String> {
    let word = word.ok_or_else(|| format!("Missing {}", what))?;
    word.parse()
        .map_err(|_| format!("Invalid {}: \"{}\"", what, word))
}

fn rest(words: std::str::SplitWhitespace<'_>) -> Option<String> {
    let rest = words.collect::<Vec<_>>().join(" ");
    (!rest.is_empty()).then_some(rest)
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("Empty command".to_string());
    };

    match verb {
        "exit" | "quit" => Ok(Command::Exit),
        "aircraft" => match words.next() {
            Some("auto") => Ok(Command::Aircraft(None)),
            Some(kind) => kind.parse().map(|kind| Command::Aircraft(Some(kind))),
            None => Err("Usage: aircraft <kind|auto>".to_string()),
        },
        "load" | "save" => {
            let path = rest(words).ok_or_else(|| format!("Usage: {} <path>", verb))?;
            Ok(if verb == "load" {
                Command::Load(path.into())
            } else {
                Command::Save(path.into())
            })
        }
        "capture" => Ok(Command::Capture(rest(words))),
        "toggle" => Ok(Command::Toggle(number(words.next(), "entry id")?)),
        "set" => {
            let id = number(words.next(), "entry id")?;
            let spec = rest(words).ok_or("Usage: set <id> <point type> [: <option>]")?;
            let (point_type, option) = match spec.split_once(':') {
                Some((point_type, option)) => (point_type.trim(), Some(option.trim())),
                None => (spec.as_str(), None),
            };
            Ok(Command::Set {
                id,
                point_type: point_type.to_string(),
                option: option.filter(|o| !o.is_empty()).map(str::to_string),
            })
        }
        "send" => Ok(Command::Send),
        "stop" => Ok(Command::Stop),
        "clear" => {
            let first = number(words.next(), "first point")?;
            let last = number(words.next(), "last point")?;
            let point_type = rest(words).ok_or("Usage: clear <first> <last> <point type>")?;
            Ok(Command::Clear {
                point_type,
                first,
                last,
            })
        }
        _ => Err(format!("Unknown command: \"{}\"", verb)),
    }
}

fn empty_prompt<'a>() -> TextArea<'a> {
    let mut prompt_field = TextArea::default();

    // Prevent the text area widget from managing the cursor
    // because it overwrites the default cursor style the terminal has configured
    prompt_field.set_cursor_style(Style::default().hidden());
    prompt_field
}

pub struct CommandView<'a> {
    prompt_field: TextArea<'a>,
    feedback: Option<Result<String, String>>,
}

impl<'a> CommandView<'a> {
    pub fn new() -> Self {
        CommandView {
            prompt_field: empty_prompt(),
            feedback: None,
        }
    }

    /// Shows the outcome of the last command under the prompt.
    pub fn set_feedback(&mut self, feedback: Result<String, String>) {
        self.feedback = Some(feedback);
    }

    pub fn handle_user_event(&mut self, event: Event) -> Option<Command> {
        if !matches!(
            event,
            Event::Key(KeyEvent {
                code: KeyCode::Enter,
                ..
            })
        ) {
            self.prompt_field.input(event);
            return None;
        }

        let line = self.prompt_field.lines()[0].trim().to_string();

        // https://github.com/rhysd/tui-textarea/issues/57
        self.prompt_field = empty_prompt();

        if line.is_empty() {
            return None;
        }

        match parse_command(&line) {
            Ok(command) => Some(command),
            Err(e) => {
                self.feedback = Some(Err(e));
                None
            }
        }
    }

    pub fn draw(&self, rect: Rect, frame: &mut Frame, effects: &mut Effects, in_focus: bool) {
        let rect = rect.inner(Margin::new(1, 1));
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(rect);

        // Prompt
        {
            let layout = layout::Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(2), Constraint::Min(0)])
                .split(layout[0]);

            frame.render_widget(Paragraph::new("> ").dark_gray(), layout[0]);
            frame.render_widget(
                Paragraph::new(self.prompt_field.lines()[0].clone())
                    .bold()
                    .fg(if in_focus {
                        Color::White
                    } else {
                        Color::DarkGray
                    }),
                layout[1],
            );

            if in_focus {
                let (cursor_y, cursor_x) = self.prompt_field.cursor();
                effects.set_cursor_position(
                    (cursor_x as u16) + layout[1].x,
                    (cursor_y as u16) + layout[1].y,
                );
            }
        }

        match &self.feedback {
            Some(Ok(text)) => frame.render_widget(Paragraph::new(text.as_str()).green(), layout[1]),
            Some(Err(text)) => frame.render_widget(Paragraph::new(text.as_str()).red(), layout[1]),
            None => frame.render_widget(
                Paragraph::new("aircraft | load | save | capture | toggle | set | send | stop | clear | exit")
                    .dark_gray(),
                layout[1],
            ),
        }
    }
}
