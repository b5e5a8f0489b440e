use std::{
    fmt,
    time::{Duration, Instant},
};

use dcsconnect::{CameraPosition, Reply};

/// What the link shows about the host after a poll.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkStatus {
    NotConnected,
    /// First error reported by the host, verbatim.
    HostError(String),
    NoCoordinates,
    Position(CameraPosition),
}

impl LinkStatus {
    pub fn is_error(&self) -> bool {
        !matches!(self, LinkStatus::Position(_))
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::NotConnected => f.write_str("Not connected"),
            LinkStatus::HostError(error) => f.write_str(error),
            LinkStatus::NoCoordinates => f.write_str("Connected, but no coordinates"),
            LinkStatus::Position(position) => {
                write!(
                    f,
                    "{:.5}°{} {:.5}°{}",
                    position.lat.abs(),
                    if position.lat < 0.0 { 'S' } else { 'N' },
                    position.lon.abs(),
                    if position.lon < 0.0 { 'W' } else { 'E' },
                )?;
                if let Some(alt) = position.alt {
                    write!(f, " | {:.0} m", alt)?;
                }
                if let Some(elevation) = position.elevation {
                    write!(f, " | GND {:.0} m", elevation)?;
                }
                Ok(())
            }
        }
    }
}

/// Turns poll replies into a [`LinkStatus`], keeping a host error on screen
/// for `hold` after it was last reported.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    hold: Duration,
    last_error: Option<(Instant, String)>,
}

impl StatusTracker {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            last_error: None,
        }
    }

    pub fn update(&mut self, reply: &Reply, now: Instant) -> LinkStatus {
        let message = match reply {
            Reply::Disconnected => return LinkStatus::NotConnected,
            Reply::Connected(message) => message,
        };

        if let Some(error) = message.server_errors.first() {
            self.last_error = Some((now, error.clone()));
            return LinkStatus::HostError(error.clone());
        }

        let Some(position) = message.camera_position else {
            return LinkStatus::NoCoordinates;
        };

        if let Some((at, error)) = &self.last_error {
            if now.saturating_duration_since(*at) < self.hold {
                return LinkStatus::HostError(error.clone());
            }
            self.last_error = None;
        }

        LinkStatus::Position(position)
    }
}
