//! Newline-delimited JSON framing.
//!
//! Messages are written in compact form, where serde_json escapes every newline
//! inside strings, so a raw `\n` can only ever be the frame terminator.

use crate::{error::Error, message::DcsMessage};

pub const DELIMITER: u8 = b'\n';

/// Upper bound for a single frame. A reply carries at most a few hundred
/// weapon stations or errors, far below this.
pub const MAX_FRAME_LEN: usize = 1 << 20;

pub fn encode(message: &DcsMessage) -> Result<Vec<u8>, Error> {
    let mut frame = serde_json::to_vec(message)?;
    frame.push(DELIMITER);
    Ok(frame)
}

pub fn decode(frame: &[u8]) -> Result<DcsMessage, Error> {
    let frame = match frame.last() {
        Some(&DELIMITER) => &frame[..frame.len() - 1],
        _ => frame,
    };

    // Tolerate a CRLF terminator from the Lua side
    let frame = match frame.last() {
        Some(b'\r') => &frame[..frame.len() - 1],
        _ => frame,
    };

    Ok(serde_json::from_slice(frame)?)
}

/// Accumulates bytes read from the socket until one full frame is present.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns the first complete frame, without its
    /// delimiter, once one is available.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let searched = self.buf.len();
        self.buf.extend_from_slice(bytes);

        if let Some(offset) = self.buf[searched..].iter().position(|&b| b == DELIMITER) {
            let end = searched + offset;
            let frame = self.buf[..end].to_vec();
            self.buf.drain(..=end);
            return Ok(Some(frame));
        }

        if self.buf.len() > MAX_FRAME_LEN {
            return Err(Error::FrameTooLarge(MAX_FRAME_LEN));
        }

        Ok(None)
    }
}
