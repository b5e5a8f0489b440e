use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpStream},
    time::{Duration, Instant},
};

pub mod codec;
mod error;
mod message;

pub use error::Error;
pub use message::{Activation, CameraPosition, DcsCommand, DcsMessage, WeaponStation};

/// Port the export script inside DCS listens on.
pub const DEFAULT_PORT: u16 = 42070;

/// Outcome of one request/response exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Connected(DcsMessage),
    Disconnected,
}

impl Reply {
    pub fn is_connected(&self) -> bool {
        matches!(self, Reply::Connected(_))
    }

    pub fn into_message(self) -> Option<DcsMessage> {
        match self {
            Reply::Connected(message) => Some(message),
            Reply::Disconnected => None,
        }
    }
}

/// A synchronous request/response channel to the host.
///
/// Implementations must never block longer than their own timeout and must
/// report every failure as [`Reply::Disconnected`].
pub trait Transport: Send {
    fn send_request(&self, message: &DcsMessage) -> Reply;
}

pub struct DcsConnection {
    addr: SocketAddr,
    timeout: Duration,
}

impl DcsConnection {
    pub fn open(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn exchange(&self, message: &DcsMessage) -> Result<DcsMessage, Error> {
        let deadline = Instant::now() + self.timeout;
        let frame = codec::encode(message)?;

        let mut stream = TcpStream::connect_timeout(&self.addr, self.timeout)?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(self.remaining(deadline)?))?;
        stream.write_all(&frame)?;
        stream.flush()?;

        let mut buffer = codec::FrameBuffer::new();
        let mut chunk = [0u8; 4096];
        loop {
            stream.set_read_timeout(Some(self.remaining(deadline)?))?;
            let read = stream.read(&mut chunk)?;
            if read == 0 {
                return Err(Error::UnexpectedEof);
            }

            if let Some(frame) = buffer.push(&chunk[..read])? {
                return codec::decode(&frame);
            }
        }
    }

    // Socket timeouts reject a zero duration, so an expired deadline is its own error.
    fn remaining(&self, deadline: Instant) -> Result<Duration, Error> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            Err(Error::TimedOut(self.timeout))
        } else {
            Ok(remaining)
        }
    }
}

impl Transport for DcsConnection {
    fn send_request(&self, message: &DcsMessage) -> Reply {
        match self.exchange(message) {
            Ok(response) => Reply::Connected(response),
            Err(e) => {
                log::debug!("Exchange with {} failed: {}", self.addr, e);
                Reply::Disconnected
            }
        }
    }
}
