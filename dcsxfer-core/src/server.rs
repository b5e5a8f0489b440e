use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::types::{ClientBoundMessage, ServerBoundMessage};

/// Fans messages out between the threads of the application.
///
/// Every client runs on its own thread and talks to the others only by
/// broadcasting through the server.
pub struct Server {
    clients: Vec<ClientHandle>,
    rx: Receiver<ServerBoundMessage>,
    tx: Sender<ServerBoundMessage>,
}

impl Server {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Server {
            clients: Vec::new(),
            rx,
            tx,
        }
    }

    pub fn spawn_client(&mut self, id: &'static str, f: impl FnOnce(Bridge) + Send + 'static) {
        let (client_tx, client_rx) = crossbeam_channel::unbounded();
        let server_tx = self.tx.clone();

        let join_handle = std::thread::spawn(move || {
            let bridge = Bridge {
                rx: client_rx,
                tx: server_tx,
            };

            f(bridge);
        });

        log::debug!("Spawned client {}", id);
        self.clients.push(ClientHandle {
            id,
            join_handle,
            tx: client_tx,
        });
    }

    pub fn run(self) {
        log::info!("Server is running with {} clients", self.clients.len());

        if !self.clients.is_empty() {
            loop {
                match self.rx.recv() {
                    Ok(ServerBoundMessage::Broadcast(message)) => {
                        self.post_to_all_clients(message);
                    }
                    Ok(ServerBoundMessage::Shutdown) => {
                        log::info!("Shutdown requested");
                        break;
                    }
                    Err(e) => {
                        log::warn!("Server channel is closed: {}", e);
                        break;
                    }
                }
            }
        }

        log::info!("Server is shutting down...");

        self.post_to_all_clients(ClientBoundMessage::Shutdown);
        for client in self.clients {
            if client.join_handle.join().is_err() {
                log::error!("Client {} panicked", client.id);
            }
        }
    }

    fn post_to_all_clients(&self, message: ClientBoundMessage) {
        for client in &self.clients {
            _ = client.tx.send(message.clone());
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

/// A client's end of the server connection.
pub struct Bridge {
    rx: Receiver<ClientBoundMessage>,
    tx: Sender<ServerBoundMessage>,
}

impl Bridge {
    pub fn into_inner(self) -> (Receiver<ClientBoundMessage>, Sender<ServerBoundMessage>) {
        (self.rx, self.tx)
    }

    pub fn send(&self, message: ServerBoundMessage) {
        if self.tx.send(message).is_err() {
            log::warn!("Server channel is closed");
        }
    }

    pub fn broadcast(&self, message: ClientBoundMessage) {
        self.send(ServerBoundMessage::Broadcast(message));
    }

    /// Blocks for the next message. A closed channel reads as `Shutdown`.
    pub fn recv(&self) -> ClientBoundMessage {
        self.rx.recv().unwrap_or(ClientBoundMessage::Shutdown)
    }

    /// Calls `f` once per `interval` with the messages received since the
    /// previous call, until the server shuts down.
    pub fn recv_with_interval(
        self,
        interval: Duration,
        mut f: impl FnMut(&[ClientBoundMessage], &Sender<ServerBoundMessage>),
    ) {
        let (rx, tx) = self.into_inner();
        let mut queue = Vec::new();
        let mut next_invocation = Instant::now() + interval;
        loop {
            let wait = next_invocation.saturating_duration_since(Instant::now());
            match rx.recv_timeout(wait) {
                Ok(ClientBoundMessage::Shutdown) => {
                    break;
                }
                Ok(message) => {
                    queue.push(message);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if Instant::now() >= next_invocation {
                f(&queue, &tx);
                queue.clear();
                next_invocation = Instant::now() + interval;
            }
        }
    }
}

pub struct ClientHandle {
    id: &'static str,
    join_handle: std::thread::JoinHandle<()>,
    tx: Sender<ClientBoundMessage>,
}
