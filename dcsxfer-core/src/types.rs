use crate::{
    aircraft::{Aircraft, AircraftKind, EntryError},
    dcs::LinkStatus,
    geo::DataEntry,
};

#[derive(Debug, Clone)]
pub enum ClientBoundMessage {
    Shutdown,
    SelectAircraft(Option<Aircraft>),
    SetAutoDetect(bool),
    StartTransfer(Vec<DataEntry>),
    StopTransfer,
    ClearAh64Points {
        point_type: String,
        first: u32,
        last: u32,
    },
    UpdateLinkStatus(LinkStatus),
    UpdateTransferProgress(TransferProgress),
    /// `None` when DCS reports no aircraft, or one that cannot be served.
    AircraftDetected(Option<AircraftKind>),
    TransferRejected(String),
    TransferErrors(Vec<EntryError>),
}

#[derive(Debug, Clone)]
pub enum ServerBoundMessage {
    Shutdown,
    Broadcast(ClientBoundMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub current: usize,
    pub total: usize,
}

impl TransferProgress {
    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
        }
    }
}
