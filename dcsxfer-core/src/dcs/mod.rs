mod link;
mod poller;
mod status;
mod transfer;

pub use link::Link;
pub use poller::{Detection, PollGuard, PollOutcome, PollTicket, Poller};
pub use status::{LinkStatus, StatusTracker};
pub use transfer::{Transfer, TransferError, TransferSession};
