mod command_view;
mod connection_view;
mod entries_view;
mod transfer_view;

pub use command_view::{Command, CommandView};
pub use connection_view::ConnectionView;
pub use entries_view::EntriesView;
pub use transfer_view::TransferView;
