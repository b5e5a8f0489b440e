pub mod aircraft;
pub mod config;
pub mod dcs;
pub mod geo;
mod server;
mod types;

pub use server::{Bridge, Server};
pub use types::*;
