pub mod config;
pub mod connection;
pub mod forwarder;
pub mod hub;
pub mod id_types;
pub mod logging;
pub mod media_setup;
pub mod metrics;
pub mod participant;
pub mod protocol;
pub mod room;
pub mod sfu_service;

pub use connection::Connection;
pub use hub::Hub;
pub use media_setup::MediaSetup;
pub use participant::{Participant, Role, ViewerState};
pub use room::Room;
pub use sfu_service::{signaling_route, SfuService};

#[cfg(test)]
mod tests;
