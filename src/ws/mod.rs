//! WebSocket transport and wire protocol

pub mod client;
pub mod protocol;
