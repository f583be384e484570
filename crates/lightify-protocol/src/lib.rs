//! Lightify binary protocol implementation
//!
//! This crate implements the length-prefixed TCP protocol spoken by OSRAM
//! Lightify gateways on port 4000.

pub mod commands;
pub mod frame;
pub mod transport;
pub mod types;

pub use commands::{CommandId, PacketFlag};
pub use frame::{Frame, FrameHeader, Response, SequenceGenerator, Target};
pub use transport::{Connection, DEFAULT_TIMEOUT, GATEWAY_PORT};
pub use types::*;
