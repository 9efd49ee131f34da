//! Transport layer module for HAN meter streaming
//!
//! This crate provides transport layer implementations for TCP and Serial
//! communication. A meter pushes data; the transports here are read-side
//! only and expose a human-readable peer description for diagnostics.

pub mod serial;
pub mod stream;
pub mod tcp;

pub use serial::{SerialSettings, SerialTransport};
pub use stream::{Transport, TransportLayer};
pub use tcp::{TcpSettings, TcpTransport};
