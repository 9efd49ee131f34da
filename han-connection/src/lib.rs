//! Connection supervision and stream demultiplexing
//!
//! This crate is the heart of the HAN streaming client:
//!
//! - [`backoff`]: retry delay policy for failed connect attempts
//! - [`demux`]: probes candidate frame readers against the incoming byte
//!   stream, commits to the first one that produces a valid message, and
//!   forwards messages or payloads to a sink without blocking the I/O path
//! - [`connection`]: pump task binding a transport to a demultiplexer
//! - [`factory`]: connection factory contract and ready-made TCP/serial
//!   factories
//! - [`manager`]: keeps exactly one connection alive, reconnecting with
//!   exponential back-off and a circuit breaker for flapping links

pub mod backoff;
pub mod connection;
pub mod demux;
pub mod factory;
pub mod manager;
pub mod sink;

pub use backoff::{BackOffStrategy, ExponentialBackOff};
pub use connection::{MeterConnection, spawn_connection};
pub use demux::{DoneSignal, StreamDemultiplexer};
pub use factory::{
    ConnectionFactory, connect_serial_messages, connect_serial_payloads, connect_tcp_messages,
    connect_tcp_payloads,
};
pub use manager::{CloseHandle, ConnectionManager};
pub use sink::MessageSink;
