//! han - resilient streaming client for smart meter HAN ports
//!
//! Maintains a byte-stream connection (serial line or TCP socket) to a
//! meter that pushes framed messages in one of several possible encodings,
//! recovers automatically from connection loss, and hands validated
//! payloads to a downstream consumer without blocking the I/O path.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `han-core`: message/reader contracts and error handling
//! - `han-transport`: transport layer (TCP, Serial)
//! - `han-connection`: stream demultiplexing, back-off, connection
//!   supervision
//!
//! # Usage
//!
//! ```no_run
//! use han::connection::{ConnectionManager, connect_tcp_payloads};
//! use han::transport::TcpSettings;
//! use tokio::sync::mpsc;
//!
//! # async fn run(readers: impl Fn() -> Vec<Box<dyn han::FrameReader>> + Send + 'static) {
//! let (tx, _rx) = mpsc::unbounded_channel();
//!
//! let factory = move || {
//!     let sink = Box::new(tx.clone());
//!     let settings = TcpSettings::new("192.168.1.10:3001".parse().unwrap());
//!     connect_tcp_payloads(settings, readers(), sink)
//! };
//!
//! let mut manager = ConnectionManager::new(Box::new(factory));
//! let closer = manager.close_handle();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     closer.close();
//! });
//! manager.run_loop().await;
//! # }
//! ```

// Re-export core types
pub use han_core::{FrameReader, HanError, HanResult, MeterMessage};

// Re-export transport API
pub mod transport {
    pub use han_transport::*;
}

// Re-export connection API
pub mod connection {
    pub use han_connection::*;
}
