//! Core contracts for HAN meter streaming
//!
//! This crate provides the error type and the message/reader contracts
//! shared by the transport and connection layers.

pub mod error;
pub mod message;

pub use error::{HanError, HanResult};
pub use message::{FrameReader, MeterMessage};
