//! Message and frame reader contracts
//!
//! A meter pushes framed messages over a byte stream. A [`FrameReader`]
//! extracts complete messages from arbitrarily chunked bytes under one
//! specific framing assumption; a [`MeterMessage`] is one extracted frame.
//!
//! Concrete decoders for national meter standards live outside this
//! workspace and plug in through these traits.

/// One framed message extracted from the byte stream
pub trait MeterMessage: Send {
    /// Whether the frame passed structural validation (checksum etc.)
    fn is_valid(&self) -> bool;

    /// Payload bytes of the message, excluding framing overhead
    ///
    /// May be `None` or empty for frames that carry no data.
    fn payload(&self) -> Option<&[u8]>;

    /// The complete frame bytes, used for diagnostics
    fn as_bytes(&self) -> &[u8];
}

/// Stateful frame extractor for one framing assumption
///
/// Implementations may buffer partial frames across calls. Each call
/// returns every message completed so far, in stream order.
pub trait FrameReader: Send {
    /// Feed a chunk of raw bytes and return completed messages
    fn read(&mut self, data: &[u8]) -> Vec<Box<dyn MeterMessage>>;
}
