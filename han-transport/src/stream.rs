//! Transport traits for the byte stream to a remote meter

use async_trait::async_trait;
use han_core::HanResult;

/// Read-side access to an open byte stream from a remote meter
#[async_trait]
pub trait Transport: Send {
    /// Read data from the stream
    ///
    /// # Arguments
    ///
    /// * `buf` - Buffer to read into
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> HanResult<usize>;

    /// Close the stream
    ///
    /// Idempotent; closing an already-closed transport is a no-op.
    async fn close(&mut self) -> HanResult<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Human-readable description of the remote endpoint
    ///
    /// `"host {h} and port {p}"` for TCP, the device path for serial.
    /// Used only for log correlation, never for routing.
    fn peer_info(&self) -> String;
}

/// Transport layer trait that extends Transport with connection setup
#[async_trait]
pub trait TransportLayer: Transport {
    /// Open the physical layer connection
    async fn open(&mut self) -> HanResult<()>;
}
