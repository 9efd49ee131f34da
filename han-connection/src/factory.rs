//! Connection factory contract and ready-made factories
//!
//! The connection manager keeps a connection alive by invoking a factory
//! whenever it needs a fresh (transport, demultiplexer) pair. Factories
//! must be re-invocable arbitrarily many times. Cancellation follows tokio
//! semantics: dropping the returned future aborts an in-flight connect.

use crate::connection::{MeterConnection, spawn_connection};
use crate::demux::StreamDemultiplexer;
use crate::sink::MessageSink;
use async_trait::async_trait;
use bytes::Bytes;
use han_core::{FrameReader, HanResult, MeterMessage};
use han_transport::{SerialSettings, SerialTransport, TcpSettings, TcpTransport, TransportLayer};

/// Factory producing one live connection per invocation
#[async_trait]
pub trait ConnectionFactory: Send {
    /// Open a transport and return its spawned connection pair
    async fn connect(&mut self) -> HanResult<MeterConnection>;
}

#[async_trait]
impl<F, Fut> ConnectionFactory for F
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = HanResult<MeterConnection>> + Send,
{
    async fn connect(&mut self) -> HanResult<MeterConnection> {
        (self)().await
    }
}

/// Connect over TCP and forward whole messages to the sink
pub async fn connect_tcp_messages(
    settings: TcpSettings,
    readers: Vec<Box<dyn FrameReader>>,
    sink: Box<dyn MessageSink<Box<dyn MeterMessage>>>,
) -> HanResult<MeterConnection> {
    let mut transport = TcpTransport::new(settings);
    transport.open().await?;
    Ok(spawn_connection(
        transport,
        StreamDemultiplexer::forwarding_messages(readers, sink),
    ))
}

/// Connect over TCP and forward validated payload bytes to the sink
pub async fn connect_tcp_payloads(
    settings: TcpSettings,
    readers: Vec<Box<dyn FrameReader>>,
    sink: Box<dyn MessageSink<Bytes>>,
) -> HanResult<MeterConnection> {
    let mut transport = TcpTransport::new(settings);
    transport.open().await?;
    Ok(spawn_connection(
        transport,
        StreamDemultiplexer::forwarding_payloads(readers, sink),
    ))
}

/// Open a serial port and forward whole messages to the sink
pub async fn connect_serial_messages(
    settings: SerialSettings,
    readers: Vec<Box<dyn FrameReader>>,
    sink: Box<dyn MessageSink<Box<dyn MeterMessage>>>,
) -> HanResult<MeterConnection> {
    let mut transport = SerialTransport::new(settings);
    transport.open().await?;
    Ok(spawn_connection(
        transport,
        StreamDemultiplexer::forwarding_messages(readers, sink),
    ))
}

/// Open a serial port and forward validated payload bytes to the sink
pub async fn connect_serial_payloads(
    settings: SerialSettings,
    readers: Vec<Box<dyn FrameReader>>,
    sink: Box<dyn MessageSink<Bytes>>,
) -> HanResult<MeterConnection> {
    let mut transport = SerialTransport::new(settings);
    transport.open().await?;
    Ok(spawn_connection(
        transport,
        StreamDemultiplexer::forwarding_payloads(readers, sink),
    ))
}
