//! TCP transport implementation

use crate::stream::{Transport, TransportLayer};
use async_trait::async_trait;
use han_core::{HanError, HanResult};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub address: SocketAddr,
    pub connect_timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings with the default connect timeout
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            connect_timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create TCP settings with an explicit connect timeout
    pub fn with_timeout(address: SocketAddr, connect_timeout: Duration) -> Self {
        Self {
            address,
            connect_timeout: Some(connect_timeout),
        }
    }
}

/// TCP transport layer implementation
pub struct TcpTransport {
    stream: Option<TcpStream>,
    settings: TcpSettings,
    peer: Option<SocketAddr>,
    closed: bool,
}

impl TcpTransport {
    /// Create a new TCP transport layer
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            peer: None,
            closed: true,
        }
    }

    /// Create TCP transport from address string
    pub fn from_address(address: &str) -> HanResult<Self> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| HanError::InvalidData(format!("Invalid TCP address: {}", e)))?;
        Ok(Self::new(TcpSettings::new(addr)))
    }
}

#[async_trait]
impl TransportLayer for TcpTransport {
    async fn open(&mut self) -> HanResult<()> {
        if !self.closed {
            return Err(HanError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        // Apply timeout to connection establishment if specified
        let stream = if let Some(timeout) = self.settings.connect_timeout {
            tokio::time::timeout(timeout, TcpStream::connect(self.settings.address))
                .await
                .map_err(|_| HanError::Timeout)?
                .map_err(HanError::Connection)?
        } else {
            TcpStream::connect(self.settings.address)
                .await
                .map_err(HanError::Connection)?
        };

        self.peer = stream.peer_addr().ok();
        self.stream = Some(stream);
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read(&mut self, buf: &mut [u8]) -> HanResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            HanError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "TCP stream not connected",
            ))
        })?;

        match stream.read(buf).await {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(HanError::Connection(e))
            }
        }
    }

    async fn close(&mut self) -> HanResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn peer_info(&self) -> String {
        match self.peer {
            Some(addr) => format!("host {} and port {}", addr.ip(), addr.port()),
            None => format!(
                "host {} and port {}",
                self.settings.address.ip(),
                self.settings.address.port()
            ),
        }
    }
}
