//! Serial port transport implementation

use crate::stream::{Transport, TransportLayer};
use async_trait::async_trait;
use han_core::{HanError, HanResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Serial port transport layer settings
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
}

impl SerialSettings {
    /// Create new serial settings with 8-N-1 framing and no flow control
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::None,
        }
    }

    /// Create serial settings with an explicit parity
    ///
    /// Some HAN ports use even parity; the rest of the framing stays 8-1.
    pub fn with_parity(port_name: String, baud_rate: u32, parity: tokio_serial::Parity) -> Self {
        Self {
            parity,
            ..Self::new(port_name, baud_rate)
        }
    }
}

/// Serial port transport layer implementation
pub struct SerialTransport {
    stream: Option<SerialStream>,
    settings: SerialSettings,
    closed: bool,
}

impl SerialTransport {
    /// Create a new serial transport layer
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create serial transport with port name and baud rate
    pub fn new_simple(port_name: String, baud_rate: u32) -> Self {
        Self::new(SerialSettings::new(port_name, baud_rate))
    }
}

#[async_trait]
impl TransportLayer for SerialTransport {
    async fn open(&mut self) -> HanResult<()> {
        if !self.closed {
            return Err(HanError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let builder = tokio_serial::new(&self.settings.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .stop_bits(self.settings.stop_bits)
            .parity(self.settings.parity)
            .flow_control(self.settings.flow_control);

        let stream = builder
            .open_native_async()
            .map_err(|e| HanError::Serial(format!("Failed to open serial port: {}", e)))?;

        self.stream = Some(stream);
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn read(&mut self, buf: &mut [u8]) -> HanResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            HanError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Serial stream not connected",
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
            let _ = stream.flush().await;
        }
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn peer_info(&self) -> String {
        self.settings.port_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_settings() {
        let settings = SerialSettings::new("/dev/ttyUSB0".to_string(), 2400);
        assert_eq!(settings.port_name, "/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 2400);
        assert_eq!(settings.parity, tokio_serial::Parity::None);
    }

    #[test]
    fn test_serial_settings_with_parity() {
        let settings = SerialSettings::with_parity(
            "/dev/ttyS0".to_string(),
            2400,
            tokio_serial::Parity::Even,
        );
        assert_eq!(settings.parity, tokio_serial::Parity::Even);
        assert_eq!(settings.data_bits, tokio_serial::DataBits::Eight);
    }

    #[test]
    fn test_peer_info_is_port_name() {
        let transport = SerialTransport::new_simple("/dev/ttyUSB0".to_string(), 2400);
        assert_eq!(transport.peer_info(), "/dev/ttyUSB0");
        assert!(transport.is_closed());
    }
}
