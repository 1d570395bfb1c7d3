//! [`Connector`] for a controller attached as a serial port
use std::io::{self, Read};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

use super::{ChunkSource, Connector, SessionError};

pub const DEFAULT_BAUD_RATE: u32 = 9_600;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Port settings, defaults match the controller firmware (9600 8N1)
#[derive(Clone, Debug, PartialEq)]
pub struct SerialConfig {
    /// port to open, the first USB serial port found when `None`
    pub path: Option<String>,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// how long a read waits for data before reporting an empty chunk
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: None,
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SerialConfig {
    pub fn with_path(path: &str) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }
}

impl From<serialport::Error> for SessionError {
    fn from(e: serialport::Error) -> SessionError {
        match e.kind() {
            serialport::ErrorKind::NoDevice => SessionError::NotFound,
            serialport::ErrorKind::InvalidInput => SessionError::InvalidConfig,
            serialport::ErrorKind::Io(kind) => io::Error::from(kind).into(),
            serialport::ErrorKind::Unknown => SessionError::Io(io::ErrorKind::Other),
        }
    }
}

pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn port_name(&self) -> Result<String, SessionError> {
        if let Some(path) = &self.config.path {
            return Ok(path.clone());
        }
        serialport::available_ports()?
            .into_iter()
            .find(|port| matches!(port.port_type, SerialPortType::UsbPort(_)))
            .map(|port| port.port_name)
            .ok_or(SessionError::NotFound)
    }
}

impl Connector for SerialConnector {
    type Source = SerialSource;

    fn try_open(&mut self) -> Result<SerialSource, SessionError> {
        let name = self.port_name()?;
        let port = serialport::new(name.as_str(), self.config.baud_rate)
            .data_bits(self.config.data_bits)
            .parity(self.config.parity)
            .stop_bits(self.config.stop_bits)
            .flow_control(FlowControl::None)
            .timeout(self.config.read_timeout)
            .open()?;
        debug!("opened serial port");
        Ok(SerialSource { port: Some(port) })
    }
}

/// Open serial port delivering raw byte chunks
pub struct SerialSource {
    port: Option<Box<dyn SerialPort>>,
}

impl ChunkSource for SerialSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        let port = self.port.as_mut().ok_or(SessionError::Disconnected)?;
        match port.read(buf) {
            // a tty reporting end of file has been unplugged
            Ok(0) => Err(SessionError::Disconnected),
            Ok(read) => Ok(read),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        self.port = None;
    }
}
