//! Serial session lifecycle
//!
//! A [`Session`] is one open connection to the vehicle controller. Opening it creates the
//! [`TelemetryState`] and publishes it through a [`TelemetryHandle`], dropping it closes the
//! connection and withdraws the state, on every exit path.
//!
//! [`Link`] keeps a session alive: it scans for the controller while disconnected, decodes
//! chunks while connected and goes back to scanning when the connection is lost.
//!
//! ```text
//!              start()              try_open ok
//! Disconnected -------> Scanning -----------------> Connected
//!      ^                   ^                            |
//!      |   close()         |   rescan                   | read error / close()
//!      +---------------- Closing <----------------------+
//! ```
use std::io;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::frame::codec::WireCodec;
use crate::frame::{DecodeMode, DecodeStats, Outcome, TelemetryDecoder};
use crate::telemetry::TelemetryState;

#[cfg(feature = "serialport")]
pub mod serial;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_READ_BUFFER_LENGTH: usize = 256;

#[derive(Debug, PartialEq)]
pub enum SessionError {
    /// no controller is attached
    NotFound,
    PermissionDenied,
    /// port settings were refused by the device
    InvalidConfig,
    /// controller went away while the session was open
    Disconnected,
    Io(io::ErrorKind),
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> SessionError {
        match e.kind() {
            io::ErrorKind::NotFound => SessionError::NotFound,
            io::ErrorKind::PermissionDenied => SessionError::PermissionDenied,
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset => SessionError::Disconnected,
            kind => SessionError::Io(kind),
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SessionError::NotFound => write!(f, "no serial device found"),
            SessionError::PermissionDenied => {
                write!(f, "permission to open the serial device denied")
            }
            SessionError::InvalidConfig => write!(f, "serial device refused the port settings"),
            SessionError::Disconnected => write!(f, "serial device disconnected"),
            SessionError::Io(kind) => write!(f, "serial I/O error: {:?}", kind),
        }
    }
}

impl std::error::Error for SessionError {}

/// Source of received chunks, one per open connection
pub trait ChunkSource {
    /// Reads whatever arrived since the last call into `buf`
    ///
    /// `Ok(0)` means nothing arrived yet, errors end the session.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, SessionError>;

    /// Releases the connection, called exactly once when the session ends
    fn close(&mut self) {}
}

/// Opens connections to the controller
pub trait Connector {
    type Source: ChunkSource;

    fn try_open(&mut self) -> Result<Self::Source, SessionError>;
}

/// Read access to the telemetry of the current session
///
/// Cloned into whatever renders the dashboard. It holds no state while no session is open.
#[derive(Clone, Debug, Default)]
pub struct TelemetryHandle {
    inner: Arc<RwLock<Option<TelemetryState>>>,
}

impl TelemetryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the latest state, `None` while disconnected
    pub fn snapshot(&self) -> Option<TelemetryState> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_live(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn install(&self, state: TelemetryState) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(state);
    }

    fn withdraw(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn update<R>(&self, f: impl FnOnce(&mut TelemetryState) -> R) -> Option<R> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .map(f)
    }
}

/// One open connection together with the telemetry decoded from it
pub struct Session<C: WireCodec, S: ChunkSource> {
    source: S,
    decoder: TelemetryDecoder<C>,
    handle: TelemetryHandle,
    buf: Vec<u8>,
}

impl<C: WireCodec, S: ChunkSource> Session<C, S> {
    /// Opens a connection and publishes a zeroed state through `handle`
    pub fn open<K>(
        connector: &mut K,
        handle: TelemetryHandle,
        mode: DecodeMode,
        read_buffer_length: usize,
    ) -> Result<Self, SessionError>
    where
        K: Connector<Source = S>,
    {
        let source = connector.try_open()?;
        handle.install(TelemetryState::new());
        info!("serial session opened");
        Ok(Self {
            source,
            decoder: TelemetryDecoder::with_mode(mode),
            handle,
            buf: vec![0; read_buffer_length.max(1)],
        })
    }

    /// Reads one chunk and decodes it
    ///
    /// Returns `Ok(None)` when nothing was received. Decode problems are reported in the
    /// [`Outcome`], only connection errors are returned as `Err`.
    pub fn poll(&mut self) -> Result<Option<Outcome>, SessionError> {
        let read = self.source.read_chunk(&mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }
        let chunk = &self.buf[..read.min(self.buf.len())];
        let decoder = &mut self.decoder;
        Ok(self
            .handle
            .update(|state| decoder.process_chunk(chunk, state)))
    }

    pub fn stats(&self) -> &DecodeStats {
        self.decoder.stats()
    }

    pub fn handle(&self) -> &TelemetryHandle {
        &self.handle
    }

    /// Ends the session, same as dropping it
    pub fn close(self) {}
}

impl<C: WireCodec, S: ChunkSource> Drop for Session<C, S> {
    fn drop(&mut self) {
        self.source.close();
        self.handle.withdraw();
        info!("serial session closed");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Scanning,
    Connected,
    Closing,
}

/// What a single [`Link::poll`] did
#[derive(Debug, PartialEq)]
pub enum LinkEvent {
    /// nothing to do yet
    Idle,
    Connected,
    /// scan attempt failed, another one is scheduled
    ConnectFailed(SessionError),
    Decoded(Outcome),
    /// open session was lost, resources are released
    Lost(SessionError),
    /// link finished closing
    Closed,
}

#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// delay between two connection attempts while scanning
    pub scan_interval: Duration,
    pub read_buffer_length: usize,
    pub decode_mode: DecodeMode,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            read_buffer_length: DEFAULT_READ_BUFFER_LENGTH,
            decode_mode: DecodeMode::Lenient,
        }
    }
}

/// Reconnecting serial link
///
/// Driven by calling [`Link::poll`] from a loop, nothing happens between polls.
pub struct Link<K: Connector, C: WireCodec> {
    connector: K,
    config: LinkConfig,
    handle: TelemetryHandle,
    state: LinkState,
    session: Option<Session<C, K::Source>>,
    next_scan: Option<Instant>,
    rescan: bool,
}

impl<K: Connector, C: WireCodec> Link<K, C> {
    pub fn new(connector: K, config: LinkConfig) -> Self {
        Self {
            connector,
            config,
            handle: TelemetryHandle::new(),
            state: LinkState::Disconnected,
            session: None,
            next_scan: None,
            rescan: false,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Handle for the dashboard, stays valid across reconnects
    pub fn handle(&self) -> TelemetryHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> Option<&DecodeStats> {
        self.session.as_ref().map(|s| s.stats())
    }

    /// Starts scanning, first attempt happens on the next poll at or after `now`
    ///
    /// A link that is still closing scans again instead of stopping.
    pub fn start(&mut self, now: Instant) {
        match self.state {
            LinkState::Disconnected => {
                self.state = LinkState::Scanning;
                self.next_scan = Some(now);
            }
            LinkState::Closing => {
                self.rescan = true;
                self.next_scan = Some(now);
            }
            LinkState::Scanning | LinkState::Connected => {}
        }
    }

    /// Opens a session unless one is already open
    ///
    /// Returns `Ok(false)` when a session was already open. Safe to call any number of times.
    pub fn try_connect(&mut self) -> Result<bool, SessionError> {
        if self.session.is_some() {
            return Ok(false);
        }
        let session = Session::open(
            &mut self.connector,
            self.handle.clone(),
            self.config.decode_mode,
            self.config.read_buffer_length,
        )?;
        self.session = Some(session);
        self.state = LinkState::Connected;
        self.next_scan = None;
        Ok(true)
    }

    /// Ends the session if any and stops scanning
    pub fn close(&mut self) {
        if self.state != LinkState::Disconnected {
            self.begin_closing(false);
        }
    }

    pub fn poll(&mut self, now: Instant) -> LinkEvent {
        match self.state {
            LinkState::Disconnected => LinkEvent::Idle,
            LinkState::Scanning => self.poll_scanning(now),
            LinkState::Connected => self.poll_connected(),
            LinkState::Closing => {
                if self.rescan {
                    self.state = LinkState::Scanning;
                    let interval = self.config.scan_interval;
                    self.next_scan = Some(self.next_scan.unwrap_or(now + interval));
                    LinkEvent::Idle
                } else {
                    self.state = LinkState::Disconnected;
                    self.next_scan = None;
                    LinkEvent::Closed
                }
            }
        }
    }

    fn poll_scanning(&mut self, now: Instant) -> LinkEvent {
        match self.next_scan {
            Some(at) if now < at => return LinkEvent::Idle,
            _ => {}
        }
        match self.try_connect() {
            Ok(_) => LinkEvent::Connected,
            Err(e) => {
                debug!("connection attempt failed: {:?}", e);
                self.next_scan = Some(now + self.config.scan_interval);
                LinkEvent::ConnectFailed(e)
            }
        }
    }

    fn poll_connected(&mut self) -> LinkEvent {
        let polled = match self.session.as_mut() {
            Some(session) => session.poll(),
            None => Err(SessionError::Disconnected),
        };
        match polled {
            Ok(Some(outcome)) => LinkEvent::Decoded(outcome),
            Ok(None) => LinkEvent::Idle,
            Err(e) => {
                warn!("serial session lost: {:?}", e);
                self.begin_closing(true);
                LinkEvent::Lost(e)
            }
        }
    }

    /// Releases the session right away, the next poll leaves `Closing`
    fn begin_closing(&mut self, rescan: bool) {
        self.state = LinkState::Closing;
        self.rescan = rescan;
        self.next_scan = None;
        self.session = None;
    }
}
