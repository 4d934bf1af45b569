//! Report transport adapter.
//!
//! [`TcpReporter`] implements [`NetPort`] over a plain TCP stream. ESP-IDF
//! ships lwIP behind `std::net`, so the same code runs on the device and the
//! host. Each operation completes synchronously and posts its completion
//! event before returning.
//!
//! [`SimNet`] (host only) records what would have been sent.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::NetPort;
use crate::error::NetError;
use crate::events::{Event, EventSender, post};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TcpReporter<'q> {
    events: EventSender<'q>,
    server: SocketAddr,
    stream: Option<TcpStream>,
}

impl<'q> TcpReporter<'q> {
    /// `server` is an `ip:port` literal; no name resolution is done.
    pub fn new(server: &str, events: EventSender<'q>) -> Result<Self, NetError> {
        let server = server.parse().map_err(|_| NetError::InvalidAddress)?;
        Ok(Self {
            events,
            server,
            stream: None,
        })
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl NetPort for TcpReporter<'_> {
    fn connect(&mut self) -> Result<(), NetError> {
        if self.stream.is_some() {
            post(&self.events, Event::NetConnected);
            return Ok(());
        }
        match TcpStream::connect_timeout(&self.server, CONNECT_TIMEOUT) {
            Ok(stream) => {
                if let Err(e) = stream.set_write_timeout(Some(WRITE_TIMEOUT)) {
                    warn!("Net: set_write_timeout failed: {}", e);
                }
                info!("Net: connected to {}", self.server);
                self.stream = Some(stream);
                post(&self.events, Event::NetConnected);
            }
            Err(e) => {
                warn!("Net: connect to {} failed: {}", self.server, e);
                post(&self.events, Event::NetConnectFailed);
            }
        }
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), NetError> {
        if data.is_empty() {
            return Err(NetError::SendFailed);
        }
        let stream = self.stream.as_mut().ok_or(NetError::NotConnected)?;
        stream.write_all(data).and_then(|()| stream.flush()).map_err(|e| {
            warn!("Net: send failed: {}", e);
            NetError::SendFailed
        })?;
        debug!("Net: sent {} bytes", data.len());
        post(&self.events, Event::NetDataSent);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), NetError> {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("Net: shutdown: {}", e);
            }
            info!("Net: disconnected");
        }
        post(&self.events, Event::NetDisconnected);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct SimNet<'q> {
    events: EventSender<'q>,
    connected: bool,
    /// `connect` returns `Err` without posting anything.
    pub refuse_connect: bool,
    /// `connect` reports `NetConnectFailed`.
    pub connect_fails: bool,
    /// `send` returns `Err`.
    pub send_fails: bool,
    pub sent: Vec<Vec<u8>>,
    pub disconnects: u32,
}

#[cfg(not(target_os = "espidf"))]
impl<'q> SimNet<'q> {
    pub fn new(events: EventSender<'q>) -> Self {
        Self {
            events,
            connected: false,
            refuse_connect: false,
            connect_fails: false,
            send_fails: false,
            sent: Vec::new(),
            disconnects: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(not(target_os = "espidf"))]
impl NetPort for SimNet<'_> {
    fn connect(&mut self) -> Result<(), NetError> {
        if self.refuse_connect {
            return Err(NetError::ConnectFailed);
        }
        if self.connect_fails {
            post(&self.events, Event::NetConnectFailed);
        } else {
            self.connected = true;
            post(&self.events, Event::NetConnected);
        }
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), NetError> {
        if data.is_empty() || self.send_fails {
            return Err(NetError::SendFailed);
        }
        if !self.connected {
            return Err(NetError::NotConnected);
        }
        self.sent.push(data.to_vec());
        post(&self.events, Event::NetDataSent);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), NetError> {
        self.disconnects += 1;
        self.connected = false;
        post(&self.events, Event::NetDisconnected);
        Ok(())
    }
}
