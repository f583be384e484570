//! Blocking TCP transport for the Lightify protocol

use crate::commands::CommandId;
use crate::frame::{Frame, Response, SequenceGenerator, Target, LENGTH_PREFIX_SIZE};
use crate::types::ProtocolError;

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// TCP port the gateway listens on
pub const GATEWAY_PORT: u16 = 4000;

/// Default socket timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection to a Lightify gateway
///
/// Strictly request/response: every `request` writes one frame and reads one
/// response. Callers serialize access (the gateway client keeps it behind a
/// single lock), so no response matching is done.
pub struct Connection {
    host: String,
    port: u16,
    timeout: Duration,
    stream: Option<TcpStream>,
    sequence: SequenceGenerator,
}

impl Connection {
    /// Connect to the gateway at `host:port`
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, ProtocolError> {
        let mut connection = Self {
            host: host.to_string(),
            port,
            timeout,
            stream: None,
            sequence: SequenceGenerator::new(),
        };
        connection.open()?;
        Ok(connection)
    }

    /// (Re)open the socket, dropping any previous one
    fn open(&mut self) -> Result<(), ProtocolError> {
        tracing::info!("Connecting to Lightify gateway at {}:{}", self.host, self.port);

        if let Some(old) = self.stream.take() {
            let _ = old.shutdown(Shutdown::Both);
        }

        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port).to_socket_addrs()?.collect();
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    stream.set_nodelay(true)?;
                    self.stream = Some(stream);
                    tracing::info!("Connected to Lightify gateway at {}", addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.map_or(ProtocolError::NotConnected, ProtocolError::from))
    }

    /// Next request sequence number
    pub fn next_sequence(&mut self) -> u8 {
        self.sequence.next()
    }

    /// Build a frame for `target` and send it
    pub fn request(
        &mut self,
        target: Target,
        command_id: CommandId,
        payload: Vec<u8>,
    ) -> Result<Response, ProtocolError> {
        let sequence = self.next_sequence();
        let frame = Frame::addressed(target, command_id, sequence, payload);
        self.send(&frame)
    }

    /// Send a frame and read the response
    ///
    /// A transport failure triggers exactly one reconnect and resend; the
    /// second failure is returned to the caller.
    pub fn send(&mut self, frame: &Frame) -> Result<Response, ProtocolError> {
        let data = frame.serialize();
        tracing::debug!(
            "Sending cmd={:?} seq={}: {:02X?}",
            frame.command_id,
            frame.sequence,
            &data
        );

        let received = match self.exchange(&data) {
            Ok(received) => received,
            Err(e) => {
                tracing::warn!("Lost connection to Lightify gateway: {}", e);
                tracing::warn!("Trying to reconnect");
                self.open()?;
                self.exchange(&data).map_err(|e| {
                    tracing::warn!("Resend after reconnect failed: {}", e);
                    Self::map_io_error(e)
                })?
            }
        };

        tracing::debug!("Received {} bytes: {:02X?}", received.len(), &received);
        match Response::parse(&received) {
            Ok(response) => Ok(response),
            Err(e) => Err(ProtocolError::MalformedResponse {
                reason: Box::new(e),
                data: received,
            }),
        }
    }

    /// One write/read round trip, returning the bytes after the length prefix
    fn exchange(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no gateway socket"))?;

        stream.write_all(data)?;
        stream.flush()?;

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        stream.read_exact(&mut prefix)?;
        let length = u16::from_le_bytes(prefix) as usize;
        tracing::debug!("Response length: {}", length);

        // read_exact loops over partial reads until the buffer is full
        let mut received = vec![0u8; length];
        stream.read_exact(&mut received)?;
        Ok(received)
    }

    fn map_io_error(e: io::Error) -> ProtocolError {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProtocolError::Timeout,
            io::ErrorKind::NotConnected => ProtocolError::NotConnected,
            _ => ProtocolError::Io(e),
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
