//! TCP session management for explicit messaging.
//!
//! A [`Connection`] owns one TCP conversation with a PLC: it registers a
//! session, carries one request at a time, and tears down cleanly. The
//! transport is synchronous — every call blocks until its reply arrives or
//! the configured timeout expires.
//!
//! # State machine
//!
//! `Disconnected → Connecting → SessionPending → Ready → Disconnected`
//!
//! The terminal state is re-enterable: a failed or closed connection can be
//! `connect()`-ed again. Requests other than RegisterSession are only valid
//! in `Ready`; anything else fails synchronously with
//! [`EipError::NotConnected`].
//!
//! # Single-outstanding-request discipline
//!
//! [`Connection::send_request`] takes `&mut self` and blocks, so a second
//! request cannot be issued while one is in flight — the borrow checker
//! enforces the discipline the protocol relies on. As a second line of
//! defense every request carries a fresh sender context, and the receive
//! loop silently drops (and logs) any inbound frame whose echoed context
//! does not match the outstanding one, so a late reply to a timed-out
//! request can never be mis-attributed to the next call.
//!
//! # Frame reassembly
//!
//! TCP gives no message boundaries. Inbound bytes accumulate in a buffer and
//! a frame is only parsed once the 24-byte header plus its declared payload
//! length are available; several frames arriving in one delivery, or one
//! frame split across deliveries, are both handled.
//!
//! # Example
//!
//! ```no_run
//! use eip_client::{Connection, ConnectionConfig};
//! use std::net::Ipv4Addr;
//!
//! let config = ConnectionConfig::new(Ipv4Addr::new(192, 168, 1, 10).into());
//! let mut conn = Connection::new(config);
//! conn.connect()?;
//! assert!(conn.is_connected());
//! conn.disconnect()?;
//! # Ok::<(), eip_client::EipError>(())
//! ```

use std::io::{Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::command::{
    CipRequest, InterfaceHandleFormat, RegisterSessionRequest, SendRRDataRequest,
    UnregisterSessionRequest,
};
use crate::error::{EipError, Result};
use crate::header::{EncapCommand, EncapHeader, ENCAP_HEADER_SIZE};
use crate::response::SendRRDataResponse;

/// Default TCP port for EtherNet/IP explicit messaging.
pub const DEFAULT_EIP_PORT: u16 = 44818;

/// Default request/connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Grace period granted to a fire-and-forget UnregisterSession before the
/// socket is closed.
const UNREGISTER_GRACE: Duration = Duration::from_millis(50);

/// Configuration for creating a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// PLC socket address.
    pub addr: SocketAddr,
    /// Timeout applied to connect and to each request.
    pub timeout: Duration,
    /// Wire encoding of the SendRRData interface-handle field.
    pub interface_handle_format: InterfaceHandleFormat,
}

impl ConnectionConfig {
    /// Creates a configuration for a PLC at `ip` on the default port.
    ///
    /// # Example
    ///
    /// ```
    /// use eip_client::ConnectionConfig;
    /// use std::net::Ipv4Addr;
    ///
    /// let config = ConnectionConfig::new(Ipv4Addr::new(192, 168, 1, 10).into());
    /// assert_eq!(config.addr.port(), 44818);
    /// ```
    pub fn new(ip: IpAddr) -> Self {
        Self {
            addr: SocketAddr::new(ip, DEFAULT_EIP_PORT),
            timeout: DEFAULT_TIMEOUT,
            interface_handle_format: InterfaceHandleFormat::default(),
        }
    }

    /// Creates a configuration from a full socket address.
    pub fn from_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: DEFAULT_TIMEOUT,
            interface_handle_format: InterfaceHandleFormat::default(),
        }
    }

    /// Sets a custom port (default is 44818).
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Sets a custom timeout (default is 5 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Selects the interface-handle encoding for SendRRData requests.
    pub fn with_interface_handle_format(mut self, format: InterfaceHandleFormat) -> Self {
        self.interface_handle_format = format;
        self
    }
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket open.
    Disconnected,
    /// TCP connect in progress.
    Connecting,
    /// Socket open, RegisterSession sent, awaiting the reply.
    SessionPending,
    /// Session registered; requests may be sent.
    Ready,
}

/// Notifications emitted by a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A session was registered.
    Connected {
        /// The server-assigned session handle.
        session_handle: u32,
    },
    /// The connection was closed (deliberately or by failure).
    Disconnected,
    /// A socket-level error forced the connection down.
    Error {
        /// Display form of the underlying error.
        message: String,
    },
}

/// Token returned by [`Connection::subscribe`]; pass it to
/// [`Connection::unsubscribe`] to cancel the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type EventHandler = Box<dyn Fn(&ConnectionEvent) + Send>;

/// A stateful EtherNet/IP session over TCP.
pub struct Connection {
    config: ConnectionConfig,
    stream: Option<TcpStream>,
    state: ConnectionState,
    session_handle: u32,
    recv_buf: Vec<u8>,
    context_counter: u32,
    observers: Vec<(u64, EventHandler)>,
    next_observer_id: u64,
}

impl Connection {
    /// Creates a disconnected connection. No I/O happens until
    /// [`Connection::connect`].
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            stream: None,
            state: ConnectionState::Disconnected,
            session_handle: 0,
            recv_buf: Vec::new(),
            context_counter: 0,
            observers: Vec::new(),
            next_observer_id: 1,
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns whether a session is registered.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Returns the session handle (0 while unregistered).
    pub fn session_handle(&self) -> u32 {
        self.session_handle
    }

    /// Returns the configured remote address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.config.addr
    }

    /// Registers an observer for connection events.
    ///
    /// The returned token cancels the observer via
    /// [`Connection::unsubscribe`]; observers are never dropped implicitly.
    pub fn subscribe(&mut self, handler: impl Fn(&ConnectionEvent) + Send + 'static) -> ObserverId {
        let id = self.next_observer_id;
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(handler)));
        ObserverId(id)
    }

    /// Removes a previously registered observer. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id.0);
        self.observers.len() != before
    }

    fn emit(&self, event: ConnectionEvent) {
        for (_, handler) in &self.observers {
            handler(&event);
        }
    }

    /// Synthesizes a fresh sender context: a monotonic counter plus the
    /// current time, unique per request within a connection's lifetime.
    fn next_context(&mut self) -> [u8; 8] {
        self.context_counter = self.context_counter.wrapping_add(1);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u32)
            .unwrap_or(0);
        let mut ctx = [0u8; 8];
        ctx[0..4].copy_from_slice(&self.context_counter.to_le_bytes());
        ctx[4..8].copy_from_slice(&millis.to_le_bytes());
        ctx
    }

    /// Opens the TCP stream and registers a session.
    ///
    /// # Errors
    ///
    /// - Socket-level failures surface as `EipError::Io`.
    /// - A nonzero RegisterSession status surfaces as
    ///   `EipError::ProtocolStatus` and the state returns to `Disconnected`.
    /// - No reply within the timeout surfaces as `EipError::Timeout`.
    pub fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Ready {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        debug!(addr = %self.config.addr, "connecting");

        let stream = TcpStream::connect_timeout(&self.config.addr, self.config.timeout)
            .and_then(|stream| {
                stream.set_nodelay(true)?;
                Ok(stream)
            })
            .map_err(|e| {
                self.state = ConnectionState::Disconnected;
                EipError::Io(e)
            })?;
        self.stream = Some(stream);
        self.recv_buf.clear();
        self.state = ConnectionState::SessionPending;

        let context = self.next_context();
        let request = RegisterSessionRequest::new(context).to_bytes();
        if let Err(e) = self.write_all(&request) {
            self.fail("register write failed");
            return Err(e);
        }

        let deadline = Instant::now() + self.config.timeout;
        let (header, _payload) = loop {
            let (header, payload) = match self.read_frame(deadline) {
                Ok(frame) => frame,
                Err(e) => {
                    if matches!(e, EipError::Timeout) {
                        self.close_silently();
                        self.state = ConnectionState::Disconnected;
                    } else {
                        self.fail("register read failed");
                    }
                    return Err(e);
                }
            };
            if header.command == EncapCommand::RegisterSession {
                break (header, payload);
            }
            warn!(command = %header.command, "dropping unexpected frame during registration");
        };

        if header.status != 0 {
            self.close_silently();
            self.state = ConnectionState::Disconnected;
            return Err(EipError::protocol_status(header.status));
        }

        self.session_handle = header.session_handle;
        self.state = ConnectionState::Ready;
        debug!(session_handle = self.session_handle, "session registered");
        self.emit(ConnectionEvent::Connected {
            session_handle: self.session_handle,
        });
        Ok(())
    }

    /// Sends one CIP request and waits for its reply.
    ///
    /// Returns the parsed SendRRData envelope; the caller decides how to
    /// treat the CIP status (the driver's best-effort browsing accepts
    /// "service not supported" as a normal outcome).
    ///
    /// # Errors
    ///
    /// - `NotConnected` outside the `Ready` state.
    /// - `ProtocolStatus` for a nonzero encapsulation status.
    /// - `Timeout` when no matching reply arrives in the window; the
    ///   connection stays up and a late reply is dropped by context
    ///   mismatch on the next call.
    /// - `Io` for socket failures, which also force `Disconnected`.
    pub fn send_request(&mut self, request: CipRequest) -> Result<SendRRDataResponse> {
        if self.state != ConnectionState::Ready {
            return Err(EipError::NotConnected);
        }

        let context = self.next_context();
        let frame = SendRRDataRequest::new(self.session_handle, request, context)
            .with_interface_handle_format(self.config.interface_handle_format)
            .to_bytes(self.config.timeout);

        self.write_all(&frame).inspect_err(|_| {
            self.fail("request write failed");
        })?;

        let deadline = Instant::now() + self.config.timeout;
        loop {
            let (header, payload) = self.read_frame(deadline).inspect_err(|e| {
                if !matches!(e, EipError::Timeout) {
                    self.fail("request read failed");
                }
            })?;

            if header.sender_context != context {
                // late reply to an earlier, timed-out request
                warn!(
                    expected = ?context,
                    received = ?header.sender_context,
                    "dropping frame with stale sender context"
                );
                continue;
            }
            if header.command != EncapCommand::SendRRData {
                warn!(command = %header.command, "dropping unexpected command in reply");
                continue;
            }
            if header.status != 0 {
                return Err(EipError::protocol_status(header.status));
            }
            return SendRRDataResponse::from_payload(&payload);
        }
    }

    /// Closes the session and the socket.
    ///
    /// If a session is registered, an UnregisterSession is sent best-effort
    /// (fire and forget, short grace delay) before the socket closes; the
    /// transition to `Disconnected` happens regardless.
    pub fn disconnect(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }

        if self.state == ConnectionState::Ready {
            let request = UnregisterSessionRequest::new(self.session_handle).to_bytes();
            if self.write_all(&request).is_ok() {
                std::thread::sleep(UNREGISTER_GRACE);
            }
        }

        self.close_silently();
        self.session_handle = 0;
        self.state = ConnectionState::Disconnected;
        debug!("disconnected");
        self.emit(ConnectionEvent::Disconnected);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(EipError::NotConnected)?;
        stream.set_write_timeout(Some(self.config.timeout))?;
        stream.write_all(bytes)?;
        Ok(())
    }

    /// Reads one complete encapsulation frame, buffering partial deliveries.
    fn read_frame(&mut self, deadline: Instant) -> Result<(EncapHeader, Vec<u8>)> {
        loop {
            if self.recv_buf.len() >= ENCAP_HEADER_SIZE {
                let header = EncapHeader::from_bytes(&self.recv_buf)?;
                let total = ENCAP_HEADER_SIZE + header.length as usize;
                if self.recv_buf.len() >= total {
                    let frame: Vec<u8> = self.recv_buf.drain(..total).collect();
                    let payload = frame[ENCAP_HEADER_SIZE..].to_vec();
                    return Ok((header, payload));
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(EipError::Timeout);
            }

            let stream = self.stream.as_mut().ok_or(EipError::NotConnected)?;
            stream.set_read_timeout(Some(remaining))?;

            let mut chunk = [0u8; 4096];
            match stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(EipError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "peer closed the connection",
                    )))
                }
                Ok(n) => self.recv_buf.extend_from_slice(&chunk[..n]),
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    return Err(EipError::Timeout)
                }
                Err(e) => return Err(EipError::Io(e)),
            }
        }
    }

    fn close_silently(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.recv_buf.clear();
    }

    /// Forces the connection down after a socket-level failure.
    fn fail(&mut self, reason: &str) {
        warn!(reason, "connection failed");
        self.close_silently();
        self.session_handle = 0;
        self.state = ConnectionState::Disconnected;
        self.emit(ConnectionEvent::Error {
            message: reason.to_string(),
        });
        self.emit(ConnectionEvent::Disconnected);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.config.addr)
            .field("state", &self.state)
            .field("session_handle", &self.session_handle)
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Accepts one connection and replies to RegisterSession with the given
    /// handle, then runs `script` on the stream.
    fn one_shot_server(
        handle: u32,
        script: impl FnOnce(TcpStream) + Send + 'static,
    ) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 28];
            stream.read_exact(&mut request).unwrap();
            let request_header = EncapHeader::from_bytes(&request).unwrap();
            assert_eq!(request_header.command, EncapCommand::RegisterSession);

            let mut reply = EncapHeader::new_request(
                EncapCommand::RegisterSession,
                4,
                handle,
                request_header.sender_context,
            )
            .to_bytes()
            .to_vec();
            reply.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
            stream.write_all(&reply).unwrap();
            script(stream);
        });
        addr
    }

    fn read_rr_request(stream: &mut TcpStream) -> (EncapHeader, Vec<u8>) {
        let mut header_bytes = [0u8; ENCAP_HEADER_SIZE];
        stream.read_exact(&mut header_bytes).unwrap();
        let header = EncapHeader::from_bytes(&header_bytes).unwrap();
        let mut payload = vec![0u8; header.length as usize];
        stream.read_exact(&mut payload).unwrap();
        (header, payload)
    }

    fn rr_reply(context: [u8; 8], cip_status: u8, data: &[u8]) -> Vec<u8> {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&((1 + data.len()) as u16).to_le_bytes());
        payload.push(cip_status);
        payload.extend_from_slice(data);
        let mut frame = EncapHeader::new_request(
            EncapCommand::SendRRData,
            payload.len() as u16,
            0,
            context,
        )
        .to_bytes()
        .to_vec();
        frame.extend_from_slice(&payload);
        frame
    }

    fn test_config(addr: SocketAddr) -> ConnectionConfig {
        ConnectionConfig::from_addr(addr).with_timeout(Duration::from_millis(500))
    }

    #[test]
    fn test_send_request_requires_ready() {
        let config = ConnectionConfig::new(IpAddr::from([127, 0, 0, 1]));
        let mut conn = Connection::new(config);
        let request = CipRequest::get_attributes_all(0x01, 0x01);
        assert!(matches!(
            conn.send_request(request),
            Err(EipError::NotConnected)
        ));
    }

    #[test]
    fn test_connect_failure_resets_state() {
        // reserve a port, then free it so the connect is refused
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut conn = Connection::new(test_config(addr));
        assert!(matches!(conn.connect(), Err(EipError::Io(_))));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.session_handle(), 0);
    }

    #[test]
    fn test_connect_stores_session_handle() {
        let addr = one_shot_server(0xABCD, |_stream| {});
        let mut conn = Connection::new(test_config(addr));
        conn.connect().unwrap();
        assert!(conn.is_connected());
        assert_eq!(conn.session_handle(), 0xABCD);
        assert_eq!(conn.state(), ConnectionState::Ready);
    }

    #[test]
    fn test_connect_nonzero_status_fails_classified() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 28];
            stream.read_exact(&mut request).unwrap();
            let header = EncapHeader::from_bytes(&request).unwrap();
            let reply = EncapHeader {
                command: EncapCommand::RegisterSession,
                length: 0,
                session_handle: 0,
                status: 0x0069,
                sender_context: header.sender_context,
                options: 0,
            };
            stream.write_all(&reply.to_bytes()).unwrap();
        });

        let mut conn = Connection::new(test_config(addr));
        match conn.connect() {
            Err(EipError::ProtocolStatus { code: 0x0069 }) => {}
            other => panic!("expected ProtocolStatus, got {:?}", other),
        }
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.session_handle(), 0);
    }

    #[test]
    fn test_request_reply_roundtrip_with_split_frames() {
        let addr = one_shot_server(7, |mut stream| {
            let (header, _payload) = read_rr_request(&mut stream);
            let reply = rr_reply(header.sender_context, 0, &[0xC1, 0x01, 0x00, 0xFF]);
            // deliver the reply in two chunks to force reassembly
            stream.write_all(&reply[..10]).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(20));
            stream.write_all(&reply[10..]).unwrap();
        });

        let mut conn = Connection::new(test_config(addr));
        conn.connect().unwrap();
        let response = conn
            .send_request(CipRequest::get_attributes_all(0x01, 0x01))
            .unwrap();
        assert_eq!(response.cip_status, 0);
        assert_eq!(response.data, vec![0xC1, 0x01, 0x00, 0xFF]);
    }

    #[test]
    fn test_stale_context_frame_dropped() {
        let addr = one_shot_server(7, |mut stream| {
            let (header, _payload) = read_rr_request(&mut stream);
            // a leftover reply from a "previous" request, wrong context
            let stale = rr_reply([0xEE; 8], 0, &[0x01]);
            let good = rr_reply(header.sender_context, 0, &[0x02]);
            stream.write_all(&stale).unwrap();
            stream.write_all(&good).unwrap();
        });

        let mut conn = Connection::new(test_config(addr));
        conn.connect().unwrap();
        let response = conn
            .send_request(CipRequest::get_attributes_all(0x01, 0x01))
            .unwrap();
        assert_eq!(response.data, vec![0x02]);
    }

    #[test]
    fn test_request_timeout_keeps_connection() {
        let addr = one_shot_server(7, |mut stream| {
            let _ = read_rr_request(&mut stream);
            // never reply; hold the socket open past the client timeout
            thread::sleep(Duration::from_millis(900));
        });

        let mut conn = Connection::new(test_config(addr));
        conn.connect().unwrap();
        let result = conn.send_request(CipRequest::get_attributes_all(0x01, 0x01));
        assert!(matches!(result, Err(EipError::Timeout)));
        assert!(conn.is_connected());
    }

    #[test]
    fn test_peer_close_forces_disconnected() {
        let (tx, rx) = mpsc::channel();
        let addr = one_shot_server(7, move |mut stream| {
            let _ = read_rr_request(&mut stream);
            drop(stream);
            let _ = tx.send(());
        });

        let mut conn = Connection::new(test_config(addr));
        conn.connect().unwrap();
        rx.recv_timeout(Duration::from_secs(1)).ok();
        let result = conn.send_request(CipRequest::get_attributes_all(0x01, 0x01));
        assert!(matches!(result, Err(EipError::Io(_))));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.session_handle(), 0);
    }

    #[test]
    fn test_disconnect_emits_event_and_blocks_requests() {
        let addr = one_shot_server(7, |stream| {
            // swallow the unregister frame, then let the socket drop
            let mut stream = stream;
            let mut sink = [0u8; 64];
            let _ = stream.read(&mut sink);
        });

        let mut conn = Connection::new(test_config(addr));
        let (tx, rx) = mpsc::channel();
        let observer = conn.subscribe(move |event| {
            tx.send(event.clone()).unwrap();
        });
        conn.connect().unwrap();
        conn.disconnect().unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            ConnectionEvent::Connected { session_handle: 7 }
        );
        assert_eq!(rx.try_recv().unwrap(), ConnectionEvent::Disconnected);
        assert!(!conn.is_connected());
        assert!(matches!(
            conn.send_request(CipRequest::get_attributes_all(0x01, 0x01)),
            Err(EipError::NotConnected)
        ));
        assert!(conn.unsubscribe(observer));
        assert!(!conn.unsubscribe(observer));
    }

    #[test]
    fn test_two_frames_in_one_delivery() {
        let addr = one_shot_server(7, |mut stream| {
            let (h1, _) = read_rr_request(&mut stream);
            let mut both = rr_reply(h1.sender_context, 0, &[0x0A]);
            // second frame arrives in the same delivery as the first
            both.extend_from_slice(&rr_reply([0xEE; 8], 0, &[0x0B]));
            stream.write_all(&both).unwrap();
            // the client must consume only the first frame now
            let (h2, _) = read_rr_request(&mut stream);
            let reply = rr_reply(h2.sender_context, 0, &[0x0C]);
            stream.write_all(&reply).unwrap();
        });

        let mut conn = Connection::new(test_config(addr));
        conn.connect().unwrap();
        let first = conn
            .send_request(CipRequest::get_attributes_all(0x01, 0x01))
            .unwrap();
        assert_eq!(first.data, vec![0x0A]);
        // the stale second frame is skipped by context mismatch
        let second = conn
            .send_request(CipRequest::get_attributes_all(0x01, 0x01))
            .unwrap();
        assert_eq!(second.data, vec![0x0C]);
    }
}
