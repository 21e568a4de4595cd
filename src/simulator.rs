//! In-process PLC simulator.
//!
//! [`PlcSimulator`] is a server-side test double speaking the same simplified
//! wire format as the client: session registration over TCP, explicit
//! messaging via SendRRData, and ListIdentity discovery over UDP. It backs
//! the integration tests and the runnable demos, and it is useful for
//! developing against realistic behavior without hardware.
//!
//! Behavior summary:
//!
//! - RegisterSession assigns monotonically increasing session handles.
//! - Read Tag / Write Tag operate on an in-memory tag store seeded through
//!   [`PlcSimulator::set_tag`]; unknown tags answer CIP status 0x05, element
//!   counts beyond the stored length or type mismatches answer 0x20.
//! - Get_Attributes_All on the Identity object returns the configured
//!   [`DeviceIdentity`]; any other target answers 0x05.
//! - Find_Next on the Symbol class enumerates the stored tags.
//! - Every other service answers 0x08 (service not supported).
//! - A ListIdentity datagram on the discovery socket is answered with the
//!   identity block, to the sender's address.
//!
//! # Example
//!
//! ```no_run
//! use eip_client::simulator::{PlcSimulator, SimulatorConfig};
//! use eip_client::{CipValue, ConnectionConfig, EipDriver};
//!
//! let sim = PlcSimulator::start(SimulatorConfig::default())?;
//! sim.set_tag("Counter", CipValue::Dint(7));
//!
//! let mut driver = EipDriver::new(ConnectionConfig::from_addr(sim.local_addr()));
//! driver.connect()?;
//! assert_eq!(driver.read_tag("Counter")?, CipValue::Dint(7));
//! # Ok::<(), eip_client::EipError>(())
//! ```

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::command::{
    SERVICE_FIND_NEXT, SERVICE_GET_ATTRIBUTES_ALL, SERVICE_READ_TAG, SERVICE_WRITE_TAG,
};
use crate::error::{EipError, Result};
use crate::header::{EncapCommand, EncapHeader, ENCAP_HEADER_SIZE};
use crate::path::{parse_path, CLASS_IDENTITY, CLASS_SYMBOL};
use crate::response::DeviceIdentity;
use crate::status::{
    CIP_STATUS_INVALID_PARAMETER, CIP_STATUS_PATH_DESTINATION_UNKNOWN,
    CIP_STATUS_SERVICE_NOT_SUPPORTED, CIP_STATUS_SUCCESS,
};
use crate::types::{CipDataType, CipValue};

/// Poll interval for the nonblocking accept and receive loops.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration for [`PlcSimulator::start`].
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// TCP bind address for explicit messaging (port 0 = ephemeral).
    pub tcp_addr: SocketAddr,
    /// UDP bind address for discovery, or `None` to disable the responder.
    pub udp_addr: Option<SocketAddr>,
    /// Identity reported by ListIdentity and Get_Attributes_All.
    pub identity: DeviceIdentity,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tcp_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            udp_addr: Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)),
            identity: DeviceIdentity {
                protocol_version: 1,
                vendor_id: 0x1337,
                device_type: 0x000C,
                product_code: 0x0065,
                revision_major: 1,
                revision_minor: 0,
                status: 0x0000,
                serial_number: 0x00C0FFEE,
                product_name: "eip-client simulator".to_string(),
                state: 3,
            },
        }
    }
}

/// One stored tag: a declared type and its elements.
#[derive(Debug, Clone)]
struct Tag {
    data_type: CipDataType,
    values: Vec<CipValue>,
}

type TagStore = Arc<RwLock<HashMap<String, Tag>>>;
type TagObserver = Box<dyn Fn(&str, &[CipValue]) + Send>;

struct Shared {
    tags: TagStore,
    identity: DeviceIdentity,
    observers: Arc<Mutex<Vec<TagObserver>>>,
}

/// A running simulator instance.
///
/// Stops its background threads on [`PlcSimulator::shutdown`] or on drop.
pub struct PlcSimulator {
    tags: TagStore,
    observers: Arc<Mutex<Vec<TagObserver>>>,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    tcp_addr: SocketAddr,
    udp_addr: Option<SocketAddr>,
}

impl PlcSimulator {
    /// Binds the sockets and starts the background threads.
    pub fn start(config: SimulatorConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.tcp_addr)?;
        listener.set_nonblocking(true)?;
        let tcp_addr = listener.local_addr()?;

        let tags: TagStore = Arc::new(RwLock::new(HashMap::new()));
        let observers: Arc<Mutex<Vec<TagObserver>>> = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));
        let session_counter = Arc::new(AtomicU32::new(0));
        let mut threads = Vec::new();

        {
            let tags = Arc::clone(&tags);
            let observers = Arc::clone(&observers);
            let running = Arc::clone(&running);
            let identity = config.identity.clone();
            threads.push(thread::spawn(move || {
                accept_loop(listener, tags, observers, identity, running, session_counter);
            }));
        }

        let udp_addr = match config.udp_addr {
            Some(addr) => {
                let socket = UdpSocket::bind(addr)?;
                socket.set_read_timeout(Some(POLL_INTERVAL))?;
                let local = socket.local_addr()?;
                let running = Arc::clone(&running);
                let identity = config.identity.clone();
                threads.push(thread::spawn(move || {
                    discovery_loop(socket, identity, running);
                }));
                Some(local)
            }
            None => None,
        };

        debug!(%tcp_addr, ?udp_addr, "simulator started");
        Ok(Self {
            tags,
            observers,
            running,
            threads,
            tcp_addr,
            udp_addr,
        })
    }

    /// Returns the TCP address clients should connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    /// Returns the UDP discovery address, if the responder is enabled.
    pub fn discovery_addr(&self) -> Option<SocketAddr> {
        self.udp_addr
    }

    /// Stores a scalar tag, replacing any previous value.
    pub fn set_tag(&self, name: impl Into<String>, value: CipValue) {
        self.set_tag_array(name, vec![value]);
    }

    /// Stores an array tag. All values must share one CIP type; mixed input
    /// is ignored with a warning (this is a test double, not a validator of
    /// its own seed data).
    pub fn set_tag_array(&self, name: impl Into<String>, values: Vec<CipValue>) {
        let name = name.into();
        let Some(first) = values.first() else {
            warn!(tag = %name, "ignoring empty tag seed");
            return;
        };
        let data_type = first.data_type();
        if values.iter().any(|v| v.data_type() != data_type) {
            warn!(tag = %name, "ignoring mixed-type tag seed");
            return;
        }
        self.tags
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Tag { data_type, values });
    }

    /// Returns a copy of a stored tag's elements.
    pub fn get_tag(&self, name: &str) -> Option<Vec<CipValue>> {
        self.tags
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|tag| tag.values.clone())
    }

    /// Registers a handler invoked after every successful client write, with
    /// the tag name and its new elements.
    pub fn on_tag_change(&self, handler: impl Fn(&str, &[CipValue]) + Send + 'static) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(handler));
    }

    /// Stops the background threads and releases the sockets. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        debug!("simulator stopped");
    }
}

impl Drop for PlcSimulator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(
    listener: TcpListener,
    tags: TagStore,
    observers: Arc<Mutex<Vec<TagObserver>>>,
    identity: DeviceIdentity,
    running: Arc<AtomicBool>,
    session_counter: Arc<AtomicU32>,
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "client connected");
                let shared = Shared {
                    tags: Arc::clone(&tags),
                    identity: identity.clone(),
                    observers: Arc::clone(&observers),
                };
                let running = Arc::clone(&running);
                let session_counter = Arc::clone(&session_counter);
                thread::spawn(move || {
                    if let Err(e) = serve_connection(stream, shared, running, session_counter) {
                        debug!(error = %e, "connection closed");
                    }
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

fn discovery_loop(socket: UdpSocket, identity: DeviceIdentity, running: Arc<AtomicBool>) {
    let mut buf = [0u8; 512];
    while running.load(Ordering::SeqCst) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                warn!(error = %e, "discovery receive failed");
                continue;
            }
        };

        let Ok(header) = EncapHeader::from_bytes(&buf[..len]) else {
            continue;
        };
        if header.command != EncapCommand::ListIdentity {
            continue;
        }
        let Ok(block) = identity.to_bytes() else {
            continue;
        };
        let mut reply = EncapHeader::new_request(
            EncapCommand::ListIdentity,
            block.len() as u16,
            0,
            header.sender_context,
        )
        .to_bytes()
        .to_vec();
        reply.extend_from_slice(&block);
        if let Err(e) = socket.send_to(&reply, peer) {
            warn!(error = %e, %peer, "discovery reply failed");
        }
    }
}

fn serve_connection(
    mut stream: TcpStream,
    shared: Shared,
    running: Arc<AtomicBool>,
    session_counter: Arc<AtomicU32>,
) -> Result<()> {
    stream.set_read_timeout(Some(POLL_INTERVAL))?;
    let mut buf: Vec<u8> = Vec::new();

    while running.load(Ordering::SeqCst) {
        // assemble one frame
        while buf.len() < ENCAP_HEADER_SIZE
            || buf.len() < ENCAP_HEADER_SIZE + EncapHeader::from_bytes(&buf)?.length as usize
        {
            if !running.load(Ordering::SeqCst) {
                return Ok(());
            }
            let mut chunk = [0u8; 4096];
            match stream.read(&mut chunk) {
                Ok(0) => return Ok(()),
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => return Err(EipError::Io(e)),
            }
        }

        let header = EncapHeader::from_bytes(&buf)?;
        let total = ENCAP_HEADER_SIZE + header.length as usize;
        let frame: Vec<u8> = buf.drain(..total).collect();
        let payload = &frame[ENCAP_HEADER_SIZE..];

        match header.command {
            EncapCommand::RegisterSession => {
                let handle = session_counter.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(handle, "session registered");
                let mut reply =
                    EncapHeader::new_request(EncapCommand::RegisterSession, 4, handle, header.sender_context)
                        .to_bytes()
                        .to_vec();
                reply.extend_from_slice(&1u16.to_le_bytes());
                reply.extend_from_slice(&0u16.to_le_bytes());
                stream.write_all(&reply)?;
            }
            EncapCommand::UnregisterSession => {
                debug!(handle = header.session_handle, "session unregistered");
                return Ok(());
            }
            EncapCommand::SendRRData => {
                let reply = handle_rr_data(&header, payload, &shared);
                stream.write_all(&reply)?;
            }
            EncapCommand::ListIdentity => {
                // identity over TCP is not part of this dialect
                warn!("ignoring ListIdentity on the TCP channel");
            }
        }
    }
    Ok(())
}

/// Builds the SendRRData reply frame for one request.
fn handle_rr_data(header: &EncapHeader, payload: &[u8], shared: &Shared) -> Vec<u8> {
    let (status, data) = match dispatch_cip(payload, shared) {
        Ok(outcome) => outcome,
        Err(e) => {
            debug!(error = %e, "malformed request");
            (CIP_STATUS_INVALID_PARAMETER, Vec::new())
        }
    };

    let mut reply_payload = Vec::with_capacity(7 + data.len());
    // echo the interface handle when the request carried one
    if payload.len() >= 4 {
        reply_payload.extend_from_slice(&payload[0..4]);
    } else {
        reply_payload.extend_from_slice(&[0u8; 4]);
    }
    reply_payload.extend_from_slice(&((1 + data.len()) as u16).to_le_bytes());
    reply_payload.push(status);
    reply_payload.extend_from_slice(&data);

    let mut reply = EncapHeader::new_request(
        EncapCommand::SendRRData,
        reply_payload.len() as u16,
        header.session_handle,
        header.sender_context,
    )
    .to_bytes()
    .to_vec();
    reply.extend_from_slice(&reply_payload);
    reply
}

/// Parses and executes the CIP packet; returns `(cip_status, reply_data)`.
fn dispatch_cip(payload: &[u8], shared: &Shared) -> Result<(u8, Vec<u8>)> {
    if payload.len() < 8 {
        return Err(EipError::truncated(8, payload.len()));
    }
    let cip_len = u16::from_le_bytes([payload[4], payload[5]]) as usize;
    let cip = payload
        .get(6..6 + cip_len)
        .ok_or_else(|| EipError::truncated(6 + cip_len, payload.len()))?;

    // the declared CIP length is client-supplied; it may be shorter than the
    // two-byte service/path-size prefix
    if cip.len() < 2 {
        return Err(EipError::truncated(2, cip.len()));
    }
    let service = cip[0];
    let path_len = cip[1] as usize * 2;
    let path_bytes = cip
        .get(2..2 + path_len)
        .ok_or_else(|| EipError::truncated(2 + path_len, cip.len()))?;
    let data = &cip[2 + path_len..];
    let path = parse_path(path_bytes)?;

    match service {
        SERVICE_READ_TAG => Ok(execute_read(&path, data, shared)),
        SERVICE_WRITE_TAG => Ok(execute_write(&path, data, shared)),
        SERVICE_GET_ATTRIBUTES_ALL => {
            if path.object_target() == Some((CLASS_IDENTITY, 0x01)) {
                let block = shared.identity.to_bytes()?;
                Ok((CIP_STATUS_SUCCESS, block))
            } else {
                Ok((CIP_STATUS_PATH_DESTINATION_UNKNOWN, Vec::new()))
            }
        }
        SERVICE_FIND_NEXT => {
            if path.object_target().map(|(class, _)| class) == Some(CLASS_SYMBOL) {
                Ok((CIP_STATUS_SUCCESS, browse_tags(shared)))
            } else {
                Ok((CIP_STATUS_PATH_DESTINATION_UNKNOWN, Vec::new()))
            }
        }
        _ => Ok((CIP_STATUS_SERVICE_NOT_SUPPORTED, Vec::new())),
    }
}

fn execute_read(path: &crate::path::ParsedPath, data: &[u8], shared: &Shared) -> (u8, Vec<u8>) {
    let Some(name) = path.tag_name() else {
        return (CIP_STATUS_PATH_DESTINATION_UNKNOWN, Vec::new());
    };
    if data.len() < 2 {
        return (CIP_STATUS_INVALID_PARAMETER, Vec::new());
    }
    let count = u16::from_le_bytes([data[0], data[1]]) as usize;

    let tags = shared.tags.read().unwrap_or_else(PoisonError::into_inner);
    let Some(tag) = tags.get(&name) else {
        return (CIP_STATUS_PATH_DESTINATION_UNKNOWN, Vec::new());
    };
    if count == 0 || count > tag.values.len() {
        return (CIP_STATUS_INVALID_PARAMETER, Vec::new());
    }

    let mut reply = vec![tag.data_type.code()];
    reply.extend_from_slice(&(count as u16).to_le_bytes());
    for value in &tag.values[..count] {
        match value.encode() {
            Ok(bytes) => reply.extend_from_slice(&bytes),
            Err(_) => return (CIP_STATUS_INVALID_PARAMETER, Vec::new()),
        }
    }
    (CIP_STATUS_SUCCESS, reply)
}

fn execute_write(path: &crate::path::ParsedPath, data: &[u8], shared: &Shared) -> (u8, Vec<u8>) {
    let Some(name) = path.tag_name() else {
        return (CIP_STATUS_PATH_DESTINATION_UNKNOWN, Vec::new());
    };
    if data.len() < 3 {
        return (CIP_STATUS_INVALID_PARAMETER, Vec::new());
    }
    let count = u16::from_le_bytes([data[0], data[1]]) as usize;
    let Ok(data_type) = CipDataType::from_code(data[2]) else {
        return (CIP_STATUS_INVALID_PARAMETER, Vec::new());
    };

    let mut values = Vec::with_capacity(count);
    let mut offset = 3;
    for _ in 0..count {
        match CipValue::decode(data_type, data, offset) {
            Ok((value, used)) => {
                values.push(value);
                offset += used;
            }
            Err(_) => return (CIP_STATUS_INVALID_PARAMETER, Vec::new()),
        }
    }

    {
        let mut tags = shared.tags.write().unwrap_or_else(PoisonError::into_inner);
        let Some(tag) = tags.get_mut(&name) else {
            return (CIP_STATUS_PATH_DESTINATION_UNKNOWN, Vec::new());
        };
        if tag.data_type != data_type || count == 0 || count > tag.values.len() {
            return (CIP_STATUS_INVALID_PARAMETER, Vec::new());
        }
        tag.values[..count].clone_from_slice(&values);
    }

    let observers = shared
        .observers
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    for observer in observers.iter() {
        observer(&name, &values);
    }
    (CIP_STATUS_SUCCESS, Vec::new())
}

/// Serializes the tag store as browse entries, sorted by name for stable
/// instance numbering.
fn browse_tags(shared: &Shared) -> Vec<u8> {
    let tags = shared.tags.read().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<&String> = tags.keys().collect();
    names.sort();

    let mut out = Vec::new();
    for (index, name) in names.iter().enumerate() {
        let tag = &tags[*name];
        let short = &name.as_bytes()[..name.len().min(255)];
        out.extend_from_slice(&((index as u16) + 1).to_le_bytes());
        out.push(tag.data_type.code());
        out.push(short.len() as u8);
        out.extend_from_slice(short);
    }
    out
}
