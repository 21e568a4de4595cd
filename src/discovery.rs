//! UDP device discovery.
//!
//! Discovery sends a ListIdentity request as a UDP datagram and collects the
//! identity blocks devices send back. Two styles are offered:
//!
//! - One-shot: [`discover_plcs`] broadcasts (or unicasts) once and collects
//!   replies for a fixed window; [`discover_plc`] is the single-device
//!   convenience around it.
//! - Continuous: [`PlcDiscovery`] polls in a background thread and reports
//!   appearing devices and identity changes over a channel until
//!   [`PlcDiscovery::stop`].
//!
//! Replies are deduplicated by source address within one window; a device
//! answering twice is reported once.
//!
//! # Example
//!
//! ```no_run
//! use eip_client::discovery::{broadcast_target, discover_plcs};
//! use std::time::Duration;
//!
//! for device in discover_plcs(Duration::from_secs(2), broadcast_target())? {
//!     println!("{}: {}", device.addr, device.identity.product_name);
//! }
//! # Ok::<(), eip_client::EipError>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::command::ListIdentityRequest;
use crate::error::Result;
use crate::header::{EncapCommand, EncapHeader, ENCAP_HEADER_SIZE};
use crate::response::DeviceIdentity;

/// Default UDP port devices listen on for discovery datagrams.
pub const DEFAULT_DISCOVERY_PORT: u16 = 2222;

/// Returns the limited-broadcast discovery target on the default port.
pub fn broadcast_target() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), DEFAULT_DISCOVERY_PORT)
}

/// One device that answered a discovery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Source address of the reply.
    pub addr: SocketAddr,
    /// The identity block the device reported.
    pub identity: DeviceIdentity,
}

/// Sends one ListIdentity datagram to `target` and collects replies for the
/// full `timeout` window.
///
/// The reply order is arrival order; duplicates from one source address are
/// dropped. An empty result is not an error — silence just means nobody
/// answered.
///
/// # Errors
///
/// Fails only on local socket errors (bind, send). Malformed replies are
/// logged and skipped.
pub fn discover_plcs(timeout: Duration, target: SocketAddr) -> Result<Vec<DiscoveredDevice>> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_broadcast(true)?;
    socket.send_to(&ListIdentityRequest.to_bytes(), target)?;
    debug!(%target, "discovery request sent");

    let deadline = Instant::now() + timeout;
    let mut seen: HashSet<SocketAddr> = HashSet::new();
    let mut devices = Vec::new();
    let mut buf = [0u8; 512];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        socket.set_read_timeout(Some(remaining))?;

        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if seen.contains(&peer) {
            continue;
        }
        match parse_reply(&buf[..len]) {
            Ok(identity) => {
                debug!(%peer, product = %identity.product_name, "device discovered");
                seen.insert(peer);
                devices.push(DiscoveredDevice {
                    addr: peer,
                    identity,
                });
            }
            Err(e) => {
                warn!(%peer, error = %e, "ignoring malformed discovery reply");
            }
        }
    }
    Ok(devices)
}

/// Discovers a single device: the first reply wins and the window is cut
/// short. Returns `Ok(None)` if nothing answered in time.
pub fn discover_plc(timeout: Duration, target: SocketAddr) -> Result<Option<DiscoveredDevice>> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_broadcast(true)?;
    socket.send_to(&ListIdentityRequest.to_bytes(), target)?;

    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; 512];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        socket.set_read_timeout(Some(remaining))?;

        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match parse_reply(&buf[..len]) {
            Ok(identity) => {
                return Ok(Some(DiscoveredDevice {
                    addr: peer,
                    identity,
                }))
            }
            Err(e) => warn!(%peer, error = %e, "ignoring malformed discovery reply"),
        }
    }
}

/// Parses one discovery reply datagram: an encapsulation header carrying a
/// ListIdentity command followed by the identity block.
fn parse_reply(datagram: &[u8]) -> Result<DeviceIdentity> {
    let header = EncapHeader::from_bytes(datagram)?;
    if header.command != EncapCommand::ListIdentity {
        return Err(crate::error::EipError::invalid_response(format!(
            "expected ListIdentity reply, got {}",
            header.command
        )));
    }
    if header.status != 0 {
        return Err(crate::error::EipError::protocol_status(header.status));
    }
    DeviceIdentity::from_bytes(&datagram[ENCAP_HEADER_SIZE..])
}

/// Events reported by a running [`PlcDiscovery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A device answered for the first time.
    Device(DiscoveredDevice),
    /// A known device answered with a changed identity block.
    DeviceUpdate(DiscoveredDevice),
}

/// Background discovery poller.
///
/// Repeats [`discover_plcs`] on a fixed interval and reports new devices and
/// identity changes through [`PlcDiscovery::events`]. A device that stops
/// answering is not reported as lost; absence of replies is not evidence of
/// absence on a lossy medium.
pub struct PlcDiscovery {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    receiver: mpsc::Receiver<DiscoveryEvent>,
}

impl PlcDiscovery {
    /// Starts polling `target` every `interval`. Each poll listens for up to
    /// half the interval, capped at one second.
    pub fn start(target: SocketAddr, interval: Duration) -> Result<Self> {
        let window = (interval / 2).min(Duration::from_secs(1));
        let running = Arc::new(AtomicBool::new(true));
        let (sender, receiver) = mpsc::channel();

        let thread_running = Arc::clone(&running);
        let thread = thread::spawn(move || {
            let mut known: HashMap<SocketAddr, DeviceIdentity> = HashMap::new();
            while thread_running.load(Ordering::SeqCst) {
                let started = Instant::now();
                match discover_plcs(window, target) {
                    Ok(devices) => {
                        for device in devices {
                            let event = match known.get(&device.addr) {
                                None => Some(DiscoveryEvent::Device(device.clone())),
                                Some(old) if *old != device.identity => {
                                    Some(DiscoveryEvent::DeviceUpdate(device.clone()))
                                }
                                Some(_) => None,
                            };
                            if let Some(event) = event {
                                known.insert(device.addr, device.identity);
                                if sender.send(event).is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "discovery poll failed"),
                }

                let elapsed = started.elapsed();
                if elapsed < interval {
                    let mut left = interval - elapsed;
                    // sleep in short slices so stop() is prompt
                    while !left.is_zero() && thread_running.load(Ordering::SeqCst) {
                        let slice = left.min(Duration::from_millis(50));
                        thread::sleep(slice);
                        left = left.saturating_sub(slice);
                    }
                }
            }
        });

        Ok(Self {
            running,
            thread: Some(thread),
            receiver,
        })
    }

    /// Returns the event channel. Use `recv_timeout` or `try_recv` to pull
    /// events without blocking forever.
    pub fn events(&self) -> &mpsc::Receiver<DiscoveryEvent> {
        &self.receiver
    }

    /// Stops the poller and waits for its thread. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PlcDiscovery {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{PlcSimulator, SimulatorConfig};

    #[test]
    fn test_broadcast_target() {
        let target = broadcast_target();
        assert_eq!(target.port(), DEFAULT_DISCOVERY_PORT);
        assert!(target.ip().is_ipv4());
    }

    #[test]
    fn test_parse_reply_rejects_wrong_command() {
        let frame = EncapHeader::new_request(EncapCommand::SendRRData, 0, 0, [0u8; 8]).to_bytes();
        assert!(parse_reply(&frame).is_err());
    }

    #[test]
    fn test_discover_simulator_unicast() {
        let sim = PlcSimulator::start(SimulatorConfig::default()).unwrap();
        let target = sim.discovery_addr().unwrap();

        let device = discover_plc(Duration::from_secs(2), target)
            .unwrap()
            .expect("simulator should answer");
        assert_eq!(
            device.identity.product_name,
            SimulatorConfig::default().identity.product_name
        );
    }

    #[test]
    fn test_discover_nothing_on_silent_port() {
        // a bound but unanswered socket: the window elapses quietly
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = silent.local_addr().unwrap();
        let devices = discover_plcs(Duration::from_millis(100), target).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_poller_reports_device_once() {
        let sim = PlcSimulator::start(SimulatorConfig::default()).unwrap();
        let target = sim.discovery_addr().unwrap();

        let mut poller = PlcDiscovery::start(target, Duration::from_millis(200)).unwrap();
        let first = poller
            .events()
            .recv_timeout(Duration::from_secs(5))
            .expect("device event");
        assert!(matches!(first, DiscoveryEvent::Device(_)));
        // the same device answering again must not produce another event
        assert!(poller
            .events()
            .recv_timeout(Duration::from_millis(600))
            .is_err());
        poller.stop();
    }
}
