//! # EtherNet/IP Client Library
//!
//! A Rust library for communicating with PLCs over EtherNet/IP explicit
//! messaging: read and write tags by name, discover devices on the local
//! network, and test against an in-process simulator.
//!
//! This is a **protocol-only** library—no polling loops, schedulers, or
//! application-level features. Each call produces exactly one request and
//! one response. No automatic retries, caching, or reconnection.
//!
//! ## Features
//!
//! - **Protocol-only** — session management and explicit messaging, nothing more
//! - **Deterministic** — one call, one request, one response
//! - **Type-safe** — CIP scalar types as enums, no silent truncation
//! - **No panics** — all errors returned as `Result<T, EipError>`
//! - **Tag-oriented API** — read, write, batch read, browse, identify
//! - **Built-in test double** — a PLC simulator speaking the same wire format
//!
//! ## Quick Start
//!
//! ```no_run
//! use eip_client::{ConnectionConfig, EipDriver};
//! use std::net::Ipv4Addr;
//!
//! fn main() -> eip_client::Result<()> {
//!     let config = ConnectionConfig::new(Ipv4Addr::new(192, 168, 1, 10).into());
//!     let mut driver = EipDriver::new(config);
//!     driver.connect()?;
//!
//!     // Read a scalar tag
//!     let value = driver.read_tag("Counter")?;
//!     println!("Counter = {}", value);
//!
//!     // Write with inferred CIP type (42 fits SINT)
//!     driver.write_tag("Counter", 42)?;
//!
//!     // Write with an explicit CIP type
//!     use eip_client::CipDataType;
//!     driver.write_tag_as("Counter", 42, CipDataType::Dint)?;
//!
//!     // Read several tags, collecting per-tag outcomes
//!     for (name, result) in driver.read_tags(&["Counter", "Running"]) {
//!         match result {
//!             Ok(value) => println!("{} = {}", name, value),
//!             Err(e) => println!("{}: {}", name, e),
//!         }
//!     }
//!
//!     driver.disconnect()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Tag Names
//!
//! Controller-scoped and program-scoped tags live under different wire
//! names. The driver tries each candidate produced by [`TagNameResolver`]
//! in order (bare name first, then `Program:MainProgram.` prefixed by
//! default) and only reports [`EipError::TagNotFound`] once every candidate
//! is rejected. Names starting with `Program:` are used verbatim.
//!
//! ## Device Discovery
//!
//! ```no_run
//! use eip_client::discovery::{broadcast_target, discover_plcs};
//! use std::time::Duration;
//!
//! for device in discover_plcs(Duration::from_secs(2), broadcast_target())? {
//!     println!(
//!         "{} — {} (serial {:08X})",
//!         device.addr, device.identity.product_name, device.identity.serial_number
//!     );
//! }
//! # Ok::<(), eip_client::EipError>(())
//! ```
//!
//! ## Testing Without Hardware
//!
//! The [`simulator`] module provides a server-side test double:
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
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, EipError>`]. The library never panics
//! in public code.
//!
//! ```no_run
//! use eip_client::{ConnectionConfig, EipDriver, EipError};
//! use std::net::Ipv4Addr;
//!
//! let config = ConnectionConfig::new(Ipv4Addr::new(192, 168, 1, 10).into());
//! let mut driver = EipDriver::new(config);
//! driver.connect()?;
//!
//! match driver.read_tag("Conveyor.Speed") {
//!     Ok(value) => println!("speed = {}", value),
//!     Err(EipError::TagNotFound { name }) => println!("no such tag: {}", name),
//!     Err(EipError::Timeout) => println!("no reply from the device"),
//!     Err(e) => {
//!         println!("error: {}", e);
//!         for hint in e.suggestions() {
//!             println!("  hint: {}", hint);
//!         }
//!     }
//! }
//! # Ok::<(), EipError>(())
//! ```
//!
//! ## Configuration
//!
//! ```no_run
//! use eip_client::{ConnectionConfig, InterfaceHandleFormat};
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! let config = ConnectionConfig::new(Ipv4Addr::new(192, 168, 1, 10).into())
//!     .with_port(44819)                       // Custom port (default: 44818)
//!     .with_timeout(Duration::from_secs(2))   // Custom timeout (default: 5s)
//!     .with_interface_handle_format(InterfaceHandleFormat::Zero);
//! ```
//!
//! ## Design Philosophy
//!
//! This library follows the principle of **determinism over abstraction**:
//!
//! 1. Each operation does exactly what it says
//! 2. No magic or implicit behavior
//! 3. The application has full control over retry, caching, and reconnection
//! 4. Errors are always explicit and descriptive

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod command;
mod connection;
pub mod discovery;
mod driver;
mod error;
mod header;
pub mod path;
mod response;
pub mod simulator;
pub mod status;
mod types;

// Public re-exports
pub use command::{CipRequest, InterfaceHandleFormat, PathOptions};
pub use connection::{
    Connection, ConnectionConfig, ConnectionEvent, ConnectionState, ObserverId, DEFAULT_EIP_PORT,
    DEFAULT_TIMEOUT,
};
pub use discovery::{
    discover_plc, discover_plcs, DiscoveredDevice, DiscoveryEvent, PlcDiscovery,
    DEFAULT_DISCOVERY_PORT,
};
pub use driver::{EipDriver, TagInfo, TagNameResolver};
pub use error::{EipError, Result};
pub use header::{EncapCommand, EncapHeader, ENCAP_HEADER_SIZE};
pub use response::{DeviceIdentity, ReadTagResponse, SendRRDataResponse};
pub use types::{CipDataType, CipValue, MAX_STRING_LEN};
