//! High-level tag operations.
//!
//! [`EipDriver`] wraps a [`Connection`] and exposes the operations an
//! application actually wants: read a tag, write a tag, browse the tag list,
//! identify the device. It owns two policies the connection layer knows
//! nothing about:
//!
//! - **Name resolution.** Controller-scoped and program-scoped tags live
//!   under different names on the wire. [`TagNameResolver`] turns one
//!   caller-supplied name into an ordered candidate list (by default the
//!   bare name, then `Program:MainProgram.` prefixed); candidates are tried
//!   in order and a "no such path" CIP status moves on to the next one.
//!   Only when every candidate is rejected does the operation fail, with
//!   [`EipError::TagNotFound`] carrying the original name.
//! - **Best-effort browsing.** Tag enumeration is an optional service on
//!   many devices. [`EipDriver::list_tags`] treats "service not supported"
//!   as the answer `None`, not as an error.
//!
//! # Example
//!
//! ```no_run
//! use eip_client::{ConnectionConfig, EipDriver};
//! use std::net::Ipv4Addr;
//!
//! let config = ConnectionConfig::new(Ipv4Addr::new(192, 168, 1, 10).into());
//! let mut driver = EipDriver::new(config);
//! driver.connect()?;
//!
//! driver.write_tag("Counter", 42)?;
//! let value = driver.read_tag("Counter")?;
//! println!("Counter = {}", value);
//! # Ok::<(), eip_client::EipError>(())
//! ```

use std::collections::BTreeMap;

use tracing::debug;

use crate::command::{CipRequest, PathOptions};
use crate::connection::{Connection, ConnectionConfig, ConnectionEvent, ObserverId};
use crate::error::{EipError, Result};
use crate::path::{CLASS_IDENTITY, CLASS_SYMBOL};
use crate::response::{DeviceIdentity, ReadTagResponse};
use crate::status::{
    cip_status_is_unsupported, CIP_STATUS_PATH_DESTINATION_UNKNOWN, CIP_STATUS_PATH_SEGMENT_ERROR,
};
use crate::types::{CipDataType, CipValue};

/// Maximum instances requested per tag-browse exchange.
const BROWSE_BATCH: u16 = 64;

/// Expands one tag name into the ordered list of wire names to try.
///
/// A name that is already program-scoped (starts with `Program:`) is used
/// verbatim; anything else is combined with each configured prefix in order.
#[derive(Debug, Clone)]
pub struct TagNameResolver {
    prefixes: Vec<String>,
}

impl Default for TagNameResolver {
    fn default() -> Self {
        Self {
            prefixes: vec![String::new(), "Program:MainProgram.".to_string()],
        }
    }
}

impl TagNameResolver {
    /// Creates a resolver with an explicit prefix list. An empty-string
    /// prefix stands for the bare name.
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// Returns the candidate wire names for `name`, in the order to try.
    ///
    /// # Example
    ///
    /// ```
    /// use eip_client::TagNameResolver;
    ///
    /// let resolver = TagNameResolver::default();
    /// assert_eq!(
    ///     resolver.candidates("Counter"),
    ///     vec!["Counter", "Program:MainProgram.Counter"]
    /// );
    /// assert_eq!(
    ///     resolver.candidates("Program:Pump.Speed"),
    ///     vec!["Program:Pump.Speed"]
    /// );
    /// ```
    pub fn candidates(&self, name: &str) -> Vec<String> {
        if name.starts_with("Program:") {
            return vec![name.to_string()];
        }
        self.prefixes
            .iter()
            .map(|prefix| format!("{}{}", prefix, name))
            .collect()
    }
}

/// One entry from a tag-browse reply.
///
/// Wire layout per entry: `[instance_id:u16][type_code:u8][name_len:u8][name]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Symbol instance identifier.
    pub instance_id: u16,
    /// Declared CIP type of the tag.
    pub data_type: CipDataType,
    /// Tag name.
    pub name: String,
}

impl TagInfo {
    /// Parses a concatenated list of browse entries.
    pub fn parse_list(data: &[u8]) -> Result<Vec<TagInfo>> {
        let mut tags = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let rest = &data[offset..];
            if rest.len() < 4 {
                return Err(EipError::truncated(4, rest.len()));
            }
            let instance_id = u16::from_le_bytes([rest[0], rest[1]]);
            let data_type = CipDataType::from_code(rest[2])?;
            let name_len = rest[3] as usize;
            let name = rest
                .get(4..4 + name_len)
                .ok_or_else(|| EipError::truncated(4 + name_len, rest.len()))?;
            tags.push(TagInfo {
                instance_id,
                data_type,
                name: String::from_utf8_lossy(name).into_owned(),
            });
            offset += 4 + name_len;
        }
        Ok(tags)
    }
}

/// High-level EtherNet/IP client.
///
/// All operations require a connected session (see [`EipDriver::connect`])
/// and block until they complete or time out.
#[derive(Debug)]
pub struct EipDriver {
    connection: Connection,
    path_options: PathOptions,
    resolver: TagNameResolver,
}

impl EipDriver {
    /// Creates a driver for the given connection configuration. No I/O
    /// happens until [`EipDriver::connect`].
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            connection: Connection::new(config),
            path_options: PathOptions::default(),
            resolver: TagNameResolver::default(),
        }
    }

    /// Overrides the path construction options.
    pub fn with_path_options(mut self, options: PathOptions) -> Self {
        self.path_options = options;
        self
    }

    /// Overrides the tag-name resolver.
    pub fn with_resolver(mut self, resolver: TagNameResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Opens the connection and registers a session.
    pub fn connect(&mut self) -> Result<()> {
        self.connection.connect()
    }

    /// Closes the session and the connection.
    pub fn disconnect(&mut self) -> Result<()> {
        self.connection.disconnect()
    }

    /// Returns whether a session is registered.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Registers an observer for connection events.
    pub fn subscribe(&mut self, handler: impl Fn(&ConnectionEvent) + Send + 'static) -> ObserverId {
        self.connection.subscribe(handler)
    }

    /// Removes a previously registered observer.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.connection.unsubscribe(id)
    }

    /// Sends one request and returns its reply data, mapping a nonzero CIP
    /// status to an error.
    fn exchange(&mut self, request: CipRequest) -> Result<Vec<u8>> {
        let response = self.connection.send_request(request)?;
        Ok(response.check_status()?.to_vec())
    }

    /// Runs `build` against each candidate name until one is accepted.
    ///
    /// A "path unknown" or "path segment error" CIP status moves to the next
    /// candidate; every other error aborts immediately.
    fn try_candidates(
        &mut self,
        name: &str,
        build: impl Fn(&str, &PathOptions) -> Result<CipRequest>,
    ) -> Result<Vec<u8>> {
        for candidate in self.resolver.candidates(name) {
            let request = build(&candidate, &self.path_options)?;
            match self.exchange(request) {
                Ok(data) => {
                    debug!(tag = %candidate, "candidate accepted");
                    return Ok(data);
                }
                Err(EipError::CipStatus { code })
                    if code == CIP_STATUS_PATH_DESTINATION_UNKNOWN
                        || code == CIP_STATUS_PATH_SEGMENT_ERROR =>
                {
                    debug!(tag = %candidate, code, "candidate rejected, trying next");
                }
                Err(e) => return Err(e),
            }
        }
        Err(EipError::TagNotFound {
            name: name.to_string(),
        })
    }

    /// Reads a scalar tag.
    ///
    /// # Errors
    ///
    /// `TagNotFound` when no candidate name exists on the device; the usual
    /// connection and protocol errors otherwise.
    pub fn read_tag(&mut self, name: &str) -> Result<CipValue> {
        let data = self.try_candidates(name, |n, opts| CipRequest::read_tag(n, 1, opts))?;
        ReadTagResponse::from_data(&data)?.decode_scalar()
    }

    /// Reads `count` elements of an array tag.
    pub fn read_tag_array(&mut self, name: &str, count: u16) -> Result<Vec<CipValue>> {
        let data = self.try_candidates(name, |n, opts| CipRequest::read_tag(n, count, opts))?;
        ReadTagResponse::from_data(&data)?.decode_elements()
    }

    /// Writes a scalar tag, inferring the CIP type from the value.
    ///
    /// Accepts anything convertible to [`CipValue`]: `bool`, integers,
    /// `f32`/`f64`, `&str`. Integers take the smallest CIP type that holds
    /// the value; see [`CipValue::infer_integer`].
    pub fn write_tag(&mut self, name: &str, value: impl Into<CipValue>) -> Result<()> {
        self.write_tag_array(name, &[value.into()])
    }

    /// Writes a scalar tag with an explicit CIP type, coercing the value.
    ///
    /// Use this when the tag's declared type is known and differs from what
    /// inference would pick (e.g. writing `1` to a DINT tag).
    pub fn write_tag_as(
        &mut self,
        name: &str,
        value: impl Into<CipValue>,
        data_type: CipDataType,
    ) -> Result<()> {
        let value = value.into().coerce(data_type)?;
        self.write_tag_array(name, &[value])
    }

    /// Writes consecutive elements of an array tag. All values must share
    /// one CIP type.
    pub fn write_tag_array(&mut self, name: &str, values: &[CipValue]) -> Result<()> {
        self.try_candidates(name, |n, opts| CipRequest::write_tag(n, values, opts))?;
        Ok(())
    }

    /// Reads several tags in sequence, collecting per-tag outcomes.
    ///
    /// A failed tag does not abort the batch; its error is recorded and the
    /// remaining tags are still read. Connection loss mid-batch surfaces as
    /// errors on the remaining entries.
    pub fn read_tags(&mut self, names: &[&str]) -> BTreeMap<String, Result<CipValue>> {
        names
            .iter()
            .map(|name| (name.to_string(), self.read_tag(name)))
            .collect()
    }

    /// Enumerates tags on the device, if it supports browsing.
    ///
    /// Returns `Ok(None)` when the device answers "service not supported" —
    /// that is a normal outcome, not an error.
    pub fn list_tags(&mut self) -> Result<Option<Vec<TagInfo>>> {
        let request = CipRequest::find_next(CLASS_SYMBOL, 0, BROWSE_BATCH);
        let response = self.connection.send_request(request)?;
        if cip_status_is_unsupported(response.cip_status) {
            debug!("device does not support tag browsing");
            return Ok(None);
        }
        let data = response.check_status()?;
        Ok(Some(TagInfo::parse_list(data)?))
    }

    /// Looks up browse information for one tag, if the device supports
    /// browsing. The name is matched against the same candidates used for
    /// reads.
    pub fn get_tag_info(&mut self, name: &str) -> Result<Option<TagInfo>> {
        let Some(tags) = self.list_tags()? else {
            return Ok(None);
        };
        let candidates = self.resolver.candidates(name);
        Ok(tags
            .into_iter()
            .find(|tag| candidates.iter().any(|c| c == &tag.name)))
    }

    /// Reads the device identity (vendor, product, revision, serial) from
    /// the Identity object.
    pub fn get_device_info(&mut self) -> Result<DeviceIdentity> {
        let data = self.exchange(CipRequest::get_attributes_all(CLASS_IDENTITY, 0x01))?;
        DeviceIdentity::from_bytes(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_default_candidates() {
        let resolver = TagNameResolver::default();
        assert_eq!(
            resolver.candidates("Motor.Speed"),
            vec!["Motor.Speed", "Program:MainProgram.Motor.Speed"]
        );
    }

    #[test]
    fn test_resolver_program_scoped_passthrough() {
        let resolver = TagNameResolver::default();
        assert_eq!(
            resolver.candidates("Program:Line2.Count"),
            vec!["Program:Line2.Count"]
        );
    }

    #[test]
    fn test_resolver_custom_prefixes() {
        let resolver = TagNameResolver::new(vec![
            "Program:Cell.".to_string(),
            String::new(),
        ]);
        assert_eq!(
            resolver.candidates("Valve"),
            vec!["Program:Cell.Valve", "Valve"]
        );
    }

    #[test]
    fn test_tag_info_parse_list() {
        let mut data = Vec::new();
        for (instance, ty, name) in [(1u16, 0xC4u8, "Counter"), (2, 0xC1, "Running")] {
            data.extend_from_slice(&instance.to_le_bytes());
            data.push(ty);
            data.push(name.len() as u8);
            data.extend_from_slice(name.as_bytes());
        }
        let tags = TagInfo::parse_list(&data).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].instance_id, 1);
        assert_eq!(tags[0].data_type, CipDataType::Dint);
        assert_eq!(tags[0].name, "Counter");
        assert_eq!(tags[1].name, "Running");
    }

    #[test]
    fn test_tag_info_parse_empty() {
        assert!(TagInfo::parse_list(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_tag_info_parse_truncated_name() {
        // entry claims a 10-byte name but only 2 follow
        let data = [0x01, 0x00, 0xC4, 0x0A, b'a', b'b'];
        assert!(matches!(
            TagInfo::parse_list(&data),
            Err(EipError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn test_read_tag_requires_connection() {
        use std::net::IpAddr;
        let mut driver = EipDriver::new(ConnectionConfig::new(IpAddr::from([127, 0, 0, 1])));
        assert!(matches!(
            driver.read_tag("Counter"),
            Err(EipError::NotConnected)
        ));
    }
}

#[cfg(test)]
mod simulator_tests {
    //! End-to-end scenarios: a real driver talking TCP to the in-process
    //! simulator.

    use super::*;
    use crate::simulator::{PlcSimulator, SimulatorConfig};

    fn start() -> (PlcSimulator, EipDriver) {
        let sim = PlcSimulator::start(SimulatorConfig {
            udp_addr: None,
            ..Default::default()
        })
        .expect("simulator start");
        let mut driver = EipDriver::new(ConnectionConfig::from_addr(sim.local_addr()));
        driver.connect().expect("connect");
        (sim, driver)
    }

    #[test]
    fn test_read_bool_tag() {
        let (sim, mut driver) = start();
        sim.set_tag("Running", CipValue::Bool(true));
        assert_eq!(driver.read_tag("Running").unwrap(), CipValue::Bool(true));
    }

    #[test]
    fn test_write_inferred_then_read_back() {
        let (sim, mut driver) = start();
        sim.set_tag("Counter", CipValue::Sint(0));
        // 42 fits SINT, matching the stored type
        driver.write_tag("Counter", 42).unwrap();
        assert_eq!(driver.read_tag("Counter").unwrap(), CipValue::Sint(42));
        assert_eq!(sim.get_tag("Counter"), Some(vec![CipValue::Sint(42)]));
    }

    #[test]
    fn test_write_as_coerces_to_stored_type() {
        let (sim, mut driver) = start();
        sim.set_tag("Total", CipValue::Dint(0));
        // inference alone would pick SINT and mismatch the stored DINT
        driver
            .write_tag_as("Total", 42, CipDataType::Dint)
            .unwrap();
        assert_eq!(driver.read_tag("Total").unwrap(), CipValue::Dint(42));
    }

    #[test]
    fn test_write_type_mismatch_reported() {
        let (sim, mut driver) = start();
        sim.set_tag("Total", CipValue::Dint(0));
        match driver.write_tag("Total", 42) {
            Err(EipError::CipStatus { code: 0x20 }) => {}
            other => panic!("expected CipStatus 0x20, got {:?}", other),
        }
    }

    #[test]
    fn test_read_dint_array() {
        let (sim, mut driver) = start();
        let values: Vec<CipValue> = [10, 20, 30, 40, 50].map(CipValue::Dint).to_vec();
        sim.set_tag_array("Samples", values.clone());
        assert_eq!(driver.read_tag_array("Samples", 5).unwrap(), values);
        // a shorter read returns the leading elements
        assert_eq!(
            driver.read_tag_array("Samples", 2).unwrap(),
            &values[..2]
        );
    }

    #[test]
    fn test_write_array_roundtrip() {
        let (sim, mut driver) = start();
        sim.set_tag_array("Setpoints", vec![CipValue::Int(0); 3]);
        let values = vec![CipValue::Int(-5), CipValue::Int(0), CipValue::Int(5)];
        driver.write_tag_array("Setpoints", &values).unwrap();
        assert_eq!(sim.get_tag("Setpoints"), Some(values));
    }

    #[test]
    fn test_string_tag_roundtrip() {
        let (sim, mut driver) = start();
        sim.set_tag("Recipe", CipValue::String("empty".into()));
        driver.write_tag("Recipe", "BATCH-7").unwrap();
        assert_eq!(
            driver.read_tag("Recipe").unwrap(),
            CipValue::String("BATCH-7".into())
        );
    }

    #[test]
    fn test_unknown_tag_is_tag_not_found() {
        let (_sim, mut driver) = start();
        match driver.read_tag("NoSuchTag") {
            Err(EipError::TagNotFound { name }) => assert_eq!(name, "NoSuchTag"),
            other => panic!("expected TagNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_program_scoped_resolution() {
        let (sim, mut driver) = start();
        sim.set_tag("Program:MainProgram.Hidden", CipValue::Int(11));
        // the bare name misses, the prefixed candidate hits
        assert_eq!(driver.read_tag("Hidden").unwrap(), CipValue::Int(11));
    }

    #[test]
    fn test_read_tags_partial_success() {
        let (sim, mut driver) = start();
        sim.set_tag("Good", CipValue::Bool(false));
        let results = driver.read_tags(&["Good", "Missing"]);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results["Good"].as_ref().unwrap(),
            &CipValue::Bool(false)
        );
        assert!(matches!(
            results["Missing"],
            Err(EipError::TagNotFound { .. })
        ));
    }

    #[test]
    fn test_list_tags_and_info() {
        let (sim, mut driver) = start();
        sim.set_tag("Counter", CipValue::Dint(1));
        sim.set_tag("Running", CipValue::Bool(true));

        let tags = driver.list_tags().unwrap().expect("browse supported");
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Counter", "Running"]);

        let info = driver.get_tag_info("Counter").unwrap().unwrap();
        assert_eq!(info.data_type, CipDataType::Dint);
        assert!(driver.get_tag_info("Missing").unwrap().is_none());
    }

    #[test]
    fn test_get_device_info() {
        let (_sim, mut driver) = start();
        let identity = driver.get_device_info().unwrap();
        assert_eq!(identity, SimulatorConfig::default().identity);
    }

    #[test]
    fn test_session_lifecycle() {
        let (sim, mut driver) = start();
        sim.set_tag("T", CipValue::Sint(1));
        assert!(driver.is_connected());
        driver.disconnect().unwrap();
        assert!(!driver.is_connected());
        assert!(matches!(
            driver.read_tag("T"),
            Err(EipError::NotConnected)
        ));
        // the session can be re-established on the same driver
        driver.connect().unwrap();
        assert_eq!(driver.read_tag("T").unwrap(), CipValue::Sint(1));
    }

    #[test]
    fn test_tag_change_observer() {
        use std::sync::mpsc;

        let (sim, mut driver) = start();
        sim.set_tag("Watched", CipValue::Int(0));
        let (tx, rx) = mpsc::channel();
        sim.on_tag_change(move |name, values| {
            tx.send((name.to_string(), values.to_vec())).ok();
        });

        driver.write_tag("Watched", CipValue::Int(19)).unwrap();
        let (name, values) = rx
            .recv_timeout(std::time::Duration::from_secs(2))
            .expect("change notification");
        assert_eq!(name, "Watched");
        assert_eq!(values, vec![CipValue::Int(19)]);
    }
}
