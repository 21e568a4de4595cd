//! Request builders for the four encapsulation commands.
//!
//! Each request type owns its serialization, mirroring the wire layout in the
//! module docs of [`crate::header`]. The CIP packet carried inside SendRRData
//! is modeled by [`CipRequest`]: a service code, a word-aligned path and the
//! service-specific data.
//!
//! # Compatibility knobs
//!
//! Two aspects of the wire format vary between server implementations and
//! were never pinned down against target hardware, so both stay explicit
//! options instead of silent defaults:
//!
//! - [`InterfaceHandleFormat`] — three observed encodings of the 4-byte
//!   interface-handle field at the start of a SendRRData payload.
//! - [`PathOptions`] — 8-bit vs. 16-bit symbolic segment lengths, and an
//!   optional Message Router path prefix.
//!
//! # Example
//!
//! ```
//! use eip_client::command::{CipRequest, PathOptions, SendRRDataRequest};
//! use std::time::Duration;
//!
//! let cip = CipRequest::read_tag("Counter", 1, &PathOptions::default()).unwrap();
//! let frame = SendRRDataRequest::new(0x11, cip, [0u8; 8])
//!     .to_bytes(Duration::from_secs(5));
//! assert_eq!(&frame[0..2], &[0x6F, 0x00]);
//! ```

use std::time::Duration;

use crate::error::Result;
use crate::header::{EncapCommand, EncapHeader};
use crate::path::{
    build_object_path, build_symbolic_path, build_symbolic_path_16, MESSAGE_ROUTER_PATH,
};
use crate::types::CipValue;

/// CIP service code: Get_Attributes_All.
pub const SERVICE_GET_ATTRIBUTES_ALL: u8 = 0x01;
/// CIP service code: Find_Next_Object_Instance (tag browsing).
pub const SERVICE_FIND_NEXT: u8 = 0x11;
/// CIP service code: Read Tag.
pub const SERVICE_READ_TAG: u8 = 0x4C;
/// CIP service code: Write Tag.
pub const SERVICE_WRITE_TAG: u8 = 0x4D;

/// Encapsulation protocol version sent in RegisterSession.
pub const PROTOCOL_VERSION: u16 = 1;

/// Largest serialized CIP packet that fits the 16-bit length fields of a
/// SendRRData frame (the payload carries 6 envelope bytes ahead of it).
pub const MAX_CIP_PACKET: usize = u16::MAX as usize - 6;

/// Wire encoding of the 4-byte interface-handle field in SendRRData.
///
/// The correct encoding is server-dependent; pick the one your device
/// documents. `HandleAndTimeout` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterfaceHandleFormat {
    /// Two 16-bit subfields: handle (0) then timeout in whole seconds.
    #[default]
    HandleAndTimeout,
    /// A single 32-bit zero.
    Zero,
    /// Handle (0) then timeout in milliseconds, saturated to 16 bits.
    HandleAndTimeoutMs,
}

impl InterfaceHandleFormat {
    /// Encodes the field for a request with the given response timeout.
    pub fn encode(self, timeout: Duration) -> [u8; 4] {
        match self {
            InterfaceHandleFormat::HandleAndTimeout => {
                let secs = timeout.as_secs().min(u16::MAX as u64) as u16;
                let mut out = [0u8; 4];
                out[2..4].copy_from_slice(&secs.to_le_bytes());
                out
            }
            InterfaceHandleFormat::Zero => [0u8; 4],
            InterfaceHandleFormat::HandleAndTimeoutMs => {
                let ms = timeout.as_millis().min(u16::MAX as u128) as u16;
                let mut out = [0u8; 4];
                out[2..4].copy_from_slice(&ms.to_le_bytes());
                out
            }
        }
    }
}

/// Symbolic path construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathOptions {
    /// Use the 16-bit-length symbolic segment variant.
    pub wide_symbol_length: bool,
    /// Prepend the Message Router object path to tag paths. Some servers
    /// require explicit routing; most do not.
    pub route_via_message_router: bool,
}

impl PathOptions {
    /// Builds a tag path according to these options.
    pub fn build_tag_path(&self, tag_name: &str) -> Result<Vec<u8>> {
        let symbolic = if self.wide_symbol_length {
            build_symbolic_path_16(tag_name)?
        } else {
            build_symbolic_path(tag_name)?
        };
        if self.route_via_message_router {
            let mut path = MESSAGE_ROUTER_PATH.to_vec();
            path.extend_from_slice(&symbolic);
            Ok(path)
        } else {
            Ok(symbolic)
        }
    }
}

/// One CIP request: service code, target path and service data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipRequest {
    /// CIP service code.
    pub service: u8,
    /// Word-aligned CIP path.
    pub path: Vec<u8>,
    /// Service-specific request data.
    pub data: Vec<u8>,
}

impl CipRequest {
    /// Builds a Read Tag request (`element_count` elements, 1 for scalars).
    ///
    /// # Errors
    ///
    /// Fails if the tag name does not form a valid path.
    pub fn read_tag(tag_name: &str, element_count: u16, opts: &PathOptions) -> Result<Self> {
        Ok(Self {
            service: SERVICE_READ_TAG,
            path: opts.build_tag_path(tag_name)?,
            data: element_count.to_le_bytes().to_vec(),
        })
    }

    /// Builds a Write Tag request for one or more values of the same type.
    ///
    /// Data layout: `[element_count:u16][data_type:u8][value bytes...]`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid path, an empty value slice, mixed value types, a
    /// value that cannot be encoded, or an encoded packet too large for the
    /// frame's 16-bit length fields ([`MAX_CIP_PACKET`]).
    pub fn write_tag(tag_name: &str, values: &[CipValue], opts: &PathOptions) -> Result<Self> {
        let first = values.first().ok_or_else(|| {
            crate::error::EipError::invalid_request("write requires at least one value")
        })?;
        let data_type = first.data_type();
        let path = opts.build_tag_path(tag_name)?;

        let mut data = Vec::with_capacity(3 + values.len() * 4);
        data.extend_from_slice(&(values.len() as u16).to_le_bytes());
        data.push(data_type.code());
        for value in values {
            if value.data_type() != data_type {
                return Err(crate::error::EipError::invalid_request(format!(
                    "mixed element types in write: {} and {}",
                    data_type,
                    value.data_type()
                )));
            }
            data.extend_from_slice(&value.encode()?);
        }

        // the length fields are u16; a packet past them would wrap silently
        let packet_len = 2 + path.len() + data.len();
        if packet_len > MAX_CIP_PACKET {
            return Err(crate::error::EipError::invalid_request(format!(
                "encoded write of {} bytes exceeds the {}-byte frame limit",
                packet_len, MAX_CIP_PACKET
            )));
        }

        Ok(Self {
            service: SERVICE_WRITE_TAG,
            path,
            data,
        })
    }

    /// Builds a Get_Attributes_All request for a class/instance target.
    pub fn get_attributes_all(class_id: u8, instance_id: u8) -> Self {
        Self {
            service: SERVICE_GET_ATTRIBUTES_ALL,
            path: build_object_path(class_id, instance_id).to_vec(),
            data: Vec::new(),
        }
    }

    /// Builds a Find_Next_Object_Instance request starting after `instance`.
    ///
    /// Many servers do not implement this service; callers must treat a
    /// "service not supported" CIP status as a normal outcome.
    pub fn find_next(class_id: u8, start_instance: u8, max_instances: u16) -> Self {
        Self {
            service: SERVICE_FIND_NEXT,
            path: build_object_path(class_id, start_instance).to_vec(),
            data: max_instances.to_le_bytes().to_vec(),
        }
    }

    /// Serializes the CIP packet: `[service][path_size_words][path][data]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + self.path.len() + self.data.len());
        bytes.push(self.service);
        bytes.push((self.path.len() / 2) as u8);
        bytes.extend_from_slice(&self.path);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

/// RegisterSession request (session handle 0; the server assigns one).
#[derive(Debug, Clone, Copy)]
pub struct RegisterSessionRequest {
    /// Sender context for reply correlation.
    pub sender_context: [u8; 8],
}

impl RegisterSessionRequest {
    /// Creates a RegisterSession request.
    pub fn new(sender_context: [u8; 8]) -> Self {
        Self { sender_context }
    }

    /// Serializes the request: header + `[protocol_version:u16][flags:u16]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header =
            EncapHeader::new_request(EncapCommand::RegisterSession, 4, 0, self.sender_context);
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // option flags
        bytes
    }
}

/// UnregisterSession request (header only, no payload, no reply expected).
#[derive(Debug, Clone, Copy)]
pub struct UnregisterSessionRequest {
    /// The session handle being released.
    pub session_handle: u32,
}

impl UnregisterSessionRequest {
    /// Creates an UnregisterSession request.
    pub fn new(session_handle: u32) -> Self {
        Self { session_handle }
    }

    /// Serializes the request (24 bytes, zero-length payload).
    pub fn to_bytes(&self) -> Vec<u8> {
        EncapHeader::new_request(
            EncapCommand::UnregisterSession,
            0,
            self.session_handle,
            [0u8; 8],
        )
        .to_bytes()
        .to_vec()
    }
}

/// ListIdentity request (header only; sent over UDP for discovery).
#[derive(Debug, Clone, Copy, Default)]
pub struct ListIdentityRequest;

impl ListIdentityRequest {
    /// Serializes the request (24 bytes, zero-length payload).
    pub fn to_bytes(&self) -> Vec<u8> {
        EncapHeader::new_request(EncapCommand::ListIdentity, 0, 0, [0u8; 8])
            .to_bytes()
            .to_vec()
    }
}

/// SendRRData request carrying one CIP exchange.
#[derive(Debug, Clone)]
pub struct SendRRDataRequest {
    /// Registered session handle.
    pub session_handle: u32,
    /// The CIP request to carry.
    pub request: CipRequest,
    /// Sender context for reply correlation.
    pub sender_context: [u8; 8],
    /// Interface-handle field encoding.
    pub interface_handle_format: InterfaceHandleFormat,
}

impl SendRRDataRequest {
    /// Creates a SendRRData request with the default interface-handle format.
    pub fn new(session_handle: u32, request: CipRequest, sender_context: [u8; 8]) -> Self {
        Self {
            session_handle,
            request,
            sender_context,
            interface_handle_format: InterfaceHandleFormat::default(),
        }
    }

    /// Selects a different interface-handle encoding.
    pub fn with_interface_handle_format(mut self, format: InterfaceHandleFormat) -> Self {
        self.interface_handle_format = format;
        self
    }

    /// Serializes the full frame. `timeout` feeds the interface-handle field
    /// for the encodings that carry one.
    pub fn to_bytes(&self, timeout: Duration) -> Vec<u8> {
        let cip = self.request.to_bytes();
        let payload_len = 4 + 2 + cip.len();

        let header = EncapHeader::new_request(
            EncapCommand::SendRRData,
            payload_len as u16,
            self.session_handle,
            self.sender_context,
        );

        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&self.interface_handle_format.encode(timeout));
        bytes.extend_from_slice(&(cip.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&cip);
        bytes
    }
}
