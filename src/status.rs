//! Status-code classification tables.
//!
//! Two independent status spaces exist on the wire: the 32-bit status in the
//! encapsulation header, and the 8-bit CIP general status carried inside a
//! SendRRData reply. Both are mapped here to a human-readable description and
//! a fixed list of remediation suggestions, so callers can print something
//! actionable instead of a bare hex code.
//!
//! # Example
//!
//! ```
//! use eip_client::status::{encap_status_description, cip_status_description};
//!
//! assert_eq!(encap_status_description(0), "success");
//! assert_eq!(cip_status_description(0x08), "service not supported");
//! ```

/// CIP general status: success.
pub const CIP_STATUS_SUCCESS: u8 = 0x00;
/// CIP general status: path segment error.
pub const CIP_STATUS_PATH_SEGMENT_ERROR: u8 = 0x04;
/// CIP general status: path destination unknown (tag/object does not exist).
pub const CIP_STATUS_PATH_DESTINATION_UNKNOWN: u8 = 0x05;
/// CIP general status: service not supported by the target object.
pub const CIP_STATUS_SERVICE_NOT_SUPPORTED: u8 = 0x08;
/// CIP general status: invalid parameter value in the request.
pub const CIP_STATUS_INVALID_PARAMETER: u8 = 0x20;

/// Returns a human-readable description of an encapsulation header status.
pub fn encap_status_description(code: u32) -> &'static str {
    match code {
        0x0000 => "success",
        0x0001 => "invalid or unsupported encapsulation command",
        0x0002 => "insufficient memory on the target",
        0x0003 => "incorrect data in the request payload",
        0x0064 => "invalid session handle",
        0x0065 => "invalid request length",
        0x0069 => "unsupported encapsulation protocol revision",
        _ => "unknown encapsulation status",
    }
}

/// Remediation suggestions for an encapsulation header status.
///
/// The list is empty for success and for codes without a known cause.
pub fn encap_status_suggestions(code: u32) -> &'static [&'static str] {
    match code {
        0x0001 => &[
            "verify the target speaks EtherNet/IP explicit messaging on this port",
            "check that the command word was not corrupted in transit",
        ],
        0x0002 => &["reduce request size or concurrent session count on the device"],
        0x0003 => &[
            "check the interface-handle encoding option against the device documentation",
            "verify the CIP packet length field matches the payload",
        ],
        0x0064 => &[
            "the session handle is stale; reconnect to register a new session",
            "confirm no other client unregistered this session",
        ],
        0x0065 => &["the declared payload length disagrees with the bytes sent"],
        0x0069 => &["the device requires a different encapsulation protocol version"],
        _ => &[],
    }
}

/// Returns a human-readable description of a CIP general status code.
pub fn cip_status_description(code: u8) -> &'static str {
    match code {
        0x00 => "success",
        0x01 => "connection failure",
        0x02 => "resource unavailable",
        0x03 => "invalid parameter value",
        0x04 => "path segment error",
        0x05 => "path destination unknown (object does not exist)",
        0x06 => "partial transfer",
        0x08 => "service not supported",
        0x09 => "invalid attribute value",
        0x0A => "attribute list error",
        0x0B => "already in requested mode or state",
        0x0C => "object state conflict",
        0x0E => "attribute not settable",
        0x0F => "privilege violation",
        0x10 => "device state conflict",
        0x11 => "reply data too large",
        0x13 => "not enough data in request",
        0x14 => "attribute not supported",
        0x15 => "too much data in request",
        0x16 => "object does not exist",
        0x1C => "missing attribute in list",
        0x20 => "invalid parameter",
        0x26 => "invalid path size",
        _ => "unknown CIP status",
    }
}

/// Remediation suggestions for a CIP general status code.
pub fn cip_status_suggestions(code: u8) -> &'static [&'static str] {
    match code {
        0x04 => &[
            "check the tag path syntax; components are separated by '.'",
            "try enabling the Message Router path prefix for this device",
        ],
        0x05 | 0x16 => &[
            "verify the tag exists and is spelled exactly as in the controller",
            "program-scoped tags may need a 'Program:<name>.' prefix",
        ],
        0x08 => &[
            "this device does not implement the requested service; treat as unsupported",
        ],
        0x0F => &["the tag may be read-only or protected on the controller"],
        0x13 | 0x15 => &["the element count or value width does not match the tag"],
        0x20 => &["check the element count against the tag's array length"],
        0x26 => &["the path size in words disagrees with the encoded path bytes"],
        _ => &[],
    }
}

/// Returns whether a CIP status means "the server does not implement this
/// service" — a normal, expected outcome for best-effort browsing.
pub fn cip_status_is_unsupported(code: u8) -> bool {
    code == CIP_STATUS_SERVICE_NOT_SUPPORTED
}
