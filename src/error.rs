//! Error types for EtherNet/IP communication.

use std::io;
use thiserror::Error;

use crate::types::CipDataType;

/// Result type alias for EtherNet/IP operations.
pub type Result<T> = std::result::Result<T, EipError>;

/// Errors that can occur during EtherNet/IP communication.
#[derive(Debug, Error)]
pub enum EipError {
    /// An operation that requires a registered session was invoked while
    /// the connection was not in the `Ready` state.
    #[error("not connected: no registered EtherNet/IP session")]
    NotConnected,

    /// The encapsulation header carried a nonzero status code.
    ///
    /// Most causes are configuration problems on the server (stale session
    /// handle, unsupported protocol version) rather than transient faults,
    /// so the error is surfaced as-is and never retried by the library.
    #[error("encapsulation status 0x{code:08X}: {}", crate::status::encap_status_description(*code))]
    ProtocolStatus {
        /// Raw status from the encapsulation header.
        code: u32,
    },

    /// The CIP-layer status inside a successful encapsulation envelope was
    /// nonzero (tag not found, service unsupported, access denied, ...).
    #[error("CIP status 0x{code:02X}: {}", crate::status::cip_status_description(*code))]
    CipStatus {
        /// Raw CIP general status code.
        code: u8,
    },

    /// No response arrived within the configured window.
    #[error("request timeout")]
    Timeout,

    /// A parser needed more bytes than the buffer held.
    #[error("truncated buffer: needed {needed} bytes, {available} available")]
    TruncatedBuffer {
        /// Bytes the parser required.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// A CIP data type code outside the supported set.
    #[error("unsupported CIP data type 0x{code:02X}")]
    UnsupportedType {
        /// The unrecognized type code.
        code: u8,
    },

    /// A value does not fit the native range of its CIP type.
    #[error("value {value} out of range for {data_type}")]
    OutOfRange {
        /// Display form of the offending value.
        value: String,
        /// The CIP type that cannot hold it.
        data_type: CipDataType,
    },

    /// A CIP path could not be built or parsed.
    #[error("invalid CIP path: {reason}")]
    InvalidPath {
        /// Description of the path error.
        reason: String,
    },

    /// A request could not be built from the given arguments.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Description of the request error.
        reason: String,
    },

    /// A response did not have the expected shape.
    #[error("invalid response: {reason}")]
    InvalidResponse {
        /// Description of the response error.
        reason: String,
    },

    /// No candidate tag name was accepted by the server.
    #[error("tag not found: {name}")]
    TagNotFound {
        /// The tag name as given by the caller, before candidate expansion.
        name: String,
    },

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EipError {
    /// Creates a new `ProtocolStatus` error.
    pub fn protocol_status(code: u32) -> Self {
        Self::ProtocolStatus { code }
    }

    /// Creates a new `CipStatus` error.
    pub fn cip_status(code: u8) -> Self {
        Self::CipStatus { code }
    }

    /// Creates a new `TruncatedBuffer` error.
    pub fn truncated(needed: usize, available: usize) -> Self {
        Self::TruncatedBuffer { needed, available }
    }

    /// Creates a new `InvalidPath` error.
    ///
    /// # Example
    ///
    /// ```
    /// use eip_client::EipError;
    ///
    /// let err = EipError::invalid_path("empty path component");
    /// ```
    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidResponse` error.
    ///
    /// # Example
    ///
    /// ```
    /// use eip_client::EipError;
    ///
    /// let err = EipError::invalid_response("response too short");
    /// ```
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Creates a new `OutOfRange` error.
    pub fn out_of_range(value: impl std::fmt::Display, data_type: CipDataType) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            data_type,
        }
    }

    /// Remediation suggestions for this error, if the status tables carry any.
    ///
    /// Returns an empty slice for errors without a fixed classification.
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            Self::ProtocolStatus { code } => crate::status::encap_status_suggestions(*code),
            Self::CipStatus { code } => crate::status::cip_status_suggestions(*code),
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_display() {
        let err = EipError::NotConnected;
        assert_eq!(
            err.to_string(),
            "not connected: no registered EtherNet/IP session"
        );
    }

    #[test]
    fn test_protocol_status_display() {
        let err = EipError::protocol_status(0x0064);
        assert!(err.to_string().contains("0x00000064"));
        assert!(err.to_string().contains("session handle"));
    }

    #[test]
    fn test_cip_status_display() {
        let err = EipError::cip_status(0x05);
        assert!(err.to_string().contains("0x05"));
    }

    #[test]
    fn test_truncated_display() {
        let err = EipError::truncated(24, 7);
        assert_eq!(
            err.to_string(),
            "truncated buffer: needed 24 bytes, 7 available"
        );
    }

    #[test]
    fn test_out_of_range_display() {
        let err = EipError::out_of_range(300, CipDataType::Sint);
        assert_eq!(err.to_string(), "value 300 out of range for SINT");
    }

    #[test]
    fn test_suggestions_present_for_known_status() {
        let err = EipError::protocol_status(0x0064);
        assert!(!err.suggestions().is_empty());
    }

    #[test]
    fn test_suggestions_empty_for_timeout() {
        assert!(EipError::Timeout.suggestions().is_empty());
    }
}
