//! EtherNet/IP encapsulation header.
//!
//! Every encapsulation message starts with the same fixed 24-byte header,
//! followed by a command-specific payload. All fields are little-endian.
//!
//! | Field | Offset | Size | Notes |
//! |-------|--------|------|-------|
//! | Command | 0 | 2 | see [`EncapCommand`] |
//! | Length | 2 | 2 | payload length following the header |
//! | Session handle | 4 | 4 | 0 until registered |
//! | Status | 8 | 4 | 0 = success |
//! | Sender context | 12 | 8 | opaque, echoed by the server |
//! | Options | 20 | 4 | always 0 |
//!
//! # Example
//!
//! ```
//! use eip_client::{EncapCommand, EncapHeader};
//!
//! let header = EncapHeader::new_request(EncapCommand::RegisterSession, 4, 0, [0u8; 8]);
//! let bytes = header.to_bytes();
//! assert_eq!(bytes.len(), 24);
//! assert_eq!(EncapHeader::from_bytes(&bytes).unwrap(), header);
//! ```

use crate::error::{EipError, Result};

/// Encapsulation header size in bytes.
pub const ENCAP_HEADER_SIZE: usize = 24;

/// Encapsulation commands used by this library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncapCommand {
    /// ListIdentity (0x0063) — UDP device discovery.
    ListIdentity,
    /// RegisterSession (0x0065) — open a session on a TCP connection.
    RegisterSession,
    /// UnregisterSession (0x0066) — close the session.
    UnregisterSession,
    /// SendRRData (0x006F) — one explicit CIP request/response exchange.
    SendRRData,
}

impl EncapCommand {
    /// Returns the 16-bit command code.
    pub fn code(self) -> u16 {
        match self {
            EncapCommand::ListIdentity => 0x0063,
            EncapCommand::RegisterSession => 0x0065,
            EncapCommand::UnregisterSession => 0x0066,
            EncapCommand::SendRRData => 0x006F,
        }
    }

    /// Resolves a 16-bit command code.
    ///
    /// # Errors
    ///
    /// Returns `EipError::InvalidResponse` for commands this library does not
    /// speak.
    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            0x0063 => Ok(EncapCommand::ListIdentity),
            0x0065 => Ok(EncapCommand::RegisterSession),
            0x0066 => Ok(EncapCommand::UnregisterSession),
            0x006F => Ok(EncapCommand::SendRRData),
            _ => Err(EipError::invalid_response(format!(
                "unknown encapsulation command 0x{:04X}",
                code
            ))),
        }
    }
}

impl std::fmt::Display for EncapCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EncapCommand::ListIdentity => "ListIdentity",
            EncapCommand::RegisterSession => "RegisterSession",
            EncapCommand::UnregisterSession => "UnregisterSession",
            EncapCommand::SendRRData => "SendRRData",
        };
        write!(f, "{}", name)
    }
}

/// The fixed 24-byte encapsulation header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncapHeader {
    /// Encapsulation command.
    pub command: EncapCommand,
    /// Payload length in bytes, not counting the header itself.
    pub length: u16,
    /// Session handle (0 while unregistered).
    pub session_handle: u32,
    /// Status (0 = success). Requests always carry 0.
    pub status: u32,
    /// Opaque 8-byte context echoed by well-behaved servers; this library
    /// uses it to correlate a reply with the one outstanding request.
    pub sender_context: [u8; 8],
    /// Options word, always 0 in this implementation.
    pub options: u32,
}

impl EncapHeader {
    /// Creates a request header with status and options zero.
    pub fn new_request(
        command: EncapCommand,
        payload_length: u16,
        session_handle: u32,
        sender_context: [u8; 8],
    ) -> Self {
        Self {
            command,
            length: payload_length,
            session_handle,
            status: 0,
            sender_context,
            options: 0,
        }
    }

    /// Serializes the header to its 24-byte wire form.
    pub fn to_bytes(self) -> [u8; ENCAP_HEADER_SIZE] {
        let mut bytes = [0u8; ENCAP_HEADER_SIZE];
        bytes[0..2].copy_from_slice(&self.command.code().to_le_bytes());
        bytes[2..4].copy_from_slice(&self.length.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.session_handle.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.status.to_le_bytes());
        bytes[12..20].copy_from_slice(&self.sender_context);
        bytes[20..24].copy_from_slice(&self.options.to_le_bytes());
        bytes
    }

    /// Parses a header from the first 24 bytes of `data`.
    ///
    /// # Errors
    ///
    /// Returns `EipError::TruncatedBuffer` if fewer than 24 bytes are
    /// available, or `EipError::InvalidResponse` for an unknown command.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < ENCAP_HEADER_SIZE {
            return Err(EipError::truncated(ENCAP_HEADER_SIZE, data.len()));
        }

        let command = EncapCommand::from_code(u16::from_le_bytes([data[0], data[1]]))?;
        let mut sender_context = [0u8; 8];
        sender_context.copy_from_slice(&data[12..20]);

        Ok(Self {
            command,
            length: u16::from_le_bytes([data[2], data[3]]),
            session_handle: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            status: u32::from_le_bytes([data[8], data[9], data[10], data[11]]),
            sender_context,
            options: u32::from_le_bytes([data[20], data[21], data[22], data[23]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        assert_eq!(EncapCommand::ListIdentity.code(), 0x0063);
        assert_eq!(EncapCommand::RegisterSession.code(), 0x0065);
        assert_eq!(EncapCommand::UnregisterSession.code(), 0x0066);
        assert_eq!(EncapCommand::SendRRData.code(), 0x006F);
    }

    #[test]
    fn test_command_from_code_unknown() {
        assert!(EncapCommand::from_code(0x0070).is_err());
    }

    #[test]
    fn test_header_layout() {
        let header = EncapHeader::new_request(
            EncapCommand::SendRRData,
            0x1234,
            0xDEADBEEF,
            [1, 2, 3, 4, 5, 6, 7, 8],
        );
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..2], &[0x6F, 0x00]);
        assert_eq!(&bytes[2..4], &[0x34, 0x12]);
        assert_eq!(&bytes[4..8], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&bytes[8..12], &[0x00; 4]);
        assert_eq!(&bytes[12..20], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[20..24], &[0x00; 4]);
    }

    #[test]
    fn test_header_roundtrip() {
        let original = EncapHeader {
            command: EncapCommand::RegisterSession,
            length: 65_535,
            session_handle: u32::MAX,
            status: 0x0064,
            sender_context: [0xFF; 8],
            options: 7,
        };
        let parsed = EncapHeader::from_bytes(&original.to_bytes()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_header_too_short() {
        assert!(matches!(
            EncapHeader::from_bytes(&[0x65, 0x00, 0x00]),
            Err(EipError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn test_header_parse_via_hex() {
        let bytes = hex::decode("650004000000000000000000000000000000000000000000").unwrap();
        let header = EncapHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.command, EncapCommand::RegisterSession);
        assert_eq!(header.length, 4);
        assert_eq!(header.session_handle, 0);
        assert_eq!(header.status, 0);
    }
}
