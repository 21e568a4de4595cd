//! Response parsing and validation.
//!
//! Parsing happens in layers, failing at the outermost layer first:
//!
//! 1. the encapsulation header (command and 32-bit status — nonzero becomes
//!    [`EipError::ProtocolStatus`]),
//! 2. the SendRRData envelope (interface handle, CIP length, and the one-byte
//!    CIP status — nonzero becomes [`EipError::CipStatus`]),
//! 3. the service payload ([`ReadTagResponse`] for Read Tag,
//!    [`DeviceIdentity`] for ListIdentity / Get_Attributes_All).
//!
//! Write Tag replies carry no data beyond the CIP status, so layer 2 is the
//! whole parse for them.

use crate::error::{EipError, Result};
use crate::types::{CipDataType, CipValue};

/// A parsed SendRRData response payload.
#[derive(Debug, Clone)]
pub struct SendRRDataResponse {
    /// The raw 4-byte interface-handle field, kept for diagnostics.
    pub interface_handle: [u8; 4],
    /// CIP general status (0 = success).
    pub cip_status: u8,
    /// Service-specific reply data following the status byte.
    pub data: Vec<u8>,
}

impl SendRRDataResponse {
    /// Parses the payload that follows a SendRRData encapsulation header.
    ///
    /// Layout: `[interface_handle:4][cip_len:u16][cip_status:u8][data...]`.
    ///
    /// # Errors
    ///
    /// Returns `TruncatedBuffer` if the payload is shorter than its framing,
    /// or `InvalidResponse` if the declared CIP length disagrees with the
    /// bytes present.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < 7 {
            return Err(EipError::truncated(7, payload.len()));
        }

        let mut interface_handle = [0u8; 4];
        interface_handle.copy_from_slice(&payload[0..4]);

        let cip_len = u16::from_le_bytes([payload[4], payload[5]]) as usize;
        let cip = &payload[6..];
        if cip.len() < cip_len || cip_len == 0 {
            return Err(EipError::invalid_response(format!(
                "declared CIP length {} but {} bytes present",
                cip_len,
                cip.len()
            )));
        }

        Ok(Self {
            interface_handle,
            cip_status: cip[0],
            data: cip[1..cip_len].to_vec(),
        })
    }

    /// Returns the reply data, or a `CipStatus` error if the status byte is
    /// nonzero. The partial payload stays available on `self` for callers
    /// that want diagnostics.
    pub fn check_status(&self) -> Result<&[u8]> {
        if self.cip_status == 0 {
            Ok(&self.data)
        } else {
            Err(EipError::cip_status(self.cip_status))
        }
    }
}

/// A parsed Read Tag reply.
///
/// Reply data layout: `[data_type:u8][element_count:u16][raw values]`.
#[derive(Debug, Clone)]
pub struct ReadTagResponse {
    /// The CIP type of every element.
    pub data_type: CipDataType,
    /// Number of elements returned.
    pub element_count: u16,
    /// Raw little-endian value bytes.
    pub raw: Vec<u8>,
}

impl ReadTagResponse {
    /// Parses Read Tag reply data.
    pub fn from_data(data: &[u8]) -> Result<Self> {
        if data.len() < 3 {
            return Err(EipError::truncated(3, data.len()));
        }
        Ok(Self {
            data_type: CipDataType::from_code(data[0])?,
            element_count: u16::from_le_bytes([data[1], data[2]]),
            raw: data[3..].to_vec(),
        })
    }

    /// Decodes the reply as a single scalar value.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidResponse` if the reply holds more than one element.
    pub fn decode_scalar(&self) -> Result<CipValue> {
        if self.element_count != 1 {
            return Err(EipError::invalid_response(format!(
                "expected 1 element, reply holds {}",
                self.element_count
            )));
        }
        let (value, _) = CipValue::decode(self.data_type, &self.raw, 0)?;
        Ok(value)
    }

    /// Decodes the reply as an array of uniform fixed-width elements.
    ///
    /// Element offsets are `index * (total / count)`, which only holds for
    /// fixed-width types; STRING arrays are rejected.
    pub fn decode_elements(&self) -> Result<Vec<CipValue>> {
        if self.data_type == CipDataType::String && self.element_count > 1 {
            return Err(EipError::invalid_response(
                "STRING arrays have variable-width elements and cannot be decoded",
            ));
        }
        let count = self.element_count as usize;
        if count == 0 {
            return Ok(Vec::new());
        }
        if self.raw.len() % count != 0 {
            return Err(EipError::invalid_response(format!(
                "{} raw bytes do not divide into {} elements",
                self.raw.len(),
                count
            )));
        }

        let stride = self.raw.len() / count;
        let mut values = Vec::with_capacity(count);
        for index in 0..count {
            let (value, used) = CipValue::decode(self.data_type, &self.raw, index * stride)?;
            if used != stride {
                return Err(EipError::invalid_response(format!(
                    "element width {} disagrees with stride {}",
                    used, stride
                )));
            }
            values.push(value);
        }
        Ok(values)
    }
}

/// Device identity fields carried in ListIdentity replies and in
/// Get_Attributes_All replies from the Identity object.
///
/// Wire layout (little-endian):
/// `[protocol_version:u16][vendor_id:u16][device_type:u16][product_code:u16]
/// [revision_major:u8][revision_minor:u8][status:u16][serial_number:u32]
/// [product_name_len:u8][product_name][state:u8]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Encapsulation protocol version (1).
    pub protocol_version: u16,
    /// ODVA vendor identifier.
    pub vendor_id: u16,
    /// Device type code.
    pub device_type: u16,
    /// Vendor-assigned product code.
    pub product_code: u16,
    /// Major firmware revision.
    pub revision_major: u8,
    /// Minor firmware revision.
    pub revision_minor: u8,
    /// Device status word.
    pub status: u16,
    /// Device serial number.
    pub serial_number: u32,
    /// Human-readable product name (ASCII, at most 255 bytes).
    pub product_name: String,
    /// Device state byte.
    pub state: u8,
}

impl DeviceIdentity {
    /// Serializes the identity block.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidRequest` if the product name exceeds 255 bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.product_name.len() > 255 {
            return Err(EipError::invalid_request(
                "product name exceeds 255 bytes",
            ));
        }
        let mut bytes = Vec::with_capacity(16 + self.product_name.len());
        bytes.extend_from_slice(&self.protocol_version.to_le_bytes());
        bytes.extend_from_slice(&self.vendor_id.to_le_bytes());
        bytes.extend_from_slice(&self.device_type.to_le_bytes());
        bytes.extend_from_slice(&self.product_code.to_le_bytes());
        bytes.push(self.revision_major);
        bytes.push(self.revision_minor);
        bytes.extend_from_slice(&self.status.to_le_bytes());
        bytes.extend_from_slice(&self.serial_number.to_le_bytes());
        bytes.push(self.product_name.len() as u8);
        bytes.extend_from_slice(self.product_name.as_bytes());
        bytes.push(self.state);
        Ok(bytes)
    }

    /// Parses an identity block.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 18 {
            return Err(EipError::truncated(18, data.len()));
        }
        let name_len = data[16] as usize;
        let name = data
            .get(17..17 + name_len)
            .ok_or_else(|| EipError::truncated(17 + name_len + 1, data.len()))?;
        let state = *data
            .get(17 + name_len)
            .ok_or_else(|| EipError::truncated(17 + name_len + 1, data.len()))?;

        Ok(Self {
            protocol_version: u16::from_le_bytes([data[0], data[1]]),
            vendor_id: u16::from_le_bytes([data[2], data[3]]),
            device_type: u16::from_le_bytes([data[4], data[5]]),
            product_code: u16::from_le_bytes([data[6], data[7]]),
            revision_major: data[8],
            revision_minor: data[9],
            status: u16::from_le_bytes([data[10], data[11]]),
            serial_number: u32::from_le_bytes([data[12], data[13], data[14], data[15]]),
            product_name: String::from_utf8_lossy(name).into_owned(),
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rr_payload(cip_status: u8, data: &[u8]) -> Vec<u8> {
        let mut payload = vec![0x00, 0x00, 0x05, 0x00]; // interface handle
        payload.extend_from_slice(&((1 + data.len()) as u16).to_le_bytes());
        payload.push(cip_status);
        payload.extend_from_slice(data);
        payload
    }

    #[test]
    fn test_send_rr_data_success() {
        let payload = make_rr_payload(0x00, &[0xC4, 0x01, 0x00, 0x2A, 0x00, 0x00, 0x00]);
        let response = SendRRDataResponse::from_payload(&payload).unwrap();
        assert_eq!(response.cip_status, 0);
        assert_eq!(response.check_status().unwrap().len(), 7);
    }

    #[test]
    fn test_send_rr_data_cip_error() {
        let payload = make_rr_payload(0x05, &[]);
        let response = SendRRDataResponse::from_payload(&payload).unwrap();
        match response.check_status() {
            Err(EipError::CipStatus { code: 0x05 }) => {}
            other => panic!("expected CipStatus 0x05, got {:?}", other),
        }
    }

    #[test]
    fn test_send_rr_data_too_short() {
        assert!(matches!(
            SendRRDataResponse::from_payload(&[0x00; 5]),
            Err(EipError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn test_send_rr_data_length_mismatch() {
        let mut payload = make_rr_payload(0x00, &[0x01, 0x02]);
        // claim more CIP bytes than are present
        payload[4] = 0x40;
        assert!(matches!(
            SendRRDataResponse::from_payload(&payload),
            Err(EipError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_read_tag_scalar() {
        // DINT, 1 element, value 42
        let data = [0xC4, 0x01, 0x00, 0x2A, 0x00, 0x00, 0x00];
        let response = ReadTagResponse::from_data(&data).unwrap();
        assert_eq!(response.data_type, CipDataType::Dint);
        assert_eq!(response.decode_scalar().unwrap(), CipValue::Dint(42));
    }

    #[test]
    fn test_read_tag_array() {
        let mut data = vec![0xC3, 0x03, 0x00];
        for v in [10i16, 20, 30] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let response = ReadTagResponse::from_data(&data).unwrap();
        let values = response.decode_elements().unwrap();
        assert_eq!(
            values,
            vec![CipValue::Int(10), CipValue::Int(20), CipValue::Int(30)]
        );
    }

    #[test]
    fn test_read_tag_scalar_rejects_array() {
        let data = [0xC2, 0x02, 0x00, 0x01, 0x02];
        let response = ReadTagResponse::from_data(&data).unwrap();
        assert!(response.decode_scalar().is_err());
        assert!(response.decode_elements().is_ok());
    }

    #[test]
    fn test_read_tag_string_array_rejected() {
        let data = [0xD0, 0x02, 0x00, 0x01, b'a', 0x01, b'b'];
        let response = ReadTagResponse::from_data(&data).unwrap();
        assert!(response.decode_elements().is_err());
    }

    #[test]
    fn test_read_tag_ragged_raw_rejected() {
        // 3 elements but 7 raw bytes
        let data = [0xC3, 0x03, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let response = ReadTagResponse::from_data(&data).unwrap();
        assert!(response.decode_elements().is_err());
    }

    #[test]
    fn test_read_tag_unknown_type() {
        assert!(matches!(
            ReadTagResponse::from_data(&[0x42, 0x01, 0x00]),
            Err(EipError::UnsupportedType { code: 0x42 })
        ));
    }

    fn sample_identity() -> DeviceIdentity {
        DeviceIdentity {
            protocol_version: 1,
            vendor_id: 0x1337,
            device_type: 0x000C,
            product_code: 0x0065,
            revision_major: 2,
            revision_minor: 11,
            status: 0x0030,
            serial_number: 0x00C0FFEE,
            product_name: "eip-client simulator".to_string(),
            state: 3,
        }
    }

    #[test]
    fn test_identity_roundtrip() {
        let identity = sample_identity();
        let bytes = identity.to_bytes().unwrap();
        assert_eq!(DeviceIdentity::from_bytes(&bytes).unwrap(), identity);
    }

    #[test]
    fn test_identity_truncated_name() {
        let identity = sample_identity();
        let bytes = identity.to_bytes().unwrap();
        assert!(matches!(
            DeviceIdentity::from_bytes(&bytes[..bytes.len() - 4]),
            Err(EipError::TruncatedBuffer { .. })
        ));
    }
}
