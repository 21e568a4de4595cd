//! CIP scalar data types and their wire encoding.
//!
//! This module defines the [`CipDataType`] enum covering the ten elementary
//! CIP types the library supports, and [`CipValue`], the tagged union holding
//! a decoded value. All multi-byte values are little-endian on the wire.
//!
//! # Type codes and widths
//!
//! | Type | Code | Width | Rust value |
//! |------|------|-------|------------|
//! | BOOL | 0xC1 | 1 | `bool` |
//! | SINT | 0xC2 | 1 | `i8` |
//! | INT | 0xC3 | 2 | `i16` |
//! | DINT | 0xC4 | 4 | `i32` |
//! | USINT | 0xC6 | 1 | `u8` |
//! | UINT | 0xC7 | 2 | `u16` |
//! | UDINT | 0xC8 | 4 | `u32` |
//! | REAL | 0xCA | 4 | `f32` |
//! | LREAL | 0xCB | 8 | `f64` |
//! | STRING | 0xD0 | 1 + len | `String` (length-prefixed ASCII) |
//!
//! # Type inference
//!
//! Writes may omit the CIP type, in which case it is inferred from the native
//! value: `bool` maps to BOOL, integers to the smallest type that holds the
//! value (tie-break order SINT, USINT, INT, UINT, DINT, UDINT), `f32` to
//! REAL, `f64` to LREAL, strings to STRING.
//!
//! # Example
//!
//! ```
//! use eip_client::{CipDataType, CipValue};
//!
//! let value = CipValue::Dint(1234);
//! let bytes = value.encode().unwrap();
//! assert_eq!(bytes, vec![0xD2, 0x04, 0x00, 0x00]);
//!
//! let (decoded, used) = CipValue::decode(CipDataType::Dint, &bytes, 0).unwrap();
//! assert_eq!(decoded, value);
//! assert_eq!(used, 4);
//! ```

use crate::error::{EipError, Result};

/// Maximum byte length of a CIP STRING payload (one length byte).
pub const MAX_STRING_LEN: usize = 255;

/// Elementary CIP data types supported by this library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipDataType {
    /// Boolean, 1 byte (0x00 = false, nonzero = true).
    Bool,
    /// 8-bit signed integer.
    Sint,
    /// 16-bit signed integer.
    Int,
    /// 32-bit signed integer.
    Dint,
    /// 8-bit unsigned integer.
    Usint,
    /// 16-bit unsigned integer.
    Uint,
    /// 32-bit unsigned integer.
    Udint,
    /// 32-bit IEEE 754 float.
    Real,
    /// 64-bit IEEE 754 float.
    Lreal,
    /// Length-prefixed ASCII string (1-byte length).
    String,
}

impl CipDataType {
    /// Returns the one-byte CIP type code for this type.
    pub fn code(self) -> u8 {
        match self {
            CipDataType::Bool => 0xC1,
            CipDataType::Sint => 0xC2,
            CipDataType::Int => 0xC3,
            CipDataType::Dint => 0xC4,
            CipDataType::Usint => 0xC6,
            CipDataType::Uint => 0xC7,
            CipDataType::Udint => 0xC8,
            CipDataType::Real => 0xCA,
            CipDataType::Lreal => 0xCB,
            CipDataType::String => 0xD0,
        }
    }

    /// Resolves a one-byte CIP type code.
    ///
    /// # Errors
    ///
    /// Returns `EipError::UnsupportedType` for any code outside the supported
    /// set.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0xC1 => Ok(CipDataType::Bool),
            0xC2 => Ok(CipDataType::Sint),
            0xC3 => Ok(CipDataType::Int),
            0xC4 => Ok(CipDataType::Dint),
            0xC6 => Ok(CipDataType::Usint),
            0xC7 => Ok(CipDataType::Uint),
            0xC8 => Ok(CipDataType::Udint),
            0xCA => Ok(CipDataType::Real),
            0xCB => Ok(CipDataType::Lreal),
            0xD0 => Ok(CipDataType::String),
            _ => Err(EipError::UnsupportedType { code }),
        }
    }

    /// Returns the fixed encoded width in bytes, or `None` for STRING.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            CipDataType::Bool | CipDataType::Sint | CipDataType::Usint => Some(1),
            CipDataType::Int | CipDataType::Uint => Some(2),
            CipDataType::Dint | CipDataType::Udint | CipDataType::Real => Some(4),
            CipDataType::Lreal => Some(8),
            CipDataType::String => None,
        }
    }
}

impl std::fmt::Display for CipDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CipDataType::Bool => "BOOL",
            CipDataType::Sint => "SINT",
            CipDataType::Int => "INT",
            CipDataType::Dint => "DINT",
            CipDataType::Usint => "USINT",
            CipDataType::Uint => "UINT",
            CipDataType::Udint => "UDINT",
            CipDataType::Real => "REAL",
            CipDataType::Lreal => "LREAL",
            CipDataType::String => "STRING",
        };
        write!(f, "{}", name)
    }
}

/// A decoded CIP value.
///
/// Each variant carries the native Rust representation of one CIP scalar.
/// Values convert to and from wire bytes with [`CipValue::encode`] and
/// [`CipValue::decode`]; encoding never truncates — a value that does not fit
/// its type fails with `EipError::OutOfRange`.
#[derive(Debug, Clone, PartialEq)]
pub enum CipValue {
    /// BOOL value.
    Bool(bool),
    /// SINT value.
    Sint(i8),
    /// INT value.
    Int(i16),
    /// DINT value.
    Dint(i32),
    /// USINT value.
    Usint(u8),
    /// UINT value.
    Uint(u16),
    /// UDINT value.
    Udint(u32),
    /// REAL value.
    Real(f32),
    /// LREAL value.
    Lreal(f64),
    /// STRING value (ASCII, at most 255 bytes).
    String(String),
}

impl CipValue {
    /// Returns the CIP data type of this value.
    pub fn data_type(&self) -> CipDataType {
        match self {
            CipValue::Bool(_) => CipDataType::Bool,
            CipValue::Sint(_) => CipDataType::Sint,
            CipValue::Int(_) => CipDataType::Int,
            CipValue::Dint(_) => CipDataType::Dint,
            CipValue::Usint(_) => CipDataType::Usint,
            CipValue::Uint(_) => CipDataType::Uint,
            CipValue::Udint(_) => CipDataType::Udint,
            CipValue::Real(_) => CipDataType::Real,
            CipValue::Lreal(_) => CipDataType::Lreal,
            CipValue::String(_) => CipDataType::String,
        }
    }

    /// Encodes this value to its little-endian wire representation.
    ///
    /// # Errors
    ///
    /// Returns `EipError::OutOfRange` for a STRING longer than 255 bytes or
    /// one containing non-ASCII characters.
    ///
    /// # Example
    ///
    /// ```
    /// use eip_client::CipValue;
    ///
    /// assert_eq!(CipValue::Int(-2).encode().unwrap(), vec![0xFE, 0xFF]);
    /// assert_eq!(
    ///     CipValue::String("ok".into()).encode().unwrap(),
    ///     vec![0x02, b'o', b'k']
    /// );
    /// ```
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            CipValue::Bool(v) => Ok(vec![if *v { 0xFF } else { 0x00 }]),
            CipValue::Sint(v) => Ok(v.to_le_bytes().to_vec()),
            CipValue::Int(v) => Ok(v.to_le_bytes().to_vec()),
            CipValue::Dint(v) => Ok(v.to_le_bytes().to_vec()),
            CipValue::Usint(v) => Ok(v.to_le_bytes().to_vec()),
            CipValue::Uint(v) => Ok(v.to_le_bytes().to_vec()),
            CipValue::Udint(v) => Ok(v.to_le_bytes().to_vec()),
            CipValue::Real(v) => Ok(v.to_le_bytes().to_vec()),
            CipValue::Lreal(v) => Ok(v.to_le_bytes().to_vec()),
            CipValue::String(s) => {
                if s.len() > MAX_STRING_LEN || !s.is_ascii() {
                    return Err(EipError::out_of_range(
                        format!("{:?}", s),
                        CipDataType::String,
                    ));
                }
                let mut bytes = Vec::with_capacity(1 + s.len());
                bytes.push(s.len() as u8);
                bytes.extend_from_slice(s.as_bytes());
                Ok(bytes)
            }
        }
    }

    /// Decodes one value of type `ty` from `buf` starting at `offset`.
    ///
    /// Returns the value and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns `EipError::TruncatedBuffer` if the buffer does not hold the
    /// full encoded value (for STRING: the length byte plus that many bytes).
    pub fn decode(ty: CipDataType, buf: &[u8], offset: usize) -> Result<(CipValue, usize)> {
        let rest = buf.get(offset..).unwrap_or(&[]);

        let need = |n: usize| -> Result<&[u8]> {
            rest.get(..n)
                .ok_or_else(|| EipError::truncated(n, rest.len()))
        };

        match ty {
            CipDataType::Bool => {
                let b = need(1)?;
                Ok((CipValue::Bool(b[0] != 0), 1))
            }
            CipDataType::Sint => {
                let b = need(1)?;
                Ok((CipValue::Sint(b[0] as i8), 1))
            }
            CipDataType::Int => {
                let b = need(2)?;
                Ok((CipValue::Int(i16::from_le_bytes([b[0], b[1]])), 2))
            }
            CipDataType::Dint => {
                let b = need(4)?;
                Ok((
                    CipValue::Dint(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
                    4,
                ))
            }
            CipDataType::Usint => {
                let b = need(1)?;
                Ok((CipValue::Usint(b[0]), 1))
            }
            CipDataType::Uint => {
                let b = need(2)?;
                Ok((CipValue::Uint(u16::from_le_bytes([b[0], b[1]])), 2))
            }
            CipDataType::Udint => {
                let b = need(4)?;
                Ok((
                    CipValue::Udint(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
                    4,
                ))
            }
            CipDataType::Real => {
                let b = need(4)?;
                Ok((
                    CipValue::Real(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
                    4,
                ))
            }
            CipDataType::Lreal => {
                let b = need(8)?;
                Ok((
                    CipValue::Lreal(f64::from_le_bytes([
                        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                    ])),
                    8,
                ))
            }
            CipDataType::String => {
                let len_byte = need(1)?[0] as usize;
                let b = rest
                    .get(1..1 + len_byte)
                    .ok_or_else(|| EipError::truncated(1 + len_byte, rest.len()))?;
                let s = String::from_utf8_lossy(b).into_owned();
                Ok((CipValue::String(s), 1 + len_byte))
            }
        }
    }

    /// Infers the smallest CIP integer type that holds `value`.
    ///
    /// Candidates are tried in the order SINT, USINT, INT, UINT, DINT, UDINT.
    ///
    /// # Errors
    ///
    /// Returns `EipError::OutOfRange` for values outside the UDINT range.
    ///
    /// # Example
    ///
    /// ```
    /// use eip_client::{CipValue, CipDataType};
    ///
    /// assert_eq!(CipValue::infer_integer(42).unwrap().data_type(), CipDataType::Sint);
    /// assert_eq!(CipValue::infer_integer(200).unwrap().data_type(), CipDataType::Usint);
    /// assert_eq!(CipValue::infer_integer(-300).unwrap().data_type(), CipDataType::Int);
    /// assert_eq!(CipValue::infer_integer(40_000).unwrap().data_type(), CipDataType::Uint);
    /// assert_eq!(CipValue::infer_integer(100_000).unwrap().data_type(), CipDataType::Dint);
    /// assert_eq!(CipValue::infer_integer(3_000_000_000).unwrap().data_type(), CipDataType::Udint);
    /// ```
    pub fn infer_integer(value: i64) -> Result<CipValue> {
        if let Ok(v) = i8::try_from(value) {
            Ok(CipValue::Sint(v))
        } else if let Ok(v) = u8::try_from(value) {
            Ok(CipValue::Usint(v))
        } else if let Ok(v) = i16::try_from(value) {
            Ok(CipValue::Int(v))
        } else if let Ok(v) = u16::try_from(value) {
            Ok(CipValue::Uint(v))
        } else if let Ok(v) = i32::try_from(value) {
            Ok(CipValue::Dint(v))
        } else if let Ok(v) = u32::try_from(value) {
            Ok(CipValue::Udint(v))
        } else {
            Err(EipError::out_of_range(value, CipDataType::Udint))
        }
    }

    /// Coerces this value to `target`, for writes against a tag whose CIP
    /// type is already known.
    ///
    /// Integers convert between the integer types with a range check and
    /// widen losslessly into REAL/LREAL; REAL and LREAL convert into each
    /// other; an integer 0 or 1 converts to BOOL. Anything else is rejected
    /// rather than silently truncated.
    ///
    /// # Errors
    ///
    /// Returns `EipError::OutOfRange` for a value that does not fit `target`,
    /// or `EipError::InvalidRequest` for a conversion between unrelated types
    /// (e.g. STRING to DINT).
    ///
    /// # Example
    ///
    /// ```
    /// use eip_client::{CipDataType, CipValue};
    ///
    /// let v = CipValue::Sint(42).coerce(CipDataType::Dint).unwrap();
    /// assert_eq!(v, CipValue::Dint(42));
    /// assert!(CipValue::Int(300).coerce(CipDataType::Usint).is_err());
    /// ```
    pub fn coerce(&self, target: CipDataType) -> Result<CipValue> {
        if self.data_type() == target {
            return Ok(self.clone());
        }

        let reject = || {
            Err(EipError::invalid_request(format!(
                "cannot coerce {} to {}",
                self.data_type(),
                target
            )))
        };

        if let Some(i) = self.as_integer() {
            return match target {
                CipDataType::Bool => match i {
                    0 => Ok(CipValue::Bool(false)),
                    1 => Ok(CipValue::Bool(true)),
                    _ => Err(EipError::out_of_range(i, target)),
                },
                CipDataType::Sint => i8::try_from(i)
                    .map(CipValue::Sint)
                    .map_err(|_| EipError::out_of_range(i, target)),
                CipDataType::Int => i16::try_from(i)
                    .map(CipValue::Int)
                    .map_err(|_| EipError::out_of_range(i, target)),
                CipDataType::Dint => i32::try_from(i)
                    .map(CipValue::Dint)
                    .map_err(|_| EipError::out_of_range(i, target)),
                CipDataType::Usint => u8::try_from(i)
                    .map(CipValue::Usint)
                    .map_err(|_| EipError::out_of_range(i, target)),
                CipDataType::Uint => u16::try_from(i)
                    .map(CipValue::Uint)
                    .map_err(|_| EipError::out_of_range(i, target)),
                CipDataType::Udint => u32::try_from(i)
                    .map(CipValue::Udint)
                    .map_err(|_| EipError::out_of_range(i, target)),
                CipDataType::Real => Ok(CipValue::Real(i as f32)),
                CipDataType::Lreal => Ok(CipValue::Lreal(i as f64)),
                CipDataType::String => reject(),
            };
        }

        if let Some(f) = self.as_float() {
            return match target {
                CipDataType::Real => Ok(CipValue::Real(f as f32)),
                CipDataType::Lreal => Ok(CipValue::Lreal(f)),
                _ => reject(),
            };
        }

        reject()
    }

    /// Returns the value as `bool` if it is a BOOL.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CipValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value widened to `i64` if it is any integer type.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CipValue::Sint(v) => Some(*v as i64),
            CipValue::Int(v) => Some(*v as i64),
            CipValue::Dint(v) => Some(*v as i64),
            CipValue::Usint(v) => Some(*v as i64),
            CipValue::Uint(v) => Some(*v as i64),
            CipValue::Udint(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Returns the value widened to `f64` if it is REAL or LREAL.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CipValue::Real(v) => Some(*v as f64),
            CipValue::Lreal(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `&str` if it is a STRING.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CipValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for CipValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CipValue::Bool(v) => write!(f, "{}", v),
            CipValue::Sint(v) => write!(f, "{}", v),
            CipValue::Int(v) => write!(f, "{}", v),
            CipValue::Dint(v) => write!(f, "{}", v),
            CipValue::Usint(v) => write!(f, "{}", v),
            CipValue::Uint(v) => write!(f, "{}", v),
            CipValue::Udint(v) => write!(f, "{}", v),
            CipValue::Real(v) => write!(f, "{}", v),
            CipValue::Lreal(v) => write!(f, "{}", v),
            CipValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for CipValue {
    fn from(v: bool) -> Self {
        CipValue::Bool(v)
    }
}

impl From<i32> for CipValue {
    /// Infers the smallest integer type; `i32` input always fits by DINT.
    fn from(v: i32) -> Self {
        // infallible: every i32 fits within the SINT..DINT chain
        CipValue::infer_integer(v as i64).expect("i32 always fits an inferred integer type")
    }
}

impl TryFrom<i64> for CipValue {
    type Error = EipError;

    fn try_from(v: i64) -> Result<Self> {
        CipValue::infer_integer(v)
    }
}

impl From<f32> for CipValue {
    fn from(v: f32) -> Self {
        CipValue::Real(v)
    }
}

impl From<f64> for CipValue {
    fn from(v: f64) -> Self {
        CipValue::Lreal(v)
    }
}

impl From<&str> for CipValue {
    fn from(v: &str) -> Self {
        CipValue::String(v.to_string())
    }
}

impl From<String> for CipValue {
    fn from(v: String) -> Self {
        CipValue::String(v)
    }
}
