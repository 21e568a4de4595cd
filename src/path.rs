//! CIP path construction and parsing.
//!
//! A CIP path is an ordered sequence of segments identifying the target of a
//! request: either a symbolic tag name (one ANSI extended symbolic segment
//! per dot-separated component) or a logical class/instance reference.
//!
//! # Segment encodings
//!
//! - Symbolic, 8-bit length (default): `0x91, len:u8, ASCII...`
//! - Symbolic, 16-bit length (compatibility variant): `0x92, len:u16le, ASCII...`
//! - Logical class/instance: `0x20, class:u8, 0x24, instance:u8`
//!
//! The assembled path is padded with a single zero byte when its total length
//! is odd, because path sizes travel on the wire in 16-bit words.
//!
//! Some servers require requests to be explicitly addressed through the
//! Message Router object; for those, [`MESSAGE_ROUTER_PATH`] can be prepended
//! to a tag path. Whether a given device needs it is server-dependent, so it
//! stays an explicit option rather than a default.
//!
//! # Example
//!
//! ```
//! use eip_client::path::{build_symbolic_path, parse_path};
//!
//! let path = build_symbolic_path("Motor.Speed").unwrap();
//! assert_eq!(path.len() % 2, 0);
//!
//! let parsed = parse_path(&path).unwrap();
//! assert_eq!(parsed.tag_name().unwrap(), "Motor.Speed");
//! ```

use crate::error::{EipError, Result};

/// Segment type byte for an ANSI extended symbolic segment, 8-bit length.
pub const SEGMENT_SYMBOLIC: u8 = 0x91;
/// Segment type byte for the 16-bit-length symbolic variant.
pub const SEGMENT_SYMBOLIC_16: u8 = 0x92;
/// Segment type byte for an 8-bit logical class segment.
pub const SEGMENT_CLASS: u8 = 0x20;
/// Segment type byte for an 8-bit logical instance segment.
pub const SEGMENT_INSTANCE: u8 = 0x24;

/// Path addressing the Message Router object (class 0x02, instance 0).
pub const MESSAGE_ROUTER_PATH: [u8; 4] = [0x20, 0x02, 0x24, 0x00];

/// Identity object class.
pub const CLASS_IDENTITY: u8 = 0x01;
/// Symbol object class (tag browsing).
pub const CLASS_SYMBOL: u8 = 0x6B;

/// Maximum path length in 16-bit words (the size field is one byte).
pub const MAX_PATH_WORDS: usize = 255;

/// One parsed CIP path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A symbolic segment carrying one component of a tag name.
    Symbolic(String),
    /// A logical class reference.
    Class(u8),
    /// A logical instance reference.
    Instance(u8),
}

/// A parsed CIP path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// Segments in wire order.
    pub segments: Vec<PathSegment>,
}

impl ParsedPath {
    /// Recovers the dotted tag name from the symbolic segments, ignoring any
    /// logical routing prefix.
    ///
    /// Returns `None` if the path has no symbolic segments.
    pub fn tag_name(&self) -> Option<String> {
        let components: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| match s {
                PathSegment::Symbolic(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        if components.is_empty() {
            None
        } else {
            Some(components.join("."))
        }
    }

    /// Returns the logical class/instance pair if the path starts with one.
    pub fn object_target(&self) -> Option<(u8, u8)> {
        match (self.segments.first(), self.segments.get(1)) {
            (Some(PathSegment::Class(c)), Some(PathSegment::Instance(i))) => Some((*c, *i)),
            _ => None,
        }
    }
}

fn push_component(out: &mut Vec<u8>, component: &str, wide_length: bool) -> Result<()> {
    if component.is_empty() {
        return Err(EipError::invalid_path("empty path component"));
    }
    if !component.is_ascii() {
        return Err(EipError::invalid_path(format!(
            "non-ASCII path component: {:?}",
            component
        )));
    }
    if component.len() > 255 {
        return Err(EipError::invalid_path(format!(
            "path component exceeds 255 bytes: {:?}",
            component
        )));
    }

    if wide_length {
        out.push(SEGMENT_SYMBOLIC_16);
        out.extend_from_slice(&(component.len() as u16).to_le_bytes());
    } else {
        out.push(SEGMENT_SYMBOLIC);
        out.push(component.len() as u8);
    }
    out.extend_from_slice(component.as_bytes());
    Ok(())
}

fn finish_path(mut path: Vec<u8>) -> Result<Vec<u8>> {
    if path.len() % 2 != 0 {
        path.push(0x00);
    }
    if path.len() / 2 > MAX_PATH_WORDS {
        return Err(EipError::invalid_path(format!(
            "path size {} words exceeds the one-byte limit of {}",
            path.len() / 2,
            MAX_PATH_WORDS
        )));
    }
    Ok(path)
}

/// Builds a symbolic CIP path for a dotted tag name (8-bit length segments).
///
/// The name is split on `.`; each component becomes one symbolic segment.
/// The result is always word-aligned.
///
/// # Errors
///
/// Fails with `EipError::InvalidPath` for empty or non-ASCII components,
/// components over 255 bytes, or a total path over 255 words.
///
/// # Example
///
/// ```
/// use eip_client::path::build_symbolic_path;
///
/// let path = build_symbolic_path("Pump").unwrap();
/// assert_eq!(path, vec![0x91, 0x04, b'P', b'u', b'm', b'p']);
/// ```
pub fn build_symbolic_path(tag_name: &str) -> Result<Vec<u8>> {
    let mut path = Vec::with_capacity(tag_name.len() + 4);
    for component in tag_name.split('.') {
        push_component(&mut path, component, false)?;
    }
    finish_path(path)
}

/// Builds a symbolic CIP path using the 16-bit-length segment variant.
///
/// Compatibility knob for servers that expect the wider length field; the
/// component and size limits are the same as [`build_symbolic_path`].
pub fn build_symbolic_path_16(tag_name: &str) -> Result<Vec<u8>> {
    let mut path = Vec::with_capacity(tag_name.len() + 8);
    for component in tag_name.split('.') {
        push_component(&mut path, component, true)?;
    }
    finish_path(path)
}

/// Builds the fixed 4-byte logical path addressing `class`/`instance`.
///
/// # Example
///
/// ```
/// use eip_client::path::{build_object_path, CLASS_IDENTITY};
///
/// assert_eq!(build_object_path(CLASS_IDENTITY, 1), [0x20, 0x01, 0x24, 0x01]);
/// ```
pub fn build_object_path(class_id: u8, instance_id: u8) -> [u8; 4] {
    [SEGMENT_CLASS, class_id, SEGMENT_INSTANCE, instance_id]
}

/// Parses a CIP path back into its segments.
///
/// Walks segments by the top nibble of each segment-type byte: logical
/// segments (0x2_) and symbolic/data segments (0x9_) are decoded; a trailing
/// zero pad byte is tolerated. Anything else fails with
/// `EipError::InvalidPath` — network and other exotic segment formats are not
/// produced by this library and are not accepted.
pub fn parse_path(bytes: &[u8]) -> Result<ParsedPath> {
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let tag = bytes[pos];

        // a single zero byte at the end is word-alignment padding
        if tag == 0x00 && pos + 1 == bytes.len() {
            break;
        }

        match tag >> 4 {
            0x2 => {
                let value = *bytes
                    .get(pos + 1)
                    .ok_or_else(|| EipError::truncated(pos + 2, bytes.len()))?;
                match tag {
                    SEGMENT_CLASS => segments.push(PathSegment::Class(value)),
                    SEGMENT_INSTANCE => segments.push(PathSegment::Instance(value)),
                    _ => {
                        return Err(EipError::invalid_path(format!(
                            "unsupported logical segment type 0x{:02X}",
                            tag
                        )))
                    }
                }
                pos += 2;
            }
            0x9 => {
                let (len, header) = match tag {
                    SEGMENT_SYMBOLIC => {
                        let len = *bytes
                            .get(pos + 1)
                            .ok_or_else(|| EipError::truncated(pos + 2, bytes.len()))?;
                        (len as usize, 2)
                    }
                    SEGMENT_SYMBOLIC_16 => {
                        let raw = bytes
                            .get(pos + 1..pos + 3)
                            .ok_or_else(|| EipError::truncated(pos + 3, bytes.len()))?;
                        (u16::from_le_bytes([raw[0], raw[1]]) as usize, 3)
                    }
                    _ => {
                        return Err(EipError::invalid_path(format!(
                            "unsupported data segment type 0x{:02X}",
                            tag
                        )))
                    }
                };
                let name = bytes
                    .get(pos + header..pos + header + len)
                    .ok_or_else(|| EipError::truncated(pos + header + len, bytes.len()))?;
                segments.push(PathSegment::Symbolic(
                    String::from_utf8_lossy(name).into_owned(),
                ));
                pos += header + len;
            }
            nibble => {
                return Err(EipError::invalid_path(format!(
                    "unsupported segment format nibble 0x{:X} (type byte 0x{:02X})",
                    nibble, tag
                )))
            }
        }
    }

    Ok(ParsedPath { segments })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_component_even_length() {
        let path = build_symbolic_path("Pump").unwrap();
        assert_eq!(path, vec![0x91, 0x04, b'P', b'u', b'm', b'p']);
    }

    #[test]
    fn test_single_component_odd_length_padded() {
        let path = build_symbolic_path("Motor").unwrap();
        assert_eq!(
            path,
            vec![0x91, 0x05, b'M', b'o', b't', b'o', b'r', 0x00]
        );
        assert_eq!(path.len() % 2, 0);
    }

    #[test]
    fn test_dotted_name_one_segment_per_component() {
        let path = build_symbolic_path("Line.Cell.Count").unwrap();
        let parsed = parse_path(&path).unwrap();
        let symbolic: Vec<_> = parsed
            .segments
            .iter()
            .filter(|s| matches!(s, PathSegment::Symbolic(_)))
            .collect();
        assert_eq!(symbolic.len(), 3);
        assert_eq!(parsed.tag_name().unwrap(), "Line.Cell.Count");
    }

    #[test]
    fn test_path_always_word_aligned() {
        for name in ["A", "AB", "ABC", "A.B", "A.BC", "Tag_1.Member_22.X"] {
            let path = build_symbolic_path(name).unwrap();
            assert_eq!(path.len() % 2, 0, "odd path for {:?}", name);
            assert_eq!(parse_path(&path).unwrap().tag_name().unwrap(), name);
        }
    }

    #[test]
    fn test_wide_length_variant_roundtrip() {
        let path = build_symbolic_path_16("Conveyor.Speed").unwrap();
        assert_eq!(path[0], SEGMENT_SYMBOLIC_16);
        assert_eq!(path.len() % 2, 0);
        let parsed = parse_path(&path).unwrap();
        assert_eq!(parsed.tag_name().unwrap(), "Conveyor.Speed");
    }

    #[test]
    fn test_empty_component_rejected() {
        assert!(build_symbolic_path("").is_err());
        assert!(build_symbolic_path("A..B").is_err());
        assert!(build_symbolic_path(".A").is_err());
    }

    #[test]
    fn test_component_over_255_rejected() {
        let long = "x".repeat(256);
        assert!(build_symbolic_path(&long).is_err());
    }

    #[test]
    fn test_path_over_255_words_rejected() {
        // 4 components of 200 bytes each = 808 bytes > 510
        let name = vec!["y".repeat(200); 4].join(".");
        let err = build_symbolic_path(&name).unwrap_err();
        assert!(matches!(err, EipError::InvalidPath { .. }));
    }

    #[test]
    fn test_object_path() {
        assert_eq!(build_object_path(0x01, 0x01), [0x20, 0x01, 0x24, 0x01]);
        assert_eq!(MESSAGE_ROUTER_PATH, [0x20, 0x02, 0x24, 0x00]);
    }

    #[test]
    fn test_parse_object_path() {
        let parsed = parse_path(&build_object_path(CLASS_IDENTITY, 1)).unwrap();
        assert_eq!(parsed.object_target(), Some((0x01, 0x01)));
        assert_eq!(parsed.tag_name(), None);
    }

    #[test]
    fn test_parse_routed_tag_path() {
        let mut path = MESSAGE_ROUTER_PATH.to_vec();
        path.extend_from_slice(&build_symbolic_path("Counter").unwrap());
        let parsed = parse_path(&path).unwrap();
        assert_eq!(parsed.object_target(), Some((0x02, 0x00)));
        assert_eq!(parsed.tag_name().unwrap(), "Counter");
    }

    #[test]
    fn test_parse_rejects_unknown_segment_format() {
        // 0x4_ is a network-style nibble this library does not produce
        assert!(parse_path(&[0x42, 0x00]).is_err());
    }

    #[test]
    fn test_parse_truncated_symbolic() {
        assert!(matches!(
            parse_path(&[0x91, 0x05, b'a', b'b']),
            Err(EipError::TruncatedBuffer { .. })
        ));
    }
}
