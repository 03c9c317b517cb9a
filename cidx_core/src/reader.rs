//! Conforming box reader.
//!
//! Parses the byte sequence emitted by the writer back into a box tree,
//! plus payload decoders for the two leaf layouts (`mhix`, `faix`). This
//! exists for the CLI's `inspect` command and for the test suite's
//! re-parse properties; it is not a general JP2 file parser.

use thiserror::Error;

use crate::boxes::{BoxType, BOX_CIDX, BOX_PPIX, BOX_TPIX, EXTENDED_HEADER_LEN, HEADER_LEN};
use crate::codestream::ByteSpan;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("truncated box header at offset {offset}")]
    TruncatedHeader { offset: u64 },

    #[error("box `{tag}` at offset {offset} declares {declared} bytes but only {available} remain")]
    TruncatedPayload {
        tag: String,
        offset: u64,
        declared: u64,
        available: u64,
    },

    #[error("box at offset {offset} declares length {declared}, smaller than its own header")]
    BadLength { offset: u64, declared: u64 },

    #[error("unsupported fragment array version {version}")]
    BadFaixVersion { version: u8 },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// One parsed box. `payload` borrows from the input buffer.
#[derive(Debug)]
pub struct ParsedBox<'a> {
    pub tag: BoxType,
    /// Offset of the box start relative to the parsed buffer.
    pub offset: u64,
    /// Total serialized size, header included.
    pub total_len: u64,
    pub payload: &'a [u8],
    /// Populated for superboxes only.
    pub children: Vec<ParsedBox<'a>>,
}

impl ParsedBox<'_> {
    /// Type tag rendered for display, non-printable bytes escaped.
    pub fn tag_str(&self) -> String {
        self.tag
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    (b as char).to_string()
                } else {
                    format!("\\x{b:02x}")
                }
            })
            .collect()
    }
}

fn is_superbox(tag: BoxType) -> bool {
    matches!(tag, BOX_CIDX | BOX_TPIX | BOX_PPIX)
}

/// Parse a sequence of sibling boxes spanning exactly `buf`.
pub fn parse_boxes(buf: &[u8]) -> Result<Vec<ParsedBox<'_>>, ParseError> {
    parse_span(buf, 0)
}

/// Parse the first box in `buf`, ignoring any trailing bytes. Useful when
/// the index sits inside a larger container slice.
pub fn parse_first(buf: &[u8]) -> Result<ParsedBox<'_>, ParseError> {
    let (parsed, _consumed) = parse_single(buf, 0, 0)?;
    Ok(parsed)
}

fn parse_span(buf: &[u8], base: u64) -> Result<Vec<ParsedBox<'_>>, ParseError> {
    let mut boxes = Vec::new();
    let mut pos = 0usize;
    while pos < buf.len() {
        let (parsed, consumed) = parse_single(buf, pos, base)?;
        boxes.push(parsed);
        pos += consumed;
    }
    Ok(boxes)
}

fn parse_single(buf: &[u8], pos: usize, base: u64) -> Result<(ParsedBox<'_>, usize), ParseError> {
    let abs = base + pos as u64;
    let remaining = &buf[pos..];
    if remaining.len() < HEADER_LEN as usize {
        return Err(ParseError::TruncatedHeader { offset: abs });
    }

    let lbox = u32::from_be_bytes(remaining[0..4].try_into().unwrap());
    let tag: BoxType = remaining[4..8].try_into().unwrap();

    let (total, header_len) = if lbox == 1 {
        if remaining.len() < EXTENDED_HEADER_LEN as usize {
            return Err(ParseError::TruncatedHeader { offset: abs });
        }
        let xlbox = u64::from_be_bytes(remaining[8..16].try_into().unwrap());
        (xlbox, EXTENDED_HEADER_LEN)
    } else {
        (lbox as u64, HEADER_LEN)
    };

    if total < header_len {
        return Err(ParseError::BadLength {
            offset: abs,
            declared: total,
        });
    }
    if total > remaining.len() as u64 {
        return Err(ParseError::TruncatedPayload {
            tag: String::from_utf8_lossy(&tag).into_owned(),
            offset: abs,
            declared: total,
            available: remaining.len() as u64,
        });
    }

    let payload = &remaining[header_len as usize..total as usize];
    let children = if is_superbox(tag) {
        parse_span(payload, abs + header_len)?
    } else {
        Vec::new()
    };

    Ok((
        ParsedBox {
            tag,
            offset: abs,
            total_len: total,
            payload,
            children,
        },
        total as usize,
    ))
}

// ── Payload decoders ───────────────────────────────────────────────────────

/// Decoded fragment array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentArray {
    pub version: u8,
    pub entries: Vec<ByteSpan>,
}

/// Decode a `faix` payload: version byte, count, then offset/length pairs
/// at the version's field width.
pub fn decode_faix(payload: &[u8]) -> Result<FragmentArray, ParseError> {
    let (&version, mut rest) = payload
        .split_first()
        .ok_or_else(|| ParseError::Malformed("empty faix payload".into()))?;
    let width = match version {
        0 => 4usize,
        1 => 8usize,
        v => return Err(ParseError::BadFaixVersion { version: v }),
    };

    let count = take_field(&mut rest, width)?;
    // Never size an allocation from the declared count alone: the payload
    // must actually hold that many entries.
    let need = count as u128 * 2 * width as u128;
    if (rest.len() as u128) < need {
        return Err(ParseError::Malformed(format!(
            "faix declares {count} entries but payload holds {} byte(s)",
            rest.len()
        )));
    }
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = take_field(&mut rest, width)?;
        let len = take_field(&mut rest, width)?;
        entries.push(ByteSpan::new(offset, len));
    }
    if !rest.is_empty() {
        return Err(ParseError::Malformed(format!(
            "faix payload has {} trailing byte(s)",
            rest.len()
        )));
    }
    Ok(FragmentArray { version, entries })
}

/// Decode a `mhix` payload into the main header span.
pub fn decode_mhix(payload: &[u8]) -> Result<ByteSpan, ParseError> {
    if payload.len() != 16 {
        return Err(ParseError::Malformed(format!(
            "mhix payload is {} bytes, expected 16",
            payload.len()
        )));
    }
    let offset = u64::from_be_bytes(payload[0..8].try_into().unwrap());
    let len = u64::from_be_bytes(payload[8..16].try_into().unwrap());
    Ok(ByteSpan::new(offset, len))
}

fn take_field(rest: &mut &[u8], width: usize) -> Result<u64, ParseError> {
    if rest.len() < width {
        return Err(ParseError::Malformed(format!(
            "field needs {width} bytes, {} remain",
            rest.len()
        )));
    }
    let (head, tail) = rest.split_at(width);
    *rest = tail;
    Ok(match width {
        4 => u32::from_be_bytes(head.try_into().unwrap()) as u64,
        _ => u64::from_be_bytes(head.try_into().unwrap()),
    })
}
