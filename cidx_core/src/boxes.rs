//! Length-prefixed box emission.
//!
//! A box is `LBox:u32` + `TBox:[u8;4]` + payload, with `LBox` counting the
//! header itself. When the total would not fit in 32 bits the header
//! escalates to the extended form: `LBox == 1`, `TBox`, then `XLBox:u64`
//! carrying the real total. A superbox's payload is the concatenation of
//! its children's fully serialized bytes.
//!
//! Box lengths are rarely known before the content exists, so everything
//! here follows a two-pass discipline: the payload is materialized in full
//! first, measured, and only then does a header get produced. No seeking,
//! no length patching, and a failed box never leaves partial bytes behind.

use std::io::Write;

use crate::error::IndexError;
use crate::fields::{push_u32, push_u64};

/// Four-character box type code.
pub type BoxType = [u8; 4];

pub const BOX_CIDX: BoxType = *b"cidx";
pub const BOX_MHIX: BoxType = *b"mhix";
pub const BOX_TPIX: BoxType = *b"tpix";
pub const BOX_PPIX: BoxType = *b"ppix";
pub const BOX_FAIX: BoxType = *b"faix";

/// Size of the short box header (LBox + TBox).
pub const HEADER_LEN: u64 = 8;

/// Size of the extended header (LBox + TBox + XLBox).
pub const EXTENDED_HEADER_LEN: u64 = 16;

/// Serialize the header for a box whose payload is `payload_len` bytes.
///
/// Returns the header bytes and the total box length they declare.
/// Escalates to the extended form when the short total would not fit
/// `LBox`; fails with [`IndexError::EncodingOverflow`] when even the
/// extended total is unrepresentable.
pub fn header_bytes(tag: BoxType, payload_len: u64) -> Result<(Vec<u8>, u64), IndexError> {
    if let Some(total) = payload_len.checked_add(HEADER_LEN) {
        if total <= u32::MAX as u64 {
            let mut header = Vec::with_capacity(HEADER_LEN as usize);
            push_u32(&mut header, total as u32);
            header.extend_from_slice(&tag);
            return Ok((header, total));
        }
    }

    let total = payload_len
        .checked_add(EXTENDED_HEADER_LEN)
        .ok_or(IndexError::EncodingOverflow { payload_len })?;
    let mut header = Vec::with_capacity(EXTENDED_HEADER_LEN as usize);
    push_u32(&mut header, 1);
    header.extend_from_slice(&tag);
    push_u64(&mut header, total);
    Ok((header, total))
}

/// Append one complete box (header + payload) to `out`.
///
/// Returns the total bytes appended.
pub fn push_box(out: &mut Vec<u8>, tag: BoxType, payload: &[u8]) -> Result<u64, IndexError> {
    let (header, total) = header_bytes(tag, payload.len() as u64)?;
    out.reserve(header.len() + payload.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(payload);
    Ok(total)
}

/// Write one complete box to `sink` as a single contiguous write.
///
/// The header is only produced once the payload is fully materialized, so
/// every failure mode except the sink's own is caught before any byte
/// reaches the sink.
pub fn write_box<W: Write>(sink: &mut W, tag: BoxType, payload: &[u8]) -> Result<u64, IndexError> {
    let mut buf = Vec::new();
    let total = push_box(&mut buf, tag, payload)?;
    sink.write_all(&buf)?;
    Ok(total)
}
