//! Fixed-width big-endian field encoders.
//!
//! Every numeric field in the index is big-endian, per the JP2 box grammar.
//! The plain `push_*` functions take already-typed values and cannot fail;
//! the `checked_*` variants narrow a `u64` and reject values that do not
//! fit their wire width with [`IndexError::FieldOverflow`]. All of them are
//! pure appends — no sink is touched here.

use crate::error::IndexError;

pub fn push_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

pub fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn push_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Narrow `value` to a 4-byte field.
pub fn checked_u32(field: &'static str, value: u64) -> Result<u32, IndexError> {
    u32::try_from(value).map_err(|_| IndexError::FieldOverflow {
        field,
        value,
        width: 4,
    })
}

// ── Fragment-array field width ──────────────────────────────────────────────

/// Field width selector for fragment-array (`faix`) entries.
///
/// Version 0 stores the entry count and every offset/length as `u32`,
/// version 1 as `u64`. One version is chosen per cidx write from the total
/// codestream length, so a short codestream gets the compact form and a
/// >4 GiB codestream escalates instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaixVersion {
    V0,
    V1,
}

impl FaixVersion {
    /// Pick the narrowest version able to represent offsets into a
    /// codestream of `len` bytes.
    pub fn for_codestream_len(len: u64) -> Self {
        if len > u32::MAX as u64 {
            FaixVersion::V1
        } else {
            FaixVersion::V0
        }
    }

    /// The version byte written at the start of the faix payload.
    pub fn marker(self) -> u8 {
        match self {
            FaixVersion::V0 => 0,
            FaixVersion::V1 => 1,
        }
    }

    /// Bytes per count/offset/length field.
    pub fn field_width(self) -> u8 {
        match self {
            FaixVersion::V0 => 4,
            FaixVersion::V1 => 8,
        }
    }

    /// Append `value` at this version's field width.
    ///
    /// Even under version 0 a corrupt offset can exceed 32 bits while the
    /// declared codestream length stays small, so the narrow path is checked.
    pub fn push_field(
        self,
        out: &mut Vec<u8>,
        field: &'static str,
        value: u64,
    ) -> Result<(), IndexError> {
        match self {
            FaixVersion::V0 => push_u32(out, checked_u32(field, value)?),
            FaixVersion::V1 => push_u64(out, value),
        }
        Ok(())
    }
}
