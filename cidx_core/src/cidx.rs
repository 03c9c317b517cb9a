//! Top-level codestream index assembly.
//!
//! # Emitted layout
//! ```text
//! [cidx superbox]
//!   [mhix]  main header offset + length            ← always
//!   [tpix]  one faix per tile (tile-part spans)    ← always
//!   [ppix]  one faix per tile (packet spans)       ← only when every tile
//!                                                    carries packet metadata
//! ```
//! Children appear in exactly this order. Optional sections are omitted
//! entirely, never emitted empty.

use std::io::Write;

use log::debug;

use crate::boxes::{write_box, BOX_CIDX};
use crate::codestream::{CodestreamInfo, ImageDescriptor};
use crate::error::IndexError;
use crate::fields::FaixVersion;
use crate::sections::{build_mhix, build_ppix, build_tpix};

/// Build the `cidx` superbox describing `info` and write it to `sink`.
///
/// `offset` is where the codestream begins inside the enclosing container;
/// it is reported in diagnostics only, never used to seek. `codestream_len`
/// selects the fragment-array field width (64-bit fields past 4 GiB).
///
/// Returns the total bytes written, including the cidx header, so the
/// caller can place the next sibling box in its container. On error nothing
/// reaches the sink: all children are materialized and measured first.
pub fn write_codestream_index<W: Write>(
    offset: u64,
    sink: &mut W,
    image: &ImageDescriptor,
    info: &CodestreamInfo,
    codestream_len: u64,
) -> Result<u64, IndexError> {
    validate(image, info)?;

    let version = FaixVersion::for_codestream_len(codestream_len);
    debug!(
        "indexing codestream at container offset {offset}: {}x{} tile grid, \
         {} layer(s), {} progression, {}-byte fragment fields",
        info.tiles_wide,
        info.tiles_high,
        info.layers,
        info.progression.name(),
        version.field_width(),
    );

    let mut children = build_mhix(info)?;
    children.extend_from_slice(&build_tpix(info, version)?);
    if info.has_packet_index() {
        children.extend_from_slice(&build_ppix(info, version)?);
    } else {
        debug!("no packet metadata collected; omitting ppix");
    }

    let total = write_box(sink, BOX_CIDX, &children)?;
    debug!("cidx complete: {total} bytes");
    Ok(total)
}

/// Shape checks on the borrowed metadata. Everything caught here is a
/// precondition violation in the caller's input, so it maps to
/// [`IndexError::IncompleteMetadata`].
fn validate(image: &ImageDescriptor, info: &CodestreamInfo) -> Result<(), IndexError> {
    let bad = |detail: String| IndexError::IncompleteMetadata {
        section: "cidx",
        detail,
    };

    if image.width == 0 || image.height == 0 {
        return Err(bad(format!(
            "image has a zero dimension ({}x{})",
            image.width, image.height
        )));
    }
    if image.components == 0 {
        return Err(bad("image declares zero components".into()));
    }
    // Part 1 allows component depths of 1 to 38 bits.
    if !(1..=38).contains(&image.bit_depth) {
        return Err(bad(format!(
            "bit depth {} outside the representable 1..=38 range",
            image.bit_depth
        )));
    }

    if info.tiles.is_empty() {
        return Err(bad("no tiles recorded".into()));
    }
    if info.tiles.len() != info.tile_count() {
        return Err(bad(format!(
            "tile grid {}x{} declares {} tiles but {} were recorded",
            info.tiles_wide,
            info.tiles_high,
            info.tile_count(),
            info.tiles.len()
        )));
    }
    if info.layers == 0 {
        return Err(bad("codestream declares zero quality layers".into()));
    }

    // Packet metadata must be all-or-nothing across tiles: a partial
    // collection means the encoder's bookkeeping broke somewhere.
    let with_packets = info.tiles.iter().filter(|t| t.packets.is_some()).count();
    if with_packets != 0 && with_packets != info.tiles.len() {
        return Err(bad(format!(
            "packet metadata present for only {with_packets} of {} tiles",
            info.tiles.len()
        )));
    }

    Ok(())
}
