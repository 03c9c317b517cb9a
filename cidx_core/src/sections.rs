//! One builder per cidx child box.
//!
//! Builders are pure: each consumes a slice of codestream metadata and
//! returns one fully serialized box, header included. Nothing here touches
//! the sink — the assembler concatenates these buffers into the superbox
//! payload and hands the result to the box writer in one go.

use log::trace;

use crate::boxes::{push_box, BoxType, BOX_FAIX, BOX_MHIX, BOX_PPIX, BOX_TPIX};
use crate::codestream::{ByteSpan, CodestreamInfo};
use crate::error::IndexError;
use crate::fields::{push_u64, push_u8, FaixVersion};

fn incomplete(section: &'static str, detail: String) -> IndexError {
    IndexError::IncompleteMetadata { section, detail }
}

fn boxed(tag: BoxType, payload: &[u8]) -> Result<Vec<u8>, IndexError> {
    let mut out = Vec::with_capacity(payload.len() + 16);
    push_box(&mut out, tag, payload)?;
    Ok(out)
}

// ── mhix — main header index ───────────────────────────────────────────────

/// Fixed-layout box locating the main codestream header:
/// `MHOFF:u64` then `MHLEN:u64`.
pub fn build_mhix(info: &CodestreamInfo) -> Result<Vec<u8>, IndexError> {
    if info.main_header.len == 0 {
        return Err(incomplete(
            "mhix",
            "main header length was not recorded".into(),
        ));
    }
    let mut payload = Vec::with_capacity(16);
    push_u64(&mut payload, info.main_header.offset);
    push_u64(&mut payload, info.main_header.len);
    boxed(BOX_MHIX, &payload)
}

// ── faix — fragment array index ────────────────────────────────────────────

/// Fragment array over `spans`: version byte, entry count, then
/// offset/length pairs, all counts and spans at the version's field width.
fn build_faix(
    version: FaixVersion,
    spans: &[ByteSpan],
    offset_field: &'static str,
    len_field: &'static str,
) -> Result<Vec<u8>, IndexError> {
    let width = version.field_width() as usize;
    let mut payload = Vec::with_capacity(1 + width + spans.len() * width * 2);
    push_u8(&mut payload, version.marker());
    version.push_field(&mut payload, "fragment count", spans.len() as u64)?;
    for span in spans {
        version.push_field(&mut payload, offset_field, span.offset)?;
        version.push_field(&mut payload, len_field, span.len)?;
    }
    boxed(BOX_FAIX, &payload)
}

// ── tpix — tile-part index ─────────────────────────────────────────────────

/// Superbox holding one fragment array per tile, tiles in raster order.
/// Each array lists that tile's tile-part spans in codestream-append order.
pub fn build_tpix(info: &CodestreamInfo, version: FaixVersion) -> Result<Vec<u8>, IndexError> {
    let mut payload = Vec::new();
    for (idx, tile) in info.tiles.iter().enumerate() {
        if tile.tile_parts.is_empty() {
            return Err(incomplete(
                "tpix",
                format!("tile {idx} has no tile-part records"),
            ));
        }
        payload.extend_from_slice(&build_faix(
            version,
            &tile.tile_parts,
            "tile-part offset",
            "tile-part length",
        )?);
        trace!("tpix: tile {idx}: {} tile-part(s)", tile.tile_parts.len());
    }
    boxed(BOX_TPIX, &payload)
}

// ── ppix — precinct packet index ───────────────────────────────────────────

/// Superbox holding one fragment array per tile, tiles in raster order.
///
/// A tile's packet spans are flattened in the fixed traversal order
/// resolution (low to high) → precinct (raster within the resolution's
/// grid) → quality layer (ascending). JPIP clients map byte ranges back to
/// (tile, resolution, precinct, layer) from exactly this order, so it is
/// never permuted.
pub fn build_ppix(info: &CodestreamInfo, version: FaixVersion) -> Result<Vec<u8>, IndexError> {
    let mut payload = Vec::new();
    for (idx, tile) in info.tiles.iter().enumerate() {
        let packets = tile.packets.as_ref().ok_or_else(|| {
            incomplete("ppix", format!("tile {idx} has no packet records"))
        })?;

        let mut spans = Vec::new();
        for (r, resolution) in packets.resolutions.iter().enumerate() {
            for (p, precinct) in resolution.precincts.iter().enumerate() {
                if precinct.layers.len() != info.layers as usize {
                    return Err(incomplete(
                        "ppix",
                        format!(
                            "tile {idx} resolution {r} precinct {p} records {} layer(s), \
                             codestream declares {}",
                            precinct.layers.len(),
                            info.layers
                        ),
                    ));
                }
                spans.extend_from_slice(&precinct.layers);
            }
        }

        payload.extend_from_slice(&build_faix(
            version,
            &spans,
            "packet offset",
            "packet length",
        )?);
        trace!(
            "ppix: tile {idx}: {} packet(s) across {} resolution(s)",
            spans.len(),
            packets.resolutions.len()
        );
    }
    boxed(BOX_PPIX, &payload)
}
