//! Integration tests: every index is written into an in-memory sink, then
//! re-parsed with the conforming reader and checked field by field.
//!
//! The synthetic codestream layouts below use distinguishable offsets
//! (rank-encoded values) so any reordering inside a section shows up as a
//! concrete wrong byte, not just a failed length check.

use cidx_core::boxes::{header_bytes, BOX_CIDX, BOX_FAIX, BOX_MHIX, BOX_PPIX, BOX_TPIX};
use cidx_core::fields::checked_u32;
use cidx_core::reader::{decode_faix, decode_mhix, parse_first};
use cidx_core::{
    write_codestream_index, ByteSpan, CodestreamInfo, FaixVersion, ImageDescriptor, IndexError,
    PrecinctPackets, ProgressionOrder, ResolutionPackets, TileInfo, TilePackets,
};

// ── helpers ────────────────────────────────────────────────────────────────

fn span(offset: u64, len: u64) -> ByteSpan {
    ByteSpan::new(offset, len)
}

fn descriptor() -> ImageDescriptor {
    ImageDescriptor {
        width: 512,
        height: 512,
        components: 3,
        bit_depth: 8,
    }
}

/// The single-tile scenario: main header at (0, 100), one tile-part at
/// (100, 5000), no packet metadata.
fn single_tile_info() -> CodestreamInfo {
    CodestreamInfo {
        main_header: span(0, 100),
        tiles_wide: 1,
        tiles_high: 1,
        tiles: vec![TileInfo {
            tile_parts: vec![span(100, 5000)],
            packets: None,
        }],
        layers: 1,
        progression: ProgressionOrder::Lrcp,
    }
}

/// One tile with full packet metadata: two resolutions (one precinct, then
/// two precincts) and two quality layers. Packet offsets encode the
/// traversal rank so the emitted order is directly checkable.
fn packet_tile() -> TileInfo {
    let precinct = |base: u64| PrecinctPackets {
        layers: vec![span(base, 10), span(base + 100, 10)],
    };
    TileInfo {
        tile_parts: vec![span(100, 9000)],
        packets: Some(TilePackets {
            resolutions: vec![
                ResolutionPackets {
                    precincts: vec![precinct(1000)],
                },
                ResolutionPackets {
                    precincts: vec![precinct(2000), precinct(3000)],
                },
            ],
        }),
    }
}

fn write_index(info: &CodestreamInfo, codestream_len: u64) -> (Vec<u8>, u64) {
    let mut sink = Vec::new();
    let total = write_codestream_index(0, &mut sink, &descriptor(), info, codestream_len)
        .expect("index write should succeed");
    (sink, total)
}

// ── end-to-end layout ──────────────────────────────────────────────────────

#[test]
fn single_tile_end_to_end() {
    let (sink, total) = write_index(&single_tile_info(), 5100);
    assert_eq!(total, sink.len() as u64, "returned total must match bytes emitted");

    let cidx = parse_first(&sink).unwrap();
    assert_eq!(cidx.tag, BOX_CIDX);
    assert_eq!(cidx.total_len, total);

    // Exactly two children: mhix then tpix. No packet metadata, no ppix.
    assert_eq!(cidx.children.len(), 2);
    assert_eq!(cidx.children[0].tag, BOX_MHIX);
    assert_eq!(cidx.children[1].tag, BOX_TPIX);

    let main_header = decode_mhix(cidx.children[0].payload).unwrap();
    assert_eq!(main_header, span(0, 100));

    let tpix = &cidx.children[1];
    assert_eq!(tpix.children.len(), 1, "one fragment array per tile");
    assert_eq!(tpix.children[0].tag, BOX_FAIX);
    let parts = decode_faix(tpix.children[0].payload).unwrap();
    assert_eq!(parts.version, 0, "short codestream gets 4-byte fields");
    assert_eq!(parts.entries, vec![span(100, 5000)]);

    // Known exact sizes: mhix 8+16, faix 8+(1+4+8), tpix 8+21, cidx 8+24+29.
    assert_eq!(cidx.children[0].total_len, 24);
    assert_eq!(tpix.children[0].total_len, 21);
    assert_eq!(tpix.total_len, 29);
    assert_eq!(total, 61);
}

#[test]
fn total_is_sum_of_children() {
    let info = CodestreamInfo {
        main_header: span(0, 147),
        tiles_wide: 2,
        tiles_high: 1,
        tiles: vec![packet_tile(), packet_tile()],
        layers: 2,
        progression: ProgressionOrder::Rlcp,
    };
    let (sink, total) = write_index(&info, 100_000);

    let cidx = parse_first(&sink).unwrap();
    let child_sum: u64 = cidx.children.iter().map(|c| c.total_len).sum();
    assert_eq!(total, 8 + child_sum);

    // Parsing the payload as a standalone sibling sequence agrees with the
    // superbox walk.
    let siblings = cidx_core::parse_boxes(cidx.payload).unwrap();
    assert_eq!(siblings.len(), cidx.children.len());

    // Every nested box must re-parse to its declared length.
    for child in &cidx.children {
        assert_eq!(
            child.total_len as usize,
            child.payload.len() + 8,
            "{} declared length disagrees with payload",
            child.tag_str()
        );
    }
}

// ── ordering guarantees ────────────────────────────────────────────────────

#[test]
fn tile_part_records_keep_append_order() {
    // Four tiles in a 2x2 grid. Tile 2's parts are deliberately
    // non-monotonic in offset: append order must survive verbatim.
    let tile = |parts: Vec<ByteSpan>| TileInfo {
        tile_parts: parts,
        packets: None,
    };
    let info = CodestreamInfo {
        main_header: span(0, 80),
        tiles_wide: 2,
        tiles_high: 2,
        tiles: vec![
            tile(vec![span(1000, 10)]),
            tile(vec![span(2000, 10), span(2100, 20)]),
            tile(vec![span(9000, 10), span(3000, 10)]),
            tile(vec![span(4000, 10)]),
        ],
        layers: 1,
        progression: ProgressionOrder::Lrcp,
    };
    let (sink, _) = write_index(&info, 10_000);

    let cidx = parse_first(&sink).unwrap();
    let tpix = &cidx.children[1];
    assert_eq!(tpix.children.len(), 4, "raster order: one faix per tile");

    let decoded: Vec<Vec<ByteSpan>> = tpix
        .children
        .iter()
        .map(|b| decode_faix(b.payload).unwrap().entries)
        .collect();
    assert_eq!(decoded[0], vec![span(1000, 10)]);
    assert_eq!(decoded[1], vec![span(2000, 10), span(2100, 20)]);
    assert_eq!(decoded[2], vec![span(9000, 10), span(3000, 10)]);
    assert_eq!(decoded[3], vec![span(4000, 10)]);
}

#[test]
fn packet_traversal_is_resolution_precinct_layer() {
    let info = CodestreamInfo {
        main_header: span(0, 80),
        tiles_wide: 1,
        tiles_high: 1,
        tiles: vec![packet_tile()],
        layers: 2,
        progression: ProgressionOrder::Lrcp,
    };
    let (sink, _) = write_index(&info, 10_000);

    let cidx = parse_first(&sink).unwrap();
    assert_eq!(cidx.children.len(), 3);
    let ppix = &cidx.children[2];
    assert_eq!(ppix.tag, BOX_PPIX);

    let packets = decode_faix(ppix.children[0].payload).unwrap().entries;
    // res 0 / precinct 0 / layers 0,1 → res 1 / precinct 0 / layers 0,1
    // → res 1 / precinct 1 / layers 0,1.
    assert_eq!(
        packets,
        vec![
            span(1000, 10),
            span(1100, 10),
            span(2000, 10),
            span(2100, 10),
            span(3000, 10),
            span(3100, 10),
        ]
    );
}

// ── optional section rules ─────────────────────────────────────────────────

#[test]
fn ppix_absent_when_no_packet_metadata() {
    let (sink, _) = write_index(&single_tile_info(), 5100);
    let cidx = parse_first(&sink).unwrap();
    let tags: Vec<_> = cidx.children.iter().map(|c| c.tag).collect();
    assert_eq!(tags, vec![BOX_MHIX, BOX_TPIX]);
}

#[test]
fn mixed_packet_metadata_is_rejected() {
    let info = CodestreamInfo {
        main_header: span(0, 80),
        tiles_wide: 2,
        tiles_high: 1,
        tiles: vec![
            packet_tile(),
            TileInfo {
                tile_parts: vec![span(500, 100)],
                packets: None,
            },
        ],
        layers: 2,
        progression: ProgressionOrder::Lrcp,
    };
    let mut sink = Vec::new();
    let err = write_codestream_index(0, &mut sink, &descriptor(), &info, 10_000).unwrap_err();
    assert!(matches!(err, IndexError::IncompleteMetadata { .. }), "got {err}");
    assert!(sink.is_empty(), "no partial bytes on failure");
}

#[test]
fn layer_count_mismatch_is_rejected() {
    let mut tile = packet_tile();
    tile.packets.as_mut().unwrap().resolutions[0].precincts[0]
        .layers
        .pop();
    let info = CodestreamInfo {
        main_header: span(0, 80),
        tiles_wide: 1,
        tiles_high: 1,
        tiles: vec![tile],
        layers: 2,
        progression: ProgressionOrder::Lrcp,
    };
    let mut sink = Vec::new();
    let err = write_codestream_index(0, &mut sink, &descriptor(), &info, 10_000).unwrap_err();
    assert!(matches!(
        err,
        IndexError::IncompleteMetadata { section: "ppix", .. }
    ));
    assert!(sink.is_empty());
}

// ── field widths ───────────────────────────────────────────────────────────

#[test]
fn large_codestream_escalates_to_wide_fields() {
    let big = u32::MAX as u64 + 1;
    let info = CodestreamInfo {
        main_header: span(0, 100),
        tiles_wide: 1,
        tiles_high: 1,
        tiles: vec![TileInfo {
            tile_parts: vec![span(big - 5000, 5000)],
            packets: None,
        }],
        layers: 1,
        progression: ProgressionOrder::Lrcp,
    };
    let (sink, _) = write_index(&info, big);

    let cidx = parse_first(&sink).unwrap();
    let parts = decode_faix(cidx.children[1].children[0].payload).unwrap();
    assert_eq!(parts.version, 1);
    assert_eq!(parts.entries, vec![span(big - 5000, 5000)]);
}

#[test]
fn narrow_fields_reject_oversized_offset() {
    // Codestream declared short, but a tile-part offset needs 33 bits:
    // the 4-byte field must refuse rather than truncate.
    let info = CodestreamInfo {
        main_header: span(0, 100),
        tiles_wide: 1,
        tiles_high: 1,
        tiles: vec![TileInfo {
            tile_parts: vec![span(u32::MAX as u64 + 1, 10)],
            packets: None,
        }],
        layers: 1,
        progression: ProgressionOrder::Lrcp,
    };
    let mut sink = Vec::new();
    let err = write_codestream_index(0, &mut sink, &descriptor(), &info, 1000).unwrap_err();
    assert!(matches!(err, IndexError::FieldOverflow { width: 4, .. }), "got {err}");
    assert!(sink.is_empty());
}

#[test]
fn field_boundary_round_trips() {
    // Exactly at the 4-byte maximum: encodes and survives a round trip.
    let max = u32::MAX as u64;
    assert_eq!(checked_u32("test field", max).unwrap(), u32::MAX);

    let mut buf = Vec::new();
    FaixVersion::V0.push_field(&mut buf, "test field", max).unwrap();
    assert_eq!(buf, u32::MAX.to_be_bytes());

    // One above: FieldOverflow naming the width.
    let err = checked_u32("test field", max + 1).unwrap_err();
    assert!(matches!(err, IndexError::FieldOverflow { value, width: 4, .. } if value == max + 1));
}

#[test]
fn version_selection_threshold() {
    assert_eq!(FaixVersion::for_codestream_len(u32::MAX as u64), FaixVersion::V0);
    assert_eq!(
        FaixVersion::for_codestream_len(u32::MAX as u64 + 1),
        FaixVersion::V1
    );
}

// ── box headers ────────────────────────────────────────────────────────────

#[test]
fn header_escalates_past_lbox_range() {
    // Largest payload still addressable by the short form.
    let (header, total) = header_bytes(BOX_FAIX, u32::MAX as u64 - 8).unwrap();
    assert_eq!(header.len(), 8);
    assert_eq!(total, u32::MAX as u64);
    assert_eq!(header[0..4], u32::MAX.to_be_bytes()[..]);

    // One byte more: extended form with LBox == 1 and XLBox carrying the total.
    let (header, total) = header_bytes(BOX_FAIX, u32::MAX as u64 - 7).unwrap();
    assert_eq!(header.len(), 16);
    assert_eq!(header[0..4], 1u32.to_be_bytes()[..]);
    assert_eq!(header[4..8], b"faix"[..]);
    assert_eq!(total, u32::MAX as u64 - 7 + 16);
    assert_eq!(header[8..16], total.to_be_bytes()[..]);
}

#[test]
fn unaddressable_payload_is_encoding_overflow() {
    let err = header_bytes(BOX_CIDX, u64::MAX - 10).unwrap_err();
    assert!(matches!(err, IndexError::EncodingOverflow { .. }));
}

// ── shape validation ───────────────────────────────────────────────────────

#[test]
fn zero_dimension_image_is_rejected() {
    let image = ImageDescriptor {
        width: 0,
        height: 512,
        components: 3,
        bit_depth: 8,
    };
    let mut sink = Vec::new();
    let err =
        write_codestream_index(0, &mut sink, &image, &single_tile_info(), 5100).unwrap_err();
    assert!(matches!(err, IndexError::IncompleteMetadata { .. }));
}

#[test]
fn tile_grid_mismatch_is_rejected() {
    let mut info = single_tile_info();
    info.tiles_wide = 2; // grid says 2 tiles, only 1 recorded
    let mut sink = Vec::new();
    let err = write_codestream_index(0, &mut sink, &descriptor(), &info, 5100).unwrap_err();
    assert!(matches!(err, IndexError::IncompleteMetadata { .. }));
}

#[test]
fn tile_without_parts_is_rejected() {
    let mut info = single_tile_info();
    info.tiles[0].tile_parts.clear();
    let mut sink = Vec::new();
    let err = write_codestream_index(0, &mut sink, &descriptor(), &info, 5100).unwrap_err();
    assert!(matches!(
        err,
        IndexError::IncompleteMetadata { section: "tpix", .. }
    ));
    assert!(sink.is_empty());
}

// ── reader robustness ──────────────────────────────────────────────────────

#[test]
fn faix_count_beyond_payload_is_malformed() {
    // Hostile payload: version 1 with a count field of u64::MAX and no
    // entry bytes at all. The declared count must be checked against the
    // payload before it sizes anything.
    let mut payload = vec![1u8];
    payload.extend_from_slice(&u64::MAX.to_be_bytes());
    let err = decode_faix(&payload).unwrap_err();
    assert!(matches!(err, cidx_core::ParseError::Malformed(_)), "got {err}");

    // Same under version 0 with a count one past what the bytes hold.
    let mut payload = vec![0u8];
    payload.extend_from_slice(&2u32.to_be_bytes());
    payload.extend_from_slice(&[0u8; 8]); // room for one entry, not two
    let err = decode_faix(&payload).unwrap_err();
    assert!(matches!(err, cidx_core::ParseError::Malformed(_)));
}

#[test]
fn extended_header_round_trips_through_reader() {
    // Hand-built extended form: LBox == 1, then XLBox carries the total
    // and the header grows to 16 bytes.
    let mut inner = Vec::new();
    inner.extend_from_slice(&0u64.to_be_bytes());
    inner.extend_from_slice(&147u64.to_be_bytes());
    let mut buf = Vec::new();
    buf.extend_from_slice(&1u32.to_be_bytes());
    buf.extend_from_slice(b"mhix");
    buf.extend_from_slice(&(16 + inner.len() as u64).to_be_bytes());
    buf.extend_from_slice(&inner);

    let bx = parse_first(&buf).unwrap();
    assert_eq!(bx.tag, BOX_MHIX);
    assert_eq!(bx.total_len, buf.len() as u64);
    assert_eq!(bx.payload.len(), inner.len());
    assert_eq!(decode_mhix(bx.payload).unwrap(), span(0, 147));

    // An extended header cut off before XLBox is a truncated header.
    let err = parse_first(&buf[..12]).unwrap_err();
    assert!(matches!(err, cidx_core::ParseError::TruncatedHeader { .. }));
}

#[test]
fn truncated_index_fails_to_parse() {
    let (sink, _) = write_index(&single_tile_info(), 5100);
    let err = parse_first(&sink[..sink.len() - 4]).unwrap_err();
    assert!(matches!(
        err,
        cidx_core::ParseError::TruncatedPayload { .. }
    ));
}
