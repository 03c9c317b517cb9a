//! cidx demo
//!
//! Synthesizes codestream metadata for a 4-tile image, writes the index to
//! a file, then re-parses it and prints what a JPIP server would see. No
//! real codestream is involved — the offsets describe a plausible layout.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use cidx_core::reader::{decode_faix, parse_first};
use cidx_core::{
    write_codestream_index, ByteSpan, CodestreamInfo, ImageDescriptor, PrecinctPackets,
    ProgressionOrder, ResolutionPackets, TileInfo, TilePackets,
};

#[derive(Parser)]
#[command(name = "cidx-demo", about = "Write and re-read a synthetic codestream index")]
struct Args {
    /// Where to write the index box
    #[arg(default_value = "demo.cidx")]
    output: PathBuf,
}

/// Lay out a fake codestream: main header, then per-tile packet runs,
/// tracking a running byte cursor the way an encoder's bookkeeping would.
fn synthesize() -> (CodestreamInfo, u64) {
    const MAIN_HEADER_LEN: u64 = 147;
    const RESOLUTIONS: usize = 3;
    const LAYERS: usize = 2;

    let mut cursor = MAIN_HEADER_LEN;
    let mut tiles = Vec::new();
    for _ in 0..4 {
        let tile_start = cursor;
        cursor += 14; // SOT marker segment + SOD
        let mut resolutions = Vec::new();
        for r in 0..RESOLUTIONS {
            // Precinct count grows with resolution: 1, 1, 4.
            let precincts = if r < 2 { 1 } else { 4 };
            let mut level = ResolutionPackets::default();
            for _ in 0..precincts {
                let mut precinct = PrecinctPackets::default();
                for layer in 0..LAYERS {
                    let len = 600 + 200 * layer as u64;
                    precinct.layers.push(ByteSpan::new(cursor, len));
                    cursor += len;
                }
                level.precincts.push(precinct);
            }
            resolutions.push(level);
        }
        tiles.push(TileInfo {
            tile_parts: vec![ByteSpan::new(tile_start, cursor - tile_start)],
            packets: Some(TilePackets { resolutions }),
        });
    }
    cursor += 2; // EOC

    let info = CodestreamInfo {
        main_header: ByteSpan::new(0, MAIN_HEADER_LEN),
        tiles_wide: 2,
        tiles_high: 2,
        tiles,
        layers: LAYERS as u16,
        progression: ProgressionOrder::Rpcl,
    };
    (info, cursor)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let image = ImageDescriptor {
        width: 2048,
        height: 2048,
        components: 3,
        bit_depth: 8,
    };
    let (info, codestream_len) = synthesize();

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut sink = BufWriter::new(file);
    let total = write_codestream_index(0, &mut sink, &image, &info, codestream_len)?;
    sink.flush().context("flushing index file")?;
    println!(
        "wrote {total}-byte cidx for a {codestream_len}-byte codestream to {}",
        args.output.display()
    );

    // Read it back the way a JPIP server would.
    let bytes = std::fs::read(&args.output)?;
    let cidx = parse_first(&bytes)?;
    println!("sections:");
    for section in &cidx.children {
        println!("  {} ({} bytes)", section.tag_str(), section.total_len);
        for (tile, faix_box) in section.children.iter().enumerate() {
            let arr = decode_faix(faix_box.payload)?;
            println!("    tile {tile}: {} record(s)", arr.entries.len());
        }
    }
    Ok(())
}
