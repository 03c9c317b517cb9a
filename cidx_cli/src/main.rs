use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use cidx_core::reader::{decode_faix, decode_mhix, parse_first, ParsedBox};
use cidx_core::boxes::{BOX_FAIX, BOX_MHIX, BOX_PPIX, BOX_TPIX};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "cidx",
    about = "Inspect JPIP codestream index (cidx) boxes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a cidx box and print its box tree
    Inspect {
        /// File containing the index (the box may sit inside a larger container)
        file: PathBuf,
        /// Byte offset of the cidx box within the file
        #[arg(short, long, default_value_t = 0)]
        offset: u64,
        /// Print every fragment entry instead of a summary
        #[arg(long)]
        entries: bool,
        /// Emit the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Map a codestream byte position back to the index records covering it
    Locate {
        /// File containing the index
        file: PathBuf,
        /// Byte offset of the cidx box within the file
        #[arg(short, long, default_value_t = 0)]
        offset: u64,
        /// Byte position within the codestream to look up
        #[arg(short, long)]
        position: u64,
    },
}

// ── inspect ────────────────────────────────────────────────────────────────

fn load_box(file: &PathBuf, offset: u64) -> anyhow::Result<Vec<u8>> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    if offset as usize >= bytes.len() {
        anyhow::bail!(
            "offset {} is past the end of {} ({} bytes)",
            offset,
            file.display(),
            bytes.len()
        );
    }
    Ok(bytes[offset as usize..].to_vec())
}

fn print_tree(bx: &ParsedBox, depth: usize, entries: bool) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{} @ {} ({} bytes)",
        bx.tag_str(),
        bx.offset,
        bx.total_len
    );
    match bx.tag {
        BOX_MHIX => {
            let span = decode_mhix(bx.payload)?;
            println!("{indent}  main header: offset {} length {}", span.offset, span.len);
        }
        BOX_FAIX => {
            let arr = decode_faix(bx.payload)?;
            println!(
                "{indent}  version {} ({}-byte fields), {} entr{}",
                arr.version,
                if arr.version == 0 { 4 } else { 8 },
                arr.entries.len(),
                if arr.entries.len() == 1 { "y" } else { "ies" }
            );
            if entries {
                for (i, span) in arr.entries.iter().enumerate() {
                    println!("{indent}    [{i}] offset {} length {}", span.offset, span.len);
                }
            }
        }
        _ => {}
    }
    for child in &bx.children {
        print_tree(child, depth + 1, entries)?;
    }
    Ok(())
}

fn box_to_json(bx: &ParsedBox) -> anyhow::Result<serde_json::Value> {
    let mut value = json!({
        "tag": bx.tag_str(),
        "offset": bx.offset,
        "length": bx.total_len,
    });
    match bx.tag {
        BOX_MHIX => {
            let span = decode_mhix(bx.payload)?;
            value["main_header"] = json!({ "offset": span.offset, "length": span.len });
        }
        BOX_FAIX => {
            let arr = decode_faix(bx.payload)?;
            value["version"] = json!(arr.version);
            value["entries"] = arr
                .entries
                .iter()
                .map(|s| json!({ "offset": s.offset, "length": s.len }))
                .collect();
        }
        _ => {}
    }
    if !bx.children.is_empty() {
        let children: Result<Vec<_>, _> = bx.children.iter().map(box_to_json).collect();
        value["children"] = serde_json::Value::Array(children?);
    }
    Ok(value)
}

fn run_inspect(file: PathBuf, offset: u64, entries: bool, as_json: bool) -> anyhow::Result<()> {
    let bytes = load_box(&file, offset)?;
    let bx = parse_first(&bytes).context("parsing cidx box")?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&box_to_json(&bx)?)?);
    } else {
        print_tree(&bx, 0, entries)?;
    }
    Ok(())
}

// ── locate ─────────────────────────────────────────────────────────────────

fn run_locate(file: PathBuf, offset: u64, position: u64) -> anyhow::Result<()> {
    let bytes = load_box(&file, offset)?;
    let cidx = parse_first(&bytes).context("parsing cidx box")?;

    let mut hits = 0usize;
    for section in &cidx.children {
        let label = match section.tag {
            BOX_TPIX => "tile-part",
            BOX_PPIX => "packet",
            _ => continue,
        };
        for (tile, faix_box) in section.children.iter().enumerate() {
            let arr = decode_faix(faix_box.payload)?;
            for (i, span) in arr.entries.iter().enumerate() {
                if span.contains(position) {
                    println!(
                        "{label}: tile {tile}, record {i} (offset {} length {})",
                        span.offset, span.len
                    );
                    hits += 1;
                }
            }
        }
    }
    if hits == 0 {
        println!("position {position} is not covered by any index record");
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect {
            file,
            offset,
            entries,
            json,
        } => run_inspect(file, offset, entries, json),
        Commands::Locate {
            file,
            offset,
            position,
        } => run_locate(file, offset, position),
    }
}
