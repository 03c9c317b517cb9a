//! Read-only codestream metadata handed in by the encoder.
//!
//! The index core never inspects the compressed bytes themselves; it only
//! reflects this structure into the wire format. Everything here is an
//! immutable value, borrowed for the duration of one index-write call.

/// One contiguous byte range inside the raw codestream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    pub offset: u64,
    pub len: u64,
}

impl ByteSpan {
    pub fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }

    /// First byte past the span.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.len)
    }

    /// Whether `pos` falls inside the span.
    pub fn contains(&self, pos: u64) -> bool {
        pos >= self.offset && pos < self.end()
    }
}

/// Packet spans for one precinct, indexed by quality layer (ascending).
#[derive(Debug, Clone, Default)]
pub struct PrecinctPackets {
    pub layers: Vec<ByteSpan>,
}

/// Precincts of one resolution level, in raster order over that
/// resolution's precinct grid.
#[derive(Debug, Clone, Default)]
pub struct ResolutionPackets {
    pub precincts: Vec<PrecinctPackets>,
}

/// Per-tile packet metadata, resolutions from lowest to highest.
#[derive(Debug, Clone, Default)]
pub struct TilePackets {
    pub resolutions: Vec<ResolutionPackets>,
}

/// Everything the encoder recorded about one tile.
#[derive(Debug, Clone, Default)]
pub struct TileInfo {
    /// Tile-part spans in codestream-append order, never reordered.
    pub tile_parts: Vec<ByteSpan>,
    /// Packet-level metadata; `None` when the encoder did not collect it.
    /// The packet index section is only emitted when every tile has `Some`.
    pub packets: Option<TilePackets>,
}

/// Progression order signalled in the codestream's COD marker.
///
/// Carried for validation and diagnostics; it does not alter index layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionOrder {
    Lrcp,
    Rlcp,
    Rpcl,
    Pcrl,
    Cprl,
}

impl ProgressionOrder {
    /// The order's code point in the COD marker segment.
    pub fn code(self) -> u8 {
        match self {
            ProgressionOrder::Lrcp => 0,
            ProgressionOrder::Rlcp => 1,
            ProgressionOrder::Rpcl => 2,
            ProgressionOrder::Pcrl => 3,
            ProgressionOrder::Cprl => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProgressionOrder::Lrcp => "LRCP",
            ProgressionOrder::Rlcp => "RLCP",
            ProgressionOrder::Rpcl => "RPCL",
            ProgressionOrder::Pcrl => "PCRL",
            ProgressionOrder::Cprl => "CPRL",
        }
    }
}

/// Immutable description of an encoded codestream's structure.
///
/// Produced by the encoder after the codestream is written out. Tiles are
/// stored in raster order over the tile grid (row-major), and the index
/// writer relies on that ordering.
#[derive(Debug, Clone)]
pub struct CodestreamInfo {
    /// Span of the main codestream header (SOC through the byte before the
    /// first SOT), relative to the codestream start.
    pub main_header: ByteSpan,
    /// Tile grid width in tiles.
    pub tiles_wide: u32,
    /// Tile grid height in tiles.
    pub tiles_high: u32,
    /// Per-tile records, raster order. Length must equal
    /// `tiles_wide * tiles_high`.
    pub tiles: Vec<TileInfo>,
    /// Quality layer count declared in the COD marker.
    pub layers: u16,
    pub progression: ProgressionOrder,
}

impl CodestreamInfo {
    /// Tiles the grid dimensions declare.
    pub fn tile_count(&self) -> usize {
        self.tiles_wide as usize * self.tiles_high as usize
    }

    /// True when every tile carries packet-level metadata, i.e. when a
    /// packet index section can be emitted.
    pub fn has_packet_index(&self) -> bool {
        !self.tiles.is_empty() && self.tiles.iter().all(|t| t.packets.is_some())
    }
}

/// Pixel-level facts about the source image.
///
/// Used to sanity-check the metadata shape before any bytes are emitted;
/// no pixel data is ever touched.
#[derive(Debug, Clone, Copy)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub components: u16,
    pub bit_depth: u8,
}
