pub mod boxes;
pub mod cidx;
pub mod codestream;
pub mod error;
pub mod fields;
pub mod reader;
pub mod sections;

pub use cidx::write_codestream_index;
pub use codestream::{
    ByteSpan, CodestreamInfo, ImageDescriptor, PrecinctPackets, ProgressionOrder,
    ResolutionPackets, TileInfo, TilePackets,
};
pub use error::IndexError;
pub use fields::FaixVersion;
pub use reader::{parse_boxes, parse_first, ParseError, ParsedBox};
