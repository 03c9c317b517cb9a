use thiserror::Error;

/// Errors surfaced while building or writing a codestream index.
///
/// The kinds are deliberately coarse: callers need to tell "fix your input
/// metadata" (`IncompleteMetadata`, `FieldOverflow`) apart from "fix your
/// output destination" (`Sink`) and from "this codestream cannot be indexed
/// in this format" (`EncodingOverflow`).
#[derive(Debug, Error)]
pub enum IndexError {
    /// A requested index section needs metadata the encoder never collected,
    /// or the supplied metadata is the wrong shape. Non-retryable; the caller
    /// asked for a section its input cannot back.
    #[error("{section}: incomplete codestream metadata: {detail}")]
    IncompleteMetadata {
        section: &'static str,
        detail: String,
    },

    /// A value does not fit the fixed-width wire field it must occupy.
    #[error("{field} value {value} does not fit in a {width}-byte field")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        width: u8,
    },

    /// Box payload too large to address even with the extended length form.
    #[error("box payload of {payload_len} bytes exceeds the addressable box length range")]
    EncodingOverflow { payload_len: u64 },

    /// The output sink rejected a write. Propagated verbatim; retry policy
    /// belongs to the caller, who knows what the sink actually is.
    #[error("sink write failed: {0}")]
    Sink(#[from] std::io::Error),
}
