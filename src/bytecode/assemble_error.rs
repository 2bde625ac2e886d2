use thiserror::Error;

/// Failures while assembling chunks into bytecode.
///
/// Every variant is an internal-consistency failure of the generator or a
/// hard limit of the binary format. None of them is recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("internal: label {label} placed twice (at {first} and {second})")]
    LabelPlacedTwice {
        label: String,
        first: usize,
        second: usize,
    },

    #[error("internal: position of label {label} read before it was placed")]
    LabelNotPlaced { label: String },

    #[error("constant pool of chunk '{chunk}' is full ({limit} entries)")]
    ConstantPoolFull { chunk: String, limit: usize },

    #[error("{what} {value} does not fit in one byte")]
    ArgumentOutOfRange { what: &'static str, value: usize },

    #[error("jump to {label} spans {distance} bytes, at most 127 can be encoded")]
    JumpOutOfRange { label: String, distance: usize },

    #[error("internal: conditional jump to {label} does not point forward")]
    JumpNotForward { label: String },

    #[error("chunk '{chunk}' has {len} bytes of code, at most 65535 can be encoded")]
    CodeTooLong { chunk: String, len: usize },

    #[error("string constant of {len} bytes is too long, at most 65535 can be encoded")]
    StringTooLong { len: usize },

    #[error("chunk '{0}' already exists")]
    DuplicateChunk(String),

    #[error("program has {0} chunks, at most 256 can be addressed")]
    TooManyChunks(usize),

    #[error("internal: main chunk was never added")]
    MissingMain,

    #[error("internal: unknown chunk '{0}'")]
    UnknownChunk(String),
}
