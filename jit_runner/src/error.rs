//! Error types for module loading, invocation and the wire format.

use std::path::PathBuf;

/// Boxed error returned by caller-supplied codegen pipelines.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for translating values to and from raw slots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarshalError {
    /// A scalar was supplied for a tensor gate or the other way round.
    #[error("gate expects a {expected} value, got a {got}")]
    KindMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// A tensor rank does not match the gate's effective rank.
    #[error("gate expects a tensor of effective rank {expected}, got rank {got}")]
    RankMismatch { expected: usize, got: usize },
    /// Sizes and strides have different lengths.
    #[error("tensor has {sizes} sizes but {strides} strides")]
    StrideCount { sizes: usize, strides: usize },
    /// The backing storage does not match the declared shape.
    #[error("tensor shape holds {expected} elements, storage holds {got}")]
    ElementCount { expected: usize, got: usize },
    /// An output region does not match the summed gate slot counts.
    #[error("output region holds {got} slots, gates require {expected}")]
    RegionLength { expected: usize, got: usize },
    /// An input gate index is past the last gate.
    #[error("input gate {index} out of range, function has {count} inputs")]
    GateOutOfRange { index: usize, count: usize },
    /// The number of values does not match the number of input gates.
    #[error("function expects {expected} inputs, got {got}")]
    InputCount { expected: usize, got: usize },
}

/// Error type for building an execution engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The host cannot hold addresses in the 64-bit slots of the convention.
    #[error("unsupported native target {arch}: {pointer_width}-bit pointers")]
    UnsupportedTarget {
        arch: &'static str,
        pointer_width: u32,
    },
    /// The caller's codegen pipeline rejected the module.
    #[error("codegen pipeline failed")]
    Pipeline(#[source] BoxError),
    /// A shared library could not be opened.
    #[error("failed to load shared library '{}'", path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    /// A function of the table has no packed entry point.
    #[error("missing packed entry point '{symbol}'")]
    MissingSymbol {
        symbol: String,
        #[source]
        source: libloading::Error,
    },
}

/// Error type for creating a compiled function handle.
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    /// The entry point is absent from the module's function table.
    #[error("cannot find the function '{0}' to JIT")]
    FunctionNotFound(String),
    /// The execution engine could not be built.
    #[error("failed to construct the execution engine")]
    EngineConstructionFailed(#[source] EngineError),
}

/// Error type for a single call through a handle.
///
/// None of these leave the handle unusable.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The packed vector holds a null or missing pointer.
    #[error("invoke: argument at pos {0} is null or missing")]
    NullArgument(usize),
    /// A packed slot was pushed after a slot that must follow it.
    #[error("packed slot {position} ({role}) pushed out of order")]
    SlotOutOfOrder { position: usize, role: &'static str },
    /// The packed vector lacks its runtime context slot.
    #[error("packed arguments have no runtime context")]
    MissingContext,
    /// The packed vector length differs from the declared signature.
    #[error("function '{name}' takes {expected} packed arguments, got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    /// The engine or the compiled function reported a failure.
    #[error("invocation of '{name}' failed: {message}")]
    InvocationFailed { name: String, message: String },
    /// The outputs could not be decoded.
    #[error("failed to decode outputs")]
    Marshal(#[from] MarshalError),
}

/// Error type for peeking version from serialized data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeekError {
    /// Data is too short to contain a valid header.
    #[error("data too short to contain valid header")]
    TooShort,
    /// Magic bytes do not match expected value.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// Version field is corrupt or unreadable.
    #[error("version field is corrupt or unreadable")]
    InvalidVersion,
}

/// Error type for deserialization operations.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    /// Error peeking the version header.
    #[error("header validation failed: {0}")]
    Peek(#[from] PeekError),
    /// Version is not supported.
    #[error("unsupported version {got}, expected {expected}")]
    UnsupportedVersion { got: u32, expected: u32 },
    /// Error deserializing the payload.
    #[error("payload deserialization failed")]
    Payload(#[source] rmp_serde::decode::Error),
}

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
#[error("payload serialization failed")]
pub struct SerializeError(#[source] pub(crate) rmp_serde::encode::Error);
