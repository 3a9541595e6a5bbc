//! Invocation bridge for just-in-time compiled FHE programs.
//!
//! A [`CompiledFunctionHandle`] resolves one entry point of a compiled
//! module and owns the engine holding its native code. Each
//! [`CompiledFunctionHandle::call`] flattens [`PreparedArguments`] into the
//! packed calling convention (one pointer per word: inputs, the runtime
//! context, then the output region), dispatches it and rebuilds the outputs
//! as scalars or [`TensorBuffer`]s following the gate metadata in
//! [`ClientParameters`]. The per-gate slot layout lives in [`marshal`].
//!
//! # Wire Format
//!
//! Manifests, parameters and outputs use a versioned binary format:
//!
//! ```text
//! [MAGIC: 4 bytes][VERSION: 4 bytes big-endian u32][PAYLOAD: msgpack bytes]
//! ```
//!
//! - **MAGIC**: File type identifier ("JITM" for module manifests, "JITP"
//!   for parameters, "JITO" for outputs)
//! - **VERSION**: Protocol version as big-endian u32 (fixed 4 bytes)
//! - **PAYLOAD**: MessagePack-serialized data
//!
//! # Versioning Policy
//!
//! The deserializer only accepts data with an exact version match, so
//! incompatible files fail early instead of being misread. Protocol changes
//! bump the version constant and require clients to upgrade with the runner.

mod engine;
mod error;
mod gate;
mod handle;
mod invoke;
pub mod marshal;
mod module;
mod packed;
mod target;
mod tensor;
mod wire;

pub use engine::{ExecutionEngine, HostClosure, HostEngine, HostEntry, LibraryEngine, PackedEntry};
pub use error::{
    BoxError, CallError, CreateError, DeserializeError, EngineError, MarshalError, PeekError,
    SerializeError,
};
pub use gate::{ClientParameters, FunctionType, GateDescriptor};
pub use handle::{CompiledFunctionHandle, no_pipeline};
pub use invoke::{PreparedArguments, RuntimeContext};
pub use module::{CompiledModule, FunctionDecl, HostModule, LibraryModule};
pub use packed::{PackedArgs, PackedArgsBuilder, SlotRole};
pub use target::{NativeTarget, initialize_native_target, is_initialized};
pub use tensor::{InvocationResult, RawSlot, TensorBuffer, Value};
pub use wire::{
    FunctionManifest, ModuleManifest, ValueData, deserialize_manifest, deserialize_outputs,
    deserialize_parameters, deserialize_parameters_payload, peek_manifest_version,
    peek_output_version, peek_parameters_version, serialize_manifest, serialize_outputs,
    serialize_parameters,
};

/// Current protocol version for parameters.
pub const PARAMETERS_VERSION: u32 = 1;

/// Current protocol version for outputs.
pub const OUTPUT_VERSION: u32 = 1;

/// Current protocol version for module manifests.
pub const MANIFEST_VERSION: u32 = 1;

/// Magic bytes identifying parameter files: "JITP" in ASCII.
pub const PARAMETERS_MAGIC: [u8; 4] = *b"JITP";

/// Magic bytes identifying output files: "JITO" in ASCII.
pub const OUTPUT_MAGIC: [u8; 4] = *b"JITO";

/// Magic bytes identifying module manifests: "JITM" in ASCII.
pub const MANIFEST_MAGIC: [u8; 4] = *b"JITM";

/// Header size: 4 bytes magic + 4 bytes version.
pub const HEADER_SIZE: usize = 8;

/// Prefix of the packed wrapper symbol generated for each entry point.
pub const PACKED_SYMBOL_PREFIX: &str = "_mlir_";
