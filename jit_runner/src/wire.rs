//! Serialization and deserialization for manifests, parameters and outputs.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{DeserializeError, PeekError, SerializeError};
use crate::gate::ClientParameters;
use crate::{
    HEADER_SIZE, MANIFEST_MAGIC, MANIFEST_VERSION, OUTPUT_MAGIC, OUTPUT_VERSION, PARAMETERS_MAGIC,
    PARAMETERS_VERSION,
};

/// Entry points of a compiled shared library and their gate metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub functions: Vec<FunctionManifest>,
}

impl ModuleManifest {
    pub fn function(&self, name: &str) -> Option<&FunctionManifest> {
        self.functions.iter().find(|function| function.name == name)
    }
}

/// One entry point listed in a [`ModuleManifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionManifest {
    pub name: String,
    pub parameters: ClientParameters,
}

/// A value as stored in parameter and output files.
///
/// Encrypted values are already encoded as `u64` tensors whose last
/// dimension is the ciphertext vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueData {
    Scalar { value: u64 },
    Tensor { sizes: Vec<usize>, values: Vec<u64> },
}

/// Peek the version number from parameter bytes without full deserialization.
///
/// This reads only the header (magic bytes + version) to allow fast-fail
/// for unsupported versions without deserializing the entire payload.
pub fn peek_parameters_version(bytes: &[u8]) -> Result<u32, PeekError> {
    peek_version(bytes, &PARAMETERS_MAGIC)
}

/// Peek the version number from output bytes without full deserialization.
pub fn peek_output_version(bytes: &[u8]) -> Result<u32, PeekError> {
    peek_version(bytes, &OUTPUT_MAGIC)
}

/// Peek the version number from manifest bytes without full deserialization.
pub fn peek_manifest_version(bytes: &[u8]) -> Result<u32, PeekError> {
    peek_version(bytes, &MANIFEST_MAGIC)
}

fn peek_version(bytes: &[u8], expected_magic: &[u8; 4]) -> Result<u32, PeekError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PeekError::TooShort);
    }
    if &bytes[0..4] != expected_magic {
        return Err(PeekError::InvalidMagic);
    }
    let version_bytes: [u8; 4] = bytes[4..8]
        .try_into()
        .map_err(|_| PeekError::InvalidVersion)?;
    Ok(u32::from_be_bytes(version_bytes))
}

/// Serialize call parameters with magic bytes and version header.
pub fn serialize_parameters(params: &[ValueData]) -> Result<Vec<u8>, SerializeError> {
    serialize_with_header(&PARAMETERS_MAGIC, PARAMETERS_VERSION, params)
}

/// Serialize outputs with magic bytes and version header.
pub fn serialize_outputs(outputs: &[ValueData]) -> Result<Vec<u8>, SerializeError> {
    serialize_with_header(&OUTPUT_MAGIC, OUTPUT_VERSION, outputs)
}

/// Serialize a module manifest with magic bytes and version header.
pub fn serialize_manifest(manifest: &ModuleManifest) -> Result<Vec<u8>, SerializeError> {
    serialize_with_header(&MANIFEST_MAGIC, MANIFEST_VERSION, manifest)
}

fn serialize_with_header<T: Serialize + ?Sized>(
    magic: &[u8; 4],
    version: u32,
    payload: &T,
) -> Result<Vec<u8>, SerializeError> {
    let mut buf = Vec::with_capacity(HEADER_SIZE);
    buf.extend_from_slice(magic);
    buf.extend_from_slice(&version.to_be_bytes());
    let payload_bytes = rmp_serde::to_vec(payload).map_err(SerializeError)?;
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

fn deserialize_payload<T: DeserializeOwned>(
    bytes: &[u8],
    version: u32,
    expected: u32,
) -> Result<T, DeserializeError> {
    if version != expected {
        return Err(DeserializeError::UnsupportedVersion {
            got: version,
            expected,
        });
    }
    rmp_serde::from_slice(&bytes[HEADER_SIZE..]).map_err(DeserializeError::Payload)
}

/// Deserialize parameters payload, assuming header was already validated.
///
/// The caller must have validated the header via `peek_parameters_version` and
/// pass the returned version. This function validates the version matches the
/// expected `PARAMETERS_VERSION` and deserializes the msgpack payload.
pub fn deserialize_parameters_payload(
    bytes: &[u8],
    version: u32,
) -> Result<Vec<ValueData>, DeserializeError> {
    deserialize_payload(bytes, version, PARAMETERS_VERSION)
}

/// Deserialize parameters, validating magic bytes and version.
pub fn deserialize_parameters(bytes: &[u8]) -> Result<Vec<ValueData>, DeserializeError> {
    let version = peek_parameters_version(bytes)?;
    deserialize_parameters_payload(bytes, version)
}

/// Deserialize outputs, validating magic bytes and version.
pub fn deserialize_outputs(bytes: &[u8]) -> Result<Vec<ValueData>, DeserializeError> {
    let version = peek_output_version(bytes)?;
    deserialize_payload(bytes, version, OUTPUT_VERSION)
}

/// Deserialize a module manifest, validating magic bytes and version.
pub fn deserialize_manifest(bytes: &[u8]) -> Result<ModuleManifest, DeserializeError> {
    let version = peek_manifest_version(bytes)?;
    deserialize_payload(bytes, version, MANIFEST_VERSION)
}
