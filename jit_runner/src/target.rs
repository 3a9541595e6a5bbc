//! Process-wide native target setup.

use std::sync::OnceLock;

use log::info;

use crate::error::EngineError;

/// Host description recorded by the first engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTarget {
    pub arch: &'static str,
    pub os: &'static str,
    pub pointer_width: u32,
}

static NATIVE_TARGET: OnceLock<NativeTarget> = OnceLock::new();

/// Initialize the native target once per process.
///
/// Later calls return the same description. Fails when the host's pointers
/// do not fill the 64-bit slots of the packed convention.
pub fn initialize_native_target() -> Result<&'static NativeTarget, EngineError> {
    let target = NATIVE_TARGET.get_or_init(|| {
        let target = NativeTarget {
            arch: std::env::consts::ARCH,
            os: std::env::consts::OS,
            pointer_width: usize::BITS,
        };
        info!(
            "Initialized native target {}-{} ({}-bit pointers)",
            target.arch, target.os, target.pointer_width
        );
        target
    });
    if target.pointer_width != u64::BITS {
        return Err(EngineError::UnsupportedTarget {
            arch: target.arch,
            pointer_width: target.pointer_width,
        });
    }
    Ok(target)
}

/// Whether [`initialize_native_target`] has run in this process.
pub fn is_initialized() -> bool {
    NATIVE_TARGET.get().is_some()
}
