//! Execution engines: what actually dispatches a packed call.

use std::collections::HashMap;
use std::ffi::c_void;

/// Packed entry point: a single array of pointers, one per argument and
/// result slot.
pub type PackedEntry = unsafe extern "C" fn(*mut *mut c_void);

/// Host-side implementation of a packed function. An `Err` is reported as
/// a runtime failure of the call.
pub type HostClosure = Box<dyn Fn(&mut [*mut c_void]) -> Result<(), String> + Send>;

/// Dispatches packed calls to compiled code held by an engine.
pub trait ExecutionEngine: Send {
    /// Invoke `name` with the packed pointer array.
    ///
    /// Failures the engine can observe (unknown symbol, reported runtime
    /// errors) come back as a message; nothing is retried.
    ///
    /// # Safety
    ///
    /// Every pointer in `args` must be valid for the reads and writes the
    /// callee performs under its calling convention.
    unsafe fn invoke_packed(&self, name: &str, args: &mut [*mut c_void]) -> Result<(), String>;
}

/// Body of a function registered in a host module.
pub enum HostEntry {
    Packed(PackedEntry),
    Closure(HostClosure),
}

impl std::fmt::Debug for HostEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostEntry::Packed(entry) => f.debug_tuple("Packed").field(entry).finish(),
            HostEntry::Closure(_) => f.write_str("Closure(<fn>)"),
        }
    }
}

/// Engine over in-process entry points.
pub struct HostEngine {
    pub(crate) entries: HashMap<String, HostEntry>,
    pub(crate) _runtime: Vec<libloading::Library>,
}

impl ExecutionEngine for HostEngine {
    unsafe fn invoke_packed(&self, name: &str, args: &mut [*mut c_void]) -> Result<(), String> {
        match self.entries.get(name) {
            Some(HostEntry::Packed(entry)) => {
                // SAFETY: upheld by the caller and by whoever registered `entry`.
                unsafe { entry(args.as_mut_ptr()) };
                Ok(())
            }
            Some(HostEntry::Closure(body)) => body(args),
            None => Err(format!("symbol '{name}' not found in engine")),
        }
    }
}

/// Engine over packed entry points resolved from a shared library.
pub struct LibraryEngine {
    pub(crate) entries: HashMap<String, PackedEntry>,
    // Entry points stay valid only while the libraries are open.
    pub(crate) _library: libloading::Library,
    pub(crate) _runtime: Vec<libloading::Library>,
}

impl ExecutionEngine for LibraryEngine {
    unsafe fn invoke_packed(&self, name: &str, args: &mut [*mut c_void]) -> Result<(), String> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| format!("symbol '{name}' not found in engine"))?;
        // SAFETY: upheld by the caller; the library stays open for `self`.
        unsafe { entry(args.as_mut_ptr()) };
        Ok(())
    }
}
