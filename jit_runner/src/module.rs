//! Compiled modules: a function table plus a way to build an engine.

use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};

use log::debug;

use crate::engine::{ExecutionEngine, HostEngine, HostEntry, LibraryEngine, PackedEntry};
use crate::error::EngineError;
use crate::gate::FunctionType;
use crate::target::NativeTarget;
use crate::wire::ModuleManifest;
use crate::PACKED_SYMBOL_PREFIX;

/// One entry of a module's function table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub signature: FunctionType,
}

/// Output of the external lowering pipeline, consumed as an opaque unit.
pub trait CompiledModule {
    type Engine: ExecutionEngine;

    fn function_table(&self) -> &[FunctionDecl];

    /// Turn the module into native code. `shared_libs` are opened first and
    /// made visible for symbol resolution by the generated code.
    fn build_engine(
        self,
        target: &NativeTarget,
        shared_libs: &[&Path],
    ) -> Result<Self::Engine, EngineError>;
}

/// Open a library, globally visible when it backs other code.
///
/// # Safety
///
/// Opening a library runs its initializers.
unsafe fn open_library(path: &Path, global: bool) -> Result<libloading::Library, EngineError> {
    #[cfg(unix)]
    let opened = {
        use libloading::os::unix::Library as UnixLibrary;
        let visibility = if global {
            libc::RTLD_GLOBAL
        } else {
            libc::RTLD_LOCAL
        };
        // SAFETY: upheld by the caller.
        unsafe { UnixLibrary::open(Some(path), libc::RTLD_NOW | visibility) }
            .map(libloading::Library::from)
    };
    #[cfg(not(unix))]
    let opened = {
        let _ = global;
        // SAFETY: upheld by the caller.
        unsafe { libloading::Library::new(path) }
    };
    opened.map_err(|source| EngineError::LibraryLoad {
        path: path.to_path_buf(),
        source,
    })
}

fn open_runtime_libraries(shared_libs: &[&Path]) -> Result<Vec<libloading::Library>, EngineError> {
    shared_libs
        .iter()
        .map(|path| {
            debug!("Opening runtime library '{}'", path.display());
            // SAFETY: runtime libraries ship with the compiled module and are
            // trusted along with it.
            unsafe { open_library(path, true) }
        })
        .collect()
}

/// In-process module whose functions are registered by the embedder.
#[derive(Debug, Default)]
pub struct HostModule {
    functions: Vec<FunctionDecl>,
    entries: HashMap<String, HostEntry>,
}

impl HostModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native packed entry point.
    ///
    /// # Safety
    ///
    /// `entry` must read and write its argument array exactly as `signature`
    /// and the packed calling convention describe.
    pub unsafe fn with_packed(
        self,
        name: impl Into<String>,
        signature: FunctionType,
        entry: PackedEntry,
    ) -> Self {
        self.with_entry(name.into(), signature, HostEntry::Packed(entry))
    }

    /// Register a closure. Any pointer access it makes is its own `unsafe`.
    pub fn with_closure<F>(self, name: impl Into<String>, signature: FunctionType, body: F) -> Self
    where
        F: Fn(&mut [*mut c_void]) -> Result<(), String> + Send + 'static,
    {
        self.with_entry(name.into(), signature, HostEntry::Closure(Box::new(body)))
    }

    fn with_entry(mut self, name: String, signature: FunctionType, entry: HostEntry) -> Self {
        self.functions.retain(|decl| decl.name != name);
        self.functions.push(FunctionDecl {
            name: name.clone(),
            signature,
        });
        self.entries.insert(name, entry);
        self
    }

    /// Drop every function for which `keep` returns false.
    pub fn retain_functions(&mut self, mut keep: impl FnMut(&FunctionDecl) -> bool) {
        let entries = &mut self.entries;
        self.functions.retain(|decl| {
            let kept = keep(decl);
            if !kept {
                entries.remove(&decl.name);
            }
            kept
        });
    }
}

impl CompiledModule for HostModule {
    type Engine = HostEngine;

    fn function_table(&self) -> &[FunctionDecl] {
        &self.functions
    }

    fn build_engine(
        self,
        _target: &NativeTarget,
        shared_libs: &[&Path],
    ) -> Result<HostEngine, EngineError> {
        let runtime = open_runtime_libraries(shared_libs)?;
        Ok(HostEngine {
            entries: self.entries,
            _runtime: runtime,
        })
    }
}

/// Module compiled ahead of time into a shared object, described by its
/// manifest.
///
/// Each function `f` is reached through the packed wrapper symbol
/// `_mlir_f`, resolved eagerly when the engine is built.
#[derive(Debug, Clone)]
pub struct LibraryModule {
    path: PathBuf,
    functions: Vec<FunctionDecl>,
}

impl LibraryModule {
    /// # Safety
    ///
    /// Building the engine opens `path`, running its initializers, and every
    /// manifest function must follow the packed calling convention its
    /// gates describe.
    pub unsafe fn new(path: impl Into<PathBuf>, manifest: &ModuleManifest) -> Self {
        let functions = manifest
            .functions
            .iter()
            .map(|function| FunctionDecl {
                name: function.name.clone(),
                signature: function.parameters.function_type(),
            })
            .collect();
        Self {
            path: path.into(),
            functions,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop every function for which `keep` returns false; dropped functions
    /// are not resolved.
    pub fn retain_functions(&mut self, keep: impl FnMut(&FunctionDecl) -> bool) {
        self.functions.retain(keep);
    }
}

impl CompiledModule for LibraryModule {
    type Engine = LibraryEngine;

    fn function_table(&self) -> &[FunctionDecl] {
        &self.functions
    }

    fn build_engine(
        self,
        _target: &NativeTarget,
        shared_libs: &[&Path],
    ) -> Result<LibraryEngine, EngineError> {
        let runtime = open_runtime_libraries(shared_libs)?;
        debug!("Opening module library '{}'", self.path.display());
        // SAFETY: guaranteed by the caller of `LibraryModule::new`.
        let library = unsafe { open_library(&self.path, false) }?;

        let mut entries = HashMap::with_capacity(self.functions.len());
        for decl in &self.functions {
            let symbol = format!("{PACKED_SYMBOL_PREFIX}{}", decl.name);
            // SAFETY: the manifest declares this symbol as a packed entry point.
            let entry = unsafe { library.get::<PackedEntry>(symbol.as_bytes()) }
                .map_err(|source| EngineError::MissingSymbol {
                    symbol: symbol.clone(),
                    source,
                })?;
            entries.insert(decl.name.clone(), *entry);
        }

        Ok(LibraryEngine {
            entries,
            _library: library,
            _runtime: runtime,
        })
    }
}
