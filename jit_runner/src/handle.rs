//! Compiled function handles.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::info;

use crate::engine::ExecutionEngine;
use crate::error::{BoxError, CreateError, EngineError};
use crate::gate::FunctionType;
use crate::module::CompiledModule;
use crate::target::initialize_native_target;

/// Codegen pipeline that leaves the module untouched.
pub fn no_pipeline<M>(_module: &mut M) -> Result<(), BoxError> {
    Ok(())
}

/// An entry point resolved in a compiled module, with the engine that holds
/// its native code.
///
/// Calls through one handle are serialized. Dropping the handle tears down
/// the engine and invalidates its code; buffers already returned by calls
/// are unaffected.
pub struct CompiledFunctionHandle<E> {
    name: String,
    signature: FunctionType,
    engine: Mutex<E>,
}

impl<E: ExecutionEngine> CompiledFunctionHandle<E> {
    /// Resolve `name` in `module`, run `pipeline` over the module and build
    /// its execution engine.
    ///
    /// `runtime_library`, when given, is opened before the module and its
    /// symbols are visible to the generated code.
    pub fn create<M, P>(
        name: &str,
        mut module: M,
        pipeline: P,
        runtime_library: Option<&Path>,
    ) -> Result<Self, CreateError>
    where
        M: CompiledModule<Engine = E>,
        P: FnOnce(&mut M) -> Result<(), BoxError>,
    {
        let signature = module
            .function_table()
            .iter()
            .find(|decl| decl.name == name)
            .map(|decl| decl.signature)
            .ok_or_else(|| CreateError::FunctionNotFound(name.to_string()))?;

        let target = initialize_native_target().map_err(CreateError::EngineConstructionFailed)?;
        pipeline(&mut module)
            .map_err(|e| CreateError::EngineConstructionFailed(EngineError::Pipeline(e)))?;

        let shared_libs: Vec<&Path> = runtime_library.into_iter().collect();
        let engine = module
            .build_engine(target, &shared_libs)
            .map_err(CreateError::EngineConstructionFailed)?;

        info!(
            "Successfully created engine for function '{name}' ({} params, {} results)",
            signature.params, signature.results
        );
        Ok(Self {
            name: name.to_string(),
            signature,
            engine: Mutex::new(engine),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> FunctionType {
        self.signature
    }

    pub(crate) fn lock_engine(&self) -> MutexGuard<'_, E> {
        // A panic inside a host closure leaves no engine state half-written.
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
