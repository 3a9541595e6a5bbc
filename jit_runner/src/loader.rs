//! Manifest and module loading.

use std::{fs::read, path::Path};

use anyhow::{Context, Result, anyhow};
use jit_runner::{
    ClientParameters, CompiledFunctionHandle, LibraryEngine, LibraryModule, ModuleManifest,
    deserialize_manifest,
};

/// Load and deserialize a module manifest from a file.
pub(crate) fn load_manifest(manifest_path: &Path) -> Result<ModuleManifest> {
    let bytes = read(manifest_path)
        .with_context(|| format!("failed to read manifest file '{}'", manifest_path.display()))?;
    deserialize_manifest(&bytes).with_context(|| {
        format!(
            "failed to deserialize from manifest file '{}'",
            manifest_path.display()
        )
    })
}

/// Create a handle for one function of a compiled shared library.
///
/// Only the requested entry point is resolved.
pub(crate) fn load_function(
    lib_path: &Path,
    manifest: &ModuleManifest,
    func_name: &str,
    runtime_lib: Option<&Path>,
) -> Result<(CompiledFunctionHandle<LibraryEngine>, ClientParameters)> {
    // SAFETY: the library and its manifest come from the same compilation and
    // are trusted to agree on every entry point's calling convention.
    let module = unsafe { LibraryModule::new(lib_path, manifest) };
    let handle = CompiledFunctionHandle::create(
        func_name,
        module,
        |module: &mut LibraryModule| {
            module.retain_functions(|decl| decl.name == func_name);
            Ok(())
        },
        runtime_lib,
    )
    .with_context(|| {
        format!(
            "failed to load function '{func_name}' from module '{}'",
            lib_path.display()
        )
    })?;

    let parameters = manifest
        .function(func_name)
        .map(|function| function.parameters.clone())
        .ok_or_else(|| anyhow!("function '{func_name}' has no gate metadata"))?;
    Ok((handle, parameters))
}
