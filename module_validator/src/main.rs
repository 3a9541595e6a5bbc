use std::{fs::read, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use jit_runner::{CompiledFunctionHandle, LibraryModule, deserialize_manifest, no_pipeline};
use log::info;

/// Check that a compiled module resolves every entry point of its manifest.
#[derive(Parser, Debug)]
struct Args {
    #[arg(short, long)]
    lib_path: PathBuf,

    #[arg(short, long)]
    manifest_path: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let manifest_bytes = read(&args.manifest_path).with_context(|| {
        format!(
            "failed to read manifest file '{}'",
            args.manifest_path.display()
        )
    })?;
    let manifest = deserialize_manifest(&manifest_bytes).with_context(|| {
        format!(
            "failed to parse manifest file '{}'",
            args.manifest_path.display()
        )
    })?;
    let Some(first) = manifest.functions.first() else {
        bail!(
            "manifest file '{}' lists no functions",
            args.manifest_path.display()
        );
    };

    // The engine resolves every manifest function, not just the named one.
    // SAFETY: validating a module means trusting its initializers to run.
    let module = unsafe { LibraryModule::new(&args.lib_path, &manifest) };
    CompiledFunctionHandle::create(&first.name, module, no_pipeline, None).with_context(|| {
        format!(
            "failed to load module '{}'",
            args.lib_path.display()
        )
    })?;

    info!(
        "Module '{}' resolves all {} manifest functions",
        args.lib_path.display(),
        manifest.functions.len()
    );
    Ok(())
}
