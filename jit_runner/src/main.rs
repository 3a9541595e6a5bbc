use anyhow::{Context, Result};
use clap::Parser;
use jit_runner::{RuntimeContext, deserialize_parameters_payload, serialize_outputs};
use log::info;

mod cli;
mod io;
mod loader;
mod memory;
mod processor;

use cli::Args;

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    // validate every input file before opening native code
    let manifest = loader::load_manifest(&args.manifest)?;
    let (parameters_bytes, params_source, version) = io::read_parameters(args.params.as_deref())?;
    let values = deserialize_parameters_payload(&parameters_bytes, version)
        .with_context(|| format!("failed to deserialize parameters from '{params_source}'"))?;

    let (handle, parameters) = loader::load_function(
        &args.lib,
        &manifest,
        &args.func,
        args.runtime_lib.as_deref(),
    )?;
    info!(
        "Successfully loaded function '{}' from module '{}'.",
        args.func,
        args.lib.display()
    );

    let (storage, inputs) = memory::stage_inputs(values)?;
    info!("Staged {} tensor inputs in host memory", storage.len());

    // Generated code reaches no runtime services through this runner.
    let context = RuntimeContext::null();
    let result = processor::run_function(&handle, parameters, &context, &inputs)?;
    drop(storage);

    let outputs = memory::collect_outputs(result);
    let output_bytes = serialize_outputs(&outputs).context("failed to serialize output")?;
    io::write_output(args.output.as_deref(), &output_bytes)?;

    Ok(())
}
