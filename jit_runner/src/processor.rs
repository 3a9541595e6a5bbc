//! Argument preparation and function execution.

use anyhow::{Context, Result};
use jit_runner::{
    ClientParameters, CompiledFunctionHandle, ExecutionEngine, InvocationResult,
    PreparedArguments, RuntimeContext, Value,
};
use log::info;

/// Encode inputs against the function's gates and run it once.
pub(crate) fn run_function<E: ExecutionEngine>(
    handle: &CompiledFunctionHandle<E>,
    parameters: ClientParameters,
    context: &RuntimeContext,
    inputs: &[Value],
) -> Result<InvocationResult> {
    let args = PreparedArguments::from_values(parameters, context, inputs)
        .context("failed to encode parameters for the function's input gates")?;
    info!(
        "Prepared {} input slots for function '{}'",
        args.inputs().len(),
        handle.name()
    );

    // SAFETY: gates come from the module's own manifest and tensor inputs
    // are staged in memory the caller keeps alive across this call.
    let result = unsafe { handle.call(&args) }.context("program execution failed")?;
    info!(
        "Function '{}' returned {} outputs",
        handle.name(),
        result.len()
    );
    Ok(result)
}
