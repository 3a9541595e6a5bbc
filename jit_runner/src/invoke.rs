//! One call through a compiled function handle.
//!
//! A call assembles the packed vector, validates it, dispatches it to the
//! engine and decodes the output region:
//!
//! ```text
//! Assembling -> Validated -> Invoking -> Decoding -> Complete
//! ```
//!
//! Any step may fail; there is no partial result.

use std::ffi::c_void;

use log::{debug, trace};

use crate::engine::ExecutionEngine;
use crate::error::{CallError, MarshalError};
use crate::gate::ClientParameters;
use crate::handle::CompiledFunctionHandle;
use crate::marshal::{decode_outputs, encode};
use crate::packed::{PackedArgs, PackedArgsBuilder};
use crate::tensor::{InvocationResult, RawSlot, Value};

/// Opaque handle to execution-time services of the compiled code.
///
/// Owned by the caller and passed by reference into every call.
#[derive(Debug, Default)]
pub struct RuntimeContext {
    raw: RawSlot,
}

impl RuntimeContext {
    /// A context for code that uses no runtime services.
    pub fn null() -> Self {
        Self::default()
    }

    /// Wrap a context object built by the compiled runtime. It must outlive
    /// every call it is used for.
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self {
            raw: RawSlot::from_ptr(ptr),
        }
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.raw.as_ptr()
    }

    fn slot(&self) -> &RawSlot {
        &self.raw
    }
}

/// Per-call inputs: flattened input words, the runtime context and the gate
/// metadata of the function.
///
/// Each input gate occupies `slots(gate)` words starting at its offset.
/// Gates never set stay missing and make the call fail with
/// [`CallError::NullArgument`].
#[derive(Debug)]
pub struct PreparedArguments<'ctx> {
    parameters: ClientParameters,
    offsets: Vec<usize>,
    inputs: Vec<Option<RawSlot>>,
    context: &'ctx RuntimeContext,
}

impl<'ctx> PreparedArguments<'ctx> {
    pub fn new(parameters: ClientParameters, context: &'ctx RuntimeContext) -> Self {
        let offsets = parameters.input_offsets();
        let inputs = vec![None; parameters.input_slot_count()];
        Self {
            parameters,
            offsets,
            inputs,
            context,
        }
    }

    /// Encode one value per input gate, in gate order.
    pub fn from_values(
        parameters: ClientParameters,
        context: &'ctx RuntimeContext,
        values: &[Value],
    ) -> Result<Self, MarshalError> {
        if values.len() != parameters.inputs.len() {
            return Err(MarshalError::InputCount {
                expected: parameters.inputs.len(),
                got: values.len(),
            });
        }
        let mut args = Self::new(parameters, context);
        for (gate, value) in values.iter().enumerate() {
            args.set_input(gate, value)?;
        }
        Ok(args)
    }

    /// Encode `value` into the words of input gate `gate`.
    ///
    /// Tensor values carry raw pointers; their memory must stay alive until
    /// the call returns.
    pub fn set_input(&mut self, gate: usize, value: &Value) -> Result<(), MarshalError> {
        let descriptor =
            self.parameters
                .inputs
                .get(gate)
                .ok_or(MarshalError::GateOutOfRange {
                    index: gate,
                    count: self.parameters.inputs.len(),
                })?;
        let words = encode(descriptor, value)?;
        let start = self.offsets[gate];
        for (target, word) in self.inputs[start..start + words.len()]
            .iter_mut()
            .zip(words)
        {
            *target = Some(word);
        }
        Ok(())
    }

    pub fn parameters(&self) -> &ClientParameters {
        &self.parameters
    }

    pub fn inputs(&self) -> &[Option<RawSlot>] {
        &self.inputs
    }

    pub fn context(&self) -> &RuntimeContext {
        self.context
    }

    /// Whether every input word has been prepared.
    pub fn is_complete(&self) -> bool {
        self.inputs.iter().all(Option::is_some)
    }
}

impl<E: ExecutionEngine> CompiledFunctionHandle<E> {
    /// Run the function once and decode its outputs in output gate order.
    ///
    /// The returned tensors point at memory allocated by the compiled
    /// runtime; the caller owns it (see [`crate::TensorBuffer::release`]).
    ///
    /// # Safety
    ///
    /// The module behind this handle must implement the packed calling
    /// convention described by `args.parameters()`, and every tensor input
    /// must point at live memory of the encoded shape.
    pub unsafe fn call(&self, args: &PreparedArguments<'_>) -> Result<InvocationResult, CallError> {
        let outputs = &args.parameters().outputs;
        let mut region = vec![RawSlot::NULL; args.parameters().output_slot_count()];
        debug!(
            "Calling '{}' with {} input slots and {} output slots",
            self.name(),
            args.inputs().len(),
            region.len()
        );

        {
            let mut builder = PackedArgsBuilder::with_capacity(args.inputs().len() + 1 + region.len());
            for word in args.inputs() {
                builder.input(word.as_ref())?;
            }
            builder.context(args.context().slot())?;
            for word in region.iter_mut() {
                builder.output(word)?;
            }
            let mut packed = builder.finish()?;
            // SAFETY: forwarded to the caller.
            unsafe { self.invoke_raw(&mut packed) }?;
        }

        let values = decode_outputs(outputs, &region)?;
        Ok(InvocationResult::new(values))
    }

    /// Dispatch an already validated packed vector.
    ///
    /// # Safety
    ///
    /// Same contract as [`CompiledFunctionHandle::call`].
    pub unsafe fn invoke_raw(&self, packed: &mut PackedArgs<'_>) -> Result<(), CallError> {
        let signature = self.signature();
        if packed.len() != signature.arity() {
            return Err(CallError::ArityMismatch {
                name: self.name().to_string(),
                expected: signature.arity(),
                got: packed.len(),
            });
        }
        trace!(
            "Packed layout for '{}': {:?}",
            self.name(),
            packed.roles().collect::<Vec<_>>()
        );

        let engine = self.lock_engine();
        // SAFETY: forwarded to the caller.
        unsafe { engine.invoke_packed(self.name(), packed.as_mut_slice()) }.map_err(|message| {
            CallError::InvocationFailed {
                name: self.name().to_string(),
                message,
            }
        })
    }
}
