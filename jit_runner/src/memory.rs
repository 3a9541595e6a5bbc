//! Host memory for tensor inputs and collection of compiled outputs.

use std::collections::HashSet;

use anyhow::{Context, Result};
use jit_runner::{InvocationResult, TensorBuffer, Value, ValueData};
use log::debug;

/// Keeps input tensor storage alive while compiled code reads it.
pub(crate) struct InputStorage(Vec<Vec<u64>>);

/// Turn wire values into call values, staging tensor data in host memory.
pub(crate) fn stage_inputs(values: Vec<ValueData>) -> Result<(InputStorage, Vec<Value>)> {
    let mut storage = Vec::new();
    let mut staged = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match value {
            ValueData::Scalar { value } => staged.push(Value::Scalar(value)),
            ValueData::Tensor { sizes, mut values } => {
                let tensor = TensorBuffer::contiguous(&mut values, &sizes)
                    .with_context(|| format!("invalid tensor for input {index}"))?;
                // The heap allocation does not move with the Vec.
                storage.push(values);
                staged.push(Value::Tensor(tensor));
            }
        }
    }
    Ok((InputStorage(storage), staged))
}

impl InputStorage {
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Copy outputs into wire values, then release the compiled runtime's buffers.
///
/// Every output is read before any buffer is released; buffers sharing a
/// base pointer are released once.
pub(crate) fn collect_outputs(result: InvocationResult) -> Vec<ValueData> {
    let mut outputs = Vec::with_capacity(result.len());
    let mut owned = Vec::new();
    let mut seen = HashSet::new();
    for value in result {
        match value {
            Value::Scalar(value) => outputs.push(ValueData::Scalar { value }),
            Value::Tensor(tensor) => {
                // SAFETY: the compiled function returned this descriptor and
                // nothing has been released yet.
                let values = unsafe { tensor.read_elements() };
                outputs.push(ValueData::Tensor {
                    sizes: tensor.sizes().to_vec(),
                    values,
                });
                if !tensor.base_ptr().is_null() && seen.insert(tensor.base_ptr()) {
                    owned.push(tensor);
                }
            }
        }
    }

    debug!("Releasing {} output buffers", owned.len());
    for tensor in owned {
        // SAFETY: compiled code allocates results with malloc and each base
        // appears once in `owned`.
        unsafe { tensor.release() };
    }
    outputs
}
