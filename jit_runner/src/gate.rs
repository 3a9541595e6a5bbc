//! Gate metadata describing the inputs and outputs of a compiled function.

use serde::{Deserialize, Serialize};

use crate::marshal::slots;

/// Shape and encryption metadata for one input or output position.
///
/// Descriptors are fixed once a function is compiled. The same ordering must
/// be used at every call, otherwise adjacent gates read each other's slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDescriptor {
    /// Declared dimensions. Empty for scalars.
    pub dimensions: Vec<usize>,
    /// Whether the value is a ciphertext.
    pub is_encrypted: bool,
}

impl GateDescriptor {
    pub fn clear_scalar() -> Self {
        Self {
            dimensions: Vec::new(),
            is_encrypted: false,
        }
    }

    pub fn encrypted_scalar() -> Self {
        Self {
            dimensions: Vec::new(),
            is_encrypted: true,
        }
    }

    pub fn clear_tensor(dimensions: impl Into<Vec<usize>>) -> Self {
        Self {
            dimensions: dimensions.into(),
            is_encrypted: false,
        }
    }

    pub fn encrypted_tensor(dimensions: impl Into<Vec<usize>>) -> Self {
        Self {
            dimensions: dimensions.into(),
            is_encrypted: true,
        }
    }

    /// True when the gate travels as a single bare word.
    pub fn is_clear_scalar(&self) -> bool {
        self.dimensions.is_empty() && !self.is_encrypted
    }

    /// Declared rank plus one when encrypted (the ciphertext vector).
    pub fn effective_rank(&self) -> usize {
        self.dimensions.len() + usize::from(self.is_encrypted)
    }
}

/// Compile-time metadata of one entry point: its input and output gates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientParameters {
    pub inputs: Vec<GateDescriptor>,
    pub outputs: Vec<GateDescriptor>,
}

impl ClientParameters {
    pub fn new(inputs: Vec<GateDescriptor>, outputs: Vec<GateDescriptor>) -> Self {
        Self { inputs, outputs }
    }

    /// Number of raw words occupied by all flattened inputs.
    pub fn input_slot_count(&self) -> usize {
        self.inputs.iter().map(slots).sum()
    }

    /// Number of raw words the output region needs.
    pub fn output_slot_count(&self) -> usize {
        self.outputs.iter().map(slots).sum()
    }

    /// Offset of each input gate inside the flattened input sequence.
    pub fn input_offsets(&self) -> Vec<usize> {
        self.inputs
            .iter()
            .scan(0, |offset, gate| {
                let start = *offset;
                *offset += slots(gate);
                Some(start)
            })
            .collect()
    }

    /// Packed signature implied by these gates.
    pub fn function_type(&self) -> FunctionType {
        FunctionType {
            params: self.input_slot_count() + 1,
            results: self.output_slot_count(),
        }
    }
}

/// Declared signature of a packed entry point.
///
/// `params` counts the flattened inputs plus the runtime context; `results`
/// counts the output slots written by the callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionType {
    pub params: usize,
    pub results: usize,
}

impl FunctionType {
    /// Length of the packed argument vector.
    pub fn arity(&self) -> usize {
        self.params + self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_rank_counts_ciphertext_dimension() {
        assert_eq!(GateDescriptor::clear_scalar().effective_rank(), 0);
        assert_eq!(GateDescriptor::encrypted_scalar().effective_rank(), 1);
        assert_eq!(GateDescriptor::clear_tensor([2, 3]).effective_rank(), 2);
        assert_eq!(GateDescriptor::encrypted_tensor([2, 3]).effective_rank(), 3);
    }

    #[test]
    fn offsets_follow_gate_order() {
        let params = ClientParameters::new(
            vec![
                GateDescriptor::clear_scalar(),
                GateDescriptor::encrypted_tensor([4]),
                GateDescriptor::clear_scalar(),
            ],
            vec![GateDescriptor::encrypted_scalar()],
        );
        assert_eq!(params.input_offsets(), vec![0, 1, 8]);
        assert_eq!(params.input_slot_count(), 9);
        assert_eq!(params.output_slot_count(), 5);
        assert_eq!(
            params.function_type(),
            FunctionType {
                params: 10,
                results: 5
            }
        );
        assert_eq!(params.function_type().arity(), 15);
    }
}
