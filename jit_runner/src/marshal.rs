//! Calling-convention translation between gates and raw pointer-sized slots.
//!
//! # Slot layout
//!
//! A clear scalar gate is a single slot holding the value's bit pattern.
//! Every other gate is a flattened tensor descriptor of effective rank `r`
//! (declared rank, plus one for the ciphertext vector when encrypted):
//!
//! ```text
//! [base][data][offset][size_0 .. size_r-1][stride_0 .. stride_r-1]
//! ```
//!
//! for `3 + 2r` slots. Inputs and outputs follow the same rule, gate by gate
//! and in gate order; a skipped or reordered gate shifts every later one.

use crate::error::MarshalError;
use crate::gate::GateDescriptor;
use crate::tensor::{RawSlot, TensorBuffer, Value};

/// Base pointer, data pointer and element offset.
const DESCRIPTOR_HEADER_SLOTS: usize = 3;

/// Slot count of a flattened tensor descriptor of the given rank.
pub fn descriptor_slots(rank: usize) -> usize {
    DESCRIPTOR_HEADER_SLOTS + 2 * rank
}

/// Number of raw slots a gate occupies.
pub fn slots(gate: &GateDescriptor) -> usize {
    if gate.is_clear_scalar() {
        1
    } else {
        descriptor_slots(gate.effective_rank())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Scalar(_) => "scalar",
        Value::Tensor(_) => "tensor",
    }
}

fn expected_kind(gate: &GateDescriptor) -> &'static str {
    if gate.is_clear_scalar() {
        "scalar"
    } else {
        "tensor"
    }
}

/// Flatten a value into the `slots(gate)` words the gate occupies.
pub fn encode(gate: &GateDescriptor, value: &Value) -> Result<Vec<RawSlot>, MarshalError> {
    match (gate.is_clear_scalar(), value) {
        (true, Value::Scalar(word)) => Ok(vec![RawSlot::from_word(*word)]),
        (false, Value::Tensor(tensor)) => {
            let rank = gate.effective_rank();
            if tensor.rank() != rank {
                return Err(MarshalError::RankMismatch {
                    expected: rank,
                    got: tensor.rank(),
                });
            }
            let mut words = Vec::with_capacity(descriptor_slots(rank));
            words.push(RawSlot::from_ptr(tensor.base_ptr()));
            words.push(RawSlot::from_ptr(tensor.data_ptr()));
            words.push(RawSlot::from_usize(tensor.offset()));
            words.extend(tensor.sizes().iter().copied().map(RawSlot::from_usize));
            words.extend(tensor.strides().iter().copied().map(RawSlot::from_usize));
            Ok(words)
        }
        (_, value) => Err(MarshalError::KindMismatch {
            expected: expected_kind(gate),
            got: kind(value),
        }),
    }
}

/// Rebuild a value from exactly `slots(gate)` words.
pub fn decode(gate: &GateDescriptor, words: &[RawSlot]) -> Result<Value, MarshalError> {
    let expected = slots(gate);
    if words.len() != expected {
        return Err(MarshalError::RegionLength {
            expected,
            got: words.len(),
        });
    }
    if gate.is_clear_scalar() {
        return Ok(Value::Scalar(words[0].word()));
    }

    let rank = gate.effective_rank();
    let (header, dims) = words.split_at(DESCRIPTOR_HEADER_SLOTS);
    let (sizes, strides) = dims.split_at(rank);
    let tensor = TensorBuffer::from_raw_parts(
        header[0].as_ptr(),
        header[1].as_ptr(),
        header[2].as_usize(),
        sizes.iter().map(|s| s.as_usize()).collect(),
        strides.iter().map(|s| s.as_usize()).collect(),
    )?;
    Ok(Value::Tensor(tensor))
}

/// Walks an output region gate by gate.
pub struct OutputCursor<'a> {
    region: &'a [RawSlot],
    position: usize,
}

impl<'a> OutputCursor<'a> {
    pub fn new(region: &'a [RawSlot]) -> Self {
        Self {
            region,
            position: 0,
        }
    }

    /// Slots consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.region.len() - self.position
    }

    /// Decode the next gate and advance past its slots.
    pub fn next_value(&mut self, gate: &GateDescriptor) -> Result<Value, MarshalError> {
        let count = slots(gate);
        if count > self.remaining() {
            return Err(MarshalError::RegionLength {
                expected: self.position + count,
                got: self.region.len(),
            });
        }
        let value = decode(gate, &self.region[self.position..self.position + count])?;
        self.position += count;
        Ok(value)
    }
}

/// Decode a whole output region, one value per gate.
///
/// The region must hold exactly the summed slot counts of `gates`.
pub fn decode_outputs(
    gates: &[GateDescriptor],
    region: &[RawSlot],
) -> Result<Vec<Value>, MarshalError> {
    let expected: usize = gates.iter().map(slots).sum();
    if region.len() != expected {
        return Err(MarshalError::RegionLength {
            expected,
            got: region.len(),
        });
    }
    let mut cursor = OutputCursor::new(region);
    gates.iter().map(|gate| cursor.next_value(gate)).collect()
}
