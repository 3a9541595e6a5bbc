//! Typed construction of the packed argument vector.
//!
//! The vector is `[inputs..][context][outputs..]`, each entry pointing at one
//! pointer-sized word. The builder enforces that order and a single context
//! slot; [`PackedArgsBuilder::finish`] rejects null entries.

use std::ffi::c_void;
use std::marker::PhantomData;

use crate::error::CallError;
use crate::tensor::RawSlot;

/// Role of one packed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    /// Word `i` of the flattened inputs.
    Input(usize),
    Context,
    /// Word `i` of the output region.
    Output(usize),
}

impl SlotRole {
    fn name(self) -> &'static str {
        match self {
            SlotRole::Input(_) => "input",
            SlotRole::Context => "context",
            SlotRole::Output(_) => "output",
        }
    }

    fn phase(self) -> u8 {
        match self {
            SlotRole::Input(_) => 0,
            SlotRole::Context => 1,
            SlotRole::Output(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PackedSlot {
    role: SlotRole,
    ptr: *mut c_void,
}

/// Builder for [`PackedArgs`]. Borrows every word it points at.
pub struct PackedArgsBuilder<'a> {
    slots: Vec<PackedSlot>,
    inputs: usize,
    outputs: usize,
    _words: PhantomData<&'a mut RawSlot>,
}

impl<'a> PackedArgsBuilder<'a> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            inputs: 0,
            outputs: 0,
            _words: PhantomData,
        }
    }

    fn push(&mut self, role: SlotRole, ptr: *mut c_void) -> Result<&mut Self, CallError> {
        let out_of_order = self.slots.last().is_some_and(|last| {
            last.role.phase() > role.phase() || (last.role == role && role == SlotRole::Context)
        });
        if out_of_order {
            return Err(CallError::SlotOutOfOrder {
                position: self.slots.len(),
                role: role.name(),
            });
        }
        self.slots.push(PackedSlot { role, ptr });
        Ok(self)
    }

    /// Append an input word. `None` marks an input that was never prepared.
    pub fn input(&mut self, word: Option<&'a RawSlot>) -> Result<&mut Self, CallError> {
        let ptr = word.map_or(std::ptr::null_mut(), |word| {
            (word as *const RawSlot).cast_mut().cast::<c_void>()
        });
        let role = SlotRole::Input(self.inputs);
        self.push(role, ptr)?;
        self.inputs += 1;
        Ok(self)
    }

    /// Append the runtime context word.
    pub fn context(&mut self, word: &'a RawSlot) -> Result<&mut Self, CallError> {
        self.push(
            SlotRole::Context,
            (word as *const RawSlot).cast_mut().cast::<c_void>(),
        )
    }

    /// Append an output word the callee writes into.
    pub fn output(&mut self, word: &'a mut RawSlot) -> Result<&mut Self, CallError> {
        let role = SlotRole::Output(self.outputs);
        self.push(role, (word as *mut RawSlot).cast::<c_void>())?;
        self.outputs += 1;
        Ok(self)
    }

    /// Validate and seal the vector.
    pub fn finish(self) -> Result<PackedArgs<'a>, CallError> {
        if !self.slots.iter().any(|slot| slot.role == SlotRole::Context) {
            return Err(CallError::MissingContext);
        }
        if let Some(position) = self.slots.iter().position(|slot| slot.ptr.is_null()) {
            return Err(CallError::NullArgument(position));
        }
        Ok(PackedArgs {
            pointers: self.slots.iter().map(|slot| slot.ptr).collect(),
            slots: self.slots,
            _words: PhantomData,
        })
    }
}

/// Validated packed argument vector, ready for dispatch.
pub struct PackedArgs<'a> {
    slots: Vec<PackedSlot>,
    pointers: Vec<*mut c_void>,
    _words: PhantomData<&'a mut RawSlot>,
}

impl PackedArgs<'_> {
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn roles(&self) -> impl Iterator<Item = SlotRole> + '_ {
        self.slots.iter().map(|slot| slot.role)
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [*mut c_void] {
        &mut self.pointers
    }
}
