//! Flattened tensor values and invocation results.

use std::ffi::c_void;
use std::fmt;

use crate::error::MarshalError;

/// One pointer-sized word of the packed calling convention.
///
/// A slot holds either a bare scalar bit pattern or a pointer written by the
/// compiled code, so it is kept as an address-sized integer.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawSlot(usize);

impl RawSlot {
    pub const NULL: RawSlot = RawSlot(0);

    pub fn from_word(word: u64) -> Self {
        Self(word as usize)
    }

    pub fn word(self) -> u64 {
        self.0 as u64
    }

    pub fn from_usize(value: usize) -> Self {
        Self(value)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }

    pub fn from_ptr<T>(ptr: *mut T) -> Self {
        Self(ptr.expose_provenance())
    }

    pub fn as_ptr<T>(self) -> *mut T {
        std::ptr::with_exposed_provenance_mut(self.0)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for RawSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSlot({:#x})", self.0)
    }
}

/// Flattened tensor: base and data pointers, element offset, sizes, strides.
///
/// Used for clear tensors and for ciphertexts alike; an encrypted value has
/// one trailing dimension holding the ciphertext vector. Construction keeps
/// `sizes` and `strides` the same length.
///
/// A decoded buffer does not own its memory. The compiled runtime allocated
/// it with the C allocator and the caller of `call` releases it with
/// [`TensorBuffer::release`] once done.
#[derive(Clone, PartialEq, Eq)]
pub struct TensorBuffer {
    base: *mut u64,
    data: *mut u64,
    offset: usize,
    sizes: Vec<usize>,
    strides: Vec<usize>,
}

impl TensorBuffer {
    pub fn from_raw_parts(
        base: *mut u64,
        data: *mut u64,
        offset: usize,
        sizes: Vec<usize>,
        strides: Vec<usize>,
    ) -> Result<Self, MarshalError> {
        if sizes.len() != strides.len() {
            return Err(MarshalError::StrideCount {
                sizes: sizes.len(),
                strides: strides.len(),
            });
        }
        Ok(Self {
            base,
            data,
            offset,
            sizes,
            strides,
        })
    }

    /// Row-major view over caller-owned memory.
    ///
    /// The returned buffer borrows nothing; `data` must stay alive and
    /// unmoved for as long as the buffer is handed to compiled code.
    pub fn contiguous(data: &mut [u64], sizes: &[usize]) -> Result<Self, MarshalError> {
        let expected: usize = sizes.iter().product();
        if expected != data.len() {
            return Err(MarshalError::ElementCount {
                expected,
                got: data.len(),
            });
        }
        let mut strides = vec![1; sizes.len()];
        for dim in (0..sizes.len().saturating_sub(1)).rev() {
            strides[dim] = strides[dim + 1] * sizes[dim + 1];
        }
        let ptr = data.as_mut_ptr();
        Self::from_raw_parts(ptr, ptr, 0, sizes.to_vec(), strides)
    }

    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    pub fn base_ptr(&self) -> *mut u64 {
        self.base
    }

    pub fn data_ptr(&self) -> *mut u64 {
        self.data
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn num_elements(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Gather the elements in row-major order, following offset and strides.
    ///
    /// # Safety
    ///
    /// `data` must point at live memory covering every strided position.
    pub unsafe fn read_elements(&self) -> Vec<u64> {
        let total = self.num_elements();
        let mut elements = Vec::with_capacity(total);
        let mut index = vec![0usize; self.rank()];
        for _ in 0..total {
            let linear = self.offset
                + index
                    .iter()
                    .zip(&self.strides)
                    .map(|(i, stride)| i * stride)
                    .sum::<usize>();
            // SAFETY: the caller guarantees the strided range is readable.
            elements.push(unsafe { self.data.add(linear).read() });
            for dim in (0..self.rank()).rev() {
                index[dim] += 1;
                if index[dim] < self.sizes[dim] {
                    break;
                }
                index[dim] = 0;
            }
        }
        elements
    }

    /// Return the allocation to the C allocator.
    ///
    /// A null base pointer is left alone.
    ///
    /// # Safety
    ///
    /// `base` must come from `malloc` in this process and must not be
    /// released twice, including through clones of this buffer.
    pub unsafe fn release(self) {
        if !self.base.is_null() {
            // SAFETY: upheld by the caller.
            unsafe { libc::free(self.base.cast::<c_void>()) };
        }
    }
}

impl fmt::Debug for TensorBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorBuffer")
            .field("base", &self.base)
            .field("data", &self.data)
            .field("offset", &self.offset)
            .field("sizes", &self.sizes)
            .field("strides", &self.strides)
            .finish()
    }
}

/// A value crossing the calling convention: a bare scalar or a tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(u64),
    Tensor(TensorBuffer),
}

impl Value {
    pub fn as_scalar(&self) -> Option<u64> {
        match self {
            Value::Scalar(value) => Some(*value),
            Value::Tensor(_) => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&TensorBuffer> {
        match self {
            Value::Scalar(_) => None,
            Value::Tensor(tensor) => Some(tensor),
        }
    }
}

/// Decoded outputs of one call, in output gate order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationResult {
    values: Vec<Value>,
}

impl InvocationResult {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl IntoIterator for InvocationResult {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_strides_are_row_major() {
        let mut data = vec![0u64; 24];
        let tensor = TensorBuffer::contiguous(&mut data, &[2, 3, 4]).unwrap();
        assert_eq!(tensor.rank(), 3);
        assert_eq!(tensor.strides(), &[12, 4, 1]);
        assert_eq!(tensor.num_elements(), 24);
    }

    #[test]
    fn contiguous_rejects_wrong_element_count() {
        let mut data = vec![0u64; 5];
        let err = TensorBuffer::contiguous(&mut data, &[2, 3]).unwrap_err();
        assert_eq!(
            err,
            MarshalError::ElementCount {
                expected: 6,
                got: 5
            }
        );
    }

    #[test]
    fn raw_parts_keep_sizes_and_strides_aligned() {
        let err = TensorBuffer::from_raw_parts(
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
            vec![2, 2],
            vec![2],
        )
        .unwrap_err();
        assert_eq!(err, MarshalError::StrideCount { sizes: 2, strides: 1 });
    }

    #[test]
    fn read_elements_follows_offset_and_strides() {
        let mut data: Vec<u64> = (0..12).collect();
        let ptr = data.as_mut_ptr();
        // Column 1 of a 3x4 row-major matrix, read as a 3-vector.
        let column = TensorBuffer::from_raw_parts(ptr, ptr, 1, vec![3], vec![4]).unwrap();
        assert_eq!(unsafe { column.read_elements() }, vec![1, 5, 9]);

        let transposed = TensorBuffer::from_raw_parts(ptr, ptr, 0, vec![4, 3], vec![1, 4]).unwrap();
        assert_eq!(
            unsafe { transposed.read_elements() },
            vec![0, 4, 8, 1, 5, 9, 2, 6, 10, 3, 7, 11]
        );
    }

    #[test]
    fn release_frees_malloc_allocation() {
        let base = unsafe { libc::malloc(4 * size_of::<u64>()) }.cast::<u64>();
        assert!(!base.is_null());
        let tensor = TensorBuffer::from_raw_parts(base, base, 0, vec![4], vec![1]).unwrap();
        unsafe { tensor.release() };

        let null = TensorBuffer::from_raw_parts(
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
            vec![],
            vec![],
        )
        .unwrap();
        unsafe { null.release() };
    }

    #[test]
    fn slot_round_trips_words_and_pointers() {
        assert_eq!(RawSlot::from_word(42).word(), 42);
        let mut value = 7u64;
        let slot = RawSlot::from_ptr(&mut value as *mut u64);
        assert!(!slot.is_null());
        assert_eq!(unsafe { *slot.as_ptr::<u64>() }, 7);
        assert!(RawSlot::NULL.is_null());
    }
}
