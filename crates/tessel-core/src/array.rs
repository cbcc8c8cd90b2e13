use crate::error::{Error, Result};
use crate::shape::{contiguous_strides, Shape};

// Array: the dense f32 buffer every kernel reads and writes
//
// An Array binds three things together: its Shape, one stride per axis, and
// the flat buffer the strides address. Keeping them in one value means shape
// metadata can never outlive (or under-live) the data it describes.
//
// Arrays are always freshly owned buffers. There are no views: two arrays
// never share storage, so a kernel writing into `out` can never observe its
// own writes through an input.
//
// Strides are usually row-major, but callers may install any strides that
// stay inside the buffer and give every element its own offset (see
// `set_strides`). Every kernel resolves offsets
// through the strides rather than assuming contiguity, except the reduction
// fast path, which checks `is_contiguous()` first.

/// Dense N-dimensional `f32` array with explicit shape and strides.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    shape: Shape,
    strides: Vec<usize>,
    data: Vec<f32>,
}

impl Array {
    /// Zero-filled contiguous array.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, 0.0)
    }

    /// Contiguous array with every element set to `value`.
    pub fn full(shape: impl Into<Shape>, value: f32) -> Self {
        let shape = shape.into();
        let strides = shape.stride_contiguous();
        let data = vec![value; shape.elem_count()];
        Array {
            shape,
            strides,
            data,
        }
    }

    /// Zero-filled array whose allocation failure is reported instead of
    /// aborting. Kernels use this for their scratch buffers.
    pub fn try_zeros(shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        let elements = shape.elem_count();
        let mut data = Vec::new();
        data.try_reserve_exact(elements)
            .map_err(|_| Error::AllocationFailure { elements })?;
        data.resize(elements, 0.0);
        Ok(Array {
            strides: shape.stride_contiguous(),
            shape,
            data,
        })
    }

    /// Contiguous array over an existing row-major buffer.
    pub fn from_vec(data: Vec<f32>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.elem_count();
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Array {
            strides: shape.stride_contiguous(),
            shape,
            data,
        })
    }

    /// Array with explicit strides. The buffer must hold exactly
    /// `product(shape)` elements, and the strides must map the elements onto
    /// distinct offsets inside it.
    pub fn from_parts(shape: impl Into<Shape>, strides: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let mut array = Self::from_vec(data, shape)?;
        array.set_strides(strides)?;
        Ok(array)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn ndim(&self) -> usize {
        self.shape.rank()
    }

    /// Total number of elements. Always equal to `data().len()`.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Replace the strides. Rejects stride vectors of the wrong length, ones
    /// that would address past the end of the buffer, and ones that send two
    /// elements to the same offset.
    pub fn set_strides(&mut self, strides: Vec<usize>) -> Result<()> {
        let valid = strides.len() == self.ndim()
            && (self.data.is_empty()
                || (self.max_offset(&strides) < self.data.len() && self.strides_disjoint(&strides)));
        if !valid {
            return Err(Error::InvalidStrides {
                shape: self.shape.clone(),
                strides,
                len: self.data.len(),
            });
        }
        self.strides = strides;
        Ok(())
    }

    /// Reset strides to row-major for the current shape.
    pub fn reset_strides(&mut self) {
        self.strides = self.shape.stride_contiguous();
    }

    /// Whether the strides are the row-major strides of the shape.
    pub fn is_contiguous(&self) -> bool {
        self.strides == contiguous_strides(self.shape.dims())
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Buffer offset of a multi-dimensional index: `sum(index[i] * stride[i])`.
    pub fn offset_of(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(self.strides.iter())
            .map(|(&i, &s)| i * s)
            .sum()
    }

    /// Element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Result<f32> {
        if index.len() != self.ndim() {
            return Err(Error::RankMismatch {
                expected: self.ndim(),
                got: index.len(),
            });
        }
        for (d, (&i, &n)) in index.iter().zip(self.dims()).enumerate() {
            if i >= n {
                return Err(Error::DimOutOfRange { dim: d, rank: self.ndim() });
            }
        }
        Ok(self.data[self.offset_of(index)])
    }

    /// Elements in logical row-major order, following the strides.
    pub fn to_vec(&self) -> Vec<f32> {
        if self.is_contiguous() {
            return self.data.clone();
        }
        let dims = self.dims();
        let mut out = Vec::with_capacity(self.size());
        let mut index = vec![0usize; dims.len()];
        for _ in 0..self.size() {
            out.push(self.data[self.offset_of(&index)]);
            for d in (0..dims.len()).rev() {
                index[d] += 1;
                if index[d] < dims[d] {
                    break;
                }
                index[d] = 0;
            }
        }
        out
    }

    fn max_offset(&self, strides: &[usize]) -> usize {
        self.dims()
            .iter()
            .zip(strides)
            .map(|(&n, &s)| n.saturating_sub(1) * s)
            .sum()
    }

    // With axes ordered by stride, each stride must step over the whole
    // extent of the axes below it. Size-1 axes never move and are skipped.
    fn strides_disjoint(&self, strides: &[usize]) -> bool {
        let mut axes: Vec<(usize, usize)> = self
            .dims()
            .iter()
            .copied()
            .zip(strides.iter().copied())
            .filter(|&(n, _)| n > 1)
            .collect();
        axes.sort_by_key(|&(_, s)| s);
        let mut extent = 1;
        for (n, s) in axes {
            if s < extent {
                return false;
            }
            extent = s * n;
        }
        true
    }
}
