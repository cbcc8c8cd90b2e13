use std::fmt;

use crate::error::{Error, Result};

// Shape: dimension sizes of an array
//
// A Shape is an ordered list of positive dimension sizes. Kernels only ever
// see ranks >= 1, but the type itself allows the empty shape so that a full
// reduction can describe its scalar result either as [] or as [1].
//
// Besides the element count, the shape determines the default row-major
// strides. For shape [2, 3, 4] they are [12, 4, 1]: the last axis is
// contiguous and each earlier stride is the product of all later sizes.

/// N-dimensional shape of an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Shape from explicit dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (product of all dimensions). `[]` has 1.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    /// Size of a specific dimension.
    pub fn dim(&self, d: usize) -> Result<usize> {
        self.0.get(d).copied().ok_or(Error::DimOutOfRange {
            dim: d,
            rank: self.rank(),
        })
    }

    /// Row-major (C-order) strides for this shape.
    pub fn stride_contiguous(&self) -> Vec<usize> {
        contiguous_strides(&self.0)
    }

    /// Left-pad with 1s up to `rank`. Shapes already at or above `rank` are
    /// returned unchanged.
    ///
    /// `[3, 4].pad_to(4)` → `[1, 1, 3, 4]`
    pub fn pad_to(&self, rank: usize) -> Shape {
        if self.rank() >= rank {
            return self.clone();
        }
        let mut dims = vec![1usize; rank];
        let offset = rank - self.rank();
        dims[offset..].copy_from_slice(&self.0);
        Shape(dims)
    }

    /// The shape obtained by reordering axes: `result[j] = self[axes[j]]`.
    pub fn permute(&self, axes: &[usize]) -> Result<Shape> {
        check_permutation(axes, self.rank())?;
        Ok(Shape(axes.iter().map(|&a| self.0[a]).collect()))
    }
}

/// Row-major strides for raw dimension sizes.
pub fn contiguous_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; dims.len()];
    if let Some(last) = strides.last_mut() {
        *last = 1;
        for i in (0..dims.len() - 1).rev() {
            strides[i] = strides[i + 1] * dims[i + 1];
        }
    }
    strides
}

fn check_permutation(axes: &[usize], rank: usize) -> Result<()> {
    let mut seen = vec![false; rank];
    if axes.len() != rank {
        return Err(Error::InvalidPermutation {
            axes: axes.to_vec(),
        });
    }
    for &a in axes {
        if a >= rank || seen[a] {
            return Err(Error::InvalidPermutation {
                axes: axes.to_vec(),
            });
        }
        seen[a] = true;
    }
    Ok(())
}

/// Inverse of an axis permutation: `inv[axes[i]] = i`.
///
/// Transposing by `axes` and then by the returned permutation is the identity.
pub fn invert_permutation(axes: &[usize]) -> Result<Vec<usize>> {
    check_permutation(axes, axes.len())?;
    let mut inv = vec![0usize; axes.len()];
    for (i, &a) in axes.iter().enumerate() {
        inv[a] = i;
    }
    Ok(inv)
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<usize> for Shape {
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

impl From<(usize,)> for Shape {
    fn from((d0,): (usize,)) -> Self {
        Shape(vec![d0])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((d0, d1): (usize, usize)) -> Self {
        Shape(vec![d0, d1])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((d0, d1, d2): (usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2])
    }
}

impl From<(usize, usize, usize, usize)> for Shape {
    fn from((d0, d1, d2, d3): (usize, usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2, d3])
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(a: [usize; N]) -> Self {
        Shape(a.to_vec())
    }
}
