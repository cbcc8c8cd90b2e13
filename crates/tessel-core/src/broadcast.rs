use crate::array::Array;
use crate::error::{Error, Result};
use crate::shape::Shape;

// Broadcasting: NumPy-style stride substitution
//
// Broadcasting never copies data. Instead, a source array is given a stride
// vector expressed in the *target* shape's axes:
//
//   - axes are aligned from the right (trailing dimensions)
//   - equal sizes keep the source stride
//   - a source size of 1 against a larger target gets stride 0, so every
//     target coordinate along that axis reads the same element
//   - target axes the source does not have (leading padding) get stride 0
//
// Given those strides, `flat_to_offset` turns a row-major flat index in the
// target shape into the buffer offset of the element that should be read.
//
// Example: source [4] (strides [1]) broadcast to [3, 4]
//   broadcast strides = [0, 1]
//   flat 6 → coords (1, 2) → offset 1*0 + 2*1 = 2

/// Stride vector that maps `target` coordinates onto `source`'s buffer.
pub fn broadcast_stride(source: &Array, target: &Shape) -> Result<Vec<usize>> {
    broadcast_stride_raw(source.shape(), source.strides(), target)
}

/// Same as [`broadcast_stride`] for bare shape/stride metadata.
pub fn broadcast_stride_raw(shape: &Shape, strides: &[usize], target: &Shape) -> Result<Vec<usize>> {
    let src = shape.dims();
    let dst = target.dims();
    if src.len() > dst.len() {
        return Err(Error::RankMismatch {
            expected: dst.len(),
            got: src.len(),
        });
    }

    let mut result = vec![0usize; dst.len()];
    let offset = dst.len() - src.len();
    for (j, (&from, &stride)) in src.iter().zip(strides).enumerate() {
        let to = dst[j + offset];
        result[j + offset] = if from == to {
            stride
        } else if from == 1 {
            0
        } else {
            return Err(Error::InvalidBroadcast {
                from,
                to,
                src: shape.clone(),
                dst: target.clone(),
            });
        };
    }
    Ok(result)
}

/// Buffer offset for a row-major flat index into `target`, read through
/// `strides` (typically produced by [`broadcast_stride`]).
#[inline]
pub fn flat_to_offset(flat_index: usize, target: &[usize], strides: &[usize]) -> usize {
    let mut idx = flat_index;
    let mut offset = 0;
    for d in (0..target.len()).rev() {
        let n = target[d];
        offset += (idx % n) * strides[d];
        idx /= n;
    }
    offset
}

/// Offset of batch `batch_index` when only the leading `num_leading_dims`
/// axes of `shape` are enumerated (row-major, last batch axis fastest).
///
/// Used by matmul to find the start of each matrix slice. Passing broadcast
/// strides makes size-1 batch axes repeat the same slice.
#[inline]
pub fn batch_offset(batch_index: usize, shape: &[usize], strides: &[usize], num_leading_dims: usize) -> usize {
    flat_to_offset(batch_index, &shape[..num_leading_dims], &strides[..num_leading_dims])
}

/// Broadcast union of two shapes.
///
///   [3, 4] and [4]       → [3, 4]
///   [2, 1] and [1, 3]    → [2, 3]
///   [5, 3, 1] and [3, 4] → [5, 3, 4]
///   [3] and [4]          → error
pub fn broadcast_shape(lhs: &Shape, rhs: &Shape) -> Result<Shape> {
    let l = lhs.dims();
    let r = rhs.dims();
    let rank = l.len().max(r.len());
    let mut result = Vec::with_capacity(rank);

    for i in 0..rank {
        let ld = if i < l.len() { l[l.len() - 1 - i] } else { 1 };
        let rd = if i < r.len() { r[r.len() - 1 - i] } else { 1 };
        if ld == rd || rd == 1 {
            result.push(ld);
        } else if ld == 1 {
            result.push(rd);
        } else {
            return Err(Error::InvalidBroadcast {
                from: rd,
                to: ld,
                src: rhs.clone(),
                dst: lhs.clone(),
            });
        }
    }

    result.reverse();
    Ok(Shape::new(result))
}

/// Axes of `target` that were broadcast out of `source`: leading axes the
/// source lacks, plus axes where the source has size 1 and the target does
/// not. Summing a target-shaped gradient over these axes restores the
/// source's shape.
pub fn broadcast_axes(source: &Shape, target: &Shape) -> Vec<usize> {
    let src = source.dims();
    let dst = target.dims();
    let offset = dst.len().saturating_sub(src.len());
    (0..dst.len())
        .filter(|&d| d < offset || (src[d - offset] == 1 && dst[d] != 1))
        .collect()
}
