use tessel_core::{invert_permutation, Array, Result};

use super::accumulate;
use crate::transpose::transpose;

/// Transpose is a permutation of elements, so its gradient is the inverse
/// permutation of the incoming gradient: the same 2D swap when `axes` is
/// `None`, otherwise a transpose by the inverse of `axes`.
///
/// The permuted gradient goes through a scratch array before being added
/// into `dst`.
pub fn transpose_grad(gradient: &Array, axes: Option<&[usize]>, dst: &mut Array) -> Result<()> {
    log::trace!("transpose_grad {} axes={:?} -> {}", gradient.shape(), axes, dst.shape());
    let mut permuted = Array::try_zeros(dst.shape().clone())?;
    match axes {
        None => transpose(&mut permuted, gradient, None)?,
        Some(axes) => {
            let inv = invert_permutation(axes)?;
            transpose(&mut permuted, gradient, Some(inv.as_slice()))?;
        }
    }
    accumulate(dst, &permuted)
}
