// Backward kernels: reverse-mode gradients, one per forward kernel
//
// Every backward kernel receives the gradient of the forward output
// (`gradient`, shaped like the forward output), an `Operand` saying which
// input's gradient to produce, the forward inputs it needs, and `dst`: the
// gradient accumulator of the selected operand, shaped like that operand.
//
// ACCUMULATION: kernels add into `dst` (`+=`). Callers zero accumulators
// before the first contribution of a pass. The only exception is matmul,
// which zeroes `dst` itself because it is the sole writer for that operand.
//
// UN-BROADCASTING: when the forward op broadcast an operand, several output
// elements read the same operand element, so the gradient for that element
// is the sum of theirs. Concretely the output-shaped gradient is summed over
// every axis broadcast out of the operand: leading axes the operand lacks and
// axes where it has size 1.
//
//   operand [4]    → output [2, 3, 4]: sum over axes 0, 1
//   operand [1, 4] → output [3, 4]:    sum over axis 0

mod elementwise;
mod matmul;
mod reduce;
mod transpose;

pub use elementwise::{
    add_grad, multiply_grad, relu_grad, scalar_add_grad, scalar_multiply_grad,
    scalar_subtract_grad, squared_error_grad, subtract_grad,
};
pub use matmul::{matmul_grad, matmul_grad_with};
pub use reduce::reduce_mean_grad;
pub use transpose::transpose_grad;

use tessel_core::broadcast::broadcast_axes;
use tessel_core::{broadcast_stride, flat_to_offset, Array, Error, Result, Shape};

use crate::reduce::{accumulate_sum, ReducePlan};

/// `dst` must be shaped exactly like the operand whose gradient it holds.
pub(crate) fn check_grad_shape(dst: &Array, operand: &Shape) -> Result<()> {
    if dst.shape() != operand {
        return Err(Error::ShapeMismatch {
            expected: operand.clone(),
            got: dst.shape().clone(),
        });
    }
    Ok(())
}

/// `dst += sum of gradient over the axes broadcast out of dst's shape`.
pub(crate) fn unbroadcast_accumulate(gradient: &Array, dst: &mut Array) -> Result<()> {
    // validates that dst broadcasts to the gradient at all
    broadcast_stride(dst, gradient.shape())?;
    let axes = broadcast_axes(dst.shape(), gradient.shape());
    let plan = ReducePlan::from_axes(gradient.dims(), &axes);
    accumulate_sum(gradient, &plan, dst)
}

/// `dst += src` for two arrays of the same shape, any strides.
pub(crate) fn accumulate(dst: &mut Array, src: &Array) -> Result<()> {
    check_grad_shape(dst, src.shape())?;
    let dims = src.dims().to_vec();
    let src_strides = src.strides();
    let dst_strides = dst.strides().to_vec();
    let s = src.data();
    let d = dst.data_mut();
    for i in 0..s.len() {
        d[flat_to_offset(i, &dims, &dst_strides)] += s[flat_to_offset(i, &dims, src_strides)];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbroadcast_leading_axes() {
        let g = Array::from_vec((1..=6).map(|v| v as f32).collect(), (2, 3)).unwrap();
        let mut dst = Array::full(3, 1.0);
        unbroadcast_accumulate(&g, &mut dst).unwrap();
        assert_eq!(dst.data(), &[6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_unbroadcast_size_one_axis() {
        let g = Array::from_vec((1..=6).map(|v| v as f32).collect(), (2, 3)).unwrap();
        let mut dst = Array::zeros((2, 1));
        unbroadcast_accumulate(&g, &mut dst).unwrap();
        assert_eq!(dst.data(), &[6.0, 15.0]);
    }

    #[test]
    fn test_unbroadcast_rejects_incompatible() {
        let g = Array::zeros((2, 3));
        let mut dst = Array::zeros(2);
        assert!(matches!(
            unbroadcast_accumulate(&g, &mut dst),
            Err(Error::InvalidBroadcast { .. })
        ));
    }

    #[test]
    fn test_accumulate_strided() {
        let mut dst = Array::from_parts((2, 2), vec![1, 2], vec![0.0; 4]).unwrap();
        let src = Array::from_vec(vec![1.0, 2.0, 3.0, 4.0], (2, 2)).unwrap();
        accumulate(&mut dst, &src).unwrap();
        assert_eq!(dst.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(dst.data(), &[1.0, 3.0, 2.0, 4.0]);
    }
}
