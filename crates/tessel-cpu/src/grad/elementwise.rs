use tessel_core::{broadcast_stride, flat_to_offset, Array, Error, Operand, Result};

use super::{check_grad_shape, unbroadcast_accumulate};
use crate::elementwise::{binary_iterate, checked, negated_copy};

// Gradient rules for elementwise ops
//
//   add:            d_left += g,          d_right += g
//   subtract:       d_left += g,          d_right += -g
//   multiply:       d_left += g * right,  d_right += g * left
//   squared_error:  d_input += 2(x - t)g, d_target += -2(x - t)g
//   relu:           d_input += g where input > 0
//
// each followed by un-broadcasting onto the operand's shape.

fn select<'a>(operand: Operand, left: &'a Array, right: &'a Array) -> &'a Array {
    match operand {
        Operand::Left => left,
        Operand::Right => right,
    }
}

pub fn add_grad(
    gradient: &Array,
    operand: Operand,
    left: &Array,
    right: &Array,
    dst: &mut Array,
) -> Result<()> {
    log::trace!("add_grad {} -> {} {}", gradient.shape(), operand, dst.shape());
    check_grad_shape(dst, select(operand, left, right).shape())?;
    unbroadcast_accumulate(gradient, dst)
}

pub fn subtract_grad(
    gradient: &Array,
    operand: Operand,
    left: &Array,
    right: &Array,
    dst: &mut Array,
) -> Result<()> {
    log::trace!("subtract_grad {} -> {} {}", gradient.shape(), operand, dst.shape());
    check_grad_shape(dst, select(operand, left, right).shape())?;
    match operand {
        Operand::Left => unbroadcast_accumulate(gradient, dst),
        Operand::Right => {
            let negated = negated_copy(gradient)?;
            unbroadcast_accumulate(&negated, dst)
        }
    }
}

/// The local gradient `gradient * other` is materialised at full output
/// shape in a scratch array, then summed onto the operand's shape.
pub fn multiply_grad(
    gradient: &Array,
    operand: Operand,
    left: &Array,
    right: &Array,
    dst: &mut Array,
) -> Result<()> {
    log::trace!("multiply_grad {} -> {} {}", gradient.shape(), operand, dst.shape());
    check_grad_shape(dst, select(operand, left, right).shape())?;
    let other = select(operand.other(), left, right);
    let mut local = Array::try_zeros(gradient.shape().clone())?;
    binary_iterate(gradient, other, &mut local, |g, x| g * x)?;
    unbroadcast_accumulate(&local, dst)
}

/// `dst += gradient`; adding a constant does not change the slope.
pub fn scalar_add_grad(gradient: &Array, dst: &mut Array) -> Result<()> {
    scalar_map_grad(gradient, dst, 1.0)
}

pub fn scalar_subtract_grad(gradient: &Array, dst: &mut Array) -> Result<()> {
    scalar_map_grad(gradient, dst, 1.0)
}

pub fn scalar_multiply_grad(gradient: &Array, scalar: f32, dst: &mut Array) -> Result<()> {
    scalar_map_grad(gradient, dst, scalar)
}

fn scalar_map_grad(gradient: &Array, dst: &mut Array, scale: f32) -> Result<()> {
    if gradient.size() != dst.size() {
        return Err(Error::ShapeMismatch {
            expected: gradient.shape().clone(),
            got: dst.shape().clone(),
        });
    }
    let g_dims = gradient.dims();
    let g_strides = gradient.strides();
    let dst_dims = dst.dims().to_vec();
    let dst_strides = dst.strides().to_vec();
    let g = gradient.data();
    let d = dst.data_mut();
    for i in 0..g.len() {
        let gi = g[flat_to_offset(i, g_dims, g_strides)];
        d[flat_to_offset(i, &dst_dims, &dst_strides)] += gi * scale;
    }
    Ok(())
}

/// Accumulate `gradient` into `dst` wherever the forward input was strictly
/// positive. An input of exactly 0 contributes nothing.
pub fn relu_grad(gradient: &Array, input: &Array, dst: &mut Array) -> Result<()> {
    log::trace!("relu_grad {} -> {}", gradient.shape(), dst.shape());
    check_grad_shape(dst, input.shape())?;
    let target = gradient.shape();
    let dims = target.dims();
    let in_strides = broadcast_stride(input, target)?;
    let dst_strides = broadcast_stride(dst, target)?;
    let g_strides = gradient.strides();

    let x = input.data();
    let g = gradient.data();
    let d = dst.data_mut();
    for i in 0..gradient.size() {
        let xi = checked(flat_to_offset(i, dims, &in_strides), Operand::Left, x.len())?;
        if x[xi] > 0.0 {
            d[flat_to_offset(i, dims, &dst_strides)] += g[flat_to_offset(i, dims, g_strides)];
        }
    }
    Ok(())
}

/// `dst += sign * 2 * (input - target) * gradient`, with sign +1 for the
/// input and -1 for the target. Both operands are broadcast against the
/// gradient's shape.
pub fn squared_error_grad(
    gradient: &Array,
    operand: Operand,
    input: &Array,
    target: &Array,
    dst: &mut Array,
) -> Result<()> {
    log::trace!("squared_error_grad {} -> {} {}", gradient.shape(), operand, dst.shape());
    check_grad_shape(dst, select(operand, input, target).shape())?;
    let factor = match operand {
        Operand::Left => 2.0f32,
        Operand::Right => -2.0f32,
    };

    let shape = gradient.shape();
    let dims = shape.dims();
    let in_strides = broadcast_stride(input, shape)?;
    let t_strides = broadcast_stride(target, shape)?;
    let dst_strides = broadcast_stride(dst, shape)?;
    let g_strides = gradient.strides();

    let x = input.data();
    let t = target.data();
    let g = gradient.data();
    let d = dst.data_mut();
    for i in 0..gradient.size() {
        let xi = checked(flat_to_offset(i, dims, &in_strides), Operand::Left, x.len())?;
        let ti = checked(flat_to_offset(i, dims, &t_strides), Operand::Right, t.len())?;
        let diff = x[xi] - t[ti];
        d[flat_to_offset(i, dims, &dst_strides)] += factor * diff * g[flat_to_offset(i, dims, g_strides)];
    }
    Ok(())
}
