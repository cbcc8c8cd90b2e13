use tessel_core::{flat_to_offset, Array, Operand, Result};

use super::check_grad_shape;
use crate::reduce::ReducePlan;

// Gradient rule for mean
//
//   out = sum(input over axes) / N
//   d_input[i] += gradient[cell(i)] / N
//
// where cell(i) is the output cell input element i was folded into. The
// reduction axes are not a differentiable input, so `Operand::Right` is a
// no-op.

/// Spread `gradient` (shaped like the mean's output, keep-dim or squeezed)
/// back over `input`'s shape, scaled by `1 / N`.
pub fn reduce_mean_grad(
    gradient: &Array,
    operand: Operand,
    input: &Array,
    axes: Option<&[usize]>,
    dst: &mut Array,
) -> Result<()> {
    if operand == Operand::Right {
        return Ok(());
    }
    log::trace!("reduce_mean_grad {} axes={:?} -> {}", gradient.shape(), axes, dst.shape());
    check_grad_shape(dst, input.shape())?;
    let plan = ReducePlan::new(input.dims(), axes)?;
    plan.check_output(gradient.shape())?;
    let n = plan.count() as f32;

    let in_dims = input.dims();
    let g_dims = gradient.dims();
    let g_strides = gradient.strides();
    let dst_strides = dst.strides().to_vec();
    let g = gradient.data();
    let d = dst.data_mut();
    for i in 0..input.size() {
        let gi = flat_to_offset(plan.out_index(i), g_dims, g_strides);
        d[flat_to_offset(i, in_dims, &dst_strides)] += g[gi] / n;
    }
    Ok(())
}
