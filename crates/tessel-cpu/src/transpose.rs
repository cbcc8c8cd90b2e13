use tessel_core::{invert_permutation, Array, Error, Result, Shape};

// Transpose: materialising axis permutations
//
// Two modes:
//
//   axes = None      rank-2 swap, out[j, i] = input[i, j], using both arrays'
//                    strides directly.
//
//   axes = Some(p)   general permutation. out.shape[j] = input.shape[p[j]].
//                    Walking the input in flat order, input axis d lands on
//                    output axis inv[d] where inv is the inverse of p. Writing
//                    through p itself instead of inv only happens to work for
//                    self-inverse permutations such as [1, 0].

/// Copy `input` into `out` with its axes permuted.
///
/// `out` must already have the permuted shape. In the general mode its
/// strides are reset to row-major.
pub fn transpose(out: &mut Array, input: &Array, axes: Option<&[usize]>) -> Result<()> {
    log::trace!("transpose {} axes={:?} -> {}", input.shape(), axes, out.shape());
    match axes {
        None => transpose_2d(out, input),
        Some(axes) => transpose_nd(out, input, axes),
    }
}

fn transpose_2d(out: &mut Array, input: &Array) -> Result<()> {
    if input.ndim() != 2 {
        return Err(Error::RankMismatch {
            expected: 2,
            got: input.ndim(),
        });
    }
    let (m, n) = (input.dims()[0], input.dims()[1]);
    check_out_shape(out, Shape::from((n, m)))?;

    let (is0, is1) = (input.strides()[0], input.strides()[1]);
    let (os0, os1) = (out.strides()[0], out.strides()[1]);
    let src = input.data();
    let dst = out.data_mut();
    for i in 0..m {
        for j in 0..n {
            dst[j * os0 + i * os1] = src[i * is0 + j * is1];
        }
    }
    Ok(())
}

fn transpose_nd(out: &mut Array, input: &Array, axes: &[usize]) -> Result<()> {
    if axes.len() != input.ndim() {
        return Err(Error::InvalidPermutation {
            axes: axes.to_vec(),
        });
    }
    let inv = invert_permutation(axes)?;
    check_out_shape(out, input.shape().permute(axes)?)?;
    out.reset_strides();

    let dims = input.dims();
    let in_strides = input.strides();
    let out_strides = out.strides().to_vec();
    let src = input.data();
    let dst = out.data_mut();
    for i in 0..src.len() {
        let mut rem = i;
        let mut in_off = 0;
        let mut out_off = 0;
        for d in (0..dims.len()).rev() {
            let coord = rem % dims[d];
            rem /= dims[d];
            in_off += coord * in_strides[d];
            out_off += coord * out_strides[inv[d]];
        }
        dst[out_off] = src[in_off];
    }
    Ok(())
}

fn check_out_shape(out: &Array, expected: Shape) -> Result<()> {
    if out.shape() != &expected {
        return Err(Error::ShapeMismatch {
            expected,
            got: out.shape().clone(),
        });
    }
    Ok(())
}
