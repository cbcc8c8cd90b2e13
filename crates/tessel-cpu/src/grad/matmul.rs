use tessel_core::{batch_offset, Array, Error, KernelConfig, Operand, Result};

use super::check_grad_shape;
use crate::matmul::MatmulDims;
use crate::parallel::for_each_slice;

// Gradient rules for matmul
//
// Per batch, with C = A @ B, A:[M,K], B:[K,N], G = dC:[M,N]:
//   dA[i,k] = sum_j G[i,j] * B[k,j]     (G @ B^T)
//   dB[k,j] = sum_i A[i,k] * G[i,j]     (A^T @ G)
//
// DISJOINT WRITES: when an operand was broadcast across batches, several
// output batches fold into the same operand matrix. Instead of letting
// batches race on that matrix, work is split by *destination* matrix: each
// parallel unit owns one operand-gradient matrix and walks every output batch
// that reads it, in increasing batch order.

/// Gradient of `left @ right` with respect to `operand`, written into `dst`.
///
/// `dst` is zeroed first (this kernel is its only writer for the pass) and
/// its strides are reset to row-major.
pub fn matmul_grad(
    gradient: &Array,
    operand: Operand,
    left: &Array,
    right: &Array,
    dst: &mut Array,
) -> Result<()> {
    matmul_grad_with(gradient, operand, left, right, dst, KernelConfig::global())
}

/// [`matmul_grad`] with an explicit configuration.
pub fn matmul_grad_with(
    gradient: &Array,
    operand: Operand,
    left: &Array,
    right: &Array,
    dst: &mut Array,
    config: &KernelConfig,
) -> Result<()> {
    log::trace!(
        "matmul_grad {} @ {} ({}) -> {}",
        left.shape(),
        right.shape(),
        operand,
        dst.shape()
    );
    let dims = MatmulDims::resolve(left.shape(), right.shape())?;
    let expected = dims.out_shape();
    if gradient.shape() != &expected {
        return Err(Error::ShapeMismatch {
            expected,
            got: gradient.shape().clone(),
        });
    }
    let target = match operand {
        Operand::Left => left,
        Operand::Right => right,
    };
    check_grad_shape(dst, target.shape())?;
    dst.reset_strides();
    dst.fill(0.0);

    // output batches grouped by the operand matrix they fold into
    let slices = dims.operand_slices(target.shape())?;
    let matrices: usize = target.dims()[..target.ndim() - 2].iter().product();
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); matrices];
    for (b, &s) in slices.iter().enumerate() {
        groups[s].push(b);
    }

    let MatmulDims { ref batch, m, k, n } = dims;
    let nb = batch.len();
    let ls = dims.operand_strides(left, m, k)?;
    let rs = dims.operand_strides(right, k, n)?;
    let gs = gradient.strides();
    let (l, r, g) = (left.data(), right.data(), gradient.data());

    let parallel = config.use_parallel(groups.len());
    log::debug!("matmul_grad: {} destination matrices, parallel={}", groups.len(), parallel);

    match operand {
        Operand::Left => for_each_slice(dst.data_mut(), m * k, parallel, |s, slice| {
            for &b in &groups[s] {
                let go = batch_offset(b, batch, gs, nb);
                let ro = batch_offset(b, batch, &rs, nb);
                for i in 0..m {
                    for p in 0..k {
                        let mut acc = 0.0f32;
                        for j in 0..n {
                            acc += g[go + i * gs[nb] + j * gs[nb + 1]] * r[ro + p * rs[nb] + j * rs[nb + 1]];
                        }
                        slice[i * k + p] += acc;
                    }
                }
            }
        }),
        Operand::Right => for_each_slice(dst.data_mut(), k * n, parallel, |s, slice| {
            for &b in &groups[s] {
                let go = batch_offset(b, batch, gs, nb);
                let lo = batch_offset(b, batch, &ls, nb);
                for j in 0..n {
                    for p in 0..k {
                        let mut acc = 0.0f32;
                        for i in 0..m {
                            acc += l[lo + i * ls[nb] + p * ls[nb + 1]] * g[go + i * gs[nb] + j * gs[nb + 1]];
                        }
                        slice[p * n + j] += acc;
                    }
                }
            }
        }),
    }
    Ok(())
}
