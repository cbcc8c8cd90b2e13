use tessel_core::broadcast::broadcast_stride_raw;
use tessel_core::{batch_offset, broadcast_shape, broadcast_stride, Array, Error, KernelConfig, Result, Shape};

use crate::parallel::for_each_slice;

// Matrix multiplication: batched, with broadcast batch dimensions
//
// The trailing two axes of each operand are the matrix axes:
//   left  [..., M, K]
//   right [..., K, N]
//   out   [..., M, N]
//
// The leading ("batch") axes are broadcast against each other the NumPy way,
// after left-padding the shorter operand with 1s:
//   [2, 1, M, K] @ [3, K, N] → [2, 3, M, N]
//
// Each batch b owns the output slice out[b*M*N .. (b+1)*M*N]. Slices are
// disjoint, so batches run in parallel without synchronisation. Operand
// slices are located with broadcast strides, so a size-1 batch axis simply
// reuses the same matrix for every batch along it.

/// Resolved dimensions of a (possibly batched) matmul.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MatmulDims {
    /// Broadcast batch shape (may be empty).
    pub batch: Vec<usize>,
    pub m: usize,
    pub k: usize,
    pub n: usize,
}

impl MatmulDims {
    pub(crate) fn resolve(left: &Shape, right: &Shape) -> Result<Self> {
        for s in [left, right] {
            if s.rank() < 2 {
                return Err(Error::RankMismatch {
                    expected: 2,
                    got: s.rank(),
                });
            }
        }
        let l = left.dims();
        let r = right.dims();
        let (m, k) = (l[l.len() - 2], l[l.len() - 1]);
        let (k2, n) = (r[r.len() - 2], r[r.len() - 1]);
        if k != k2 {
            return Err(Error::MatmulShapeMismatch { m, k1: k, k2, n });
        }
        let batch = broadcast_shape(
            &Shape::from(&l[..l.len() - 2]),
            &Shape::from(&r[..r.len() - 2]),
        )?;
        Ok(MatmulDims {
            batch: batch.dims().to_vec(),
            m,
            k,
            n,
        })
    }

    pub(crate) fn batch_count(&self) -> usize {
        self.batch.iter().product()
    }

    pub(crate) fn out_shape(&self) -> Shape {
        let mut dims = self.batch.clone();
        dims.extend([self.m, self.n]);
        Shape::new(dims)
    }

    /// Strides that place `operand` (matrix axes `rows x cols`) into the full
    /// batch shape, with 0 on broadcast batch axes.
    pub(crate) fn operand_strides(&self, operand: &Array, rows: usize, cols: usize) -> Result<Vec<usize>> {
        let mut target = self.batch.clone();
        target.extend([rows, cols]);
        broadcast_stride(operand, &Shape::new(target))
    }

    /// For every batch, the index of the `operand` matrix it reads. Operand
    /// matrices are numbered row-major over the operand's own batch axes.
    pub(crate) fn operand_slices(&self, operand: &Shape) -> Result<Vec<usize>> {
        let dims = operand.dims();
        let own = Shape::from(&dims[..dims.len() - 2]);
        let strides = broadcast_stride_raw(&own, &own.stride_contiguous(), &Shape::from(self.batch.clone()))?;
        Ok((0..self.batch_count())
            .map(|b| batch_offset(b, &self.batch, &strides, self.batch.len()))
            .collect())
    }
}

/// `out = left @ right` with batch broadcasting.
///
/// `out` must already have shape `batch + [M, N]`; its strides are reset to
/// row-major.
pub fn matmul(out: &mut Array, left: &Array, right: &Array) -> Result<()> {
    matmul_with(out, left, right, KernelConfig::global())
}

/// [`matmul`] with an explicit configuration.
pub fn matmul_with(out: &mut Array, left: &Array, right: &Array, config: &KernelConfig) -> Result<()> {
    log::trace!("matmul {} @ {} -> {}", left.shape(), right.shape(), out.shape());
    let dims = MatmulDims::resolve(left.shape(), right.shape())?;
    let expected = dims.out_shape();
    if out.shape() != &expected {
        return Err(Error::ShapeMismatch {
            expected,
            got: out.shape().clone(),
        });
    }
    out.reset_strides();

    let MatmulDims { ref batch, m, k, n } = dims;
    let nb = batch.len();
    let ls = dims.operand_strides(left, m, k)?;
    let rs = dims.operand_strides(right, k, n)?;
    let (l, r) = (left.data(), right.data());

    let batches = dims.batch_count();
    let parallel = config.use_parallel(batches);
    log::debug!("matmul: {} batches of {}x{}x{}, parallel={}", batches, m, k, n, parallel);

    for_each_slice(out.data_mut(), m * n, parallel, |b, slice| {
        let lo = batch_offset(b, batch, &ls, nb);
        let ro = batch_offset(b, batch, &rs, nb);
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0f32;
                for p in 0..k {
                    sum += l[lo + i * ls[nb] + p * ls[nb + 1]] * r[ro + p * rs[nb] + j * rs[nb + 1]];
                }
                slice[i * n + j] = sum;
            }
        }
    });
    Ok(())
}
