use tessel_core::{bail, flat_to_offset, Array, Error, KernelConfig, Result, Shape};

// Reductions: sum / mean over an arbitrary subset of axes
//
// Two paths compute the same thing:
//
//   general    Walks every input element in flat order, drops the reduced
//              coordinates and accumulates into the resulting output cell.
//              Works for any strides.
//
//   contiguous For row-major inputs. Walks output cells instead; for each one
//              it visits the reduced coordinates directly, with adjacent
//              reduced axes fused into a single strided run.
//
// Both visit the elements of one output cell in increasing input offset, so
// for `Sum` the results are bit-identical.
//
// OUTPUT SHAPES: the output may keep reduced axes as size 1 ([3, 4] → [1, 4])
// or drop them ([3, 4] → [4]). Both describe the same row-major layout of the
// kept axes, and both are accepted.

/// Binary accumulation operator with its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Prod,
    Max,
    Min,
}

impl ReduceOp {
    pub fn init(self) -> f32 {
        match self {
            ReduceOp::Sum => 0.0,
            ReduceOp::Prod => 1.0,
            ReduceOp::Max => f32::NEG_INFINITY,
            ReduceOp::Min => f32::INFINITY,
        }
    }

    #[inline]
    pub fn combine(self, acc: f32, x: f32) -> f32 {
        match self {
            ReduceOp::Sum => acc + x,
            ReduceOp::Prod => acc * x,
            ReduceOp::Max => acc.max(x),
            ReduceOp::Min => acc.min(x),
        }
    }
}

/// Which axes of an input are reduced, and how input coordinates map to
/// output cells.
#[derive(Debug, Clone)]
pub(crate) struct ReducePlan {
    mask: Vec<bool>,
    dims: Vec<usize>,
}

impl ReducePlan {
    /// `None` reduces every axis.
    pub(crate) fn new(dims: &[usize], axes: Option<&[usize]>) -> Result<Self> {
        let rank = dims.len();
        let mut mask = vec![axes.is_none(); rank];
        for &a in axes.unwrap_or(&[]) {
            if a >= rank {
                return Err(Error::DimOutOfRange { dim: a, rank });
            }
            mask[a] = true;
        }
        Ok(ReducePlan {
            mask,
            dims: dims.to_vec(),
        })
    }

    /// Plan that reduces exactly `axes`, assumed in range.
    pub(crate) fn from_axes(dims: &[usize], axes: &[usize]) -> Self {
        let mut mask = vec![false; dims.len()];
        for &a in axes {
            mask[a] = true;
        }
        ReducePlan {
            mask,
            dims: dims.to_vec(),
        }
    }

    /// Number of input elements folded into each output cell.
    pub(crate) fn count(&self) -> usize {
        self.dims
            .iter()
            .zip(&self.mask)
            .filter(|(_, m)| **m)
            .map(|(&n, _)| n)
            .product()
    }

    pub(crate) fn kept_dims(&self) -> Vec<usize> {
        self.dims
            .iter()
            .zip(&self.mask)
            .filter(|(_, m)| !**m)
            .map(|(&n, _)| n)
            .collect()
    }

    fn reduced_axes(&self) -> Vec<usize> {
        (0..self.dims.len()).filter(|&d| self.mask[d]).collect()
    }

    /// Output cell for a row-major flat input index.
    #[inline]
    pub(crate) fn out_index(&self, flat_index: usize) -> usize {
        let mut idx = flat_index;
        let mut out = 0;
        let mut out_stride = 1;
        for d in (0..self.dims.len()).rev() {
            let n = self.dims[d];
            let coord = idx % n;
            idx /= n;
            if !self.mask[d] {
                out += coord * out_stride;
                out_stride *= n;
            }
        }
        out
    }

    /// The output must hold the kept axes in order; size-1 axes are ignored
    /// on both sides so keep-dim and squeezed shapes are both accepted.
    pub(crate) fn check_output(&self, out: &Shape) -> Result<()> {
        let kept = self.kept_dims();
        if squeeze(&kept) != squeeze(out.dims()) {
            let expected = if kept.is_empty() { vec![1] } else { kept };
            return Err(Error::ShapeMismatch {
                expected: Shape::new(expected),
                got: out.clone(),
            });
        }
        Ok(())
    }
}

fn squeeze(dims: &[usize]) -> Vec<usize> {
    dims.iter().copied().filter(|&n| n != 1).collect()
}

/// Sum `input` over the plan's axes and add the result into `out`.
/// `out` is not cleared; the gradient kernels rely on that.
pub(crate) fn accumulate_sum(input: &Array, plan: &ReducePlan, out: &mut Array) -> Result<()> {
    plan.check_output(out.shape())?;
    let in_dims = input.dims();
    let in_strides = input.strides();
    let in_contiguous = input.is_contiguous();
    let out_dims = out.dims().to_vec();
    let out_strides = out.strides().to_vec();
    let out_contiguous = out.is_contiguous();

    let src = input.data();
    let dst = out.data_mut();
    for i in 0..input.size() {
        let value = if in_contiguous {
            src[i]
        } else {
            src[flat_to_offset(i, in_dims, in_strides)]
        };
        let o = plan.out_index(i);
        let o = if out_contiguous {
            o
        } else {
            flat_to_offset(o, &out_dims, &out_strides)
        };
        dst[o] += value;
    }
    Ok(())
}

/// Sum `input` over `axes` (all axes when `None`) into `out`.
///
/// `out` is zeroed first. Axes out of range are an error, as is an `out`
/// whose shape does not describe the kept axes.
pub fn reduce_sum(input: &Array, out: &mut Array, axes: Option<&[usize]>) -> Result<()> {
    reduce_sum_with(input, out, axes, KernelConfig::global())
}

/// [`reduce_sum`] with an explicit configuration.
pub fn reduce_sum_with(
    input: &Array,
    out: &mut Array,
    axes: Option<&[usize]>,
    config: &KernelConfig,
) -> Result<()> {
    log::trace!("reduce_sum {} axes={:?} -> {}", input.shape(), axes, out.shape());
    let plan = ReducePlan::new(input.dims(), axes)?;
    plan.check_output(out.shape())?;

    if config.contiguous_fast_path && input.is_contiguous() {
        log::debug!("reduce_sum: contiguous fast path");
        return match axes {
            None => reduce_contiguous_all(input, out, ReduceOp::Sum),
            Some(_) => reduce_contiguous(input, out, &plan.reduced_axes(), ReduceOp::Sum),
        };
    }

    out.fill(0.0);
    accumulate_sum(input, &plan, out)
}

/// Fold every element of a contiguous `input` into the single cell of `out`.
pub fn reduce_contiguous_all(input: &Array, out: &mut Array, op: ReduceOp) -> Result<()> {
    require_contiguous(input)?;
    if out.size() != 1 {
        return Err(Error::ShapeMismatch {
            expected: Shape::from(1),
            got: out.shape().clone(),
        });
    }
    let acc = input
        .data()
        .iter()
        .fold(op.init(), |acc, &x| op.combine(acc, x));
    out.data_mut()[0] = acc;
    Ok(())
}

/// Reduce a contiguous `input` over `axes` with `op`, writing every cell of
/// `out` (previous contents are ignored).
///
/// Adjacent axes are fused: for a row-major input, axes `a` and `a + 1` form a
/// single run of `shape[a] * shape[a + 1]` elements spaced `strides[a + 1]`
/// apart.
pub fn reduce_contiguous(input: &Array, out: &mut Array, axes: &[usize], op: ReduceOp) -> Result<()> {
    require_contiguous(input)?;
    let plan = ReducePlan::new(input.dims(), Some(axes))?;
    plan.check_output(out.shape())?;

    let dims = input.dims();
    let strides = input.strides();
    let reduced = plan.reduced_axes();

    // (length, stride) per fused run, outermost first
    let mut runs: Vec<(usize, usize)> = Vec::with_capacity(reduced.len());
    let mut prev: Option<usize> = None;
    for &a in &reduced {
        match (prev, runs.last_mut()) {
            (Some(p), Some(run)) if a == p + 1 => {
                run.0 *= dims[a];
                run.1 = strides[a];
            }
            _ => runs.push((dims[a], strides[a])),
        }
        prev = Some(a);
    }
    let run_total: usize = runs.iter().map(|r| r.0).product();

    let kept: Vec<usize> = (0..dims.len()).filter(|d| !reduced.contains(d)).collect();
    let kept_dims: Vec<usize> = kept.iter().map(|&d| dims[d]).collect();
    let kept_strides: Vec<usize> = kept.iter().map(|&d| strides[d]).collect();
    let cells: usize = kept_dims.iter().product();

    let out_dims = out.dims().to_vec();
    let out_strides = out.strides().to_vec();
    let src = input.data();
    let dst = out.data_mut();
    let mut counter = vec![0usize; runs.len()];

    for cell in 0..cells {
        let mut offset = flat_to_offset(cell, &kept_dims, &kept_strides);
        let mut acc = op.init();
        for _ in 0..run_total {
            acc = op.combine(acc, src[offset]);
            for r in (0..runs.len()).rev() {
                let (len, stride) = runs[r];
                counter[r] += 1;
                offset += stride;
                if counter[r] < len {
                    break;
                }
                counter[r] = 0;
                offset -= stride * len;
            }
        }
        dst[flat_to_offset(cell, &out_dims, &out_strides)] = acc;
    }
    Ok(())
}

/// Mean of `input` over `axes` (all axes when `None`) into `out`.
pub fn reduce_mean(out: &mut Array, input: &Array, axes: Option<&[usize]>) -> Result<()> {
    let n = ReducePlan::new(input.dims(), axes)?.count();
    reduce_sum(input, out, axes)?;
    let n = n as f32;
    out.data_mut().iter_mut().for_each(|v| *v /= n);
    Ok(())
}

fn require_contiguous(input: &Array) -> Result<()> {
    if !input.is_contiguous() {
        bail!(
            "contiguous reduction on non-contiguous input: shape {} strides {:?}",
            input.shape(),
            input.strides()
        );
    }
    Ok(())
}
