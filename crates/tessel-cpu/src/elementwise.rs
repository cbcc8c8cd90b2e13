use tessel_core::{broadcast_stride, flat_to_offset, Array, Error, Operand, Result, Shape};

// Elementwise kernels
//
// Binary ops iterate over the *output* shape. For every output flat index i,
// each operand is read at the offset its broadcast strides assign to i, so
// operands may be smaller than the output along any size-1 or missing axis.
//
// Scalar ops are plain maps over the buffer: no broadcasting, input and
// output must hold the same number of elements.

/// `out[i] = op(left[bcast(i)], right[bcast(i)])` for every element of `out`.
///
/// Every resolved operand offset is checked against the operand's buffer; a
/// violation means the shape/stride metadata is inconsistent and is reported
/// as [`Error::IndexOutOfBounds`].
pub fn binary_iterate<F>(left: &Array, right: &Array, out: &mut Array, op: F) -> Result<()>
where
    F: Fn(f32, f32) -> f32,
{
    let target = out.shape().clone();
    let left_strides = broadcast_stride(left, &target)?;
    let right_strides = broadcast_stride(right, &target)?;
    let dims = target.dims();
    let out_strides = out.strides().to_vec();
    let out_contiguous = out.is_contiguous();

    let l = left.data();
    let r = right.data();
    let dst = out.data_mut();
    for i in 0..dst.len() {
        let li = checked(flat_to_offset(i, dims, &left_strides), Operand::Left, l.len())?;
        let ri = checked(flat_to_offset(i, dims, &right_strides), Operand::Right, r.len())?;
        let oi = if out_contiguous {
            i
        } else {
            flat_to_offset(i, dims, &out_strides)
        };
        dst[oi] = op(l[li], r[ri]);
    }
    Ok(())
}

#[inline]
pub(crate) fn checked(index: usize, operand: Operand, size: usize) -> Result<usize> {
    if index >= size {
        return Err(Error::IndexOutOfBounds {
            operand,
            index,
            size,
        });
    }
    Ok(index)
}

pub fn add(out: &mut Array, left: &Array, right: &Array) -> Result<()> {
    log::trace!("add {} + {} -> {}", left.shape(), right.shape(), out.shape());
    binary_iterate(left, right, out, |a, b| a + b)
}

pub fn multiply(out: &mut Array, left: &Array, right: &Array) -> Result<()> {
    log::trace!("multiply {} * {} -> {}", left.shape(), right.shape(), out.shape());
    binary_iterate(left, right, out, |a, b| a * b)
}

/// `out = left + (-1 * right)`.
///
/// The negated copy of `right` is a scratch array dropped before returning.
/// Negation is exact, so the result matches a direct `a - b`.
pub fn subtract(out: &mut Array, left: &Array, right: &Array) -> Result<()> {
    log::trace!("subtract {} - {} -> {}", left.shape(), right.shape(), out.shape());
    let negated = negated_copy(right)?;
    add(out, left, &negated)
}

/// `out = (input - target)²` elementwise, with broadcasting.
pub fn squared_error(out: &mut Array, input: &Array, target: &Array) -> Result<()> {
    log::trace!("squared_error {} vs {} -> {}", input.shape(), target.shape(), out.shape());
    binary_iterate(input, target, out, |a, b| {
        let diff = a - b;
        diff * diff
    })
}

pub fn scalar_add(out: &mut Array, input: &Array, scalar: f32) -> Result<()> {
    scalar_map(out, input, |x| x + scalar)
}

pub fn scalar_multiply(out: &mut Array, input: &Array, scalar: f32) -> Result<()> {
    scalar_map(out, input, |x| x * scalar)
}

pub fn scalar_subtract(out: &mut Array, input: &Array, scalar: f32) -> Result<()> {
    scalar_map(out, input, |x| x - scalar)
}

/// Element `i` of `out` in logical row-major order receives `f` of element
/// `i` of `input`, each located through its own strides.
fn scalar_map<F: Fn(f32) -> f32>(out: &mut Array, input: &Array, f: F) -> Result<()> {
    if out.size() != input.size() {
        return Err(Error::ShapeMismatch {
            expected: input.shape().clone(),
            got: out.shape().clone(),
        });
    }
    if out.is_contiguous() && input.is_contiguous() {
        for (o, &x) in out.data_mut().iter_mut().zip(input.data()) {
            *o = f(x);
        }
        return Ok(());
    }
    let in_dims = input.dims();
    let in_strides = input.strides();
    let out_dims = out.dims().to_vec();
    let out_strides = out.strides().to_vec();
    let src = input.data();
    let dst = out.data_mut();
    for i in 0..src.len() {
        let x = src[flat_to_offset(i, in_dims, in_strides)];
        dst[flat_to_offset(i, &out_dims, &out_strides)] = f(x);
    }
    Ok(())
}

/// Scratch copy of `src` with every element negated, sharing its strides.
pub(crate) fn negated_copy(src: &Array) -> Result<Array> {
    let mut negated = Array::try_zeros(src.shape().clone())?;
    negated.set_strides(src.strides().to_vec())?;
    scalar_multiply(&mut negated, src, -1.0)?;
    Ok(negated)
}

/// `out[i] = max(0, input[bcast(i)])`.
pub fn relu(out: &mut Array, input: &Array) -> Result<()> {
    log::trace!("relu {} -> {}", input.shape(), out.shape());
    let target: Shape = out.shape().clone();
    let in_strides = broadcast_stride(input, &target)?;
    let dims = target.dims();
    let out_strides = out.strides().to_vec();

    let src = input.data();
    let dst = out.data_mut();
    for i in 0..dst.len() {
        let ii = checked(flat_to_offset(i, dims, &in_strides), Operand::Left, src.len())?;
        dst[flat_to_offset(i, dims, &out_strides)] = src[ii].max(0.0);
    }
    Ok(())
}
