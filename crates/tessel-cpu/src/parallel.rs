use rayon::prelude::*;

// Parallel-for over disjoint slices
//
// The destination buffer is cut into consecutive slices of `slice_len`
// elements and `f(slice_index, slice)` runs once per slice, in parallel when
// requested. Each invocation gets exclusive access to its own slice and may
// only read shared inputs, so no locking is needed: the borrow checker
// enforces that write sets are disjoint.
//
// If `dst.len()` is not a multiple of `slice_len`, the last slice is short.

/// Run `f` over each `slice_len`-sized chunk of `dst`.
pub fn for_each_slice<F>(dst: &mut [f32], slice_len: usize, parallel: bool, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    if slice_len == 0 || dst.is_empty() {
        return;
    }
    if parallel {
        dst.par_chunks_mut(slice_len)
            .enumerate()
            .for_each(|(i, slice)| f(i, slice));
    } else {
        dst.chunks_mut(slice_len)
            .enumerate()
            .for_each(|(i, slice)| f(i, slice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slices_are_disjoint_and_indexed() {
        for parallel in [false, true] {
            let mut buf = vec![0.0f32; 12];
            for_each_slice(&mut buf, 4, parallel, |i, s| {
                for v in s.iter_mut() {
                    *v += i as f32;
                }
            });
            assert_eq!(buf, vec![0., 0., 0., 0., 1., 1., 1., 1., 2., 2., 2., 2.]);
        }
    }

    #[test]
    fn test_zero_len_is_noop() {
        let mut buf = vec![1.0f32; 3];
        for_each_slice(&mut buf, 0, true, |_, s| s.fill(0.0));
        assert_eq!(buf, vec![1.0; 3]);
    }
}
