// Finite-difference checks for the backward kernels
//
// For a forward op f and random weights w shaped like its output, the scalar
// loss L = sum(f(inputs) * w) has dL/d(out) = w. Feeding w as the incoming
// gradient must therefore reproduce the central difference
//   (L(x + eps) - L(x - eps)) / (2 eps)
// for every element of every differentiable input.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessel_cpu::*;

const EPS: f32 = 1e-2;
const TOL: f32 = 1e-2;

fn assert_vec_approx(got: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(
        got.len(),
        expected.len(),
        "length mismatch: {} vs {}",
        got.len(),
        expected.len()
    );
    for (i, (g, e)) in got.iter().zip(expected.iter()).enumerate() {
        assert!(
            (g - e).abs() < tol * (1.0 + e.abs()),
            "index {}: got {} expected {} (tol {})",
            i,
            g,
            e,
            tol
        );
    }
}

fn random(shape: &[usize], rng: &mut StdRng) -> Array {
    let n: usize = shape.iter().product();
    let data = (0..n).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    Array::from_vec(data, shape.to_vec()).unwrap()
}

fn loss(out: &Array, weights: &Array) -> f64 {
    out.to_vec()
        .iter()
        .zip(weights.to_vec())
        .map(|(&o, w)| o as f64 * w as f64)
        .sum()
}

fn numeric_grad<F>(inputs: &[Array], which: usize, weights: &Array, forward: &F) -> Vec<f32>
where
    F: Fn(&[Array]) -> Array,
{
    let mut probe = inputs.to_vec();
    let n = probe[which].size();
    let mut grad = Vec::with_capacity(n);
    for i in 0..n {
        let orig = probe[which].data()[i];
        probe[which].data_mut()[i] = orig + EPS;
        let plus = loss(&forward(probe.as_slice()), weights);
        probe[which].data_mut()[i] = orig - EPS;
        let minus = loss(&forward(probe.as_slice()), weights);
        probe[which].data_mut()[i] = orig;
        grad.push(((plus - minus) / (2.0 * EPS as f64)) as f32);
    }
    grad
}

/// Compare `backward` against finite differences of `forward` for every
/// input listed in `operands`.
fn check<F, B>(inputs: &[Array], out_shape: &[usize], operands: &[usize], forward: F, backward: B)
where
    F: Fn(&[Array]) -> Array,
    B: Fn(&Array, Operand, &[Array], &mut Array) -> Result<()>,
{
    let mut rng = StdRng::seed_from_u64(11);
    let weights = random(out_shape, &mut rng);
    for &which in operands {
        let operand = Operand::try_from(which).unwrap();
        let mut dst = Array::zeros(inputs[which].shape().clone());
        backward(&weights, operand, inputs, &mut dst).unwrap();
        let expected = numeric_grad(inputs, which, &weights, &forward);
        assert_vec_approx(&dst.to_vec(), &expected, TOL);
    }
}

fn binary(lhs: &[usize], rhs: &[usize], seed: u64) -> Vec<Array> {
    let mut rng = StdRng::seed_from_u64(seed);
    vec![random(lhs, &mut rng), random(rhs, &mut rng)]
}

// Elementwise

const BROADCAST_CASES: &[(&[usize], &[usize], &[usize])] = &[
    (&[2, 3], &[2, 3], &[2, 3]),
    (&[2, 3], &[3], &[2, 3]),
    (&[2, 1, 3], &[4, 1], &[2, 4, 3]),
    (&[1, 4], &[3, 1], &[3, 4]),
];

#[test]
fn test_add_grad() {
    for (i, &(l, r, out)) in BROADCAST_CASES.iter().enumerate() {
        check(
            &binary(l, r, i as u64),
            out,
            &[0, 1],
            |x| {
                let mut o = Array::zeros(out);
                add(&mut o, &x[0], &x[1]).unwrap();
                o
            },
            |g, op, x, d| add_grad(g, op, &x[0], &x[1], d),
        );
    }
}

#[test]
fn test_subtract_grad() {
    for (i, &(l, r, out)) in BROADCAST_CASES.iter().enumerate() {
        check(
            &binary(l, r, 10 + i as u64),
            out,
            &[0, 1],
            |x| {
                let mut o = Array::zeros(out);
                subtract(&mut o, &x[0], &x[1]).unwrap();
                o
            },
            |g, op, x, d| subtract_grad(g, op, &x[0], &x[1], d),
        );
    }
}

#[test]
fn test_multiply_grad() {
    for (i, &(l, r, out)) in BROADCAST_CASES.iter().enumerate() {
        check(
            &binary(l, r, 20 + i as u64),
            out,
            &[0, 1],
            |x| {
                let mut o = Array::zeros(out);
                multiply(&mut o, &x[0], &x[1]).unwrap();
                o
            },
            |g, op, x, d| multiply_grad(g, op, &x[0], &x[1], d),
        );
    }
}

#[test]
fn test_squared_error_grad() {
    for (i, &(l, r, out)) in BROADCAST_CASES.iter().enumerate() {
        check(
            &binary(l, r, 30 + i as u64),
            out,
            &[0, 1],
            |x| {
                let mut o = Array::zeros(out);
                squared_error(&mut o, &x[0], &x[1]).unwrap();
                o
            },
            |g, op, x, d| squared_error_grad(g, op, &x[0], &x[1], d),
        );
    }
}

#[test]
fn test_relu_grad() {
    let mut rng = StdRng::seed_from_u64(40);
    let mut x = random(&[3, 4], &mut rng);
    // keep every input well clear of the kink at 0
    for v in x.data_mut() {
        if v.abs() < 0.1 {
            *v = if *v < 0.0 { -0.5 } else { 0.5 };
        }
    }
    check(
        &[x],
        &[3, 4],
        &[0],
        |x| {
            let mut o = Array::zeros((3, 4));
            relu(&mut o, &x[0]).unwrap();
            o
        },
        |g, _, x, d| relu_grad(g, &x[0], d),
    );
}

#[test]
fn test_relu_grad_broadcast() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut x = random(&[4], &mut rng);
    for v in x.data_mut() {
        if v.abs() < 0.1 {
            *v = if *v < 0.0 { -0.5 } else { 0.5 };
        }
    }
    check(
        &[x],
        &[3, 4],
        &[0],
        |x| {
            let mut o = Array::zeros((3, 4));
            relu(&mut o, &x[0]).unwrap();
            o
        },
        |g, _, x, d| relu_grad(g, &x[0], d),
    );
}

#[test]
fn test_scalar_grads() {
    let mut rng = StdRng::seed_from_u64(41);
    let x = random(&[2, 3], &mut rng);
    check(
        &[x.clone()],
        &[2, 3],
        &[0],
        |x| {
            let mut o = Array::zeros((2, 3));
            scalar_multiply(&mut o, &x[0], -1.5).unwrap();
            o
        },
        |g, _, _, d| scalar_multiply_grad(g, -1.5, d),
    );
    check(
        &[x.clone()],
        &[2, 3],
        &[0],
        |x| {
            let mut o = Array::zeros((2, 3));
            scalar_add(&mut o, &x[0], 3.0).unwrap();
            o
        },
        |g, _, _, d| scalar_add_grad(g, d),
    );
    check(
        &[x],
        &[2, 3],
        &[0],
        |x| {
            let mut o = Array::zeros((2, 3));
            scalar_subtract(&mut o, &x[0], 3.0).unwrap();
            o
        },
        |g, _, _, d| scalar_subtract_grad(g, d),
    );
}

// Reductions

#[test]
fn test_reduce_mean_grad() {
    let cases: &[(Option<&[usize]>, &[usize])] = &[
        (None, &[1]),
        (Some(&[1]), &[2, 4]),
        (Some(&[1]), &[2, 1, 4]),
        (Some(&[0, 2]), &[1, 3, 1]),
        (Some(&[2]), &[2, 3]),
    ];
    for (i, &(axes, out)) in cases.iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(50 + i as u64);
        let x = random(&[2, 3, 4], &mut rng);
        check(
            &[x],
            out,
            &[0],
            |x| {
                let mut o = Array::zeros(out);
                reduce_mean(&mut o, &x[0], axes).unwrap();
                o
            },
            |g, op, x, d| reduce_mean_grad(g, op, &x[0], axes, d),
        );
    }
}

// Matmul

#[test]
fn test_matmul_grad() {
    let cases: &[(&[usize], &[usize], &[usize])] = &[
        (&[2, 3], &[3, 4], &[2, 4]),
        (&[2, 2, 3], &[2, 3, 2], &[2, 2, 2]),
        (&[2, 2, 3], &[3, 2], &[2, 2, 2]),
        (&[2, 1, 2, 3], &[3, 3, 2], &[2, 3, 2, 2]),
    ];
    for (i, &(l, r, out)) in cases.iter().enumerate() {
        check(
            &binary(l, r, 60 + i as u64),
            out,
            &[0, 1],
            |x| {
                let mut o = Array::zeros(out);
                matmul(&mut o, &x[0], &x[1]).unwrap();
                o
            },
            |g, op, x, d| matmul_grad(g, op, &x[0], &x[1], d),
        );
    }
}

#[test]
fn test_matmul_grad_parallel_matches_sequential() {
    let x = binary(&[3, 2, 4, 3], &[2, 3, 5], 70);
    let g = {
        let mut rng = StdRng::seed_from_u64(71);
        random(&[3, 2, 4, 5], &mut rng)
    };
    let seq = KernelConfig::default().parallel(false);
    let par = KernelConfig::default().parallel_min_batches(1);
    for operand in [Operand::Left, Operand::Right] {
        let shape = x[operand.index()].shape().clone();
        let mut a = Array::zeros(shape.clone());
        let mut b = Array::zeros(shape);
        matmul_grad_with(&g, operand, &x[0], &x[1], &mut a, &seq).unwrap();
        matmul_grad_with(&g, operand, &x[0], &x[1], &mut b, &par).unwrap();
        assert_eq!(a.data(), b.data());
    }
}

// Transpose

#[test]
fn test_transpose_grad() {
    let cases: &[(&[usize], Option<&[usize]>, &[usize])] = &[
        (&[3, 4], None, &[4, 3]),
        (&[3, 4], Some(&[1, 0]), &[4, 3]),
        (&[2, 3, 4], Some(&[2, 0, 1]), &[4, 2, 3]),
        (&[2, 3, 4], Some(&[1, 2, 0]), &[3, 4, 2]),
    ];
    for (i, &(shape, axes, out)) in cases.iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(80 + i as u64);
        let x = random(shape, &mut rng);
        check(
            &[x],
            out,
            &[0],
            |x| {
                let mut o = Array::zeros(out);
                transpose(&mut o, &x[0], axes).unwrap();
                o
            },
            |g, _, _, d| transpose_grad(g, axes, d),
        );
    }
}

// Accumulation

#[test]
fn test_gradients_accumulate() -> Result<()> {
    let left = Array::from_vec(vec![1.0, 2.0], 2)?;
    let right = Array::from_vec(vec![3.0, 4.0], 2)?;
    let g = Array::full(2, 1.0);
    let mut d = Array::full(2, 10.0);
    multiply_grad(&g, Operand::Left, &left, &right, &mut d)?;
    subtract_grad(&g, Operand::Left, &left, &right, &mut d)?;
    assert_eq!(d.data(), &[14.0, 15.0]);
    Ok(())
}

#[test]
fn test_matmul_grad_overwrites() -> Result<()> {
    let a = Array::from_vec(vec![1.0, 2.0], (1, 2))?;
    let b = Array::from_vec(vec![3.0, 4.0], (2, 1))?;
    let g = Array::full((1, 1), 1.0);
    let mut da = Array::full((1, 2), 100.0);
    matmul_grad(&g, Operand::Left, &a, &b, &mut da)?;
    assert_eq!(da.data(), &[3.0, 4.0]);
    Ok(())
}
