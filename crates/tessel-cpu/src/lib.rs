//! # tessel-cpu
//!
//! Forward kernels and their reverse-mode gradient kernels over strided,
//! broadcasting `f32` arrays.
//!
//! Every kernel writes into caller-allocated arrays and returns a
//! [`tessel_core::Result`]. Kernels are independent of each other: deciding
//! which one to call, and in which order, is the caller's job.
//!
//! | Forward | Backward |
//! |---------|----------|
//! | [`add`], [`subtract`], [`multiply`] | [`add_grad`], [`subtract_grad`], [`multiply_grad`] |
//! | [`scalar_add`], [`scalar_subtract`], [`scalar_multiply`] | [`scalar_add_grad`], [`scalar_subtract_grad`], [`scalar_multiply_grad`] |
//! | [`relu`] | [`relu_grad`] |
//! | [`squared_error`] | [`squared_error_grad`] |
//! | [`reduce_sum`], [`reduce_mean`] | [`reduce_mean_grad`] |
//! | [`matmul`] | [`matmul_grad`] |
//! | [`transpose`] | [`transpose_grad`] |

pub mod elementwise;
pub mod grad;
pub mod matmul;
pub mod parallel;
pub mod reduce;
pub mod transpose;

pub use elementwise::{
    add, binary_iterate, multiply, relu, scalar_add, scalar_multiply, scalar_subtract,
    squared_error, subtract,
};
pub use grad::{
    add_grad, matmul_grad, matmul_grad_with, multiply_grad, reduce_mean_grad, relu_grad,
    scalar_add_grad, scalar_multiply_grad, scalar_subtract_grad, squared_error_grad,
    subtract_grad, transpose_grad,
};
pub use matmul::{matmul, matmul_with};
pub use reduce::{
    reduce_contiguous, reduce_contiguous_all, reduce_mean, reduce_sum, reduce_sum_with, ReduceOp,
};
pub use transpose::transpose;

pub use tessel_core::{Array, Error, KernelConfig, Operand, Result, Shape};
