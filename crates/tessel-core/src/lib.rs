//! # tessel-core
//!
//! Array, shape, stride and broadcasting primitives shared by the tessel
//! kernels.
//!
//! This crate provides:
//! - [`Array`]: dense `f32` buffer bound to its shape and strides
//! - [`Shape`]: dimension sizes, row-major strides, permutations
//! - [`broadcast`]: broadcast strides and flat-index → offset resolution
//! - [`Error`]: every precondition violation a kernel can report
//! - [`KernelConfig`]: parallelism and fast-path switches

pub mod array;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod operand;
pub mod shape;

pub use array::Array;
pub use broadcast::{batch_offset, broadcast_shape, broadcast_stride, flat_to_offset};
pub use config::KernelConfig;
pub use error::{Error, Result};
pub use operand::Operand;
pub use shape::{contiguous_strides, invert_permutation, Shape};
