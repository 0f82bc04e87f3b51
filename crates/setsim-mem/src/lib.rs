#![forbid(unsafe_code)]
//! setsim-mem: hard memory budgeting for kernel output buffers.
//!
//! This crate provides the concrete implementation of the interfaces defined
//! in `setsim-core::budget`. Kernels acquire a guard sized for their output
//! before allocating it; dropping the guard returns the bytes.

pub mod error;
pub mod guard;

pub use error::{Error, Result};
pub use guard::{BudgetGuardImpl, MemoryBudgetImpl};
