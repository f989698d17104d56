//! # RISC-V Core Framework
//!
//! CPU-level primitives for the supervisor trap path.
//!
//! - [`csr`]: Control and Status Registers and trap-cause decoding
//! - [`registers`]: The saved user register block
//! - [`cpu`]: The per-hart operations the trap path needs from the processor

pub mod cpu;
pub mod csr;
pub mod registers;
