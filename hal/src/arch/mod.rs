//! # Architecture Support
//!
//! Corvid only targets RISC-V. The module is always compiled; instructions
//! that exist only on RISC-V are gated inside it.

pub mod riscv64;
