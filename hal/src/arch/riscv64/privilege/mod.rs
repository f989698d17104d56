//! # User/Kernel Boundary
//!
//! ## Submodules
//!
//! - `entry`: the `stvec` stub that saves user registers (riscv64 code only)
//! - `syscall`: syscall numbers and register arguments
//! - `traps`: trap triage and dispatch into the kernel
//! - `restore`: the final `sret` back to user mode

pub mod entry;
pub mod restore;
pub mod syscall;
pub mod traps;

pub use syscall::{Syscall, SyscallArgs, SYSCALL_MAX, SYSCALL_MIN};
pub use traps::{IrqControl, Kernel, TrapDispatcher, TrapLocks, TrapStats, VmFaultType, TRAP_LOCKS};
