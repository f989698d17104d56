//! # Corvid Hardware Abstraction Layer
//!
//! Architecture-specific trap and interrupt management for the Corvid
//! microkernel running in RISC-V supervisor mode.
//!
//! The crate provides:
//!
//! - one [`InterruptController`] contract over the supported PLIC variants
//!   (SiFive multi-hart, MiG-V, legacy HCSC1, and a null controller),
//! - the per-hart active-interrupt latch ([`IrqState`]),
//! - trap triage and dispatch ([`TrapDispatcher`]) which always ends by
//!   resuming exactly one user context.
//!
//! Everything that needs a RISC-V instruction is compiled only for
//! `target_arch = "riscv64"`. The rest builds on any host so the drivers,
//! the latch and the dispatcher can be unit-tested against simulated
//! hardware.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod arch;

#[cfg(test)]
pub(crate) mod testing;

pub use arch::riscv64::{
    core::{
        cpu::Cpu,
        csr::{Interrupts, TrapCause},
        registers::{Register, UserContext, Word},
    },
    interrupts::{
        irq::IrqState, InterruptController, Irq, IrqError, IrqLine, TriggerControl, TriggerMode,
    },
    platform::{PlatformConfig, PlatformController},
    privilege::{
        syscall::{Syscall, SyscallArgs},
        traps::{IrqControl, Kernel, TrapDispatcher, TrapLocks, TrapStats, VmFaultType},
    },
    smp::hartid::HartId,
    timers::{TickTimer, TimerConfig, TimerDevice},
};
