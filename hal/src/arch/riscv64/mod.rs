//! # RISC-V 64-bit Supervisor Trap Layer
//!
//! Interrupt and trap management for the kernel running in S-mode on RV64.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │          trap from U-mode: entry stub saves UserContext          │
//! └────────────────────────────────┬─────────────────────────────────┘
//!                                  ▼
//!                       handle_trap (scause)
//!                 ┌──────────────────┼──────────────────┐
//!                 ▼                  ▼                  ▼
//!          interrupt trap     exception trap      syscall trap
//!                 │                  │                  │
//!          IrqState (latch)   VM / user fault    fastpath / slowpath
//!                 │                  │                  │
//!     InterruptController            │                  │
//!     (SiFive/MiG-V/HCSC1/null)      │                  │
//!                 └──────────────────┼──────────────────┘
//!                                    ▼
//!                        restore_user_context → sret
//! ```
//!
//! ## Module Organization
//!
//! - [`core`]: CSRs, the saved register block and the [`Cpu`](core::cpu::Cpu) trait
//! - [`interrupts`]: controller drivers and the active-interrupt latch
//! - [`timers`]: the kernel tick
//! - [`sbi`]: firmware calls (riscv64 only)
//! - [`smp`]: hart identifiers
//! - [`privilege`]: trap entry, syscall numbering, dispatch and return to user
//! - [`platform`]: build-time choice of controller

// =============================================================================
// CORE FRAMEWORK
// =============================================================================

pub mod core;

// =============================================================================
// INTERRUPT FRAMEWORK
// =============================================================================

pub mod interrupts;

// =============================================================================
// TIMER FRAMEWORK
// =============================================================================

pub mod timers;

// =============================================================================
// SBI INTERFACE
// =============================================================================

pub mod sbi;

// =============================================================================
// SYMMETRIC MULTI-PROCESSING
// =============================================================================

pub mod smp;

// =============================================================================
// PRIVILEGE BOUNDARY
// =============================================================================

pub mod privilege;

// =============================================================================
// PLATFORM
// =============================================================================

pub mod platform;

/// Harts with an S-mode context on the largest supported board
pub const MAX_HARTS: usize = 4;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use self::core::{
    cpu::Cpu,
    csr::{Interrupts, TrapCause},
    registers::{Register, UserContext, Word},
};

pub use interrupts::{InterruptController, Irq, IrqError, IrqLine, IrqState, TriggerControl, TriggerMode};

pub use platform::{platform_controller, PlatformConfig, PlatformController, PLATFORM, PLIC_PPTR};

pub use privilege::{
    IrqControl, Kernel, Syscall, SyscallArgs, TrapDispatcher, TrapLocks, TrapStats, VmFaultType, TRAP_LOCKS,
};

pub use smp::HartId;

pub use timers::{TickTimer, TimerConfig, TimerDevice};

#[cfg(target_arch = "riscv64")]
pub use self::core::cpu::SupervisorCpu;

#[cfg(target_arch = "riscv64")]
pub use sbi::timer::SbiTimer;

/// Trap dispatcher for the configured platform on real hardware
#[cfg(target_arch = "riscv64")]
pub type HartDispatcher = TrapDispatcher<PlatformController, SupervisorCpu, SbiTimer>;

/// Build the dispatcher of `hart` for the configured platform
///
/// # Safety
/// The controller window at [`PLIC_PPTR`] must be mapped, and this must run
/// on `hart` itself.
#[cfg(target_arch = "riscv64")]
pub unsafe fn hart_dispatcher(hart: HartId) -> Result<HartDispatcher, IrqError> {
    // SAFETY: forwarded from the caller
    let ctrl = unsafe { platform_controller(hart)? };
    let timer = TickTimer::new(SbiTimer::probe(), PLATFORM.timer);
    Ok(TrapDispatcher::new(hart, ctrl, SupervisorCpu, timer, &TRAP_LOCKS))
}
