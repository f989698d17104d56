//! # Trap Entry
//!
//! The `stvec` target for traps taken from U-mode. It spills the user
//! register file into the current thread's
//! [`UserContext`](crate::arch::riscv64::core::registers::UserContext), moves onto the
//! hart's trap stack and calls the kernel's `corvid_handle_trap`, which
//! routes into [`TrapDispatcher::handle_trap`](super::TrapDispatcher::handle_trap).
//!
//! ## Per-Hart Trap Stack
//!
//! ```text
//!   top ──────────▶ +------------------+
//!                   | context pointer  |  top - 8   (CONTEXT_SLOT)
//!                   | user t0 (spill)  |  top - 16  (SPILL_SLOT)
//!   sp at call ───▶ +------------------+
//!                   |   handler frames |
//!                   ▼                  ▼
//! ```
//!
//! `sscratch` holds `top` whenever the hart runs user code.
//! [`restore_user_context`](super::restore::restore_user_context) writes the
//! pointer of the context it restores into the top slot, so the next trap
//! saves into the same block it was resumed from.
//!
//! ## Handler Contract
//!
//! ```ignore
//! #[no_mangle]
//! extern "C" fn corvid_handle_trap(ctx: *mut UserContext, stack_top: usize) -> ! {
//!     // pick this hart's dispatcher from `stack_top`, then
//!     dispatcher.handle_trap(&mut kernel)
//! }
//! ```
//!
//! `ctx` already holds every user register plus `scause`, `sstatus` and
//! `sepc` (in both `FaultIP` and `NextIP`). Interrupts are off: the trap
//! cleared `sstatus.SIE`.

#[cfg(target_arch = "riscv64")]
use crate::arch::riscv64::core::registers::UserContext;

/// Offset below the stack top of the saved context pointer
pub const CONTEXT_SLOT: usize = 8;

/// Offset below the stack top of the user `t0` spill
pub const SPILL_SLOT: usize = 16;

/// Bytes at the top of every trap stack owned by the entry stub
pub const STACK_TOP_RESERVED: usize = 16;

/// Required alignment of a trap stack top
pub const STACK_ALIGN: usize = 16;

/// Check a trap stack top before it is installed
pub const fn valid_stack_top(top: usize) -> bool {
    top != 0 && top % STACK_ALIGN == 0
}

/// Context pointer slot of the trap stack ending at `top`
pub const fn context_slot(top: usize) -> usize {
    top - CONTEXT_SLOT
}

#[cfg(target_arch = "riscv64")]
extern "C" {
    /// Provided by the kernel image
    fn corvid_handle_trap(ctx: *mut UserContext, stack_top: usize) -> !;
}

#[cfg(target_arch = "riscv64")]
core::arch::global_asm!(
    ".section .text.corvid_trap_entry, \"ax\"",
    ".balign 4",
    ".global corvid_trap_entry",
    "corvid_trap_entry:",
    // sp = trap stack top, sscratch = user sp
    "csrrw sp, sscratch, sp",
    "sd t0, -16(sp)",
    "ld t0, -8(sp)",
    "sd ra, 0(t0)",
    "sd gp, 16(t0)",
    "sd tp, 24(t0)",
    "sd t1, 40(t0)",
    "sd t2, 48(t0)",
    "sd s0, 56(t0)",
    "sd s1, 64(t0)",
    "sd a0, 72(t0)",
    "sd a1, 80(t0)",
    "sd a2, 88(t0)",
    "sd a3, 96(t0)",
    "sd a4, 104(t0)",
    "sd a5, 112(t0)",
    "sd a6, 120(t0)",
    "sd a7, 128(t0)",
    "sd s2, 136(t0)",
    "sd s3, 144(t0)",
    "sd s4, 152(t0)",
    "sd s5, 160(t0)",
    "sd s6, 168(t0)",
    "sd s7, 176(t0)",
    "sd s8, 184(t0)",
    "sd s9, 192(t0)",
    "sd s10, 200(t0)",
    "sd s11, 208(t0)",
    "sd t3, 216(t0)",
    "sd t4, 224(t0)",
    "sd t5, 232(t0)",
    "sd t6, 240(t0)",
    "ld t1, -16(sp)",
    "sd t1, 32(t0)",
    // user sp back out, sscratch = stack top again
    "csrrw t1, sscratch, sp",
    "sd t1, 8(t0)",
    "csrr t1, scause",
    "sd t1, 248(t0)",
    "csrr t1, sstatus",
    "sd t1, 256(t0)",
    "csrr t1, sepc",
    "sd t1, 264(t0)",
    "sd t1, 272(t0)",
    "mv a0, t0",
    "mv a1, sp",
    "addi sp, sp, -16",
    "call {handler}",
    // the handler never returns
    "1: wfi",
    "j 1b",
    handler = sym corvid_handle_trap,
);

#[cfg(target_arch = "riscv64")]
extern "C" {
    fn corvid_trap_entry();
}

/// Point this hart's `stvec` at the entry stub and give it a trap stack
///
/// # Safety
/// `stack_top` must be the 16-byte aligned end of a stack reserved for this
/// hart's traps, large enough for the deepest kernel path, and it must stay
/// reserved for as long as the hart can trap. Must run on the hart itself.
#[cfg(target_arch = "riscv64")]
pub unsafe fn install(stack_top: usize) {
    use crate::arch::riscv64::core::csr;

    debug_assert!(valid_stack_top(stack_top), "bad trap stack top {:#x}", stack_top);
    csr::write_sscratch(stack_top);
    csr::write_stvec(corvid_trap_entry as usize);
    log::debug!("trap entry at {:#x}, stack top {:#x}", corvid_trap_entry as usize, stack_top);
}
