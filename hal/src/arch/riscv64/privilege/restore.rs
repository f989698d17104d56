//! # Return to User Mode
//!
//! Loads a saved `UserContext` into the register file and leaves the
//! kernel with `sret`. This is the only way out of a trap.
//!
//! ## Calling Contract
//!
//! - `ctx` points at a 35-word block laid out as described in
//!   [`registers`](crate::arch::riscv64::core::registers).
//! - `sepc` is taken from `NextIP` (word 34) and `sstatus` from word 32, so
//!   `SPP` in the saved status decides the privilege `sret` lands in.
//! - `sscratch` must hold this hart's trap stack top (see
//!   [`entry`](super::entry)). `ctx` is stored in the word below it, which is
//!   where the entry stub finds the context to save into on the next trap.
//! - `t0`/`t1` carry the base pointer and scratch values until the very
//!   end and are loaded last.
//!
//! The word offsets below are pinned by the layout assertions next to
//! `UserContext`.

#[cfg(target_arch = "riscv64")]
use crate::arch::riscv64::core::registers::UserContext;

/// Restore `ctx` and `sret` to it
///
/// # Safety
/// `ctx` must point to a valid, initialised `UserContext` that stays live
/// until the next trap on this hart, and [`entry::install`](super::entry::install)
/// must have run on this hart. Interrupts must be disabled in `sstatus`
/// (the saved `SPIE` decides what the user sees). No lock guards or borrows
/// may be outstanding: nothing after this point runs.
#[cfg(target_arch = "riscv64")]
pub unsafe fn restore_user_context(ctx: *mut UserContext) -> ! {
    // SAFETY: upheld by the caller
    unsafe {
        core::arch::asm!(
            "ld ra, 0(t0)",
            "ld sp, 8(t0)",
            "ld gp, 16(t0)",
            // tp, t0 and t1 come last
            "ld t2, 48(t0)",
            "ld s0, 56(t0)",
            "ld s1, 64(t0)",
            "ld a0, 72(t0)",
            "ld a1, 80(t0)",
            "ld a2, 88(t0)",
            "ld a3, 96(t0)",
            "ld a4, 104(t0)",
            "ld a5, 112(t0)",
            "ld a6, 120(t0)",
            "ld a7, 128(t0)",
            "ld s2, 136(t0)",
            "ld s3, 144(t0)",
            "ld s4, 152(t0)",
            "ld s5, 160(t0)",
            "ld s6, 168(t0)",
            "ld s7, 176(t0)",
            "ld s8, 184(t0)",
            "ld s9, 192(t0)",
            "ld s10, 200(t0)",
            "ld s11, 208(t0)",
            "ld t3, 216(t0)",
            "ld t4, 224(t0)",
            "ld t5, 232(t0)",
            "ld t6, 240(t0)",
            "ld t1, 24(t0)",
            "mv tp, t1",
            "ld t1, 272(t0)",
            "csrw sepc, t1",
            "csrr t1, sscratch",
            "sd t0, -8(t1)",
            "ld t1, 256(t0)",
            "csrw sstatus, t1",
            "ld t1, 40(t0)",
            "ld t0, 32(t0)",
            "sret",
            in("t0") ctx,
            options(noreturn)
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::arch::riscv64::core::registers::Register;

    // the immediates in the restore sequence
    #[test]
    fn test_restore_offsets() {
        assert_eq!(Register::Ra.offset(), 0);
        assert_eq!(Register::T2.offset(), 48);
        assert_eq!(Register::A0.offset(), 72);
        assert_eq!(Register::A7.offset(), 128);
        assert_eq!(Register::S2.offset(), 136);
        assert_eq!(Register::S11.offset(), 208);
        assert_eq!(Register::T3.offset(), 216);
        assert_eq!(Register::T6.offset(), 240);
        assert_eq!(Register::Tp.offset(), 24);
        assert_eq!(Register::NextIp.offset(), 272);
        assert_eq!(Register::SStatus.offset(), 256);
        assert_eq!(Register::T1.offset(), 40);
        assert_eq!(Register::T0.offset(), 32);
        assert_eq!(super::super::entry::CONTEXT_SLOT, 8);
    }
}
