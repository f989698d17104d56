//! # Hart Primitives
//!
//! The trap path never touches CSRs directly. It goes through [`Cpu`], which
//! the hardware backend implements with `csrr`/`csrs`/`csrc` and which tests
//! implement with a recording mock.

use super::csr::Interrupts;
use super::registers::UserContext;

/// Processor operations used while handling a trap on the current hart
pub trait Cpu {
    /// Read `scause`
    fn read_scause(&self) -> u64;

    /// Read `stval`
    fn read_stval(&self) -> u64;

    /// Read the pending interrupt bits from `sip`
    fn read_sip(&self) -> Interrupts;

    /// Set bits in `sie`
    fn enable_sie(&self, bits: Interrupts);

    /// Clear bits in `sie`
    fn disable_sie(&self, bits: Interrupts);

    /// Stop this hart for good
    fn halt(&self) -> !;

    /// Load `ctx` into the register file and `sret` to it
    ///
    /// # Safety
    /// `ctx` must point to a live [`UserContext`] that stays valid until the
    /// next trap on this hart, and no lock or borrow may be outstanding.
    unsafe fn return_to_user(&self, ctx: *mut UserContext) -> !;
}

// ============================================================================
// Hardware Backend
// ============================================================================

#[cfg(target_arch = "riscv64")]
pub use self::hw::SupervisorCpu;

#[cfg(target_arch = "riscv64")]
mod hw {
    use super::*;
    use crate::arch::riscv64::core::csr;
    use crate::arch::riscv64::privilege::restore;

    /// The hart this code is running on, in S-mode
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SupervisorCpu;

    impl Cpu for SupervisorCpu {
        #[inline]
        fn read_scause(&self) -> u64 {
            csr::read_scause()
        }

        #[inline]
        fn read_stval(&self) -> u64 {
            csr::read_stval()
        }

        #[inline]
        fn read_sip(&self) -> Interrupts {
            Interrupts::from_bits_truncate(csr::read_sip())
        }

        #[inline]
        fn enable_sie(&self, bits: Interrupts) {
            csr::set_sie(bits.bits());
        }

        #[inline]
        fn disable_sie(&self, bits: Interrupts) {
            csr::clear_sie(bits.bits());
        }

        fn halt(&self) -> ! {
            csr::clear_sstatus(csr::status::SIE);
            loop {
                unsafe {
                    core::arch::asm!("wfi", options(nomem, nostack));
                }
            }
        }

        unsafe fn return_to_user(&self, ctx: *mut UserContext) -> ! {
            // SAFETY: forwarded from the caller
            unsafe { restore::restore_user_context(ctx) }
        }
    }
}
