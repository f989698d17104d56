//! # RISC-V Control and Status Registers (CSRs)
//!
//! Supervisor-level CSR bit layouts and trap-cause codes used by
//! the trap path.
//!
//! ## Cause Register Layout (RV64)
//!
//! ```text
//!  63   62                                   0
//! +----+--------------------------------------+
//! | IR |            exception code            |
//! +----+--------------------------------------+
//! ```
//!
//! `IR` set means the trap is an asynchronous interrupt; clear means a
//! synchronous exception (including `ecall`).
//!
//! The raw accessors at the bottom of this file only exist on `riscv64`.

// ============================================================================
// Status Register Bits (sstatus)
// ============================================================================

/// Status register bits
pub mod status {
    /// Supervisor Interrupt Enable
    pub const SIE: u64 = 1 << 1;
    /// Supervisor Previous Interrupt Enable
    pub const SPIE: u64 = 1 << 5;
    /// Supervisor Previous Privilege (1 bit)
    pub const SPP: u64 = 1 << 8;
}

// ============================================================================
// Interrupt Enable/Pending Bits (sie/sip)
// ============================================================================

bitflags::bitflags! {
    /// Supervisor interrupt bits, shared by `sie` and `sip`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interrupts: u64 {
        /// Supervisor software interrupt
        const SSOFT = 1 << 1;
        /// Supervisor timer interrupt
        const STIMER = 1 << 5;
        /// Supervisor external interrupt
        const SEXT = 1 << 9;
    }
}

// ============================================================================
// Trap Cause Codes (scause)
// ============================================================================

/// Exception cause codes (bit 63 = 0)
pub mod exception {
    /// Instruction address misaligned
    pub const INSTRUCTION_MISALIGNED: u64 = 0;
    /// Instruction access fault
    pub const INSTRUCTION_ACCESS_FAULT: u64 = 1;
    /// Illegal instruction
    pub const ILLEGAL_INSTRUCTION: u64 = 2;
    /// Breakpoint
    pub const BREAKPOINT: u64 = 3;
    /// Load address misaligned
    pub const LOAD_MISALIGNED: u64 = 4;
    /// Load access fault
    pub const LOAD_ACCESS_FAULT: u64 = 5;
    /// Store/AMO address misaligned
    pub const STORE_MISALIGNED: u64 = 6;
    /// Store/AMO access fault
    pub const STORE_ACCESS_FAULT: u64 = 7;
    /// Environment call from U-mode
    pub const ECALL_FROM_U: u64 = 8;
    /// Environment call from S-mode
    pub const ECALL_FROM_S: u64 = 9;
    /// Instruction page fault
    pub const INSTRUCTION_PAGE_FAULT: u64 = 12;
    /// Load page fault
    pub const LOAD_PAGE_FAULT: u64 = 13;
    /// Store/AMO page fault
    pub const STORE_PAGE_FAULT: u64 = 15;
}

/// Interrupt cause codes (bit 63 = 1)
pub mod irq_cause {
    /// Supervisor software interrupt
    pub const SUPERVISOR_SOFTWARE: u64 = 1;
    /// Supervisor timer interrupt
    pub const SUPERVISOR_TIMER: u64 = 5;
    /// Supervisor external interrupt
    pub const SUPERVISOR_EXTERNAL: u64 = 9;
}

/// Interrupt bit in cause register
pub const CAUSE_INTERRUPT_BIT: u64 = 1 << 63;

// ============================================================================
// Cause Analysis
// ============================================================================

/// Parsed trap cause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapCause {
    /// Is this an interrupt (true) or exception (false)?
    pub is_interrupt: bool,
    /// The cause code
    pub code: u64,
}

impl TrapCause {
    /// Parse from raw scause value
    pub const fn from_scause(scause: u64) -> Self {
        Self {
            is_interrupt: (scause & CAUSE_INTERRUPT_BIT) != 0,
            code: scause & !CAUSE_INTERRUPT_BIT,
        }
    }

    /// Rebuild the raw scause value
    pub const fn to_scause(self) -> u64 {
        if self.is_interrupt {
            self.code | CAUSE_INTERRUPT_BIT
        } else {
            self.code
        }
    }

    /// Get cause name
    pub fn name(&self) -> &'static str {
        if self.is_interrupt {
            match self.code {
                irq_cause::SUPERVISOR_SOFTWARE => "Supervisor Software Interrupt",
                irq_cause::SUPERVISOR_TIMER => "Supervisor Timer Interrupt",
                irq_cause::SUPERVISOR_EXTERNAL => "Supervisor External Interrupt",
                _ => "Unknown Interrupt",
            }
        } else {
            match self.code {
                exception::INSTRUCTION_MISALIGNED => "Instruction Address Misaligned",
                exception::INSTRUCTION_ACCESS_FAULT => "Instruction Access Fault",
                exception::ILLEGAL_INSTRUCTION => "Illegal Instruction",
                exception::BREAKPOINT => "Breakpoint",
                exception::LOAD_MISALIGNED => "Load Address Misaligned",
                exception::LOAD_ACCESS_FAULT => "Load Access Fault",
                exception::STORE_MISALIGNED => "Store/AMO Address Misaligned",
                exception::STORE_ACCESS_FAULT => "Store/AMO Access Fault",
                exception::ECALL_FROM_U => "Environment Call from U-mode",
                exception::ECALL_FROM_S => "Environment Call from S-mode",
                exception::INSTRUCTION_PAGE_FAULT => "Instruction Page Fault",
                exception::LOAD_PAGE_FAULT => "Load Page Fault",
                exception::STORE_PAGE_FAULT => "Store/AMO Page Fault",
                _ => "Unknown Exception",
            }
        }
    }
}

// ============================================================================
// Supervisor CSR Access Functions
// ============================================================================

#[cfg(target_arch = "riscv64")]
pub use self::access::*;

#[cfg(target_arch = "riscv64")]
mod access {
    use core::arch::asm;

    /// Clear bits in sstatus
    #[inline]
    pub fn clear_sstatus(bits: u64) {
        unsafe {
            asm!("csrc sstatus, {}", in(reg) bits, options(nomem, nostack));
        }
    }

    /// Set bits in sie
    #[inline]
    pub fn set_sie(bits: u64) {
        unsafe {
            asm!("csrs sie, {}", in(reg) bits, options(nomem, nostack));
        }
    }

    /// Clear bits in sie
    #[inline]
    pub fn clear_sie(bits: u64) {
        unsafe {
            asm!("csrc sie, {}", in(reg) bits, options(nomem, nostack));
        }
    }

    /// Read sip (supervisor interrupt pending)
    #[inline]
    pub fn read_sip() -> u64 {
        let value: u64;
        unsafe {
            asm!("csrr {}, sip", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }

    /// Read scause
    #[inline]
    pub fn read_scause() -> u64 {
        let value: u64;
        unsafe {
            asm!("csrr {}, scause", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }

    /// Read stval
    #[inline]
    pub fn read_stval() -> u64 {
        let value: u64;
        unsafe {
            asm!("csrr {}, stval", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }

    /// Point `stvec` at `base` in direct mode
    #[inline]
    pub fn write_stvec(base: usize) {
        unsafe {
            asm!("csrw stvec, {}", in(reg) base, options(nomem, nostack));
        }
    }

    /// Write sscratch
    #[inline]
    pub fn write_sscratch(value: usize) {
        unsafe {
            asm!("csrw sscratch, {}", in(reg) value, options(nomem, nostack));
        }
    }

    /// Read time counter
    #[inline]
    pub fn read_time() -> u64 {
        let value: u64;
        unsafe {
            asm!("rdtime {}", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }
}
