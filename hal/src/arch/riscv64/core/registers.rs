//! # Saved User Register Block
//!
//! The register file of a user thread as it is stored in the thread's control
//! block while the thread is not running on a hart.
//!
//! ## Layout
//!
//! The block is 35 machine words. `x0` is never stored, so word 0 holds `ra`
//! (x1) and the integer registers follow in architectural order up to `t6`
//! (x31, word 30). The trailing words hold the supervisor state captured at
//! trap entry:
//!
//! | Word | Register | Description                          |
//! |------|----------|--------------------------------------|
//! | 0-30 | x1-x31   | Integer registers                    |
//! | 31   | scause   | Cause of the last trap               |
//! | 32   | sstatus  | Status restored before `sret`        |
//! | 33   | FaultIP  | PC of the faulting instruction       |
//! | 34   | NextIP   | PC resumed by `sret` (loaded to sepc) |
//!
//! The resumption routine in [`crate::arch::riscv64::privilege::restore`]
//! indexes this block by word offset, so the order here is a contract with
//! that assembly.

use core::ops::{Index, IndexMut};

use static_assertions::{const_assert_eq, assert_eq_size};

/// Native machine word
pub type Word = u64;

/// Size of a machine word in bytes
pub const WORD_SIZE: usize = core::mem::size_of::<Word>();

/// Number of words in a saved user context
pub const CONTEXT_WORDS: usize = 35;

// ============================================================================
// Register Indices
// ============================================================================

/// Word index of a register inside [`UserContext`]
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum Register {
    Ra = 0,
    Sp = 1,
    Gp = 2,
    Tp = 3,
    T0 = 4,
    T1 = 5,
    T2 = 6,
    S0 = 7,
    S1 = 8,
    A0 = 9,
    A1 = 10,
    A2 = 11,
    A3 = 12,
    A4 = 13,
    A5 = 14,
    A6 = 15,
    A7 = 16,
    S2 = 17,
    S3 = 18,
    S4 = 19,
    S5 = 20,
    S6 = 21,
    S7 = 22,
    S8 = 23,
    S9 = 24,
    S10 = 25,
    S11 = 26,
    T3 = 27,
    T4 = 28,
    T5 = 29,
    T6 = 30,
    /// Trap cause captured at entry
    SCause = 31,
    /// Status register restored before `sret`
    SStatus = 32,
    /// PC of the instruction that trapped
    FaultIp = 33,
    /// PC the thread resumes at
    NextIp = 34,
}

impl Register {
    /// Frame pointer alias
    pub const FP: Register = Register::S0;

    /// Register holding the first syscall argument / return value
    pub const CAP_REG: Register = Register::A0;

    /// Register holding the message info word
    pub const MSG_INFO_REG: Register = Register::A1;

    /// Register holding the syscall number
    pub const SYSCALL_NUM_REG: Register = Register::A7;

    /// Word index inside the saved block
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Byte offset inside the saved block
    pub const fn offset(self) -> usize {
        self.index() * WORD_SIZE
    }

    /// ABI name of the register
    pub const fn name(self) -> &'static str {
        match self {
            Register::Ra => "ra",
            Register::Sp => "sp",
            Register::Gp => "gp",
            Register::Tp => "tp",
            Register::T0 => "t0",
            Register::T1 => "t1",
            Register::T2 => "t2",
            Register::S0 => "s0",
            Register::S1 => "s1",
            Register::A0 => "a0",
            Register::A1 => "a1",
            Register::A2 => "a2",
            Register::A3 => "a3",
            Register::A4 => "a4",
            Register::A5 => "a5",
            Register::A6 => "a6",
            Register::A7 => "a7",
            Register::S2 => "s2",
            Register::S3 => "s3",
            Register::S4 => "s4",
            Register::S5 => "s5",
            Register::S6 => "s6",
            Register::S7 => "s7",
            Register::S8 => "s8",
            Register::S9 => "s9",
            Register::S10 => "s10",
            Register::S11 => "s11",
            Register::T3 => "t3",
            Register::T4 => "t4",
            Register::T5 => "t5",
            Register::T6 => "t6",
            Register::SCause => "scause",
            Register::SStatus => "sstatus",
            Register::FaultIp => "FaultIP",
            Register::NextIp => "NextIP",
        }
    }
}

// ============================================================================
// Saved Context
// ============================================================================

/// Saved register file of a user thread
///
/// Opaque to the trap path: it is restored verbatim and never interpreted
/// beyond the fixed word positions above.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    regs: [Word; CONTEXT_WORDS],
}

assert_eq_size!(UserContext, [Word; CONTEXT_WORDS]);
const_assert_eq!(core::mem::size_of::<UserContext>(), 35 * 8);
const_assert_eq!(Register::Tp.offset(), 3 * 8);
const_assert_eq!(Register::T0.offset(), 4 * 8);
const_assert_eq!(Register::T1.offset(), 5 * 8);
const_assert_eq!(Register::T6.offset(), 30 * 8);
const_assert_eq!(Register::SStatus.offset(), 32 * 8);
const_assert_eq!(Register::NextIp.offset(), 34 * 8);

impl UserContext {
    /// Create a zeroed context
    pub const fn new() -> Self {
        Self { regs: [0; CONTEXT_WORDS] }
    }

    /// Create a context that enters user mode at `entry` with stack `sp`
    ///
    /// `sstatus` is set so that `sret` drops to U-mode with interrupts
    /// enabled once there.
    pub fn for_entry(entry: Word, sp: Word) -> Self {
        use super::csr::status;

        let mut ctx = Self::new();
        ctx[Register::NextIp] = entry;
        ctx[Register::FaultIp] = entry;
        ctx[Register::Sp] = sp;
        ctx[Register::SStatus] = status::SPIE;
        ctx
    }

    /// Get a register value
    #[inline]
    pub fn get(&self, reg: Register) -> Word {
        self.regs[reg.index()]
    }

    /// Set a register value
    #[inline]
    pub fn set(&mut self, reg: Register, value: Word) {
        self.regs[reg.index()] = value;
    }

    /// PC the thread resumes at
    #[inline]
    pub fn next_ip(&self) -> Word {
        self.get(Register::NextIp)
    }

    /// Raw words, in restore order
    pub fn as_words(&self) -> &[Word; CONTEXT_WORDS] {
        &self.regs
    }

    /// Base pointer handed to the resumption routine
    pub fn as_mut_ptr(&mut self) -> *mut UserContext {
        self as *mut UserContext
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<Register> for UserContext {
    type Output = Word;

    fn index(&self, reg: Register) -> &Word {
        &self.regs[reg.index()]
    }
}

impl IndexMut<Register> for UserContext {
    fn index_mut(&mut self, reg: Register) -> &mut Word {
        &mut self.regs[reg.index()]
    }
}
