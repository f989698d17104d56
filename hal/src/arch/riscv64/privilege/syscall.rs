//! # System Call Numbers
//!
//! Syscalls enter through `ecall` with the number in `a7`, the capability
//! pointer in `a0`, the message info in `a1` and up to five more message
//! words in `a2`-`a6`. Numbers are negative; the legal range is
//! [`SYSCALL_MIN`]`..=`[`SYSCALL_MAX`].

use crate::arch::riscv64::core::registers::{Register, UserContext, Word};

/// Lowest legal syscall number
pub const SYSCALL_MIN: i64 = -8;

/// Highest legal syscall number
pub const SYSCALL_MAX: i64 = -1;

/// Kernel system calls
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syscall {
    /// Send and wait for the reply
    Call = -1,
    /// Reply to the last caller, then wait for the next message
    ReplyRecv = -2,
    /// Blocking send
    Send = -3,
    /// Non-blocking send
    NBSend = -4,
    /// Blocking receive
    Recv = -5,
    /// Reply to the last caller
    Reply = -6,
    /// Give up the rest of the timeslice
    Yield = -7,
    /// Non-blocking receive
    NBRecv = -8,
}

impl Syscall {
    /// Decode a raw syscall number; `None` outside the legal range
    pub const fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            -1 => Some(Self::Call),
            -2 => Some(Self::ReplyRecv),
            -3 => Some(Self::Send),
            -4 => Some(Self::NBSend),
            -5 => Some(Self::Recv),
            -6 => Some(Self::Reply),
            -7 => Some(Self::Yield),
            -8 => Some(Self::NBRecv),
            _ => None,
        }
    }

    /// Raw syscall number
    #[inline]
    pub const fn raw(self) -> i64 {
        self as i64
    }

    /// Whether the accelerated IPC path handles this call
    pub const fn is_fastpath(self) -> bool {
        matches!(self, Self::Call | Self::ReplyRecv)
    }

    /// Get the syscall name for logging
    pub const fn name(self) -> &'static str {
        match self {
            Self::Call => "Call",
            Self::ReplyRecv => "ReplyRecv",
            Self::Send => "Send",
            Self::NBSend => "NBSend",
            Self::Recv => "Recv",
            Self::Reply => "Reply",
            Self::Yield => "Yield",
            Self::NBRecv => "NBRecv",
        }
    }
}

impl TryFrom<i64> for Syscall {
    type Error = i64;

    fn try_from(raw: i64) -> Result<Self, i64> {
        Self::from_raw(raw).ok_or(raw)
    }
}

/// Register arguments of a syscall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyscallArgs {
    /// Capability pointer (`a0`)
    pub cptr: Word,
    /// Message info (`a1`)
    pub msg_info: Word,
    /// Message words passed in `a2`-`a6`
    pub msg: [Word; 5],
}

impl SyscallArgs {
    /// Arguments as passed by the entry stub
    pub const fn new(cptr: Word, msg_info: Word, msg: [Word; 5]) -> Self {
        Self { cptr, msg_info, msg }
    }

    /// Arguments and raw number from a saved context
    pub fn from_context(ctx: &UserContext) -> (Self, i64) {
        let args = Self {
            cptr: ctx[Register::CAP_REG],
            msg_info: ctx[Register::MSG_INFO_REG],
            msg: [
                ctx[Register::A2],
                ctx[Register::A3],
                ctx[Register::A4],
                ctx[Register::A5],
                ctx[Register::A6],
            ],
        };
        (args, ctx[Register::SYSCALL_NUM_REG] as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_matches_decoder() {
        for raw in SYSCALL_MIN..=SYSCALL_MAX {
            let sys = Syscall::from_raw(raw).unwrap();
            assert_eq!(sys.raw(), raw);
        }
        assert_eq!(Syscall::from_raw(SYSCALL_MIN - 1), None);
        assert_eq!(Syscall::from_raw(SYSCALL_MAX + 1), None);
        assert_eq!(Syscall::try_from(42), Err(42));
    }

    #[test]
    fn test_fastpath_set() {
        assert!(Syscall::Call.is_fastpath());
        assert!(Syscall::ReplyRecv.is_fastpath());
        assert!(!Syscall::Send.is_fastpath());
        assert!(!Syscall::Yield.is_fastpath());
    }

    #[test]
    fn test_args_from_context() {
        let mut ctx = UserContext::new();
        ctx[Register::A0] = 0x10;
        ctx[Register::A1] = 0x20;
        ctx[Register::A6] = 0x66;
        ctx[Register::A7] = (-5i64) as Word;

        let (args, raw) = SyscallArgs::from_context(&ctx);
        assert_eq!(args.cptr, 0x10);
        assert_eq!(args.msg_info, 0x20);
        assert_eq!(args.msg[4], 0x66);
        assert_eq!(Syscall::from_raw(raw), Some(Syscall::Recv));
    }
}
