//! # SBI Base Extension
//!
//! Calling convention and extension probing, which the timer uses at boot
//! to pick between the TIME extension and the legacy call.

use core::fmt;

// ============================================================================
// SBI Return Type
// ============================================================================

/// SBI call return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbiRet {
    /// Error code (0 = success)
    pub error: i64,
    /// Return value
    pub value: i64,
}

/// Standard SBI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbiError {
    /// SBI_ERR_FAILED
    Failed,
    /// SBI_ERR_NOT_SUPPORTED
    NotSupported,
    /// SBI_ERR_INVALID_PARAM
    InvalidParam,
    /// SBI_ERR_DENIED
    Denied,
    /// SBI_ERR_INVALID_ADDRESS
    InvalidAddress,
    /// Any other negative code
    Other(i64),
}

impl SbiError {
    /// Decode a non-zero error code
    pub const fn from_code(code: i64) -> Self {
        match code {
            -1 => SbiError::Failed,
            -2 => SbiError::NotSupported,
            -3 => SbiError::InvalidParam,
            -4 => SbiError::Denied,
            -5 => SbiError::InvalidAddress,
            other => SbiError::Other(other),
        }
    }
}

impl fmt::Display for SbiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SbiError::Failed => f.write_str("failed"),
            SbiError::NotSupported => f.write_str("not supported"),
            SbiError::InvalidParam => f.write_str("invalid parameter"),
            SbiError::Denied => f.write_str("denied"),
            SbiError::InvalidAddress => f.write_str("invalid address"),
            SbiError::Other(code) => write!(f, "error {}", code),
        }
    }
}

impl SbiRet {
    /// Check if the call succeeded
    pub fn is_success(&self) -> bool {
        self.error == 0
    }

    /// Get result as Result
    pub fn into_result(self) -> Result<i64, SbiError> {
        if self.is_success() {
            Ok(self.value)
        } else {
            Err(SbiError::from_code(self.error))
        }
    }
}

// ============================================================================
// SBI Call Wrappers
// ============================================================================

#[cfg(target_arch = "riscv64")]
pub use self::calls::*;

#[cfg(target_arch = "riscv64")]
mod calls {
    use super::SbiRet;
    use crate::arch::riscv64::sbi::{base_fid, eid};

    /// Make an SBI call with 1 argument
    #[inline]
    pub fn sbi_call_1(eid: usize, fid: usize, arg0: usize) -> SbiRet {
        let error: i64;
        let value: i64;

        unsafe {
            core::arch::asm!(
                "ecall",
                in("a7") eid,
                in("a6") fid,
                in("a0") arg0,
                lateout("a0") error,
                lateout("a1") value,
                options(nostack)
            );
        }

        SbiRet { error, value }
    }

    /// Check if an extension is available
    pub fn probe_extension(extension_id: usize) -> bool {
        let ret = sbi_call_1(eid::BASE, base_fid::PROBE_EXTENSION, extension_id);
        ret.is_success() && ret.value != 0
    }
}
