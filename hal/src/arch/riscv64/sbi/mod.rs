//! # Supervisor Binary Interface
//!
//! The kernel only needs two things from the SEE: the base extension to
//! probe what the firmware offers, and a way to program the supervisor timer.
//!
//! - [`base`]: calling convention, [`SbiRet`], extension probing
//! - [`timer`]: `set_timer` and the [`SbiTimer`](timer::SbiTimer) device

pub mod base;
pub mod timer;

pub use base::{SbiError, SbiRet};

/// Extension IDs
pub mod eid {
    /// Legacy `sbi_set_timer` (SBI v0.1)
    pub const LEGACY_SET_TIMER: usize = 0x00;
    /// Base extension
    pub const BASE: usize = 0x10;
    /// Timer extension ("TIME")
    pub const TIME: usize = 0x5449_4D45;
}

/// Base extension function IDs
pub mod base_fid {
    /// Probe SBI extension
    pub const PROBE_EXTENSION: usize = 3;
}

/// Timer extension function IDs
pub mod time_fid {
    /// Program the next timer event
    pub const SET_TIMER: usize = 0;
}
