//! # SBI Timer
//!
//! Supervisor timer programming through the SEE. The TIME extension is used
//! when the firmware offers it; older firmware only has the legacy v0.1
//! `sbi_set_timer` call.

/// How the firmware is asked to program the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerInterface {
    /// TIME extension, `sbi_set_timer` FID 0
    TimeExtension,
    /// SBI v0.1 legacy call
    Legacy,
}

impl TimerInterface {
    /// Extension and function ID of the set-timer call
    pub const fn call_ids(self) -> (usize, usize) {
        match self {
            TimerInterface::TimeExtension => (super::eid::TIME, super::time_fid::SET_TIMER),
            TimerInterface::Legacy => (super::eid::LEGACY_SET_TIMER, 0),
        }
    }
}

#[cfg(target_arch = "riscv64")]
pub use self::hw::SbiTimer;

#[cfg(target_arch = "riscv64")]
mod hw {
    use super::TimerInterface;
    use crate::arch::riscv64::core::csr;
    use crate::arch::riscv64::sbi::base::{probe_extension, sbi_call_1};
    use crate::arch::riscv64::sbi::eid;
    use crate::arch::riscv64::timers::TimerDevice;

    /// `rdtime` counter plus SBI deadline programming
    #[derive(Debug)]
    pub struct SbiTimer {
        interface: TimerInterface,
    }

    impl SbiTimer {
        /// Probe the firmware and pick the set-timer interface
        pub fn probe() -> Self {
            let interface = if probe_extension(eid::TIME) {
                TimerInterface::TimeExtension
            } else {
                log::info!("SBI: no TIME extension, using legacy set_timer");
                TimerInterface::Legacy
            };
            Self { interface }
        }

        /// Interface in use
        pub fn interface(&self) -> TimerInterface {
            self.interface
        }
    }

    impl TimerDevice for SbiTimer {
        #[inline]
        fn now(&self) -> u64 {
            csr::read_time()
        }

        fn set_deadline(&mut self, deadline: u64) {
            let (eid, fid) = self.interface.call_ids();
            let ret = sbi_call_1(eid, fid, deadline as usize);
            // legacy calls leave a0 undefined
            if self.interface == TimerInterface::TimeExtension {
                if let Err(err) = ret.into_result() {
                    log::warn!("SBI: set_timer({}) failed: {}", deadline, err);
                }
            }
        }
    }
}
