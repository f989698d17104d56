//! # Platform Selection
//!
//! Exactly one interrupt controller is built into the kernel, chosen by a
//! `platform-*` cargo feature. Everything outside this file names the
//! controller only through [`PlatformController`].
//!
//! | Feature           | Controller       | Lines |
//! |-------------------|------------------|-------|
//! | `platform-hifive` | [`SifivePlic`]   | 53    |
//! | `platform-migv`   | [`MigvPlic`]     | 24    |
//! | `platform-hcsc1`  | [`Hcsc1Plic`]    | 24    |
//! | (none/`spike`)    | [`NullController`] | 0   |
//!
//! [`SifivePlic`]: super::interrupts::plic::SifivePlic
//! [`MigvPlic`]: super::interrupts::migv::MigvPlic
//! [`Hcsc1Plic`]: super::interrupts::hcsc1::Hcsc1Plic
//! [`NullController`]: super::interrupts::null::NullController

use super::interrupts::{InterruptController, IrqError, Mmio};
use super::smp::HartId;
use super::timers::TimerConfig;

#[cfg(any(
    all(feature = "platform-hifive", feature = "platform-migv"),
    all(feature = "platform-hifive", feature = "platform-hcsc1"),
    all(feature = "platform-hifive", feature = "platform-spike"),
    all(feature = "platform-migv", feature = "platform-hcsc1"),
    all(feature = "platform-migv", feature = "platform-spike"),
    all(feature = "platform-hcsc1", feature = "platform-spike"),
))]
compile_error!("enable at most one `platform-*` feature");

/// Base of the kernel device window
pub const KDEV_BASE: usize = 0xFFFF_FFFF_C000_0000;

/// Static description of the target board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Board name for boot logs
    pub name: &'static str,
    /// Highest external interrupt line
    pub max_line: u32,
    /// Kernel virtual address of the controller registers (0 if none)
    pub plic_pptr: usize,
    /// Timebase and tick length
    pub timer: TimerConfig,
}

cfg_if::cfg_if! {
    if #[cfg(feature = "platform-hifive")] {
        use super::interrupts::plic::SifivePlic;

        /// Interrupt controller of this platform
        pub type PlatformController = SifivePlic<Mmio>;

        /// Kernel virtual address of the PLIC
        pub const PLIC_PPTR: usize = KDEV_BASE + 0x0C00_0000;

        /// This platform
        pub const PLATFORM: PlatformConfig = PlatformConfig {
            name: "hifive",
            max_line: PlatformController::MAX_LINE,
            plic_pptr: PLIC_PPTR,
            timer: TimerConfig { clock_hz: 1_000_000, tick_ms: 2 },
        };

        fn bind(bus: Mmio, hart: HartId) -> Result<PlatformController, IrqError> {
            SifivePlic::new(bus, hart)
        }
    } else if #[cfg(feature = "platform-migv")] {
        use super::interrupts::migv::MigvPlic;

        /// Interrupt controller of this platform
        pub type PlatformController = MigvPlic<Mmio>;

        /// Kernel virtual address of the PLIC
        pub const PLIC_PPTR: usize = KDEV_BASE + 0x0C00_0000;

        /// This platform
        pub const PLATFORM: PlatformConfig = PlatformConfig {
            name: "migv",
            max_line: PlatformController::MAX_LINE,
            plic_pptr: PLIC_PPTR,
            timer: TimerConfig::DEFAULT,
        };

        fn bind(bus: Mmio, hart: HartId) -> Result<PlatformController, IrqError> {
            single_hart(hart)?;
            Ok(MigvPlic::new(bus))
        }
    } else if #[cfg(feature = "platform-hcsc1")] {
        use super::interrupts::hcsc1::Hcsc1Plic;

        /// Interrupt controller of this platform
        pub type PlatformController = Hcsc1Plic<Mmio>;

        /// Kernel virtual address of the PLIC
        pub const PLIC_PPTR: usize = KDEV_BASE + 0x0020_0000;

        /// This platform
        pub const PLATFORM: PlatformConfig = PlatformConfig {
            name: "hcsc1",
            max_line: PlatformController::MAX_LINE,
            plic_pptr: PLIC_PPTR,
            timer: TimerConfig::DEFAULT,
        };

        fn bind(bus: Mmio, hart: HartId) -> Result<PlatformController, IrqError> {
            single_hart(hart)?;
            Ok(Hcsc1Plic::new(bus))
        }
    } else {
        use super::interrupts::null::NullController;

        /// Interrupt controller of this platform
        pub type PlatformController = NullController;

        /// No controller on this platform
        pub const PLIC_PPTR: usize = 0;

        /// This platform
        pub const PLATFORM: PlatformConfig = PlatformConfig {
            name: "spike",
            max_line: PlatformController::MAX_LINE,
            plic_pptr: PLIC_PPTR,
            timer: TimerConfig::DEFAULT,
        };

        fn bind(_bus: Mmio, _hart: HartId) -> Result<PlatformController, IrqError> {
            Ok(NullController::new())
        }
    }
}

/// Single-context controllers serve hart 0 only
#[allow(dead_code)]
fn single_hart(hart: HartId) -> Result<(), IrqError> {
    if hart.as_usize() == 0 {
        Ok(())
    } else {
        Err(IrqError::InvalidHart(hart))
    }
}

/// Bind the platform controller for `hart`
///
/// # Safety
/// [`PLIC_PPTR`] must be mapped to the controller registers for as long as
/// the returned driver is used.
pub unsafe fn platform_controller(hart: HartId) -> Result<PlatformController, IrqError> {
    // SAFETY: forwarded from the caller
    let bus = unsafe { Mmio::new(PLIC_PPTR) };
    let ctrl = bind(bus, hart)?;
    log::debug!("{}: {} controller at {:#x}", hart, PLATFORM.name, PLIC_PPTR);
    Ok(ctrl)
}
