//! # RISC-V Interrupt Controller Framework
//!
//! One contract, [`InterruptController`], over the external interrupt
//! controllers this kernel runs on:
//!
//! - [`plic`]: SiFive U54/U74 multi-hart PLIC (HiFive Unleashed/Unmatched)
//! - [`migv`]: MiG-V single-context controller
//! - [`hcsc1`]: legacy HCSC1 single-context controller
//! - [`null`]: simulators without an external controller
//!
//! [`irq`] holds the per-hart active-interrupt latch that sits on top of the
//! controller and adds the core-local timer as one more identifier.
//!
//! ## Identifier Space
//!
//! ```text
//!   0                 none (never dispatched)
//!   1 ..= MAX_LINE    external lines routed through the controller
//!   MAX_LINE + 1      supervisor timer
//! ```

pub mod hcsc1;
pub mod irq;
pub mod migv;
pub mod mmio;
pub mod null;
pub mod plic;

pub use irq::IrqState;
pub use mmio::{Mmio, RegisterBus};

use core::fmt;
use core::num::NonZeroU32;

use super::smp::HartId;

// ============================================================================
// Interrupt Identifiers
// ============================================================================

/// An external interrupt line, `1..=MAX_LINE` of the controller that minted it
///
/// Only [`InterruptController::line`] and the drivers' claim paths create
/// these, so an out-of-range line never reaches a register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct IrqLine(NonZeroU32);

impl IrqLine {
    /// Check `raw` against `1..=max`
    pub(crate) const fn checked(raw: u32, max: u32) -> Option<Self> {
        if raw > max {
            return None;
        }
        match NonZeroU32::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Raw identifier
    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Enable-bitmap word holding this line (`id / 32`)
    #[inline]
    pub const fn word(self) -> usize {
        (self.get() / 32) as usize
    }

    /// Bit of this line inside its enable word (`id % 32`)
    #[inline]
    pub const fn bit(self) -> u32 {
        1 << (self.get() % 32)
    }

    /// Bit of this line in registers that start counting at line 1
    ///
    /// Only meaningful for lines `1..=32`.
    #[inline]
    pub const fn bit_from_one(self) -> u32 {
        debug_assert!(self.get() <= 32);
        1 << (self.get() - 1)
    }
}

impl fmt::Display for IrqLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// An interrupt the kernel can be servicing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Irq {
    /// External line from the interrupt controller
    External(IrqLine),
    /// Core-local supervisor timer
    Timer,
}

impl fmt::Display for Irq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Irq::External(line) => write!(f, "irq {}", line),
            Irq::Timer => f.write_str("timer"),
        }
    }
}

/// Trigger policy of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Level-sensitive
    Level,
    /// Edge-triggered
    Edge,
}

// ============================================================================
// Errors
// ============================================================================

/// Interrupt controller errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqError {
    /// The hart has no supervisor-mode context on this controller
    InvalidHart(HartId),
    /// Identifier outside `1..=MAX_LINE`
    InvalidLine(u32),
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrqError::InvalidHart(hart) => write!(f, "no S-mode PLIC context for {}", hart),
            IrqError::InvalidLine(raw) => write!(f, "interrupt line {} out of range", raw),
        }
    }
}

// ============================================================================
// Controller Contract
// ============================================================================

/// Claim/complete interrupt controller as seen from one hart in S-mode
pub trait InterruptController {
    /// Highest real line number; lines are `1..=MAX_LINE`
    const MAX_LINE: u32;

    /// Mask every line, set default priorities and trigger policy
    ///
    /// Also drains anything left pending from before boot. Called once on
    /// the boot hart with no other hart running.
    fn init_controller(&mut self);

    /// Per-hart setup; sets this hart's threshold so priority 1 is admitted
    fn init_hart(&mut self);

    /// Claim the highest-priority pending line for this hart's context
    fn claim(&mut self) -> Option<IrqLine>;

    /// Signal the controller that servicing of `line` has finished
    fn complete(&mut self, line: IrqLine);

    /// Clear the enable bit of `line`
    fn mask(&mut self, line: IrqLine);

    /// Set the enable bit of `line`
    fn unmask(&mut self, line: IrqLine);

    /// Validate a raw line number
    fn line(raw: u32) -> Result<IrqLine, IrqError> {
        IrqLine::checked(raw, Self::MAX_LINE).ok_or(IrqError::InvalidLine(raw))
    }

    /// Identifier the timer occupies in the flat numbering
    fn timer_raw() -> u32 {
        Self::MAX_LINE + 1
    }

    /// Map a flat identifier back to an [`Irq`]; `0` and unknown values map to `None`
    fn irq_from_raw(raw: u32) -> Option<Irq> {
        if raw == Self::timer_raw() {
            return Some(Irq::Timer);
        }
        IrqLine::checked(raw, Self::MAX_LINE).map(Irq::External)
    }

    /// Flat identifier of an [`Irq`]
    fn irq_to_raw(irq: Irq) -> u32 {
        match irq {
            Irq::External(line) => line.get(),
            Irq::Timer => Self::timer_raw(),
        }
    }
}

/// Controllers whose lines can be switched between edge and level
pub trait TriggerControl: InterruptController {
    /// Select the trigger policy of `line`
    fn set_trigger(&mut self, line: IrqLine, mode: TriggerMode);
}

/// Drain stale claims left over from before boot
pub(crate) fn drain_pending<C: InterruptController + ?Sized>(ctrl: &mut C) {
    while let Some(line) = ctrl.claim() {
        log::debug!("PLIC: dropping pending interrupt {}", line);
        ctrl.complete(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::null::NullController;

    struct Sixty;

    impl InterruptController for Sixty {
        const MAX_LINE: u32 = 60;
        fn init_controller(&mut self) {}
        fn init_hart(&mut self) {}
        fn claim(&mut self) -> Option<IrqLine> {
            None
        }
        fn complete(&mut self, _: IrqLine) {}
        fn mask(&mut self, _: IrqLine) {}
        fn unmask(&mut self, _: IrqLine) {}
    }

    #[test]
    fn test_line_range() {
        assert_eq!(Sixty::line(0), Err(IrqError::InvalidLine(0)));
        assert_eq!(Sixty::line(61), Err(IrqError::InvalidLine(61)));
        assert_eq!(Sixty::line(60).map(IrqLine::get), Ok(60));
    }

    #[test]
    fn test_enable_addressing() {
        let line = Sixty::line(37).unwrap();
        assert_eq!(line.word(), 1);
        assert_eq!(line.bit(), 1 << 5);

        let line = Sixty::line(31).unwrap();
        assert_eq!(line.word(), 0);
        assert_eq!(line.bit(), 1 << 31);
        assert_eq!(line.bit_from_one(), 1 << 30);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn test_bit_from_one_rejects_wide_line() {
        Sixty::line(33).unwrap().bit_from_one();
    }

    #[test]
    fn test_flat_numbering() {
        assert_eq!(Sixty::irq_from_raw(0), None);
        assert_eq!(Sixty::irq_from_raw(61), Some(Irq::Timer));
        assert_eq!(Sixty::irq_from_raw(62), None);
        let line = Sixty::line(7).unwrap();
        assert_eq!(Sixty::irq_from_raw(7), Some(Irq::External(line)));
        assert_eq!(Sixty::irq_to_raw(Irq::Timer), 61);
        assert_eq!(Sixty::irq_to_raw(Irq::External(line)), 7);

        // a controller with no lines still has a timer
        assert_eq!(NullController::irq_from_raw(1), Some(Irq::Timer));
        assert_eq!(NullController::irq_from_raw(0), None);
    }
}
