//! # Active Interrupt Latch
//!
//! [`IrqState`] is the per-hart record of the interrupt the kernel has
//! claimed but not yet acknowledged, together with the front-end that hides
//! the two very different interrupt sources behind one [`Irq`] value:
//!
//! - the timer is enabled through `sie.STIE` and needs no completion, since
//!   reprogramming the deadline drops the pending bit
//! - external lines go through the platform [`InterruptController`]
//!
//! ## State Machine
//!
//! ```text
//!            active_irq() / claim -> Some(id)
//!   Idle  ─────────────────────────────────────▶  Claimed(id)
//!    ▲                                               │
//!    └──────────────────── ack(id) ──────────────────┘
//! ```
//!
//! `active_irq()` in `Claimed(id)` returns `id` without touching hardware.
//! Every operation that moves the latch or touches a mask is crate-private.
//! Kernel code reaches them only through the trap dispatcher and
//! [`IrqControl`](crate::arch::riscv64::privilege::IrqControl).
//!
//! ## Acknowledge Protocol
//!
//! `ack` never writes the controller's complete register. The kernel keeps a
//! line masked from the moment its delivery starts until a user-level handler
//! re-enables it, and masking is what holds the line off.

use super::{InterruptController, Irq, IrqLine, TriggerControl, TriggerMode};
use crate::arch::riscv64::core::cpu::Cpu;
use crate::arch::riscv64::core::csr::{irq_cause, Interrupts, TrapCause};

/// Per-hart interrupt state over controller `C`
#[derive(Debug)]
pub struct IrqState<C> {
    ctrl: C,
    active: Option<Irq>,
}

impl<C: InterruptController> IrqState<C> {
    /// Create the latch in the idle state
    pub const fn new(ctrl: C) -> Self {
        Self { ctrl, active: None }
    }

    /// The controller driver
    pub fn controller(&self) -> &C {
        &self.ctrl
    }

    /// The controller driver, mutably
    pub(crate) fn controller_mut(&mut self) -> &mut C {
        &mut self.ctrl
    }

    /// Currently latched interrupt, without consulting hardware
    pub fn latched(&self) -> Option<Irq> {
        self.active
    }

    /// Boot-time controller setup, then enable supervisor external interrupts
    pub(crate) fn init_controller<U: Cpu + ?Sized>(&mut self, cpu: &U) {
        self.ctrl.init_controller();
        cpu.enable_sie(Interrupts::SEXT);
    }

    /// Per-hart controller setup
    pub(crate) fn init_hart(&mut self) {
        self.ctrl.init_hart();
    }

    /// The interrupt being serviced, claiming one from hardware if none is latched
    ///
    /// Returns `None` when the trap is not an interrupt or the controller has
    /// nothing pending. An interrupt cause other than the supervisor timer or
    /// external interrupt halts the hart.
    pub(crate) fn active_irq<U: Cpu + ?Sized>(&mut self, cpu: &U) -> Option<Irq> {
        if self.active.is_some() {
            return self.active;
        }

        let scause = cpu.read_scause();
        let cause = TrapCause::from_scause(scause);
        if !cause.is_interrupt {
            return None;
        }

        self.active = match cause.code {
            irq_cause::SUPERVISOR_EXTERNAL => self.ctrl.claim().map(Irq::External),
            irq_cause::SUPERVISOR_TIMER => Some(Irq::Timer),
            code => {
                log::error!(
                    "invalid interrupt cause code {:#x} (scause {:#x})",
                    code,
                    scause
                );
                cpu.halt()
            }
        };
        self.active
    }

    /// Clear the latch
    pub(crate) fn ack(&mut self, irq: Irq) {
        debug_assert!(
            self.active.map_or(true, |active| active == irq),
            "acknowledging {} while {:?} is latched",
            irq,
            self.active
        );
        self.active = None;
    }

    /// Disable (`disable == true`) or enable an interrupt
    pub(crate) fn mask<U: Cpu + ?Sized>(&mut self, cpu: &U, disable: bool, irq: Irq) {
        match (irq, disable) {
            (Irq::Timer, true) => cpu.disable_sie(Interrupts::STIMER),
            (Irq::Timer, false) => cpu.enable_sie(Interrupts::STIMER),
            (Irq::External(line), true) => self.ctrl.mask(line),
            (Irq::External(line), false) => self.ctrl.unmask(line),
        }
    }

    /// Whether a timer or external interrupt is pending on this hart
    pub fn is_pending<U: Cpu + ?Sized>(&self, cpu: &U) -> bool {
        cpu.read_sip().intersects(Interrupts::STIMER | Interrupts::SEXT)
    }
}

impl<C: TriggerControl> IrqState<C> {
    /// Select edge or level triggering for an external line
    pub fn set_trigger(&mut self, line: IrqLine, mode: TriggerMode) {
        self.ctrl.set_trigger(line, mode);
    }
}
