//! # HCSC1 Interrupt Controller
//!
//! The controller of the HCSC1 test chip. It has the same block shape as the
//! MiG-V controller, but the kernel drives target 0 and masking a line also
//! writes it to the claim/complete register, so a line that was in flight
//! when it got masked does not stay stuck in the gateway.
//!
//! ```text
//! 0x00  config              (64 bit)
//! 0x08  el                  bit (n-1): 0 = level, 1 = edge
//! 0x0C  priority0..2        4 bits per line, eight lines per word
//! 0x18  ietarget0/1
//! 0x20  threshold0/1
//! 0x28  idtarget0/1         read = claim, write = complete
//! ```

use core::mem::{offset_of, size_of};

use static_assertions::const_assert_eq;

use super::{drain_pending, InterruptController, IrqLine, Mmio, RegisterBus, TriggerControl, TriggerMode};

/// Highest real interrupt line
pub const MAX_LINE: u32 = 24;

/// Edge/level select
pub const EL_OFFSET: usize = 0x08;
/// First priority word
pub const PRIORITY0_OFFSET: usize = 0x0C;
/// Enable bits of target 0
pub const IETARGET0_OFFSET: usize = 0x18;
/// Threshold of target 0
pub const THRESHOLD0_OFFSET: usize = 0x20;
/// Claim/complete of target 0
pub const IDTARGET0_OFFSET: usize = 0x28;

/// Hardware register block, for layout checks only
#[allow(dead_code)]
#[repr(C)]
pub struct Hcsc1Registers {
    config: u64,
    el: u32,
    priority0: u32,
    priority1: u32,
    priority2: u32,
    ietarget0: u32,
    ietarget1: u32,
    threshold0: u32,
    threshold1: u32,
    idtarget0: u32,
    idtarget1: u32,
}

const_assert_eq!(offset_of!(Hcsc1Registers, el), EL_OFFSET);
const_assert_eq!(offset_of!(Hcsc1Registers, priority0), PRIORITY0_OFFSET);
const_assert_eq!(offset_of!(Hcsc1Registers, ietarget0), IETARGET0_OFFSET);
const_assert_eq!(offset_of!(Hcsc1Registers, threshold0), THRESHOLD0_OFFSET);
const_assert_eq!(offset_of!(Hcsc1Registers, idtarget0), IDTARGET0_OFFSET);
const_assert_eq!(size_of::<Hcsc1Registers>(), 0x30);

/// Priority word and shift of `line`
const fn priority_slot(line: IrqLine) -> (usize, u32) {
    let n = line.get() - 1;
    (PRIORITY0_OFFSET + (n / 8) as usize * 4, 4 * (n % 8))
}

/// HCSC1 controller, target 0
#[derive(Debug)]
pub struct Hcsc1Plic<B: RegisterBus = Mmio> {
    bus: B,
}

impl<B: RegisterBus> Hcsc1Plic<B> {
    /// Wrap the controller's register window
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Underlying register bus, mutably
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

impl<B: RegisterBus> InterruptController for Hcsc1Plic<B> {
    const MAX_LINE: u32 = MAX_LINE;

    fn init_controller(&mut self) {
        log::info!("HCSC1 PLIC: init, interrupts 1 - {}", MAX_LINE);

        for raw in 1..=MAX_LINE {
            if let Some(line) = IrqLine::checked(raw, MAX_LINE) {
                self.mask(line);
                let (reg, shift) = priority_slot(line);
                self.bus.set_bits(reg, 1 << shift);
            }
        }
        for raw in 1..=MAX_LINE {
            if let Some(line) = IrqLine::checked(raw, MAX_LINE) {
                self.set_trigger(line, TriggerMode::Edge);
            }
        }
        self.bus.write32(THRESHOLD0_OFFSET, 0);

        drain_pending(self);
    }

    fn init_hart(&mut self) {}

    fn claim(&mut self) -> Option<IrqLine> {
        let raw = self.bus.read32(IDTARGET0_OFFSET);
        if raw == 0 {
            return None;
        }
        let line = IrqLine::checked(raw, MAX_LINE);
        if line.is_none() {
            log::warn!("HCSC1 PLIC: claimed unknown interrupt {}", raw);
            self.bus.write32(IDTARGET0_OFFSET, raw);
        }
        line
    }

    fn complete(&mut self, line: IrqLine) {
        self.bus.write32(IDTARGET0_OFFSET, line.get());
    }

    fn mask(&mut self, line: IrqLine) {
        self.bus.clear_bits(IETARGET0_OFFSET, line.bit_from_one());
        self.complete(line);
    }

    fn unmask(&mut self, line: IrqLine) {
        self.bus.set_bits(IETARGET0_OFFSET, line.bit_from_one());
    }
}

impl<B: RegisterBus> TriggerControl for Hcsc1Plic<B> {
    fn set_trigger(&mut self, line: IrqLine, mode: TriggerMode) {
        match mode {
            TriggerMode::Edge => self.bus.set_bits(EL_OFFSET, line.bit_from_one()),
            TriggerMode::Level => self.bus.clear_bits(EL_OFFSET, line.bit_from_one()),
        }
    }
}
