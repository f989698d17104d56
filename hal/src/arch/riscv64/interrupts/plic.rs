//! # SiFive U54/U74 PLIC
//!
//! Multi-hart Platform-Level Interrupt Controller of the HiFive Unleashed and
//! Unmatched boards. Every global interrupt is edge-triggered on these SoCs,
//! so this driver has no trigger control.
//!
//! ## Memory Map
//!
//! ```text
//! +------------------+---------+------------------------------------------+
//! | Offset           | Size    | Description                              |
//! +------------------+---------+------------------------------------------+
//! | 0x000000         | 4*N     | Priority registers (source 0 is a dummy) |
//! | 0x001000         | 4*W     | Pending bits                             |
//! | 0x002000         | 128*9   | Enable bits, one bank per context        |
//! | 0x200000         | 4096*9  | Threshold and Claim/Complete per context |
//! +------------------+---------+------------------------------------------+
//! ```
//!
//! ## Context Mapping
//!
//! Hart 0 (the S7 monitor core) has M-mode only. Harts 1-4 have an M-mode
//! and an S-mode context each, so the banks run
//! `hart0-M, hart1-M, hart1-S, hart2-M, hart2-S, ...` and the S-mode context
//! of hart `h` is `2 * h`.

use core::mem::{offset_of, size_of};

use static_assertions::const_assert_eq;

use super::{drain_pending, InterruptController, IrqError, IrqLine, Mmio, RegisterBus};
use crate::arch::riscv64::smp::HartId;
use crate::arch::riscv64::MAX_HARTS;

// ============================================================================
// Register Map
// ============================================================================

/// Highest real interrupt line
pub const MAX_LINE: u32 = 53;

/// Number of sources including the dummy source 0
pub const NUM_SOURCES: usize = MAX_LINE as usize + 1;

/// 32-bit words needed for one enable or pending bitmap
pub const BITMAP_WORDS: usize = (NUM_SOURCES + 31) / 32;

/// Number of contexts (hart 0: M; harts 1..=MAX_HARTS: M + S)
pub const NUM_CONTEXTS: usize = 2 * MAX_HARTS + 1;

/// Priority register base (4 bytes per source)
pub const PRIORITY_OFFSET: usize = 0x00_0000;

/// Pending bits base
pub const PENDING_OFFSET: usize = 0x00_1000;

/// Enable bits base
pub const ENABLE_OFFSET: usize = 0x00_2000;

/// Enable bank size per context
pub const ENABLE_BANK_SIZE: usize = 0x80;

/// Threshold and Claim/Complete base
pub const CONTEXT_OFFSET: usize = 0x20_0000;

/// Threshold and Claim block size per context
pub const CONTEXT_BLOCK_SIZE: usize = 0x1000;

/// Threshold register offset within a context block
pub const THRESHOLD_REG: usize = 0x0;

/// Claim/Complete register offset within a context block
pub const CLAIM_REG: usize = 0x4;

/// Priority given to every line at init
pub const DEFAULT_PRIORITY: u32 = 1;

/// Threshold that admits priority 1 and up
pub const DEFAULT_THRESHOLD: u32 = 0;

#[allow(dead_code)]
#[repr(C)]
struct EnableBank {
    enable: [u32; BITMAP_WORDS],
    _gap: [u32; 32 - BITMAP_WORDS],
}

#[allow(dead_code)]
#[repr(C)]
struct ContextRegs {
    threshold: u32,
    claim: u32,
    _gap: [u32; 1022],
}

/// Hardware register block, for layout checks only
#[allow(dead_code)]
#[repr(C)]
pub struct PlicRegisters {
    priority: [u32; NUM_SOURCES],
    _gap1: [u32; 1024 - NUM_SOURCES],
    pending: [u32; BITMAP_WORDS],
    _gap2: [u32; 1024 - BITMAP_WORDS],
    hart_enable: [EnableBank; NUM_CONTEXTS],
    _gap3: [u32; (0x20_0000 - 0x2480) / 4],
    hart_regs: [ContextRegs; NUM_CONTEXTS],
}

const_assert_eq!(offset_of!(PlicRegisters, priority), PRIORITY_OFFSET);
const_assert_eq!(offset_of!(PlicRegisters, pending), PENDING_OFFSET);
const_assert_eq!(offset_of!(PlicRegisters, hart_enable), ENABLE_OFFSET);
const_assert_eq!(size_of::<EnableBank>(), ENABLE_BANK_SIZE);
const_assert_eq!(offset_of!(PlicRegisters, hart_regs), CONTEXT_OFFSET);
const_assert_eq!(size_of::<ContextRegs>(), CONTEXT_BLOCK_SIZE);
const_assert_eq!(offset_of!(ContextRegs, claim), CLAIM_REG);

/// S-mode context index of `hart`
///
/// Only harts 1-4 have one.
pub const fn s_mode_context(hart: HartId) -> Result<usize, IrqError> {
    match hart.as_usize() {
        h @ 1..=MAX_HARTS => Ok(2 * h),
        _ => Err(IrqError::InvalidHart(hart)),
    }
}

// ============================================================================
// Driver
// ============================================================================

/// SiFive PLIC as seen from one hart's S-mode context
#[derive(Debug)]
pub struct SifivePlic<B: RegisterBus = Mmio> {
    bus: B,
    context: usize,
}

impl<B: RegisterBus> SifivePlic<B> {
    /// Bind the controller to `hart`'s S-mode context
    pub fn new(bus: B, hart: HartId) -> Result<Self, IrqError> {
        let context = s_mode_context(hart)?;
        Ok(Self { bus, context })
    }

    /// Context index this driver claims from
    pub fn context(&self) -> usize {
        self.context
    }

    /// Underlying register bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Underlying register bus, mutably
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    #[inline]
    fn enable_reg(&self, line: IrqLine) -> usize {
        ENABLE_OFFSET + self.context * ENABLE_BANK_SIZE + line.word() * 4
    }

    #[inline]
    fn context_reg(&self, reg: usize) -> usize {
        CONTEXT_OFFSET + self.context * CONTEXT_BLOCK_SIZE + reg
    }

    /// Set the priority of a line (0 never fires)
    pub fn set_priority(&mut self, line: IrqLine, priority: u32) {
        self.bus.write32(PRIORITY_OFFSET + line.get() as usize * 4, priority);
    }

    /// Whether the pending bit of `line` is set
    pub fn is_pending(&mut self, line: IrqLine) -> bool {
        self.bus.read32(PENDING_OFFSET + line.word() * 4) & line.bit() != 0
    }

    /// Whether `line` is enabled for this context
    pub fn is_enabled(&mut self, line: IrqLine) -> bool {
        let reg = self.enable_reg(line);
        self.bus.read32(reg) & line.bit() != 0
    }
}

impl<B: RegisterBus> InterruptController for SifivePlic<B> {
    const MAX_LINE: u32 = MAX_LINE;

    fn init_controller(&mut self) {
        log::info!("PLIC: init, interrupts 1 - {}", MAX_LINE);

        for raw in 1..=MAX_LINE {
            if let Some(line) = IrqLine::checked(raw, MAX_LINE) {
                self.mask(line);
                self.set_priority(line, DEFAULT_PRIORITY);
            }
        }

        drain_pending(self);
    }

    fn init_hart(&mut self) {
        let reg = self.context_reg(THRESHOLD_REG);
        self.bus.write32(reg, DEFAULT_THRESHOLD);
    }

    fn claim(&mut self) -> Option<IrqLine> {
        let reg = self.context_reg(CLAIM_REG);
        let raw = self.bus.read32(reg);
        if raw == 0 {
            return None;
        }
        let line = IrqLine::checked(raw, MAX_LINE);
        if line.is_none() {
            log::warn!("PLIC: claimed unknown interrupt {}", raw);
            self.bus.write32(reg, raw);
        }
        line
    }

    fn complete(&mut self, line: IrqLine) {
        let reg = self.context_reg(CLAIM_REG);
        self.bus.write32(reg, line.get());
    }

    fn mask(&mut self, line: IrqLine) {
        let reg = self.enable_reg(line);
        self.bus.clear_bits(reg, line.bit());
    }

    fn unmask(&mut self, line: IrqLine) {
        let reg = self.enable_reg(line);
        self.bus.set_bits(reg, line.bit());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PlicSim;

    type Plic = SifivePlic<PlicSim>;

    fn plic(hart: usize) -> Plic {
        SifivePlic::new(PlicSim::new(), HartId::new(hart)).unwrap()
    }

    fn line(raw: u32) -> IrqLine {
        Plic::line(raw).unwrap()
    }

    #[test]
    fn test_context_index() {
        assert_eq!(s_mode_context(HartId::new(1)), Ok(2));
        assert_eq!(s_mode_context(HartId::new(4)), Ok(8));
        assert_eq!(
            s_mode_context(HartId::new(0)),
            Err(IrqError::InvalidHart(HartId::new(0)))
        );
        assert_eq!(s_mode_context(HartId::new(MAX_HARTS)), Ok(NUM_CONTEXTS - 1));
        assert!(s_mode_context(HartId::new(MAX_HARTS + 1)).is_err());
        assert!(SifivePlic::new(PlicSim::new(), HartId::new(0)).is_err());
    }

    #[test]
    fn test_register_addressing() {
        let mut p = plic(2);
        p.unmask(line(33));
        // hart 2 S-mode is bank 4; line 33 lives in word 1, bit 1
        assert_eq!(p.bus_mut().read32(0x2000 + 4 * 0x80 + 4), 1 << 1);
        p.init_hart();
        assert_eq!(p.bus_mut().read32(0x20_0000 + 4 * 0x1000), 0);
    }

    #[test]
    fn test_mask_toggling() {
        let mut p = plic(1);
        for raw in 1..=MAX_LINE {
            let l = line(raw);
            p.unmask(l);
            p.mask(l);
            p.unmask(l);
            assert!(p.is_enabled(l), "line {}", raw);
        }
    }

    #[test]
    fn test_mask_leaves_neighbours() {
        let mut p = plic(1);
        p.unmask(line(4));
        p.unmask(line(5));
        p.mask(line(4));
        assert!(!p.is_enabled(line(4)));
        assert!(p.is_enabled(line(5)));
    }

    #[test]
    fn test_claim_once_until_complete() {
        let mut p = plic(1);
        p.init_controller();
        p.init_hart();
        assert_eq!(p.claim(), None);

        p.unmask(line(3));
        p.bus_mut().raise(3);
        assert!(p.is_pending(line(3)));
        assert_eq!(p.claim(), Some(line(3)));
        assert_eq!(p.claim(), None);

        // re-assertion while in flight is swallowed by the gateway
        p.bus_mut().raise(3);
        assert_eq!(p.claim(), None);

        p.complete(line(3));
        assert_eq!(p.claim(), None);
        p.bus_mut().raise(3);
        assert_eq!(p.claim(), Some(line(3)));
    }

    #[test]
    fn test_init_masks_and_drains() {
        let mut sim = PlicSim::new();
        // firmware left line 7 enabled and pending for hart 1's S context
        sim.write32(ENABLE_OFFSET + 2 * ENABLE_BANK_SIZE, 1 << 7);
        sim.write32(PRIORITY_OFFSET + 7 * 4, 1);
        sim.raise(7);

        let mut p = SifivePlic::new(sim, HartId::new(1)).unwrap();
        p.init_controller();

        for raw in 1..=MAX_LINE {
            assert!(!p.is_enabled(line(raw)));
            assert_eq!(p.bus_mut().read32(PRIORITY_OFFSET + raw as usize * 4), DEFAULT_PRIORITY);
        }
        assert_eq!(p.claim(), None);

        // the stale assertion is still latched in the gateway
        p.init_hart();
        p.unmask(line(7));
        assert_eq!(p.claim(), Some(line(7)));
    }

    #[test]
    fn test_unknown_claim_is_completed_and_dropped() {
        let mut p = plic(1);
        p.init_controller();
        p.bus_mut().glitch_claim(MAX_LINE + 7);
        assert_eq!(p.claim(), None);
        assert_eq!(p.bus().completions(), &[MAX_LINE + 7]);
    }

    #[test]
    fn test_higher_priority_wins() {
        let mut p = plic(3);
        p.init_controller();
        p.init_hart();
        p.unmask(line(10));
        p.unmask(line(20));
        p.set_priority(line(20), 5);
        p.bus_mut().raise(10);
        p.bus_mut().raise(20);

        assert_eq!(p.claim(), Some(line(20)));
        assert_eq!(p.claim(), Some(line(10)));
    }

    #[test]
    fn test_other_context_not_claimed() {
        let mut p = plic(1);
        p.init_controller();
        // enable only for hart 2's context
        p.bus_mut().write32(ENABLE_OFFSET + 4 * ENABLE_BANK_SIZE, 1 << 9);
        p.bus_mut().raise(9);
        assert_eq!(p.claim(), None);
    }
}
