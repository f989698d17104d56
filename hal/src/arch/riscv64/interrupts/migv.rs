//! # MiG-V Interrupt Controller
//!
//! Single-core controller of the MiG-V SoC. There is one register set with a
//! slot for each of the two targets (M-mode = 0, S-mode = 1); the kernel only
//! touches the S-mode slot.
//!
//! ## Memory Map
//!
//! ```text
//! 0x00  config        (64 bit)
//! 0x08  trigger_mode  bit (n-1): 0 = level, 1 = edge
//! 0x0C  priority[3]   4 bits per line, line 1 in the low nibble of word 0
//! 0x18  ie_target[2]  bit (n-1) enables line n
//! 0x20  threshold[2]
//! 0x28  claim[2]      read = claim, write = complete
//! ```
//!
//! Line 0 means "nothing pending" and has no enable, priority or trigger bit.

use core::mem::{offset_of, size_of};

use static_assertions::const_assert_eq;

use super::{drain_pending, InterruptController, IrqLine, Mmio, RegisterBus, TriggerControl, TriggerMode};

// ============================================================================
// Register Map
// ============================================================================

/// Highest real interrupt line (MiG-V 1.0)
pub const MAX_LINE: u32 = 24;

/// M-mode target slot
pub const TARGET_M_MODE: usize = 0;

/// S-mode target slot
pub const TARGET_S_MODE: usize = 1;

/// Priority words (8 lines per word)
pub const PRIORITY_WORDS: usize = 3;

/// Trigger mode register
pub const TRIGGER_MODE_OFFSET: usize = 0x08;

/// First priority word
pub const PRIORITY_OFFSET: usize = 0x0C;

/// Interrupt enable per target
pub const IE_TARGET_OFFSET: usize = 0x18;

/// Threshold per target
pub const THRESHOLD_OFFSET: usize = 0x20;

/// Claim/complete per target
pub const CLAIM_OFFSET: usize = 0x28;

/// Every nibble set to priority 1
pub const DEFAULT_PRIORITY_WORD: u32 = 0x1111_1111;

/// Every line edge-triggered
pub const DEFAULT_TRIGGER_MODE: u32 = 0xFFFF_FFFF;

/// Hardware register block, for layout checks only
#[allow(dead_code)]
#[repr(C)]
pub struct MigvRegisters {
    config: u64,
    trigger_mode: u32,
    priority: [u32; PRIORITY_WORDS],
    ie_target: [u32; 2],
    threshold: [u32; 2],
    claim: [u32; 2],
}

const_assert_eq!(offset_of!(MigvRegisters, trigger_mode), TRIGGER_MODE_OFFSET);
const_assert_eq!(offset_of!(MigvRegisters, priority), PRIORITY_OFFSET);
const_assert_eq!(offset_of!(MigvRegisters, ie_target), IE_TARGET_OFFSET);
const_assert_eq!(offset_of!(MigvRegisters, threshold), THRESHOLD_OFFSET);
const_assert_eq!(offset_of!(MigvRegisters, claim), CLAIM_OFFSET);
const_assert_eq!(size_of::<MigvRegisters>(), 0x30);
// 4 bits per line must fit the priority words
static_assertions::const_assert!(4 * MAX_LINE as usize <= 32 * PRIORITY_WORDS);

const IE_S: usize = IE_TARGET_OFFSET + 4 * TARGET_S_MODE;
const THRESHOLD_S: usize = THRESHOLD_OFFSET + 4 * TARGET_S_MODE;
const CLAIM_S: usize = CLAIM_OFFSET + 4 * TARGET_S_MODE;

// ============================================================================
// Driver
// ============================================================================

/// MiG-V controller, S-mode target
#[derive(Debug)]
pub struct MigvPlic<B: RegisterBus = Mmio> {
    bus: B,
}

impl<B: RegisterBus> MigvPlic<B> {
    /// Wrap the controller's register window
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Underlying register bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Underlying register bus, mutably
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Set the 4-bit priority of a line
    pub fn set_priority(&mut self, line: IrqLine, priority: u32) {
        let n = line.get() as usize - 1;
        let reg = PRIORITY_OFFSET + (n / 8) * 4;
        let shift = 4 * (n % 8);
        self.bus
            .modify32(reg, |v| (v & !(0xF << shift)) | ((priority & 0xF) << shift));
    }

    /// Whether `line` is enabled for the S-mode target
    pub fn is_enabled(&mut self, line: IrqLine) -> bool {
        self.bus.read32(IE_S) & line.bit_from_one() != 0
    }
}

impl<B: RegisterBus> InterruptController for MigvPlic<B> {
    const MAX_LINE: u32 = MAX_LINE;

    fn init_controller(&mut self) {
        log::info!("MiG-V PLIC: init, interrupts 1 - {}", MAX_LINE);

        for raw in 1..=MAX_LINE {
            if let Some(line) = IrqLine::checked(raw, MAX_LINE) {
                self.mask(line);
            }
        }
        for word in 0..PRIORITY_WORDS {
            self.bus.write32(PRIORITY_OFFSET + word * 4, DEFAULT_PRIORITY_WORD);
        }
        self.bus.write32(TRIGGER_MODE_OFFSET, DEFAULT_TRIGGER_MODE);
        self.bus.write32(THRESHOLD_S, 0);

        drain_pending(self);
    }

    fn init_hart(&mut self) {}

    fn claim(&mut self) -> Option<IrqLine> {
        let raw = self.bus.read32(CLAIM_S);
        if raw == 0 {
            return None;
        }
        let line = IrqLine::checked(raw, MAX_LINE);
        if line.is_none() {
            log::warn!("MiG-V PLIC: claimed unknown interrupt {}", raw);
            self.bus.write32(CLAIM_S, raw);
        }
        line
    }

    fn complete(&mut self, line: IrqLine) {
        self.bus.write32(CLAIM_S, line.get());
    }

    fn mask(&mut self, line: IrqLine) {
        self.bus.clear_bits(IE_S, line.bit_from_one());
    }

    fn unmask(&mut self, line: IrqLine) {
        self.bus.set_bits(IE_S, line.bit_from_one());
    }
}

impl<B: RegisterBus> TriggerControl for MigvPlic<B> {
    fn set_trigger(&mut self, line: IrqLine, mode: TriggerMode) {
        match mode {
            TriggerMode::Edge => self.bus.set_bits(TRIGGER_MODE_OFFSET, line.bit_from_one()),
            TriggerMode::Level => self.bus.clear_bits(TRIGGER_MODE_OFFSET, line.bit_from_one()),
        }
    }
}
