//! # Register Bus
//!
//! Controller drivers address their registers by byte offset from the
//! controller base through [`RegisterBus`]. On hardware the bus is [`Mmio`],
//! a window of volatile 32-bit accesses; the unit tests plug in simulated
//! controllers instead.

use core::ptr::{read_volatile, write_volatile};

/// 32-bit register access at byte offsets from a controller base
///
/// Reads take `&mut self` because claim registers have side effects.
pub trait RegisterBus {
    /// Read the register at `offset`
    fn read32(&mut self, offset: usize) -> u32;

    /// Write the register at `offset`
    fn write32(&mut self, offset: usize, value: u32);

    /// Read-modify-write the register at `offset`
    #[inline]
    fn modify32<F>(&mut self, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read32(offset);
        self.write32(offset, f(value));
    }

    /// Set `bits` in the register at `offset`
    #[inline]
    fn set_bits(&mut self, offset: usize, bits: u32) {
        self.modify32(offset, |v| v | bits);
    }

    /// Clear `bits` in the register at `offset`
    #[inline]
    fn clear_bits(&mut self, offset: usize, bits: u32) {
        self.modify32(offset, |v| v & !bits);
    }
}

/// Memory-mapped register window
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Create a window at the kernel virtual address `base`
    ///
    /// # Safety
    /// `base` must map the controller's register block for the lifetime of
    /// the returned value, and nothing else may drive those registers.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base address of the window
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    fn reg(&self, offset: usize) -> *mut u32 {
        debug_assert!(offset % 4 == 0);
        (self.base + offset) as *mut u32
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read32(&mut self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees the window is mapped
        unsafe { read_volatile(self.reg(offset)) }
    }

    #[inline]
    fn write32(&mut self, offset: usize, value: u32) {
        // SAFETY: `new` guarantees the window is mapped
        unsafe { write_volatile(self.reg(offset), value) }
    }
}
