//! # Null Interrupt Controller
//!
//! Spike and the bare QEMU configurations route no external lines to the
//! kernel. Only the timer exists; every claim comes back empty.

use super::{InterruptController, IrqLine};

/// Controller with no lines
#[derive(Debug, Default, Clone, Copy)]
pub struct NullController;

impl NullController {
    /// Create the controller
    pub const fn new() -> Self {
        Self
    }
}

impl InterruptController for NullController {
    const MAX_LINE: u32 = 0;

    fn init_controller(&mut self) {
        log::info!("no external interrupt controller");
    }

    fn init_hart(&mut self) {}

    fn claim(&mut self) -> Option<IrqLine> {
        None
    }

    // No `IrqLine` can be minted for a controller without lines.
    fn complete(&mut self, _line: IrqLine) {}

    fn mask(&mut self, _line: IrqLine) {}

    fn unmask(&mut self, _line: IrqLine) {}
}
