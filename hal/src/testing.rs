//! Simulated hardware for the unit tests.
//!
//! The controller simulators model the PLIC gateway: a raised line becomes
//! pending unless it is in flight, a claim hands out the best eligible line
//! and marks it in flight, and writing the line back to the claim register
//! completes it.
//!
//! Paths that never return (`halt`, `return_to_user`) unwind with a typed
//! payload which [`catch_halt`] and [`catch_resume`] pick up.

#![allow(dead_code)]

use core::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

use crate::arch::riscv64::core::cpu::Cpu;
use crate::arch::riscv64::core::csr::Interrupts;
use crate::arch::riscv64::core::registers::{UserContext, Word};
use crate::arch::riscv64::interrupts::{migv, plic, Irq, RegisterBus};
use crate::arch::riscv64::privilege::syscall::{Syscall, SyscallArgs};
use crate::arch::riscv64::privilege::traps::{IrqControl, Kernel, TrapLocks, VmFaultType};
use crate::arch::riscv64::timers::TimerDevice;

/// `scause` of a supervisor external interrupt
pub const EXTERNAL_CAUSE: u64 = (1 << 63) | 9;

/// `scause` of a supervisor timer interrupt
pub const TIMER_CAUSE: u64 = (1 << 63) | 5;

/// Fresh trap locks for one test
pub fn leak_locks() -> &'static TrapLocks {
    Box::leak(Box::new(TrapLocks::new()))
}

// ============================================================================
// Gateway
// ============================================================================

/// Pending and in-flight state shared by both simulators
#[derive(Debug, Default)]
struct Gateway {
    pending: u64,
    in_flight: u64,
    claims: usize,
    bogus: Option<u32>,
    completions: Vec<u32>,
}

impl Gateway {
    fn raise(&mut self, line: u32) {
        if self.in_flight & (1 << line) == 0 {
            self.pending |= 1 << line;
        }
    }

    /// Claim the highest-priority eligible line, lowest id on ties
    fn claim(&mut self, max: u32, eligible: impl Fn(u32) -> Option<u32>) -> u32 {
        if let Some(raw) = self.bogus.take() {
            return raw;
        }
        let mut best: Option<(u32, u32)> = None;
        for line in 1..=max {
            if self.pending & (1 << line) == 0 {
                continue;
            }
            if let Some(prio) = eligible(line) {
                if best.map_or(true, |(_, p)| prio > p) {
                    best = Some((line, prio));
                }
            }
        }
        match best {
            Some((line, _)) => {
                self.pending &= !(1 << line);
                self.in_flight |= 1 << line;
                self.claims += 1;
                line
            }
            None => 0,
        }
    }

    fn complete(&mut self, line: u32) {
        self.completions.push(line);
        if line < 64 {
            self.in_flight &= !(1 << line);
        }
    }
}

// ============================================================================
// SiFive PLIC
// ============================================================================

/// SiFive PLIC with all nine contexts
#[derive(Debug)]
pub struct PlicSim {
    priority: [u32; plic::NUM_SOURCES],
    enable: [[u32; plic::BITMAP_WORDS]; plic::NUM_CONTEXTS],
    threshold: [u32; plic::NUM_CONTEXTS],
    gateway: Gateway,
}

impl PlicSim {
    pub fn new() -> Self {
        Self {
            priority: [0; plic::NUM_SOURCES],
            enable: [[0; plic::BITMAP_WORDS]; plic::NUM_CONTEXTS],
            threshold: [0; plic::NUM_CONTEXTS],
            gateway: Gateway::default(),
        }
    }

    /// Assert interrupt `line` at its gateway
    pub fn raise(&mut self, line: u32) {
        self.gateway.raise(line);
    }

    pub fn in_flight(&self, line: u32) -> bool {
        self.gateway.in_flight & (1 << line) != 0
    }

    /// Successful claims so far
    pub fn claims(&self) -> usize {
        self.gateway.claims
    }

    /// Make the next claim read return `raw`, whatever is pending
    pub fn glitch_claim(&mut self, raw: u32) {
        self.gateway.bogus = Some(raw);
    }

    /// Every value written to a claim/complete register
    pub fn completions(&self) -> &[u32] {
        &self.gateway.completions
    }

    fn claim(&mut self, ctx: usize) -> u32 {
        let enable = self.enable[ctx];
        let threshold = self.threshold[ctx];
        let priority = self.priority;
        self.gateway.claim(plic::MAX_LINE, |line| {
            let (word, bit) = (line as usize / 32, line % 32);
            let prio = priority[line as usize];
            (enable[word] & (1 << bit) != 0 && prio > threshold).then_some(prio)
        })
    }
}

impl RegisterBus for PlicSim {
    fn read32(&mut self, offset: usize) -> u32 {
        use plic::*;
        match offset {
            o if o < PENDING_OFFSET => self.priority[o / 4],
            o if o < ENABLE_OFFSET => {
                let word = (o - PENDING_OFFSET) / 4;
                (self.gateway.pending >> (32 * word)) as u32
            }
            o if o < CONTEXT_OFFSET => {
                let rel = o - ENABLE_OFFSET;
                self.enable[rel / ENABLE_BANK_SIZE][(rel % ENABLE_BANK_SIZE) / 4]
            }
            o => {
                let rel = o - CONTEXT_OFFSET;
                let ctx = rel / CONTEXT_BLOCK_SIZE;
                match rel % CONTEXT_BLOCK_SIZE {
                    THRESHOLD_REG => self.threshold[ctx],
                    CLAIM_REG => self.claim(ctx),
                    reg => panic!("read of context register {:#x}", reg),
                }
            }
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        use plic::*;
        match offset {
            o if o < PENDING_OFFSET => self.priority[o / 4] = value,
            // pending bits are read-only
            o if o < ENABLE_OFFSET => {}
            o if o < CONTEXT_OFFSET => {
                let rel = o - ENABLE_OFFSET;
                self.enable[rel / ENABLE_BANK_SIZE][(rel % ENABLE_BANK_SIZE) / 4] = value;
            }
            o => {
                let rel = o - CONTEXT_OFFSET;
                let ctx = rel / CONTEXT_BLOCK_SIZE;
                match rel % CONTEXT_BLOCK_SIZE {
                    THRESHOLD_REG => self.threshold[ctx] = value,
                    CLAIM_REG => self.gateway.complete(value),
                    reg => panic!("write of context register {:#x}", reg),
                }
            }
        }
    }
}

// ============================================================================
// Single-Context Controllers (MiG-V, HCSC1)
// ============================================================================

/// MiG-V/HCSC1 register window serving claims for one target
#[derive(Debug)]
pub struct SingleContextSim {
    regs: [u32; 12],
    target: usize,
    gateway: Gateway,
}

impl SingleContextSim {
    pub fn new(target: usize) -> Self {
        Self {
            regs: [0; 12],
            target,
            gateway: Gateway::default(),
        }
    }

    pub fn raise(&mut self, line: u32) {
        self.gateway.raise(line);
    }

    pub fn in_flight(&self, line: u32) -> bool {
        self.gateway.in_flight & (1 << line) != 0
    }

    pub fn claims(&self) -> usize {
        self.gateway.claims
    }

    fn claim_offset(&self) -> usize {
        migv::CLAIM_OFFSET + 4 * self.target
    }

    fn claim(&mut self) -> u32 {
        let regs = self.regs;
        let enable = regs[(migv::IE_TARGET_OFFSET + 4 * self.target) / 4];
        let threshold = regs[(migv::THRESHOLD_OFFSET + 4 * self.target) / 4];
        self.gateway.claim(migv::MAX_LINE, |line| {
            let n = (line - 1) as usize;
            let word = regs[migv::PRIORITY_OFFSET / 4 + n / 8];
            let prio = (word >> (4 * (n % 8))) & 0xF;
            (enable & (1 << n) != 0 && prio > threshold).then_some(prio)
        })
    }
}

impl RegisterBus for SingleContextSim {
    fn read32(&mut self, offset: usize) -> u32 {
        if offset == self.claim_offset() {
            self.claim()
        } else {
            self.regs[offset / 4]
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        if offset == self.claim_offset() {
            self.gateway.complete(value);
        } else {
            self.regs[offset / 4] = value;
        }
    }
}

// ============================================================================
// CPU
// ============================================================================

/// Unwind payload of [`MockCpu::halt`]
#[derive(Debug)]
pub struct Halted;

/// Unwind payload of [`MockCpu::return_to_user`]: the context address
#[derive(Debug)]
pub struct Resumed(pub usize);

/// CSR state of one hart
#[derive(Debug)]
pub struct MockCpu {
    scause: Cell<u64>,
    stval: Cell<u64>,
    sip: Cell<Interrupts>,
    sie: Cell<Interrupts>,
    halts: Cell<u32>,
    resumes: Cell<u32>,
}

impl MockCpu {
    pub fn new() -> Self {
        Self {
            scause: Cell::new(0),
            stval: Cell::new(0),
            sip: Cell::new(Interrupts::empty()),
            sie: Cell::new(Interrupts::empty()),
            halts: Cell::new(0),
            resumes: Cell::new(0),
        }
    }

    pub fn set_scause(&self, scause: u64) {
        self.scause.set(scause);
    }

    pub fn set_stval(&self, stval: u64) {
        self.stval.set(stval);
    }

    pub fn set_sip(&self, sip: Interrupts) {
        self.sip.set(sip);
    }

    pub fn sie(&self) -> Interrupts {
        self.sie.get()
    }

    pub fn halts(&self) -> u32 {
        self.halts.get()
    }

    pub fn resumes(&self) -> u32 {
        self.resumes.get()
    }
}

impl Cpu for MockCpu {
    fn read_scause(&self) -> u64 {
        self.scause.get()
    }

    fn read_stval(&self) -> u64 {
        self.stval.get()
    }

    fn read_sip(&self) -> Interrupts {
        self.sip.get()
    }

    fn enable_sie(&self, bits: Interrupts) {
        self.sie.set(self.sie.get() | bits);
    }

    fn disable_sie(&self, bits: Interrupts) {
        self.sie.set(self.sie.get() - bits);
    }

    fn halt(&self) -> ! {
        self.halts.set(self.halts.get() + 1);
        panic::panic_any(Halted)
    }

    unsafe fn return_to_user(&self, ctx: *mut UserContext) -> ! {
        self.resumes.set(self.resumes.get() + 1);
        panic::panic_any(Resumed(ctx as usize))
    }
}

/// Run `f`; true if it halted the hart
pub fn catch_halt<R>(f: impl FnOnce() -> R) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => false,
        Err(payload) if payload.is::<Halted>() => true,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Run a trap path; returns the context it resumed
pub fn catch_resume<R>(f: impl FnOnce() -> R) -> *mut UserContext {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => panic!("trap path returned"),
        Err(payload) => match payload.downcast::<Resumed>() {
            Ok(resumed) => resumed.0 as *mut UserContext,
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock replaying a fixed sequence of counter values
///
/// Once the script runs out the last value repeats.
#[derive(Debug)]
pub struct ScriptedClock {
    script: Vec<u64>,
    next: Cell<usize>,
    last: Cell<u64>,
    deadlines: Vec<u64>,
}

impl ScriptedClock {
    pub fn new(script: &[u64]) -> Self {
        Self {
            script: script.to_vec(),
            next: Cell::new(0),
            last: Cell::new(0),
            deadlines: Vec::new(),
        }
    }

    /// Every deadline programmed, oldest first
    pub fn deadlines(&self) -> &[u64] {
        &self.deadlines
    }

    pub fn last_read(&self) -> u64 {
        self.last.get()
    }
}

impl TimerDevice for ScriptedClock {
    fn now(&self) -> u64 {
        let i = self.next.get();
        let value = match self.script.get(i) {
            Some(&v) => v,
            None => self.script.last().copied().unwrap_or(0),
        };
        self.next.set(i + 1);
        self.last.set(value);
        value
    }

    fn set_deadline(&mut self, deadline: u64) {
        self.deadlines.push(deadline);
    }
}

// ============================================================================
// Kernel
// ============================================================================

/// What the trap path asked of the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Interrupt(Irq),
    VmFault(VmFaultType),
    UserFault(u64, Word),
    Syscall(Syscall, SyscallArgs),
    UnknownSyscall(i64),
    FastCall(SyscallArgs),
    FastReplyRecv(SyscallArgs),
    Schedule,
}

/// Kernel that records every call and always resumes the same thread
#[derive(Debug)]
pub struct RecordingKernel {
    context: Box<UserContext>,
    events: Vec<Event>,
    unmask_on_delivery: bool,
    reset_timer_on_tick: bool,
}

impl RecordingKernel {
    pub fn new() -> Self {
        Self {
            context: Box::new(UserContext::for_entry(0x1000, 0x8000)),
            events: Vec::new(),
            unmask_on_delivery: false,
            reset_timer_on_tick: false,
        }
    }

    /// Re-enable external lines from inside the handler
    pub fn unmask_on_delivery(mut self) -> Self {
        self.unmask_on_delivery = true;
        self
    }

    /// Program the next tick from inside the handler
    pub fn reset_timer_on_tick(mut self) -> Self {
        self.reset_timer_on_tick = true;
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn context_ptr(&mut self) -> *mut UserContext {
        &mut *self.context
    }
}

impl Kernel for RecordingKernel {
    fn handle_interrupt(&mut self, irq: Irq, irqs: &mut dyn IrqControl) {
        self.events.push(Event::Interrupt(irq));
        match irq {
            Irq::External(_) if self.unmask_on_delivery => irqs.unmask(irq),
            Irq::Timer if self.reset_timer_on_tick => {
                irqs.reset_timer();
            }
            _ => {}
        }
    }

    fn handle_vm_fault(&mut self, fault: VmFaultType) {
        self.events.push(Event::VmFault(fault));
    }

    fn handle_user_level_fault(&mut self, code: u64, aux: Word) {
        self.events.push(Event::UserFault(code, aux));
    }

    fn handle_syscall(&mut self, syscall: Syscall, args: SyscallArgs) {
        self.events.push(Event::Syscall(syscall, args));
    }

    fn handle_unknown_syscall(&mut self, raw: i64) {
        self.events.push(Event::UnknownSyscall(raw));
    }

    fn fastpath_call(&mut self, args: SyscallArgs) {
        self.events.push(Event::FastCall(args));
    }

    fn fastpath_reply_recv(&mut self, args: SyscallArgs) {
        self.events.push(Event::FastReplyRecv(args));
    }

    fn schedule(&mut self) {
        self.events.push(Event::Schedule);
    }

    fn current_context(&mut self) -> &mut UserContext {
        &mut self.context
    }
}
