//! # RISC-V Trap Handling
//!
//! The entry stub saves the user registers and calls
//! [`handle_trap`](TrapDispatcher::handle_trap), which reads `scause` and
//! picks one of three paths of the per-hart [`TrapDispatcher`]:
//!
//! - [`handle_interrupt_trap`](TrapDispatcher::handle_interrupt_trap):
//!   `scause` has the interrupt bit set
//! - [`handle_exception_trap`](TrapDispatcher::handle_exception_trap):
//!   synchronous exceptions other than `ecall`
//! - [`handle_syscall_trap`](TrapDispatcher::handle_syscall_trap):
//!   `ecall` from U-mode, with the arguments unpacked from the saved `a0`-`a7`
//!
//! None of them return. Each takes the lock for its trap class, hands the
//! event to the [`Kernel`], and finishes in
//! [`restore_user_context`](TrapDispatcher::restore_user_context), which
//! releases the lock and `sret`s to whatever thread the kernel has made
//! current.
//!
//! ## Locking
//!
//! Interrupt-class and synchronous-class traps each have one lock shared by
//! all harts ([`TrapLocks`]). The guard lives in the dispatcher from entry
//! until just before the final jump.

use core::fmt;

use spin::{Mutex, MutexGuard};

use super::syscall::{Syscall, SyscallArgs};
use crate::arch::riscv64::core::cpu::Cpu;
use crate::arch::riscv64::core::csr::{exception, TrapCause};
use crate::arch::riscv64::core::registers::{Register, UserContext, Word};
use crate::arch::riscv64::interrupts::{
    InterruptController, Irq, IrqLine, IrqState, TriggerControl, TriggerMode,
};
use crate::arch::riscv64::smp::HartId;
use crate::arch::riscv64::timers::{TickTimer, TimerDevice};

// ============================================================================
// Fault Classification
// ============================================================================

/// Synchronous exceptions handled as virtual-memory faults
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmFaultType {
    /// Instruction access fault
    InstructionAccessFault = exception::INSTRUCTION_ACCESS_FAULT,
    /// Load access fault
    LoadAccessFault = exception::LOAD_ACCESS_FAULT,
    /// Store/AMO access fault
    StoreAccessFault = exception::STORE_ACCESS_FAULT,
    /// Instruction page fault
    InstructionPageFault = exception::INSTRUCTION_PAGE_FAULT,
    /// Load page fault
    LoadPageFault = exception::LOAD_PAGE_FAULT,
    /// Store/AMO page fault
    StorePageFault = exception::STORE_PAGE_FAULT,
}

impl VmFaultType {
    /// Classify an exception cause code
    pub const fn from_cause(code: u64) -> Option<Self> {
        match code {
            exception::INSTRUCTION_ACCESS_FAULT => Some(Self::InstructionAccessFault),
            exception::LOAD_ACCESS_FAULT => Some(Self::LoadAccessFault),
            exception::STORE_ACCESS_FAULT => Some(Self::StoreAccessFault),
            exception::INSTRUCTION_PAGE_FAULT => Some(Self::InstructionPageFault),
            exception::LOAD_PAGE_FAULT => Some(Self::LoadPageFault),
            exception::STORE_PAGE_FAULT => Some(Self::StorePageFault),
            _ => None,
        }
    }

    /// The cause code
    pub const fn code(self) -> u64 {
        self as u64
    }

    /// Fault on an instruction fetch
    pub const fn is_instruction(self) -> bool {
        matches!(self, Self::InstructionAccessFault | Self::InstructionPageFault)
    }
}

// ============================================================================
// Kernel Interface
// ============================================================================

/// Interrupt operations available to the kernel while it handles an interrupt
///
/// There is no acknowledge here: the trap path clears the active interrupt
/// itself once the handler returns.
pub trait IrqControl {
    /// Disable an interrupt
    fn mask(&mut self, irq: Irq);

    /// Enable an interrupt
    fn unmask(&mut self, irq: Irq);

    /// Program the next timer tick; returns the new deadline
    fn reset_timer(&mut self) -> u64;

    /// Whether a timer or external interrupt is pending
    fn is_pending(&self) -> bool;
}

/// The rest of the kernel, as seen from the trap path
///
/// Every handler runs with the lock of its trap class held. Interrupt,
/// exception and slowpath syscall handling are followed by [`schedule`];
/// the fastpath handlers pick the next thread themselves.
///
/// [`schedule`]: Kernel::schedule
pub trait Kernel {
    /// Deliver an interrupt
    ///
    /// External lines arrive masked and stay masked until the kernel unmasks
    /// them through `irqs`.
    fn handle_interrupt(&mut self, irq: Irq, irqs: &mut dyn IrqControl);

    /// A virtual-memory fault of the current thread
    fn handle_vm_fault(&mut self, fault: VmFaultType);

    /// Any other exception of the current thread
    fn handle_user_level_fault(&mut self, code: u64, aux: Word);

    /// A syscall in the legal range
    fn handle_syscall(&mut self, syscall: Syscall, args: SyscallArgs);

    /// A syscall number outside the legal range; reported to the caller's fault handler
    fn handle_unknown_syscall(&mut self, raw: i64);

    /// Accelerated `Call`
    fn fastpath_call(&mut self, args: SyscallArgs) {
        self.handle_syscall(Syscall::Call, args);
        self.schedule();
    }

    /// Accelerated `ReplyRecv`
    fn fastpath_reply_recv(&mut self, args: SyscallArgs) {
        self.handle_syscall(Syscall::ReplyRecv, args);
        self.schedule();
    }

    /// Choose the thread to run next
    fn schedule(&mut self);

    /// Saved registers of the thread to resume
    fn current_context(&mut self) -> &mut UserContext;
}

// ============================================================================
// Locks and Statistics
// ============================================================================

/// Locks serializing trap handling across harts
#[derive(Debug)]
pub struct TrapLocks {
    irq: Mutex<()>,
    sys: Mutex<()>,
}

impl TrapLocks {
    /// Create both locks unlocked
    pub const fn new() -> Self {
        Self {
            irq: Mutex::new(()),
            sys: Mutex::new(()),
        }
    }

    /// Whether an interrupt-class trap is being handled
    pub fn irq_held(&self) -> bool {
        self.irq.is_locked()
    }

    /// Whether a synchronous trap is being handled
    pub fn sys_held(&self) -> bool {
        self.sys.is_locked()
    }
}

impl Default for TrapLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Locks shared by all harts of the running kernel
pub static TRAP_LOCKS: TrapLocks = TrapLocks::new();

/// Per-hart trap counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapStats {
    /// Interrupt traps taken
    pub interrupts: u64,
    /// Interrupt traps where nothing could be claimed
    pub spurious: u64,
    /// Timer interrupts delivered
    pub timer_ticks: u64,
    /// Exception traps taken
    pub exceptions: u64,
    /// Exceptions routed to VM fault handling
    pub vm_faults: u64,
    /// Syscall traps taken
    pub syscalls: u64,
    /// Syscalls with an out-of-range number
    pub unknown_syscalls: u64,
    /// Syscalls served by the fastpath
    pub fastpath: u64,
    /// Returns to user mode
    pub resumes: u64,
}

impl fmt::Display for TrapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "irq {} (spurious {}, timer {}), exc {} (vm {}), sys {} (unknown {}, fast {})",
            self.interrupts,
            self.spurious,
            self.timer_ticks,
            self.exceptions,
            self.vm_faults,
            self.syscalls,
            self.unknown_syscalls,
            self.fastpath
        )
    }
}

// ============================================================================
// Interrupt Control View
// ============================================================================

struct IrqView<'a, C, U, T> {
    irqs: &'a mut IrqState<C>,
    cpu: &'a U,
    timer: &'a mut TickTimer<T>,
}

impl<C, U, T> IrqControl for IrqView<'_, C, U, T>
where
    C: InterruptController,
    U: Cpu,
    T: TimerDevice,
{
    fn mask(&mut self, irq: Irq) {
        self.irqs.mask(self.cpu, true, irq);
    }

    fn unmask(&mut self, irq: Irq) {
        self.irqs.mask(self.cpu, false, irq);
    }

    fn reset_timer(&mut self) -> u64 {
        self.timer.reset()
    }

    fn is_pending(&self) -> bool {
        self.irqs.is_pending(self.cpu)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Trap handling state of one hart
pub struct TrapDispatcher<C, U, T> {
    hart: HartId,
    irqs: IrqState<C>,
    timer: TickTimer<T>,
    cpu: U,
    locks: &'static TrapLocks,
    held: Option<MutexGuard<'static, ()>>,
    stats: TrapStats,
}

impl<C, U, T> TrapDispatcher<C, U, T>
where
    C: InterruptController,
    U: Cpu,
    T: TimerDevice,
{
    /// Create the dispatcher of `hart`
    pub fn new(
        hart: HartId,
        ctrl: C,
        cpu: U,
        timer: TickTimer<T>,
        locks: &'static TrapLocks,
    ) -> Self {
        Self {
            hart,
            irqs: IrqState::new(ctrl),
            timer,
            cpu,
            locks,
            held: None,
            stats: TrapStats::default(),
        }
    }

    /// Boot hart setup: controller, this hart's context, first tick
    pub fn init_boot_hart(&mut self) {
        log::info!("{}: initialising interrupt controller", self.hart);
        self.irqs.init_controller(&self.cpu);
        self.init_secondary_hart();
    }

    /// Setup for every other hart once the boot hart has run [`init_boot_hart`](Self::init_boot_hart)
    pub fn init_secondary_hart(&mut self) {
        self.irqs.init_hart();
        self.timer.init();
    }

    /// This hart
    pub fn hart(&self) -> HartId {
        self.hart
    }

    /// Trap counters
    pub fn stats(&self) -> &TrapStats {
        &self.stats
    }

    /// Interrupt state of this hart
    pub fn irqs(&self) -> &IrqState<C> {
        &self.irqs
    }

    pub(crate) fn irqs_mut(&mut self) -> &mut IrqState<C> {
        &mut self.irqs
    }

    /// The processor backend
    pub fn cpu(&self) -> &U {
        &self.cpu
    }

    /// The tick timer
    pub fn timer(&self) -> &TickTimer<T> {
        &self.timer
    }

    fn lock_irq(&mut self) {
        debug_assert!(self.held.is_none(), "{}: nested trap", self.hart);
        self.held = Some(self.locks.irq.lock());
    }

    fn lock_sys(&mut self) {
        debug_assert!(self.held.is_none(), "{}: nested trap", self.hart);
        self.held = Some(self.locks.sys.lock());
    }

    // ========================================================================
    // Entry Points
    // ========================================================================

    /// Route the trap the entry stub just saved
    ///
    /// Interrupts go to [`handle_interrupt_trap`](Self::handle_interrupt_trap).
    /// An `ecall` from U-mode moves the saved `NextIP` past the instruction
    /// and goes to [`handle_syscall_trap`](Self::handle_syscall_trap) with the
    /// arguments from the current context. Everything else is an exception.
    pub fn handle_trap<K: Kernel + ?Sized>(&mut self, kernel: &mut K) -> ! {
        let cause = TrapCause::from_scause(self.cpu.read_scause());
        if cause.is_interrupt {
            self.handle_interrupt_trap(kernel)
        } else if cause.code == exception::ECALL_FROM_U {
            let ctx = kernel.current_context();
            ctx[Register::NextIp] = ctx[Register::FaultIp].wrapping_add(4);
            let (args, raw) = SyscallArgs::from_context(ctx);
            self.handle_syscall_trap(kernel, args, raw)
        } else {
            self.handle_exception_trap(kernel)
        }
    }

    /// Interrupt trap
    pub fn handle_interrupt_trap<K: Kernel + ?Sized>(&mut self, kernel: &mut K) -> ! {
        self.lock_irq();
        self.stats.interrupts += 1;
        #[cfg(feature = "debug")]
        log::trace!("{}: interrupt trap, scause {:#x}", self.hart, self.cpu.read_scause());

        self.deliver_interrupt(kernel);

        self.restore_user_context(kernel)
    }

    fn deliver_interrupt<K: Kernel + ?Sized>(&mut self, kernel: &mut K) {
        match self.irqs.active_irq(&self.cpu) {
            Some(irq) => {
                if irq == Irq::Timer {
                    self.stats.timer_ticks += 1;
                } else {
                    self.irqs.mask(&self.cpu, true, irq);
                }

                let mut view = IrqView {
                    irqs: &mut self.irqs,
                    cpu: &self.cpu,
                    timer: &mut self.timer,
                };
                kernel.handle_interrupt(irq, &mut view);

                self.irqs.ack(irq);
            }
            None => {
                self.stats.spurious += 1;
                log::warn!("{}: spurious interrupt", self.hart);
            }
        }

        kernel.schedule();
    }

    /// Synchronous exception trap (anything but `ecall`)
    pub fn handle_exception_trap<K: Kernel + ?Sized>(&mut self, kernel: &mut K) -> ! {
        self.lock_sys();
        self.stats.exceptions += 1;

        let scause = self.cpu.read_scause();
        let stval = self.cpu.read_stval();
        log::debug!(
            "{}: {} (scause {:#x}, stval {:#x})",
            self.hart,
            TrapCause::from_scause(scause).name(),
            scause,
            stval
        );

        match VmFaultType::from_cause(scause) {
            Some(fault) => {
                self.stats.vm_faults += 1;
                kernel.handle_vm_fault(fault);
            }
            None => kernel.handle_user_level_fault(scause, 0),
        }
        kernel.schedule();

        self.restore_user_context(kernel)
    }

    /// Syscall trap
    ///
    /// `args` and `raw` come straight from the user's `a0`-`a7`.
    pub fn handle_syscall_trap<K: Kernel + ?Sized>(
        &mut self,
        kernel: &mut K,
        args: SyscallArgs,
        raw: i64,
    ) -> ! {
        self.lock_sys();
        self.stats.syscalls += 1;

        #[cfg(feature = "fastpath")]
        if let Some(syscall) = Syscall::from_raw(raw).filter(|s| s.is_fastpath()) {
            self.stats.fastpath += 1;
            match syscall {
                Syscall::Call => kernel.fastpath_call(args),
                _ => kernel.fastpath_reply_recv(args),
            }
            self.restore_user_context(kernel)
        }

        self.slowpath(kernel, args, raw)
    }

    fn slowpath<K: Kernel + ?Sized>(&mut self, kernel: &mut K, args: SyscallArgs, raw: i64) -> ! {
        match Syscall::from_raw(raw) {
            Some(syscall) => kernel.handle_syscall(syscall, args),
            None => {
                self.stats.unknown_syscalls += 1;
                log::debug!("{}: unknown syscall {}", self.hart, raw);
                kernel.handle_unknown_syscall(raw);
            }
        }
        kernel.schedule();

        self.restore_user_context(kernel)
    }

    // ========================================================================
    // Exit
    // ========================================================================

    /// Release the trap lock and resume the kernel's current thread
    pub fn restore_user_context<K: Kernel + ?Sized>(&mut self, kernel: &mut K) -> ! {
        self.stats.resumes += 1;
        drop(self.held.take());

        let ctx: *mut UserContext = kernel.current_context();
        // SAFETY: the context belongs to the current thread's control block,
        // which outlives its time on this hart, and the lock guard is gone.
        unsafe { self.cpu.return_to_user(ctx) }
    }
}

impl<C, U, T> TrapDispatcher<C, U, T>
where
    C: InterruptController + TriggerControl,
    U: Cpu,
    T: TimerDevice,
{
    /// Select edge or level triggering for an external line
    pub fn set_trigger(&mut self, line: IrqLine, mode: TriggerMode) {
        let _guard = self.locks.irq.lock();
        self.irqs.set_trigger(line, mode);
    }
}

impl<C, U, T> fmt::Debug for TrapDispatcher<C, U, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapDispatcher")
            .field("hart", &self.hart)
            .field("holding_lock", &self.held.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}
