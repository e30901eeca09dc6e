//! A concrete `Hal` + `Tracer` implementation backing the kernel with plain
//! OS threads instead of real hardware. One OS thread per process stands in
//! for the simulator's cooperative user-thread pool: `switch_context` wakes
//! the target's thread and parks the caller's, so at most one process
//! thread is ever runnable at a time by construction, matching the
//! logically single-threaded kernel execution model.
//!
//! Disks and the timer each simulate completion latency with a short-lived
//! background thread rather than firing the interrupt inline, so that a
//! request really is asynchronous from the issuing process's point of view.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

use kernel::config::{DISK_COUNT, PAGE_WORDS, PHYS_FRAMES, SECTORS_PER_DISK};
use kernel::hal::{ContextHandle, DeviceStatus, DiskId, DiskOp, HalError, Mode, SectorBuf, SwitchMode};
use kernel::tracer::{Action, QueueSnapshot, Tracer, Verbosity, VerbosityGate};
use kernel::{Hal, Kernel};

/// A process entry point, as run by a `hal-sim` process thread. `Hal`'s
/// `entry: usize` is this function pointer's address; see [`entry_addr`].
pub type EntryFn = fn();

/// Turn an entry function into the `usize` address `Scheduler::create`
/// expects. The reverse conversion happens in [`HalSim::make_context`].
pub fn entry_addr(f: EntryFn) -> usize {
    f as usize
}

/// Fetch the kernel handle for whichever process is running on the calling
/// OS thread. Entry functions use this to get at the `Kernel` they issue
/// syscalls against, since a process's only argument is its own entry
/// address, not a captured handle.
pub fn current_kernel() -> Arc<Kernel<HalSim>> {
    CURRENT_KERNEL
        .with(|cell| cell.borrow().clone())
        .expect("current_kernel called from outside a process thread")
}

thread_local! {
    static MY_CONTEXT: RefCell<Option<ThreadContext>> = RefCell::new(None);
    static CURRENT_KERNEL: RefCell<Option<Arc<Kernel<HalSim>>>> = RefCell::new(None);
}

/// A one-shot wake/park gate: `release` makes the next `park` return instead
/// of blocking, and is consumed by it.
struct Gate {
    ready: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    fn new() -> Self {
        Self {
            ready: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    fn release(&self) {
        let mut ready = self.ready.lock().unwrap();
        *ready = true;
        self.cv.notify_one();
    }

    fn park(&self) {
        let mut ready = self.ready.lock().unwrap();
        while !*ready {
            ready = self.cv.wait(ready).unwrap();
        }
        *ready = false;
    }
}

/// Opaque context handle: one per process, backing one OS thread.
#[derive(Clone)]
pub struct ThreadContext(Arc<Gate>);

impl fmt::Debug for ThreadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadContext({:p})", Arc::as_ptr(&self.0))
    }
}

impl ContextHandle for ThreadContext {}

struct DiskState {
    status: Mutex<DeviceStatus>,
    sectors: Mutex<Vec<SectorBuf>>,
}

impl DiskState {
    fn new() -> Self {
        Self {
            status: Mutex::new(DeviceStatus::Free),
            sectors: Mutex::new(vec![[0u32; PAGE_WORDS]; SECTORS_PER_DISK]),
        }
    }
}

/// In-process stand-in for the hardware simulator.
///
/// `bind_kernel` must be called once, right after the owning `Kernel` is
/// constructed, before any process is created — `make_context`, `disk_op`
/// and `arm_timer` all need to reach back into the kernel to deliver
/// interrupts and cannot do so until the back-reference is set.
pub struct HalSim {
    start: Instant,
    kernel: OnceLock<Weak<Kernel<HalSim>>>,
    disks: Vec<DiskState>,
    disk_latency: Duration,
    timer_status: Mutex<DeviceStatus>,
    timer_generation: Arc<AtomicU64>,
    locks: Vec<Mutex<bool>>,
    lock_cvs: Vec<Condvar>,
    memory: Mutex<Vec<u32>>,
}

const NAMED_LOCK_COUNT: usize = 32;

impl HalSim {
    pub fn new() -> Arc<Self> {
        Self::with_disk_latency(Duration::from_millis(2))
    }

    pub fn with_disk_latency(disk_latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            kernel: OnceLock::new(),
            disks: (0..=DISK_COUNT).map(|_| DiskState::new()).collect(),
            disk_latency,
            timer_status: Mutex::new(DeviceStatus::Free),
            timer_generation: Arc::new(AtomicU64::new(0)),
            locks: (0..NAMED_LOCK_COUNT).map(|_| Mutex::new(false)).collect(),
            lock_cvs: (0..NAMED_LOCK_COUNT).map(|_| Condvar::new()).collect(),
            memory: Mutex::new(vec![0u32; PHYS_FRAMES * PAGE_WORDS]),
        })
    }

    pub fn bind_kernel(&self, kernel: Weak<Kernel<HalSim>>) {
        self.kernel
            .set(kernel)
            .unwrap_or_else(|_| panic!("HalSim::bind_kernel called more than once"));
    }

    fn kernel_handle(&self) -> Arc<Kernel<HalSim>> {
        self.kernel
            .get()
            .expect("HalSim::bind_kernel was never called")
            .upgrade()
            .expect("kernel dropped while its own HAL was still in use")
    }
}

impl Hal for HalSim {
    type Context = ThreadContext;

    fn now(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    fn arm_timer(&self, delta_ms: u32) {
        let generation = self.timer_generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.timer_status.lock().unwrap() = DeviceStatus::InUse;

        let generation_counter = self.timer_generation.clone();
        let kernel = Arc::downgrade(&self.kernel_handle());
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(delta_ms as u64));
            if generation_counter.load(Ordering::SeqCst) != generation {
                return; // superseded by a later arm or a disarm
            }
            if let Some(kernel) = kernel.upgrade() {
                *kernel.hal.timer_status.lock().unwrap() = DeviceStatus::Free;
                kernel.on_timer_interrupt();
            }
        });
    }

    fn disarm_timer(&self) {
        self.timer_generation.fetch_add(1, Ordering::SeqCst);
        *self.timer_status.lock().unwrap() = DeviceStatus::Free;
    }

    fn timer_status(&self) -> DeviceStatus {
        *self.timer_status.lock().unwrap()
    }

    fn disk_op(
        &self,
        disk_id: DiskId,
        sector: u32,
        buffer: &mut SectorBuf,
        op: DiskOp,
    ) -> Result<(), HalError> {
        let disk = self
            .disks
            .get(disk_id as usize)
            .ok_or(HalError::BadDisk(disk_id))?;

        let mut status = disk.status.lock().unwrap();
        if *status == DeviceStatus::InUse {
            return Err(HalError::DiskBusy(disk_id));
        }
        *status = DeviceStatus::InUse;
        drop(status);

        {
            let mut sectors = disk.sectors.lock().unwrap();
            let slot = sectors
                .get_mut(sector as usize)
                .ok_or(HalError::BadDisk(disk_id))?;
            match op {
                DiskOp::Write => *slot = *buffer,
                DiskOp::Read => *buffer = *slot,
            }
        }

        let idx = disk_id as usize;
        let delay = self.disk_latency;
        let kernel = Arc::downgrade(&self.kernel_handle());
        thread::spawn(move || {
            thread::sleep(delay);
            if let Some(kernel) = kernel.upgrade() {
                *kernel.hal.disks[idx].status.lock().unwrap() = DeviceStatus::Free;
                kernel.on_disk_interrupt(disk_id);
            }
        });
        Ok(())
    }

    fn disk_status(&self, disk_id: DiskId) -> DeviceStatus {
        self.disks
            .get(disk_id as usize)
            .map(|d| *d.status.lock().unwrap())
            .unwrap_or(DeviceStatus::InUse)
    }

    fn make_context(&self, entry: usize, mode: Mode) -> ThreadContext {
        let gate = Arc::new(Gate::new());
        let context = ThreadContext(gate);
        // Safe: `entry` is always produced by `entry_addr(f)` for some
        // `f: EntryFn`, immediately before being handed to `Scheduler::create`.
        let entry_fn: EntryFn = unsafe { std::mem::transmute::<usize, EntryFn>(entry) };
        let kernel = Arc::downgrade(&self.kernel_handle());
        let spawned = context.clone();

        thread::Builder::new()
            .name(format!("process-{mode:?}"))
            .spawn(move || {
                MY_CONTEXT.with(|cell| *cell.borrow_mut() = Some(spawned.clone()));
                spawned.0.park(); // wait for the first dispatch to this context
                let kernel = match kernel.upgrade() {
                    Some(kernel) => kernel,
                    None => return, // kernel torn down before this process ran
                };
                CURRENT_KERNEL.with(|cell| *cell.borrow_mut() = Some(kernel.clone()));
                entry_fn();
                // A well-behaved entry point terminates itself via syscall
                // and never returns here; this is a fallback only.
                let _ = kernel.terminate(-1);
            })
            .expect("failed to spawn process thread");

        context
    }

    fn switch_context(&self, mode: SwitchMode, target: &ThreadContext) {
        target.0.release();
        match mode {
            SwitchMode::Kill => loop {
                // This thread's context has just been discarded by the
                // kernel and nothing will ever release it again; park
                // forever rather than return, per the HAL contract.
                thread::park();
            },
            SwitchMode::Save => match MY_CONTEXT.with(|cell| cell.borrow().clone()) {
                Some(mine) => mine.0.park(),
                None => loop {
                    // The bootstrap thread handing off control for the
                    // first time: it has no context to resume and simply
                    // waits here until `halt` ends the process.
                    thread::park();
                },
            },
        }
    }

    fn lock(&self, name: u32, blocking: bool) -> bool {
        let idx = name as usize % self.locks.len();
        let mut locked = self.locks[idx].lock().unwrap();
        if *locked {
            if !blocking {
                return false;
            }
            while *locked {
                locked = self.lock_cvs[idx].wait(locked).unwrap();
            }
        }
        *locked = true;
        true
    }

    fn unlock(&self, name: u32) {
        let idx = name as usize % self.locks.len();
        *self.locks[idx].lock().unwrap() = false;
        self.lock_cvs[idx].notify_all();
    }

    fn mem_read(&self, addr: usize) -> u32 {
        self.memory.lock().unwrap()[addr]
    }

    fn mem_write(&self, addr: usize, value: u32) {
        self.memory.lock().unwrap()[addr] = value;
    }

    fn halt(&self) -> ! {
        std::process::exit(0);
    }
}

/// Prints scheduler and memory events to stdout, gated independently by
/// three verbosity settings mirroring the harness's `--scheduler`,
/// `--memory`, and `--other` flags.
pub struct ConsoleTracer {
    scheduler_gate: Mutex<VerbosityGate>,
    memory_gate: Mutex<VerbosityGate>,
    other_gate: Mutex<VerbosityGate>,
    scheduler_verbosity: Verbosity,
    memory_verbosity: Verbosity,
    other_verbosity: Verbosity,
}

impl ConsoleTracer {
    pub fn new(scheduler: Verbosity, memory: Verbosity, other: Verbosity) -> Self {
        Self {
            scheduler_gate: Mutex::new(VerbosityGate::default()),
            memory_gate: Mutex::new(VerbosityGate::default()),
            other_gate: Mutex::new(VerbosityGate::default()),
            scheduler_verbosity: scheduler,
            memory_verbosity: memory,
            other_verbosity: other,
        }
    }
}

impl Tracer for ConsoleTracer {
    fn scheduler_event(
        &self,
        action: Action,
        target_pid: i32,
        current_pid: i32,
        queues: &QueueSnapshot,
    ) {
        let (gate, verbosity) = match action {
            Action::AllDone | Action::Interrupt => (&self.other_gate, self.other_verbosity),
            _ => (&self.scheduler_gate, self.scheduler_verbosity),
        };
        let mut gate = gate.lock().unwrap();
        if gate.should_emit(verbosity) {
            println!(
                "{:<9} pid={target_pid:<3} current={current_pid:<3} ready={:?} timer={:?} suspend={:?}",
                action.name(),
                queues.ready,
                queues.timer,
                queues.suspend,
            );
        }
    }

    fn memory_event(&self, action: Action, target_pid: i32, current_pid: i32, detail: &str) {
        let mut gate = self.memory_gate.lock().unwrap();
        if gate.should_emit(self.memory_verbosity) {
            println!("{:<9} pid={target_pid:<3} current={current_pid:<3} {detail}", action.name());
        }
    }
}
