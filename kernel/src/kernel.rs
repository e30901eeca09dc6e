//! The single owning runtime struct. `Kernel<H>` replaces `lazy_static!`
//! singletons (`PROCESS_MANAGER`, `PID_ALLOCATOR`, ...) with fields owned by
//! one value, generic over the `Hal` implementation.
//!
//! Locking follows 's fixed order: COMMON → TIMER → READY →
//! SUSPEND → PRINT. Each is a distinct `spin::Mutex`, mirroring the named
//! interlocks (`COMMON_DATA_LOCK`, `TIMER_QUEUE_LOCK`, ...) in
//! `original_source/common.h`, even though the HAL's own interlock
//! primitive is a separate, lower-level thing (`Hal::lock`/`Hal::unlock`)
//! used only by user-mode code via traps the kernel does not itself issue.

use spin::Mutex;
use std::sync::Arc;

use crate::data::process::ProcessDescriptor;
use crate::data::shadow::ShadowDirectory;
use crate::hal::Hal;
use crate::process_table::ProcessTable;
use crate::queue::{FramePool, ReadyQueue, SuspendQueue, TimerQueue};
use crate::tracer::Tracer;

/// State protected by the COMMON interlock: the process table plus the
/// paging engine's frame pool and shadow directory, and a record of which
/// PID is Running (the "implicit Running slot", 1).
pub struct CommonState<C> {
    pub process_table: ProcessTable<C>,
    pub frame_pool: FramePool,
    pub shadow: ShadowDirectory,
    pub current_pid: i32,
    /// Circular hand for second-chance replacement.
    pub clock_hand: usize,
}

pub struct Kernel<H: Hal> {
    pub(crate) common: Mutex<CommonState<H::Context>>,
    pub(crate) ready: Mutex<ReadyQueue>,
    pub(crate) timer: Mutex<TimerQueue>,
    pub(crate) suspend: Mutex<SuspendQueue>,
    pub(crate) print: Mutex<()>,
    pub hal: Arc<H>,
    pub tracer: Arc<dyn Tracer>,
}

impl<H: Hal> Kernel<H> {
    pub fn new(hal: Arc<H>, tracer: Arc<dyn Tracer>, phys_frames: usize) -> Self {
        Self {
            common: Mutex::new(CommonState {
                process_table: ProcessTable::new(),
                frame_pool: FramePool::new(phys_frames),
                shadow: ShadowDirectory::new(),
                current_pid: -1,
                clock_hand: 0,
            }),
            ready: Mutex::new(ReadyQueue::new()),
            timer: Mutex::new(TimerQueue::new()),
            suspend: Mutex::new(SuspendQueue::new()),
            print: Mutex::new(()),
            hal,
            tracer,
        }
    }

    pub fn current_pid(&self) -> i32 {
        self.common.lock().current_pid
    }

    /// Logs an internal invariant violation and halts — never
    /// returns. Internal invariant violations are not recoverable
    /// `KernelError`s.
    pub fn bug(&self, function: &str, detail: &str) -> ! {
        log::error!("internal invariant violated in {function}: {detail}");
        self.hal.halt()
    }

    /// Build the queue snapshot the Tracer wants alongside scheduler events.
    /// Acquires READY, TIMER, SUSPEND in the declared order — callers must
    /// not already hold any of them.
    pub fn snapshot_queues(&self) -> crate::tracer::QueueSnapshot {
        crate::tracer::QueueSnapshot {
            ready: self.ready.lock().iter().collect(),
            timer: self.timer.lock().iter().collect(),
            suspend: self.suspend.lock().iter().collect(),
        }
    }

    /// Snapshot the queues, then report a scheduler event under PRINT —
    /// the last lock in the fixed acquisition order, taken only after every
    /// queue lock above it has already been released.
    pub fn trace_scheduler_event(
        &self,
        action: crate::tracer::Action,
        target_pid: i32,
        current_pid: i32,
    ) {
        let queues = self.snapshot_queues();
        let _print = self.print.lock();
        self.tracer.scheduler_event(action, target_pid, current_pid, &queues);
    }

    pub fn trace_memory_event(
        &self,
        action: crate::tracer::Action,
        target_pid: i32,
        current_pid: i32,
        detail: &str,
    ) {
        let _print = self.print.lock();
        self.tracer.memory_event(action, target_pid, current_pid, detail);
    }

    /// Looks up `pid` in `state.process_table` and runs `f` on its
    /// descriptor. A missing PID is an internal invariant violation, not a
    /// recoverable error — every call site has already validated the PID
    /// exists — so it routes through `bug` (log + halt) rather than a bare
    /// panic, which on one of hal-sim's per-process OS threads would only
    /// kill that thread and leave the rest of the simulation running broken.
    pub(crate) fn with_pd<R>(
        &self,
        state: &mut CommonState<H::Context>,
        pid: i32,
        f: impl FnOnce(&mut ProcessDescriptor<H::Context>) -> R,
    ) -> R {
        let Some(pd) = state.process_table.get_mut(pid) else {
            self.bug("Kernel::with_pd", &format!("pid {pid} does not exist"));
        };
        f(pd)
    }
}
