//! Process Descriptor (PD/PCB), grounded on `original_source/src/proc_mgmt.h`'s
//! `struct process` and a `ProcessControlBlock` split of identity vs.
//! mutable state.

use crate::config::MAX_NAME_LEN;
use crate::data::page_table::PageTable;
use crate::hal::DiskId;

/// Two-phase disk request state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskPhase {
    /// Queued behind a busy disk; not yet programmed into hardware.
    Pending,
    /// Already handed to the HAL; waiting for the completion interrupt.
    Issued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskOp {
    Read,
    Write,
}

/// Raw pointer into the caller-supplied transfer buffer, kept alive on the
/// requesting process's own (parked) OS thread stack for as long as the
/// request is outstanding. Sound because that thread makes no further
/// access to the buffer until it is woken by the matching completion
/// interrupt, and the Process Table's COMMON lock serializes every access
/// to the descriptor that holds it.
#[derive(Debug, Clone, Copy)]
pub struct BufferPtr(pub *mut crate::hal::SectorBuf);

unsafe impl Send for BufferPtr {}

/// A process's outstanding disk transfer, if any.
#[derive(Debug, Clone, Copy)]
pub struct DiskRequest {
    pub disk_id: DiskId,
    pub sector: u32,
    pub op: DiskOp,
    pub phase: DiskPhase,
    pub buffer: BufferPtr,
}

/// Which queue (if any) currently holds a process, tracked on the PD itself
/// so queue code can assert invariant I1 cheaply instead of scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMembership {
    None,
    Ready,
    Timer,
    Suspend,
}

/// One live process. The Process Table is the sole owner; queues hold PIDs,
/// not `ProcessDescriptor`s. Generic over the HAL's context
/// handle type so the kernel core never depends on a concrete `Hal` impl.
#[derive(Debug)]
pub struct ProcessDescriptor<C> {
    pub pid: i32,
    pub name: heapless_name::Name,
    pub priority: i32,
    pub wake_time: u32,
    pub suspended: bool,
    /// Set when a process is drained from the Timer Queue while `suspended`
    /// was raised on it mid-sleep; routes it to Suspend instead of Ready on
    /// wake-up.
    pub suspend_on_wake: bool,
    pub membership: QueueMembership,
    pub entry: usize,
    pub context: C,
    pub disk_req: Option<DiskRequest>,
    pub page_table: Option<PageTable>,
}

impl<C> ProcessDescriptor<C> {
    pub fn new(pid: i32, name: &str, priority: i32, entry: usize, context: C) -> Self {
        Self {
            pid,
            name: heapless_name::Name::new(name),
            priority,
            wake_time: 0,
            suspended: false,
            suspend_on_wake: false,
            membership: QueueMembership::None,
            entry,
            context,
            disk_req: None,
            page_table: None,
        }
    }
}

/// A small fixed-capacity string, avoiding a heap allocation per PD name and
/// mirroring the original's `char process_name[MAX_NUMBER_OF_PROCESSE_NAME + 1]`.
pub mod heapless_name {
    use super::MAX_NAME_LEN;
    use std::fmt;

    #[derive(Clone, PartialEq, Eq)]
    pub struct Name {
        buf: [u8; MAX_NAME_LEN],
        len: usize,
    }

    impl Name {
        /// Panics if `s` exceeds `MAX_NAME_LEN`; callers must validate length
        /// with `crate::scheduler::validate_name` first.
        pub fn new(s: &str) -> Self {
            assert!(s.len() <= MAX_NAME_LEN, "process name too long");
            let mut buf = [0u8; MAX_NAME_LEN];
            buf[..s.len()].copy_from_slice(s.as_bytes());
            Self { buf, len: s.len() }
        }

        pub fn as_str(&self) -> &str {
            std::str::from_utf8(&self.buf[..self.len]).expect("name bytes are always valid utf8")
        }
    }

    impl fmt::Debug for Name {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self.as_str())
        }
    }
}
