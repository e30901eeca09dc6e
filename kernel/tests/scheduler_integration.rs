//! Black-box scheduler/process-table tests against the public API only,
//! using a non-blocking `Hal` double (no real context switching — these
//! scenarios never call `dispatch`/`bootstrap`).

use std::sync::Arc;

use kernel::error::KernelError;
use kernel::hal::{ContextHandle, DeviceStatus, DiskId, HalError, Hal, Mode, SectorBuf, SwitchMode};
use kernel::tracer::NullTracer;
use kernel::Kernel;

#[derive(Debug, Clone, PartialEq, Eq)]
struct StubContext(usize);

impl ContextHandle for StubContext {}

struct StubHal;

impl Hal for StubHal {
    type Context = StubContext;

    fn now(&self) -> u32 {
        1000
    }

    fn arm_timer(&self, _delta_ms: u32) {}
    fn disarm_timer(&self) {}

    fn timer_status(&self) -> DeviceStatus {
        DeviceStatus::Free
    }

    fn disk_op(
        &self,
        _disk_id: DiskId,
        _sector: u32,
        _buffer: &mut SectorBuf,
        _op: kernel::hal::DiskOp,
    ) -> Result<(), HalError> {
        Ok(())
    }

    fn disk_status(&self, _disk_id: DiskId) -> DeviceStatus {
        DeviceStatus::Free
    }

    fn make_context(&self, entry: usize, _mode: Mode) -> Self::Context {
        StubContext(entry)
    }

    fn switch_context(&self, _mode: SwitchMode, _target: &Self::Context) {}

    fn lock(&self, _name: u32, _blocking: bool) -> bool {
        true
    }
    fn unlock(&self, _name: u32) {}

    fn mem_read(&self, _addr: usize) -> u32 {
        0
    }
    fn mem_write(&self, _addr: usize, _value: u32) {}

    fn halt(&self) -> ! {
        panic!("StubHal::halt called by a test path that should not reach it")
    }
}

fn new_kernel() -> Kernel<StubHal> {
    Kernel::new(Arc::new(StubHal), Arc::new(NullTracer), 64)
}

#[test]
fn a_full_cast_of_processes_can_be_created_suspended_resumed_and_terminated() {
    let k = new_kernel();
    let root = k.create("root", 0, 8).unwrap();
    let a = k.create("a", 1, 5).unwrap();
    let b = k.create("b", 2, 20).unwrap();

    assert_eq!(root, 0);
    assert_eq!(k.get_pid("a"), Ok(a));
    assert_eq!(k.get_pid("b"), Ok(b));

    // lower priority number pops first.
    assert_eq!(k.get_pid(""), Ok(0));

    k.suspend(a).unwrap();
    assert_eq!(k.suspend(a), Err(KernelError::AlreadySuspended));
    k.resume(a).unwrap();
    assert_eq!(k.resume(a), Err(KernelError::ResumeUnsuspended));

    k.terminate(b).unwrap();
    assert_eq!(k.get_pid("b"), Err(KernelError::DoesNotExist));
    assert_eq!(k.terminate(b), Err(KernelError::DoesNotExist));
}

#[test]
fn table_fills_up_and_rejects_the_sixteenth_process() {
    let k = new_kernel();
    for i in 0..15 {
        k.create(&format!("p{i}"), i, 1).unwrap();
    }
    assert_eq!(
        k.create("overflow", 99, 1),
        Err(KernelError::TableFull)
    );
}
