//! A minimal `Hal` double for unit tests that only exercise validation and
//! queue-bookkeeping logic, never a real blocking `switch_context`.

use crate::hal::{ContextHandle, DeviceStatus, DiskId, HalError, Hal, Mode, SectorBuf, SwitchMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeContext(pub usize);

impl ContextHandle for FakeContext {}

#[derive(Default)]
pub struct FakeHal;

impl Hal for FakeHal {
    type Context = FakeContext;

    fn now(&self) -> u32 {
        0
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
        _op: crate::hal::DiskOp,
    ) -> Result<(), HalError> {
        Ok(())
    }

    fn disk_status(&self, _disk_id: DiskId) -> DeviceStatus {
        DeviceStatus::Free
    }

    fn make_context(&self, entry: usize, _mode: Mode) -> Self::Context {
        FakeContext(entry)
    }

    /// Unused by the paths these unit tests exercise; a real blocking
    /// implementation lives in `hal-sim`.
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
        panic!("FakeHal::halt called by a test path that should not reach it")
    }
}
