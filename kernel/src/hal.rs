//! The narrow hardware abstraction layer the kernel is built against.
//!
//! The real implementation (the hardware simulator) is an out-of-scope
//! external collaborator; `hal-sim` supplies one concrete implementation
//! used for tests and the `harness` binary.

use core::fmt;

/// Disk identifiers are 1-based (`disk_id` ∈ {1..=DISK_COUNT}).
pub type DiskId = u16;

/// Whether a piece of hardware (timer or disk) is free to accept a new request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Free,
    InUse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskOp {
    Read,
    Write,
}

/// Discriminates user vs kernel execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    User,
    Kernel,
}

/// `save` preserves the caller's context for later resumption; `kill`
/// discards it (used when terminating the calling process).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMode {
    Save,
    Kill,
}

/// Opaque handle to a hardware execution context, owned by the HAL.
///
/// `Clone` is required so the kernel can take a cheap copy of a process's
/// context out from behind the Process Table's lock before handing it to
/// `switch_context` — `switch_context` may block for the lifetime of the
/// process, so it must never be called while holding the COMMON interlock.
pub trait ContextHandle: fmt::Debug + Clone + Send + 'static {}

/// One page-sized transfer buffer: `PAGE_WORDS` 32-bit words.
pub type SectorBuf = [u32; crate::config::PAGE_WORDS];

/// Errors the HAL itself can report back synchronously. These are
/// HAL-contract violations, not user-visible `KernelError`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HalError {
    #[error("disk {0} is already in use")]
    DiskBusy(DiskId),
    #[error("timer is already armed")]
    TimerBusy,
    #[error("disk id {0} out of range")]
    BadDisk(DiskId),
}

/// Bit-exact wrapper around the simulator primitives.
///
/// Every operation here is expected to be cheap and non-blocking from the
/// kernel's point of view except `switch_context`, `halt`, and the idle
/// spin inside `Kernel::dispatch` — those are the only legal suspension
/// points.
pub trait Hal: Send + Sync {
    type Context: ContextHandle;

    /// Read the simulator clock.
    fn now(&self) -> u32;

    /// Start a one-shot wake in `delta_ms` simulator time units, overwriting
    /// any pending arm.
    fn arm_timer(&self, delta_ms: u32);

    /// Cancel any pending arm. Called when the Timer Queue becomes empty.
    fn disarm_timer(&self);

    fn timer_status(&self) -> DeviceStatus;

    /// Start a transfer on `disk_id` at `sector`. Fails fast if the disk is
    /// `InUse`; the caller (the disk subsystem) must check `disk_status`
    /// first under the relevant lock.
    fn disk_op(
        &self,
        disk_id: DiskId,
        sector: u32,
        buffer: &mut SectorBuf,
        op: DiskOp,
    ) -> Result<(), HalError>;

    fn disk_status(&self, disk_id: DiskId) -> DeviceStatus;

    fn make_context(&self, entry: usize, mode: Mode) -> Self::Context;

    /// Yield to `target`. Does not return until the calling context is
    /// rescheduled (if `mode` is `Save`); never returns if `mode` is `Kill`.
    fn switch_context(&self, mode: SwitchMode, target: &Self::Context);

    /// Acquire the named interlock. `blocking == true` suspends the caller
    /// until it is available.
    fn lock(&self, name: u32, blocking: bool) -> bool;

    fn unlock(&self, name: u32);

    fn mem_read(&self, addr: usize) -> u32;

    fn mem_write(&self, addr: usize, value: u32);

    /// Irreversibly terminate the simulation. Never returns.
    fn halt(&self) -> !;
}
