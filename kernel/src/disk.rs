//! Disk I/O subsystem multiplexing across `DISK_COUNT` independent disks.
//!
//! Grounded on `original_source/storage_mgmt.c`'s disk dispatch loop,
//! generalized from its single global `disk_table` to a per-disk busy flag
//! plus a FIFO-by-disk search over the Suspend Queue.

use crate::data::process::{BufferPtr, DiskOp, DiskPhase, DiskRequest, QueueMembership};
use crate::error::{KernelError, KernelResult};
use crate::hal::{DeviceStatus, DiskId, Hal, SectorBuf};
use crate::kernel::Kernel;
use crate::tracer::Action;

impl<H: Hal> Kernel<H> {
    /// Start (or queue) a transfer for the calling process, then block it on
    /// the Suspend Queue until the matching completion interrupt arrives.
    /// Never called with the COMMON or SUSPEND interlocks already held by
    /// the caller.
    pub fn disk_transfer(
        &self,
        disk_id: DiskId,
        sector: u32,
        buffer: &mut SectorBuf,
        op: DiskOp,
    ) -> KernelResult<()> {
        if disk_id == 0 || disk_id as usize > crate::config::DISK_COUNT {
            return Err(KernelError::BadParam);
        }

        let current = self.current_pid();
        let free = self.hal.disk_status(disk_id) == DeviceStatus::Free;
        let buffer_ptr = BufferPtr(buffer as *mut SectorBuf);
        let phase = if free {
            let hal_op = match op {
                DiskOp::Read => crate::hal::DiskOp::Read,
                DiskOp::Write => crate::hal::DiskOp::Write,
            };
            self.hal
                .disk_op(disk_id, sector, buffer, hal_op)
                .map_err(|_| KernelError::BadParam)?;
            DiskPhase::Issued
        } else {
            DiskPhase::Pending
        };

        {
            let mut state = self.common.lock();
            self.with_pd(&mut state, current, |pd| {
                pd.disk_req = Some(DiskRequest {
                    disk_id,
                    sector,
                    op,
                    phase,
                    buffer: buffer_ptr,
                });
                pd.membership = QueueMembership::Suspend;
            });
        }
        self.suspend.lock().push_back(current);
        self.trace_scheduler_event(Action::Wait, current, current);
        self.dispatch();
        Ok(())
    }

    /// Find the first Suspend Queue PID (in queue order) whose disk request
    /// matches `pred`, then remove it. The match is looked up under COMMON
    /// without SUSPEND also held, so this never nests SUSPEND outside
    /// COMMON — SUSPEND is taken only afterward, briefly, to remove the PID
    /// already identified, honoring the kernel's COMMON→...→SUSPEND order.
    fn find_and_remove_suspend_waiter(&self, pred: impl Fn(&DiskRequest) -> bool) -> Option<i32> {
        let order: Vec<i32> = self.suspend.lock().iter().collect();
        let target = {
            let state = self.common.lock();
            order.into_iter().find(|&pid| {
                state
                    .process_table
                    .get(pid)
                    .and_then(|pd| pd.disk_req.as_ref())
                    .is_some_and(|req| pred(req))
            })
        }?;
        self.suspend.lock().remove(target);
        Some(target)
    }

    /// Disk completion interrupt: `disk_id` just finished its in-flight
    /// transfer. Wake the requester, then — if another process is waiting
    /// `Pending` on the same disk — issue its transfer and re-queue it at
    /// the front of the Suspend Queue so it is re-examined ahead of
    /// unrelated waiters on the next completion.
    pub fn on_disk_interrupt(&self, disk_id: DiskId) {
        let current = self.current_pid();
        let completed = self.find_and_remove_suspend_waiter(|req| {
            req.disk_id == disk_id && req.phase == DiskPhase::Issued
        });

        let Some(woken) = completed else {
            self.bug(
                "Kernel::on_disk_interrupt",
                "completion with no Issued waiter on this disk",
            );
        };

        let priority = {
            let mut state = self.common.lock();
            self.with_pd(&mut state, woken, |pd| {
                pd.disk_req = None;
                pd.membership = QueueMembership::Ready;
                pd.priority
            })
        };
        self.ready.lock().insert(woken, priority);
        self.trace_scheduler_event(Action::Ready, woken, current);

        self.issue_next_pending(disk_id);
    }

    /// Find the earliest `Pending` waiter for `disk_id`, issue its transfer,
    /// and move it back to the front of the Suspend Queue (disk is now busy
    /// again on its behalf, it must not be mistaken for a fresh arrival).
    fn issue_next_pending(&self, disk_id: DiskId) {
        let next = self.find_and_remove_suspend_waiter(|req| {
            req.disk_id == disk_id && req.phase == DiskPhase::Pending
        });
        let Some(pid) = next else { return };

        let (sector, op, buffer_ptr) = {
            let state = self.common.lock();
            let req = state
                .process_table
                .get(pid)
                .and_then(|pd| pd.disk_req.as_ref())
                .expect("issue_next_pending: waiter lost its disk request");
            (req.sector, req.op, req.buffer)
        };
        let hal_op = match op {
            DiskOp::Read => crate::hal::DiskOp::Read,
            DiskOp::Write => crate::hal::DiskOp::Write,
        };
        // Safe: the waiting process's OS thread has been parked since it
        // issued this request and makes no access to the buffer until
        // woken by the completion this transfer will eventually deliver.
        let buffer = unsafe { &mut *buffer_ptr.0 };
        if self.hal.disk_op(disk_id, sector, buffer, hal_op).is_err() {
            self.bug(
                "Kernel::issue_next_pending",
                "disk reported busy right after a completion freed it",
            );
        }

        {
            let mut state = self.common.lock();
            self.with_pd(&mut state, pid, |pd| {
                if let Some(req) = pd.disk_req.as_mut() {
                    req.phase = DiskPhase::Issued;
                }
            });
        }
        self.suspend.lock().push_front(pid);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{DISK_COUNT, PAGE_WORDS, PHYS_FRAMES};
    use crate::test_support::FakeHal;
    use crate::tracer::NullTracer;

    fn new_kernel() -> Kernel<FakeHal> {
        let k = Kernel::new(Arc::new(FakeHal), Arc::new(NullTracer), PHYS_FRAMES);
        k.create("root", 0, 8).unwrap();
        k
    }

    #[test]
    fn disk_id_zero_is_rejected_before_touching_current_process() {
        let k = new_kernel();
        let mut buf = [0u32; PAGE_WORDS];
        assert_eq!(
            k.disk_transfer(0, 0, &mut buf, DiskOp::Read),
            Err(KernelError::BadParam)
        );
    }

    #[test]
    fn disk_id_past_disk_count_is_rejected() {
        let k = new_kernel();
        let mut buf = [0u32; PAGE_WORDS];
        assert_eq!(
            k.disk_transfer((DISK_COUNT + 1) as DiskId, 0, &mut buf, DiskOp::Read),
            Err(KernelError::BadParam)
        );
    }
}
