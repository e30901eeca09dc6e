//! The scheduler: process creation/lookup, sleep, priority changes,
//! suspend/resume, termination, the timer-interrupt handler, and dispatch.
//!
//! Grounded on a `process::manager::ProcessManager` (ready-queue ownership,
//! `pop_one`/`push_one`) and `process::process` (PID allocation),
//! generalized from a single ready queue to the full Ready/Timer/Suspend
//! triad, and from `lazy_static!` globals to methods on the owned `Kernel`
//! struct.

use crate::config::{MAX_NAME_LEN, PRIORITY_MAX, PRIORITY_MIN};
use crate::data::process::{ProcessDescriptor, QueueMembership};
use crate::error::{KernelError, KernelResult};
use crate::hal::{Hal, Mode, SwitchMode};
use crate::kernel::Kernel;
use crate::tracer::Action;

fn validate_name(name: &str) -> KernelResult<()> {
    if name.len() > MAX_NAME_LEN {
        Err(KernelError::NameTooLong)
    } else {
        Ok(())
    }
}

fn validate_priority(priority: i32) -> KernelResult<()> {
    if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
        Err(KernelError::IllegalPriority)
    } else {
        Ok(())
    }
}

impl<H: Hal> Kernel<H> {
    /// Validate name/priority/uniqueness, allocate the lowest free slot,
    /// build a user-mode context, and insert into the Ready Queue. The
    /// very first process created also becomes Running directly, without
    /// passing through the Ready Queue.
    pub fn create(&self, name: &str, entry: usize, priority: i32) -> KernelResult<i32> {
        validate_name(name)?;
        validate_priority(priority)?;

        let mut state = self.common.lock();
        if state.process_table.name_in_use(name) {
            return Err(KernelError::DuplicateName);
        }
        let pid = state.process_table.reserve_pid()?;
        let context = self.hal.make_context(entry, Mode::User);
        let pd = ProcessDescriptor::new(pid, name, priority, entry, context);
        let is_bootstrap = state.current_pid < 0 && state.process_table.population() == 0;
        state.process_table.insert(pd);

        if is_bootstrap {
            state.current_pid = pid;
            drop(state);
            self.trace_scheduler_event(Action::Create, pid, pid);
        } else {
            self.with_pd(&mut state, pid, |pd| pd.membership = QueueMembership::Ready);
            let current = state.current_pid;
            self.ready.lock().insert(pid, priority);
            drop(state);
            self.trace_scheduler_event(Action::Create, pid, current);
            self.trace_scheduler_event(Action::Ready, pid, current);
        }
        Ok(pid)
    }

    /// `""`, or the current process's own name, resolves to the current
    /// PID without a table scan; otherwise a linear lookup by name.
    pub fn get_pid(&self, name: &str) -> KernelResult<i32> {
        let state = self.common.lock();
        let current = state.current_pid;
        if name.is_empty() {
            return Ok(current);
        }
        if let Some(cur_pd) = state.process_table.get(current) {
            if cur_pd.name.as_str() == name {
                return Ok(current);
            }
        }
        state
            .process_table
            .find_by_name(name)
            .ok_or(KernelError::DoesNotExist)
    }

    /// Negative: no-op. Zero: re-enter Ready at current priority and
    /// dispatch. Positive: move to the Timer Queue and dispatch.
    pub fn sleep(&self, ms: i32) {
        if ms < 0 {
            return;
        }
        let current = self.current_pid();
        if ms == 0 {
            let priority = {
                let state = self.common.lock();
                state
                    .process_table
                    .get(current)
                    .expect("sleep: current process vanished")
                    .priority
            };
            self.ready.lock().insert(current, priority);
            {
                let mut state = self.common.lock();
                self.with_pd(&mut state, current, |pd| {
                    pd.membership = QueueMembership::Ready
                });
            }
            self.trace_scheduler_event(Action::Ready, current, current);
            self.dispatch();
            return;
        }

        let wake_time = self.hal.now().wrapping_add(ms as u32);
        {
            let mut state = self.common.lock();
            self.with_pd(&mut state, current, |pd| {
                pd.wake_time = wake_time;
                pd.membership = QueueMembership::Timer;
            });
        }
        self.ready.lock().remove(current);
        {
            let mut timer = self.timer.lock();
            timer.insert(current, wake_time);
            if timer.peek_head_wake_time() == Some(wake_time) {
                let now = self.hal.now();
                self.hal.arm_timer(wake_time.saturating_sub(now));
            }
        }
        self.trace_scheduler_event(Action::Wait, current, current);
        self.dispatch();
    }

    /// `pid == -1` means the current process. Mutates priority then
    /// re-sorts the Ready Queue stably.
    pub fn change_priority(&self, pid: i32, new_priority: i32) -> KernelResult<()> {
        validate_priority(new_priority)?;
        let current = self.current_pid();
        let target = if pid == -1 { current } else { pid };

        let mut state = self.common.lock();
        if !state.process_table.exists(target) {
            return Err(KernelError::DoesNotExist);
        }
        self.with_pd(&mut state, target, |pd| pd.priority = new_priority);
        drop(state);
        self.ready.lock().reorder(target, new_priority);
        Ok(())
    }

    /// A process cannot suspend itself or be suspended twice. A target in
    /// the Ready Queue moves to the Suspend Queue immediately; a target
    /// sleeping in the Timer Queue is left in place but flagged, so its
    /// eventual wake routes it to Suspend instead of Ready.
    pub fn suspend(&self, pid: i32) -> KernelResult<()> {
        let current = self.current_pid();
        if pid == -1 || pid == current {
            return Err(KernelError::SuspendSelf);
        }

        let mut state = self.common.lock();
        if !state.process_table.exists(pid) {
            return Err(KernelError::DoesNotExist);
        }
        let (already_suspended, membership) = {
            let pd = state.process_table.get(pid).unwrap();
            (pd.suspended, pd.membership)
        };
        if already_suspended {
            return Err(KernelError::AlreadySuspended);
        }

        self.with_pd(&mut state, pid, |pd| pd.suspended = true);
        match membership {
            QueueMembership::Ready => {
                self.ready.lock().remove(pid);
                self.suspend.lock().push_back(pid);
                self.with_pd(&mut state, pid, |pd| {
                    pd.membership = QueueMembership::Suspend
                });
            }
            QueueMembership::Timer => {
                self.with_pd(&mut state, pid, |pd| pd.suspend_on_wake = true);
            }
            QueueMembership::Suspend => {
                // already parked (e.g. blocked on disk); the administrative flag suffices.
            }
            QueueMembership::None => self.bug("Scheduler::suspend", "target has no queue membership"),
        }
        drop(state);
        self.trace_scheduler_event(Action::Suspend, pid, current);
        Ok(())
    }

    /// Symmetric to `suspend`. A target parked with an outstanding disk
    /// request stays in the Suspend Queue until its completion interrupt;
    /// only the administrative flag clears immediately.
    pub fn resume(&self, pid: i32) -> KernelResult<()> {
        let current = self.current_pid();
        if pid == -1 || pid == current {
            return Err(KernelError::ResumeSelf);
        }

        let mut state = self.common.lock();
        if !state.process_table.exists(pid) {
            return Err(KernelError::DoesNotExist);
        }
        let (suspended, membership, priority, has_disk_req) = {
            let pd = state.process_table.get(pid).unwrap();
            (
                pd.suspended,
                pd.membership,
                pd.priority,
                pd.disk_req.is_some(),
            )
        };
        if !suspended {
            return Err(KernelError::ResumeUnsuspended);
        }

        self.with_pd(&mut state, pid, |pd| pd.suspended = false);
        match membership {
            QueueMembership::Timer => {
                self.with_pd(&mut state, pid, |pd| pd.suspend_on_wake = false);
            }
            QueueMembership::Suspend if !has_disk_req => {
                self.suspend.lock().remove(pid);
                self.ready.lock().insert(pid, priority);
                self.with_pd(&mut state, pid, |pd| {
                    pd.membership = QueueMembership::Ready
                });
                drop(state);
                self.trace_scheduler_event(Action::Ready, pid, current);
                self.trace_scheduler_event(Action::Resume, pid, current);
                return Ok(());
            }
            QueueMembership::Suspend => {
                // blocked on disk; stays put until the completion interrupt fires.
            }
            QueueMembership::None | QueueMembership::Ready => {
                self.bug("Scheduler::resume", "suspended process in unexpected queue")
            }
        }
        drop(state);
        self.trace_scheduler_event(Action::Resume, pid, current);
        Ok(())
    }

    /// `pid == -2` halts the whole simulation outright. `pid == -1` or the
    /// caller's own PID terminates the caller (halting instead, if the
    /// caller is the root process); this path never returns. Otherwise the
    /// named process is removed from whichever queue holds it.
    pub fn terminate(&self, pid: i32) -> KernelResult<()> {
        if pid == -2 {
            self.hal.halt();
        }

        let current = self.current_pid();
        let target = if pid == -1 { current } else { pid };

        if target == current {
            if target == 0 {
                self.hal.halt();
            }
            {
                let mut state = self.common.lock();
                state.process_table.remove(target);
                state.current_pid = -1;
            }
            self.trace_scheduler_event(Action::Done, target, -1);
            self.dispatch_kill();
            unreachable!("dispatch_kill never returns to its caller");
        }

        let mut state = self.common.lock();
        if !state.process_table.exists(target) {
            return Err(KernelError::DoesNotExist);
        }
        let membership = state.process_table.get(target).unwrap().membership;
        match membership {
            QueueMembership::Ready => {
                self.ready.lock().remove(target);
            }
            QueueMembership::Timer => {
                let mut timer = self.timer.lock();
                let was_head = timer.peek_head_wake_time()
                    == state.process_table.get(target).map(|pd| pd.wake_time);
                timer.remove(target);
                if was_head {
                    match timer.peek_head_wake_time() {
                        Some(next_wake) => {
                            let now = self.hal.now();
                            self.hal.arm_timer(next_wake.saturating_sub(now));
                        }
                        None => self.hal.disarm_timer(),
                    }
                }
            }
            QueueMembership::Suspend => {
                self.suspend.lock().remove(target);
            }
            QueueMembership::None => {
                self.bug("Scheduler::terminate", "target has no queue membership")
            }
        }
        state.process_table.remove(target);
        drop(state);
        self.trace_scheduler_event(Action::Done, target, current);
        Ok(())
    }

    /// Drain every due sleeper, route each to Ready or Suspend, and re-arm
    /// for the new Timer Queue head (or disarm if it's now empty).
    pub fn on_timer_interrupt(&self) {
        let now = self.hal.now();
        let due = self.timer.lock().drain_due(now);

        for pid in due {
            let mut state = self.common.lock();
            let (suspend_on_wake, priority) = {
                let pd = state.process_table.get(pid).unwrap();
                (pd.suspend_on_wake, pd.priority)
            };
            if suspend_on_wake {
                self.with_pd(&mut state, pid, |pd| {
                    pd.membership = QueueMembership::Suspend;
                    pd.suspend_on_wake = false;
                });
                drop(state);
                self.suspend.lock().push_back(pid);
                self.trace_scheduler_event(Action::Suspend, pid, self.current_pid());
            } else {
                self.with_pd(&mut state, pid, |pd| {
                    pd.membership = QueueMembership::Ready
                });
                drop(state);
                self.ready.lock().insert(pid, priority);
                self.trace_scheduler_event(Action::Ready, pid, self.current_pid());
            }
        }

        let timer = self.timer.lock();
        match timer.peek_head_wake_time() {
            Some(wake) => {
                let now = self.hal.now();
                self.hal.arm_timer(wake.saturating_sub(now));
            }
            None => self.hal.disarm_timer(),
        }
    }

    /// Pop the Ready Queue head and switch to it, preserving the caller's
    /// context. The only place (besides `bootstrap`) the Running slot
    /// changes.
    pub fn dispatch(&self) {
        let next = self.pop_ready_busy_idle();
        let context = {
            let mut state = self.common.lock();
            state.current_pid = next;
            self.with_pd(&mut state, next, |pd| pd.membership = QueueMembership::None);
            state.process_table.get(next).unwrap().context.clone()
        };
        self.trace_scheduler_event(Action::Dispatch, next, next);
        self.hal.switch_context(SwitchMode::Save, &context);
    }

    /// Like `dispatch`, but for a process whose own context is being
    /// discarded (self-termination).
    fn dispatch_kill(&self) -> ! {
        let next = self.pop_ready_busy_idle();
        let context = {
            let mut state = self.common.lock();
            state.current_pid = next;
            self.with_pd(&mut state, next, |pd| pd.membership = QueueMembership::None);
            state.process_table.get(next).unwrap().context.clone()
        };
        self.trace_scheduler_event(Action::Dispatch, next, next);
        self.hal.switch_context(SwitchMode::Kill, &context);
        self.bug("Scheduler::dispatch_kill", "switch_context(Kill, _) returned")
    }

    fn pop_ready_busy_idle(&self) -> i32 {
        loop {
            if let Some(pid) = self.ready.lock().pop_front() {
                return pid;
            }
            std::thread::yield_now();
        }
    }

    /// Transfer control to the first process ever created (always PID 0),
    /// separately from the generic dispatch pop-ready-head path.
    pub fn bootstrap(&self) {
        let context = {
            let state = self.common.lock();
            state
                .process_table
                .get(0)
                .expect("bootstrap: no process created yet")
                .context
                .clone()
        };
        self.hal.switch_context(SwitchMode::Save, &context);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{PHYS_FRAMES, PRIORITY_MAX};
    use crate::test_support::FakeHal;
    use crate::tracer::NullTracer;

    fn new_kernel() -> Kernel<FakeHal> {
        Kernel::new(Arc::new(FakeHal), Arc::new(NullTracer), PHYS_FRAMES)
    }

    #[test]
    fn first_created_process_becomes_current_without_entering_ready_queue() {
        let k = new_kernel();
        let pid = k.create("root", 0, 8).unwrap();
        assert_eq!(pid, 0);
        assert_eq!(k.current_pid(), 0);
        assert!(k.ready.lock().pop_front().is_none());
    }

    #[test]
    fn second_created_process_lands_in_ready_queue() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        let pid = k.create("child", 1, 5).unwrap();
        assert_eq!(k.ready.lock().pop_front(), Some(pid));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        assert_eq!(k.create("root", 1, 8), Err(KernelError::DuplicateName));
    }

    #[test]
    fn illegal_priority_is_rejected_before_any_allocation() {
        let k = new_kernel();
        assert_eq!(
            k.create("root", 0, PRIORITY_MAX + 1),
            Err(KernelError::IllegalPriority)
        );
        assert_eq!(k.common.lock().process_table.population(), 0);
    }

    #[test]
    fn name_too_long_is_rejected() {
        let k = new_kernel();
        let long = "x".repeat(crate::config::MAX_NAME_LEN + 1);
        assert_eq!(k.create(&long, 0, 8), Err(KernelError::NameTooLong));
    }

    #[test]
    fn get_pid_resolves_empty_string_to_current_without_scanning() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        assert_eq!(k.get_pid(""), Ok(0));
        assert_eq!(k.get_pid("root"), Ok(0));
        assert_eq!(k.get_pid("nobody"), Err(KernelError::DoesNotExist));
    }

    #[test]
    fn change_priority_validates_then_reorders_ready_queue() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        let child = k.create("child", 1, 5).unwrap();
        assert_eq!(
            k.change_priority(child, PRIORITY_MAX + 1),
            Err(KernelError::IllegalPriority)
        );
        k.change_priority(child, 50).unwrap();
        assert_eq!(k.common.lock().process_table.get(child).unwrap().priority, 50);
    }

    #[test]
    fn change_priority_on_unknown_pid_fails() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        assert_eq!(k.change_priority(99, 10), Err(KernelError::DoesNotExist));
    }

    #[test]
    fn suspend_rejects_self_and_unknown_targets() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        assert_eq!(k.suspend(-1), Err(KernelError::SuspendSelf));
        assert_eq!(k.suspend(0), Err(KernelError::SuspendSelf));
        assert_eq!(k.suspend(7), Err(KernelError::DoesNotExist));
    }

    #[test]
    fn suspend_then_double_suspend_fails() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        let child = k.create("child", 1, 5).unwrap();
        k.suspend(child).unwrap();
        assert_eq!(k.suspend(child), Err(KernelError::AlreadySuspended));
    }

    #[test]
    fn resume_rejects_self_unsuspended_and_unknown_targets() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        let child = k.create("child", 1, 5).unwrap();
        assert_eq!(k.resume(-1), Err(KernelError::ResumeSelf));
        assert_eq!(k.resume(child), Err(KernelError::ResumeUnsuspended));
        assert_eq!(k.resume(7), Err(KernelError::DoesNotExist));
    }

    #[test]
    fn suspend_then_resume_returns_target_to_ready_queue() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        let child = k.create("child", 1, 5).unwrap();
        k.suspend(child).unwrap();
        assert!(!k.ready.lock().contains(child));
        k.resume(child).unwrap();
        assert_eq!(k.ready.lock().pop_front(), Some(child));
    }

    #[test]
    fn terminate_other_process_frees_its_slot() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        let child = k.create("child", 1, 5).unwrap();
        assert_eq!(k.common.lock().process_table.population(), 2);
        k.terminate(child).unwrap();
        assert_eq!(k.common.lock().process_table.population(), 1);
        assert!(!k.ready.lock().contains(child));
    }

    #[test]
    fn terminate_unknown_pid_fails() {
        let k = new_kernel();
        k.create("root", 0, 8).unwrap();
        assert_eq!(k.terminate(42), Err(KernelError::DoesNotExist));
    }
}
