//! Trap dispatcher: decodes a system-call record and routes it to the
//! Scheduler, Disk I/O, or Paging entry point. Performs no scheduling
//! decisions itself, grounded on a `trap::syscall` module's opcode-switch
//! shape but generalized from a fixed RISC-V `scause` switch to the
//! simulator's opcode table.

use crate::config::PAGE_WORDS;
use crate::data::process::DiskOp;
use crate::error::{KernelError, KernelResult};
use crate::hal::{DiskId, Hal, SectorBuf};
use crate::kernel::Kernel;

/// System-call opcode. `MEM_READ`/`MEM_WRITE` are handled by
/// the simulator directly and never reach this dispatcher as a trap record,
/// so they have no variant here — see [`Kernel::mem_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Syscall {
    GetTimeOfDay = 1,
    Sleep = 2,
    CreateProcess = 3,
    GetProcessId = 4,
    TerminateProcess = 5,
    SuspendProcess = 6,
    ResumeProcess = 7,
    ChangePriority = 8,
    DiskRead = 9,
    DiskWrite = 10,
}

impl TryFrom<i32> for Syscall {
    type Error = KernelError;

    fn try_from(opcode: i32) -> Result<Self, Self::Error> {
        match opcode {
            1 => Ok(Syscall::GetTimeOfDay),
            2 => Ok(Syscall::Sleep),
            3 => Ok(Syscall::CreateProcess),
            4 => Ok(Syscall::GetProcessId),
            5 => Ok(Syscall::TerminateProcess),
            6 => Ok(Syscall::SuspendProcess),
            7 => Ok(Syscall::ResumeProcess),
            8 => Ok(Syscall::ChangePriority),
            9 => Ok(Syscall::DiskRead),
            10 => Ok(Syscall::DiskWrite),
            _ => Err(KernelError::BadParam),
        }
    }
}

/// Decoded arguments a caller hands to [`Kernel::dispatch_syscall`]. Each
/// variant corresponds to one row of the simulator's opcode table; argument
/// count/direction validation happens by construction (callers can't build
/// a `CreateProcess` variant missing its priority).
#[derive(Debug, Clone)]
pub enum SyscallArgs<'a> {
    GetTimeOfDay,
    Sleep { ms: i32 },
    CreateProcess { name: &'a str, entry: usize, priority: i32 },
    GetProcessId { name: &'a str },
    TerminateProcess { pid: i32 },
    SuspendProcess { pid: i32 },
    ResumeProcess { pid: i32 },
    ChangePriority { pid: i32, new_priority: i32 },
    DiskRead { disk_id: DiskId, sector: u32, buffer: &'a mut SectorBuf },
    DiskWrite { disk_id: DiskId, sector: u32, buffer: &'a mut SectorBuf },
}

/// What a syscall hands back, distinct per opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallResult {
    Time(u32),
    Pid(i32),
    Unit,
}

impl<H: Hal> Kernel<H> {
    /// Route a decoded trap to its subsystem entry point. This is the sole
    /// path user-mode code has into the kernel besides interrupts.
    pub fn dispatch_syscall(&self, args: SyscallArgs<'_>) -> KernelResult<SyscallResult> {
        match args {
            SyscallArgs::GetTimeOfDay => Ok(SyscallResult::Time(self.hal.now())),
            SyscallArgs::Sleep { ms } => {
                self.sleep(ms);
                Ok(SyscallResult::Unit)
            }
            SyscallArgs::CreateProcess { name, entry, priority } => {
                self.create(name, entry, priority).map(SyscallResult::Pid)
            }
            SyscallArgs::GetProcessId { name } => {
                self.get_pid(name).map(SyscallResult::Pid)
            }
            SyscallArgs::TerminateProcess { pid } => {
                self.terminate(pid)?;
                Ok(SyscallResult::Unit)
            }
            SyscallArgs::SuspendProcess { pid } => {
                self.suspend(pid)?;
                Ok(SyscallResult::Unit)
            }
            SyscallArgs::ResumeProcess { pid } => {
                self.resume(pid)?;
                Ok(SyscallResult::Unit)
            }
            SyscallArgs::ChangePriority { pid, new_priority } => {
                self.change_priority(pid, new_priority)?;
                Ok(SyscallResult::Unit)
            }
            SyscallArgs::DiskRead { disk_id, sector, buffer } => {
                self.disk_transfer(disk_id, sector, buffer, DiskOp::Read)?;
                Ok(SyscallResult::Unit)
            }
            SyscallArgs::DiskWrite { disk_id, sector, buffer } => {
                self.disk_transfer(disk_id, sector, buffer, DiskOp::Write)?;
                Ok(SyscallResult::Unit)
            }
        }
    }

    /// Memory-mapped access, handled directly by the simulator's paging
    /// unit rather than as a trap record. Resolves any page fault(s) first,
    /// including the straddling-word repeat when an access's last word
    /// spills into the next virtual page.
    pub fn mem_access(&self, addr: usize, write: Option<u32>) -> KernelResult<u32> {
        let page = (addr / PAGE_WORDS) as u32;
        let offset = addr % PAGE_WORDS;

        self.resolve_page_fault(page)?;
        if offset == PAGE_WORDS - 1 {
            self.resolve_page_fault(page + 1)?;
        }

        let current = self.current_pid();
        let frame = {
            let state = self.common.lock();
            state
                .process_table
                .get(current)
                .unwrap()
                .page_table
                .as_ref()
                .unwrap()
                .entry(page)
                .frame()
        };
        let phys = frame as usize * PAGE_WORDS + offset;

        match write {
            Some(value) => {
                self.hal.mem_write(phys, value);
                let mut state = self.common.lock();
                self.with_pd(&mut state, current, |pd| {
                    pd.page_table.as_mut().unwrap().entry_mut(page).set_modified();
                });
                Ok(value)
            }
            None => Ok(self.hal.mem_read(phys)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::PHYS_FRAMES;
    use crate::test_support::FakeHal;
    use crate::tracer::NullTracer;

    #[test]
    fn opcode_round_trips_through_try_from() {
        assert_eq!(Syscall::try_from(1), Ok(Syscall::GetTimeOfDay));
        assert_eq!(Syscall::try_from(10), Ok(Syscall::DiskWrite));
        assert_eq!(Syscall::try_from(0), Err(KernelError::BadParam));
        assert_eq!(Syscall::try_from(11), Err(KernelError::BadParam));
    }

    #[test]
    fn dispatch_get_time_of_day_reads_the_hal_clock() {
        let k = Kernel::new(Arc::new(FakeHal), Arc::new(NullTracer), PHYS_FRAMES);
        k.create("root", 0, 8).unwrap();
        let result = k.dispatch_syscall(SyscallArgs::GetTimeOfDay).unwrap();
        assert_eq!(result, SyscallResult::Time(0));
    }

    #[test]
    fn dispatch_get_process_id_routes_to_scheduler() {
        let k = Kernel::new(Arc::new(FakeHal), Arc::new(NullTracer), PHYS_FRAMES);
        k.create("root", 0, 8).unwrap();
        let result = k
            .dispatch_syscall(SyscallArgs::GetProcessId { name: "" })
            .unwrap();
        assert_eq!(result, SyscallResult::Pid(0));
    }
}
