//! Thin client-side wrapper a user-mode entry point uses to issue traps.
//! Fetches its kernel handle from `hal_sim::current_kernel` rather than
//! receiving it as a parameter, since an entry point is a bare `fn()`.

use hal_sim::{current_kernel, EntryFn, HalSim};
use kernel::error::KernelResult;
use kernel::hal::{DiskId, SectorBuf};
use kernel::trap::{SyscallArgs, SyscallResult};
use kernel::Kernel;

pub struct Syscalls;

impl Syscalls {
    fn kernel() -> std::sync::Arc<Kernel<HalSim>> {
        current_kernel()
    }

    pub fn get_time_of_day() -> u32 {
        match Self::kernel().dispatch_syscall(SyscallArgs::GetTimeOfDay) {
            Ok(SyscallResult::Time(t)) => t,
            other => unreachable!("GetTimeOfDay returned {other:?}"),
        }
    }

    pub fn sleep(ms: i32) {
        let _ = Self::kernel().dispatch_syscall(SyscallArgs::Sleep { ms });
    }

    pub fn create_process(name: &str, entry: EntryFn, priority: i32) -> KernelResult<i32> {
        match Self::kernel().dispatch_syscall(SyscallArgs::CreateProcess {
            name,
            entry: hal_sim::entry_addr(entry),
            priority,
        })? {
            SyscallResult::Pid(pid) => Ok(pid),
            other => unreachable!("CreateProcess returned {other:?}"),
        }
    }

    pub fn get_process_id(name: &str) -> KernelResult<i32> {
        match Self::kernel().dispatch_syscall(SyscallArgs::GetProcessId { name })? {
            SyscallResult::Pid(pid) => Ok(pid),
            other => unreachable!("GetProcessId returned {other:?}"),
        }
    }

    pub fn terminate_process(pid: i32) -> KernelResult<()> {
        Self::kernel()
            .dispatch_syscall(SyscallArgs::TerminateProcess { pid })
            .map(|_| ())
    }

    pub fn suspend_process(pid: i32) -> KernelResult<()> {
        Self::kernel()
            .dispatch_syscall(SyscallArgs::SuspendProcess { pid })
            .map(|_| ())
    }

    pub fn resume_process(pid: i32) -> KernelResult<()> {
        Self::kernel()
            .dispatch_syscall(SyscallArgs::ResumeProcess { pid })
            .map(|_| ())
    }

    pub fn change_priority(pid: i32, new_priority: i32) -> KernelResult<()> {
        Self::kernel()
            .dispatch_syscall(SyscallArgs::ChangePriority { pid, new_priority })
            .map(|_| ())
    }

    pub fn disk_read(disk_id: DiskId, sector: u32, buffer: &mut SectorBuf) -> KernelResult<()> {
        Self::kernel()
            .dispatch_syscall(SyscallArgs::DiskRead { disk_id, sector, buffer })
            .map(|_| ())
    }

    pub fn disk_write(disk_id: DiskId, sector: u32, buffer: &mut SectorBuf) -> KernelResult<()> {
        Self::kernel()
            .dispatch_syscall(SyscallArgs::DiskWrite { disk_id, sector, buffer })
            .map(|_| ())
    }

    pub fn mem_read(addr: usize) -> u32 {
        Self::kernel().mem_access(addr, None).expect("mem_read faulted")
    }

    pub fn mem_write(addr: usize, value: u32) {
        Self::kernel()
            .mem_access(addr, Some(value))
            .expect("mem_write faulted");
    }
}
