//! The enumerated table of test entry points (`test0`..`test2g`). Each is a
//! bare `fn()` run on its own process thread by `hal-sim`; it talks to the
//! kernel purely through [`Syscalls`], exactly as a user-mode program would
//! through a trap.

use kernel::config::{DISK_COUNT, N_MAX, PAGE_WORDS, VIRTUAL_PAGES};
use kernel::error::KernelError;

use crate::rng::Xorshift32;
use crate::syscalls::Syscalls;

/// Reads the clock once and terminates itself; the simplest possible
/// end-to-end run (creation, one dispatch, self-termination, halt).
pub fn test0() {
    let _ = Syscalls::get_time_of_day();
    let _ = Syscalls::terminate_process(-1);
}

/// A child used by `test1`: takes its priority from its own name's last
/// digit-ish suffix is awkward, so instead every child is identical and the
/// parent distinguishes them purely by PID/name.
fn test1_child() {
    Syscalls::sleep(0);
    let _ = Syscalls::terminate_process(-1);
}

/// Spawns five priority-10 children sharing one entry point, then polls
/// `get_pid` on the last child's name until it reports `DoesNotExist`,
/// exercising FIFO-within-priority-class dispatch among equals.
pub fn test1() {
    const COUNT: usize = 5;
    let mut last_name = String::new();
    for i in 0..COUNT {
        let name = format!("test1x{i}");
        Syscalls::create_process(&name, test1_child, 10).expect("test1: create failed");
        last_name = name;
    }
    loop {
        match Syscalls::get_process_id(&last_name) {
            Ok(_) => Syscalls::sleep(0),
            Err(KernelError::DoesNotExist) => break,
            Err(e) => panic!("test1: unexpected error polling last child: {e:?}"),
        }
    }
    let _ = Syscalls::terminate_process(-1);
}

fn priority_child() {
    Syscalls::sleep(0);
    let _ = Syscalls::terminate_process(-1);
}

/// Children at priorities {10, 11, 11, 90, 40}; expected completion order
/// is 10, 11, 11, 40, 90 with FIFO between the two priority-11 siblings.
pub fn test2a() {
    let priorities = [10, 11, 11, 90, 40];
    let mut names = Vec::new();
    for (i, priority) in priorities.iter().enumerate() {
        let name = format!("test2a_{i}");
        Syscalls::create_process(&name, priority_child, *priority).expect("test2a: create failed");
        names.push(name);
    }
    for name in &names {
        loop {
            match Syscalls::get_process_id(name) {
                Ok(_) => Syscalls::sleep(0),
                Err(KernelError::DoesNotExist) => break,
                Err(e) => panic!("test2a: unexpected error: {e:?}"),
            }
        }
    }
    let _ = Syscalls::terminate_process(-1);
}

fn sleeper_child() {
    Syscalls::sleep(10_000);
    let _ = Syscalls::terminate_process(-1);
}

/// Suspend/resume error-path coverage: success, then AlreadySuspended,
/// then success, then ResumeUnsuspended.
pub fn test2b() {
    let pid = Syscalls::create_process("test2b_child", sleeper_child, 10)
        .expect("test2b: create failed");

    Syscalls::suspend_process(pid).expect("test2b: first suspend should succeed");
    assert_eq!(
        Syscalls::suspend_process(pid),
        Err(KernelError::AlreadySuspended)
    );
    Syscalls::resume_process(pid).expect("test2b: resume should succeed");
    assert_eq!(
        Syscalls::resume_process(pid),
        Err(KernelError::ResumeUnsuspended)
    );

    let _ = Syscalls::terminate_process(pid);
    let _ = Syscalls::terminate_process(-1);
}

/// 50 write/read pairs at pseudo-random sectors across all three disks;
/// every read must return exactly what was written.
fn disk_stress_body(seed: u32) {
    let mut rng = Xorshift32::new(seed);
    for _ in 0..50 {
        let disk_id = (rng.next_below(DISK_COUNT as u32) + 1) as kernel::hal::DiskId;
        let sector = rng.next_below(kernel::config::SECTORS_PER_DISK as u32);
        let mut written = [0u32; PAGE_WORDS];
        for word in written.iter_mut() {
            *word = rng.next_u32();
        }
        let mut buffer = written;
        Syscalls::disk_write(disk_id, sector, &mut buffer).expect("disk_stress: write failed");

        let mut readback = [0u32; PAGE_WORDS];
        Syscalls::disk_read(disk_id, sector, &mut readback).expect("disk_stress: read failed");
        assert_eq!(readback, written, "disk round-trip mismatch on disk {disk_id} sector {sector}");
    }
}

fn disk_stress_child_a() {
    disk_stress_body(0xA5A5_0001);
    let _ = Syscalls::terminate_process(-1);
}

fn disk_stress_child_b() {
    disk_stress_body(0xA5A5_0002);
    let _ = Syscalls::terminate_process(-1);
}

/// Two processes hammering the disk subsystem concurrently.
pub fn test2c() {
    Syscalls::create_process("test2c_a", disk_stress_child_a, 10).expect("test2c: create a");
    Syscalls::create_process("test2c_b", disk_stress_child_b, 10).expect("test2c: create b");
    loop {
        match Syscalls::get_process_id("test2c_a") {
            Ok(_) => Syscalls::sleep(0),
            Err(KernelError::DoesNotExist) => break,
            Err(e) => panic!("test2c: unexpected error: {e:?}"),
        }
    }
    loop {
        match Syscalls::get_process_id("test2c_b") {
            Ok(_) => Syscalls::sleep(0),
            Err(KernelError::DoesNotExist) => break,
            Err(e) => panic!("test2c: unexpected error: {e:?}"),
        }
    }
    let _ = Syscalls::terminate_process(-1);
}

fn paging_sweep_child() {
    let pid = Syscalls::get_process_id("").expect("paging_sweep_child: get own pid");
    for page in 0..VIRTUAL_PAGES {
        let addr = page * PAGE_WORDS;
        Syscalls::mem_write(addr, (addr as u32).wrapping_add(pid as u32));
    }
    for page in 0..VIRTUAL_PAGES {
        let addr = page * PAGE_WORDS;
        let expected = (addr as u32).wrapping_add(pid as u32);
        assert_eq!(Syscalls::mem_read(addr), expected, "paging round-trip mismatch at {addr}");
    }
    let _ = Syscalls::terminate_process(-1);
}

/// Sweeps every virtual page (far more than `PHYS_FRAMES` distinct pages),
/// forcing second-chance replacement repeatedly, then verifies every write
/// survived across however many evictions it took.
pub fn test2d() {
    Syscalls::create_process("test2d_child", paging_sweep_child, 10).expect("test2d: create");
    loop {
        match Syscalls::get_process_id("test2d_child") {
            Ok(_) => Syscalls::sleep(0),
            Err(KernelError::DoesNotExist) => break,
            Err(e) => panic!("test2d: unexpected error: {e:?}"),
        }
    }
    let _ = Syscalls::terminate_process(-1);
}

/// `Create` with an out-of-range priority must fail with `IllegalPriority`.
pub fn test2e() {
    assert_eq!(
        Syscalls::create_process("test2e_bad", priority_child, -3),
        Err(KernelError::IllegalPriority)
    );
    let _ = Syscalls::terminate_process(-1);
}

/// A second `create` under an already-live name must fail with
/// `DuplicateName`, leaving the first process untouched.
pub fn test2f() {
    let pid = Syscalls::create_process("test2f_dup", sleeper_child, 10).expect("test2f: first create");
    assert_eq!(
        Syscalls::create_process("test2f_dup", sleeper_child, 10),
        Err(KernelError::DuplicateName)
    );
    let _ = Syscalls::terminate_process(pid);
    let _ = Syscalls::terminate_process(-1);
}

/// Creates until the table is full; the first failing create must report
/// `TableFull`, and exactly `N_MAX - 1` children (plus this parent) exist.
pub fn test2g() {
    let mut created = 0usize;
    loop {
        let name = format!("test2g_{created}");
        match Syscalls::create_process(&name, sleeper_child, 50) {
            Ok(_) => created += 1,
            Err(KernelError::TableFull) => break,
            Err(e) => panic!("test2g: unexpected error: {e:?}"),
        }
    }
    assert_eq!(created, N_MAX - 1, "test2g: expected to fill the table minus this process");
    let _ = Syscalls::terminate_process(-1);
}
