//! Kernel-wide limits, mirrored from `original_source/common.h`.

/// `MAX_NUMBER_OF_USER_PROCESSES` in the original source. Slot index doubles as PID.
pub const N_MAX: usize = 15;

/// `MAX_NUMBER_OF_PROCESSE_NAME` in the original source.
pub const MAX_NAME_LEN: usize = 32;

/// Default priority assigned to the first (bootstrap) process.
pub const DEFAULT_PRIORITY: i32 = 8;

pub const PRIORITY_MIN: i32 = 0;
pub const PRIORITY_MAX: i32 = 100;

/// Number of disks exposed by the HAL, numbered 1..=DISK_COUNT.
pub const DISK_COUNT: usize = 3;

/// Sectors per disk. Not tightly constrained; large enough to hold every
/// process's 1024-page swap area addressed by virtual page number.
pub const SECTORS_PER_DISK: usize = VIRTUAL_PAGES;

/// Words per page / per disk sector.
pub const PAGE_WORDS: usize = 16;

pub const VIRTUAL_PAGES: usize = 1024;
pub const PHYS_FRAMES: usize = 64;

/// `MAX_PROCESSES <= DISKS + 1` is a structural limitation inherited from the
/// source: a process's swap disk is `pid + 1`, so only PIDs
/// `0..=DISK_COUNT-1` have a dedicated swap disk. `N_MAX` (15) exceeds
/// `DISK_COUNT + 1` here exactly as it did in the original; processes with
/// `pid >= DISK_COUNT` simply cannot safely page fault. See DESIGN.md.
