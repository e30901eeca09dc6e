//! The enumerated test-program table and the syscall client entry points use
//! to talk to the kernel, standing in for the out-of-scope test driver.

pub mod entries;
pub mod rng;
pub mod syscalls;
pub mod table;

pub use syscalls::Syscalls;
pub use table::{find, TestEntry, ENTRY_TABLE};
