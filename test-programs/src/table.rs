//! Maps a command-line test name to its entry point and default verbosity
//! triple `(other, scheduler, memory)`, mirroring the table the original
//! test driver selects from by name.

use hal_sim::EntryFn;
use kernel::tracer::Verbosity;

use crate::entries;

#[derive(Clone, Copy)]
pub struct TestEntry {
    pub name: &'static str,
    pub entry: EntryFn,
    pub other: Verbosity,
    pub scheduler: Verbosity,
    pub memory: Verbosity,
}

macro_rules! entry {
    ($name:literal, $f:path, $other:ident, $sched:ident, $mem:ident) => {
        TestEntry {
            name: $name,
            entry: $f,
            other: Verbosity::$other,
            scheduler: Verbosity::$sched,
            memory: Verbosity::$mem,
        }
    };
}

pub const ENTRY_TABLE: &[TestEntry] = &[
    entry!("test0", entries::test0, Limited, Full, None),
    entry!("test1", entries::test1, Limited, Full, None),
    entry!("test2a", entries::test2a, Limited, Full, None),
    entry!("test2b", entries::test2b, Limited, Full, None),
    entry!("test2c", entries::test2c, Limited, Limited, None),
    entry!("test2d", entries::test2d, Limited, Limited, Full),
    entry!("test2e", entries::test2e, Limited, Full, None),
    entry!("test2f", entries::test2f, Limited, Full, None),
    entry!("test2g", entries::test2g, Limited, Limited, None),
];

pub fn find(name: &str) -> Option<&'static TestEntry> {
    ENTRY_TABLE.iter().find(|e| e.name == name)
}
