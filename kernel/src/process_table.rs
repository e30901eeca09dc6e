//! Fixed-slot Process Table, grounded on a `ResourceTable`/
//! `IdentifierAllocator` pattern (`common/resource_table.rs`,
//! `allocator/identifier_allocator.rs`) but bounded at `N_MAX` instead of
//! growable, and PID-indexed instead of hash-indexed, since slot index IS
//! the PID.
//!
//! The table is protected by the kernel's COMMON interlock at the call site,
//! not internally — `Kernel` is the only thing that ever reaches in here
//! while the right locks are already held.

use std::collections::BTreeSet;

use crate::config::N_MAX;
use crate::data::process::ProcessDescriptor;
use crate::error::KernelError;

pub struct ProcessTable<C> {
    slots: Box<[Option<ProcessDescriptor<C>>; N_MAX]>,
    free: BTreeSet<i32>,
}

impl<C> ProcessTable<C> {
    pub fn new() -> Self {
        Self {
            slots: Box::new(std::array::from_fn(|_| None)),
            free: (0..N_MAX as i32).collect(),
        }
    }

    pub fn population(&self) -> usize {
        N_MAX - self.free.len()
    }

    pub fn get(&self, pid: i32) -> Option<&ProcessDescriptor<C>> {
        self.slots.get(usize::try_from(pid).ok()?)?.as_ref()
    }

    pub fn get_mut(&mut self, pid: i32) -> Option<&mut ProcessDescriptor<C>> {
        self.slots.get_mut(usize::try_from(pid).ok()?)?.as_mut()
    }

    pub fn exists(&self, pid: i32) -> bool {
        self.get(pid).is_some()
    }

    pub fn find_by_name(&self, name: &str) -> Option<i32> {
        self.slots
            .iter()
            .flatten()
            .find(|pd| pd.name.as_str() == name)
            .map(|pd| pd.pid)
    }

    pub fn name_in_use(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    /// Allocate the lowest free slot and insert `pd`. `pd.pid` must already
    /// equal the slot that was reserved by a prior call to
    /// [`ProcessTable::reserve_pid`].
    pub fn insert(&mut self, pd: ProcessDescriptor<C>) {
        let idx = pd.pid as usize;
        assert!(
            self.slots[idx].is_none(),
            "process_table::insert: slot {idx} already occupied"
        );
        self.slots[idx] = Some(pd);
    }

    /// Reserve (but do not yet populate) the lowest free PID. Returns
    /// `TableFull` if none remain.
    pub fn reserve_pid(&mut self) -> Result<i32, KernelError> {
        let pid = *self.free.iter().next().ok_or(KernelError::TableFull)?;
        self.free.remove(&pid);
        Ok(pid)
    }

    /// Remove and return the descriptor at `pid`. Callers must have already
    /// removed every queue reference to this PID before calling this.
    pub fn remove(&mut self, pid: i32) -> Option<ProcessDescriptor<C>> {
        let slot = self.slots.get_mut(pid as usize)?;
        let pd = slot.take()?;
        self.free.insert(pid);
        Some(pd)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessDescriptor<C>> {
        self.slots.iter().flatten()
    }
}

impl<C> Default for ProcessTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pd(pid: i32, name: &str) -> ProcessDescriptor<()> {
        ProcessDescriptor::new(pid, name, 10, 0, ())
    }

    #[test]
    fn reserve_then_insert_then_remove_restores_population() {
        let mut table = ProcessTable::new();
        assert_eq!(table.population(), 0);
        let pid = table.reserve_pid().unwrap();
        table.insert(pd(pid, "a"));
        assert_eq!(table.population(), 1);
        table.remove(pid);
        assert_eq!(table.population(), 0);
    }

    #[test]
    fn table_full_after_n_max_reservations() {
        let mut table = ProcessTable::new();
        for i in 0..N_MAX {
            let pid = table.reserve_pid().unwrap();
            table.insert(pd(pid, &format!("p{i}")));
        }
        assert_eq!(table.reserve_pid(), Err(KernelError::TableFull));
    }

    #[test]
    fn duplicate_name_detected_before_insert() {
        let mut table = ProcessTable::new();
        let pid = table.reserve_pid().unwrap();
        table.insert(pd(pid, "dup"));
        assert!(table.name_in_use("dup"));
        assert!(!table.name_in_use("other"));
    }
}
