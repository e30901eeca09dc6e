//! Shadow Frame Directory: the reverse map from physical frame
//! to owning process/page, used by the second-chance replacement policy to
//! find a victim's owner without scanning every process's page table.
//!
//! Grounded on the "cyclic references map to arena+index" design note:
//! rather than a raw pointer back into a page table entry, we store
//! `(pid, page_number)` and re-derive the entry through the process table
//! on eviction.

use crate::config::PHYS_FRAMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOwner {
    pub pid: i32,
    pub page: u32,
}

#[derive(Debug)]
pub struct ShadowDirectory {
    owners: Box<[Option<FrameOwner>; PHYS_FRAMES]>,
}

impl ShadowDirectory {
    pub fn new() -> Self {
        Self {
            owners: Box::new([None; PHYS_FRAMES]),
        }
    }

    pub fn owner(&self, frame: u16) -> Option<FrameOwner> {
        self.owners[frame as usize]
    }

    pub fn set(&mut self, frame: u16, owner: FrameOwner) {
        self.owners[frame as usize] = Some(owner);
    }

    pub fn clear(&mut self, frame: u16) {
        self.owners[frame as usize] = None;
    }
}

impl Default for ShadowDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_directory_has_no_owners() {
        let dir = ShadowDirectory::new();
        assert_eq!(dir.owner(0), None);
        assert_eq!(dir.owner(PHYS_FRAMES as u16 - 1), None);
    }

    #[test]
    fn set_then_clear_round_trips() {
        let mut dir = ShadowDirectory::new();
        let owner = FrameOwner { pid: 4, page: 12 };
        dir.set(2, owner);
        assert_eq!(dir.owner(2), Some(owner));
        dir.clear(2);
        assert_eq!(dir.owner(2), None);
    }

    #[test]
    fn reassigning_a_frame_overwrites_its_owner() {
        let mut dir = ShadowDirectory::new();
        dir.set(1, FrameOwner { pid: 1, page: 0 });
        dir.set(1, FrameOwner { pid: 2, page: 9 });
        assert_eq!(dir.owner(1), Some(FrameOwner { pid: 2, page: 9 }));
    }
}
