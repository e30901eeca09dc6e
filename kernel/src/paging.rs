//! Demand-paged virtual memory: fault resolution, frame allocation, and
//! second-chance (clock) replacement with swap-out via the disk subsystem.
//!
//! Grounded on an `mm/memory.rs` frame-allocation flow and
//! `original_source/storage_mgmt.c`'s "find empty frame or run replacement"
//! loop, adapted to the Shadow Frame Directory's reverse mapping instead of
//! a per-frame owner pointer.

use crate::config::{PAGE_WORDS, PHYS_FRAMES, VIRTUAL_PAGES};
use crate::data::page_table::PageTable;
use crate::data::process::DiskOp;
use crate::data::shadow::FrameOwner;
use crate::error::{KernelError, KernelResult};
use crate::hal::{DiskId, Hal, SectorBuf};
use crate::kernel::Kernel;
use crate::tracer::Action;

/// A process's dedicated swap disk is `pid + 1`; valid only for
/// `pid < DISK_COUNT`, a structural limit carried over unchanged from the
/// original (see `config.rs`).
fn swap_disk_for(pid: i32) -> KernelResult<DiskId> {
    let disk = pid + 1;
    if disk < 1 || disk as usize > crate::config::DISK_COUNT {
        return Err(KernelError::BadParam);
    }
    Ok(disk as DiskId)
}

impl<H: Hal> Kernel<H> {
    /// Resolve a page fault on `page` for the current process, blocking on
    /// disk I/O as needed. Returns once the page is resident.
    pub fn resolve_page_fault(&self, page: u32) -> KernelResult<()> {
        if page as usize >= VIRTUAL_PAGES {
            self.bug(
                "Kernel::resolve_page_fault",
                "virtual page number out of range",
            );
        }
        let current = self.current_pid();

        let needs_table = {
            let state = self.common.lock();
            state
                .process_table
                .get(current)
                .expect("resolve_page_fault: current process vanished")
                .page_table
                .is_none()
        };
        if needs_table {
            let mut state = self.common.lock();
            self.with_pd(&mut state, current, |pd| {
                pd.page_table = Some(PageTable::new());
            });
        }

        let already_valid = {
            let state = self.common.lock();
            state
                .process_table
                .get(current)
                .unwrap()
                .page_table
                .as_ref()
                .unwrap()
                .entry(page)
                .is_valid()
        };
        if already_valid {
            return Ok(());
        }

        let was_reserved = {
            let state = self.common.lock();
            state
                .process_table
                .get(current)
                .unwrap()
                .page_table
                .as_ref()
                .unwrap()
                .entry(page)
                .is_reserved()
        };

        let frame = self.acquire_frame(current, page)?;

        let base = frame as usize * PAGE_WORDS;
        if was_reserved {
            let disk = swap_disk_for(current)?;
            let mut buf: SectorBuf = [0; PAGE_WORDS];
            self.disk_transfer(disk, page, &mut buf, DiskOp::Read)?;
            for (i, word) in buf.iter().enumerate() {
                self.hal.mem_write(base + i, *word);
            }
        } else {
            // Frames are recycled by eviction, so a fresh page must be
            // zero-filled rather than exposing its previous owner's data.
            for i in 0..PAGE_WORDS {
                self.hal.mem_write(base + i, 0);
            }
        }

        let mut state = self.common.lock();
        self.with_pd(&mut state, current, |pd| {
            let pt = pd.page_table.as_mut().unwrap();
            pt.entry_mut(page).set_frame_valid(frame);
            pt.entry_mut(page).set_referenced();
        });
        state.shadow.set(
            frame,
            FrameOwner {
                pid: current,
                page,
            },
        );
        drop(state);
        self.trace_memory_event(
            Action::Read,
            current,
            current,
            &format!("page {page} resident in frame {frame}"),
        );
        Ok(())
    }

    /// Obtain a free frame, running second-chance replacement if the pool is
    /// exhausted. Returns the allocated frame number.
    fn acquire_frame(&self, faulting_pid: i32, faulting_page: u32) -> KernelResult<u16> {
        loop {
            let popped = {
                let mut state = self.common.lock();
                state.frame_pool.pop()
            };
            if let Some(frame) = popped {
                return Ok(frame);
            }
            self.run_second_chance_sweep(faulting_pid, faulting_page)?;
        }
    }

    /// One pass of the clock hand: advance by exactly one frame per
    /// examination, clearing REFERENCED on a second-chance survivor and
    /// evicting the first frame found already clear. Swaps the victim out if
    /// its entry is MODIFIED.
    fn run_second_chance_sweep(&self, faulting_pid: i32, faulting_page: u32) -> KernelResult<()> {
        loop {
            let (hand, owner) = {
                let mut state = self.common.lock();
                let hand = state.clock_hand;
                let owner = state.shadow.owner(hand as u16);
                state.clock_hand = (hand + 1) % PHYS_FRAMES;
                (hand, owner)
            };

            let Some(owner) = owner else {
                // Unowned slot in the shadow directory means it's already in
                // the free pool; the outer loop's `pop` will find it.
                return Ok(());
            };

            let referenced = {
                let state = self.common.lock();
                state
                    .process_table
                    .get(owner.pid)
                    .and_then(|pd| pd.page_table.as_ref())
                    .map(|pt| pt.entry(owner.page).is_referenced())
                    .unwrap_or(false)
            };

            if referenced {
                let mut state = self.common.lock();
                if let Some(pd) = state.process_table.get_mut(owner.pid) {
                    if let Some(pt) = pd.page_table.as_mut() {
                        pt.entry_mut(owner.page).clear_referenced();
                    }
                }
                continue;
            }

            self.evict_frame(hand as u16, owner, faulting_pid, faulting_page)?;
            return Ok(());
        }
    }

    fn evict_frame(
        &self,
        frame: u16,
        owner: FrameOwner,
        faulting_pid: i32,
        faulting_page: u32,
    ) -> KernelResult<()> {
        let modified = {
            let state = self.common.lock();
            state
                .process_table
                .get(owner.pid)
                .and_then(|pd| pd.page_table.as_ref())
                .map(|pt| pt.entry(owner.page).is_modified())
                .unwrap_or(false)
        };

        if modified {
            let mut buf: SectorBuf = [0; PAGE_WORDS];
            let base = frame as usize * PAGE_WORDS;
            for (i, word) in buf.iter_mut().enumerate() {
                *word = self.hal.mem_read(base + i);
            }
            let disk = swap_disk_for(owner.pid)?;
            self.disk_transfer(disk, owner.page, &mut buf, DiskOp::Write)?;
        }

        let mut state = self.common.lock();
        if let Some(pd) = state.process_table.get_mut(owner.pid) {
            if let Some(pt) = pd.page_table.as_mut() {
                pt.entry_mut(owner.page).clear_valid_mark_reserved();
            }
        }
        state.shadow.clear(frame);
        state.frame_pool.push(frame);
        drop(state);

        self.trace_memory_event(
            Action::Write,
            owner.pid,
            faulting_pid,
            &format!(
                "evicted frame {frame} (pid {}, page {}) to make room for pid {} page {}",
                owner.pid, owner.page, faulting_pid, faulting_page
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_disk_is_pid_plus_one() {
        assert_eq!(swap_disk_for(0), Ok(1));
        assert_eq!(swap_disk_for(2), Ok(3));
    }

    #[test]
    fn swap_disk_out_of_range_is_rejected() {
        assert_eq!(
            swap_disk_for(crate::config::DISK_COUNT as i32),
            Err(KernelError::BadParam)
        );
        assert_eq!(swap_disk_for(-1), Err(KernelError::BadParam));
    }
}
