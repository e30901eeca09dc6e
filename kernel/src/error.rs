//! User-visible error codes. Wire values are stable and match
//! `original_source/common.h`'s `ERR_*` constants.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[repr(i32)]
pub enum KernelError {
    #[error("bad parameter")]
    BadParam = 1,
    #[error("internal invariant violated")]
    InternalBug = 2,
    #[error("a process with that name already exists")]
    DuplicateName = 8,
    #[error("priority out of range")]
    IllegalPriority = 9,
    #[error("process table is full")]
    TableFull = 10,
    #[error("process name too long")]
    NameTooLong = 11,
    #[error("queue misuse")]
    QueueMisuse = 12,
    #[error("no such process")]
    DoesNotExist = 13,
    #[error("a process cannot suspend itself")]
    SuspendSelf = 14,
    #[error("process already suspended")]
    AlreadySuspended = 15,
    #[error("a process cannot resume itself")]
    ResumeSelf = 16,
    #[error("process is not suspended")]
    ResumeUnsuspended = 17,
}

impl KernelError {
    /// The stable wire value (`Success = 0` is represented by `Ok(())` at
    /// call sites, never by a `KernelError` variant).
    pub const fn code(self) -> i32 {
        self as i32
    }
}

pub type KernelResult<T = ()> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_match_original_source_constants() {
        assert_eq!(KernelError::BadParam.code(), 1);
        assert_eq!(KernelError::DuplicateName.code(), 8);
        assert_eq!(KernelError::ResumeUnsuspended.code(), 17);
    }

    #[test]
    fn every_variant_has_a_distinct_code() {
        let codes = [
            KernelError::BadParam.code(),
            KernelError::InternalBug.code(),
            KernelError::DuplicateName.code(),
            KernelError::IllegalPriority.code(),
            KernelError::TableFull.code(),
            KernelError::NameTooLong.code(),
            KernelError::QueueMisuse.code(),
            KernelError::DoesNotExist.code(),
            KernelError::SuspendSelf.code(),
            KernelError::AlreadySuspended.code(),
            KernelError::ResumeSelf.code(),
            KernelError::ResumeUnsuspended.code(),
        ];
        for i in 0..codes.len() {
            for j in (i + 1)..codes.len() {
                assert_ne!(codes[i], codes[j]);
            }
        }
    }
}
