//! Failure modes for parameter validation (see spec §7).
//!
//! Every variant here is raised before `B` is allocated; the fill phase
//! itself cannot fail (all arithmetic is modulo 2^64, all indices are
//! in-range by construction).

use thiserror::Error;

/// A precondition failure, reported synchronously before any heavy work.
#[derive(Debug, Error, Eq, PartialEq, Clone, Copy)]
pub enum Error {
    #[error("dkLen must be >= 4, got {0}")]
    InvalidDkLen(u64),

    #[error("parallelism must be in [1, 2^24), got {0}")]
    InvalidParallelism(u64),

    #[error("memory cost must be >= 8*p and < 2^32, got m={m} p={p}")]
    InvalidMemory { m: u64, p: u32 },

    #[error("iteration count must be in [1, 2^32), got {0}")]
    InvalidIterations(u64),

    #[error("unsupported Argon2 version {0:#x}")]
    InvalidVersion(u32),

    #[error("unknown Argon2 type tag {0}")]
    InvalidType(u32),

    #[error("salt must be >= 8 bytes and < 2^32 bytes, got {0}")]
    InvalidSalt(usize),

    #[error("input exceeds the 2^32 byte limit ({0} bytes)")]
    InputTooLarge(usize),

    #[error("m'*1024 ({needed} bytes) exceeds the memory budget ({max} bytes)")]
    MemoryBudgetExceeded { needed: u64, max: u64 },

    #[error("progress callback was supplied but is not callable")]
    InvalidProgressCallback,
}
