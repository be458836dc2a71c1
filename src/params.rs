//! Variant tags, version tags, and the validated parameter record (§6, §4.9).

use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;

/// Argon2 variant. The numeric values are the RFC 9106 type tags and are
/// load-bearing: they are mixed into H0 (§4.5).
///
/// Note: some Argon2 implementations spell the data-dependent variant
/// `Argond2d`; that's a typo in those sources, not a naming choice worth
/// following. The RFC calls it `Argon2d`.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum Algorithm {
    Argon2d = 0,
    Argon2i = 1,
    Argon2id = 2,
}

impl Algorithm {
    pub(crate) fn as_u32(self) -> u32 {
        self as u32
    }

    /// Whether blocks produced at `(pass, slice)` use data-independent
    /// addressing (§4.4).
    pub(crate) fn data_independent(self, pass: u32, slice: u32) -> bool {
        match self {
            Algorithm::Argon2i => true,
            Algorithm::Argon2id => pass == 0 && slice < 2,
            Algorithm::Argon2d => false,
        }
    }
}

/// Argon2 version tag.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
#[repr(u32)]
pub enum Version {
    V0x10 = 0x10,
    V0x13 = 0x13,
}

impl Default for Version {
    fn default() -> Self {
        Version::V0x13
    }
}

impl Version {
    pub(crate) fn from_u32(v: u32) -> Result<Self, Error> {
        match v {
            0x10 => Ok(Version::V0x10),
            0x13 => Ok(Version::V0x13),
            other => Err(Error::InvalidVersion(other)),
        }
    }

    /// Whether pass `r`'s block function XOR-accumulates into the output
    /// slot instead of overwriting it (§4.3).
    pub(crate) fn needs_xor(self, pass: u32) -> bool {
        self == Version::V0x13 && pass != 0
    }
}

pub(crate) const SYNC_POINTS: u32 = 4;
pub(crate) const MIN_SALT_LEN: usize = 8;
pub(crate) const MAX_LEN: u64 = 1 << 32;

/// A progress sink: receives a fraction in `[0, 1]`, called roughly every
/// `ceil(total_blocks / 10_000)` blocks, with a final call at exactly `1.0`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Validated Argon2 parameters (the spec's `opts` record).
///
/// Constructed only through [`ParamsBuilder::build`], which performs every
/// check in §7 before a single block is allocated.
#[derive(Clone)]
pub struct Params {
    pub(crate) t_cost: u32,
    pub(crate) m_cost: u32,
    pub(crate) m_cost_orig: u32,
    pub(crate) p_cost: u32,
    pub(crate) output_len: u32,
    pub(crate) version: Version,
    pub(crate) secret: Vec<u8>,
    pub(crate) ad: Vec<u8>,
    pub(crate) max_mem: u64,
    pub(crate) async_tick: Duration,
    pub(crate) on_progress: Option<ProgressFn>,
}

impl Params {
    /// Number of blocks in `m'` — `m` rounded down to a multiple of `4*p`.
    pub fn block_count(&self) -> u32 {
        self.m_cost
    }

    /// The un-rounded `m` as originally given to the builder. §4.5's `H0`
    /// mixes this in, not `m'` — the two are deliberately different symbols.
    pub(crate) fn m_cost_orig(&self) -> u32 {
        self.m_cost_orig
    }

    /// Blocks per lane (`q` in the spec).
    pub fn lane_length(&self) -> u32 {
        self.m_cost / self.p_cost
    }

    pub fn lanes(&self) -> u32 {
        self.p_cost
    }

    pub fn passes(&self) -> u32 {
        self.t_cost
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn output_len(&self) -> u32 {
        self.output_len
    }
}

/// Builds a [`Params`], validating every field against §3's Invariants.
pub struct ParamsBuilder {
    t_cost: u32,
    m_cost: u32,
    p_cost: u32,
    output_len: u32,
    version: Version,
    secret: Vec<u8>,
    ad: Vec<u8>,
    max_mem: u64,
    async_tick: Duration,
    on_progress: Option<ProgressFn>,
}

impl Default for ParamsBuilder {
    fn default() -> Self {
        ParamsBuilder {
            t_cost: 3,
            m_cost: 4096,
            p_cost: 1,
            output_len: 32,
            version: Version::default(),
            secret: Vec::new(),
            ad: Vec::new(),
            max_mem: 0xffff_ffff,
            async_tick: Duration::from_millis(10),
            on_progress: None,
        }
    }
}

impl ParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn t_cost(mut self, t: u32) -> Self {
        self.t_cost = t;
        self
    }

    pub fn m_cost(mut self, m: u32) -> Self {
        self.m_cost = m;
        self
    }

    pub fn p_cost(mut self, p: u32) -> Self {
        self.p_cost = p;
        self
    }

    pub fn output_len(mut self, len: u32) -> Self {
        self.output_len = len;
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn ad(mut self, ad: impl Into<Vec<u8>>) -> Self {
        self.ad = ad.into();
        self
    }

    pub fn max_mem(mut self, max_mem: u64) -> Self {
        self.max_mem = max_mem;
        self
    }

    pub fn async_tick(mut self, tick: Duration) -> Self {
        self.async_tick = tick;
        self
    }

    pub fn on_progress<F: Fn(f64) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// Validate every field and produce a [`Params`]. Salt length is
    /// checked here too, since the salt's length (but not its content) is
    /// an `opts`-level precondition shared by every call.
    pub fn build_with_salt_len(self, salt_len: usize) -> Result<Params, Error> {
        if (self.output_len as u64) < 4 {
            return Err(Error::InvalidDkLen(self.output_len as u64));
        }
        if self.p_cost < 1 || (self.p_cost as u64) >= (1 << 24) {
            return Err(Error::InvalidParallelism(self.p_cost as u64));
        }
        if self.t_cost < 1 {
            return Err(Error::InvalidIterations(self.t_cost as u64));
        }
        if (self.m_cost as u64) < 8 * self.p_cost as u64 {
            return Err(Error::InvalidMemory {
                m: self.m_cost as u64,
                p: self.p_cost,
            });
        }
        if salt_len < MIN_SALT_LEN || (salt_len as u64) >= MAX_LEN {
            return Err(Error::InvalidSalt(salt_len));
        }
        if self.secret.len() as u64 >= MAX_LEN || self.ad.len() as u64 >= MAX_LEN {
            return Err(Error::InputTooLarge(self.secret.len().max(self.ad.len())));
        }

        let m_prime = 4 * self.p_cost * (self.m_cost / (4 * self.p_cost));
        let needed = m_prime as u64 * 1024;
        if needed > self.max_mem {
            return Err(Error::MemoryBudgetExceeded {
                needed,
                max: self.max_mem,
            });
        }

        Ok(Params {
            t_cost: self.t_cost,
            m_cost: m_prime,
            m_cost_orig: self.m_cost,
            p_cost: self.p_cost,
            output_len: self.output_len,
            version: self.version,
            secret: self.secret,
            ad: self.ad,
            max_mem: self.max_mem,
            async_tick: self.async_tick,
            on_progress: self.on_progress,
        })
    }
}
