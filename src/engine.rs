//! Memory layout & seeding (§4.5/C6), the pass/segment/lane driver (§4.6/C7),
//! and finalization (§4.7/C8).

use zeroize::Zeroize;

use crate::block::Matrix;
use crate::compress::compress;
use crate::error::Error;
use crate::index::{index_alpha, ref_lane, AddressGen};
use crate::params::{Algorithm, Params, ProgressFn, MAX_LEN, MIN_SALT_LEN, SYNC_POINTS};
use crate::variable_hash::h_prime;

/// Checks `salt` against §3's Invariant (`8 <= |salt| < 2^32`). `ParamsBuilder`
/// only validates a caller-supplied length integer at build time; the actual
/// bytes handed to `hash_into`/`hash_into_async` are a separate input and
/// must be re-checked here so a mismatched `salt` is a synchronous `Err`
/// rather than a silent wrong hash.
pub(crate) fn check_salt_len(salt: &[u8]) -> Result<(), Error> {
    if salt.len() < MIN_SALT_LEN || (salt.len() as u64) >= MAX_LEN {
        return Err(Error::InvalidSalt(salt.len()));
    }
    Ok(())
}

/// Throttles a [`ProgressFn`] to roughly every `total/10_000` blocks, with a
/// guaranteed final call at exactly `1.0`.
pub(crate) struct ProgressTicker<'a> {
    total: u64,
    done: u64,
    next_at: u64,
    step: u64,
    cb: &'a ProgressFn,
}

impl<'a> ProgressTicker<'a> {
    pub(crate) fn new(total: u64, cb: &'a ProgressFn) -> Self {
        let step = (total / 10_000).max(1);
        ProgressTicker {
            total,
            done: 0,
            next_at: step,
            step,
            cb,
        }
    }

    pub(crate) fn tick(&mut self, n: u64) {
        self.done += n;
        if self.done >= self.next_at || self.done >= self.total {
            (self.cb)((self.done as f64 / self.total.max(1) as f64).min(1.0));
            self.next_at = self.done + self.step;
        }
    }
}

/// Drives one `(pass, lane, slice)` segment one block at a time (§4.6's
/// innermost two loops, lane fixed). Split out from `Argon2::fill_segment` so
/// the cooperative-async driver can interleave an `.await` between
/// individual blocks instead of only between whole segments (§4.8/§5).
pub(crate) struct SegmentCursor {
    pass: u32,
    lane: u32,
    slice: u32,
    lane_len: u32,
    segment_len: u32,
    lanes: u32,
    need_xor: bool,
    addr_gen: Option<AddressGen>,
}

impl SegmentCursor {
    pub(crate) fn new(
        algorithm: Algorithm,
        params: &Params,
        pass: u32,
        lane: u32,
        slice: u32,
        segment_len: u32,
    ) -> Self {
        let lane_len = segment_len * SYNC_POINTS;
        let need_xor = params.version().needs_xor(pass);
        let data_independent = algorithm.data_independent(pass, slice);

        let addr_gen = if data_independent {
            Some(AddressGen::new(
                pass,
                lane,
                slice,
                params.block_count(),
                params.passes(),
                algorithm,
            ))
        } else {
            None
        };

        SegmentCursor {
            pass,
            lane,
            slice,
            lane_len,
            segment_len,
            lanes: params.lanes(),
            need_xor,
            addr_gen,
        }
    }

    /// First `index` this cursor should fill — blocks 0 and 1 of pass 0's
    /// first segment are seeded directly via `H'`, never through `G`.
    pub(crate) fn start_index(&self) -> u32 {
        if self.pass == 0 && self.slice == 0 {
            2
        } else {
            0
        }
    }

    pub(crate) fn fill_one(&mut self, blocks: &mut Matrix, index: u32) {
        let col = self.slice * self.segment_len + index;
        let prev_col = if col == 0 { self.lane_len - 1 } else { col - 1 };

        let (j1, j2) = match &mut self.addr_gen {
            Some(gen) => gen.next_pair(),
            None => {
                let prev = blocks.get(self.lane, prev_col);
                (prev[0] as u32, (prev[0] >> 32) as u32)
            }
        };

        let same_lane_rl = ref_lane(self.pass, self.slice, self.lane, self.lanes, j2);
        let area_same_lane = same_lane_rl == self.lane;
        let ref_col = index_alpha(
            self.pass,
            self.slice,
            self.lane_len,
            self.segment_len,
            index,
            area_same_lane,
            j1,
        );

        let (wr, prev, refblk) = blocks.get3(
            (self.lane, col),
            (self.lane, prev_col),
            (same_lane_rl, ref_col),
        );
        compress(prev, refblk, wr, self.need_xor);
    }
}

/// A configured Argon2 instance: an [`Algorithm`] paired with validated
/// [`Params`]. Mirrors the teacher's `Argon2` struct, generalized to three
/// variants and both version tags.
pub struct Argon2 {
    pub(crate) algorithm: Algorithm,
    pub(crate) params: Params,
}

impl Argon2 {
    pub fn new(algorithm: Algorithm, params: Params) -> Self {
        Argon2 { algorithm, params }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Total number of blocks this instance will produce via `G` across all
    /// passes (the two seeded blocks per lane are not counted, since they
    /// come from `H'` directly rather than the compression function).
    pub(crate) fn total_fills(&self) -> u64 {
        let per_pass = self.params.block_count() as u64 - 2 * self.params.lanes() as u64;
        per_pass * self.params.passes() as u64
    }

    /// Hash `(password, salt)` into `out`, blocking until done.
    ///
    /// `out.len()` must equal `self.params.output_len()`.
    pub fn hash_into(&self, password: &[u8], salt: &[u8], out: &mut [u8]) -> Result<(), Error> {
        debug_assert_eq!(out.len(), self.params.output_len() as usize);
        check_salt_len(salt)?;
        match &self.params.on_progress {
            Some(cb) => {
                let mut ticker = ProgressTicker::new(self.total_fills(), cb);
                self.run(password, salt, out, &mut |n| ticker.tick(n))
            }
            None => self.run(password, salt, out, &mut |_| {}),
        }
    }

    fn run(
        &self,
        password: &[u8],
        salt: &[u8],
        out: &mut [u8],
        on_block: &mut dyn FnMut(u64),
    ) -> Result<(), Error> {
        let lanes = self.params.lanes();
        let lane_len = self.params.lane_length();
        let segment_len = lane_len / SYNC_POINTS;

        tracing::debug!(
            algorithm = ?self.algorithm,
            version = ?self.params.version(),
            m_prime = self.params.block_count(),
            lanes,
            passes = self.params.passes(),
            "starting argon2 fill"
        );

        let mut blocks = Matrix::new(lanes, lane_len);
        let mut h0 = self.initial_hash(password, salt, out.len() as u32);

        for lane in 0..lanes {
            self.seed_lane(&mut blocks, &h0, lane);
        }
        h0.zeroize();

        for pass in 0..self.params.passes() {
            for slice in 0..SYNC_POINTS {
                for lane in 0..lanes {
                    self.fill_segment(&mut blocks, pass, lane, slice, segment_len, on_block);
                }
            }
            tracing::trace!(pass, "completed pass");
        }

        self.finalize(&blocks, out)
    }

    /// `H0` (§4.5): BLAKE2b-512 over every scalar parameter and the four
    /// byte-string inputs.
    pub(crate) fn initial_hash(&self, password: &[u8], salt: &[u8], dk_len: u32) -> [u8; 72] {
        let mut rv = [0u8; 72];
        let p = &self.params;

        use blake2::digest::{Digest, Update};
        let mut hasher = blake2::Blake2b512::new();
        hasher.update(p.lanes().to_le_bytes());
        hasher.update(dk_len.to_le_bytes());
        hasher.update(p.m_cost_orig().to_le_bytes());
        hasher.update(p.passes().to_le_bytes());
        hasher.update((p.version() as u32).to_le_bytes());
        hasher.update(self.algorithm.as_u32().to_le_bytes());

        hasher.update((password.len() as u32).to_le_bytes());
        hasher.update(password);
        hasher.update((salt.len() as u32).to_le_bytes());
        hasher.update(salt);
        hasher.update((p.secret.len() as u32).to_le_bytes());
        hasher.update(&p.secret);
        hasher.update((p.ad.len() as u32).to_le_bytes());
        hasher.update(&p.ad);

        rv[..64].copy_from_slice(&hasher.finalize());
        rv
    }

    /// Seeds the first two blocks of `lane` via `H'(H0 || LE32(i) || LE32(lane), 1024)` (§4.5).
    pub(crate) fn seed_lane(&self, blocks: &mut Matrix, h0: &[u8; 72], lane: u32) {
        let mut buf = *h0;
        buf[68..72].copy_from_slice(&lane.to_le_bytes());

        buf[64..68].copy_from_slice(&0u32.to_le_bytes());
        h_prime(blocks.get_mut(lane, 0).as_bytes_mut(), &buf);

        buf[64..68].copy_from_slice(&1u32.to_le_bytes());
        h_prime(blocks.get_mut(lane, 1).as_bytes_mut(), &buf);
    }

    /// Fills one segment of one lane (§4.6's innermost two loops, lane fixed).
    pub(crate) fn fill_segment(
        &self,
        blocks: &mut Matrix,
        pass: u32,
        lane: u32,
        slice: u32,
        segment_len: u32,
        on_block: &mut dyn FnMut(u64),
    ) {
        let mut cursor =
            SegmentCursor::new(self.algorithm, &self.params, pass, lane, slice, segment_len);
        for index in cursor.start_index()..segment_len {
            cursor.fill_one(blocks, index);
            on_block(1);
        }
    }

    /// `C := B[q-1] xor B[2q-1] xor ... xor B[pq-1]`, then `H'(C, dkLen)` (§4.7).
    pub(crate) fn finalize(&self, blocks: &Matrix, out: &mut [u8]) -> Result<(), Error> {
        let mut acc = blocks.xor_last_column();
        h_prime(out, acc.as_bytes());
        acc.zeroize();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamsBuilder, Version};

    fn small_params() -> Params {
        ParamsBuilder::new()
            .t_cost(1)
            .m_cost(8)
            .p_cost(1)
            .output_len(32)
            .build_with_salt_len(8)
            .unwrap()
    }

    #[test]
    fn hash_into_is_deterministic() {
        let argon = Argon2::new(Algorithm::Argon2id, small_params());
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        argon
            .hash_into(b"password", b"salt salt", &mut a)
            .unwrap();
        argon
            .hash_into(b"password", b"salt salt", &mut b)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_variants_produce_different_tags() {
        let mut d = [0u8; 32];
        let mut i = [0u8; 32];
        let mut id = [0u8; 32];
        Argon2::new(Algorithm::Argon2d, small_params())
            .hash_into(b"pw", b"saltsalt", &mut d)
            .unwrap();
        Argon2::new(Algorithm::Argon2i, small_params())
            .hash_into(b"pw", b"saltsalt", &mut i)
            .unwrap();
        Argon2::new(Algorithm::Argon2id, small_params())
            .hash_into(b"pw", b"saltsalt", &mut id)
            .unwrap();
        assert_ne!(d, i);
        assert_ne!(i, id);
        assert_ne!(d, id);
    }

    #[test]
    fn version_changes_the_tag() {
        let v10 = ParamsBuilder::new()
            .t_cost(2)
            .m_cost(8)
            .p_cost(1)
            .version(Version::V0x10)
            .build_with_salt_len(8)
            .unwrap();
        let v13 = ParamsBuilder::new()
            .t_cost(2)
            .m_cost(8)
            .p_cost(1)
            .version(Version::V0x13)
            .build_with_salt_len(8)
            .unwrap();
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        Argon2::new(Algorithm::Argon2id, v10)
            .hash_into(b"pw", b"saltsalt", &mut a)
            .unwrap();
        Argon2::new(Algorithm::Argon2id, v13)
            .hash_into(b"pw", b"saltsalt", &mut b)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn multi_lane_runs_without_panicking() {
        let params = ParamsBuilder::new()
            .t_cost(2)
            .m_cost(32)
            .p_cost(4)
            .build_with_salt_len(8)
            .unwrap();
        let mut out = [0u8; 32];
        Argon2::new(Algorithm::Argon2id, params)
            .hash_into(b"pw", b"saltsalt", &mut out)
            .unwrap();
        assert!(out.iter().any(|&b| b != 0));
    }

    #[test]
    fn hash_into_rejects_salt_that_disagrees_with_the_built_length() {
        // `ParamsBuilder::build_with_salt_len(8)` only validates an integer;
        // the real call below passes a 0-byte salt and must still fail.
        let argon = Argon2::new(Algorithm::Argon2id, small_params());
        let mut out = [0u8; 32];
        let err = argon.hash_into(b"pw", b"", &mut out).unwrap_err();
        assert_eq!(err, Error::InvalidSalt(0));
    }

    #[test]
    fn h0_depends_on_original_m_not_the_rounded_m_prime() {
        // m=9,p=1 and m=8,p=1 round to the same m'=8, but §4.5 mixes the
        // original m into H0 — these must diverge even though block_count()
        // is identical for both.
        let rounds_to_eight = ParamsBuilder::new()
            .m_cost(9)
            .p_cost(1)
            .build_with_salt_len(8)
            .unwrap();
        let already_eight = ParamsBuilder::new()
            .m_cost(8)
            .p_cost(1)
            .build_with_salt_len(8)
            .unwrap();
        assert_eq!(rounds_to_eight.block_count(), already_eight.block_count());

        let a = Argon2::new(Algorithm::Argon2id, rounds_to_eight);
        let b = Argon2::new(Algorithm::Argon2id, already_eight);
        let h0_a = a.initial_hash(b"pw", b"saltsalt", 32);
        let h0_b = b.initial_hash(b"pw", b"saltsalt", 32);
        assert_ne!(h0_a, h0_b);
    }

    #[test]
    fn long_dklen_path_through_h_prime() {
        let params = ParamsBuilder::new()
            .t_cost(2)
            .m_cost(16)
            .p_cost(1)
            .output_len(1024)
            .build_with_salt_len(8)
            .unwrap();
        let mut out = vec![0u8; 1024];
        Argon2::new(Algorithm::Argon2i, params)
            .hash_into(b"pw", b"saltsalt", &mut out)
            .unwrap();
        assert!(out.iter().any(|&b| b != 0));
    }
}
