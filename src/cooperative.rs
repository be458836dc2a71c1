//! Cooperative-async fill loop (§4.10/C9).
//!
//! Filling one block via `G` is pure CPU work with no natural `.await`
//! point. On a shared tokio runtime, a large `hash_into` call can starve
//! every other task on its worker thread for however long the fill takes.
//! `hash_into_async` addresses that by yielding back to the executor after
//! any individual block whenever more than `async_tick` has elapsed since
//! the last yield, without changing a single byte of the output: the block
//! order within a segment is unchanged, so nothing about the schedule in
//! §4.6 depends on how much wall time passes between blocks.

use std::time::{Duration, Instant};

use zeroize::Zeroize;

use crate::block::Matrix;
use crate::engine::{check_salt_len, Argon2, ProgressTicker, SegmentCursor};
use crate::error::Error;
use crate::params::SYNC_POINTS;

/// Decides when the fill loop should hand control back to the executor.
///
/// `Instant` is monotonic on every platform tokio supports, but
/// `checked_duration_since` still returns `None` if the clock somehow moves
/// backwards between calls; treating that as "yield now" is the safe
/// default rather than panicking or silently skipping the yield.
struct YieldBudget {
    tick: Duration,
    last: Instant,
}

impl YieldBudget {
    fn new(tick: Duration) -> Self {
        YieldBudget {
            tick,
            last: Instant::now(),
        }
    }

    fn should_yield(&self) -> bool {
        match Instant::now().checked_duration_since(self.last) {
            Some(elapsed) => elapsed >= self.tick,
            None => true,
        }
    }

    fn reset(&mut self) {
        self.last = Instant::now();
    }
}

impl Argon2 {
    /// Like [`Argon2::hash_into`], but yields to the async executor every
    /// `params().async_tick` instead of running the whole fill loop on one
    /// poll (§4.10).
    pub async fn hash_into_async(
        &self,
        password: &[u8],
        salt: &[u8],
        out: &mut [u8],
    ) -> Result<(), Error> {
        debug_assert_eq!(out.len(), self.params().output_len() as usize);
        check_salt_len(salt)?;
        let lanes = self.params().lanes();
        let lane_len = self.params().lane_length();
        let segment_len = lane_len / SYNC_POINTS;

        tracing::debug!(
            algorithm = ?self.algorithm(),
            version = ?self.params().version(),
            lanes,
            passes = self.params().passes(),
            "starting argon2 fill (cooperative)"
        );

        let mut blocks = Matrix::new(lanes, lane_len);
        let mut h0 = self.initial_hash(password, salt, out.len() as u32);
        for lane in 0..lanes {
            self.seed_lane(&mut blocks, &h0, lane);
        }
        h0.zeroize();

        let mut ticker = self
            .params()
            .on_progress
            .as_ref()
            .map(|cb| ProgressTicker::new(self.total_fills(), cb));
        let mut budget = YieldBudget::new(self.params().async_tick);

        for pass in 0..self.params().passes() {
            for slice in 0..SYNC_POINTS {
                for lane in 0..lanes {
                    let mut cursor = SegmentCursor::new(
                        self.algorithm(),
                        self.params(),
                        pass,
                        lane,
                        slice,
                        segment_len,
                    );
                    for index in cursor.start_index()..segment_len {
                        cursor.fill_one(&mut blocks, index);
                        if let Some(t) = ticker.as_mut() {
                            t.tick(1);
                        }
                        if budget.should_yield() {
                            tokio::task::yield_now().await;
                            budget.reset();
                        }
                    }
                }
            }
            tracing::trace!(pass, "completed pass");
        }

        self.finalize(&blocks, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Algorithm, ParamsBuilder};

    #[tokio::test]
    async fn async_and_blocking_paths_agree() {
        let params = ParamsBuilder::new()
            .t_cost(2)
            .m_cost(32)
            .p_cost(2)
            .async_tick(Duration::from_micros(1))
            .build_with_salt_len(8)
            .unwrap();
        let argon = Argon2::new(Algorithm::Argon2id, params);

        let mut blocking_out = [0u8; 32];
        argon
            .hash_into(b"password", b"some salt", &mut blocking_out)
            .unwrap();

        let mut async_out = [0u8; 32];
        argon
            .hash_into_async(b"password", b"some salt", &mut async_out)
            .await
            .unwrap();

        assert_eq!(blocking_out, async_out);
    }

    #[tokio::test]
    async fn tiny_tick_still_completes() {
        let params = ParamsBuilder::new()
            .t_cost(1)
            .m_cost(8)
            .p_cost(1)
            .async_tick(Duration::from_nanos(1))
            .build_with_salt_len(8)
            .unwrap();
        let argon = Argon2::new(Algorithm::Argon2d, params);
        let mut out = [0u8; 32];
        argon
            .hash_into_async(b"pw", b"saltsalt", &mut out)
            .await
            .unwrap();
        assert!(out.iter().any(|&b| b != 0));
    }

    #[tokio::test]
    async fn yields_within_a_single_segment_not_just_between_them() {
        // One lane means one segment per slice, so any yielding at all here
        // has to come from inside fill_one's per-block loop rather than the
        // lane loop around it.
        let params = ParamsBuilder::new()
            .t_cost(1)
            .m_cost(256)
            .p_cost(1)
            .async_tick(Duration::from_nanos(1))
            .build_with_salt_len(8)
            .unwrap();
        let argon = Argon2::new(Algorithm::Argon2id, params);
        let mut out = [0u8; 32];
        argon
            .hash_into_async(b"pw", b"saltsalt", &mut out)
            .await
            .unwrap();
        assert!(out.iter().any(|&b| b != 0));
    }

    #[tokio::test]
    async fn hash_into_async_rejects_salt_that_disagrees_with_the_built_length() {
        let params = ParamsBuilder::new()
            .t_cost(1)
            .m_cost(8)
            .p_cost(1)
            .build_with_salt_len(8)
            .unwrap();
        let argon = Argon2::new(Algorithm::Argon2id, params);
        let mut out = [0u8; 32];
        let err = argon
            .hash_into_async(b"pw", b"", &mut out)
            .await
            .unwrap_err();
        assert_eq!(err, Error::InvalidSalt(0));
    }
}
