//! A memory-hard Argon2 core: Argon2d, Argon2i, and Argon2id (RFC 9106).
//!
//! This crate implements the password-hashing/KDF algorithm itself — the
//! BlaMka compression function, the segmented fill schedule, and both
//! addressing modes — as a library core with no byte-normalization, CLI, or
//! secret-management surface attached. Callers own the password bytes, the
//! salt, and the output buffer.
//!
//! ```
//! use argon2_engine::{Algorithm, Argon2, ParamsBuilder};
//!
//! let params = ParamsBuilder::new()
//!     .t_cost(2)
//!     .m_cost(19 * 1024)
//!     .p_cost(1)
//!     .build_with_salt_len(16)
//!     .unwrap();
//! let argon = Argon2::new(Algorithm::Argon2id, params);
//! let mut tag = [0u8; 32];
//! argon.hash_into(b"hunter2", b"0123456789abcdef", &mut tag).unwrap();
//! ```
//!
//! Lanes are always filled sequentially, never in parallel — the segmented
//! fill schedule in `src/engine.rs` walks `for lane in 0..p` with a plain
//! loop. Memory-hardness here is a sequential cost, not a concurrency trick.

mod arith;
mod block;
mod compress;
#[cfg(feature = "async")]
mod cooperative;
mod engine;
mod error;
mod index;
mod params;
mod variable_hash;
mod verifier;

pub use engine::Argon2;
pub use error::Error;
pub use params::{Algorithm, Params, ParamsBuilder, Version};
pub use verifier::{encode_phc, verify_phc, VerifyError};

/// Hashes `password` and `salt` with Argon2d under `opts`, returning
/// `opts.output_len()` bytes.
pub fn argon2d(password: &[u8], salt: &[u8], opts: &Params) -> Result<Vec<u8>, Error> {
    hash(Algorithm::Argon2d, password, salt, opts)
}

/// Hashes `password` and `salt` with Argon2i under `opts`.
pub fn argon2i(password: &[u8], salt: &[u8], opts: &Params) -> Result<Vec<u8>, Error> {
    hash(Algorithm::Argon2i, password, salt, opts)
}

/// Hashes `password` and `salt` with Argon2id under `opts`. This is the
/// variant RFC 9106 recommends for password hashing when the threat model
/// includes both side-channel and GPU-cracking adversaries.
pub fn argon2id(password: &[u8], salt: &[u8], opts: &Params) -> Result<Vec<u8>, Error> {
    hash(Algorithm::Argon2id, password, salt, opts)
}

fn hash(algorithm: Algorithm, password: &[u8], salt: &[u8], opts: &Params) -> Result<Vec<u8>, Error> {
    let mut out = vec![0u8; opts.output_len() as usize];
    Argon2::new(algorithm, opts.clone()).hash_into(password, salt, &mut out)?;
    Ok(out)
}

/// Cooperative-async counterpart of [`argon2d`] (§4.10): yields to the
/// executor every `opts.async_tick`() rather than running the whole fill
/// loop on a single poll. Gated behind the `async` feature, on by default.
#[cfg(feature = "async")]
pub async fn argon2d_async(password: &[u8], salt: &[u8], opts: &Params) -> Result<Vec<u8>, Error> {
    hash_async(Algorithm::Argon2d, password, salt, opts).await
}

/// Cooperative-async counterpart of [`argon2i`].
#[cfg(feature = "async")]
pub async fn argon2i_async(password: &[u8], salt: &[u8], opts: &Params) -> Result<Vec<u8>, Error> {
    hash_async(Algorithm::Argon2i, password, salt, opts).await
}

/// Cooperative-async counterpart of [`argon2id`].
#[cfg(feature = "async")]
pub async fn argon2id_async(password: &[u8], salt: &[u8], opts: &Params) -> Result<Vec<u8>, Error> {
    hash_async(Algorithm::Argon2id, password, salt, opts).await
}

#[cfg(feature = "async")]
async fn hash_async(
    algorithm: Algorithm,
    password: &[u8],
    salt: &[u8],
    opts: &Params,
) -> Result<Vec<u8>, Error> {
    let mut out = vec![0u8; opts.output_len() as usize];
    Argon2::new(algorithm, opts.clone())
        .hash_into_async(password, salt, &mut out)
        .await?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_functions_round_trip_through_hash_into() {
        let params = ParamsBuilder::new()
            .t_cost(1)
            .m_cost(8)
            .p_cost(1)
            .output_len(16)
            .build_with_salt_len(8)
            .unwrap();
        let out = argon2id(b"pw", b"saltsalt", &params).unwrap();
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn variants_diverge_at_the_top_level_too() {
        let params = ParamsBuilder::new()
            .t_cost(1)
            .m_cost(8)
            .p_cost(1)
            .output_len(16)
            .build_with_salt_len(8)
            .unwrap();
        let d = argon2d(b"pw", b"saltsalt", &params).unwrap();
        let i = argon2i(b"pw", b"saltsalt", &params).unwrap();
        assert_ne!(d, i);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn async_top_level_matches_sync() {
        let params = ParamsBuilder::new()
            .t_cost(1)
            .m_cost(8)
            .p_cost(1)
            .output_len(16)
            .build_with_salt_len(8)
            .unwrap();
        let sync_out = argon2id(b"pw", b"saltsalt", &params).unwrap();
        let async_out = argon2id_async(b"pw", b"saltsalt", &params).await.unwrap();
        assert_eq!(sync_out, async_out);
    }
}
