//! PHC string encoding: `$argon2{d,i,id}$v=..$m=..,t=..,p=..$salt$hash` (§6).
//!
//! Not part of the core algorithm — a convenience for the common case of
//! storing a password hash as one self-describing string. The core
//! (`Argon2::hash_into`) never requires going through this format.

use std::str;

use subtle::ConstantTimeEq;
use thiserror::Error as ThisError;

use crate::engine::Argon2;
use crate::error::Error;
use crate::params::{Algorithm, Params, ParamsBuilder, Version};

const LUT64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn lut(n: u8) -> u8 {
    LUT64[n as usize & 0x3f]
}

fn delut(c: u8) -> Option<u8> {
    match c {
        43 => Some(62),
        47 => Some(63),
        _ if (65..=90).contains(&c) => Some(c - 65),
        _ if (97..=122).contains(&c) => Some(c - 71),
        _ if (48..=57).contains(&c) => Some(c + 4),
        _ => None,
    }
}

fn quad(n: &[u8]) -> [u8; 4] {
    debug_assert_eq!(n.len(), 3);
    let (b, c) = (n[1] >> 4 | n[0] << 4, n[2] >> 6 | n[1] << 2);
    [lut(n[0] >> 2), lut(b), lut(c), lut(n[2])]
}

fn triplet(n: &[u8]) -> Option<[u8; 3]> {
    debug_assert_eq!(n.len(), 4);
    let a = delut(n[0])?;
    let b = delut(n[1])?;
    let c = delut(n[2])?;
    let d = delut(n[3])?;
    Some([a << 2 | b >> 4, b << 4 | c >> 2, c << 6 | d])
}

fn base64_no_pad(bytes: &[u8]) -> Vec<u8> {
    let mut rv = vec![];
    let mut pos = 0;
    while pos + 3 <= bytes.len() {
        rv.extend_from_slice(&quad(&bytes[pos..pos + 3]));
        pos += 3;
    }

    if bytes.len() - pos == 1 {
        rv.push(lut(bytes[pos] >> 2));
        rv.push(lut((bytes[pos] & 0x03) << 4));
    } else if bytes.len() - pos == 2 {
        rv.extend_from_slice(&quad(&[bytes[pos], bytes[pos + 1], 0]));
        rv.pop();
    }
    rv
}

fn debase64_no_pad(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.is_empty() || bytes.len() % 4 == 1 {
        return None;
    }
    let mut rv = vec![];
    let mut pos = 0;
    while pos + 4 <= bytes.len() {
        rv.extend_from_slice(&triplet(&bytes[pos..pos + 4])?);
        pos += 4;
    }

    if bytes.len() - pos == 2 {
        let a = delut(bytes[pos])?;
        let b = delut(bytes[pos + 1])?;
        rv.push(a << 2 | b >> 4);
    } else if bytes.len() - pos == 3 {
        let a = delut(bytes[pos])?;
        let b = delut(bytes[pos + 1])?;
        let c = delut(bytes[pos + 2])?;
        rv.push(a << 2 | b >> 4);
        rv.push(b << 4 | c >> 2);
    }
    Some(rv)
}

struct Cursor<'a> {
    enc: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn expect(&mut self, exp: &[u8]) -> Result<(), usize> {
        if self.pos + exp.len() > self.enc.len() || &self.enc[self.pos..self.pos + exp.len()] != exp
        {
            Err(self.pos)
        } else {
            self.pos += exp.len();
            Ok(())
        }
    }

    fn one_of(&mut self, choices: &[&[u8]]) -> Result<usize, usize> {
        for (i, c) in choices.iter().enumerate() {
            if self.enc[self.pos..].starts_with(c) {
                self.pos += c.len();
                return Ok(i);
            }
        }
        Err(self.pos)
    }

    fn read_u32(&mut self) -> Result<u32, usize> {
        let start = self.pos;
        let mut end = self.pos;
        while end < self.enc.len() && self.enc[end].is_ascii_digit() {
            end += 1;
        }
        let s = str::from_utf8(&self.enc[start..end]).map_err(|_| start)?;
        let n = s.parse().map_err(|_| start)?;
        self.pos = end;
        Ok(n)
    }

    fn decode64_till(&mut self, stop: u8) -> Result<Vec<u8>, usize> {
        let end = self.enc[self.pos..]
            .iter()
            .position(|&c| c == stop)
            .map(|n| self.pos + n)
            .unwrap_or(self.enc.len());
        let rv = debase64_no_pad(&self.enc[self.pos..end]).ok_or(self.pos)?;
        self.pos = end;
        Ok(rv)
    }
}

/// Errors specific to PHC string parsing, distinct from [`Error`] (which
/// only covers invalid `opts`).
#[derive(Debug, ThisError)]
pub enum VerifyError {
    #[error("malformed PHC string at byte {0}")]
    Malformed(usize),
    #[error(transparent)]
    InvalidParams(#[from] Error),
}

/// Renders `tag` as a PHC string: `$argon2{d,i,id}$v=<ver>$m=..,t=..,p=..$<salt>$<tag>`.
pub fn encode_phc(algorithm: Algorithm, params: &Params, salt: &[u8], tag: &[u8]) -> String {
    let variant = match algorithm {
        Algorithm::Argon2d => "d",
        Algorithm::Argon2i => "i",
        Algorithm::Argon2id => "id",
    };
    let b64 = |bytes: &[u8]| String::from_utf8(base64_no_pad(bytes)).unwrap();
    format!(
        "$argon2{}$v={}$m={},t={},p={}${}${}",
        variant,
        params.version() as u32,
        params.block_count(),
        params.passes(),
        params.lanes(),
        b64(salt),
        b64(tag),
    )
}

/// Parses a PHC string and checks `password` against its embedded tag,
/// constant-time.
///
/// Returns `Ok(true)`/`Ok(false)` for a well-formed string with a matching
/// or mismatching tag, and `Err` if `encoded` can't be parsed or names
/// invalid parameters.
pub fn verify_phc(encoded: &str, password: &[u8]) -> Result<bool, VerifyError> {
    let mut c = Cursor {
        enc: encoded.as_bytes(),
        pos: 0,
    };

    c.expect(b"$argon2").map_err(VerifyError::Malformed)?;
    let variant = c
        .one_of(&[b"id", b"d", b"i"])
        .map_err(VerifyError::Malformed)?;
    let algorithm = match variant {
        0 => Algorithm::Argon2id,
        1 => Algorithm::Argon2d,
        _ => Algorithm::Argon2i,
    };

    c.expect(b"$v=").map_err(VerifyError::Malformed)?;
    let version = Version::from_u32(c.read_u32().map_err(VerifyError::Malformed)?)?;

    c.expect(b"$m=").map_err(VerifyError::Malformed)?;
    let m = c.read_u32().map_err(VerifyError::Malformed)?;
    c.expect(b",t=").map_err(VerifyError::Malformed)?;
    let t = c.read_u32().map_err(VerifyError::Malformed)?;
    c.expect(b",p=").map_err(VerifyError::Malformed)?;
    let p = c.read_u32().map_err(VerifyError::Malformed)?;

    c.expect(b"$").map_err(VerifyError::Malformed)?;
    let salt = c.decode64_till(b'$').map_err(VerifyError::Malformed)?;
    c.expect(b"$").map_err(VerifyError::Malformed)?;
    let tag = c.decode64_till(0).map_err(VerifyError::Malformed)?;

    let params = ParamsBuilder::new()
        .t_cost(t)
        .m_cost(m)
        .p_cost(p)
        .output_len(tag.len() as u32)
        .version(version)
        .build_with_salt_len(salt.len())?;

    let mut computed = vec![0u8; tag.len()];
    Argon2::new(algorithm, params).hash_into(password, &salt, &mut computed)?;

    Ok(bool::from(computed.ct_eq(&tag)))
}
