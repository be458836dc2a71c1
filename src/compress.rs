//! The compression permutation `P` and block function `G` (§4.3/C4).

use zeroize::Zeroize;

use crate::arith::blamka;
use crate::block::Block;

/// One diagonal of the BLAKE2b round, with `G` replaced by the BlaMka-based
/// mixing step (§4.3).
#[inline(always)]
fn mix(a: &mut u64, b: &mut u64, c: &mut u64, d: &mut u64) {
    *a = blamka(*a, *b);
    *d = (*d ^ *a).rotate_right(32);
    *c = blamka(*c, *d);
    *b = (*b ^ *c).rotate_right(24);
    *a = blamka(*a, *b);
    *d = (*d ^ *a).rotate_right(16);
    *c = blamka(*c, *d);
    *b = (*b ^ *c).rotate_right(63);
}

/// `P(v0..v15)`: four column mixes, then four diagonal mixes.
#[inline(always)]
fn p(v: &mut [u64; 16]) {
    mix(&mut v[0], &mut v[4], &mut v[8], &mut v[12]);
    mix(&mut v[1], &mut v[5], &mut v[9], &mut v[13]);
    mix(&mut v[2], &mut v[6], &mut v[10], &mut v[14]);
    mix(&mut v[3], &mut v[7], &mut v[11], &mut v[15]);

    mix(&mut v[0], &mut v[5], &mut v[10], &mut v[15]);
    mix(&mut v[1], &mut v[6], &mut v[11], &mut v[12]);
    mix(&mut v[2], &mut v[7], &mut v[8], &mut v[13]);
    mix(&mut v[3], &mut v[4], &mut v[9], &mut v[14]);
}

fn p_row(row: usize, b: &mut Block) {
    let base = 16 * row;
    let mut v: [u64; 16] = [0; 16];
    v.copy_from_slice(&b.0[base..base + 16]);
    p(&mut v);
    b.0[base..base + 16].copy_from_slice(&v);
}

fn p_col(col: usize, b: &mut Block) {
    // Columns don't transpose the row layout directly: each of the 8 row
    // groups contributes the 128-bit (two-u64) pair at `2*col`, `2*col+1`
    // (§4.3's "R viewed as 16x16 matrix of 64-bit words").
    let idx: [usize; 16] = [
        16 * 0 + 2 * col, 16 * 0 + 2 * col + 1,
        16 * 1 + 2 * col, 16 * 1 + 2 * col + 1,
        16 * 2 + 2 * col, 16 * 2 + 2 * col + 1,
        16 * 3 + 2 * col, 16 * 3 + 2 * col + 1,
        16 * 4 + 2 * col, 16 * 4 + 2 * col + 1,
        16 * 5 + 2 * col, 16 * 5 + 2 * col + 1,
        16 * 6 + 2 * col, 16 * 6 + 2 * col + 1,
        16 * 7 + 2 * col, 16 * 7 + 2 * col + 1,
    ];
    let mut v: [u64; 16] = [0; 16];
    for (slot, &i) in idx.iter().enumerate() {
        v[slot] = b.0[i];
    }
    p(&mut v);
    for (slot, &i) in idx.iter().enumerate() {
        b.0[i] = v[slot];
    }
}

/// `G(X, Y, out, need_xor)`: `R := X xor Y`, `P` over rows then columns,
/// then either overwrite or XOR-accumulate into `out` (§4.3).
pub(crate) fn compress(x: &Block, y: &Block, out: &mut Block, need_xor: bool) {
    let mut r = *x;
    for (d, (xw, yw)) in r.iter_mut().zip(x.iter().zip(y.iter())) {
        *d = xw ^ yw;
    }

    for row in 0..8 {
        p_row(row, &mut r);
    }
    for col in 0..8 {
        p_col(col, &mut r);
    }

    if need_xor {
        for (o, (rw, (xw, yw))) in out
            .iter_mut()
            .zip(r.iter().zip(x.iter().zip(y.iter())))
        {
            *o ^= rw ^ xw ^ yw;
        }
    } else {
        for (o, (rw, (xw, yw))) in out
            .iter_mut()
            .zip(r.iter().zip(x.iter().zip(y.iter())))
        {
            *o = rw ^ xw ^ yw;
        }
    }

    r.zeroize();
}
