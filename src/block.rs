//! Memory layout: the 1024-byte `Block` and the `m'`-block `Matrix` (§3, §4.5/C6).

use std::ops::{BitXorAssign, Index, IndexMut};
use zeroize::Zeroize;

/// Words per block (1024 bytes / 8).
pub(crate) const BLOCK_WORDS: usize = 128;
pub(crate) const BLOCK_BYTES: usize = BLOCK_WORDS * 8;

/// A single 1024-byte Argon2 block, viewed as 128 little-endian `u64` words
/// (logically a 16x16 matrix of 64-bit words, per §3).
#[derive(Clone, Copy)]
pub(crate) struct Block(pub(crate) [u64; BLOCK_WORDS]);

impl Block {
    #[inline]
    pub(crate) fn zero() -> Block {
        Block([0u64; BLOCK_WORDS])
    }

    pub(crate) fn as_bytes(&self) -> &[u8; BLOCK_BYTES] {
        // SAFETY: Block is a repr(Rust) wrapper around [u64; 128]; reading
        // it as a byte array is valid because u64 has no padding and every
        // bit pattern of `[u8; BLOCK_BYTES]` is a legal `[u64; BLOCK_WORDS]`.
        unsafe { &*(self.0.as_ptr() as *const [u8; BLOCK_BYTES]) }
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8; BLOCK_BYTES] {
        // SAFETY: see `as_bytes`.
        unsafe { &mut *(self.0.as_mut_ptr() as *mut [u8; BLOCK_BYTES]) }
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, u64> {
        self.0.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, u64> {
        self.0.iter_mut()
    }
}

impl Index<usize> for Block {
    type Output = u64;
    #[inline(always)]
    fn index(&self, idx: usize) -> &u64 {
        &self.0[idx]
    }
}

impl IndexMut<usize> for Block {
    #[inline(always)]
    fn index_mut(&mut self, idx: usize) -> &mut u64 {
        &mut self.0[idx]
    }
}

impl<'a> BitXorAssign<&'a Block> for Block {
    #[inline(always)]
    fn bitxor_assign(&mut self, rhs: &Block) {
        for (d, r) in self.0.iter_mut().zip(rhs.0.iter()) {
            *d ^= r;
        }
    }
}

impl Zeroize for Block {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// The `m'`-block working matrix, laid out as `p` contiguous lanes of `q`
/// blocks each (§3 "Matrix `B`"). A flat `Vec<Block>` indexed by
/// `(lane, column)` replaces the natural pointer-graph description with
/// arithmetic, keeping the whole matrix contiguous for cache locality.
pub(crate) struct Matrix {
    blocks: Vec<Block>,
    lanes: u32,
    lane_len: u32,
}

impl Matrix {
    pub(crate) fn new(lanes: u32, lane_len: u32) -> Self {
        debug_assert!(lanes > 0 && lane_len > 0);
        Matrix {
            blocks: vec![Block::zero(); lanes as usize * lane_len as usize],
            lanes,
            lane_len,
        }
    }

    #[inline(always)]
    fn linear(&self, lane: u32, col: u32) -> usize {
        debug_assert!(lane < self.lanes && col < self.lane_len);
        lane as usize * self.lane_len as usize + col as usize
    }

    #[inline(always)]
    pub(crate) fn get(&self, lane: u32, col: u32) -> &Block {
        &self.blocks[self.linear(lane, col)]
    }

    #[inline(always)]
    pub(crate) fn get_mut(&mut self, lane: u32, col: u32) -> &mut Block {
        let idx = self.linear(lane, col);
        &mut self.blocks[idx]
    }

    /// Borrow the write target plus two distinct read-only references, as
    /// the fill loop needs (`prev` and `ref_block`, never the block being
    /// written).
    pub(crate) fn get3(
        &mut self,
        wr: (u32, u32),
        rd0: (u32, u32),
        rd1: (u32, u32),
    ) -> (&mut Block, &Block, &Block) {
        let wr_idx = self.linear(wr.0, wr.1);
        let rd0_idx = self.linear(rd0.0, rd0.1);
        let rd1_idx = self.linear(rd1.0, rd1.1);
        assert!(wr_idx != rd0_idx && wr_idx != rd1_idx);
        let p: *mut Matrix = self;
        // SAFETY: indices are in-bounds (via `linear`) and pairwise
        // distinct (checked above), so this never aliases a `&mut` with a
        // `&` to the same element.
        unsafe {
            (
                &mut (*p).blocks[wr_idx],
                &(*p).blocks[rd0_idx],
                &(*p).blocks[rd1_idx],
            )
        }
    }

    /// XORs the last block of every lane together (finalization, §4.7).
    pub(crate) fn xor_last_column(&self) -> Block {
        let mut acc = *self.get(0, self.lane_len - 1);
        for lane in 1..self.lanes {
            acc ^= self.get(lane, self.lane_len - 1);
        }
        acc
    }
}

impl Drop for Matrix {
    fn drop(&mut self) {
        for blk in self.blocks.iter_mut() {
            blk.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_indexes_lane_major() {
        let mut m = Matrix::new(2, 3);
        m.get_mut(0, 0)[0] = 1;
        m.get_mut(1, 0)[0] = 2;
        assert_eq!(m.get(0, 0)[0], 1);
        assert_eq!(m.get(1, 0)[0], 2);
    }

    #[test]
    fn xor_last_column_xors_every_lane() {
        let mut m = Matrix::new(3, 2);
        m.get_mut(0, 1)[0] = 0b001;
        m.get_mut(1, 1)[0] = 0b010;
        m.get_mut(2, 1)[0] = 0b100;
        assert_eq!(m.xor_last_column()[0], 0b111);
    }

    #[test]
    fn drop_zeroizes_every_block() {
        // Exercised indirectly: Matrix's Drop impl walks every block and
        // calls zeroize() before the backing Vec is freed.
        let m = Matrix::new(1, 1);
        drop(m);
    }
}
