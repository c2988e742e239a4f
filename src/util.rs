pub trait Bits {
    /// Number of bits needed to represent the value (`ilog` in Vorbis terms).
    fn bit_len(self) -> usize;
    fn is_bit_set(self, offset: usize) -> bool;
    fn ls_bits(self, len: usize) -> Self;
}

impl Bits for u32 {
    #[inline]
    fn bit_len(self) -> usize {
        32 - self.leading_zeros() as usize
    }

    #[inline]
    fn is_bit_set(self, offset: usize) -> bool {
        self & (1 << offset) != 0
    }

    #[inline]
    fn ls_bits(self, len: usize) -> Self {
        match len {
            0 => 0,
            32 => self,
            1..=31 => self & lsb_mask(len),
            _ => panic!("Length must be in [0..32] range"),
        }
    }
}

impl Bits for u8 {
    #[inline]
    fn bit_len(self) -> usize {
        8 - self.leading_zeros() as usize
    }

    #[inline]
    fn is_bit_set(self, offset: usize) -> bool {
        self & (1 << offset) != 0
    }

    #[inline]
    fn ls_bits(self, len: usize) -> Self {
        (self as u32).ls_bits(len) as u8
    }
}

#[inline]
pub fn lsb_mask(len: usize) -> u32 {
    0xFFFF_FFFF >> (32 - len)
}
