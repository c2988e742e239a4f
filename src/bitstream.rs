use std::cmp;

use crate::error::{Error, Result};
use crate::util::Bits;

/// Bit level reading as specified by the [Bitpacking Convention]: values are packed
/// least significant bit first within each byte.
///
/// [Bitpacking Convention]: https://www.xiph.org/vorbis/doc/Vorbis_I_spec.html#x1-360002
pub trait BitRead {
    /// Returns at most `len_bits` upcoming bits as `u32` value along with the number of bits that
    /// were actually available. Doesn't advance the read position.
    fn peek_u32_bits(&self, len_bits: usize) -> (u32, usize);

    /// Advances the read position by `len_bits` previously peeked bits.
    fn consume_bits(&mut self, len_bits: usize) -> Result<()>;

    /// Returns the number of unread bits.
    fn bits_left(&self) -> usize;

    /// Reads exactly `len_bits` and returns the bits read as `u32` value or `Error::Truncated`
    /// if there's not enough bits left. Nothing is consumed on failure.
    fn read_u32_bits(&mut self, len_bits: usize) -> Result<u32> {
        let (r, r_len) = self.peek_u32_bits(len_bits);
        if r_len == len_bits {
            self.consume_bits(len_bits)?;
            Ok(r)
        } else {
            Err(Error::Truncated)
        }
    }

    fn read_u8_bits(&mut self, len_bits: usize) -> Result<u8> {
        assert!(len_bits <= 8);
        self.read_u32_bits(len_bits).map(|v| v as u8)
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.read_u8_bits(8)
    }

    fn read_u16_bits(&mut self, len_bits: usize) -> Result<u16> {
        assert!(len_bits <= 16);
        self.read_u32_bits(len_bits).map(|v| v as u16)
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.read_u16_bits(16)
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.read_u32_bits(32)
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.read_u32().map(|v| v as i32)
    }

    // Reads one bit and treats it as `false` if it's 0 or `true` if it's 1.
    fn read_bool(&mut self) -> Result<bool> {
        self.read_u8_bits(1).map(|v| v & 1 == 1)
    }

    /// Reads `f32` value as defined by [float32_unpack](https://www.xiph.org/vorbis/doc/Vorbis_I_spec.html#x1-1200009.2.2).
    fn read_f32(&mut self) -> Result<f32> {
        self.read_u32().map(f32_unpack)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.bits_left() < buf.len() * 8 {
            return Err(Error::Truncated);
        }
        for b in buf.iter_mut() {
            *b = self.read_u8()?;
        }
        Ok(())
    }
}

/// Reads bits from a single in-memory packet. Never reads past the end of the packet.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        BitReader {
            buf,
            pos: 0,
        }
    }

    /// Returns the current position in bits from the start of the packet.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> BitRead for BitReader<'a> {
    fn peek_u32_bits(&self, len_bits: usize) -> (u32, usize) {
        assert!(len_bits <= 32);
        let avail = cmp::min(len_bits, self.bits_left());
        if avail == 0 {
            return (0, 0);
        }
        let byte = self.pos / 8;
        let shift = self.pos % 8;
        // At most 7 + 32 bits are needed which fit in 5 bytes.
        let mut acc = 0_u64;
        for (i, &b) in self.buf[byte..].iter().take(5).enumerate() {
            acc |= (b as u64) << (i * 8);
        }
        (((acc >> shift) as u32).ls_bits(avail), avail)
    }

    fn consume_bits(&mut self, len_bits: usize) -> Result<()> {
        if len_bits > self.bits_left() {
            self.pos = self.buf.len() * 8;
            return Err(Error::Truncated);
        }
        self.pos += len_bits;
        Ok(())
    }

    fn bits_left(&self) -> usize {
        self.buf.len() * 8 - self.pos
    }
}

fn f32_unpack(val: u32) -> f32 {
    let mut mantissa = (val & 0x1F_FFFF) as f32;
    let sign = val & 0x8000_0000;
    if sign != 0 {
        mantissa = -mantissa;
    }
    let exponent = ((val & 0x7FE0_0000) >> 21) as i32;
    mantissa * 2_f32.powi(exponent - 788)
}
