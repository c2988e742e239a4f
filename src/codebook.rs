use enum_primitive::FromPrimitive;
use num::integer::Roots;

use crate::bitstream::BitRead;
use crate::error::{Error, Result};
use crate::huffman::{HuffmanDecoder, MAX_CODE_LEN};
use crate::util::Bits;

const SYNC_PATTERN: [u8; 3] = [0x42, 0x43, 0x56];
const LOOKUP_TABLE_BITS: usize = 9;

#[derive(Debug)]
pub struct Codebook {
    dim_count: usize,
    entry_count: usize,
    huffman_decoder: HuffmanDecoder,
    lookup_table: Option<LookupTable>,
}

impl Codebook {
    pub fn read<R: BitRead>(reader: &mut R) -> Result<Self> {
        let mut sync_pattern = [0; 3];
        reader.read_bytes(&mut sync_pattern)?;
        if sync_pattern != SYNC_PATTERN {
            return Err(Error::BadHeader("Invalid codebook sync pattern"));
        }

        let dim_count = reader.read_u16()? as usize;
        let entry_count = reader.read_u32_bits(24)? as usize;
        let ordered = reader.read_bool()?;

        let mut builder = HuffmanDecoder::builder(LOOKUP_TABLE_BITS);
        {
            let make_codeword = |idx: usize, len: usize| builder.create_code(idx as u32, len);
            if ordered {
                Self::read_ordered_codeword_lens(reader, entry_count, make_codeword)?;
            } else {
                Self::read_unordered_codeword_lens(reader, entry_count, make_codeword)?;
            }
        }
        let huffman_decoder = builder.build()?;

        let lookup_table = LookupTable::read(reader, entry_count, dim_count)?;

        Ok(Codebook {
            dim_count,
            entry_count,
            huffman_decoder,
            lookup_table,
        })
    }

    pub fn dim_count(&self) -> usize {
        self.dim_count
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Whether the codebook can be used for vector decoding.
    pub fn has_lookup_table(&self) -> bool {
        self.lookup_table.is_some()
    }

    pub fn decode_scalar<R: BitRead>(&self, reader: &mut R) -> Result<u32> {
        self.huffman_decoder.decode(reader)
    }

    /// Decodes a single vector into `result[..dim_count]`.
    pub fn decode_vq<R: BitRead>(&self, reader: &mut R, result: &mut [f32]) -> Result<()> {
        let lookup_table = self.lookup_table.as_ref()
            .ok_or(Error::DecodeError("Codebook has no lookup table"))?;
        let entry = self.decode_scalar(reader)? as usize;
        lookup_table.lookup(&mut result[..self.dim_count], entry);
        Ok(())
    }

    fn read_unordered_codeword_lens<R, F>(reader: &mut R, count: usize, mut callback: F) -> Result<()>
            where R: BitRead,
                  F: FnMut(usize, usize) -> Result<()> {
        let sparse = reader.read_bool()?;
        for i in 0..count {
            if sparse && !reader.read_bool()? {
                continue;
            }
            let len = Self::read_codeword_len(reader)?;
            callback(i, len)?;
        }
        Ok(())
    }

    fn read_ordered_codeword_lens<R, F>(reader: &mut R, count: usize, mut callback: F) -> Result<()>
            where R: BitRead,
                  F: FnMut(usize, usize) -> Result<()> {
        let mut cur_entry = 0;
        let mut cur_len = Self::read_codeword_len(reader)?;
        while cur_entry < count {
            let num_len_bits = ((count - cur_entry) as u32).bit_len();
            let num = reader.read_u32_bits(num_len_bits)? as usize;
            if cur_entry + num > count {
                return Err(Error::BadHeader("Codeword length counts mismatch"));
            }
            if num > 0 && cur_len > MAX_CODE_LEN {
                return Err(Error::BadHeader("Codeword is too long"));
            }
            for _ in 0..num {
                callback(cur_entry, cur_len)?;
                cur_entry += 1;
            }
            cur_len += 1;
        }
        Ok(())
    }

    fn read_codeword_len<R: BitRead>(reader: &mut R) -> Result<usize> {
        Ok(reader.read_u32_bits(5)? as usize + 1)
    }
}

enum_from_primitive! {
#[derive(Clone, Copy, Debug, PartialEq)]
enum LookupKind {
    Lookup1  = 1,
    Lookup2  = 2,
}}

#[derive(Debug)]
struct LookupTable {
    kind: LookupKind,
    dim_count: usize,
    /// Multiplicands with delta and minimum applied.
    values: Box<[f32]>,
    sequence_p: bool,
}

impl LookupTable {
    fn read<R: BitRead>(reader: &mut R, entry_count: usize, dim_count: usize) -> Result<Option<Self>> {
        let kind = match reader.read_u8_bits(4)? {
            0 => return Ok(None),
            v => LookupKind::from_u8(v).ok_or(Error::BadHeader("Invalid VQ lookup type"))?,
        };
        if dim_count == 0 {
            return Err(Error::BadHeader("Codebook with lookup table has no dimensions"));
        }
        let min = reader.read_f32()?;
        let delta = reader.read_f32()?;
        let value_len_bits = reader.read_u8_bits(4)? as usize + 1;
        let sequence_p = reader.read_bool()?;

        let value_count = match kind {
            LookupKind::Lookup1 => lookup1_value_count(entry_count, dim_count),
            LookupKind::Lookup2 => entry_count.checked_mul(dim_count)
                .ok_or(Error::BadHeader("Too many VQ lookup values"))?,
        };
        if value_count == 0 {
            return Err(Error::BadHeader("Empty VQ lookup table"));
        }
        if value_count.saturating_mul(value_len_bits) > reader.bits_left() {
            return Err(Error::Truncated);
        }

        let mut values = Vec::with_capacity(value_count);
        for _ in 0..value_count {
            let mult = reader.read_u32_bits(value_len_bits)?;
            values.push(mult as f32 * delta + min);
        }

        Ok(Some(LookupTable {
            kind,
            dim_count,
            values: values.into_boxed_slice(),
            sequence_p,
        }))
    }

    fn lookup(&self, result: &mut [f32], entry: usize) {
        match self.kind {
            LookupKind::Lookup1 => self.lookup1(result, entry),
            LookupKind::Lookup2 => self.lookup2(result, entry),
        }
    }

    fn lookup1(&self, result: &mut [f32], entry: usize) {
        let value_count = self.values.len();
        let mut last = 0.0;
        let mut index_divisor = 1_usize;
        for r in result.iter_mut() {
            let value = self.values[entry / index_divisor % value_count] + last;
            *r = value;
            if self.sequence_p {
                last = value;
            }
            index_divisor = index_divisor.saturating_mul(value_count);
        }
    }

    fn lookup2(&self, result: &mut [f32], entry: usize) {
        let mut last = 0.0;
        let start = entry * self.dim_count;
        for (r, &v) in result.iter_mut().zip(self.values[start..start + self.dim_count].iter()) {
            let value = v + last;
            *r = value;
            if self.sequence_p {
                last = value;
            }
        }
    }
}

/// The greatest integer value for which `value ^ dim_count` is less than or equal to
/// `entry_count`.
fn lookup1_value_count(entry_count: usize, dim_count: usize) -> usize {
    let r = (entry_count as u64).nth_root(dim_count as u32);
    debug_assert!(r.checked_pow(dim_count as u32).map(|v| v <= entry_count as u64).unwrap_or(false));
    r as usize
}
