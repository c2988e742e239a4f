use std::cmp;

use crate::bitstream::BitRead;
use crate::error::{Error, Result};
use crate::util::{self, Bits};

pub const MAX_CODE_LEN: usize = 32;

#[derive(Debug)]
pub struct HuffmanDecoder {
    lookup_table: LookupTable,
    long_codes: Box<[LongCode]>,
    max_code_len: usize,
}

impl HuffmanDecoder {
    pub fn builder(lookup_table_bits: usize) -> HuffmanDecoderBuilder {
        assert!(lookup_table_bits > 0 && lookup_table_bits < 32);
        let lookup_entries = vec![LookupEntry::Null; 1 << lookup_table_bits];

        HuffmanDecoderBuilder {
            lookup_table: LookupTable {
                entries: lookup_entries.into_boxed_slice(),
                len_bits: lookup_table_bits,
            },
            long_codes: Vec::new(),
            cur_codes: [None; MAX_CODE_LEN],
            max_code_len: 0,
            kraft_sum: 0,
            code_count: 0,
        }
    }

    /// Decodes a single codeword. Peeks the longest possible code and commits only the bits of
    /// the matched one.
    pub fn decode<R: BitRead>(&self, reader: &mut R) -> Result<u32> {
        if self.max_code_len == 0 {
            return Err(Error::DecodeError("Codebook has no used entries"));
        }
        let (code_bits, avail) = reader.peek_u32_bits(self.max_code_len);
        if avail == 0 {
            return Err(Error::Truncated);
        }
        let lookup_len_bits = cmp::min(self.max_code_len, self.lookup_table.len_bits);
        let entry = self.lookup_table.entries[code_bits.ls_bits(lookup_len_bits) as usize];
        let code = match entry {
            LookupEntry::Code(code) => code,
            LookupEntry::LongCode => self.find_long_code(code_bits, avail)?,
            LookupEntry::Null => return Err(if avail < lookup_len_bits {
                Error::Truncated
            } else {
                Error::DecodeError("Matched a null Huffman code entry")
            }),
        };
        if code.len > avail {
            return Err(Error::Truncated);
        }
        reader.consume_bits(code.len)?;
        Ok(code.value)
    }

    fn find_long_code(&self, bits: u32, avail: usize) -> Result<CodeValue> {
        self.long_codes.iter()
            .find(|lc| lc.len <= avail &&
                    lc.code.ls_bits(lc.len) == bits.ls_bits(lc.len))
            .map(|lc| CodeValue {
                value: lc.value,
                len: lc.len,
            })
            .ok_or(if avail < self.max_code_len {
                Error::Truncated
            } else {
                Error::DecodeError("Unknown Huffman code")
            })
    }
}

pub struct HuffmanDecoderBuilder {
    lookup_table: LookupTable,
    long_codes: Vec<LongCode>,
    /// Current lowest codes for each code length (length 1 is at index 0).
    cur_codes: [Option<u32>; MAX_CODE_LEN],
    max_code_len: usize,
    /// Sum of 2^(32 - len) over all created codes. Equals 2^32 for a complete prefix code.
    kraft_sum: u64,
    code_count: usize,
}

impl HuffmanDecoderBuilder {
    pub fn create_code(&mut self, value: u32, len: usize) -> Result<()> {
        if len == 0 || len > MAX_CODE_LEN {
            return Err(Error::BadHeader("Invalid Huffman code length"));
        }
        let code_straight = self.next_code(len)?;
        let code = code_straight.reverse_bits() >> (32 - len);
        let code = Code { code, len };
        let value = CodeValue { value, len };

        self.kraft_sum += 1 << (32 - len);
        self.code_count += 1;

        let lookup_table_len = self.lookup_table.len_bits;
        if len <= lookup_table_len {
            self.lookup_table.set(code, LookupEntry::Code(value));
        } else {
            self.lookup_table.set(code.truncate(lookup_table_len), LookupEntry::LongCode);
            self.long_codes.push(LongCode {
                sort_key: code_straight,
                code: code.code,
                value: value.value,
                len,
            });
        }

        Ok(())
    }

    /// Finishes the decoder. Fails if the code lengths don't satisfy Kraft's equality, except for
    /// the degenerate single-code case which is allowed to be underspecified.
    pub fn build(mut self) -> Result<HuffmanDecoder> {
        if self.code_count > 1 && self.kraft_sum != 1 << 32 {
            return Err(Error::BadHeader("Underspecified Huffman tree"));
        }

        for lc in self.long_codes.iter_mut() {
            lc.pad_sort_key(self.max_code_len);
        }
        self.long_codes.sort_by_key(|lc| lc.sort_key);

        Ok(HuffmanDecoder {
            lookup_table: self.lookup_table,
            long_codes: self.long_codes.into_boxed_slice(),
            max_code_len: self.max_code_len,
        })
    }

    fn next_code(&mut self, len: usize) -> Result<u32> {
        let r = self.do_next_code(len)?;
        if len > self.max_code_len {
            self.max_code_len = len;
        }
        Ok(r)
    }

    fn do_next_code(&mut self, len: usize) -> Result<u32> {
        assert!(len > 0 && len <= MAX_CODE_LEN);

        let idx = len - 1;

        let cur_code_bits = match self.cur_codes[idx] {
            None => {
                let r = if idx > 0 {
                    self.do_next_code(idx)? << 1
                } else {
                    0
                };
                self.cur_codes[idx] = Some(r);
                return Ok(r);
            }
            Some(v) => v,
        };

        if cur_code_bits & 1 == 0 {
            let cur_code_bits = cur_code_bits | 1;
            self.cur_codes[idx] = Some(cur_code_bits);
            return Ok(cur_code_bits);
        }

        if len == 1 {
            return Err(Error::BadHeader("Overspecified Huffman tree"));
        }
        let cur_code_bits = self.do_next_code(idx)? << 1;
        self.cur_codes[idx] = Some(cur_code_bits);
        Ok(cur_code_bits)
    }
}

#[derive(Clone, Copy, Debug)]
struct Code {
    code: u32,
    len: usize,
}

impl Code {
    fn truncate(&self, len: usize) -> Self {
        if self.len <= len {
            *self
        } else {
            Code {
                code: self.code.ls_bits(len),
                len,
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct CodeValue {
    value: u32,
    len: usize,
}

#[derive(Clone, Copy, Debug)]
struct LongCode {
    sort_key: u32,
    code: u32,
    value: u32,
    len: usize,
}

impl LongCode {
    fn pad_sort_key(&mut self, len: usize) {
        assert!(len >= self.len && len <= MAX_CODE_LEN);
        self.sort_key = ((self.sort_key as u64) << (len - self.len)) as u32;
    }
}

#[derive(Debug)]
struct LookupTable {
    entries: Box<[LookupEntry]>,
    len_bits: usize,
}

impl LookupTable {
    fn set(&mut self, code: Code, entry: LookupEntry) {
        assert!(code.len <= self.len_bits);
        let mut index = code.code as usize;
        let last_index = ((self.entries.len() - 1) & !(util::lsb_mask(code.len) as usize)) | index;
        let step = 1 << code.len;
        loop {
            self.entries[index] = entry;
            if index == last_index {
                break;
            }
            index += step;
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum LookupEntry {
    Null,
    Code(CodeValue),
    LongCode,
}
