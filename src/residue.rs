use enum_primitive::FromPrimitive;
use std::cmp;

use crate::bitstream::BitRead;
use crate::codebook::Codebook;
use crate::error::{Error, ExpectEop, Result};
use crate::util::Bits;

enum_from_primitive! {
#[derive(Clone, Copy, Debug, PartialEq)]
enum ResidueKind {
    Residue0 = 0,
    Residue1 = 1,
    Residue2 = 2,
}}

#[derive(Debug)]
pub struct Residue {
    kind: ResidueKind,
    start: usize,
    end: usize,
    part_len: usize,
    classbook: usize,
    /// Codebook for each pass of each classification.
    class_codebooks: Box<[[Option<usize>; 8]]>,
    max_dim_count: usize,
}

impl Residue {
    pub fn read<R: BitRead>(reader: &mut R, codebooks: &[Codebook]) -> Result<Self> {
        let kind = ResidueKind::from_u16(reader.read_u16()?)
            .ok_or(Error::BadHeader("Unsupported residue type"))?;
        let start = reader.read_u32_bits(24)? as usize;
        let end = reader.read_u32_bits(24)? as usize;
        if end < start {
            return Err(Error::BadHeader("Invalid residue range"));
        }

        let part_len = reader.read_u32_bits(24)? as usize + 1;
        let class_count = reader.read_u8_bits(6)? as usize + 1;
        let classbook = reader.read_u8()? as usize;
        match codebooks.get(classbook) {
            Some(c) if c.dim_count() > 0 => {
                // Every combination of classifications must have a codeword.
                let combinations = (class_count as u64).checked_pow(c.dim_count() as u32);
                if combinations.map(|v| v > c.entry_count() as u64).unwrap_or(true) {
                    return Err(Error::BadHeader("Residue classbook has too few entries"));
                }
            }
            Some(_) => return Err(Error::BadHeader("Residue classbook has no dimensions")),
            None => return Err(Error::BadHeader("Invalid codebook index in residue classbook")),
        }

        let mut cascade = Vec::with_capacity(class_count);
        for _ in 0..class_count {
            let low_bits = reader.read_u8_bits(3)?;
            let high_bits = if reader.read_bool()? {
                reader.read_u8_bits(5)?
            } else {
                0
            };
            cascade.push(high_bits << 3 | low_bits);
        }

        let mut max_dim_count = 0;
        let mut class_codebooks = Vec::with_capacity(class_count);
        for c in cascade {
            let mut book_set = [None; 8];
            for (pass, book) in book_set.iter_mut().enumerate() {
                if !c.is_bit_set(pass) {
                    continue;
                }
                let idx = reader.read_u8()? as usize;
                let codebook = codebooks.get(idx)
                    .ok_or(Error::BadHeader("Invalid codebook index in residue"))?;
                if !codebook.has_lookup_table() {
                    return Err(Error::BadHeader("Residue codebook has no lookup table"));
                }
                max_dim_count = cmp::max(max_dim_count, codebook.dim_count());
                *book = Some(idx);
            }
            class_codebooks.push(book_set);
        }

        Ok(Residue {
            kind,
            start,
            end,
            part_len,
            classbook,
            class_codebooks: class_codebooks.into_boxed_slice(),
            max_dim_count,
        })
    }

    /// Decodes residue vectors of the channels in a submap. All `vectors` have the length of half
    /// of the frame and are zeroed first. Vectors with `do_not_decode` set stay zero unless the
    /// residue is of type 2.
    pub fn decode<R: BitRead>(&self,
            reader: &mut R,
            codebooks: &[Codebook],
            vectors: &mut [&mut [f32]],
            do_not_decode: &[bool],
            strict: bool) -> Result<()> {
        debug_assert_eq!(vectors.len(), do_not_decode.len());
        for v in vectors.iter_mut() {
            v.iter_mut().for_each(|s| *s = 0.0);
        }
        let r = match self.kind {
            ResidueKind::Residue0 => self.decode_partitions(reader, codebooks, vectors, do_not_decode, true),
            ResidueKind::Residue1 => self.decode_partitions(reader, codebooks, vectors, do_not_decode, false),
            ResidueKind::Residue2 => self.decode_interleaved_channels(reader, codebooks, vectors, do_not_decode),
        };
        match r.expect_eop()? {
            Some(()) => Ok(()),
            None if strict => Err(Error::DecodeError("End of packet in residue data")),
            None => Ok(()),
        }
    }

    fn decode_interleaved_channels<R: BitRead>(&self,
            reader: &mut R,
            codebooks: &[Codebook],
            vectors: &mut [&mut [f32]],
            do_not_decode: &[bool]) -> Result<()> {
        if vectors.is_empty() || do_not_decode.iter().all(|&v| v) {
            return Ok(());
        }
        let channel_count = vectors.len();
        let mut interleaved = vec![0.0; vectors[0].len() * channel_count];
        // Partially decoded data is kept on end of packet.
        let r = self.decode_partitions(reader, codebooks, &mut [&mut interleaved[..]], &[false], false);
        for (i, &v) in interleaved.iter().enumerate() {
            vectors[i % channel_count][i / channel_count] = v;
        }
        r
    }

    fn decode_partitions<R: BitRead>(&self,
            reader: &mut R,
            codebooks: &[Codebook],
            vectors: &mut [&mut [f32]],
            do_not_decode: &[bool],
            interleave_vq: bool) -> Result<()> {
        let actual_len = vectors.first().map(|v| v.len()).unwrap_or(0);
        let start = cmp::min(self.start, actual_len);
        let end = cmp::min(self.end, actual_len);
        let parts_to_read = (end - start) / self.part_len;
        if parts_to_read == 0 {
            return Ok(());
        }

        let classbook = &codebooks[self.classbook];
        let classwords_per_codeword = classbook.dim_count();
        let class_count = self.class_codebooks.len();
        let stride = parts_to_read + classwords_per_codeword;
        let mut classes = vec![0; vectors.len() * stride];
        let mut entry = vec![0.0; self.max_dim_count];

        for pass in 0..8 {
            let mut part = 0;
            while part < parts_to_read {
                if pass == 0 {
                    for (ch, classes) in classes.chunks_mut(stride).enumerate() {
                        if do_not_decode[ch] {
                            continue;
                        }
                        let mut temp = classbook.decode_scalar(reader)? as usize;
                        for cw in (0..classwords_per_codeword).rev() {
                            classes[cw + part] = temp % class_count;
                            temp /= class_count;
                        }
                    }
                }

                for _ in 0..classwords_per_codeword {
                    if part >= parts_to_read {
                        break;
                    }
                    for (ch, vector) in vectors.iter_mut().enumerate() {
                        if do_not_decode[ch] {
                            continue;
                        }
                        let class = classes[ch * stride + part];
                        if let Some(book) = self.class_codebooks[class][pass] {
                            let offset = start + part * self.part_len;
                            let part_vector = &mut vector[offset..offset + self.part_len];
                            let codebook = &codebooks[book];
                            if interleave_vq {
                                Self::decode_part_interleaved(reader, codebook, part_vector, &mut entry)?;
                            } else {
                                Self::decode_part(reader, codebook, part_vector, &mut entry)?;
                            }
                        }
                    }
                    part += 1;
                }
            }
        }

        Ok(())
    }

    /// Residue 0 layout: the dimensions of each vector are spread over the partition.
    fn decode_part_interleaved<R: BitRead>(reader: &mut R, codebook: &Codebook,
            result: &mut [f32], entry: &mut [f32]) -> Result<()> {
        let dim_count = codebook.dim_count();
        let step = result.len() / dim_count;
        for i in 0..step {
            codebook.decode_vq(reader, entry)?;
            for (j, &v) in entry[..dim_count].iter().enumerate() {
                result[i + j * step] += v;
            }
        }
        Ok(())
    }

    /// Residue 1 layout: vectors are laid out one after another.
    fn decode_part<R: BitRead>(reader: &mut R, codebook: &Codebook,
            result: &mut [f32], entry: &mut [f32]) -> Result<()> {
        let dim_count = codebook.dim_count();
        for chunk in result.chunks_mut(dim_count) {
            codebook.decode_vq(reader, entry)?;
            for (r, &v) in chunk.iter_mut().zip(entry.iter()) {
                *r += v;
            }
        }
        Ok(())
    }
}
