//! Synthetic Ogg Vorbis streams for integration tests.
//!
//! The setup header describes a minimal codec: floor 1 with the two mandatory posts only,
//! residue 1 over the first `RESIDUE_END` coefficients in partitions of `PART_LEN` where each
//! coefficient is -1 or 1, and a short and a long mode. Stereo streams couple the two channels.

#![allow(dead_code)]

use oggvorbis::{crc, Config, Error, Event, StreamDecoder};

pub const SHORT_LEN: usize = 256;
pub const LONG_LEN: usize = 2048;
pub const RESIDUE_END: usize = 128;
pub const PART_LEN: usize = 8;

/// Vorbis float values.
const MINUS_ONE: u32 = 0xE010_0000;
const TWO: u32 = 0x6030_0000;

/// Packs values least significant bit first.
#[derive(Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, value: u32, len_bits: usize) -> &mut Self {
        for i in 0..len_bits {
            if self.bit % 8 == 0 {
                self.buf.push(0);
            }
            if value >> i & 1 != 0 {
                *self.buf.last_mut().unwrap() |= 1 << (self.bit % 8);
            }
            self.bit += 1;
        }
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.write(b as u32, 8);
        }
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn header_start(kind: u8) -> BitWriter {
    let mut w = BitWriter::new();
    w.write(kind as u32, 8).write_bytes(b"vorbis");
    w
}

pub fn ident_packet(channels: u8, sample_rate: u32) -> Vec<u8> {
    let mut w = header_start(1);
    w.write(0, 32).write(channels as u32, 8).write(sample_rate, 32)
        .write(0, 32).write(96_000, 32).write(0, 32)
        .write(8, 4).write(11, 4).write(1, 1);
    w.into_bytes()
}

pub fn comment_packet(vendor: &str, comments: &[&str]) -> Vec<u8> {
    let mut w = header_start(3);
    w.write(vendor.len() as u32, 32).write_bytes(vendor.as_bytes());
    w.write(comments.len() as u32, 32);
    for c in comments {
        w.write(c.len() as u32, 32).write_bytes(c.as_bytes());
    }
    w.write(1, 1);
    w.into_bytes()
}

fn write_codebook_header(w: &mut BitWriter, dims: u32, lens: &[u32]) {
    w.write_bytes(&[0x42, 0x43, 0x56]).write(dims, 16).write(lens.len() as u32, 24);
    // Unordered, not sparse.
    w.write(0, 1).write(0, 1);
    for &len in lens {
        w.write(len - 1, 5);
    }
}

/// Setup header. `codeword_lens` are the lengths of the codewords of the scalar codebook.
pub fn setup_packet_with(channels: u8, codeword_lens: &[u32]) -> Vec<u8> {
    let mut w = header_start(5);
    w.write(1, 8);

    // Codebook 0: classifications.
    write_codebook_header(&mut w, 1, codeword_lens);
    w.write(0, 4);

    // Codebook 1: -1 and 1.
    write_codebook_header(&mut w, 1, &[1, 1]);
    w.write(1, 4).write(MINUS_ONE, 32).write(TWO, 32).write(0, 4).write(0, 1);
    w.write(0, 1).write(1, 1);

    // Time domain transforms.
    w.write(0, 6).write(0, 16);

    // Floor 1 with no partitions, multiplier 1, posts at 0 and 128.
    w.write(0, 6).write(1, 16).write(0, 5).write(0, 2).write(7, 4);

    // Residue 1: two classifications, the second one uses codebook 1.
    w.write(0, 6).write(1, 16)
        .write(0, 24).write(RESIDUE_END as u32, 24).write(PART_LEN as u32 - 1, 24)
        .write(1, 6).write(0, 8);
    w.write(0, 3).write(0, 1);
    w.write(1, 3).write(0, 1);
    w.write(1, 8);

    // Mapping 0.
    w.write(0, 6).write(0, 16).write(0, 1);
    if channels == 2 {
        w.write(1, 1).write(0, 8).write(0, 1).write(1, 1);
    } else {
        w.write(0, 1);
    }
    w.write(0, 2);
    w.write(0, 8).write(0, 8).write(0, 8);

    // Short and long modes.
    w.write(1, 6);
    for block_flag in 0..2 {
        w.write(block_flag, 1).write(0, 16).write(0, 16).write(0, 8);
    }

    w.write(1, 1);
    w.into_bytes()
}

pub fn setup_packet(channels: u8) -> Vec<u8> {
    setup_packet_with(channels, &[1, 1])
}

pub fn frame_len(long: bool) -> usize {
    if long {
        LONG_LEN
    } else {
        SHORT_LEN
    }
}

/// Number of samples finished by a packet following a packet of the other size.
pub fn finished_len(prev_long: bool, long: bool) -> u64 {
    (frame_len(prev_long) / 4 + frame_len(long) / 4) as u64
}

/// Audio packet. `None` channels have unused floor. Spectrum values are -1, 0 or 1, each
/// partition of `PART_LEN` is either all zero or has no zeros.
pub fn audio_packet(long: bool, spectra: &[Option<&[i8]>]) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write(0, 1).write(long as u32, 1);
    if long {
        w.write(0, 2);
    }
    for s in spectra {
        match s {
            Some(_) => w.write(1, 1).write(255, 8).write(255, 8),
            None => w.write(0, 1),
        };
    }

    let any_used = spectra.iter().any(|s| s.is_some());
    let coupled = spectra.len() == 2;
    let decoded: Vec<Option<&[i8]>> = spectra.iter()
        .map(|s| match s {
            Some(s) => Some(*s),
            None if coupled && any_used => Some(&[][..]),
            None => None,
        })
        .collect();

    for part in 0..RESIDUE_END / PART_LEN {
        let range = part * PART_LEN..(part + 1) * PART_LEN;
        let values: Vec<Option<&[i8]>> = decoded.iter()
            .map(|s| s.map(|s| s.get(range.clone()).unwrap_or(&[])))
            .collect();
        for v in values.iter().flatten() {
            let class = v.iter().any(|&x| x != 0);
            w.write(class as u32, 1);
        }
        for v in values.iter().flatten() {
            if v.iter().any(|&x| x != 0) {
                for &x in v.iter() {
                    assert!(x == 1 || x == -1);
                    w.write((x > 0) as u32, 1);
                }
            }
        }
    }
    w.into_bytes()
}

/// Packet with all floors unused.
pub fn silent_packet(long: bool, channels: usize) -> Vec<u8> {
    audio_packet(long, &vec![None; channels])
}

pub mod page_flags {
    pub const CONTINUED: u8 = 0x01;
    pub const FIRST: u8 = 0x02;
    pub const LAST: u8 = 0x04;
}

/// Writes pages of a single logical stream.
pub struct OggWriter {
    serial: u32,
    sequence: u32,
    bytes: Vec<u8>,
}

impl OggWriter {
    pub fn new(serial: u32) -> Self {
        OggWriter {
            serial,
            sequence: 0,
            bytes: Vec::new(),
        }
    }

    /// Writes a page holding complete `packets`.
    pub fn page(&mut self, flags: u8, granule_pos: u64, packets: &[&[u8]]) -> &mut Self {
        let mut lacing = Vec::new();
        for p in packets {
            lacing.extend(std::iter::repeat(255).take(p.len() / 255));
            lacing.push((p.len() % 255) as u8);
        }
        assert!(lacing.len() <= 255);

        let start = self.bytes.len();
        self.bytes.extend_from_slice(b"OggS");
        self.bytes.push(0);
        self.bytes.push(flags);
        self.bytes.extend_from_slice(&granule_pos.to_le_bytes());
        self.bytes.extend_from_slice(&self.serial.to_le_bytes());
        self.bytes.extend_from_slice(&self.sequence.to_le_bytes());
        self.bytes.extend_from_slice(&[0; 4]);
        self.bytes.push(lacing.len() as u8);
        self.bytes.extend_from_slice(&lacing);
        for p in packets {
            self.bytes.extend_from_slice(p);
        }
        let checksum = crc::checksum(&self.bytes[start..]);
        self.bytes[start + 22..start + 26].copy_from_slice(&checksum.to_le_bytes());

        self.sequence += 1;
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Audio packet along with its block size.
pub struct Audio {
    pub long: bool,
    pub data: Vec<u8>,
}

impl Audio {
    pub fn silent(long: bool, channels: usize) -> Self {
        Audio {
            long,
            data: silent_packet(long, channels),
        }
    }
}

/// Granule position after each of the packets.
pub fn granule_positions(audio: &[Audio]) -> Vec<u64> {
    let mut pos = 0;
    let mut prev: Option<bool> = None;
    audio.iter()
        .map(|a| {
            if let Some(prev) = prev {
                pos += finished_len(prev, a.long);
            }
            prev = Some(a.long);
            pos
        })
        .collect()
}

/// Complete stream with the headers on two pages and each audio packet on its own page.
/// `final_granule_pos` overrides the granule position of the last page.
pub fn vorbis_stream(serial: u32, channels: u8, sample_rate: u32,
        audio: &[Audio], final_granule_pos: Option<u64>) -> Vec<u8> {
    let mut w = OggWriter::new(serial);
    w.page(page_flags::FIRST, 0, &[&ident_packet(channels, sample_rate)[..]]);
    w.page(0, 0, &[&comment_packet("synthetic", &["TITLE=Test"])[..], &setup_packet(channels)[..]]);
    let granules = granule_positions(audio);
    for (i, (a, &g)) in audio.iter().zip(granules.iter()).enumerate() {
        let last = i + 1 == audio.len();
        let (flags, g) = if last {
            (page_flags::LAST, final_granule_pos.unwrap_or(g))
        } else {
            (0, g)
        };
        w.page(flags, g, &[&a.data[..]]);
    }
    w.into_bytes()
}

/// Vorbis inverse MDCT evaluated directly.
pub fn imdct_slow(spectrum: &[f64], n: usize) -> Vec<f64> {
    use std::f64::consts::PI;
    (0..n)
        .map(|i| {
            spectrum.iter().enumerate()
                .map(|(k, &x)| {
                    let n = n as f64;
                    x * (PI / 2.0 / n * (2.0 * i as f64 + 1.0 + n / 2.0) * (2.0 * k as f64 + 1.0)).cos()
                })
                .sum()
        })
        .collect()
}

/// Vorbis window of a block of length `n` between blocks of lengths `prev_n` and `next_n`.
pub fn window(n: usize, prev_n: usize, next_n: usize) -> Vec<f64> {
    use std::f64::consts::PI;
    let slope = |x: usize, len: usize| {
        let s = ((x as f64 + 0.5) / len as f64 * PI / 2.0).sin();
        (PI / 2.0 * s * s).sin()
    };
    let mut w = vec![0.0; n];
    let left_len = n.min(prev_n) / 2;
    let left_start = n / 4 - left_len / 2;
    let right_len = n.min(next_n) / 2;
    let right_start = n * 3 / 4 - right_len / 2;
    for (i, v) in w.iter_mut().enumerate() {
        *v = if i < left_start {
            0.0
        } else if i < left_start + left_len {
            slope(i - left_start, left_len)
        } else if i < right_start {
            1.0
        } else if i < right_start + right_len {
            slope(right_len - 1 - (i - right_start), right_len)
        } else {
            0.0
        };
    }
    w
}

/// Reference output of a single channel: overlap-adds the windowed inverse transforms of all
/// blocks and returns the samples from the center of the first block to the center of the last.
pub fn reference_output(blocks: &[(bool, Vec<f64>)]) -> Vec<f64> {
    let lens: Vec<usize> = blocks.iter().map(|b| frame_len(b.0)).collect();
    let mut offsets = vec![0_usize];
    for i in 1..blocks.len() {
        let prev = offsets[i - 1];
        offsets.push(prev + lens[i - 1] * 3 / 4 - lens[i] / 4);
    }
    let total = offsets.last().unwrap() + lens.last().unwrap();
    let mut signal = vec![0.0; total];
    for (i, (_, spectrum)) in blocks.iter().enumerate() {
        let n = lens[i];
        let prev_n = if i > 0 { lens[i - 1] } else { n };
        let next_n = if i + 1 < blocks.len() { lens[i + 1] } else { n };
        let w = window(n, prev_n, next_n);
        let y = imdct_slow(spectrum, n);
        for j in 0..n {
            signal[offsets[i] + j] += w[j] * y[j];
        }
    }
    let start = offsets[0] + lens[0] / 2;
    let end = offsets.last().unwrap() + lens.last().unwrap() / 2;
    signal[start..end].to_vec()
}

/// Deterministic spectrum of `RESIDUE_END` values with every other partition zero.
pub fn spectrum(seed: u32) -> Vec<i8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..RESIDUE_END)
        .map(|i| {
            if (i / PART_LEN) % 2 == (seed as usize % 2) {
                0
            } else {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                if state & 1 == 0 { 1 } else { -1 }
            }
        })
        .collect()
}

/// Splits a byte stream into its pages.
pub fn pages(mut bytes: &[u8]) -> Vec<&[u8]> {
    let mut r = Vec::new();
    while bytes.len() >= 27 {
        let segment_count = bytes[26] as usize;
        let payload_len: usize = bytes[27..27 + segment_count].iter().map(|&v| v as usize).sum();
        let len = 27 + segment_count + payload_len;
        r.push(&bytes[..len]);
        bytes = &bytes[len..];
    }
    r
}

/// Feeds `bytes` in chunks of `chunk_len`, then finishes the input, and collects the events.
/// Returns the terminating error if `next_event()` failed.
pub fn run(config: Config, bytes: &[u8], chunk_len: usize) -> (Vec<Event>, Option<Error>) {
    fn drain(decoder: &mut StreamDecoder, events: &mut Vec<Event>) -> Option<Error> {
        loop {
            match decoder.next_event() {
                Ok(Some(e)) => events.push(e),
                Ok(None) => return None,
                Err(e) => return Some(e),
            }
        }
    }

    let mut decoder = StreamDecoder::new(config);
    let mut events = Vec::new();
    for chunk in bytes.chunks(chunk_len) {
        decoder.feed(chunk);
        if let Some(e) = drain(&mut decoder, &mut events) {
            return (events, Some(e));
        }
    }
    decoder.finish();
    let err = drain(&mut decoder, &mut events);
    (events, err)
}

/// Total frames of the audio events.
pub fn audio_frames(events: &[Event]) -> u64 {
    events.iter()
        .map(|e| match e {
            Event::Audio(b) | Event::Silence { block: b, .. } => b.frames() as u64,
            _ => 0,
        })
        .sum()
}
