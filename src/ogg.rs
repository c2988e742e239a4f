//! Ogg page model and parser. See [RFC 3533](https://tools.ietf.org/html/rfc3533) for the
//! page layout.

use crate::crc;
use crate::error::{Error, Result};

pub const CAPTURE_PATTERN: [u8; 4] = *b"OggS";
pub const HEADER_LEN: usize = 27;
pub const MAX_SEGMENT_LEN: usize = 255;
/// Length of a page with 255 segments of 255 bytes. No page is longer, so a reader never needs
/// more buffered input than this to complete the page at a capture pattern.
pub const MAX_PAGE_LEN: usize = HEADER_LEN + 255 + 255 * MAX_SEGMENT_LEN;

const CHECKSUM_OFFSET: usize = 22;

/// Page header type flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PageFlags(u8);

impl PageFlags {
    pub const CONTINUED: u8 = 0x01;
    pub const FIRST: u8 = 0x02;
    pub const LAST: u8 = 0x04;

    pub fn from_bits(bits: u8) -> Self {
        PageFlags(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// The first packet on the page is a continuation of a packet started on a previous page.
    pub fn is_continued(self) -> bool {
        self.0 & Self::CONTINUED != 0
    }

    /// Beginning of stream.
    pub fn is_first(self) -> bool {
        self.0 & Self::FIRST != 0
    }

    /// End of stream.
    pub fn is_last(self) -> bool {
        self.0 & Self::LAST != 0
    }
}

#[derive(Clone, Debug)]
pub struct Page {
    version: u8,
    flags: PageFlags,
    granule_pos: u64,
    serial: u32,
    sequence: u32,
    checksum: u32,
    segments: Box<[u8]>,
    payload: Box<[u8]>,
}

impl Page {
    /// Parses a page starting at the beginning of `buf`. Returns `Ok(None)` if `buf` doesn't hold
    /// the whole page yet, otherwise the page and the number of bytes it occupies.
    /// The checksum is not verified here, see `compute_checksum()`.
    pub fn parse(buf: &[u8]) -> Result<Option<(Page, usize)>> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }
        if buf[..4] != CAPTURE_PATTERN {
            return Err(Error::CorruptPage("Missing capture pattern"));
        }
        let version = buf[4];
        if version != 0 {
            return Err(Error::CorruptPage("Unsupported page version"));
        }
        let segment_count = buf[26] as usize;
        let segments_end = HEADER_LEN + segment_count;
        if buf.len() < segments_end {
            return Ok(None);
        }
        let segments = &buf[HEADER_LEN..segments_end];
        let payload_len: usize = segments.iter().map(|&s| s as usize).sum();
        let len = segments_end + payload_len;
        debug_assert!(len <= MAX_PAGE_LEN);
        if buf.len() < len {
            return Ok(None);
        }

        let page = Page {
            version,
            flags: PageFlags(buf[5]),
            granule_pos: u64_le(&buf[6..14]),
            serial: u32_le(&buf[14..18]),
            sequence: u32_le(&buf[18..22]),
            checksum: u32_le(&buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4]),
            segments: segments.into(),
            payload: buf[segments_end..len].into(),
        };
        Ok(Some((page, len)))
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn flags(&self) -> PageFlags {
        self.flags
    }

    /// Granule position of the last packet completed on this page, `None` if no packet
    /// completes here.
    pub fn granule_pos(&self) -> Option<u64> {
        if self.granule_pos == u64::MAX {
            None
        } else {
            Some(self.granule_pos)
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Checksum stored in the page header.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Lacing values.
    pub fn segments(&self) -> &[u8] {
        &self.segments
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Computes the checksum over the header with the checksum field zeroed, the segment table
    /// and the payload.
    pub fn compute_checksum(&self) -> u32 {
        let mut header = [0; HEADER_LEN];
        header[..4].copy_from_slice(&CAPTURE_PATTERN);
        header[4] = self.version;
        header[5] = self.flags.0;
        header[6..14].copy_from_slice(&self.granule_pos.to_le_bytes());
        header[14..18].copy_from_slice(&self.serial.to_le_bytes());
        header[18..22].copy_from_slice(&self.sequence.to_le_bytes());
        header[26] = self.segments.len() as u8;

        let crc = crc::update(0, &header);
        let crc = crc::update(crc, &self.segments);
        crc::update(crc, &self.payload)
    }

    /// Splits the payload into packet pieces according to the lacing values.
    pub fn pieces(&self) -> Pieces {
        Pieces {
            segments: &self.segments,
            payload: &self.payload,
        }
    }
}

/// Part of a packet contained in a single page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Piece<'a> {
    pub data: &'a [u8],
    /// Whether the packet ends in this piece. The last piece of a page is unterminated if the
    /// packet continues on the next page.
    pub terminated: bool,
}

pub struct Pieces<'a> {
    segments: &'a [u8],
    payload: &'a [u8],
}

impl<'a> Iterator for Pieces<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.segments.is_empty() {
            return None;
        }
        let mut len = 0;
        let mut terminated = false;
        let mut count = 0;
        for &s in self.segments {
            count += 1;
            len += s as usize;
            if (s as usize) < MAX_SEGMENT_LEN {
                terminated = true;
                break;
            }
        }
        self.segments = &self.segments[count..];
        let (data, rest) = self.payload.split_at(len);
        self.payload = rest;
        Some(Piece { data, terminated })
    }
}

fn u32_le(b: &[u8]) -> u32 {
    let mut a = [0; 4];
    a.copy_from_slice(b);
    u32::from_le_bytes(a)
}

fn u64_le(b: &[u8]) -> u64 {
    let mut a = [0; 8];
    a.copy_from_slice(b);
    u64::from_le_bytes(a)
}
