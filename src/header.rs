use log::debug;

use crate::bitstream::BitRead;
use crate::config::Config;
use crate::error::{Error, Result};

const MIN_FRAME_LEN: usize = 64;
const MAX_FRAME_LEN: usize = 8192;

/// Identification header.
#[derive(Clone, Debug)]
pub struct Header {
    channel_count: usize,
    sample_rate: u32,
    bitrates: Bitrates,
    frame_lens: FrameLens,
}

impl Header {
    /// Reads the header body, that is the packet after the packet type and the "vorbis" magic.
    pub fn read<R: BitRead>(reader: &mut R, config: &Config) -> Result<Header> {
        let version = reader.read_u32()?;
        if version != 0 {
            return Err(Error::UnsupportedVersion(version));
        }

        let channel_count = reader.read_u8()? as usize;
        if channel_count == 0 {
            return Err(Error::BadHeader("Invalid channel count"));
        }
        if channel_count > config.max_channels {
            return Err(Error::BadHeader("Channel count exceeds the configured limit"));
        }

        let sample_rate = reader.read_u32()?;
        if sample_rate == 0 {
            return Err(Error::BadHeader("Invalid sample rate"));
        }
        if sample_rate > config.max_sample_rate {
            return Err(Error::BadHeader("Sample rate exceeds the configured limit"));
        }

        let bitrate_max = reader.read_i32()?;
        let bitrate_nom = reader.read_i32()?;
        let bitrate_min = reader.read_i32()?;

        let frame_len_short = 1 << reader.read_u8_bits(4)?;
        if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&frame_len_short) {
            return Err(Error::BadHeader("Invalid short frame length"));
        }
        let frame_len_long = 1 << reader.read_u8_bits(4)?;
        if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&frame_len_long) {
            return Err(Error::BadHeader("Invalid long frame length"));
        }
        if frame_len_long < frame_len_short {
            return Err(Error::BadHeader("Long frame is shorter than short frame"));
        }

        if !reader.read_bool()? {
            return Err(Error::BadHeader("Invalid framing bit"));
        }

        debug!("Identification header: {} channels, {} Hz, frame lengths {}/{}",
            channel_count, sample_rate, frame_len_short, frame_len_long);

        Ok(Header {
            channel_count,
            sample_rate,
            bitrates: Bitrates {
                min: bitrate_min,
                nom: bitrate_nom,
                max: bitrate_max,
            },
            frame_lens: FrameLens {
                short: frame_len_short,
                long: frame_len_long,
            },
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bitrates(&self) -> Bitrates {
        self.bitrates
    }

    pub fn frame_lens(&self) -> FrameLens {
        self.frame_lens
    }

    pub fn format(&self) -> Format {
        Format {
            channels: self.channel_count,
            sample_rate: self.sample_rate,
        }
    }
}

/// Output format of a stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Format {
    pub channels: usize,
    pub sample_rate: u32,
}

/// Bitrate hints. Zero or negative values mean the hint is unset.
#[derive(Clone, Copy, Debug)]
pub struct Bitrates {
    min: i32,
    nom: i32,
    max: i32,
}

impl Bitrates {
    pub fn min(&self) -> Option<i32> {
        Self::hint(self.min)
    }

    pub fn nom(&self) -> Option<i32> {
        Self::hint(self.nom)
    }

    pub fn max(&self) -> Option<i32> {
        Self::hint(self.max)
    }

    fn hint(v: i32) -> Option<i32> {
        if v > 0 {
            Some(v)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameKind {
    Short = 0,
    Long = 1,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameLens {
    short: usize,
    long: usize,
}

impl FrameLens {
    pub fn new(short: usize, long: usize) -> Self {
        assert!(long >= short);
        FrameLens {
            short,
            long,
        }
    }

    pub fn short(&self) -> usize {
        self.short
    }

    pub fn long(&self) -> usize {
        self.long
    }

    pub fn get(&self, kind: FrameKind) -> usize {
        match kind {
            FrameKind::Short => self.short,
            FrameKind::Long => self.long,
        }
    }
}
