use crate::demux::DemuxOptions;

/// Construction parameters of a decoding session.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Identification headers declaring more channels are rejected.
    pub max_channels: usize,
    /// Identification headers declaring a higher sample rate are rejected.
    pub max_sample_rate: u32,
    /// Require well-formed comment headers: framing bit present, entries UTF-8 with a `=`.
    pub strict: bool,
    /// Apply the Vorbis end-of-packet rule to audio packets that end inside floor or residue
    /// data: the missing part decodes as zero. Otherwise such packets are a decode error and
    /// are replaced with silence.
    pub lenient_packets: bool,
    /// Verify Ogg page checksums.
    pub verify_crc: bool,
}

impl Config {
    pub fn demux_options(&self) -> DemuxOptions {
        DemuxOptions {
            verify_crc: self.verify_crc,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_channels: 255,
            max_sample_rate: u32::MAX,
            strict: false,
            lenient_packets: false,
            verify_crc: true,
        }
    }
}
