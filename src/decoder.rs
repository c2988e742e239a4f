use log::trace;
use std::mem;

use crate::bitstream::{BitRead, BitReader};
use crate::comment::Comments;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::floor::FloorState;
use crate::header::{FrameKind, Header};
use crate::mdct::Mdct;
use crate::setup::{self, Headers, PacketKind, Setup};
use crate::util::Bits;
use crate::window::{OverlapTarget, WindowRange, Windows};

/// Low-level Vorbis decoder.
///
/// Decodes Vorbis audio packets into audio samples. The decoder works directly with Vorbis
/// packet data extracted from a container. See `StreamDecoder` for decoding of Ogg streams.
///
/// # Example
/// See [crate reference](index.html).
#[derive(Debug)]
pub struct Decoder {
    header: Header,
    comments: Comments,
    setup: Setup,
    config: Config,
    windows: Windows,
    mdct: [Mdct; 2],

    floor_states: Box<[FloorState]>,
    prev_frame: Box<[Box<[f32]>]>,
    prev_frame_kind: Option<FrameKind>,
    frame: Box<[Box<[f32]>]>,
    frame_kind: Option<FrameKind>,
    pos: u64,
}

impl Decoder {
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::with_config(Config::default())
    }

    pub fn new(headers: Headers, config: Config) -> Self {
        let Headers { header, comments, setup } = headers;
        let frame_lens = header.frame_lens();
        let channel_count = header.channel_count();

        let new_frame = || (0..channel_count)
            .map(|_| vec![0_f32; frame_lens.long()].into_boxed_slice())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Decoder {
            windows: Windows::new(frame_lens),
            mdct: [Mdct::new(frame_lens.short()), Mdct::new(frame_lens.long())],
            floor_states: (0..channel_count).map(|_| FloorState::default()).collect(),
            prev_frame: new_frame(),
            prev_frame_kind: None,
            frame: new_frame(),
            frame_kind: None,
            pos: 0,
            header,
            comments,
            setup,
            config,
        }
    }

    /// Decodes an audio packet. If this is the first audio packet (either for a newly initialized
    /// decoder instance or after a call to `reset()`) the returned samples are empty.
    ///
    /// If the packet can't be decoded after its block size is known, the block is replaced with
    /// silence and the error is returned. `samples()` then holds the substituted block.
    pub fn decode<R: BitRead>(&mut self, reader: &mut R) -> Result<Samples> {
        self.swap_frames();

        let is_audio = match reader.read_bool() {
            Ok(v) => !v,
            Err(Error::Truncated) => return Err(Error::DecodeError("Empty audio packet")),
            Err(e) => return Err(e),
        };
        if !is_audio {
            return Err(Error::NotAudio);
        }

        let mode_count = self.setup.modes().len();
        let mode_bits = (mode_count as u32 - 1).bit_len();
        let mode_idx = reader.read_u32_bits(mode_bits)
            .map_err(|_| Error::DecodeError("Truncated audio packet"))? as usize;
        let frame_kind = match self.setup.modes().get(mode_idx) {
            Some(mode) => mode.frame_kind(),
            None => return Err(Error::DecodeError("Invalid mode number")),
        };
        let frame_len = self.header.frame_lens().get(frame_kind);
        trace!("Audio packet: mode {}, frame length {}", mode_idx, frame_len);

        let result = self.decode_frame(reader, mode_idx);
        match result {
            Ok(()) => {
                let mdct = &self.mdct[frame_kind as usize];
                for channel in self.frame.iter_mut() {
                    mdct.inverse(&mut channel[..mdct.len()]);
                }
            }
            Err(_) => {
                for channel in self.frame.iter_mut().chain(self.prev_frame.iter_mut()) {
                    channel.iter_mut().for_each(|s| *s = 0.0);
                }
            }
        }

        if let Some(prev_frame_kind) = self.prev_frame_kind {
            for (l, r) in self.prev_frame.iter_mut().zip(self.frame.iter_mut()) {
                self.windows.overlap(prev_frame_kind, frame_kind, l, r);
            }
            self.pos += self.windows.get(prev_frame_kind, frame_kind).len() as u64;
        }
        self.frame_kind = Some(frame_kind);

        match result {
            Ok(()) => Ok(self.samples()),
            Err(Error::Truncated) => Err(Error::DecodeError("Truncated audio packet")),
            Err(e) => Err(e),
        }
    }

    /// Decodes an audio packet held in `packet`.
    pub fn decode_packet(&mut self, packet: &[u8]) -> Result<Samples> {
        self.decode(&mut BitReader::new(packet))
    }

    /// Decodes the spectrum of all channels into the first half of `frame`.
    fn decode_frame<R: BitRead>(&mut self, reader: &mut R, mode_idx: usize) -> Result<()> {
        let strict = !self.config.lenient_packets;
        let setup = &self.setup;
        let codebooks = setup.codebooks();
        let mode = &setup.modes()[mode_idx];
        let frame_kind = mode.frame_kind();

        if frame_kind == FrameKind::Long {
            // Previous and next window flags. The window shape is selected from the actual
            // neighbours.
            reader.read_bool()?;
            reader.read_bool()?;
        }

        let half_len = self.header.frame_lens().get(frame_kind) / 2;
        let mapping = &setup.mappings()[mode.mapping()];

        for (channel, state) in self.floor_states.iter_mut().enumerate() {
            let floor = &setup.floors()[mapping.submap_of(channel).floor()];
            floor.begin_decode(state, reader, codebooks, strict)?;
        }

        let mut no_residue: Vec<_> = self.floor_states.iter().map(|s| !s.is_used()).collect();
        mapping.unzero_coupled_channels(&mut no_residue);

        for submap in mapping.submaps() {
            let channels = submap.channels();
            let mut vectors: Vec<&mut [f32]> = self.frame.iter_mut()
                .enumerate()
                .filter(|(i, _)| channels.contains(i))
                .map(|(_, c)| &mut c[..half_len])
                .collect();
            let do_not_decode: Vec<_> = channels.iter().map(|&c| no_residue[c]).collect();
            let residue = &setup.residues()[submap.residue()];
            residue.decode(reader, codebooks, &mut vectors, &do_not_decode, strict)?;
        }

        mapping.decouple_channels(&mut self.frame, half_len);

        for (channel, (result, state)) in self.frame.iter_mut()
                .zip(self.floor_states.iter())
                .enumerate() {
            let result = &mut result[..half_len];
            if state.is_used() {
                let floor = &setup.floors()[mapping.submap_of(channel).floor()];
                floor.finish_decode(result, state, frame_kind);
            } else {
                result.iter_mut().for_each(|s| *s = 0.0);
            }
        }

        Ok(())
    }

    /// Resets this decoder's state as it would be after a newly initialized decoder instance.
    pub fn reset(&mut self) {
        self.prev_frame_kind = None;
        self.frame_kind = None;
        self.pos = 0;
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn comments(&self) -> &Comments {
        &self.comments
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Samples finished by the last decoded packet.
    pub fn samples(&self) -> Samples {
        match (self.prev_frame_kind, self.frame_kind) {
            (Some(prev_frame_kind), Some(frame_kind)) => {
                let window = self.windows.get(prev_frame_kind, frame_kind);
                match window.overlap_target {
                    OverlapTarget::Left => Samples { frame: &self.prev_frame, range: window.left },
                    OverlapTarget::Right => Samples { frame: &self.frame, range: window.right },
                }
            }
            _ => Samples { frame: &self.frame, range: WindowRange::default() },
        }
    }

    /// Returns sample position: the number of samples per channel this decoder produced so far.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    fn swap_frames(&mut self) {
        if self.frame_kind.is_some() {
            mem::swap(&mut self.frame, &mut self.prev_frame);
            self.prev_frame_kind = self.frame_kind;
            self.frame_kind = None;
        }
    }
}

/// Contains decoded sample data for all channels returned by the `Decoder::decode()` method.
pub struct Samples<'a> {
    frame: &'a [Box<[f32]>],
    range: WindowRange,
}

impl<'a> Samples<'a> {
    /// Returns the number of samples each channel has.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Returns iterator over the samples in all channels interleaved.
    pub fn interleaved(&self) -> InterleavedSamplesIter<'a> {
        InterleavedSamplesIter {
            frame: self.frame,
            range: self.range,
            pos: (0, self.range.start),
        }
    }

    /// Returns the number of channels. This is the same as `Header::channel_count()`.
    pub fn channel_count(&self) -> usize {
        self.frame.len()
    }

    /// Returns iterator over the samples for each channel in order.
    pub fn channels(&self) -> ChannelIter<'a> {
        ChannelIter {
            frame_iter: self.frame.iter(),
            range: self.range,
        }
    }

    /// Returns samples slice for the specified zero-based channel index.
    pub fn channel(&self, index: usize) -> &'a [f32] {
        &self.frame[index][self.range.start..self.range.end]
    }

    /// Copies the samples into an interleaved block.
    pub fn to_block(&self) -> PcmBlock {
        PcmBlock::new(self.channel_count(), self.interleaved().collect())
    }
}

pub struct ChannelIter<'a> {
    frame_iter: std::slice::Iter<'a, Box<[f32]>>,
    range: WindowRange,
}

impl<'a> Iterator for ChannelIter<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        self.frame_iter.next().map(|c| &c[self.range.start..self.range.end])
    }
}

pub struct InterleavedSamplesIter<'a> {
    frame: &'a [Box<[f32]>],
    range: WindowRange,
    /// (channel, sample)
    pos: (usize, usize),
}

impl<'a> Iterator for InterleavedSamplesIter<'a> {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos.1 >= self.range.end || self.frame.is_empty() {
            return None;
        }
        let r = self.frame[self.pos.0][self.pos.1];
        self.pos.0 += 1;
        if self.pos.0 >= self.frame.len() {
            self.pos.0 = 0;
            self.pos.1 += 1;
        }
        Some(r)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.range.end.saturating_sub(self.pos.1) * self.frame.len())
            .saturating_sub(self.pos.0);
        (n, Some(n))
    }
}

impl<'a> ExactSizeIterator for InterleavedSamplesIter<'a> {}

/// Interleaved block of normalized samples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PcmBlock {
    channel_count: usize,
    samples: Vec<f32>,
}

impl PcmBlock {
    pub fn new(channel_count: usize, samples: Vec<f32>) -> Self {
        assert!(channel_count > 0 && samples.len() % channel_count == 0);
        PcmBlock {
            channel_count,
            samples,
        }
    }

    pub fn silence(channel_count: usize, frames: usize) -> Self {
        Self::new(channel_count, vec![0.0; channel_count * frames])
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Number of samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channel_count
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn interleaved(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_interleaved(self) -> Vec<f32> {
        self.samples
    }

    pub fn channel(&self, index: usize) -> impl Iterator<Item=f32> + '_ {
        assert!(index < self.channel_count);
        self.samples.iter().skip(index).step_by(self.channel_count).copied()
    }

    /// Keeps at most `frames` samples per channel.
    pub fn truncate(&mut self, frames: usize) {
        self.samples.truncate(frames * self.channel_count);
    }
}

/// Collects the three header packets and builds a `Decoder`.
#[derive(Debug)]
pub struct DecoderBuilder {
    config: Config,
    header: Option<Header>,
    comments: Option<Comments>,
    setup: Option<Setup>,
}

impl DecoderBuilder {
    pub fn with_config(config: Config) -> Self {
        DecoderBuilder {
            config,
            header: None,
            comments: None,
            setup: None,
        }
    }

    pub fn read_ident_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.header = Some(setup::read_ident_packet(packet, &self.config)?);
        Ok(())
    }

    pub fn read_comment_packet(&mut self, packet: &[u8]) -> Result<()> {
        if self.header.is_none() {
            return Err(Error::BadHeader("Comment header before identification header"));
        }
        self.comments = Some(setup::read_comment_packet(packet, &self.config)?);
        Ok(())
    }

    pub fn read_setup_packet(&mut self, packet: &[u8]) -> Result<()> {
        let header = self.header.as_ref()
            .ok_or(Error::BadHeader("Setup header before identification header"))?;
        self.setup = Some(setup::read_setup_packet(packet, header)?);
        Ok(())
    }

    /// Consumes the next header packet. Headers must arrive in order: identification, comment,
    /// setup. Returns the kind of the consumed header.
    pub fn headerin(&mut self, packet: &[u8]) -> Result<PacketKind> {
        let kind = PacketKind::of_header(packet)?;
        if Some(kind) != self.next_header() {
            return Err(Error::BadHeader("Header packet out of order"));
        }
        match kind {
            PacketKind::Ident => self.read_ident_packet(packet)?,
            PacketKind::Comment => self.read_comment_packet(packet)?,
            PacketKind::Setup => self.read_setup_packet(packet)?,
            PacketKind::Audio => return Err(Error::NotVorbis),
        }
        Ok(kind)
    }

    /// Kind of the header packet expected next or `None` if all headers were read.
    pub fn next_header(&self) -> Option<PacketKind> {
        if self.header.is_none() {
            Some(PacketKind::Ident)
        } else if self.comments.is_none() {
            Some(PacketKind::Comment)
        } else if self.setup.is_none() {
            Some(PacketKind::Setup)
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.next_header().is_none()
    }

    pub fn build(self) -> Result<Decoder> {
        match (self.header, self.comments, self.setup) {
            (Some(header), Some(comments), Some(setup)) => Ok(Decoder::new(
                Headers { header, comments, setup }, self.config)),
            _ => Err(Error::BadHeader("Missing header packets")),
        }
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn comments(&self) -> Option<&Comments> {
        self.comments.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_block() {
        let mut b = PcmBlock::new(2, vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        assert_eq!(b.frames(), 3);
        assert_eq!(b.channel(1).collect::<Vec<_>>(), vec![-1.0, -2.0, -3.0]);
        b.truncate(2);
        assert_eq!(b.interleaved(), &[1.0, -1.0, 2.0, -2.0]);
        b.truncate(5);
        assert_eq!(b.frames(), 2);
        assert!(PcmBlock::silence(2, 0).is_empty());
    }

    #[test]
    fn interleaved_samples() {
        let frame: Vec<Box<[f32]>> = vec![
            vec![0.0, 1.0, 2.0, 3.0].into_boxed_slice(),
            vec![10.0, 11.0, 12.0, 13.0].into_boxed_slice(),
        ];
        let samples = Samples { frame: &frame, range: WindowRange { start: 1, end: 3 } };
        assert_eq!(samples.len(), 2);
        assert_eq!(samples.interleaved().len(), 4);
        assert_eq!(samples.interleaved().collect::<Vec<_>>(), vec![1.0, 11.0, 2.0, 12.0]);
        assert_eq!(samples.channel(1), &[11.0, 12.0]);
        assert_eq!(samples.channels().count(), 2);
        assert_eq!(samples.to_block().channel(0).collect::<Vec<_>>(), vec![1.0, 2.0]);
    }

    #[test]
    fn builder_order() {
        let mut b = Decoder::builder();
        assert_eq!(b.next_header(), Some(PacketKind::Ident));
        assert_eq!(b.headerin(b"\x03vorbis\x00\x00\x00\x00\x00\x00\x00\x00\x01").unwrap_err(),
            Error::BadHeader("Header packet out of order"));
        assert_eq!(b.headerin(b"\x02vorbis").unwrap_err(), Error::NotVorbis);
        assert!(b.read_comment_packet(b"\x03vorbis\x00\x00\x00\x00\x00\x00\x00\x00\x01").is_err());
        assert!(!b.is_complete());
        assert_eq!(b.build().err(), Some(Error::BadHeader("Missing header packets")));
    }
}
