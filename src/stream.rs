use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::mem;

use crate::comment::Comments;
use crate::config::Config;
use crate::decoder::{Decoder, DecoderBuilder, PcmBlock};
use crate::demux::{Demuxer, Packet};
use crate::error::{Error, Result};
use crate::header::{Format, Header};
use crate::setup::PacketKind;

/// Outcome of `StreamDecoder::next_event()`.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// All three headers have been parsed.
    Ready(Format),
    /// Decoded samples.
    Audio(PcmBlock),
    /// An audio packet couldn't be decoded and `block` was substituted for it. The block is
    /// empty if the packet didn't tell its size.
    Silence {
        error: Error,
        block: PcmBlock,
    },
    /// Container level discontinuity: data is lost but decoding continues.
    Hole(Error),
    /// The end-of-stream packet has been decoded.
    EndOfStream,
}

#[derive(Debug)]
enum State {
    Headers(DecoderBuilder),
    Audio(Decoder),
    Ended,
    Failed(Error),
}

/// Decodes the Vorbis stream of an Ogg byte stream.
///
/// Bytes are appended with `feed()` as they become available, events are pulled with
/// `next_event()`. The first logical stream that starts with a Vorbis identification header is
/// decoded, other multiplexed streams are ignored.
///
/// # Example
///
/// ```rust,no_run
/// use oggvorbis::{Config, Event, StreamDecoder};
///
/// let mut decoder = StreamDecoder::new(Config::default());
/// decoder.feed(&[]); // Replace with real data.
/// while let Some(event) = decoder.next_event().expect("Fatal error") {
///     match event {
///         Event::Audio(block) => println!("{} frames", block.frames()),
///         Event::EndOfStream => break,
///         _ => {}
///     }
/// }
/// ```
#[derive(Debug)]
pub struct StreamDecoder {
    config: Config,
    demuxer: Demuxer,
    serial: Option<u32>,
    state: State,
    events: VecDeque<Event>,
    /// Last audio event, held back until it is known whether the stream ends after it.
    held: Option<Event>,
    position: u64,
}

impl StreamDecoder {
    pub fn new(config: Config) -> Self {
        StreamDecoder {
            demuxer: Demuxer::with_options(config.demux_options()),
            serial: None,
            state: State::Headers(DecoderBuilder::with_config(config)),
            events: VecDeque::new(),
            held: None,
            position: 0,
            config,
        }
    }

    /// Appends input bytes. Input is ignored after the end of stream or a fatal error.
    pub fn feed(&mut self, bytes: &[u8]) {
        match self.state {
            State::Ended | State::Failed(_) => trace!("Ignoring {} bytes of input", bytes.len()),
            _ => self.demuxer.push(bytes),
        }
    }

    /// Returns the next event or `Ok(None)` if more input is needed.
    ///
    /// After `Event::EndOfStream` returns `Error::Eof`. Fatal errors are returned on every
    /// subsequent call.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Ok(Some(event));
            }
            match self.state {
                State::Ended => return Err(Error::Eof),
                State::Failed(ref e) => return Err(e.clone()),
                _ => {}
            }
            match self.demuxer.next_packet() {
                None => return Ok(None),
                Some(Ok(packet)) => self.process_packet(packet)?,
                Some(Err(e)) => self.process_hole(e),
            }
        }
    }

    /// Signals that no more input will be fed. The last decoded block is released even though
    /// the end-of-stream page is missing.
    pub fn finish(&mut self) {
        self.release_held(None);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serial number of the selected logical stream.
    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    pub fn header(&self) -> Option<&Header> {
        match self.state {
            State::Headers(ref b) => b.header(),
            State::Audio(ref d) => Some(d.header()),
            _ => None,
        }
    }

    pub fn comments(&self) -> Option<&Comments> {
        match self.state {
            State::Headers(ref b) => b.comments(),
            State::Audio(ref d) => Some(d.comments()),
            _ => None,
        }
    }

    pub fn format(&self) -> Option<Format> {
        self.header().map(|h| h.format())
    }

    /// Number of frames (samples per channel) returned in events so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn process_hole(&mut self, error: Error) {
        let serial = match error {
            Error::ContinuationMismatch { serial } |
            Error::SequenceGap { serial, .. } => Some(serial),
            _ => None,
        };
        match (serial, self.serial) {
            (Some(s), Some(selected)) if s != selected => {
                trace!("Ignoring discontinuity in stream {:#010x}: {}", s, error);
            }
            _ => {
                self.release_held(None);
                self.events.push_back(Event::Hole(error));
            }
        }
    }

    fn process_packet(&mut self, packet: Packet) -> Result<()> {
        match self.serial {
            Some(serial) if serial != packet.serial() => return Ok(()),
            Some(_) => {}
            None => {
                if !packet.is_bos() || PacketKind::of_header(packet.data()) != Ok(PacketKind::Ident) {
                    trace!("Skipping packet of stream {:#010x}", packet.serial());
                    return Ok(());
                }
                debug!("Selected Vorbis stream {:#010x}", packet.serial());
                self.serial = Some(packet.serial());
            }
        }

        match self.state {
            State::Headers(ref mut builder) => {
                if let Err(e) = builder.headerin(packet.data()) {
                    warn!("Bad header packet: {}", e);
                    self.state = State::Failed(e.clone());
                    return Err(e);
                }
                if builder.is_complete() {
                    if let State::Headers(builder) = mem::replace(&mut self.state, State::Ended) {
                        match builder.build() {
                            Ok(decoder) => {
                                self.events.push_back(Event::Ready(decoder.header().format()));
                                self.state = State::Audio(decoder);
                            }
                            Err(e) => {
                                self.state = State::Failed(e.clone());
                                return Err(e);
                            }
                        }
                    }
                }
            }
            State::Audio(ref mut decoder) => {
                if packet.is_empty() {
                    trace!("Skipping empty packet");
                } else {
                    let result = decoder.decode_packet(packet.data()).map(|_| ());
                    let block = decoder.samples().to_block();
                    let event = match result {
                        Ok(()) => Event::Audio(block),
                        Err(error) => {
                            warn!("Replacing undecodable packet with silence: {}", error);
                            Event::Silence { error, block }
                        }
                    };
                    self.push_audio(event);
                }
            }
            State::Ended | State::Failed(_) => return Ok(()),
        }

        if packet.is_eos() {
            self.release_held(packet.granule_pos());
            debug!("End of stream {:#010x} at position {}", packet.serial(), self.position);
            self.events.push_back(Event::EndOfStream);
            self.state = State::Ended;
        }
        Ok(())
    }

    fn push_audio(&mut self, event: Event) {
        self.release_held(None);
        match event {
            Event::Audio(ref block) if block.is_empty() => {}
            event => self.held = Some(event),
        }
    }

    /// Emits the held audio event. At the end of stream `end_pos` is the final granule position:
    /// samples past it are cut off.
    fn release_held(&mut self, end_pos: Option<u64>) {
        let mut event = match self.held.take() {
            Some(event) => event,
            None => return,
        };
        if let Event::Audio(ref mut block) | Event::Silence { ref mut block, .. } = event {
            if let Some(end_pos) = end_pos {
                if self.position + block.frames() as u64 > end_pos {
                    let frames = end_pos.saturating_sub(self.position);
                    trace!("Trimming final block from {} to {} frames", block.frames(), frames);
                    block.truncate(frames as usize);
                }
            }
            self.position += block.frames() as u64;
        }
        match event {
            Event::Audio(ref block) if block.is_empty() => {}
            event => self.events.push_back(event),
        }
    }
}
