//! Ogg demuxer: finds pages in a byte stream, verifies them and reassembles packets per
//! logical stream.

use log::{debug, trace, warn};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::ogg::{Page, CAPTURE_PATTERN};

#[derive(Clone, Copy, Debug)]
pub struct DemuxOptions {
    /// Reject pages whose checksum doesn't match.
    pub verify_crc: bool,
}

impl Default for DemuxOptions {
    fn default() -> Self {
        DemuxOptions {
            verify_crc: true,
        }
    }
}

/// Complete packet of a logical stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    data: Vec<u8>,
    serial: u32,
    page_sequence: u32,
    granule_pos: Option<u64>,
    first_in_stream: bool,
    last_in_stream: bool,
    first_in_page: bool,
    last_in_page: bool,
    continued: bool,
}

impl Packet {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Serial number of the logical stream.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Sequence number of the page the packet was completed in.
    pub fn page_sequence(&self) -> u32 {
        self.page_sequence
    }

    /// Granule position of the page. Only the last packet completed in a page carries it.
    pub fn granule_pos(&self) -> Option<u64> {
        self.granule_pos
    }

    /// Beginning of stream: the first packet of the beginning-of-stream page.
    pub fn is_bos(&self) -> bool {
        self.first_in_stream
    }

    /// End of stream: the last packet of the end-of-stream page. If that page completes no
    /// packet, an empty packet carries the mark.
    pub fn is_eos(&self) -> bool {
        self.last_in_stream
    }

    pub fn is_first_in_page(&self) -> bool {
        self.first_in_page
    }

    pub fn is_last_in_page(&self) -> bool {
        self.last_in_page
    }

    /// The packet started on an earlier page.
    pub fn is_continued(&self) -> bool {
        self.continued
    }
}

#[derive(Debug, Default)]
struct StreamState {
    partial: Option<Vec<u8>>,
    next_sequence: Option<u32>,
    /// Drop continued data until a packet boundary is seen.
    skip_continued: bool,
}

/// Push-style Ogg demuxer.
///
/// Bytes are appended with `push()` (or `feed()`), packets are pulled with `next_packet()`.
/// Container level problems are reported in-line as `Err` items; demuxing continues after them.
#[derive(Debug, Default)]
pub struct Demuxer {
    options: DemuxOptions,
    buf: Vec<u8>,
    start: usize,
    streams: HashMap<u32, StreamState>,
    /// Streams whose end-of-stream page has been seen. Their state is dropped.
    ended: HashSet<u32>,
    queue: VecDeque<Result<Packet>>,
}

impl Demuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DemuxOptions) -> Self {
        Demuxer {
            options,
            ..Default::default()
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        if self.start > 0 && self.start >= self.buf.len() / 2 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Appends `bytes` and returns iterator over the packets that became available.
    pub fn feed(&mut self, bytes: &[u8]) -> Packets {
        self.push(bytes);
        Packets {
            demuxer: self,
        }
    }

    /// Returns the next packet or error, `None` if more input is needed.
    pub fn next_packet(&mut self) -> Option<Result<Packet>> {
        loop {
            if let Some(r) = self.queue.pop_front() {
                return Some(r);
            }
            match self.next_page()? {
                Ok(page) => self.process_page(page),
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Whether the end-of-stream page of the stream `serial` has been seen.
    pub fn is_ended(&self, serial: u32) -> bool {
        self.ended.contains(&serial)
    }

    /// Number of buffered bytes not yet consumed as pages.
    pub fn pending_len(&self) -> usize {
        self.buf.len() - self.start
    }

    fn next_page(&mut self) -> Option<Result<Page>> {
        let buf = &self.buf[self.start..];
        let sync = match buf.windows(CAPTURE_PATTERN.len()).position(|w| w == CAPTURE_PATTERN) {
            Some(pos) => pos,
            None => {
                // Keep a possible prefix of the capture pattern.
                let skip = buf.len().saturating_sub(CAPTURE_PATTERN.len() - 1);
                if skip > 0 {
                    debug!("Skipped {} bytes while looking for capture pattern", skip);
                    self.start += skip;
                }
                return None;
            }
        };
        if sync > 0 {
            debug!("Skipped {} bytes before capture pattern", sync);
            self.start += sync;
        }

        let r = match Page::parse(&self.buf[self.start..]) {
            Ok(None) => return None,
            Ok(Some((page, len))) => {
                if self.options.verify_crc {
                    let computed = page.compute_checksum();
                    if computed != page.checksum() {
                        Err(Error::ChecksumMismatch {
                            stored: page.checksum(),
                            computed,
                        })
                    } else {
                        self.start += len;
                        Ok(page)
                    }
                } else {
                    self.start += len;
                    Ok(page)
                }
            }
            Err(e) => Err(e),
        };
        if let Err(ref e) = r {
            warn!("Dropping page: {}", e);
            // Resync from the byte after the bogus capture pattern.
            self.start += 1;
        }
        Some(r)
    }

    fn process_page(&mut self, page: Page) {
        let serial = page.serial();
        let flags = page.flags();
        trace!("Page: serial {:#010x} sequence {} flags {:#04x} granule {:?} {} segments",
            serial, page.sequence(), flags.bits(), page.granule_pos(), page.segments().len());

        if self.ended.contains(&serial) {
            if !flags.is_first() {
                trace!("Ignoring page after end of stream {:#010x}", serial);
                return;
            }
            debug!("Stream {:#010x} restarts after its end", serial);
            self.ended.remove(&serial);
        }
        let state = self.streams.entry(serial).or_default();

        let mut lost = false;
        if let Some(expected) = state.next_sequence {
            if page.sequence() != expected {
                warn!("Page sequence gap in stream {:#010x}: expected {}, found {}",
                    serial, expected, page.sequence());
                self.queue.push_back(Err(Error::SequenceGap {
                    serial,
                    expected,
                    found: page.sequence(),
                }));
                state.partial = None;
                state.skip_continued = true;
                lost = true;
            }
        }
        state.next_sequence = Some(page.sequence().wrapping_add(1));

        let mut pieces = page.pieces();
        if flags.is_continued() {
            if state.partial.is_none() {
                if !lost && !state.skip_continued {
                    warn!("Continued page without open packet in stream {:#010x}", serial);
                    self.queue.push_back(Err(Error::ContinuationMismatch { serial }));
                }
                match pieces.next() {
                    Some(p) => state.skip_continued = !p.terminated,
                    None => state.skip_continued = true,
                }
            }
        } else {
            if state.partial.take().is_some() {
                warn!("Open packet not continued in stream {:#010x}", serial);
                self.queue.push_back(Err(Error::ContinuationMismatch { serial }));
            }
            state.skip_continued = false;
        }

        let mut packets = Vec::new();
        for piece in pieces {
            let (data, continued) = match state.partial.take() {
                Some(mut data) => {
                    data.extend_from_slice(piece.data);
                    (data, true)
                }
                None => (piece.data.to_vec(), false),
            };
            if piece.terminated {
                packets.push(Packet {
                    data,
                    serial,
                    page_sequence: page.sequence(),
                    granule_pos: None,
                    first_in_stream: false,
                    last_in_stream: false,
                    first_in_page: false,
                    last_in_page: false,
                    continued,
                });
            } else {
                state.partial = Some(data);
            }
        }

        if flags.is_last() {
            if let Some(data) = state.partial.take() {
                debug!("Completing unterminated packet at end of stream {:#010x}", serial);
                packets.push(Packet {
                    data,
                    serial,
                    page_sequence: page.sequence(),
                    granule_pos: None,
                    first_in_stream: false,
                    last_in_stream: false,
                    first_in_page: false,
                    last_in_page: false,
                    continued: true,
                });
            }
            if packets.is_empty() {
                trace!("End of stream {:#010x} without packets on the last page", serial);
                packets.push(Packet {
                    data: Vec::new(),
                    serial,
                    page_sequence: page.sequence(),
                    granule_pos: None,
                    first_in_stream: false,
                    last_in_stream: false,
                    first_in_page: false,
                    last_in_page: false,
                    continued: false,
                });
            }
        }

        let count = packets.len();
        for (i, mut packet) in packets.into_iter().enumerate() {
            packet.first_in_page = i == 0;
            packet.first_in_stream = i == 0 && flags.is_first() && !packet.continued;
            if i + 1 == count {
                packet.last_in_page = true;
                packet.granule_pos = page.granule_pos();
                packet.last_in_stream = flags.is_last();
            }
            trace!("Packet: serial {:#010x} {} bytes", serial, packet.len());
            self.queue.push_back(Ok(packet));
        }

        if flags.is_last() {
            self.streams.remove(&serial);
            self.ended.insert(serial);
        }
    }
}

/// Iterator over the packets available after `Demuxer::feed()`.
pub struct Packets<'a> {
    demuxer: &'a mut Demuxer,
}

impl<'a> Iterator for Packets<'a> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        self.demuxer.next_packet()
    }
}

/// Demultiplexes a complete Ogg byte stream into packet lists keyed by stream serial number.
/// Returns the errors encountered along the way.
pub fn split_streams(bytes: &[u8], options: DemuxOptions) -> (BTreeMap<u32, Vec<Packet>>, Vec<Error>) {
    let mut demuxer = Demuxer::with_options(options);
    let mut streams: BTreeMap<u32, Vec<Packet>> = BTreeMap::new();
    let mut errors = Vec::new();
    for r in demuxer.feed(bytes) {
        match r {
            Ok(packet) => streams.entry(packet.serial()).or_default().push(packet),
            Err(e) => errors.push(e),
        }
    }
    (streams, errors)
}
