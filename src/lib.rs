//! Ogg demuxer and [Vorbis](http://www.vorbis.com/) decoder implementation in pure Rust.
//!
//! `StreamDecoder` decodes an Ogg Vorbis byte stream fed in arbitrary chunks. The lower level
//! `Demuxer` and `Decoder` can be used separately: the `Decoder` works directly with Vorbis
//! packets and doesn't depend on the container.
//!
//! # Example
//!
//! ```rust,no_run
//! use oggvorbis::{Decoder, Demuxer};
//!
//! let data: &[u8] = &[]; // Replace with real data.
//!
//! let mut demuxer = Demuxer::new();
//! let mut packets = demuxer.feed(data).filter_map(|p| p.ok());
//!
//! let mut builder = Decoder::builder();
//! while !builder.is_complete() {
//!     let packet = packets.next().expect("Missing header packets");
//!     builder.headerin(packet.data()).expect("Couldn't read header packet");
//! }
//! let mut decoder = builder.build().expect("Couldn't build decoder");
//!
//! let mut sample_buf = Vec::new();
//! for packet in packets {
//!     // Undecodable packets are replaced with silence.
//!     let _ = decoder.decode_packet(packet.data());
//!     let samples = decoder.samples();
//!     sample_buf.clear();
//!     sample_buf.extend(samples.interleaved()
//!         .map(|s| (s * 32767.0 + 0.5).floor() as i16));
//!
//!     // Do something with the sample_buf.
//! }
//! ```

#[macro_use] extern crate enum_primitive;

pub mod crc;
pub mod ogg;

mod bitstream;
mod codebook;
mod comment;
mod config;
mod decoder;
mod demux;
mod error;
mod floor;
mod header;
mod huffman;
mod mapping;
mod mdct;
mod mode;
mod residue;
mod setup;
mod stream;
mod util;
mod window;

pub use crate::bitstream::{BitRead, BitReader};
pub use crate::comment::{CommentTag, Comments};
pub use crate::config::Config;
pub use crate::decoder::{ChannelIter, Decoder, DecoderBuilder, InterleavedSamplesIter, PcmBlock, Samples};
pub use crate::demux::{split_streams, DemuxOptions, Demuxer, Packet, Packets};
pub use crate::error::{codes, Error, ErrorKind, Result, Severity};
pub use crate::header::{Bitrates, Format, FrameKind, FrameLens, Header};
pub use crate::setup::{parse_headers, Headers, PacketKind, Setup};
pub use crate::stream::{Event, StreamDecoder};

/// Crate name and version.
pub const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));
