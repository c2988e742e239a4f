use enum_primitive::FromPrimitive;
use log::debug;

use crate::bitstream::{BitRead, BitReader};
use crate::codebook::Codebook;
use crate::comment::Comments;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::floor::Floor;
use crate::header::Header;
use crate::mapping::Mapping;
use crate::mode::Mode;
use crate::residue::Residue;

const MAGIC: &[u8; 6] = b"vorbis";

enum_from_primitive! {
/// Packet type byte of Vorbis packets. Audio packets only have the lowest bit cleared.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PacketKind {
    Audio   = 0,
    Ident   = 1,
    Comment = 3,
    Setup   = 5,
}}

impl PacketKind {
    /// Identifies a Vorbis header packet by its type byte and the "vorbis" magic.
    pub fn of_header(packet: &[u8]) -> Result<PacketKind> {
        if packet.len() < 1 + MAGIC.len() || &packet[1..1 + MAGIC.len()] != MAGIC {
            return Err(Error::NotVorbis);
        }
        match PacketKind::from_u8(packet[0]) {
            Some(PacketKind::Audio) | None => Err(Error::NotVorbis),
            Some(kind) => Ok(kind),
        }
    }

    /// Checks the common header of a header packet and reads the rest with `f`. Running out of
    /// data in a header packet is a bad header.
    fn read<T, F>(self, packet: &[u8], f: F) -> Result<T>
            where F: FnOnce(&mut BitReader) -> Result<T> {
        let kind = PacketKind::of_header(packet)?;
        if kind != self {
            return Err(Error::BadHeader("Unexpected header packet type"));
        }
        let mut reader = BitReader::new(&packet[1 + MAGIC.len()..]);
        f(&mut reader).map_err(|e| match e {
            Error::Truncated => Error::BadHeader("Header packet is truncated"),
            e => e,
        })
    }
}

/// Decode tables of the setup header.
#[derive(Debug)]
pub struct Setup {
    codebooks: Box<[Codebook]>,
    floors: Box<[Floor]>,
    residues: Box<[Residue]>,
    mappings: Box<[Mapping]>,
    modes: Box<[Mode]>,
}

impl Setup {
    /// Reads the header body, that is the packet after the packet type and the "vorbis" magic.
    pub fn read<R: BitRead>(reader: &mut R, header: &Header) -> Result<Self> {
        let codebook_count = reader.read_u8()? as usize + 1;
        let mut codebooks = Vec::with_capacity(codebook_count);
        for _ in 0..codebook_count {
            codebooks.push(Codebook::read(reader)?);
        }

        let time_count = reader.read_u8_bits(6)? as usize + 1;
        for _ in 0..time_count {
            if reader.read_u16()? != 0 {
                return Err(Error::BadHeader("Non-zero value in time domain transforms"));
            }
        }

        let floors = read_list(reader, |r| Floor::read(r, &codebooks, header.frame_lens()))?;
        let residues = read_list(reader, |r| Residue::read(r, &codebooks))?;
        let mappings = read_list(reader,
            |r| Mapping::read(r, header.channel_count(), floors.len(), residues.len()))?;
        let modes = read_list(reader, |r| Mode::read(r, mappings.len()))?;

        if !reader.read_bool()? {
            return Err(Error::BadHeader("Invalid framing bit"));
        }

        debug!("Setup header: {} codebooks, {} floors, {} residues, {} mappings, {} modes",
            codebooks.len(), floors.len(), residues.len(), mappings.len(), modes.len());

        Ok(Setup {
            codebooks: codebooks.into_boxed_slice(),
            floors,
            residues,
            mappings,
            modes,
        })
    }

    pub(crate) fn codebooks(&self) -> &[Codebook] {
        &self.codebooks
    }

    pub(crate) fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub(crate) fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub(crate) fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub(crate) fn modes(&self) -> &[Mode] {
        &self.modes
    }
}

/// Reads a 6-bit count followed by that many items plus one.
fn read_list<R, T, F>(reader: &mut R, mut f: F) -> Result<Box<[T]>>
        where R: BitRead,
              F: FnMut(&mut R) -> Result<T> {
    let count = reader.read_u8_bits(6)? as usize + 1;
    let mut r = Vec::with_capacity(count);
    for _ in 0..count {
        r.push(f(reader)?);
    }
    Ok(r.into_boxed_slice())
}

/// The three header packets of a Vorbis stream.
#[derive(Debug)]
pub struct Headers {
    pub(crate) header: Header,
    pub(crate) comments: Comments,
    pub(crate) setup: Setup,
}

impl Headers {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn comments(&self) -> &Comments {
        &self.comments
    }

    pub fn setup(&self) -> &Setup {
        &self.setup
    }
}

pub fn read_ident_packet(packet: &[u8], config: &Config) -> Result<Header> {
    PacketKind::Ident.read(packet, |r| Header::read(r, config))
}

pub fn read_comment_packet(packet: &[u8], config: &Config) -> Result<Comments> {
    PacketKind::Comment.read(packet, |r| Comments::read(r, config.strict))
}

pub fn read_setup_packet(packet: &[u8], header: &Header) -> Result<Setup> {
    PacketKind::Setup.read(packet, |r| Setup::read(r, header))
}

/// Parses the identification, comment and setup header packets.
pub fn parse_headers(ident: &[u8], comment: &[u8], setup: &[u8], config: &Config) -> Result<Headers> {
    let header = read_ident_packet(ident, config)?;
    let comments = read_comment_packet(comment, config)?;
    let setup = read_setup_packet(setup, &header)?;
    Ok(Headers {
        header,
        comments,
        setup,
    })
}
