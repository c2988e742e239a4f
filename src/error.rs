use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("corrupt page: {0}")]
    CorruptPage(&'static str),
    #[error("page checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("page continuation doesn't match open packet state in stream {serial:#010x}")]
    ContinuationMismatch { serial: u32 },
    #[error("page sequence gap in stream {serial:#010x}: expected {expected}, found {found}")]
    SequenceGap { serial: u32, expected: u32, found: u32 },
    #[error("unexpected end of packet")]
    Truncated,
    #[error("bad header: {0}")]
    BadHeader(&'static str),
    #[error("not a Vorbis header packet")]
    NotVorbis,
    #[error("unsupported Vorbis version {0}")]
    UnsupportedVersion(u32),
    #[error("undecodable packet: {0}")]
    DecodeError(&'static str),
    #[error("not an audio packet")]
    NotAudio,
    #[error("end of stream")]
    Eof,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    CorruptPage,
    ContinuationMismatch,
    SequenceGap,
    Truncated,
    BadHeader,
    DecodeError,
    Eof,
}

/// How a caller should react to an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    /// Data was lost or replaced with silence. Decoding continues.
    Hole,
    /// Normal termination of the logical stream.
    EndOfStream,
    /// The session can't continue.
    Fatal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Error::CorruptPage(_) |
            Error::ChecksumMismatch { .. }      => ErrorKind::CorruptPage,
            Error::ContinuationMismatch { .. }  => ErrorKind::ContinuationMismatch,
            Error::SequenceGap { .. }           => ErrorKind::SequenceGap,
            Error::Truncated                    => ErrorKind::Truncated,
            Error::BadHeader(_) |
            Error::NotVorbis |
            Error::UnsupportedVersion(_)        => ErrorKind::BadHeader,
            Error::DecodeError(_) |
            Error::NotAudio                     => ErrorKind::DecodeError,
            Error::Eof                          => ErrorKind::Eof,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind().severity()
    }

    /// Returns the libvorbis return code closest to this error.
    pub fn code(&self) -> i32 {
        match *self {
            Error::NotVorbis                => codes::OV_ENOTVORBIS,
            Error::UnsupportedVersion(_)    => codes::OV_EVERSION,
            Error::NotAudio                 => codes::OV_ENOTAUDIO,
            _ => self.kind().code(),
        }
    }
}

impl ErrorKind {
    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::CorruptPage |
            ErrorKind::ContinuationMismatch |
            ErrorKind::SequenceGap |
            ErrorKind::Truncated |
            ErrorKind::DecodeError  => Severity::Hole,
            ErrorKind::Eof          => Severity::EndOfStream,
            ErrorKind::BadHeader    => Severity::Fatal,
        }
    }

    pub fn is_recoverable(self) -> bool {
        self.severity() != Severity::Fatal
    }

    pub fn code(self) -> i32 {
        match self {
            ErrorKind::CorruptPage |
            ErrorKind::ContinuationMismatch |
            ErrorKind::SequenceGap  => codes::OV_HOLE,
            ErrorKind::Truncated |
            ErrorKind::DecodeError  => codes::OV_EBADPACKET,
            ErrorKind::BadHeader    => codes::OV_EBADHEADER,
            ErrorKind::Eof          => codes::OV_EOF,
        }
    }
}

/// Return codes of the reference libvorbis/libvorbisfile API.
pub mod codes {
    pub const OV_FALSE: i32         = -1;
    pub const OV_EOF: i32           = -2;
    pub const OV_HOLE: i32          = -3;

    pub const OV_EREAD: i32         = -128;
    pub const OV_EFAULT: i32        = -129;
    pub const OV_EIMPL: i32         = -130;
    pub const OV_EINVAL: i32        = -131;
    pub const OV_ENOTVORBIS: i32    = -132;
    pub const OV_EBADHEADER: i32    = -133;
    pub const OV_EVERSION: i32      = -134;
    pub const OV_ENOTAUDIO: i32     = -135;
    pub const OV_EBADPACKET: i32    = -136;
    pub const OV_EBADLINK: i32      = -137;
    pub const OV_ENOSEEK: i32       = -138;
}

/// Applies the Vorbis end-of-packet rule: running out of packet data mid-structure is not an
/// error, the remaining data is treated as absent.
pub trait ExpectEop<T> {
    fn expect_eop(self) -> Result<Option<T>>;
}

impl<T> ExpectEop<T> for Result<T> {
    fn expect_eop(self) -> Result<Option<T>> {
        match self {
            Err(Error::Truncated) => Ok(None),
            Err(e) => Err(e),
            Ok(v) => Ok(Some(v)),
        }
    }
}
