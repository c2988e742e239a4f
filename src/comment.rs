use log::debug;
use std::fmt;

use crate::bitstream::BitRead;
use crate::error::{Error, ExpectEop, Result};

/// Well-known comment field names.
#[derive(Clone, Copy, Debug, Eq)]
pub enum CommentTag<'a> {
    Title,
    Version,
    Album,
    TrackNumber,
    Artist,
    Performer,
    Copyright,
    License,
    Organization,
    Description,
    Genre,
    Date,
    Location,
    Contact,
    Isrc,
    Custom(&'a str),
}

impl<'a> CommentTag<'a> {
    /// Converts custom tags that name a well-known field into that field.
    pub fn normalize(self) -> Self {
        match self {
            CommentTag::Custom(s) => CommentTag::from(s),
            _ => self,
        }
    }

    /// Field name as it appears in comments.
    pub fn name(&self) -> &'a str {
        match *self {
            CommentTag::Title        => "TITLE",
            CommentTag::Version      => "VERSION",
            CommentTag::Album        => "ALBUM",
            CommentTag::TrackNumber  => "TRACKNUMBER",
            CommentTag::Artist       => "ARTIST",
            CommentTag::Performer    => "PERFORMER",
            CommentTag::Copyright    => "COPYRIGHT",
            CommentTag::License      => "LICENSE",
            CommentTag::Organization => "ORGANIZATION",
            CommentTag::Description  => "DESCRIPTION",
            CommentTag::Genre        => "GENRE",
            CommentTag::Date         => "DATE",
            CommentTag::Location     => "LOCATION",
            CommentTag::Contact      => "CONTACT",
            CommentTag::Isrc         => "ISRC",
            CommentTag::Custom(s)    => s,
        }
    }
}

impl<'a> AsRef<str> for CommentTag<'a> {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl<'a> From<&'a str> for CommentTag<'a> {
    fn from(s: &'a str) -> Self {
        const KNOWN: [CommentTag<'static>; 15] = [
            CommentTag::Title, CommentTag::Version, CommentTag::Album, CommentTag::TrackNumber,
            CommentTag::Artist, CommentTag::Performer, CommentTag::Copyright, CommentTag::License,
            CommentTag::Organization, CommentTag::Description, CommentTag::Genre, CommentTag::Date,
            CommentTag::Location, CommentTag::Contact, CommentTag::Isrc,
        ];
        for tag in KNOWN.iter() {
            if tag.name().eq_ignore_ascii_case(s) {
                return *tag;
            }
        }
        CommentTag::Custom(s)
    }
}

impl<'a> fmt::Display for CommentTag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            CommentTag::TrackNumber  => "Track number",
            CommentTag::Isrc         => "ISRC",
            CommentTag::Custom(s)    => s,
            _ => {
                let name = self.name();
                return write!(f, "{}{}", &name[..1], name[1..].to_ascii_lowercase());
            }
        };
        f.write_str(s)
    }
}

impl<'a, 'b> PartialEq<CommentTag<'b>> for CommentTag<'a> {
    fn eq(&self, other: &CommentTag<'b>) -> bool {
        self.as_ref().eq_ignore_ascii_case(other.as_ref())
    }
}

/// Vendor string and user comments of the comment header. Keys are matched case-insensitively
/// and may repeat. An entry without `=` has an empty value.
#[derive(Clone, Debug, Default)]
pub struct Comments {
    vendor: String,
    comments: Box<[String]>,
}

impl Comments {
    /// Reads the header body, that is the packet after the packet type and the "vorbis" magic.
    /// Unless `strict` is set, a string with invalid UTF-8 is stored with an empty value, entries
    /// without `=` are kept and the framing bit is optional.
    pub fn read<R: BitRead>(reader: &mut R, strict: bool) -> Result<Self> {
        let vendor = Self::read_string(reader, strict)?;

        let count = reader.read_u32()? as usize;
        // Each entry has at least its length field.
        if count > reader.bits_left() / 32 {
            return Err(Error::Truncated);
        }
        let mut comments = Vec::with_capacity(count);
        for _ in 0..count {
            let s = Self::read_string(reader, strict)?;
            if !s.contains('=') {
                if strict {
                    return Err(Error::BadHeader("Comment has no field separator"));
                }
                debug!("Comment without field separator: {:?}", s);
            }
            comments.push(s);
        }

        if !reader.read_bool().expect_eop()?.unwrap_or(false) {
            if strict {
                return Err(Error::BadHeader("Invalid framing bit"));
            }
            debug!("Comment header has no framing bit");
        }

        debug!("Comment header: vendor {:?}, {} comments", vendor, comments.len());

        Ok(Comments {
            vendor,
            comments: comments.into_boxed_slice(),
        })
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Comments as stored in the header.
    pub fn raw(&self) -> &[String] {
        &self.comments
    }

    pub fn iter(&self) -> impl Iterator<Item=(CommentTag<'_>, &str)> + '_ {
        self.comments.iter().map(|s| {
            let (key, value) = split(s);
            (CommentTag::from(key), value)
        })
    }

    /// Values of all comments with the `key` field name.
    pub fn get<'a>(&'a self, key: &'a str) -> impl Iterator<Item=&'a str> + 'a {
        self.comments.iter()
            .map(|s| split(s))
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn by_tag<'a>(&'a self, tag: CommentTag<'a>) -> impl Iterator<Item=&'a str> + 'a {
        self.get(tag.name())
    }

    fn read_string<R: BitRead>(reader: &mut R, strict: bool) -> Result<String> {
        let len = reader.read_u32()? as usize;
        if len.saturating_mul(8) > reader.bits_left() {
            return Err(Error::Truncated);
        }
        let mut bytes = vec![0; len];
        reader.read_bytes(&mut bytes)?;
        match String::from_utf8(bytes) {
            Ok(s) => Ok(s),
            Err(_) if strict => Err(Error::BadHeader("Invalid UTF-8 in comment header")),
            Err(e) => {
                // Keep the field name if it is readable, the value becomes empty.
                let bytes = e.into_bytes();
                let key = bytes.iter().position(|&b| b == b'=')
                    .and_then(|i| std::str::from_utf8(&bytes[..=i]).ok());
                debug!("Invalid UTF-8 in comment header, field name: {:?}", key);
                Ok(key.map(String::from).unwrap_or_default())
            }
        }
    }
}

fn split(s: &str) -> (&str, &str) {
    match s.find('=') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

impl<'a> IntoIterator for &'a Comments {
    type Item = (CommentTag<'a>, &'a str);
    type IntoIter = Box<dyn Iterator<Item=Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
