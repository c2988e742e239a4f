use crate::bitstream::BitRead;
use crate::error::{Error, Result};
use crate::header::FrameKind;

#[derive(Debug)]
pub struct Mode {
    frame_kind: FrameKind,
    mapping: usize,
}

impl Mode {
    pub fn read<R: BitRead>(reader: &mut R, mapping_count: usize) -> Result<Self> {
        let frame_kind = if reader.read_bool()? {
            FrameKind::Long
        } else {
            FrameKind::Short
        };
        if reader.read_u16()? != 0 {
            return Err(Error::BadHeader("Invalid mode window type"));
        }
        if reader.read_u16()? != 0 {
            return Err(Error::BadHeader("Invalid mode transform type"));
        }
        let mapping = reader.read_u8()? as usize;
        if mapping >= mapping_count {
            return Err(Error::BadHeader("Invalid mode mapping"));
        }

        Ok(Mode {
            frame_kind,
            mapping,
        })
    }

    pub fn frame_kind(&self) -> FrameKind {
        self.frame_kind
    }

    pub fn mapping(&self) -> usize {
        self.mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::BitReader;

    #[test]
    fn read() {
        let m = Mode::read(&mut BitReader::new(&[0x01, 0, 0, 0, 0x02, 0]), 2).unwrap();
        assert_eq!(m.frame_kind(), FrameKind::Long);
        assert_eq!(m.mapping(), 1);

        assert_eq!(Mode::read(&mut BitReader::new(&[0x00, 0, 0, 0, 0x04, 0]), 2).unwrap_err(),
            Error::BadHeader("Invalid mode mapping"));
        assert_eq!(Mode::read(&mut BitReader::new(&[0x02, 0, 0, 0, 0, 0]), 2).unwrap_err(),
            Error::BadHeader("Invalid mode window type"));
    }
}
