use crate::bitstream::BitRead;
use crate::error::{Error, Result};
use crate::util::Bits;

#[derive(Debug)]
pub struct Mapping {
    couplings: Box<[ChannelCoupling]>,
    /// Channel index -> submap index in `submaps`.
    channel_to_submap: Box<[usize]>,
    submaps: Box<[Submap]>,
}

#[derive(Clone, Copy, Debug)]
struct ChannelCoupling {
    magnitude: usize,
    angle: usize,
}

#[derive(Debug)]
pub struct Submap {
    channels: Box<[usize]>,
    floor: usize,
    residue: usize,
}

impl Submap {
    /// Channels this submap applies to, in ascending order.
    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    pub fn floor(&self) -> usize {
        self.floor
    }

    pub fn residue(&self) -> usize {
        self.residue
    }
}

impl Mapping {
    pub fn read<R: BitRead>(reader: &mut R, channel_count: usize,
            floor_count: usize, residue_count: usize) -> Result<Self> {
        debug_assert!(channel_count > 0);

        if reader.read_u16()? != 0 {
            return Err(Error::BadHeader("Unsupported mapping type"));
        }

        let submap_count = if reader.read_bool()? {
            reader.read_u8_bits(4)? as usize + 1
        } else {
            1
        };

        let couplings = if reader.read_bool()? {
            let count = reader.read_u8()? as usize + 1;
            let index_bits = (channel_count as u32 - 1).bit_len();
            let mut couplings = Vec::with_capacity(count);
            for _ in 0..count {
                let magnitude = reader.read_u32_bits(index_bits)? as usize;
                let angle = reader.read_u32_bits(index_bits)? as usize;
                if magnitude == angle || magnitude >= channel_count || angle >= channel_count {
                    return Err(Error::BadHeader("Invalid channel coupling"));
                }
                couplings.push(ChannelCoupling { magnitude, angle });
            }
            couplings
        } else {
            Vec::new()
        };

        if reader.read_u8_bits(2)? != 0 {
            return Err(Error::BadHeader("Unexpected data in reserved mapping field"));
        }

        let channel_to_submap = if submap_count > 1 {
            let mut channel_to_submap = Vec::with_capacity(channel_count);
            for _ in 0..channel_count {
                let submap = reader.read_u8_bits(4)? as usize;
                if submap >= submap_count {
                    return Err(Error::BadHeader("Invalid mapping mux value"));
                }
                channel_to_submap.push(submap);
            }
            channel_to_submap
        } else {
            vec![0; channel_count]
        };

        let mut submaps = Vec::with_capacity(submap_count);
        for submap_idx in 0..submap_count {
            // Time configuration placeholder.
            reader.read_u8()?;

            let floor = reader.read_u8()? as usize;
            if floor >= floor_count {
                return Err(Error::BadHeader("Invalid mapping floor index"));
            }
            let residue = reader.read_u8()? as usize;
            if residue >= residue_count {
                return Err(Error::BadHeader("Invalid mapping residue index"));
            }

            let channels: Vec<_> = channel_to_submap.iter()
                .enumerate()
                .filter(|&(_, &s)| s == submap_idx)
                .map(|(ch, _)| ch)
                .collect();

            submaps.push(Submap {
                channels: channels.into_boxed_slice(),
                floor,
                residue,
            });
        }

        Ok(Mapping {
            couplings: couplings.into_boxed_slice(),
            channel_to_submap: channel_to_submap.into_boxed_slice(),
            submaps: submaps.into_boxed_slice(),
        })
    }

    pub fn submaps(&self) -> &[Submap] {
        &self.submaps
    }

    pub fn submap_of(&self, channel: usize) -> &Submap {
        &self.submaps[self.channel_to_submap[channel]]
    }

    /// Clears the "no residue" flag of both channels in a coupled pair if any of them has it
    /// cleared.
    pub fn unzero_coupled_channels(&self, no_residue: &mut [bool]) {
        for c in self.couplings.iter() {
            if !no_residue[c.magnitude] || !no_residue[c.angle] {
                no_residue[c.magnitude] = false;
                no_residue[c.angle] = false;
            }
        }
    }

    /// Converts magnitude/angle pairs back to channel residues. Couplings are undone in the
    /// reverse of their declaration order.
    pub fn decouple_channels(&self, channels: &mut [Box<[f32]>], len: usize) {
        for c in self.couplings.iter().rev() {
            for i in 0..len {
                let m = channels[c.magnitude][i];
                let a = channels[c.angle][i];
                let (new_m, new_a) = decouple(m, a);
                channels[c.magnitude][i] = new_m;
                channels[c.angle][i] = new_a;
            }
        }
    }
}

fn decouple(m: f32, a: f32) -> (f32, f32) {
    if m > 0.0 {
        if a > 0.0 {
            (m, m - a)
        } else {
            (m + a, m)
        }
    } else if a > 0.0 {
        (m, m + a)
    } else {
        (m - a, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::testing::BitWriter;
    use crate::bitstream::BitReader;
    use crate::error::ErrorKind;

    fn read(buf: &[u8], channel_count: usize) -> Result<Mapping> {
        Mapping::read(&mut BitReader::new(buf), channel_count, 2, 2)
    }

    #[test]
    fn decouple_quadrants() {
        assert_eq!(decouple(3.0, 1.0), (3.0, 2.0));
        assert_eq!(decouple(3.0, -1.0), (2.0, 3.0));
        assert_eq!(decouple(-3.0, 1.0), (-3.0, -2.0));
        assert_eq!(decouple(-3.0, -1.0), (-2.0, -3.0));
    }

    #[test]
    fn submaps() {
        // Two submaps, no coupling, channels 0 and 2 in submap 1.
        let mut w = BitWriter::new();
        w.write(0, 16).write_bool(true).write(1, 4).write_bool(false).write(0, 2);
        w.write(1, 4).write(0, 4).write(1, 4);
        w.write(0, 8).write(0, 8).write(1, 8);
        w.write(0, 8).write(1, 8).write(0, 8);
        let buf = w.into_bytes();

        let m = read(&buf, 3).unwrap();
        assert_eq!(m.submaps().len(), 2);
        assert_eq!(m.submaps()[0].channels(), &[1]);
        assert_eq!(m.submaps()[0].residue(), 1);
        assert_eq!(m.submaps()[1].channels(), &[0, 2]);
        assert_eq!(m.submaps()[1].floor(), 1);
        assert_eq!(m.submap_of(2).floor(), 1);
    }

    #[test]
    fn couplings_in_reverse_order() {
        // Couplings (0, 1) then (1, 2).
        let mut w = BitWriter::new();
        w.write(0, 16).write_bool(false).write_bool(true).write(1, 8);
        w.write(0, 2).write(1, 2).write(1, 2).write(2, 2);
        w.write(0, 2);
        w.write(0, 8).write(0, 8).write(0, 8);
        let buf = w.into_bytes();
        let m = read(&buf, 3).unwrap();

        let mut no_residue = [true, true, false];
        m.unzero_coupled_channels(&mut no_residue);
        assert_eq!(no_residue, [true, false, false]);

        let mut channels: Vec<Box<[f32]>> = vec![
            vec![4.0].into_boxed_slice(),
            vec![2.0].into_boxed_slice(),
            vec![1.0].into_boxed_slice(),
        ];
        m.decouple_channels(&mut channels, 1);
        // (1, 2): (2, 1) -> (2, 1). Then (0, 1): (4, 2) -> (4, 2).
        assert_eq!(&channels[1][..], &[2.0]);
        assert_eq!(&channels[2][..], &[1.0]);
        assert_eq!(&channels[0][..], &[4.0]);

        let mut channels: Vec<Box<[f32]>> = vec![
            vec![4.0].into_boxed_slice(),
            vec![-1.0].into_boxed_slice(),
            vec![3.0].into_boxed_slice(),
        ];
        m.decouple_channels(&mut channels, 1);
        // (1, 2): m = -1, a = 3 -> (-1, 2). Then (0, 1): m = 4, a = -1 -> (3, 4).
        assert_eq!(&channels[0][..], &[3.0]);
        assert_eq!(&channels[1][..], &[4.0]);
        assert_eq!(&channels[2][..], &[2.0]);
    }

    #[test]
    fn invalid() {
        // Coupling a channel with itself.
        let mut w = BitWriter::new();
        w.write(0, 16).write_bool(false).write_bool(true).write(0, 8);
        w.write(1, 1).write(1, 1);
        let buf = w.into_bytes();
        assert_eq!(read(&buf, 2).unwrap_err().kind(), ErrorKind::BadHeader);

        // Unsupported mapping type.
        assert_eq!(read(&[1, 0, 0, 0], 2).unwrap_err().kind(), ErrorKind::BadHeader);

        // Floor index out of range.
        let mut w = BitWriter::new();
        w.write(0, 16).write_bool(false).write_bool(false).write(0, 2);
        w.write(0, 8).write(2, 8).write(0, 8);
        let buf = w.into_bytes();
        assert_eq!(read(&buf, 1).unwrap_err().kind(), ErrorKind::BadHeader);
    }
}
