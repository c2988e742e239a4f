use enum_primitive::FromPrimitive;
use std::f32::consts::PI;

use crate::bitstream::BitRead;
use crate::codebook::Codebook;
use crate::error::{Error, ExpectEop, Result};
use crate::header::{FrameKind, FrameLens};
use crate::util::Bits;

const MAX_FLOOR1_VALUES: usize = 65;

enum_from_primitive! {
#[derive(Clone, Copy, Debug, PartialEq)]
enum FloorKind {
    Floor0 = 0,
    Floor1 = 1,
}}

#[derive(Debug)]
pub enum Floor {
    Zero(Floor0),
    One(Floor1),
}

/// Floor data of one channel decoded from an audio packet.
#[derive(Debug, Default)]
pub struct FloorState {
    used: bool,
    amplitude: u32,
    coefficients: Vec<f32>,
    y_list: Vec<(i32, bool)>,
}

impl FloorState {
    /// Whether the floor is used in the current packet. Channels with unused floor are silent.
    pub fn is_used(&self) -> bool {
        self.used
    }
}

impl Floor {
    pub fn read<R: BitRead>(reader: &mut R, codebooks: &[Codebook], frame_lens: FrameLens) -> Result<Self> {
        match FloorKind::from_u16(reader.read_u16()?) {
            Some(FloorKind::Floor0) => Ok(Floor::Zero(Floor0::read(reader, codebooks, frame_lens)?)),
            Some(FloorKind::Floor1) => Ok(Floor::One(Floor1::read(reader, codebooks.len())?)),
            None => Err(Error::BadHeader("Unsupported floor type")),
        }
    }

    /// Reads the floor data of one channel from the packet. Applies the end-of-packet rule:
    /// running out of data marks the floor unused unless `strict` is set.
    pub fn begin_decode<R: BitRead>(&self,
            state: &mut FloorState,
            reader: &mut R,
            codebooks: &[Codebook],
            strict: bool) -> Result<()> {
        state.used = false;
        let r = match *self {
            Floor::Zero(ref f) => f.decode(state, reader, codebooks),
            Floor::One(ref f) => f.decode(state, reader, codebooks),
        };
        match r.expect_eop()? {
            Some(()) => Ok(()),
            None => {
                state.used = false;
                if strict {
                    Err(Error::DecodeError("End of packet in floor data"))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Synthesizes the floor curve and multiplies `result` by it. `result` is the first half of
    /// the frame holding the residue.
    pub fn finish_decode(&self, result: &mut [f32], state: &FloorState, frame_kind: FrameKind) {
        debug_assert!(state.used);
        match *self {
            Floor::Zero(ref f) => f.synthesize(result, state, frame_kind),
            Floor::One(ref f) => f.synthesize(result, state),
        }
    }
}

/// Floor type 0: LSP coefficients interpreted over a Bark scale frequency map.
#[derive(Debug)]
pub struct Floor0 {
    order: usize,
    bark_map_size: u32,
    amplitude_bits: usize,
    amplitude_offset: u32,
    books: Box<[usize]>,
    /// Bark map for short and long frames.
    bark_maps: [Box<[u32]>; 2],
}

impl Floor0 {
    fn read<R: BitRead>(reader: &mut R, codebooks: &[Codebook], frame_lens: FrameLens) -> Result<Self> {
        let order = reader.read_u8()? as usize;
        let rate = reader.read_u16()? as u32;
        let bark_map_size = reader.read_u16()? as u32;
        let amplitude_bits = reader.read_u8_bits(6)? as usize;
        let amplitude_offset = reader.read_u8()? as u32;
        if order == 0 || rate == 0 || bark_map_size == 0 {
            return Err(Error::BadHeader("Invalid floor 0 parameters"));
        }
        if amplitude_bits == 0 || amplitude_bits > 32 {
            return Err(Error::BadHeader("Invalid floor 0 amplitude bits"));
        }

        let book_count = reader.read_u8_bits(4)? as usize + 1;
        let mut books = Vec::with_capacity(book_count);
        for _ in 0..book_count {
            let book = reader.read_u8()? as usize;
            match codebooks.get(book) {
                Some(c) if c.has_lookup_table() => books.push(book),
                Some(_) => return Err(Error::BadHeader("Floor 0 codebook has no lookup table")),
                None => return Err(Error::BadHeader("Invalid codebook index in floor 0")),
            }
        }

        let bark_maps = [
            Self::bark_map(frame_lens.short() / 2, rate, bark_map_size),
            Self::bark_map(frame_lens.long() / 2, rate, bark_map_size),
        ];

        Ok(Floor0 {
            order,
            bark_map_size,
            amplitude_bits,
            amplitude_offset,
            books: books.into_boxed_slice(),
            bark_maps,
        })
    }

    fn decode<R: BitRead>(&self, state: &mut FloorState, reader: &mut R, codebooks: &[Codebook]) -> Result<()> {
        let amplitude = reader.read_u32_bits(self.amplitude_bits)?;
        if amplitude == 0 {
            return Ok(());
        }
        let book_idx = reader.read_u32_bits((self.books.len() as u32).bit_len())? as usize;
        let book = self.books.get(book_idx)
            .map(|&i| &codebooks[i])
            .ok_or(Error::DecodeError("Invalid floor 0 book number"))?;

        let coefficients = &mut state.coefficients;
        coefficients.clear();
        let mut vector = vec![0.0; book.dim_count()];
        let mut last = 0.0;
        while coefficients.len() < self.order {
            book.decode_vq(reader, &mut vector)?;
            for &v in &vector {
                coefficients.push(v + last);
            }
            if let Some(&v) = coefficients.last() {
                last = v;
            }
        }
        coefficients.truncate(self.order);

        state.amplitude = amplitude;
        state.used = true;
        Ok(())
    }

    fn synthesize(&self, result: &mut [f32], state: &FloorState, frame_kind: FrameKind) {
        let map = &self.bark_maps[frame_kind as usize];
        debug_assert_eq!(map.len(), result.len());
        let cos_coefficients: Vec<f32> = state.coefficients.iter().map(|c| c.cos()).collect();
        let amplitude_max = ((1_u64 << self.amplitude_bits) - 1) as f32;
        let amplitude = state.amplitude as f32;
        let offset = self.amplitude_offset as f32;

        let mut i = 0;
        while i < result.len() {
            let omega = PI * map[i] as f32 / self.bark_map_size as f32;
            let cos_omega = omega.cos();
            let mut p = 1.0_f32;
            let mut q = 1.0_f32;
            for (j, &c) in cos_coefficients.iter().enumerate() {
                let d = c - cos_omega;
                if j % 2 == 1 {
                    p *= 4.0 * d * d;
                } else {
                    q *= 4.0 * d * d;
                }
            }
            if self.order % 2 == 1 {
                p *= 1.0 - cos_omega * cos_omega;
                q *= 0.25;
            } else {
                p *= (1.0 - cos_omega) / 2.0;
                q *= (1.0 + cos_omega) / 2.0;
            }
            let value = (0.115_129_25 *
                (amplitude * offset / (amplitude_max * (p + q).sqrt()) - offset)).exp();

            let bark = map[i];
            while i < result.len() && map[i] == bark {
                result[i] *= value;
                i += 1;
            }
        }
    }

    fn bark_map(n: usize, rate: u32, bark_map_size: u32) -> Box<[u32]> {
        let scale = bark_map_size as f32 / bark(0.5 * rate as f32);
        (0..n)
            .map(|i| {
                let v = (bark(rate as f32 * i as f32 / (2 * n) as f32) * scale).floor() as u32;
                v.min(bark_map_size - 1)
            })
            .collect()
    }
}

fn bark(x: f32) -> f32 {
    13.1 * (0.000_74 * x).atan() + 2.24 * (0.000_000_018_5 * x * x).atan() + 0.000_1 * x
}

/// Floor type 1: piecewise linear curve over a list of X positions.
#[derive(Debug)]
pub struct Floor1 {
    mult: i32,
    range: i32,
    part_classes: Box<[usize]>,
    classes: Box<[Class]>,
    x_list: Box<[i32]>,
    /// Indexes into `x_list` ordered by X.
    sorted: Box<[usize]>,
    /// Low and high neighbors of each X value starting from index 2.
    neighbors: Box<[(usize, usize)]>,
}

#[derive(Debug)]
struct Class {
    dim_count: usize,
    subclass_bit_count: usize,
    master_book: Option<usize>,
    subclass_books: Box<[Option<usize>]>,
}

impl Floor1 {
    fn read<R: BitRead>(reader: &mut R, codebook_count: usize) -> Result<Self> {
        let part_count = reader.read_u8_bits(5)? as usize;
        let mut part_classes = Vec::with_capacity(part_count);
        for _ in 0..part_count {
            part_classes.push(reader.read_u8_bits(4)? as usize);
        }

        let class_count = part_classes.iter().max().map(|&c| c + 1).unwrap_or(0);
        let mut classes = Vec::with_capacity(class_count);
        for _ in 0..class_count {
            let dim_count = reader.read_u8_bits(3)? as usize + 1;

            let subclass_bit_count = reader.read_u8_bits(2)? as usize;
            let master_book = if subclass_bit_count != 0 {
                let master_book = reader.read_u8()? as usize;
                if master_book >= codebook_count {
                    return Err(Error::BadHeader("Invalid codebook index in floor class master book"));
                }
                Some(master_book)
            } else {
                None
            };

            let subclass_book_count = 1 << subclass_bit_count;
            let mut subclass_books = Vec::with_capacity(subclass_book_count);
            for _ in 0..subclass_book_count {
                let subclass_book = match reader.read_u8()? as usize {
                    0 => None,
                    idx if idx - 1 < codebook_count => Some(idx - 1),
                    _ => return Err(Error::BadHeader("Invalid codebook index in floor subclass books")),
                };
                subclass_books.push(subclass_book);
            }

            classes.push(Class {
                dim_count,
                subclass_bit_count,
                master_book,
                subclass_books: subclass_books.into_boxed_slice(),
            })
        }

        let mult = reader.read_u8_bits(2)? as i32 + 1;
        let range = [256, 128, 86, 64][mult as usize - 1];
        let range_bits = reader.read_u8_bits(4)? as usize;
        let mut x_list = vec![0, 1 << range_bits];
        for &part_class in &part_classes {
            for _ in 0..classes[part_class].dim_count {
                if x_list.len() >= MAX_FLOOR1_VALUES {
                    return Err(Error::BadHeader("Too many elements in floor X list"));
                }
                x_list.push(reader.read_u32_bits(range_bits)? as i32);
            }
        }

        let mut sorted: Vec<usize> = (0..x_list.len()).collect();
        sorted.sort_by_key(|&i| x_list[i]);
        if sorted.windows(2).any(|w| x_list[w[0]] == x_list[w[1]]) {
            return Err(Error::BadHeader("Floor X list contains duplicates"));
        }

        let neighbors = (2..x_list.len())
            .map(|i| Self::find_neighbors(&x_list, i))
            .collect::<Vec<_>>();

        Ok(Floor1 {
            mult,
            range,
            part_classes: part_classes.into_boxed_slice(),
            classes: classes.into_boxed_slice(),
            x_list: x_list.into_boxed_slice(),
            sorted: sorted.into_boxed_slice(),
            neighbors: neighbors.into_boxed_slice(),
        })
    }

    fn decode<R: BitRead>(&self, state: &mut FloorState, reader: &mut R, codebooks: &[Codebook]) -> Result<()> {
        if !reader.read_bool()? {
            return Ok(());
        }

        let y_list = &mut state.y_list;
        y_list.clear();
        let len_bits = ((self.range - 1) as u32).bit_len();
        y_list.push((reader.read_u32_bits(len_bits)? as i32, true));
        y_list.push((reader.read_u32_bits(len_bits)? as i32, true));
        for &part_class in self.part_classes.iter() {
            let class = &self.classes[part_class];
            let cbits = class.subclass_bit_count;
            let csub = (1 << cbits) - 1;
            let mut cval = match class.master_book {
                Some(book) => codebooks[book].decode_scalar(reader)? as usize,
                None => 0,
            };
            for _ in 0..class.dim_count {
                let book = class.subclass_books[cval & csub];
                cval >>= cbits;
                let y = match book {
                    Some(book) => codebooks[book].decode_scalar(reader)? as i32,
                    None => 0,
                };
                y_list.push((y, true));
            }
        }

        self.synthesize_amplitudes(y_list);
        state.used = true;

        Ok(())
    }

    fn synthesize_amplitudes(&self, y_list: &mut [(i32, bool)]) {
        let max_y = self.range - 1;
        y_list[0].0 = y_list[0].0.min(max_y);
        y_list[1].0 = y_list[1].0.min(max_y);
        for i in 2..y_list.len() {
            let (low, high) = self.neighbors[i - 2];
            let predicted = render_point(
                    self.x_list[low], y_list[low].0,
                    self.x_list[high], y_list[high].0,
                    self.x_list[i]);
            let high_room = self.range - predicted;
            let low_room = predicted;
            let room = if high_room < low_room {
                high_room * 2
            } else {
                low_room * 2
            };
            let y = y_list[i].0;
            let final_y = if y != 0 {
                y_list[low].1 = true;
                y_list[high].1 = true;
                y_list[i].1 = true;
                if y >= room {
                    if high_room > low_room {
                        y - low_room + predicted
                    } else {
                        predicted - y + high_room - 1
                    }
                } else if y % 2 == 1 {
                    predicted - (y + 1) / 2
                } else {
                    predicted + y / 2
                }
            } else {
                y_list[i].1 = false;
                predicted
            };
            y_list[i].0 = final_y.max(0).min(max_y);
        }
    }

    fn synthesize(&self, result: &mut [f32], state: &FloorState) {
        let y_list = &state.y_list;
        let n = result.len() as i32;
        let mut lx = 0;
        let mut ly = y_list[self.sorted[0]].0 * self.mult;
        let mut hx = 0;
        let mut hy = 0;
        for &i in self.sorted.iter().skip(1) {
            if y_list[i].1 {
                hy = y_list[i].0 * self.mult;
                hx = self.x_list[i];
                render_line(result, lx, ly, hx, hy);
                lx = hx;
                ly = hy;
            }
        }
        if hx < n {
            render_line(result, hx, hy, n, hy);
        }
    }

    fn find_neighbors(x_list: &[i32], end: usize) -> (usize, usize) {
        let v = x_list[end];
        let mut low = 0;
        let mut high = 1;
        for (i, &x) in x_list[..end].iter().enumerate() {
            if x < v && x > x_list[low] {
                low = i;
            } else if x > v && x < x_list[high] {
                high = i;
            }
        }
        (low, high)
    }
}

fn render_point(x0: i32, y0: i32, x1: i32, y1: i32, x: i32) -> i32 {
    let dy = y1 - y0;
    let adx = x1 - x0;
    let err = dy.abs() * (x - x0);
    let off = err / adx;
    if dy < 0 {
        y0 - off
    } else {
        y0 + off
    }
}

/// Multiplies `result[x0..x1]` by the dB values of the line from `(x0, y0)` to `(x1, y1)`.
/// Positions past the end of `result` are skipped.
fn render_line(result: &mut [f32], x0: i32, y0: i32, x1: i32, y1: i32) {
    let dy = y1 - y0;
    let adx = x1 - x0;
    let base = dy / adx;
    let ady = dy.abs() - base.abs() * adx;
    let sy = if dy < 0 {
        base - 1
    } else {
        base + 1
    };

    let end = x1.min(result.len() as i32);
    if x0 >= end {
        return;
    }
    result[x0 as usize] *= inverse_db(y0);

    let mut y = y0;
    let mut err = 0;
    for x in x0 + 1..end {
        err += ady;
        if err >= adx {
            err -= adx;
            y += sy;
        } else {
            y += base;
        }
        result[x as usize] *= inverse_db(y);
    }
}

#[inline]
fn inverse_db(y: i32) -> f32 {
    INVERSE_DB_TABLE[y.max(0).min(255) as usize]
}

const INVERSE_DB_TABLE: [f32; 256] = [
    1.0649863E-07, 1.1341951e-07, 1.2079015e-07, 1.2863978e-07,
    1.3699951e-07, 1.4590251e-07, 1.5538408e-07, 1.6548181e-07,
    1.7623575e-07, 1.8768855e-07, 1.9988561e-07, 2.1287530e-07,
    2.2670913e-07, 2.4144197e-07, 2.5713223e-07, 2.7384213e-07,
    2.9163793e-07, 3.1059021e-07, 3.3077411e-07, 3.5226968e-07,
    3.7516214e-07, 3.9954229e-07, 4.2550680e-07, 4.5315863e-07,
    4.8260743e-07, 5.1396998e-07, 5.4737065e-07, 5.8294187e-07,
    6.2082472e-07, 6.6116941e-07, 7.0413592e-07, 7.4989464e-07,
    7.9862701e-07, 8.5052630e-07, 9.0579828e-07, 9.6466216e-07,
    1.0273513e-06, 1.0941144e-06, 1.1652161e-06, 1.2409384e-06,
    1.3215816e-06, 1.4074654e-06, 1.4989305e-06, 1.5963394e-06,
    1.7000785e-06, 1.8105592e-06, 1.9282195e-06, 2.0535261e-06,
    2.1869758e-06, 2.3290978e-06, 2.4804557e-06, 2.6416497e-06,
    2.8133190e-06, 2.9961443e-06, 3.1908506e-06, 3.3982101e-06,
    3.6190449e-06, 3.8542308e-06, 4.1047004e-06, 4.3714470e-06,
    4.6555282e-06, 4.9580707e-06, 5.2802740e-06, 5.6234160e-06,
    5.9888572e-06, 6.3780469e-06, 6.7925283e-06, 7.2339451e-06,
    7.7040476e-06, 8.2047000e-06, 8.7378876e-06, 9.3057248e-06,
    9.9104632e-06, 1.0554501e-05, 1.1240392e-05, 1.1970856e-05,
    1.2748789e-05, 1.3577278e-05, 1.4459606e-05, 1.5399272e-05,
    1.6400004e-05, 1.7465768e-05, 1.8600792e-05, 1.9809576e-05,
    2.1096914e-05, 2.2467911e-05, 2.3928002e-05, 2.5482978e-05,
    2.7139006e-05, 2.8902651e-05, 3.0780908e-05, 3.2781225e-05,
    3.4911534e-05, 3.7180282e-05, 3.9596466e-05, 4.2169667e-05,
    4.4910090e-05, 4.7828601e-05, 5.0936773e-05, 5.4246931e-05,
    5.7772202e-05, 6.1526565e-05, 6.5524908e-05, 6.9783085e-05,
    7.4317983e-05, 7.9147585e-05, 8.4291040e-05, 8.9768747e-05,
    9.5602426e-05, 0.00010181521, 0.00010843174, 0.00011547824,
    0.00012298267, 0.00013097477, 0.00013948625, 0.00014855085,
    0.00015820453, 0.00016848555, 0.00017943469, 0.00019109536,
    0.00020351382, 0.00021673929, 0.00023082423, 0.00024582449,
    0.00026179955, 0.00027881276, 0.00029693158, 0.00031622787,
    0.00033677814, 0.00035866388, 0.00038197188, 0.00040679456,
    0.00043323036, 0.00046138411, 0.00049136745, 0.00052329927,
    0.00055730621, 0.00059352311, 0.00063209358, 0.00067317058,
    0.00071691700, 0.00076350630, 0.00081312324, 0.00086596457,
    0.00092223983, 0.00098217216, 0.0010459992,  0.0011139742,
    0.0011863665,  0.0012634633,  0.0013455702,  0.0014330129,
    0.0015261382,  0.0016253153,  0.0017309374,  0.0018434235,
    0.0019632195,  0.0020908006,  0.0022266726,  0.0023713743,
    0.0025254795,  0.0026895994,  0.0028643847,  0.0030505286,
    0.0032487691,  0.0034598925,  0.0036847358,  0.0039241906,
    0.0041792066,  0.0044507950,  0.0047400328,  0.0050480668,
    0.0053761186,  0.0057254891,  0.0060975636,  0.0064938176,
    0.0069158225,  0.0073652516,  0.0078438871,  0.0083536271,
    0.0088964928,  0.009474637,   0.010090352,   0.010746080,
    0.011444421,   0.012188144,   0.012980198,   0.013823725,
    0.014722068,   0.015678791,   0.016697687,   0.017782797,
    0.018938423,   0.020169149,   0.021479854,   0.022875735,
    0.024362330,   0.025945531,   0.027631618,   0.029427276,
    0.031339626,   0.033376252,   0.035545228,   0.037855157,
    0.040315199,   0.042935108,   0.045725273,   0.048696758,
    0.051861348,   0.055231591,   0.058820850,   0.062643361,
    0.066714279,   0.071049749,   0.075666962,   0.080584227,
    0.085821044,   0.091398179,   0.097337747,   0.10366330,
    0.11039993,    0.11757434,    0.12521498,    0.13335215,
    0.14201813,    0.15124727,    0.16107617,    0.17154380,
    0.18269168,    0.19456402,    0.20720788,    0.22067342,
    0.23501402,    0.25028656,    0.26655159,    0.28387361,
    0.30232132,    0.32196786,    0.34289114,    0.36517414,
    0.38890521,    0.41417847,    0.44109412,    0.46975890,
    0.50028648,    0.53279791,    0.56742212,    0.60429640,
    0.64356699,    0.68538959,    0.72993007,    0.77736504,
    0.82788260,    0.88168307,    0.9389798,     1.0
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::testing::BitWriter;
    use crate::bitstream::BitReader;

    #[test]
    fn render_point_() {
        assert_eq!(render_point(0, 10, 100, 30, 50), 20);
        assert_eq!(render_point(0, 30, 100, 10, 25), 25);
        assert_eq!(render_point(10, 0, 20, 7, 15), 3);
    }

    #[test]
    fn render_line_() {
        let mut result = vec![1.0; 128];
        render_line(&mut result, 0, 0, 128, 255);
        assert_eq!(result[0], INVERSE_DB_TABLE[0]);
        assert_eq!(result[1], INVERSE_DB_TABLE[1]);
        assert_eq!(result[64], INVERSE_DB_TABLE[127]);
        assert_eq!(result[127], INVERSE_DB_TABLE[253]);

        let mut result = vec![1.0; 128];
        render_line(&mut result, 0, 200, 128, 100);
        assert_eq!(result[64], INVERSE_DB_TABLE[150]);
        assert_eq!(result[127], INVERSE_DB_TABLE[101]);
    }

    #[test]
    fn render_line_is_clipped() {
        let mut result = vec![1.0; 16];
        render_line(&mut result, 8, 255, 1024, 255);
        assert!(result[..8].iter().all(|&v| v == 1.0));
        render_line(&mut result, 16, 0, 32, 0);
        assert!(result[8..].iter().all(|&v| v == 1.0));
    }

    fn floor1_zero_partitions() -> Floor1 {
        // No partitions, multiplier 1, X list [0, 128].
        let mut w = BitWriter::new();
        w.write(0, 5).write(0, 2).write(7, 4);
        let buf = w.into_bytes();
        Floor1::read(&mut BitReader::new(&buf), 0).unwrap()
    }

    #[test]
    fn floor1_line() {
        let floor = Floor::One(floor1_zero_partitions());
        let mut w = BitWriter::new();
        w.write_bool(true).write(0, 8).write(255, 8);
        let buf = w.into_bytes();

        let mut state = FloorState::default();
        floor.begin_decode(&mut state, &mut BitReader::new(&buf), &[], false).unwrap();
        assert!(state.is_used());

        let mut result = vec![1.0; 128];
        floor.finish_decode(&mut result, &state, FrameKind::Long);
        assert_eq!(result[0], INVERSE_DB_TABLE[0]);
        assert_eq!(result[64], INVERSE_DB_TABLE[127]);

        // Short frame covering only part of the X range.
        let mut result = vec![1.0; 32];
        floor.finish_decode(&mut result, &state, FrameKind::Short);
        assert_eq!(result[0], INVERSE_DB_TABLE[0]);
    }

    #[test]
    fn floor1_unused_and_end_of_packet() {
        let floor = Floor::One(floor1_zero_partitions());
        let mut state = FloorState::default();

        floor.begin_decode(&mut state, &mut BitReader::new(&[0]), &[], false).unwrap();
        assert!(!state.is_used());

        // Nonzero flag followed by only 7 bits of the first Y value.
        floor.begin_decode(&mut state, &mut BitReader::new(&[0b0001_1111]), &[], false).unwrap();
        assert!(!state.is_used());
        assert_eq!(floor.begin_decode(&mut state, &mut BitReader::new(&[0b0001_1111]), &[], true).unwrap_err(),
            Error::DecodeError("End of packet in floor data"));
    }

    #[test]
    fn floor1_amplitudes() {
        // One partition of class 0 with 2 dimensions, no books: X list [0, 128, 32, 96].
        let mut w = BitWriter::new();
        w.write(1, 5).write(0, 4);
        w.write(1, 3).write(0, 2).write(0, 8);
        w.write(0, 2).write(7, 4).write(32, 7).write(96, 7);
        let buf = w.into_bytes();
        let floor = Floor1::read(&mut BitReader::new(&buf), 0).unwrap();
        assert_eq!(&floor.x_list[..], &[0, 128, 32, 96]);
        assert_eq!(&floor.sorted[..], &[0, 2, 3, 1]);
        assert_eq!(&floor.neighbors[..], &[(0, 1), (2, 1)]);

        let mut y_list = vec![(40, true), (200, true), (0, true), (0, true)];
        floor.synthesize_amplitudes(&mut y_list);
        assert_eq!(y_list, vec![(40, true), (200, true), (80, false), (160, false)]);

        let mut y_list = vec![(40, true), (300, true), (7, true), (255, true)];
        floor.synthesize_amplitudes(&mut y_list);
        assert_eq!(y_list[1], (255, true));
        // Odd values go below the prediction, values past the room are mirrored.
        assert_eq!(y_list[2], (93 - 4, true));
        assert_eq!(y_list[3], (0, true));
    }

    #[test]
    fn floor1_duplicate_x() {
        let mut w = BitWriter::new();
        w.write(1, 5).write(0, 4);
        w.write(1, 3).write(0, 2).write(0, 8);
        w.write(0, 2).write(7, 4).write(32, 7).write(32, 7);
        let buf = w.into_bytes();
        assert_eq!(Floor1::read(&mut BitReader::new(&buf), 0).unwrap_err(),
            Error::BadHeader("Floor X list contains duplicates"));
    }

    fn floor0_book() -> Codebook {
        // Two entries of length 1, lookup type 1 with values [0.0, 1.0].
        let mut w = BitWriter::new();
        w.write_bytes(&[0x42, 0x43, 0x56]).write(1, 16).write(2, 24);
        w.write_bool(false).write_bool(false).write(0, 5).write(0, 5);
        w.write(1, 4).write(0, 32).write(0x6010_0000, 32).write(0, 4).write_bool(false);
        w.write(0, 1).write(1, 1);
        let buf = w.into_bytes();
        Codebook::read(&mut BitReader::new(&buf)).unwrap()
    }

    fn floor0() -> Floor {
        // Order 2, rate 44100, bark map size 256, 6 amplitude bits, offset 20, one book.
        let mut w = BitWriter::new();
        w.write(0, 16).write(2, 8).write(44100, 16).write(256, 16).write(6, 6).write(20, 8)
            .write(0, 4).write(0, 8);
        let buf = w.into_bytes();
        Floor::read(&mut BitReader::new(&buf), &[floor0_book()], FrameLens::new(256, 2048)).unwrap()
    }

    #[test]
    fn floor0_bark_map() {
        let floor = match floor0() {
            Floor::Zero(f) => f,
            Floor::One(_) => unreachable!(),
        };
        for (map, n) in floor.bark_maps.iter().zip([128, 1024]) {
            assert_eq!(map.len(), n);
            assert_eq!(map[0], 0);
            assert!(map.windows(2).all(|w| w[0] <= w[1]));
            assert!(map.iter().all(|&v| v < 256));
        }
    }

    #[test]
    fn floor0_curve() {
        let floor = floor0();
        let books = [floor0_book()];

        // Amplitude 10, book 0, entries 1 and 0: coefficients [1.0, 1.0].
        let mut w = BitWriter::new();
        w.write(10, 6).write(0, 1).write(1, 1).write(0, 1);
        let buf = w.into_bytes();
        let mut state = FloorState::default();
        floor.begin_decode(&mut state, &mut BitReader::new(&buf), &books, false).unwrap();
        assert!(state.is_used());
        assert_eq!(state.coefficients, vec![1.0, 1.0]);

        let mut result = vec![1.0; 128];
        floor.finish_decode(&mut result, &state, FrameKind::Short);
        assert!((result[0] - 0.148_814_85).abs() < 1e-4);
        assert!(result.iter().all(|v| v.is_finite() && *v > 0.0));

        // Zero amplitude means unused floor.
        floor.begin_decode(&mut state, &mut BitReader::new(&[0]), &books, false).unwrap();
        assert!(!state.is_used());
    }
}
