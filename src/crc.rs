//! Ogg page checksum: CRC-32 with polynomial 0x04c11db7, zero initial value, no reflection and
//! no final XOR.

const POLY: u32 = 0x04c1_1db7;

const fn table_entry(idx: u32) -> u32 {
    let mut r = idx << 24;
    let mut i = 0;
    while i < 8 {
        r = if r & 0x8000_0000 != 0 {
            (r << 1) ^ POLY
        } else {
            r << 1
        };
        i += 1;
    }
    r
}

const fn make_table() -> [u32; 256] {
    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = table_entry(i as u32);
        i += 1;
    }
    table
}

static TABLE: [u32; 256] = make_table();

/// Continues checksum computation of `crc` over `buf`.
pub fn update(crc: u32, buf: &[u8]) -> u32 {
    buf.iter().fold(crc, |crc, &b| (crc << 8) ^ TABLE[((crc >> 24) ^ b as u32) as usize])
}

pub fn checksum(buf: &[u8]) -> u32 {
    update(0, buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table() {
        assert_eq!(TABLE[0], 0);
        assert_eq!(TABLE[1], POLY);
        assert_eq!(TABLE[255], 0xb1f7_40b4);
    }

    #[test]
    fn incremental() {
        let data = b"OggS\x00\x02 some page bytes";
        let (a, b) = data.split_at(7);
        assert_eq!(update(update(0, a), b), checksum(data));
        assert_eq!(checksum(&[]), 0);
    }
}
