//! Inverse MDCT computed as a DCT-IV through a complex FFT of a quarter of the output length.
use std::f64::consts::PI;

use crate::util::Bits;

type Complex = [f32; 2];

#[inline]
fn mul(a: Complex, b: Complex) -> Complex {
    [a[0] * b[0] - a[1] * b[1], a[0] * b[1] + a[1] * b[0]]
}

/// `e^(-i * angle)`
fn unit(angle: f64) -> Complex {
    [angle.cos() as f32, -angle.sin() as f32]
}

#[derive(Debug)]
pub struct Mdct {
    len: usize,
    /// Pre-rotation of the folded input.
    pre: Box<[Complex]>,
    /// Post-rotation of the FFT output.
    post: Box<[Complex]>,
    /// FFT twiddle factors.
    twiddle: Box<[Complex]>,
    bitrev: Box<[usize]>,
}

impl Mdct {
    /// Creates transform of `len` output samples. `len` must be a power of two of at least 64.
    pub fn new(len: usize) -> Self {
        assert!(len >= 64 && len.is_power_of_two());
        let half = (len / 2) as f64;
        let fft_len = len / 4;
        let fft_bits = (fft_len as u32).bit_len() - 1;
        Mdct {
            len,
            pre: (0..fft_len).map(|m| unit(PI * (m as f64 + 0.25) / half)).collect(),
            post: (0..fft_len).map(|n| unit(PI * n as f64 / half)).collect(),
            twiddle: (0..fft_len / 2).map(|k| unit(2.0 * PI * k as f64 / fft_len as f64)).collect(),
            bitrev: (0..fft_len).map(|i| i.reverse_bits() >> (usize::BITS as usize - fft_bits)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Transforms `buf[..len / 2]` spectral coefficients into `len` time domain samples in place.
    ///
    /// `buf[i] = sum(X[k] * cos(pi / 2 / len * (2 * i + 1 + len / 2) * (2 * k + 1)))`, no scaling
    /// is applied.
    pub fn inverse(&self, buf: &mut [f32]) {
        assert_eq!(buf.len(), self.len);
        let m = self.len / 2;
        let (lo, hi) = buf.split_at_mut(m);

        // Fold even and reversed odd coefficients into complex values.
        for (i, &pre) in self.pre.iter().enumerate() {
            let v = mul([lo[2 * i], lo[m - 1 - 2 * i]], pre);
            hi[2 * i] = v[0];
            hi[2 * i + 1] = v[1];
        }

        self.fft(hi);

        // DCT-IV output goes to the lower half.
        for (i, &post) in self.post.iter().enumerate() {
            let v = mul([hi[2 * i], hi[2 * i + 1]], post);
            lo[2 * i] = v[0];
            lo[m - 1 - 2 * i] = -v[1];
        }

        // Unfold: the MDCT output is the DCT-IV output shifted by a quarter with odd symmetry
        // around the middle and even symmetry at the ends.
        let q = m / 2;
        for t in 0..q {
            let v = -lo[t];
            hi[q + t] = v;
            hi[q - 1 - t] = v;
        }
        lo.copy_within(q.., 0);
        for t in 0..q {
            lo[m - 1 - t] = -lo[t];
        }
    }

    /// In-place radix-2 FFT of interleaved complex values.
    fn fft(&self, x: &mut [f32]) {
        let n = self.bitrev.len();
        debug_assert_eq!(x.len(), n * 2);

        for (i, &j) in self.bitrev.iter().enumerate() {
            if j > i {
                x.swap(2 * i, 2 * j);
                x.swap(2 * i + 1, 2 * j + 1);
            }
        }

        let mut size = 2;
        while size <= n {
            let half = size / 2;
            let step = n / size;
            for start in (0..n).step_by(size) {
                for k in 0..half {
                    let a = 2 * (start + k);
                    let b = a + 2 * half;
                    let t = mul([x[b], x[b + 1]], self.twiddle[k * step]);
                    x[b] = x[a] - t[0];
                    x[b + 1] = x[a + 1] - t[1];
                    x[a] += t[0];
                    x[a + 1] += t[1];
                }
            }
            size *= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inverse_slow(input: &[f32]) -> Vec<f32> {
        let n = input.len() * 2;
        (0..n).map(|i| {
            let n = n as f64;
            input.iter().enumerate()
                .map(|(k, &x)| x as f64 * (PI / 2.0 / n * (2.0 * i as f64 + 1.0 + n / 2.0) * (2.0 * k as f64 + 1.0)).cos())
                .sum::<f64>() as f32
        }).collect()
    }

    fn check(len: usize, input: impl Fn(usize) -> f32, tolerance: f32) {
        let mut actual = vec![0_f32; len];
        for (i, v) in actual[..len / 2].iter_mut().enumerate() {
            *v = input(i);
        }
        let expected = inverse_slow(&actual[..len / 2]);

        Mdct::new(len).inverse(&mut actual);

        for (i, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
            assert!((a - e).abs() < tolerance, "[{}] {} != {}", i, a, e);
        }
    }

    #[test]
    fn impulse() {
        for k in [0, 1, 17, 31] {
            check(64, |i| if i == k { 1.0 } else { 0.0 }, 1e-5);
        }
    }

    #[test]
    fn short() {
        check(64, |i| ((i * 37) % 11) as f32 / 11.0 - 0.5, 1e-4);
        check(256, |i| ((i * 101) % 17) as f32 / 8.0 - 1.0, 1e-3);
    }

    #[test]
    fn long() {
        check(2048, |i| ((i * 7919) % 13) as f32 / 13.0 - 0.5, 1e-2);
        check(8192, |i| if i % 3 == 0 { 0.25 } else { -0.125 }, 5e-2);
    }

    #[test]
    fn symmetry() {
        let len = 128;
        let mut buf = vec![0_f32; len];
        for (i, v) in buf[..len / 2].iter_mut().enumerate() {
            *v = (i as f32 * 0.3).sin();
        }
        Mdct::new(len).inverse(&mut buf);
        for i in 0..len / 4 {
            assert!((buf[i] + buf[len / 2 - 1 - i]).abs() < 1e-4);
            assert!((buf[len / 2 + i] - buf[len - 1 - i]).abs() < 1e-4);
        }
    }
}
