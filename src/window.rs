use std::f32::consts::PI;

use crate::header::{FrameKind, FrameLens};

/// Which of the two overlapped frames receives the overlap-add result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OverlapTarget {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowRange {
    pub start: usize,
    pub end: usize,
}

impl WindowRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Describes how the second half of the left frame overlaps the first half of the right frame.
///
/// `left` and `right` are the ranges of the finished samples in each of the frames: the sum of
/// the overlapping slopes is stored in the target frame and the non-overlapping part of the
/// target range is emitted as is.
#[derive(Debug)]
pub struct Window {
    pub left: WindowRange,
    left_slope_start: usize,
    pub right: WindowRange,
    right_slope_end: usize,
    slope: FrameKind,
    pub overlap_target: OverlapTarget,
}

impl Window {
    fn new(left_len: usize, right_len: usize, slope: FrameKind) -> Self {
        let left_start = left_len / 2;
        let right_end = right_len / 2;
        if left_len == right_len {
            Window {
                left: WindowRange { start: left_start, end: left_len },
                left_slope_start: left_start,
                right: WindowRange { start: 0, end: right_end },
                right_slope_end: right_end,
                slope,
                overlap_target: OverlapTarget::Left,
            }
        } else if left_len > right_len {
            // Long -> short.
            let left_point = left_len * 3 / 4;
            let right_point = right_len / 4;
            Window {
                left: WindowRange { start: left_start, end: left_point + right_point },
                left_slope_start: left_point - right_point,
                right: WindowRange { start: 0, end: right_end },
                right_slope_end: right_end,
                slope: FrameKind::Short,
                overlap_target: OverlapTarget::Left,
            }
        } else {
            // Short -> long.
            let left_point = left_len / 4;
            let right_point = right_len / 4;
            Window {
                left: WindowRange { start: left_start, end: left_len },
                left_slope_start: left_start,
                right: WindowRange { start: right_point - left_point, end: right_end },
                right_slope_end: right_point + left_point,
                slope: FrameKind::Short,
                overlap_target: OverlapTarget::Right,
            }
        }
    }

    /// Number of finished samples per channel.
    pub fn len(&self) -> usize {
        self.target_range().len()
    }

    pub fn target_range(&self) -> WindowRange {
        match self.overlap_target {
            OverlapTarget::Left => self.left,
            OverlapTarget::Right => self.right,
        }
    }
}

/// Windows for all four short/long frame transitions.
#[derive(Debug)]
pub struct Windows {
    /// Rising slopes of short and long windows, indexed by `FrameKind`.
    slopes: [Box<[f32]>; 2],
    windows: [Window; 4],
}

impl Windows {
    pub fn new(frame_lens: FrameLens) -> Self {
        let (short, long) = (frame_lens.short(), frame_lens.long());
        let windows = [
            Window::new(short, short, FrameKind::Short),
            Window::new(long, short, FrameKind::Short),
            Window::new(short, long, FrameKind::Short),
            Window::new(long, long, FrameKind::Long),
        ];
        Windows {
            slopes: [make_slope(short / 2), make_slope(long / 2)],
            windows,
        }
    }

    pub fn get(&self, left_kind: FrameKind, right_kind: FrameKind) -> &Window {
        &self.windows[Self::window_idx(left_kind, right_kind)]
    }

    /// Overlap-adds the windowed tail of the `left` frame with the windowed head of the `right`
    /// frame. Both frames must hold the inverse MDCT output.
    pub fn overlap(&self, left_kind: FrameKind, right_kind: FrameKind,
            left: &mut [f32], right: &mut [f32]) {
        let window = self.get(left_kind, right_kind);
        let slope = &self.slopes[window.slope as usize];
        let l_it = left[window.left_slope_start..window.left.end].iter_mut();
        let r_it = right[window.right.start..window.right_slope_end].iter_mut();
        for (((l, r), &l_slope), &r_slope) in l_it.zip(r_it)
                .zip(slope.iter().rev())
                .zip(slope.iter()) {
            let v = *l * l_slope + *r * r_slope;
            match window.overlap_target {
                OverlapTarget::Left => *l = v,
                OverlapTarget::Right => *r = v,
            }
        }
    }

    fn window_idx(left_kind: FrameKind, right_kind: FrameKind) -> usize {
        left_kind as usize | (right_kind as usize) << 1
    }
}

/// Rising half of the Vorbis window: `sin(π/2 * sin²((x + 0.5) / len * π/2))`.
fn make_slope(len: usize) -> Box<[f32]> {
    let n = len as f32;
    (0..len)
        .map(|x| {
            let s = ((x as f32 + 0.5) / n * 0.5 * PI).sin();
            (0.5 * PI * s * s).sin()
        })
        .collect::<Vec<_>>()
        .into_boxed_slice()
}
