//! Forward discrete wavelet transforms (5/3 reversible, 9/7 irreversible).
//!
//! Transforms work in place on a tile-component laid out row-major; after
//! `levels` decompositions the buffer holds the usual Mallat layout with the
//! LL band in the top-left corner.

/// Orientation of a wavelet subband.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubbandOrientation {
    #[default]
    /// Low-Low (base image)
    LL,
    /// High-Low (horizontal details)
    HL,
    /// Low-High (vertical details)
    LH,
    /// High-High (diagonal details)
    HH,
}

pub struct Dwt53;

impl Dwt53 {
    /// One 1D analysis step with symmetric extension. On return the low-pass
    /// coefficients occupy the front of `line`, high-pass the back.
    pub fn forward(line: &mut [i32], scratch: &mut Vec<i32>) {
        let len = line.len();
        if len < 2 {
            return;
        }
        for i in (1..len).step_by(2) {
            let left = line[i - 1];
            let right = if i + 1 < len { line[i + 1] } else { line[i - 1] };
            line[i] -= (left + right) >> 1;
        }
        for i in (0..len).step_by(2) {
            let left = if i > 0 { line[i - 1] } else { line[i + 1] };
            let right = if i + 1 < len { line[i + 1] } else { line[i - 1] };
            line[i] += (left + right + 2) >> 2;
        }
        deinterleave(line, scratch);
    }
}

pub struct Dwt97;

impl Dwt97 {
    const ALPHA: f32 = -1.586_134_3;
    const BETA: f32 = -0.052_980_118;
    const GAMMA: f32 = 0.882_911_1;
    const DELTA: f32 = 0.443_506_87;
    const K: f32 = 1.230_174_1;

    /// One 1D analysis step; same output layout as [`Dwt53::forward`].
    pub fn forward(line: &mut [f32], scratch: &mut Vec<f32>) {
        let len = line.len();
        if len < 2 {
            return;
        }
        Self::lift(line, 1, Self::ALPHA);
        Self::lift(line, 0, Self::BETA);
        Self::lift(line, 1, Self::GAMMA);
        Self::lift(line, 0, Self::DELTA);
        for (i, v) in line.iter_mut().enumerate() {
            if i % 2 == 0 {
                *v /= Self::K;
            } else {
                *v *= Self::K;
            }
        }
        deinterleave(line, scratch);
    }

    fn lift(line: &mut [f32], parity: usize, weight: f32) {
        let len = line.len();
        for i in (parity..len).step_by(2) {
            let left = if i > 0 { line[i - 1] } else { line[i + 1] };
            let right = if i + 1 < len { line[i + 1] } else { line[i - 1] };
            line[i] += weight * (left + right);
        }
    }
}

fn deinterleave<T: Copy>(line: &mut [T], scratch: &mut Vec<T>) {
    scratch.clear();
    scratch.extend(line.iter().step_by(2));
    scratch.extend(line.iter().skip(1).step_by(2));
    line.copy_from_slice(scratch);
}

/// Applies `levels` 2D decompositions in place.
pub fn forward_2d<T: Copy + Default>(
    data: &mut [T],
    width: usize,
    height: usize,
    levels: usize,
    transform: fn(&mut [T], &mut Vec<T>),
) {
    let mut scratch = Vec::with_capacity(width.max(height));
    let mut column = vec![T::default(); height];
    let (mut w, mut h) = (width, height);

    for _ in 0..levels {
        for y in 0..h {
            transform(&mut data[y * width..y * width + w], &mut scratch);
        }
        for x in 0..w {
            for y in 0..h {
                column[y] = data[y * width + x];
            }
            transform(&mut column[..h], &mut scratch);
            for y in 0..h {
                data[y * width + x] = column[y];
            }
        }
        w = w.div_ceil(2);
        h = h.div_ceil(2);
    }
}

/// Location of one subband inside the transformed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubbandRect {
    pub orientation: SubbandOrientation,
    /// Resolution level the subband belongs to (0 holds only LL).
    pub resolution: usize,
    pub x0: usize,
    pub y0: usize,
    pub width: usize,
    pub height: usize,
}

/// Width and height of each resolution level, lowest resolution first.
pub fn resolution_sizes(width: usize, height: usize, levels: usize) -> Vec<(usize, usize)> {
    let mut sizes = Vec::with_capacity(levels + 1);
    let (mut w, mut h) = (width, height);
    sizes.push((w, h));
    for _ in 0..levels {
        w = w.div_ceil(2);
        h = h.div_ceil(2);
        sizes.push((w, h));
    }
    sizes.reverse();
    sizes
}

/// Subbands of a `levels`-deep decomposition: LL, then HL, LH, HH for each
/// resolution from the lowest up.
pub fn subband_layout(width: usize, height: usize, levels: usize) -> Vec<SubbandRect> {
    let sizes = resolution_sizes(width, height, levels);
    let (ll_w, ll_h) = sizes[0];
    let mut rects = vec![SubbandRect {
        orientation: SubbandOrientation::LL,
        resolution: 0,
        x0: 0,
        y0: 0,
        width: ll_w,
        height: ll_h,
    }];

    for resolution in 1..=levels {
        let (low_w, low_h) = sizes[resolution - 1];
        let (full_w, full_h) = sizes[resolution];
        let band = |orientation, x0, y0, width, height| SubbandRect {
            orientation,
            resolution,
            x0,
            y0,
            width,
            height,
        };
        rects.push(band(SubbandOrientation::HL, low_w, 0, full_w - low_w, low_h));
        rects.push(band(SubbandOrientation::LH, 0, low_h, low_w, full_h - low_h));
        rects.push(band(
            SubbandOrientation::HH,
            low_w,
            low_h,
            full_w - low_w,
            full_h - low_h,
        ));
    }
    rects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dwt_53_constant_signal() {
        let mut line = [50; 9];
        let mut scratch = Vec::new();
        Dwt53::forward(&mut line, &mut scratch);
        assert_eq!(&line[..5], &[50; 5]);
        assert_eq!(&line[5..], &[0; 4]);
    }

    #[test]
    fn test_dwt_53_ramp_has_zero_detail() {
        let mut line = [10, 20, 30, 40, 50, 60, 70, 80];
        let mut scratch = Vec::new();
        Dwt53::forward(&mut line, &mut scratch);
        // Interior high-pass of a linear ramp vanishes; the last one sees the
        // mirrored boundary.
        assert_eq!(&line[4..7], &[0, 0, 0]);
    }

    #[test]
    fn test_dwt_97_constant_signal() {
        let mut line = [8.0f32; 8];
        let mut scratch = Vec::new();
        Dwt97::forward(&mut line, &mut scratch);
        for &h in &line[4..] {
            assert!(h.abs() < 1e-4, "high-pass {h}");
        }
        for &l in &line[..4] {
            assert!((l - 8.0).abs() < 1e-3, "low-pass {l}");
        }
    }

    #[test]
    fn test_short_lines_are_untouched() {
        let mut one = [7];
        Dwt53::forward(&mut one, &mut Vec::new());
        assert_eq!(one, [7]);
        let mut onef = [7.0f32];
        Dwt97::forward(&mut onef, &mut Vec::new());
        assert_eq!(onef, [7.0]);
    }

    #[test]
    fn test_forward_2d_constant_image() {
        let (w, h) = (6, 5);
        let mut data = vec![3i32; w * h];
        forward_2d(&mut data, w, h, 2, Dwt53::forward);
        // LL after two levels is 2x2 and keeps the DC value.
        assert_eq!(data[0], 3);
        assert_eq!(data[1], 3);
        assert_eq!(data[w], 3);
        assert_eq!(data[w + 1], 3);
        let nonzero = data.iter().filter(|&&v| v != 0).count();
        assert_eq!(nonzero, 4);
    }

    #[test]
    fn test_subband_layout_covers_image() {
        let (w, h) = (13, 7);
        let rects = subband_layout(w, h, 3);
        assert_eq!(rects.len(), 10);
        let area: usize = rects.iter().map(|r| r.width * r.height).sum();
        assert_eq!(area, w * h);
        assert_eq!(rects[0].orientation, SubbandOrientation::LL);
        assert_eq!((rects[0].width, rects[0].height), (2, 1));
        assert_eq!(rects[9].resolution, 3);
        assert_eq!((rects[9].x0, rects[9].y0), (7, 4));
    }

    #[test]
    fn test_resolution_sizes() {
        assert_eq!(
            resolution_sizes(256, 100, 3),
            vec![(32, 13), (64, 25), (128, 50), (256, 100)]
        );
    }
}
