use orb_core::{Descriptor, Keypoint, DESCRIPTOR_BITS, MAX_PATCH_SIZE};
use rand::Rng;
use rand_pcg::Pcg32;
use rayon::prelude::*;
use thiserror::Error;

const DESCRIPTOR_SIZE: usize = DESCRIPTOR_BITS / 8;

/// Fixed stream so every generator in every process samples the same pairs
const PATTERN_STATE: u64 = 0xcafe_f00d_d15e_a5e5;
const PATTERN_STREAM: u64 = 0x0a02_bdbf_7bb3_c0a7;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BriefError {
    #[error("Image data length mismatch: {width}x{height} needs {expected_len}, got {actual_len}")]
    InvalidImageData {
        width: usize,
        height: usize,
        expected_len: usize,
        actual_len: usize,
    },
}

/// 256 point-pair intensity tests inside a disc around the keypoint.
///
/// Points are drawn uniformly in the disc, so any rotation of the pattern
/// stays within `radius` of the keypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingPattern {
    pairs: Vec<(i8, i8, i8, i8)>,
    radius: i32,
}

impl SamplingPattern {
    /// Pattern for a patch of diameter `patch_size`.
    ///
    /// The radius is capped at `i8::MAX`, the widest offset a pair can hold.
    pub fn for_patch(patch_size: usize) -> Self {
        let radius = (patch_size.min(MAX_PATCH_SIZE) as i32 / 2 - 2).max(1);
        let mut rng = Pcg32::new(PATTERN_STATE, PATTERN_STREAM);
        let mut point = || loop {
            let x = rng.gen_range(-radius..=radius);
            let y = rng.gen_range(-radius..=radius);
            if x * x + y * y <= radius * radius {
                return (x as i8, y as i8);
            }
        };

        let mut pairs = Vec::with_capacity(DESCRIPTOR_BITS);
        while pairs.len() < DESCRIPTOR_BITS {
            let (x1, y1) = point();
            let (x2, y2) = point();
            if (x1, y1) != (x2, y2) {
                pairs.push((x1, y1, x2, y2));
            }
        }

        Self { pairs, radius }
    }

    pub fn pairs(&self) -> &[(i8, i8, i8, i8)] {
        &self.pairs
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }
}

pub struct BriefGenerator {
    pattern: SamplingPattern,
}

impl BriefGenerator {
    pub fn new(patch_size: usize) -> Self {
        Self {
            pattern: SamplingPattern::for_patch(patch_size),
        }
    }

    pub fn pattern(&self) -> &SamplingPattern {
        &self.pattern
    }

    /// Describe keypoints given in the coordinates of `img`.
    ///
    /// `img` should already be smoothed; the pattern is steered by each
    /// keypoint's angle. Output is index-aligned with `kps`.
    pub fn generate_descriptors(
        &self,
        img: &[u8],
        width: usize,
        height: usize,
        kps: &[Keypoint],
    ) -> Result<Vec<Descriptor>, BriefError> {
        if width == 0 || height == 0 || img.len() != width * height {
            return Err(BriefError::InvalidImageData {
                width,
                height,
                expected_len: width * height,
                actual_len: img.len(),
            });
        }

        let sampler = Sampler { img, w: width, h: height };
        Ok(kps
            .par_iter()
            .map(|kp| {
                let (s, c) = kp.angle.sin_cos();
                let (cx, cy) = (kp.x, kp.y);
                let mut d = [0u8; DESCRIPTOR_SIZE];

                for (i, &(dx1, dy1, dx2, dy2)) in self.pattern.pairs.iter().enumerate() {
                    let (dx1, dy1, dx2, dy2) = (dx1 as f32, dy1 as f32, dx2 as f32, dy2 as f32);
                    let val1 = sampler.bilinear(cx + c * dx1 - s * dy1, cy + s * dx1 + c * dy1);
                    let val2 = sampler.bilinear(cx + c * dx2 - s * dy2, cy + s * dx2 + c * dy2);

                    let bit = (val1 < val2) as u8;
                    d[i / 8] |= bit << (i % 8);
                }
                d
            })
            .collect())
    }
}

struct Sampler<'a> {
    img: &'a [u8],
    w: usize,
    h: usize,
}

impl Sampler<'_> {
    /// Bilinear interpolation for subpixel sampling, clamped at the edges
    fn bilinear(&self, x: f32, y: f32) -> f32 {
        let x = x.clamp(0.0, (self.w - 1) as f32);
        let y = y.clamp(0.0, (self.h - 1) as f32);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.w - 1);
        let y1 = (y0 + 1).min(self.h - 1);
        let dx = x - x0 as f32;
        let dy = y - y0 as f32;

        let p00 = self.img[y0 * self.w + x0] as f32;
        let p10 = self.img[y0 * self.w + x1] as f32;
        let p01 = self.img[y1 * self.w + x0] as f32;
        let p11 = self.img[y1 * self.w + x1] as f32;

        let top = p00 * (1.0 - dx) + p10 * dx;
        let bottom = p01 * (1.0 - dx) + p11 * dx;
        top * (1.0 - dy) + bottom * dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smooth, tie-free test texture
    fn texture(width: usize, height: usize) -> Vec<u8> {
        let mut img = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                let (fx, fy) = (x as f32, y as f32);
                let v = 128.0
                    + 50.0 * (fx * 0.31 + fy * 0.07).sin()
                    + 40.0 * (fy * 0.23 - fx * 0.11).cos()
                    + 30.0 * ((fx * fy) * 0.002).sin();
                img[y * width + x] = v.clamp(0.0, 255.0) as u8;
            }
        }
        img
    }

    /// Rotate 90 degrees clockwise: (x, y) -> (h - 1 - y, x)
    fn rotate_cw(img: &[u8], width: usize, height: usize) -> Vec<u8> {
        let mut out = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                let (u, v) = (height - 1 - y, x);
                out[v * height + u] = img[y * width + x];
            }
        }
        out
    }

    fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
        a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
    }

    #[test]
    fn test_pattern_is_deterministic_and_inside_disc() {
        let a = SamplingPattern::for_patch(31);
        let b = SamplingPattern::for_patch(31);
        assert_eq!(a, b);
        assert_eq!(a.pairs().len(), DESCRIPTOR_BITS);
        assert_eq!(a.radius(), 13);

        let r2 = a.radius() * a.radius();
        for &(x1, y1, x2, y2) in a.pairs() {
            assert!((x1 as i32).pow(2) + (y1 as i32).pow(2) <= r2);
            assert!((x2 as i32).pow(2) + (y2 as i32).pow(2) <= r2);
            assert_ne!((x1, y1), (x2, y2));
        }
    }

    #[test]
    fn test_pattern_offsets_fit_for_large_patches() {
        for patch_size in [MAX_PATCH_SIZE, 301, 1001] {
            let pattern = SamplingPattern::for_patch(patch_size);
            assert_eq!(pattern.radius(), 126);

            let r2 = pattern.radius() * pattern.radius();
            let reach = pattern
                .pairs()
                .iter()
                .flat_map(|&(x1, y1, x2, y2)| [(x1, y1), (x2, y2)])
                .map(|(x, y)| (x as i32).pow(2) + (y as i32).pow(2))
                .max()
                .unwrap();
            assert!(reach <= r2);
            // Points spread over the whole disc rather than a wrapped band
            assert!(reach > r2 / 2);
        }
    }

    #[test]
    fn test_descriptors_align_with_keypoints() {
        let (w, h) = (64, 64);
        let img = texture(w, h);
        let generator = BriefGenerator::new(31);
        let kps = vec![Keypoint::new(20.0, 20.0), Keypoint::new(40.0, 32.0), Keypoint::new(32.5, 41.25)];

        let desc = generator.generate_descriptors(&img, w, h, &kps).unwrap();
        assert_eq!(desc.len(), kps.len());
        assert_ne!(desc[0], desc[1]);

        assert!(generator.generate_descriptors(&img, w, h, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_image_data() {
        let generator = BriefGenerator::new(31);
        let result = generator.generate_descriptors(&[0u8; 10], 4, 4, &[Keypoint::new(1.0, 1.0)]);
        assert!(matches!(result, Err(BriefError::InvalidImageData { expected_len: 16, actual_len: 10, .. })));
    }

    #[test]
    fn test_steering_gives_rotation_invariance() {
        let (w, h) = (64, 48);
        let img = texture(w, h);
        let rotated = rotate_cw(&img, w, h);
        let generator = BriefGenerator::new(31);

        let (x, y) = (30usize, 24usize);
        let original = Keypoint { angle: 0.3, ..Keypoint::new(x as f32, y as f32) };
        let turned = Keypoint {
            angle: 0.3 + std::f32::consts::FRAC_PI_2,
            ..Keypoint::new((h - 1 - y) as f32, x as f32)
        };

        let a = generator.generate_descriptors(&img, w, h, &[original]).unwrap();
        let b = generator.generate_descriptors(&rotated, h, w, &[turned]).unwrap();
        assert!(hamming(&a[0], &b[0]) <= 8, "distance {}", hamming(&a[0], &b[0]));

        // Without steering the descriptors disagree
        let unsteered = Keypoint { angle: 0.3, ..turned };
        let c = generator.generate_descriptors(&rotated, h, w, &[unsteered]).unwrap();
        assert!(hamming(&a[0], &c[0]) > 40);
    }
}
