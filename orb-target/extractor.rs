use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use orb_brief::{BriefError, BriefGenerator};
use orb_core::{init_thread_pool, Descriptor, Keypoint, OrbConfig};
use orb_fast::{FastDetector, FastError, LevelDetections};
use rayon::prelude::*;
use thiserror::Error;

/// Smoothing applied to every pyramid level before description
const DESCRIPTOR_BLUR_SIGMA: f32 = 2.0;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("empty image: {width}x{height}")]
    EmptyImage { width: usize, height: usize },

    #[error("image buffer holds {actual_len} bytes, {width}x{height} needs {expected_len}")]
    InvalidImageData {
        width: usize,
        height: usize,
        expected_len: usize,
        actual_len: usize,
    },

    #[error("detection failed: {0}")]
    Fast(#[from] FastError),

    #[error("description failed: {0}")]
    Brief(#[from] BriefError),
}

/// Keypoints in base-image coordinates and their index-aligned descriptors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn position(&self, idx: usize) -> [f64; 2] {
        self.keypoints[idx].position()
    }
}

/// ORB feature extractor: multi-scale FAST detection with steered BRIEF
/// description
pub struct OrbExtractor {
    cfg: OrbConfig,
    brief: BriefGenerator,
}

impl OrbExtractor {
    pub fn new(cfg: OrbConfig) -> Self {
        if let Err(err) = init_thread_pool(cfg.n_threads) {
            tracing::warn!(%err, "could not configure thread pool, using the existing one");
        }
        let brief = BriefGenerator::new(cfg.patch_size);
        Self { cfg, brief }
    }

    pub fn config(&self) -> &OrbConfig {
        &self.cfg
    }

    pub fn extract_image(&self, img: &GrayImage) -> Result<Features, ExtractError> {
        let (w, h) = img.dimensions();
        self.extract(img.as_raw(), w as usize, h as usize)
    }

    /// Detect and describe features in a row-major grayscale buffer.
    ///
    /// Images too small to hold a single described patch yield no features.
    pub fn extract(&self, img: &[u8], width: usize, height: usize) -> Result<Features, ExtractError> {
        if width == 0 || height == 0 {
            return Err(ExtractError::EmptyImage { width, height });
        }
        if img.len() != width * height {
            return Err(ExtractError::InvalidImageData {
                width,
                height,
                expected_len: width * height,
                actual_len: img.len(),
            });
        }

        let detector = match FastDetector::new(self.cfg.clone(), width, height) {
            Ok(detector) => detector,
            Err(FastError::ImageTooSmall { width, height, min_size }) => {
                tracing::debug!(width, height, min_size, "image too small for detection");
                return Ok(Features::default());
            }
            Err(err) => return Err(err.into()),
        };

        let levels = detector.detect_pyramid(img)?;
        let described = levels
            .par_iter()
            .map(|level| self.describe_level(level))
            .collect::<Result<Vec<_>, _>>()?;

        let mut features = Features::default();
        for (kps, desc) in described {
            features.keypoints.extend(kps);
            features.descriptors.extend(desc);
        }

        tracing::debug!(
            width,
            height,
            levels = levels.len(),
            keypoints = features.len(),
            "extracted features"
        );
        Ok(features)
    }

    fn describe_level(&self, det: &LevelDetections) -> Result<(Vec<Keypoint>, Vec<Descriptor>), ExtractError> {
        if det.keypoints.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let (w, h) = (det.level.width, det.level.height);
        let level_img = GrayImage::from_raw(w as u32, h as u32, det.image.clone()).ok_or(
            ExtractError::InvalidImageData {
                width: w,
                height: h,
                expected_len: w * h,
                actual_len: det.image.len(),
            },
        )?;
        let smoothed = gaussian_blur_f32(&level_img, DESCRIPTOR_BLUR_SIGMA);

        let descriptors = self
            .brief
            .generate_descriptors(smoothed.as_raw(), w, h, &det.keypoints)?;
        let keypoints = det
            .keypoints
            .iter()
            .map(|kp| det.level.to_base(kp, self.cfg.patch_size))
            .collect();
        Ok((keypoints, descriptors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let cell = (x / 24 + y / 18) % 3;
            image::Luma([match cell {
                0 => 40,
                1 => 140,
                _ => 230,
            }])
        })
    }

    fn test_config() -> OrbConfig {
        OrbConfig {
            n_threads: 2,
            ..OrbConfig::default()
        }
    }

    #[test]
    fn test_keypoints_and_descriptors_align() {
        let extractor = OrbExtractor::new(test_config());
        let features = extractor.extract_image(&blocks(200, 160)).unwrap();

        assert!(!features.is_empty());
        assert_eq!(features.keypoints.len(), features.descriptors.len());
        assert!(features.len() <= extractor.config().max_features);
        for kp in &features.keypoints {
            assert!(kp.x >= 0.0 && kp.x < 200.0);
            assert!(kp.y >= 0.0 && kp.y < 160.0);
        }
    }

    #[test]
    fn test_deterministic() {
        let extractor = OrbExtractor::new(test_config());
        let img = blocks(160, 120);
        assert_eq!(extractor.extract_image(&img).unwrap(), extractor.extract_image(&img).unwrap());
    }

    #[test]
    fn test_empty_image_is_an_error() {
        let extractor = OrbExtractor::new(test_config());
        assert!(matches!(
            extractor.extract(&[], 0, 0),
            Err(ExtractError::EmptyImage { width: 0, height: 0 })
        ));
        assert!(matches!(
            extractor.extract(&[0u8; 10], 4, 4),
            Err(ExtractError::InvalidImageData { expected_len: 16, actual_len: 10, .. })
        ));
    }

    #[test]
    fn test_tiny_image_has_no_features() {
        let extractor = OrbExtractor::new(test_config());
        let features = extractor.extract(&[128u8; 6 * 6], 6, 6).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn test_uniform_image_has_no_features() {
        let extractor = OrbExtractor::new(test_config());
        let features = extractor.extract(&vec![90u8; 128 * 96], 128, 96).unwrap();
        assert!(features.is_empty());
    }
}
