use orb_core::{Keypoint, OrbConfig, MAX_PATCH_SIZE};
use crate::corner_detection::CornerDetector;
use crate::error::{FastError, FastResult};
use crate::pyramid::ImagePyramid;
use crate::refinement::KeypointRefinement;
use crate::types::{CornerType, LevelDetections, ScaleLevel, ScoredKeypoint};
use rayon::prelude::*;

/// FAST requires at least a 7x7 image (3-pixel ring on each side)
const MIN_SIZE: usize = 7;

/// Main FAST corner detector with multi-scale capability
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: OrbConfig,
    w: usize,
    h: usize,
    scale_levels: Vec<ScaleLevel>,
    quotas: Vec<usize>,
    umax: Vec<usize>,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: OrbConfig, width: usize, height: usize) -> FastResult<Self> {
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }

        // 0 would detect everything, >127 could cause issues with u8 arithmetic
        if cfg.threshold == 0 || cfg.threshold > 127 {
            return Err(FastError::InvalidThreshold(cfg.threshold));
        }

        if cfg.patch_size % 2 == 0 || cfg.patch_size < MIN_SIZE || cfg.patch_size > MAX_PATCH_SIZE {
            return Err(FastError::InvalidPatchSize { patch_size: cfg.patch_size });
        }

        if cfg.n_levels == 0 || !(cfg.scale_factor > 1.0) {
            return Err(FastError::InvalidPyramid {
                n_levels: cfg.n_levels,
                scale_factor: cfg.scale_factor,
            });
        }

        // Every keypoint needs its whole patch inside the level
        let min_size = (2 * cfg.border() + 1).max(MIN_SIZE);
        if width < min_size || height < min_size {
            return Err(FastError::ImageTooSmall { width, height, min_size });
        }

        let scale_levels = ImagePyramid::generate_scale_levels(width, height, cfg.n_levels, cfg.scale_factor, min_size);
        let quotas = ImagePyramid::feature_quotas(scale_levels.len(), cfg.max_features, cfg.scale_factor);
        let umax = KeypointRefinement::circular_extent(cfg.patch_size / 2);

        Ok(Self {
            cfg,
            w: width,
            h: height,
            scale_levels,
            quotas,
            umax,
        })
    }

    /// Validates image data before processing
    fn validate_image(&self, img: &[u8]) -> FastResult<()> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(FastError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }
        Ok(())
    }

    /// Detect keypoints on every level, returned in base-level coordinates
    pub fn detect_keypoints(&self, img: &[u8]) -> FastResult<Vec<Keypoint>> {
        let levels = self.detect_pyramid(img)?;
        Ok(levels
            .iter()
            .flat_map(|level| {
                level
                    .keypoints
                    .iter()
                    .map(move |kp| level.level.to_base(kp, self.cfg.patch_size))
            })
            .collect())
    }

    /// Build the pyramid and detect oriented keypoints on each level.
    ///
    /// Keypoints stay in their level's coordinates alongside the level image
    /// so descriptors can be computed where the corner was found.
    pub fn detect_pyramid(&self, img: &[u8]) -> FastResult<Vec<LevelDetections>> {
        self.validate_image(img)?;

        let pyramid = ImagePyramid::build_image_pyramid(img, self.w, self.h, &self.scale_levels);

        let detections: Vec<LevelDetections> = self
            .scale_levels
            .par_iter()
            .zip(pyramid.into_par_iter())
            .zip(self.quotas.par_iter())
            .map(|((scale_level, level_img), &quota)| {
                let scored = self.detect_keypoints_at_scale(&level_img, scale_level, quota);
                let keypoints = scored
                    .into_iter()
                    .map(|sk| {
                        let x = sk.keypoint.x as usize;
                        let y = sk.keypoint.y as usize;
                        Keypoint {
                            angle: KeypointRefinement::compute_orientation(&level_img, scale_level.width, x, y, &self.umax),
                            response: sk.response,
                            octave: scale_level.level,
                            ..sk.keypoint
                        }
                    })
                    .collect();

                LevelDetections {
                    level: *scale_level,
                    image: level_img,
                    keypoints,
                }
            })
            .collect();

        tracing::trace!(
            levels = detections.len(),
            keypoints = detections.iter().map(|d| d.keypoints.len()).sum::<usize>(),
            "FAST pyramid detection finished"
        );

        Ok(detections)
    }

    /// FAST-9 candidates on one level, Harris-ranked, suppressed and capped at `quota`
    pub fn detect_keypoints_at_scale(&self, img: &[u8], scale_level: &ScaleLevel, quota: usize) -> Vec<ScoredKeypoint> {
        let candidates = self.detect_keypoints_with_response(img, scale_level);
        KeypointRefinement::non_maximum_suppression(&candidates, self.cfg.nms_radius, quota)
    }

    /// All FAST corners with a positive Harris response, outside the patch border
    pub fn detect_keypoints_with_response(&self, img: &[u8], scale_level: &ScaleLevel) -> Vec<ScoredKeypoint> {
        let width = scale_level.width;
        let height = scale_level.height;
        let border = self.cfg.border().max(3);
        if width <= 2 * border || height <= 2 * border {
            return Vec::new();
        }

        (border..height - border)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row_keypoints = Vec::new();
                for x in border..width - border {
                    if CornerDetector::classify(img, width, x, y, self.cfg.threshold) == CornerType::None {
                        continue;
                    }
                    let response = CornerDetector::compute_harris_response(img, width, height, x, y);
                    if response > 0.0 {
                        row_keypoints.push(ScoredKeypoint {
                            keypoint: Keypoint::new(x as f32, y as f32),
                            response,
                        });
                    }
                }
                row_keypoints
            })
            .collect()
    }

    /// Get scale levels for this detector
    pub fn scale_levels(&self) -> &[ScaleLevel] {
        &self.scale_levels
    }

    /// Per-level keypoint budgets
    pub fn quotas(&self) -> &[usize] {
        &self.quotas
    }

    /// Get detector configuration
    pub fn config(&self) -> &OrbConfig {
        &self.cfg
    }

    /// Get image dimensions
    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }
}
