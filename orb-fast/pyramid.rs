use orb_core::Image;
use crate::types::ScaleLevel;

/// Levels smaller than this in either dimension are not worth scanning
const MIN_LEVEL_SIZE: usize = 32;

/// Image pyramid operations for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Generate scale levels for image pyramid.
    ///
    /// Level 0 is always present; further levels stop once a level would be
    /// smaller than `min_size` (or 32 px) in either dimension.
    pub fn generate_scale_levels(
        width: usize,
        height: usize,
        n_levels: usize,
        scale_factor: f32,
        min_size: usize,
    ) -> Vec<ScaleLevel> {
        let mut levels = Vec::with_capacity(n_levels);
        let min_size = min_size.max(MIN_LEVEL_SIZE);
        let mut current_scale = 1.0f32;

        for level in 0..n_levels.max(1) {
            let scaled_width = ((width as f32) / current_scale).round() as usize;
            let scaled_height = ((height as f32) / current_scale).round() as usize;

            if level > 0 && (scaled_width < min_size || scaled_height < min_size) {
                break;
            }

            levels.push(ScaleLevel {
                level,
                scale: current_scale,
                width: scaled_width,
                height: scaled_height,
                ratio_x: width as f32 / scaled_width as f32,
                ratio_y: height as f32 / scaled_height as f32,
            });

            current_scale *= scale_factor;
        }

        levels
    }

    /// Split `max_features` over the levels, each level getting
    /// `1 / scale_factor` of the previous one's share.
    pub fn feature_quotas(n_levels: usize, max_features: usize, scale_factor: f32) -> Vec<usize> {
        if n_levels == 0 {
            return Vec::new();
        }

        let factor = 1.0 / scale_factor;
        let mut per_level =
            max_features as f32 * (1.0 - factor) / (1.0 - factor.powi(n_levels as i32));
        let mut quotas = Vec::with_capacity(n_levels);
        let mut assigned = 0usize;

        for _ in 0..n_levels - 1 {
            let quota = (per_level.round() as usize).min(max_features - assigned);
            assigned += quota;
            quotas.push(quota);
            per_level *= factor;
        }
        quotas.push(max_features - assigned);

        quotas
    }

    /// Build image pyramid from base image
    pub fn build_image_pyramid(img: &[u8], width: usize, height: usize, scale_levels: &[ScaleLevel]) -> Vec<Image> {
        scale_levels
            .iter()
            .map(|scale_level| {
                if scale_level.level == 0 {
                    img.to_vec()
                } else {
                    Self::downsample_image(img, width, height, scale_level.width, scale_level.height)
                }
            })
            .collect()
    }

    /// Downsample by averaging the exact source footprint of every target pixel
    pub fn downsample_image(img: &[u8], src_width: usize, src_height: usize, target_width: usize, target_height: usize) -> Image {
        let x_weights = Self::axis_weights(src_width, target_width);
        let y_weights = Self::axis_weights(src_height, target_height);

        // Horizontal pass: src_height rows of target_width samples
        let mut rows = vec![0.0f32; src_height * target_width];
        for y in 0..src_height {
            let src_row = &img[y * src_width..(y + 1) * src_width];
            let dst_row = &mut rows[y * target_width..(y + 1) * target_width];
            for (dst, weights) in dst_row.iter_mut().zip(&x_weights) {
                *dst = weights.iter().map(|&(x, w)| src_row[x] as f32 * w).sum();
            }
        }

        let mut downsampled = vec![0u8; target_width * target_height];
        for (ty, weights) in y_weights.iter().enumerate() {
            for tx in 0..target_width {
                let value: f32 = weights
                    .iter()
                    .map(|&(y, w)| rows[y * target_width + tx] * w)
                    .sum();
                downsampled[ty * target_width + tx] = value.round().clamp(0.0, 255.0) as u8;
            }
        }

        downsampled
    }

    /// Normalized overlap weights of each target cell with the source cells
    fn axis_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
        let ratio = src_len as f64 / dst_len as f64;

        (0..dst_len)
            .map(|i| {
                let start = i as f64 * ratio;
                let end = ((i + 1) as f64 * ratio).min(src_len as f64);
                let first = start.floor() as usize;
                let last = (end.ceil() as usize).min(src_len);

                (first..last)
                    .filter_map(|s| {
                        let overlap = (end.min(s as f64 + 1.0) - start.max(s as f64)).max(0.0);
                        (overlap > 0.0).then(|| (s, (overlap / ratio) as f32))
                    })
                    .collect()
            })
            .collect()
    }
}
