use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dlt::{estimate_homography_dlt, has_collinear_triple, solve_minimal};
use crate::error::{HomographyError, HomographyResult};
use crate::project::{reprojection_error, Homography};

const SAMPLE_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RansacConfig {
    /// Upper bound on sampled hypotheses
    pub max_iterations: usize,
    /// Inlier threshold (reprojection error in frame pixels)
    pub reprojection_threshold: f64,
    /// Probability of having drawn one all-inlier sample before stopping early
    pub confidence: f64,
    /// Fewest inliers a fit needs; a minimal sample always supports itself
    pub min_inliers: usize,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            reprojection_threshold: 5.0,
            confidence: 0.995,
            min_inliers: 8,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RansacResult {
    pub homography: Homography,
    /// Parallel to the input correspondences
    pub inlier_mask: Vec<bool>,
    pub n_inliers: usize,
    /// Hypotheses drawn before stopping
    pub iterations: usize,
}

fn score(h: &Matrix3<f64>, src: &[[f64; 2]], dst: &[[f64; 2]], threshold: f64) -> (Vec<bool>, usize) {
    let mask: Vec<bool> = src
        .iter()
        .zip(dst)
        .map(|(&s, &d)| reprojection_error(h, s, d) < threshold)
        .collect();
    let count = mask.iter().filter(|&&m| m).count();
    (mask, count)
}

/// Iterations needed to see an all-inlier sample with `confidence`
fn required_iterations(inlier_ratio: f64, confidence: f64, cap: usize) -> usize {
    let all_inliers = inlier_ratio.powi(SAMPLE_SIZE as i32);
    if all_inliers >= 1.0 {
        return 1;
    }
    if all_inliers <= 0.0 || confidence >= 1.0 {
        return cap;
    }
    let needed = (1.0 - confidence).ln() / (1.0 - all_inliers).ln();
    if needed.is_finite() {
        (needed.ceil().max(1.0) as usize).min(cap)
    } else {
        cap
    }
}

/// Fit a homography mapping `src` onto `dst` with RANSAC.
///
/// Samples with a collinear triple in either point set are skipped. The
/// best hypothesis is refit over its inliers with normalized DLT; the refit
/// is kept unless it supports fewer correspondences. Fits supported by fewer
/// than `min_inliers` correspondences are rejected. The same inputs and
/// seed always give the same mask.
pub fn fit_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacConfig,
) -> HomographyResult<RansacResult> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    let n = src.len();
    if n < SAMPLE_SIZE {
        return Err(HomographyError::TooFewPoints {
            needed: SAMPLE_SIZE,
            got: n,
        });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;
    let mut limit = config.max_iterations;
    let mut iterations = 0;

    while iterations < limit {
        iterations += 1;

        let sample = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
        let mut s4 = [[0.0; 2]; SAMPLE_SIZE];
        let mut d4 = [[0.0; 2]; SAMPLE_SIZE];
        for (k, idx) in sample.iter().enumerate() {
            s4[k] = src[idx];
            d4[k] = dst[idx];
        }
        if has_collinear_triple(&s4) || has_collinear_triple(&d4) {
            continue;
        }

        let Some(h) = solve_minimal(&s4, &d4) else {
            continue;
        };

        let (mask, count) = score(&h, src, dst, config.reprojection_threshold);
        if best.as_ref().map_or(true, |(_, _, c)| count > *c) {
            limit = required_iterations(count as f64 / n as f64, config.confidence, config.max_iterations);
            best = Some((h, mask, count));
        }
    }

    let Some((h, mask, count)) = best else {
        tracing::debug!(iterations, "no non-degenerate sample");
        return Err(HomographyError::Degenerate { iterations });
    };

    let (inlier_src, inlier_dst): (Vec<_>, Vec<_>) = src
        .iter()
        .zip(dst)
        .zip(&mask)
        .filter(|(_, m)| **m)
        .map(|((&s, &d), _)| (s, d))
        .unzip();

    let (h, mask, count) = match estimate_homography_dlt(&inlier_src, &inlier_dst) {
        Ok(refit) => {
            let (refit_mask, refit_count) = score(&refit, src, dst, config.reprojection_threshold);
            if refit_count >= count {
                (refit, refit_mask, refit_count)
            } else {
                (h, mask, count)
            }
        }
        Err(_) => (h, mask, count),
    };

    tracing::trace!(iterations, inliers = count, total = n, "ransac finished");

    if count < config.min_inliers {
        return Err(HomographyError::InsufficientInliers {
            needed: config.min_inliers,
            found: count,
        });
    }

    Ok(RansacResult {
        homography: Homography::new(h),
        inlier_mask: mask,
        n_inliers: count,
        iterations,
    })
}
