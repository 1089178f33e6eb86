use std::sync::{Arc, PoisonError, RwLock};

use image::GrayImage;
use orb_homography::{fit_homography_ransac, is_convex_quad, model_corners, quad_area, HomographyError};
use orb_match::MatchError;
use thiserror::Error;

use crate::config::{ConfigError, DetectionConfig};
use crate::extractor::{ExtractError, Features, OrbExtractor};
use crate::result::{DetectionResult, Location, Rejection, Verdict};

/// Smallest projected model outline, in square frame pixels
const MIN_QUAD_AREA: f64 = 16.0;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("model extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("model image ({width}x{height}) has no features")]
    FeaturelessModel { width: u32, height: u32 },
}

/// Reference image features, computed once and shared read-only
#[derive(Debug, Clone)]
pub struct RegisteredModel {
    width: u32,
    height: u32,
    features: Features,
}

impl RegisteredModel {
    pub fn new(image: &GrayImage, extractor: &OrbExtractor) -> Result<Self, SessionError> {
        let (width, height) = image.dimensions();
        let features = extractor.extract_image(image)?;
        if features.is_empty() {
            return Err(SessionError::FeaturelessModel { width, height });
        }
        tracing::debug!(width, height, keypoints = features.len(), "registered model");
        Ok(Self {
            width,
            height,
            features,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Model corners in model pixel coordinates, clockwise from the top-left
    pub fn corners(&self) -> [[f64; 2]; 4] {
        model_corners(self.width, self.height)
    }
}

/// Locate `model` in `frame`.
///
/// Every failure resolves into a [`Verdict::NotMatched`] with its reason.
pub fn detect_and_locate(model: &RegisteredModel, frame: &GrayImage, config: &DetectionConfig) -> DetectionResult {
    let extractor = OrbExtractor::new(config.orb.clone());
    locate(model, frame, config, &extractor)
}

fn locate(model: &RegisteredModel, frame: &GrayImage, config: &DetectionConfig, extractor: &OrbExtractor) -> DetectionResult {
    let frame_features = match extractor.extract_image(frame) {
        Ok(features) if !features.is_empty() => features,
        Ok(_) => {
            tracing::warn!("frame has no features");
            return DetectionResult::rejected(Vec::new(), Vec::new(), Rejection::NoFeatures);
        }
        Err(err) => {
            tracing::warn!(%err, "frame extraction failed");
            return DetectionResult::rejected(Vec::new(), Vec::new(), Rejection::NoFeatures);
        }
    };

    let matches = config
        .matcher
        .match_descriptors(&model.features.descriptors, &frame_features.descriptors);
    tracing::debug!(
        model = model.features.len(),
        frame = frame_features.len(),
        matches = matches.len(),
        "matched features"
    );

    let selected = match config.filter.filter(matches.clone()) {
        Ok(selected) => selected,
        Err(MatchError::InsufficientMatches { found, required }) => {
            tracing::warn!(found, required, "not enough matches");
            return DetectionResult::rejected(
                frame_features.keypoints,
                matches,
                Rejection::InsufficientMatches { found, required },
            );
        }
    };

    let (src, dst): (Vec<[f64; 2]>, Vec<[f64; 2]>) = selected
        .iter()
        .map(|m| (model.features.position(m.query_idx), frame_features.position(m.train_idx)))
        .unzip();

    let fit = match fit_homography_ransac(&src, &dst, &config.ransac) {
        Ok(fit) => fit,
        Err(err) => {
            log_estimation_failure(&err);
            return DetectionResult::rejected(frame_features.keypoints, matches, Rejection::NoHomography);
        }
    };

    let corners = model.corners().map(|c| fit.homography.project_point(c));
    match corners {
        [Some(a), Some(b), Some(c), Some(d)] => {
            let quad = [a, b, c, d];
            if !is_convex_quad(&quad) || quad_area(&quad).abs() < MIN_QUAD_AREA {
                tracing::warn!(?quad, "projected model outline is folded or collapsed");
                return DetectionResult::rejected(frame_features.keypoints, matches, Rejection::NoHomography);
            }
        }
        _ => tracing::warn!("model corner projects to infinity"),
    }
    tracing::debug!(
        inliers = fit.n_inliers,
        candidates = selected.len(),
        iterations = fit.iterations,
        "located model"
    );

    DetectionResult {
        frame_keypoints: frame_features.keypoints,
        matches,
        verdict: Verdict::Matched(Location {
            homography: fit.homography,
            correspondences: selected,
            inlier_mask: fit.inlier_mask,
            n_inliers: fit.n_inliers,
            corners,
        }),
    }
}

fn log_estimation_failure(err: &HomographyError) {
    match err {
        HomographyError::Degenerate { .. } => tracing::warn!(%err, "degenerate correspondences"),
        HomographyError::InsufficientInliers { needed, found } => {
            tracing::warn!(needed, found, "homography lacks inlier support")
        }
        _ => tracing::warn!(%err, "homography estimation failed"),
    }
}

/// A registered model plus the configuration used to look for it.
///
/// `detect` may run concurrently from several threads; re-registering swaps
/// the model without blocking detections already in flight.
pub struct DetectionSession {
    config: DetectionConfig,
    extractor: OrbExtractor,
    model: RwLock<Arc<RegisteredModel>>,
}

impl DetectionSession {
    pub fn new(config: DetectionConfig, model_image: &GrayImage) -> Result<Self, SessionError> {
        config.validate()?;
        tracing::info!("{}", config.summary());

        let extractor = OrbExtractor::new(config.orb.clone());
        let model = RegisteredModel::new(model_image, &extractor)?;
        Ok(Self {
            config,
            extractor,
            model: RwLock::new(Arc::new(model)),
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Current model snapshot
    pub fn model(&self) -> Arc<RegisteredModel> {
        Arc::clone(&self.model.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the model; the old one stays alive for detections holding it
    pub fn register_model(&self, image: &GrayImage) -> Result<(), SessionError> {
        let model = Arc::new(RegisteredModel::new(image, &self.extractor)?);
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = model;
        Ok(())
    }

    pub fn detect(&self, frame: &GrayImage) -> DetectionResult {
        let model = self.model();
        locate(&model, frame, &self.config, &self.extractor)
    }

    /// Per-frame pull interface: the location, or why there is none
    pub fn try_detect(&self, frame: &GrayImage) -> Result<Location, Rejection> {
        match self.detect(frame).into_verdict() {
            Verdict::Matched(location) => Ok(location),
            Verdict::NotMatched(rejection) => Err(rejection),
        }
    }
}
