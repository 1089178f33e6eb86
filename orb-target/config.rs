use orb_core::{OrbConfig, MAX_PATCH_SIZE};
use orb_homography::RansacConfig;
use orb_match::{BruteForceMatcher, MatchFilter};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("keep_matches must be at least 4 to fit a homography, got {0}")]
    InvalidKeepMatches(usize),

    #[error("reprojection threshold must be positive, got {0}")]
    InvalidReprojectionThreshold(f64),

    #[error("min_inliers must be between 4 and keep_matches ({keep_matches}), got {min_inliers}")]
    InvalidMinInliers { min_inliers: usize, keep_matches: usize },

    #[error("max_iterations must be positive")]
    InvalidIterations,

    #[error("confidence must be in (0, 1], got {0}")]
    InvalidConfidence(f64),

    #[error("FAST threshold must be in 1..=127, got {0}")]
    InvalidThreshold(u8),

    #[error("patch size must be odd and between 7 and 257, got {0}")]
    InvalidPatchSize(usize),

    #[error("invalid pyramid: {n_levels} levels with scale factor {scale_factor}")]
    InvalidPyramid { n_levels: usize, scale_factor: f32 },

    #[error("max_features must be positive")]
    InvalidMaxFeatures,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "serde")]
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[cfg(feature = "serde")]
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Everything a detection session needs: feature extraction, matching,
/// match gating and RANSAC settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectionConfig {
    pub orb: OrbConfig,
    pub matcher: BruteForceMatcher,
    pub filter: MatchFilter,
    pub ransac: RansacConfig,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub version: Option<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionConfig {
    /// Default settings: 10 / 10 match gate, 5 px RANSAC threshold
    pub fn new() -> Self {
        Self {
            orb: OrbConfig::default(),
            matcher: BruteForceMatcher::default(),
            filter: MatchFilter::default(),
            ransac: RansacConfig::default(),
            name: None,
            description: None,
            version: None,
        }
    }

    /// Flat rectangle overlay: accept more than 10 matches, estimate from the best 10
    pub fn rectangle_overlay_preset() -> Self {
        Self::new().with_metadata("Rectangle overlay", "Outline of the model drawn over the frame")
    }

    /// Projected mesh overlay: accept more than 15 matches, estimate from the best 15
    pub fn cube_overlay_preset() -> Self {
        Self {
            filter: MatchFilter::new(15, 15),
            ..Self::new()
        }
        .with_metadata("Cube overlay", "Mesh projected onto the model plane")
    }

    /// More features and a wider estimation set for low-texture or distant targets
    pub fn high_recall_preset() -> Self {
        Self {
            orb: OrbConfig {
                threshold: 12,
                max_features: 1000,
                ..OrbConfig::default()
            },
            filter: MatchFilter::new(10, 50),
            ..Self::new()
        }
        .with_metadata("High recall", "Denser features and a larger RANSAC input")
    }

    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    pub fn builder() -> DetectionConfigBuilder {
        DetectionConfigBuilder::default()
    }

    pub fn to_builder(self) -> DetectionConfigBuilder {
        DetectionConfigBuilder { config: self }
    }

    pub fn summary(&self) -> String {
        format!(
            "DetectionConfig{}: threshold={}, features={}, levels={}x{:.2}, cross_check={}, gate=>{} keep={}, ransac=[{} iters, {:.1}px, conf {:.3}, min {} inliers, seed {}]",
            self.name.as_deref().map(|n| format!(" '{n}'")).unwrap_or_default(),
            self.orb.threshold,
            self.orb.max_features,
            self.orb.n_levels,
            self.orb.scale_factor,
            self.matcher.cross_check,
            self.filter.min_matches,
            self.filter.keep_matches,
            self.ransac.max_iterations,
            self.ransac.reprojection_threshold,
            self.ransac.confidence,
            self.ransac.min_inliers,
            self.ransac.seed,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let orb = &self.orb;
        if orb.threshold == 0 || orb.threshold > 127 {
            return Err(ConfigError::InvalidThreshold(orb.threshold));
        }
        if orb.patch_size < 7 || orb.patch_size > MAX_PATCH_SIZE || orb.patch_size % 2 == 0 {
            return Err(ConfigError::InvalidPatchSize(orb.patch_size));
        }
        if orb.n_levels == 0 || !(orb.scale_factor > 1.0) {
            return Err(ConfigError::InvalidPyramid {
                n_levels: orb.n_levels,
                scale_factor: orb.scale_factor,
            });
        }
        if orb.max_features == 0 {
            return Err(ConfigError::InvalidMaxFeatures);
        }
        if self.filter.keep_matches < 4 {
            return Err(ConfigError::InvalidKeepMatches(self.filter.keep_matches));
        }
        if !(self.ransac.reprojection_threshold > 0.0) {
            return Err(ConfigError::InvalidReprojectionThreshold(self.ransac.reprojection_threshold));
        }
        if self.ransac.min_inliers < 4 || self.ransac.min_inliers > self.filter.keep_matches {
            return Err(ConfigError::InvalidMinInliers {
                min_inliers: self.ransac.min_inliers,
                keep_matches: self.filter.keep_matches,
            });
        }
        if self.ransac.max_iterations == 0 {
            return Err(ConfigError::InvalidIterations);
        }
        if !(self.ransac.confidence > 0.0 && self.ransac.confidence <= 1.0) {
            return Err(ConfigError::InvalidConfidence(self.ransac.confidence));
        }
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` or `.toml` file, picked by extension (TOML otherwise)
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
    }

    #[cfg(feature = "serde")]
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = if is_json(path) { self.to_json()? } else { self.to_toml()? };
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(feature = "serde")]
fn is_json(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Fluent builder for [`DetectionConfig`]
#[derive(Debug, Clone, Default)]
pub struct DetectionConfigBuilder {
    config: DetectionConfig,
}

impl DetectionConfigBuilder {
    /// Set FAST threshold
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.orb.threshold = threshold;
        self
    }

    /// Set patch size for orientation and descriptors
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.config.orb.patch_size = patch_size;
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.config.orb.max_features = max_features;
        self
    }

    pub fn pyramid(mut self, n_levels: usize, scale_factor: f32) -> Self {
        self.config.orb.n_levels = n_levels;
        self.config.orb.scale_factor = scale_factor;
        self
    }

    /// Set minimum distance for non-maximum suppression
    pub fn nms_radius(mut self, radius: f32) -> Self {
        self.config.orb.nms_radius = radius;
        self
    }

    /// Set number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.orb.n_threads = n_threads;
        self
    }

    pub fn cross_check(mut self, enable: bool) -> Self {
        self.config.matcher.cross_check = enable;
        self
    }

    pub fn max_distance(mut self, max_distance: Option<u32>) -> Self {
        self.config.matcher.max_distance = max_distance;
        self
    }

    /// Set the match gate: accept strictly more than `min`, keep the best `keep`
    pub fn matches(mut self, min: usize, keep: usize) -> Self {
        self.config.filter = MatchFilter::new(min, keep);
        self
    }

    pub fn reprojection_threshold(mut self, pixels: f64) -> Self {
        self.config.ransac.reprojection_threshold = pixels;
        self
    }

    /// Fewest RANSAC inliers accepted as a location
    pub fn min_inliers(mut self, min_inliers: usize) -> Self {
        self.config.ransac.min_inliers = min_inliers;
        self
    }

    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.config.ransac.max_iterations = iterations;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.config.ransac.confidence = confidence;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.ransac.seed = seed;
        self
    }

    /// Apply the 15 / 15 match gate used for mesh overlays
    pub fn preset_cube_overlay(mut self) -> Self {
        self.config.filter = MatchFilter::new(15, 15);
        self
    }

    pub fn summary(&self) -> String {
        self.config.summary()
    }

    pub fn build(self) -> Result<DetectionConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
