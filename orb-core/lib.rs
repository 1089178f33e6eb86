use std::sync::Once;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major 8-bit grayscale image
pub type Image = Vec<u8>;

/// Key-point ≙ FAST corner + orientation (radians) with subpixel precision.
///
/// Coordinates are always expressed in base-level pixels, with pixel centres
/// at integer positions, regardless of the pyramid level the corner was found on.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Harris corner response on the detection level
    pub response: f32,
    /// Pyramid level the keypoint was detected on
    pub octave: usize,
    /// Diameter of the described patch in base-level pixels
    pub size: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            response: 0.0,
            octave: 0,
            size: 0.0,
        }
    }

    pub fn position(&self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }
}

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; 32];

/// Number of bits in a [`Descriptor`]
pub const DESCRIPTOR_BITS: usize = 256;

/// Largest patch diameter; descriptor sampling offsets are stored as `i8`
pub const MAX_PATCH_SIZE: usize = 257;

/// Correspondence hypothesis between a query (model) keypoint and a
/// train (frame) keypoint. Lower distance means more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: u32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrbConfig {
    /// FAST intensity threshold (1-127)
    pub threshold: u8,
    /// Patch diameter used for orientation and descriptors (odd, at most [`MAX_PATCH_SIZE`])
    pub patch_size: usize,
    pub n_threads: usize,
    /// Upper bound on keypoints retained across all pyramid levels
    pub max_features: usize,
    pub n_levels: usize,
    pub scale_factor: f32,
    /// Minimum distance between keypoints kept by non-maximum suppression
    pub nms_radius: f32,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 31,
            n_threads: num_cpus::get().max(1),
            max_features: 500,
            n_levels: 8,
            scale_factor: 1.2,
            nms_radius: 3.0,
        }
    }
}

impl OrbConfig {
    /// Distance a keypoint must keep from the image edge so its circular
    /// patch, plus one pixel for bilinear sampling, stays inside
    pub fn border(&self) -> usize {
        self.patch_size / 2 + 1
    }
}

static POOL_INIT: Once = Once::new();

/// Initialize Rayon thread pool with the specified number of threads.
///
/// Only the first call in a process attempts to configure the global pool;
/// later calls return `Ok(())`.
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    let mut result = Ok(());
    POOL_INIT.call_once(|| {
        result = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build_global();
    });
    result
}
