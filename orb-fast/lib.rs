//! Multi-scale FAST-9 corner detection with Harris ranking and
//! intensity-centroid orientation.

mod corner_detection;
mod detector;
mod error;
mod pyramid;
mod refinement;
mod types;
pub mod utils;

pub use corner_detection::{CornerDetector, FAST_ARC_LENGTH};
pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use pyramid::ImagePyramid;
pub use refinement::KeypointRefinement;
pub use types::{CornerType, LevelDetections, ScaleLevel, ScoredKeypoint};
