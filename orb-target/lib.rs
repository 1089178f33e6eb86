//! Locate a registered planar model in camera frames.
//!
//! [`DetectionSession`] holds the model features and the configuration;
//! each call to [`DetectionSession::detect`] extracts frame features,
//! matches them against the model, gates the matches and fits a RANSAC
//! homography, then projects the model corners into the frame.

mod config;
mod extractor;
mod result;
mod session;

pub use config::{ConfigError, DetectionConfig, DetectionConfigBuilder};
pub use extractor::{ExtractError, Features, OrbExtractor};
pub use result::{DetectionResult, Location, Rejection, Verdict};
pub use session::{detect_and_locate, DetectionSession, RegisteredModel, SessionError};

pub use orb_core::{Descriptor, Keypoint, Match, OrbConfig};
pub use orb_homography::{model_corners, Homography, RansacConfig};
pub use orb_match::{BruteForceMatcher, MatchFilter};
