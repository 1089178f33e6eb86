use std::fmt;

use orb_core::{Keypoint, Match};
use orb_homography::Homography;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Why a frame did not yield a model location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "reason", rename_all = "kebab-case"))]
pub enum Rejection {
    /// Frame could not be read or produced no features
    NoFeatures,
    /// The match gate needs strictly more than `required` correspondences
    InsufficientMatches { found: usize, required: usize },
    /// RANSAC found no valid homography
    NoHomography,
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::NoFeatures => "no-features",
            Rejection::InsufficientMatches { .. } => "insufficient-matches",
            Rejection::NoHomography => "no-homography",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InsufficientMatches { found, required } => {
                write!(f, "{}: {found}, more than {required} required", self.code())
            }
            _ => f.write_str(self.code()),
        }
    }
}

/// Where the model sits in the frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Location {
    /// Model pixel coordinates to frame pixel coordinates
    pub homography: Homography,
    /// Correspondences handed to RANSAC, best first
    pub correspondences: Vec<Match>,
    /// Parallel to `correspondences`
    pub inlier_mask: Vec<bool>,
    pub n_inliers: usize,
    /// Model corners projected into the frame; `None` where the projection
    /// is degenerate
    pub corners: [Option<[f64; 2]>; 4],
}

impl Location {
    pub fn inliers(&self) -> impl Iterator<Item = &Match> {
        self.correspondences
            .iter()
            .zip(&self.inlier_mask)
            .filter(|(_, inlier)| **inlier)
            .map(|(m, _)| m)
    }

    /// All four corners projected
    pub fn quad(&self) -> Option<[[f64; 2]; 4]> {
        let [a, b, c, d] = self.corners;
        Some([a?, b?, c?, d?])
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "status", content = "detail", rename_all = "kebab-case"))]
pub enum Verdict {
    Matched(Location),
    NotMatched(Rejection),
}

/// Outcome of one frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DetectionResult {
    /// Frame keypoints; match `train_idx` values index into this
    pub frame_keypoints: Vec<Keypoint>,
    /// Every cross-checked match, best first
    pub matches: Vec<Match>,
    pub verdict: Verdict,
}

impl DetectionResult {
    pub(crate) fn rejected(frame_keypoints: Vec<Keypoint>, matches: Vec<Match>, rejection: Rejection) -> Self {
        Self {
            frame_keypoints,
            matches,
            verdict: Verdict::NotMatched(rejection),
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self.verdict, Verdict::Matched(_))
    }

    pub fn location(&self) -> Option<&Location> {
        match &self.verdict {
            Verdict::Matched(location) => Some(location),
            Verdict::NotMatched(_) => None,
        }
    }

    pub fn homography(&self) -> Option<&Homography> {
        self.location().map(|l| &l.homography)
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self.verdict {
            Verdict::Matched(_) => None,
            Verdict::NotMatched(rejection) => Some(rejection),
        }
    }

    pub fn into_verdict(self) -> Verdict {
        self.verdict
    }
}
