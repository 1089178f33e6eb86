use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HomographyError {
    #[error("too few points: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("point count mismatch: {src} source vs {dst} destination")]
    LengthMismatch { src: usize, dst: usize },

    #[error("insufficient inliers: need {needed}, found {found}")]
    InsufficientInliers { needed: usize, found: usize },

    #[error("no valid homography after {iterations} iterations")]
    Degenerate { iterations: usize },

    #[error("numerical failure: {0}")]
    NumericalFailure(String),
}

pub type HomographyResult<T> = Result<T, HomographyError>;
