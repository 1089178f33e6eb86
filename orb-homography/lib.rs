//! Plane-to-plane homography estimation and reprojection.
//!
//! - [`solve_minimal`]: exact solve from four correspondences.
//! - [`estimate_homography_dlt`]: Hartley-normalized DLT over any number of pairs.
//! - [`fit_homography_ransac`]: outlier-robust fit with an inlier refit.
//! - [`Homography`]: projection with per-point degeneracy reporting.

mod dlt;
mod error;
mod project;
mod ransac;

pub use dlt::{estimate_homography_dlt, is_collinear, solve_minimal};
pub use error::{HomographyError, HomographyResult};
pub use project::{is_convex_quad, model_corners, quad_area, reprojection_error, Homography};
pub use ransac::{fit_homography_ransac, RansacConfig, RansacResult};
