use nalgebra::{Matrix3, SMatrix, SVector, SymmetricEigen};

use crate::error::{HomographyError, HomographyResult};

/// Sine of the smallest angle still treated as non-degenerate
const COLLINEAR_EPS: f64 = 1e-6;

/// `true` when `a`, `b`, `c` lie on one line (or coincide)
pub fn is_collinear(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> bool {
    let (ux, uy) = (b[0] - a[0], b[1] - a[1]);
    let (vx, vy) = (c[0] - a[0], c[1] - a[1]);
    let cross = (ux * vy - uy * vx).abs();
    let scale = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
    cross <= COLLINEAR_EPS * scale
}

pub(crate) fn has_collinear_triple(pts: &[[f64; 2]]) -> bool {
    let n = pts.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if is_collinear(pts[i], pts[j], pts[k]) {
                    return true;
                }
            }
        }
    }
    false
}

/// Correspondences moved into a similarity frame: centroid at the origin,
/// RMS distance `sqrt(2)`.
struct Conditioned {
    points: Vec<[f64; 2]>,
    forward: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl Conditioned {
    fn new(pts: &[[f64; 2]]) -> Self {
        let n = pts.len() as f64;
        let (sx, sy) = pts.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
        let (cx, cy) = (sx / n, sy / n);
        let spread = pts.iter().map(|p| (p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sum::<f64>() / n;

        // Coincident points keep unit scale; the solve then reports them
        let scale = if spread > 1e-24 { (2.0 / spread).sqrt() } else { 1.0 };
        Self {
            points: pts.iter().map(|p| [(p[0] - cx) * scale, (p[1] - cy) * scale]).collect(),
            forward: Matrix3::new(scale, 0.0, -scale * cx, 0.0, scale, -scale * cy, 0.0, 0.0, 1.0),
            inverse: Matrix3::new(1.0 / scale, 0.0, cx, 0.0, 1.0 / scale, cy, 0.0, 0.0, 1.0),
        }
    }
}

/// Both linear constraints `h · row = 0` one pair puts on the stacked
/// entries `h11..h33`.
fn correspondence_rows(s: [f64; 2], d: [f64; 2]) -> [[f64; 9]; 2] {
    let [x, y] = s;
    let [u, v] = d;
    [
        [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u, -u],
        [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v, -v],
    ]
}

/// Map a solution found in conditioned coordinates back to pixels, scaled
/// so `h33 = 1` unless it vanishes.
fn uncondition(h: Matrix3<f64>, src: &Conditioned, dst: &Conditioned) -> Option<Matrix3<f64>> {
    let h = dst.inverse * h * src.forward;
    let h33 = h[(2, 2)];
    let h = if h33.abs() < 1e-12 { h } else { h / h33 };
    h.iter().all(|v| v.is_finite()).then_some(h)
}

/// Exact homography through four correspondences, with `h33` fixed to 1.
///
/// Returns `None` when the 8×8 system is singular or the result is not finite.
pub fn solve_minimal(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Option<Matrix3<f64>> {
    let src = Conditioned::new(src);
    let dst = Conditioned::new(dst);

    // With h33 = 1 the last column moves to the right-hand side
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (i, (s, d)) in src.points.iter().zip(&dst.points).enumerate() {
        for (k, row) in correspondence_rows(*s, *d).iter().enumerate() {
            let r = 2 * i + k;
            for (c, value) in row[..8].iter().enumerate() {
                a[(r, c)] = *value;
            }
            b[r] = -row[8];
        }
    }

    let h = a.lu().solve(&b)?;
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    let h = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
    uncondition(h, &src, &dst)
}

/// Least-squares homography from ≥4 correspondences using normalized DLT.
///
/// `dst ≈ project(H, src)`; the solution is the eigenvector of the smallest
/// eigenvalue of `AᵀA`, accumulated row by row.
pub fn estimate_homography_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> HomographyResult<Matrix3<f64>> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    let n = src.len();
    if n < 4 {
        return Err(HomographyError::TooFewPoints { needed: 4, got: n });
    }

    let src = Conditioned::new(src);
    let dst = Conditioned::new(dst);

    let mut normal = SMatrix::<f64, 9, 9>::zeros();
    for (s, d) in src.points.iter().zip(&dst.points) {
        for row in correspondence_rows(*s, *d) {
            let row = SVector::<f64, 9>::from(row);
            normal += row * row.transpose();
        }
    }

    let eig = SymmetricEigen::new(normal);
    let v = eig.eigenvectors.column(eig.eigenvalues.imin());
    let h = Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]);

    uncondition(h, &src, &dst).ok_or_else(|| HomographyError::NumericalFailure("non-finite homography".into()))
}
