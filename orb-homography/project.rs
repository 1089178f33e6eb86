use nalgebra::{Matrix3, Vector3};

/// Below this the homogeneous coordinate is treated as zero
const W_EPS: f64 = 1e-12;

/// Project one point through `h`, `None` when it lands at infinity
fn project_raw(h: &Matrix3<f64>, p: [f64; 2]) -> Option<[f64; 2]> {
    let q = h * Vector3::new(p[0], p[1], 1.0);
    if q[2].abs() < W_EPS {
        return None;
    }
    let out = [q[0] / q[2], q[1] / q[2]];
    (out[0].is_finite() && out[1].is_finite()).then_some(out)
}

/// Euclidean distance between `project(h, src)` and `dst`.
///
/// Points that cannot be projected are infinitely far.
pub fn reprojection_error(h: &Matrix3<f64>, src: [f64; 2], dst: [f64; 2]) -> f64 {
    match project_raw(h, src) {
        Some(p) => ((p[0] - dst[0]).powi(2) + (p[1] - dst[1]).powi(2)).sqrt(),
        None => f64::INFINITY,
    }
}

/// Corners of a `width` × `height` image in pixel-centre coordinates,
/// clockwise from the top-left
pub fn model_corners(width: u32, height: u32) -> [[f64; 2]; 4] {
    let w = width.saturating_sub(1) as f64;
    let h = height.saturating_sub(1) as f64;
    [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]]
}

/// Signed shoelace area of a quadrilateral, positive for clockwise corners
/// in image coordinates (y down)
pub fn quad_area(quad: &[[f64; 2]; 4]) -> f64 {
    (0..4)
        .map(|i| {
            let (a, b) = (quad[i], quad[(i + 1) % 4]);
            a[0] * b[1] - b[0] * a[1]
        })
        .sum::<f64>()
        / 2.0
}

/// `true` when every turn of the outline bends the same way
pub fn is_convex_quad(quad: &[[f64; 2]; 4]) -> bool {
    let turns = (0..4).map(|i| {
        let (a, b, c) = (quad[i], quad[(i + 1) % 4], quad[(i + 2) % 4]);
        (b[0] - a[0]) * (c[1] - b[1]) - (b[1] - a[1]) * (c[0] - b[0])
    });
    let mut sign = 0.0f64;
    for turn in turns {
        if turn == 0.0 || !turn.is_finite() {
            return false;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return false;
        }
    }
    true
}

/// Model-plane to frame-plane mapping.
///
/// Stored scaled so `h33 = 1` unless `h33` is numerically zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        let scale = matrix[(2, 2)];
        let matrix = if scale.abs() < W_EPS { matrix } else { matrix / scale };
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Row-major copy of the matrix
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    pub fn project_point(&self, p: [f64; 2]) -> Option<[f64; 2]> {
        project_raw(&self.matrix, p)
    }

    /// Project every point; degenerate points come back as `None`
    pub fn project(&self, points: &[[f64; 2]]) -> Vec<Option<[f64; 2]>> {
        points.iter().map(|&p| self.project_point(p)).collect()
    }

    /// Frame-plane to model-plane mapping
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(Self::new)
    }

    pub fn reprojection_error(&self, src: [f64; 2], dst: [f64; 2]) -> f64 {
        reprojection_error(&self.matrix, src, dst)
    }
}

impl From<Matrix3<f64>> for Homography {
    fn from(matrix: Matrix3<f64>) -> Self {
        Self::new(matrix)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Homography {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_rows().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Homography {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = <[[f64; 3]; 3]>::deserialize(deserializer)?;
        Ok(Self::new(Matrix3::from_fn(|r, c| rows[r][c])))
    }
}
