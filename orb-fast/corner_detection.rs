use crate::types::CornerType;
use crate::utils::has_contiguous_arc;

/// Arc length FAST-9 requires on the 16-pixel ring
pub const FAST_ARC_LENGTH: usize = 9;

/// Harris detector free parameter
const HARRIS_K: f64 = 0.04;

/// Corner detection algorithms (FAST and Harris)
pub struct CornerDetector;

impl CornerDetector {
    /// FAST circle offsets for corner detection, in ring order
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Classify a pixel with the FAST-9 segment test.
    ///
    /// The caller guarantees a 3-pixel margin around `(x, y)`.
    pub fn classify(img: &[u8], width: usize, x: usize, y: usize, threshold: u8) -> CornerType {
        let center = img[y * width + x] as i32;
        let threshold = threshold as i32;

        let mut brighter = 0u16;
        let mut darker = 0u16;
        for (i, &(dx, dy)) in Self::FAST_OFFSETS.iter().enumerate() {
            let px = (x as i32 + dx) as usize;
            let py = (y as i32 + dy) as usize;
            let pixel = img[py * width + px] as i32;

            if pixel > center + threshold {
                brighter |= 1 << i;
            } else if pixel < center - threshold {
                darker |= 1 << i;
            }
        }

        if brighter.count_ones() as usize >= FAST_ARC_LENGTH && has_contiguous_arc(brighter, FAST_ARC_LENGTH) {
            CornerType::Bright
        } else if darker.count_ones() as usize >= FAST_ARC_LENGTH && has_contiguous_arc(darker, FAST_ARC_LENGTH) {
            CornerType::Dark
        } else {
            CornerType::None
        }
    }

    /// Compute Harris corner response at a pixel over a 5x5 window.
    ///
    /// Returns 0 within 3 pixels of the border.
    pub fn compute_harris_response(img: &[u8], width: usize, height: usize, x: usize, y: usize) -> f32 {
        if x < 3 || y < 3 || x + 3 >= width || y + 3 >= height {
            return 0.0;
        }

        let mut ixx = 0.0f64;
        let mut ixy = 0.0f64;
        let mut iyy = 0.0f64;

        for dy in -2..=2i32 {
            for dx in -2..=2i32 {
                let nx = (x as i32 + dx) as usize;
                let ny = (y as i32 + dy) as usize;
                let (gx, gy) = Self::compute_gradients(img, width, nx, ny);

                ixx += (gx * gx) as f64;
                ixy += (gx * gy) as f64;
                iyy += (gy * gy) as f64;
            }
        }

        // det(M) - k * trace(M)^2
        let det = ixx * iyy - ixy * ixy;
        let trace = ixx + iyy;
        (det - HARRIS_K * trace * trace) as f32
    }

    /// Sobel gradients at an interior pixel, scaled to intensity units
    fn compute_gradients(img: &[u8], width: usize, x: usize, y: usize) -> (f32, f32) {
        let p = |px: usize, py: usize| img[py * width + px] as f32;

        let gx = p(x + 1, y - 1) + 2.0 * p(x + 1, y) + p(x + 1, y + 1)
            - p(x - 1, y - 1) - 2.0 * p(x - 1, y) - p(x - 1, y + 1);
        let gy = p(x - 1, y + 1) + 2.0 * p(x, y + 1) + p(x + 1, y + 1)
            - p(x - 1, y - 1) - 2.0 * p(x, y - 1) - p(x + 1, y - 1);

        (gx / 8.0, gy / 8.0)
    }
}
