use orb_core::{Image, Keypoint};

/// Keypoint with corner response score for NMS
#[derive(Debug, Clone, Copy)]
pub struct ScoredKeypoint {
    pub keypoint: Keypoint,
    pub response: f32,
}

/// Scale information for pyramid levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    /// Nominal scale, `scale_factor^level`
    pub scale: f32,
    pub width: usize,
    pub height: usize,
    /// Actual base/level size ratios after integer rounding
    pub ratio_x: f32,
    pub ratio_y: f32,
}

impl ScaleLevel {
    /// Map a keypoint found on this level into base-level coordinates.
    ///
    /// Level pixel `i` averages base pixels `[i * r, (i + 1) * r)`, so its
    /// centre sits at `(i + 0.5) * r - 0.5`.
    pub fn to_base(&self, kp: &Keypoint, patch_size: usize) -> Keypoint {
        Keypoint {
            x: (kp.x + 0.5) * self.ratio_x - 0.5,
            y: (kp.y + 0.5) * self.ratio_y - 0.5,
            angle: kp.angle,
            response: kp.response,
            octave: self.level,
            size: patch_size as f32 * self.scale,
        }
    }
}

/// Keypoints detected on one pyramid level, in that level's coordinates
#[derive(Debug, Clone)]
pub struct LevelDetections {
    pub level: ScaleLevel,
    pub image: Image,
    pub keypoints: Vec<Keypoint>,
}

/// Corner type classification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CornerType {
    Bright,
    Dark,
    None,
}
