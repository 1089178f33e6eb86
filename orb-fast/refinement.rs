use crate::types::ScoredKeypoint;

/// Orientation assignment and keypoint selection
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Half-widths of the circular patch per row offset, `umax[|dy|]`
    pub fn circular_extent(radius: usize) -> Vec<usize> {
        let r2 = (radius * radius) as f32;
        (0..=radius)
            .map(|dy| (r2 - (dy * dy) as f32).sqrt().floor() as usize)
            .collect()
    }

    /// Compute orientation using the intensity centroid of a circular patch.
    ///
    /// The caller guarantees the patch lies inside the image.
    pub fn compute_orientation(img: &[u8], width: usize, x: usize, y: usize, umax: &[usize]) -> f32 {
        let radius = umax.len() as i64 - 1;
        let mut m10 = 0i64;
        let mut m01 = 0i64;

        for dy in -radius..=radius {
            let row = (y as i64 + dy) as usize * width;
            let half = umax[dy.unsigned_abs() as usize] as i64;
            for dx in -half..=half {
                let val = img[row + (x as i64 + dx) as usize] as i64;
                m10 += dx * val;
                m01 += dy * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }

    /// Non-maximum suppression to reduce duplicate keypoints.
    ///
    /// Keeps the strongest response first; candidates closer than
    /// `min_distance` to an accepted keypoint are dropped. Stops once
    /// `limit` keypoints are accepted, strongest first.
    pub fn non_maximum_suppression(keypoints: &[ScoredKeypoint], min_distance: f32, limit: usize) -> Vec<ScoredKeypoint> {
        let mut sorted_keypoints = keypoints.to_vec();
        sorted_keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));

        let mut suppressed: Vec<ScoredKeypoint> = Vec::with_capacity(limit.min(sorted_keypoints.len()));
        let min_distance_sq = min_distance * min_distance;

        for candidate in sorted_keypoints {
            if suppressed.len() == limit {
                break;
            }
            let is_local_max = suppressed.iter().all(|existing| {
                let dx = candidate.keypoint.x - existing.keypoint.x;
                let dy = candidate.keypoint.y - existing.keypoint.y;
                dx * dx + dy * dy >= min_distance_sq
            });

            if is_local_max {
                suppressed.push(candidate);
            }
        }

        suppressed
    }
}
