use orb_core::Match;

use crate::error::{MatchError, MatchResult};

/// Gate on the number of correspondences, then keep the best ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchFilter {
    /// A frame is accepted only with strictly more matches than this
    pub min_matches: usize,
    /// Number of leading (best) matches passed on to estimation
    pub keep_matches: usize,
}

impl Default for MatchFilter {
    fn default() -> Self {
        Self {
            min_matches: 10,
            keep_matches: 10,
        }
    }
}

impl MatchFilter {
    pub fn new(min_matches: usize, keep_matches: usize) -> Self {
        Self {
            min_matches,
            keep_matches,
        }
    }

    /// `matches` must already be sorted best first.
    pub fn filter(&self, mut matches: Vec<Match>) -> MatchResult<Vec<Match>> {
        if matches.len() <= self.min_matches {
            tracing::debug!(found = matches.len(), required = self.min_matches, "match gate rejected");
            return Err(MatchError::InsufficientMatches {
                found: matches.len(),
                required: self.min_matches,
            });
        }
        matches.truncate(self.keep_matches);
        Ok(matches)
    }
}
