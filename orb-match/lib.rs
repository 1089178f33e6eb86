mod error;
mod filter;
mod matcher;

pub use error::{MatchError, MatchResult};
pub use filter::MatchFilter;
pub use matcher::{hamming_distance, BruteForceMatcher};
