use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("insufficient matches: {found}, more than {required} required")]
    InsufficientMatches { found: usize, required: usize },
}

pub type MatchResult<T> = Result<T, MatchError>;
