//! Errors raised while driving the shopping scenario.

#[derive(thiserror::Error, Debug)]
pub enum FlowError {
    /// The results page never appeared; the environment blocked the run.
    #[error("shopping results unavailable: {0}")]
    Blocked(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("artifact write failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type FlowResult<T> = Result<T, FlowError>;
