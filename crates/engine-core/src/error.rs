use thiserror::Error;

/// Failure modes of a single port call. `Unavailable` means the connectivity
/// layer could not answer at all (skip the symbol this cycle); `Rejected`
/// carries the broker's refusal reason.
#[derive(Error, Debug)]
pub enum PortError {
    #[error("port unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("request timed out")]
    Timeout,
}

pub type PortResult<T> = Result<T, PortError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Port(#[from] PortError),
}
