use std::path::PathBuf;

/// Errors that can occur while setting up or driving a simulation.
///
/// Back-pressure from the TLB is not an error: a rejected translation is reported through
/// [`Admission::Rejected`](crate::sim::memory::tlb::Admission) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("trace line {line}: {message}")]
    Trace { line: usize, message: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
