//! Error taxonomy: an ordinary `Result` propagated with `?` rather than an
//! exception type paired with direct process exits.
use std::fmt;
use thiserror::Error;

/// Exit-code taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Sat = 10,
    Unsat = 20,
    Optimum = 30,
    Unknown = 40,
    Error = 50,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            StatusCode::Sat => "s SATISFIABLE",
            StatusCode::Unsat => "s UNSATISFIABLE",
            StatusCode::Optimum => "s OPTIMUM FOUND",
            StatusCode::Unknown => "s UNKNOWN",
            StatusCode::Error => "s UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Xcpu,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Signal::Term => write!(f, "SIGTERM"),
            Signal::Xcpu => write!(f, "SIGXCPU"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MaxSatError {
    #[error("malformed input at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("algorithm misconfiguration: {0}")]
    Misconfigured(String),

    #[error("out of memory")]
    OutOfMemory,

    #[error("resource limit hit: {0}")]
    ResourceLimit(Signal),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl MaxSatError {
    /// Maps an error kind to the exit code it must surface as.
    pub fn status(&self) -> StatusCode {
        match self {
            MaxSatError::Malformed { .. } => StatusCode::Error,
            MaxSatError::Misconfigured(_) => StatusCode::Error,
            MaxSatError::OutOfMemory => StatusCode::Error,
            MaxSatError::ResourceLimit(_) => StatusCode::Unknown,
            MaxSatError::Internal(_) => StatusCode::Error,
        }
    }
}

pub type Result<T> = std::result::Result<T, MaxSatError>;
