use clvm_traits::{FromClvmError, ToClvmError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("To CLVM {0}")]
    ToClvm(#[from] ToClvmError),

    #[error("From CLVM {0}")]
    FromClvm(#[from] FromClvmError),

    #[error("Eval {0}")]
    Eval(String),

    #[error("cost exceeded")]
    CostExceeded,

    #[error("invalid condition")]
    InvalidCondition,

    #[error("failed to parse spend")]
    InvalidSpend,
}

pub type Result<T> = std::result::Result<T, Error>;
