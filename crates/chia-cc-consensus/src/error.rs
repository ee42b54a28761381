use clvm_traits::ToClvmError;
use clvmr::error::EvalErr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Error)]
pub enum ErrorCode {
    #[error("the generator failed to run or returned a malformed list")]
    InvalidGeneratorOutput,
    #[error("invalid coin solution")]
    InvalidCoinSolution,
    #[error("invalid condition")]
    InvalidCondition,
}

/// A failed extraction. `cost` is what had been spent when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{code} (cost {cost})")]
pub struct NpcError {
    pub code: ErrorCode,
    pub cost: u64,
}

impl NpcError {
    pub fn new(code: ErrorCode, cost: u64) -> Self {
        Self { code, cost }
    }
}

/// Raised by a [`crate::ProgramEvaluator`] when a program can't be run to
/// completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalFault {
    #[error("cost exceeded")]
    CostExceeded,

    #[error("program raised: {0}")]
    Raise(String),

    #[error("program could not be loaded: {0}")]
    InvalidProgram(String),

    #[error("invalid condition")]
    InvalidCondition,
}

impl From<EvalErr> for EvalFault {
    fn from(err: EvalErr) -> Self {
        match err {
            EvalErr::CostExceeded => EvalFault::CostExceeded,
            err => EvalFault::Raise(format!("{err:?}")),
        }
    }
}

impl From<ToClvmError> for EvalFault {
    fn from(err: ToClvmError) -> Self {
        EvalFault::InvalidProgram(err.to_string())
    }
}

impl From<chia_cc_protocol::Error> for EvalFault {
    fn from(err: chia_cc_protocol::Error) -> Self {
        match err {
            chia_cc_protocol::Error::CostExceeded => EvalFault::CostExceeded,
            chia_cc_protocol::Error::InvalidCondition | chia_cc_protocol::Error::InvalidSpend => {
                EvalFault::InvalidCondition
            }
            err => EvalFault::Raise(err.to_string()),
        }
    }
}
