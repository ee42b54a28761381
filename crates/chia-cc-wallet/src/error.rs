use chia_cc_consensus::{ErrorCode, EvalFault, NpcError};
use chia_protocol::Bytes32;
use chia_traits::chia_error;
use clvm_traits::{FromClvmError, ToClvmError};
use thiserror::Error;

/// Failures reported by the collaborators a wallet is wired to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("no signing key for puzzle hash {0}")]
    KeyNotFound(Bytes32),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Storage(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("requested {requested} but only {spendable} is spendable")]
    NotEnoughFunds { requested: u64, spendable: u64 },

    #[error("requested {requested} but only {selected} could be selected")]
    Contention { requested: u64, selected: u64 },

    #[error("no lineage proof for coin {0}")]
    MissingLineage(Bytes32),

    #[error("no inner puzzle for coin {0}")]
    MissingInnerPuzzle(Bytes32),

    #[error("no signing key for puzzle hash {0}")]
    SigningKeyNotFound(Bytes32),

    #[error("wallet has no colour core")]
    NoCore,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("wallet {0} not found")]
    WalletNotFound(u32),

    #[error("action {0} isn't a pending generator request of this wallet")]
    UnknownAction(u32),

    #[error("extraction failed: {0}")]
    Npc(#[from] NpcError),

    #[error("invalid conditions: {0}")]
    Conditions(ErrorCode),

    #[error("{0}")]
    Service(ServiceError),

    #[error("To CLVM {0}")]
    ToClvm(#[from] ToClvmError),

    #[error("From CLVM {0}")]
    FromClvm(#[from] FromClvmError),

    #[error("{0:?}")]
    Streamable(#[from] chia_error::Error),

    #[error("{0}")]
    Eval(#[from] EvalFault),

    #[error("{0}")]
    Protocol(#[from] chia_cc_protocol::Error),
}

impl From<ServiceError> for WalletError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::KeyNotFound(puzzle_hash) => WalletError::SigningKeyNotFound(puzzle_hash),
            err => WalletError::Service(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
