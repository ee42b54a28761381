mod cc_wallet;
mod coin_selection;
mod constants;
mod error;
mod lineage;
mod services;
mod spend_builder;
mod sqlite_store;
mod wallet_state;

pub mod puzzles;

#[cfg(test)]
mod test_services;

pub use cc_wallet::*;
pub use coin_selection::*;
pub use constants::*;
pub use error::*;
pub use lineage::*;
pub use services::*;
pub use spend_builder::*;
pub use sqlite_store::*;
pub use wallet_state::*;

pub use chia_cc_consensus::{ClvmEvaluator, ProgramEvaluator};
