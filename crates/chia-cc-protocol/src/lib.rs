mod cc_info;
mod coin_solution;
mod condition;
mod error;
mod npc;
mod spend_bundle;
mod wallet_records;

pub use crate::cc_info::*;
pub use crate::coin_solution::*;
pub use crate::condition::*;
pub use crate::error::*;
pub use crate::npc::*;
pub use crate::spend_bundle::*;
pub use crate::wallet_records::*;

// the coin itself is the chain's value record, shared with every other crate
pub use chia_protocol::{Bytes, Bytes32, Coin, Program};
