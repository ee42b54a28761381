#[cfg(feature = "protocol")]
pub use chia_cc_protocol as protocol;

#[cfg(feature = "consensus")]
pub use chia_cc_consensus as consensus;

#[cfg(feature = "wallet")]
pub use chia_cc_wallet as wallet;
