use chia_protocol::Bytes32;
use chia_streamable_macro::streamable;
use hex_literal::hex;

/// Network parameters the wallet needs to build and check spends.
#[streamable]
#[derive(Copy)]
pub struct WalletConstants {
    /// The maximum cost of running a block generator, and the budget any
    /// single evaluation is held to.
    max_block_cost_clvm: u64,

    /// Appended to every AGG_SIG_ME message. This is the genesis challenge of
    /// the network, so signatures can't be replayed on another one.
    agg_sig_me_additional_data: Bytes32,

    /// Flags passed to the CLVM interpreter.
    clvm_flags: u32,
}

pub const MAINNET_CONSTANTS: WalletConstants = WalletConstants {
    max_block_cost_clvm: 11_000_000_000,
    agg_sig_me_additional_data: Bytes32::new(hex!(
        "ccd5bb71183532bff220ba46c268991a3ff07eb358e8255a65c30a2dce0e5fbb"
    )),
    clvm_flags: 0,
};

pub const TEST_CONSTANTS: WalletConstants = WalletConstants {
    agg_sig_me_additional_data: Bytes32::new([3; 32]),
    ..MAINNET_CONSTANTS
};
