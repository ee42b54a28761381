use chia_protocol::{Bytes, Bytes32, Coin};
use chia_streamable_macro::{Streamable, streamable};

#[repr(u8)]
#[derive(Streamable, Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub enum WalletType {
    StandardWallet = 0,
    ColouredCoin = 2,
}

/// A wallet as the wallet store keeps it. `data` is opaque to the store; a
/// coloured coin wallet keeps its serialized `CcInfo` there.
#[streamable]
pub struct WalletInfo {
    id: u32,
    name: String,
    wallet_type: WalletType,
    data: Bytes,
}

#[streamable]
#[derive(Copy)]
pub struct WalletCoinRecord {
    coin: Coin,
    confirmed_block_index: u32,
    spent: bool,
}

/// Work a wallet asked to be done later, such as fetching the generator of
/// a block. `(name, wallet_id, data)` identifies the action.
#[streamable]
pub struct PendingAction {
    id: u32,
    name: String,
    wallet_id: u32,
    wallet_type: WalletType,
    data: Bytes,
    done: bool,
}

/// Payload of a `cc_get_generator` action: the block whose generator holds
/// the parent spend of a newly observed coin.
#[streamable]
#[derive(Copy)]
pub struct GeneratorRequest {
    height: u32,
    header_hash: Bytes32,
}

pub const CC_GET_GENERATOR: &str = "cc_get_generator";
