//! The collaborators a coloured coin wallet talks to. Every call may suspend,
//! and every future is `Send` so a wallet can live inside a spawned task.

use std::collections::HashSet;
use std::future::Future;

use chia_bls::Signature;
use chia_cc_protocol::{PendingAction, SpendBundle, WalletCoinRecord, WalletInfo, WalletType};
use chia_protocol::{Bytes, Bytes32, Coin, Program};

use crate::ServiceError;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Hands finished spend bundles to the network.
pub trait TransactionSubmitter {
    fn push_transaction(&self, bundle: SpendBundle)
    -> impl Future<Output = ServiceResult<()>> + Send;
}

/// The coin records of every wallet, as tracked by the node.
pub trait CoinStore {
    fn confirmed_balance(&self, wallet_id: u32) -> impl Future<Output = ServiceResult<u64>> + Send;

    /// Confirmed balance minus the value of coins already spent by pending
    /// transactions.
    fn unconfirmed_spendable(&self, wallet_id: u32)
    -> impl Future<Output = ServiceResult<u64>> + Send;

    fn spendable_coin_records(
        &self,
        wallet_id: u32,
    ) -> impl Future<Output = ServiceResult<Vec<WalletCoinRecord>>> + Send;

    /// Ids of coins removed by transactions that haven't been confirmed yet.
    fn pending_removals(
        &self,
        wallet_id: u32,
    ) -> impl Future<Output = ServiceResult<HashSet<Bytes32>>> + Send;
}

/// Signs on behalf of the keys behind the wallet's inner puzzles.
pub trait Signer {
    /// Signs `message` with the key that controls `inner_puzzle_hash`. Fails
    /// with [`ServiceError::KeyNotFound`] when the key isn't held.
    fn sign(
        &self,
        inner_puzzle_hash: Bytes32,
        message: Vec<u8>,
    ) -> impl Future<Output = ServiceResult<Signature>> + Send;
}

/// Derives inner puzzles and remembers which outer puzzle hashes they were
/// wrapped into.
pub trait PuzzleStore {
    /// A fresh, never used inner puzzle for `wallet_id`.
    fn new_inner_puzzle(&self, wallet_id: u32) -> impl Future<Output = ServiceResult<Program>> + Send;

    fn record_puzzle_hash(
        &self,
        wallet_id: u32,
        puzzle_hash: Bytes32,
        inner_puzzle: Program,
    ) -> impl Future<Output = ServiceResult<()>> + Send;

    fn inner_puzzle_for_puzzle_hash(
        &self,
        puzzle_hash: Bytes32,
    ) -> impl Future<Output = ServiceResult<Option<Program>>> + Send;

    fn is_wallet_puzzle_hash(
        &self,
        wallet_id: u32,
        puzzle_hash: Bytes32,
    ) -> impl Future<Output = ServiceResult<bool>> + Send;
}

/// The uncoloured wallet that funds issuance.
pub trait StandardWallet {
    /// Uncoloured coins worth at least `amount` in total.
    fn select_standard_coins(
        &self,
        amount: u64,
    ) -> impl Future<Output = ServiceResult<Vec<Coin>>> + Send;

    /// A signed spend of `coins` in which the coin `origin_id` pays `amount`
    /// to `puzzle_hash`. Whatever is left after `fee` goes back to the
    /// standard wallet.
    fn generate_signed_transaction(
        &self,
        amount: u64,
        puzzle_hash: Bytes32,
        fee: u64,
        origin_id: Bytes32,
        coins: Vec<Coin>,
    ) -> impl Future<Output = ServiceResult<SpendBundle>> + Send;
}

/// Persists wallet records. `update_wallet` replaces the whole record in a
/// single write.
pub trait WalletStore {
    fn create_wallet(
        &self,
        name: String,
        wallet_type: WalletType,
        data: Bytes,
    ) -> impl Future<Output = ServiceResult<WalletInfo>> + Send;

    fn update_wallet(&self, info: WalletInfo) -> impl Future<Output = ServiceResult<()>> + Send;

    fn get_wallet(&self, id: u32) -> impl Future<Output = ServiceResult<Option<WalletInfo>>> + Send;
}

/// Deferred work items. An action is identified by its name, wallet and
/// payload; queueing one that is already pending returns the existing id.
pub trait ActionQueue {
    fn enqueue(
        &self,
        name: String,
        wallet_id: u32,
        wallet_type: WalletType,
        data: Bytes,
    ) -> impl Future<Output = ServiceResult<u32>> + Send;

    /// Completing an action that is already done is a no-op.
    fn mark_done(&self, action_id: u32) -> impl Future<Output = ServiceResult<()>> + Send;

    fn pending_actions(
        &self,
        wallet_id: u32,
    ) -> impl Future<Output = ServiceResult<Vec<PendingAction>>> + Send;
}

/// Everything a wallet needs from the outside, usually implemented by one
/// context object.
pub trait WalletServices:
    TransactionSubmitter
    + CoinStore
    + Signer
    + PuzzleStore
    + StandardWallet
    + WalletStore
    + ActionQueue
    + Send
    + Sync
{
}

impl<T> WalletServices for T where
    T: TransactionSubmitter
        + CoinStore
        + Signer
        + PuzzleStore
        + StandardWallet
        + WalletStore
        + ActionQueue
        + Send
        + Sync
{
}
