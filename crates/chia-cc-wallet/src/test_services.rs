//! In-memory collaborators for the wallet tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chia_bls::{SecretKey, Signature, aggregate_verify, master_to_wallet_unhardened, sign};
use chia_cc_consensus::pkm_pairs_for_conditions;
use chia_cc_protocol::{
    CREATE_COIN, CcInfo, CcParent, CoinSolution, PendingAction, SpendBundle, WalletCoinRecord,
    WalletInfo, WalletType, program_hash,
};
use chia_protocol::{Bytes, Bytes32, Coin, Program};
use chia_puzzle_types::DeriveSynthetic;
use hex_literal::hex;

use clvm_traits::clvm_list;

use crate::puzzles::{cc_puzzle_hash_for_inner_puzzle_hash, standard_inner_puzzle, to_program};
use crate::{
    ActionQueue, CoinStore, PuzzleStore, ServiceError, ServiceResult, Signer, StandardWallet,
    TransactionSubmitter, WalletConstants, WalletStore,
};

// (a 47 95): run the revealed inner puzzle with the inner solution
pub(crate) const PASS_THROUGH_CORE: [u8; 7] = hex!("ff02ff2fff5f80");

pub(crate) fn pass_through_core() -> Program {
    Program::from(PASS_THROUGH_CORE.to_vec())
}

// (a 95 191): the same with the origin coin curried in front
pub(crate) const GENESIS_CORE_MOD: [u8; 9] = hex!("ff02ff5fff8200bf80");

pub(crate) fn genesis_core_mod() -> Program {
    Program::from(GENESIS_CORE_MOD.to_vec())
}

/// Standard coins are locked by the identity puzzle, which returns its
/// solution as the condition list.
fn identity() -> Program {
    Program::from(vec![1_u8])
}

#[derive(Default)]
struct Inner {
    wallets: HashMap<u32, WalletInfo>,
    actions: Vec<PendingAction>,
    coins: HashMap<u32, Vec<WalletCoinRecord>>,
    pending: HashMap<u32, HashSet<Bytes32>>,
    spendable: HashMap<u32, u64>,
    keys: HashMap<Bytes32, SecretKey>,
    derived: u32,
    puzzles: HashMap<Bytes32, (u32, Program)>,
    pushed: Vec<SpendBundle>,
    standard_coins: Vec<Coin>,
    sign_calls: usize,
    fail_updates: bool,
    reject_transactions: bool,
}

impl Inner {
    fn derive_inner_puzzle(&mut self) -> Program {
        let master = SecretKey::from_seed(&[1; 32]);
        let sk = master_to_wallet_unhardened(&master, self.derived).derive_synthetic();
        self.derived += 1;
        let puzzle = standard_inner_puzzle(sk.public_key()).unwrap();
        self.keys.insert(program_hash(&puzzle).unwrap(), sk);
        puzzle
    }
}

/// Every collaborator of a wallet, backed by maps.
#[derive(Default)]
pub(crate) struct TestServices {
    inner: Mutex<Inner>,
}

impl TestServices {
    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn add_coin(&self, wallet_id: u32, coin: Coin, height: u32) {
        self.with(|inner| {
            inner
                .coins
                .entry(wallet_id)
                .or_default()
                .push(WalletCoinRecord::new(coin, height, false));
        });
    }

    pub fn add_pending_removal(&self, wallet_id: u32, coin_id: Bytes32) {
        self.with(|inner| inner.pending.entry(wallet_id).or_default().insert(coin_id));
    }

    /// Overrides the unconfirmed spendable balance, which otherwise is the
    /// confirmed balance less pending removals.
    pub fn set_unconfirmed_spendable(&self, wallet_id: u32, amount: u64) {
        self.with(|inner| inner.spendable.insert(wallet_id, amount));
    }

    /// An uncoloured coin of `amount` held by the standard wallet.
    pub fn add_standard_coin(&self, seed: u8, amount: u64) -> Coin {
        let coin = Coin::new(
            Bytes32::new([seed; 32]),
            program_hash(&identity()).unwrap(),
            amount,
        );
        self.with(|inner| inner.standard_coins.push(coin));
        coin
    }

    pub fn forget_key(&self, inner_puzzle_hash: Bytes32) {
        self.with(|inner| inner.keys.remove(&inner_puzzle_hash));
    }

    pub fn fail_updates(&self, fail: bool) {
        self.with(|inner| inner.fail_updates = fail);
    }

    pub fn reject_transactions(&self, reject: bool) {
        self.with(|inner| inner.reject_transactions = reject);
    }

    pub fn sign_calls(&self) -> usize {
        self.with(|inner| inner.sign_calls)
    }

    pub fn derived_puzzles(&self) -> u32 {
        self.with(|inner| inner.derived)
    }

    pub fn pushed(&self) -> Vec<SpendBundle> {
        self.with(|inner| inner.pushed.clone())
    }

    pub fn all_actions(&self) -> Vec<PendingAction> {
        self.with(|inner| inner.actions.clone())
    }

    /// Derives a fresh inner puzzle and registers the coloured puzzle hash
    /// wrapping it for `core`.
    pub fn new_cc_puzzle(&self, wallet_id: u32, core: &Program) -> (Bytes32, Program) {
        let core_hash = program_hash(core).unwrap();
        self.with(|inner| {
            let inner_puzzle = inner.derive_inner_puzzle();
            let inner_puzzle_hash = program_hash(&inner_puzzle).unwrap();
            let puzzle_hash = cc_puzzle_hash_for_inner_puzzle_hash(core_hash, inner_puzzle_hash);
            inner
                .puzzles
                .insert(puzzle_hash, (wallet_id, inner_puzzle.clone()));
            (puzzle_hash, inner_puzzle)
        })
    }

    /// A `CcInfo` for the pass-through core owning one coin per amount,
    /// each with a lineage proof and inner puzzle, oldest coin first.
    pub fn funded_info(&self, wallet_id: u32, amounts: &[u64]) -> (CcInfo, Vec<Coin>) {
        let core = pass_through_core();
        let mut info = CcInfo::default().with_core(core.clone());
        let mut coins = Vec::new();
        for (index, amount) in amounts.iter().enumerate() {
            let seed = index as u8 + 1;
            let (puzzle_hash, inner_puzzle) = self.new_cc_puzzle(wallet_id, &core);
            let inner_puzzle_hash = program_hash(&inner_puzzle).unwrap();
            let coin = Coin::new(Bytes32::new([seed; 32]), puzzle_hash, *amount);
            self.add_coin(wallet_id, coin, u32::from(seed));
            info = info.with_inner_puzzle(coin.coin_id(), inner_puzzle).with_lineage(
                coin.coin_id(),
                CcParent::new(Bytes32::new([0xa0 + seed; 32]), inner_puzzle_hash, *amount),
            );
            coins.push(coin);
        }
        (info, coins)
    }
}

/// Checks the aggregated signature of `bundle` against every AGG_SIG
/// condition its spends emit.
pub(crate) fn verify_bundle(bundle: &SpendBundle, constants: &WalletConstants) -> bool {
    let mut pairs = Vec::new();
    for cs in &bundle.coin_solutions {
        let (_, conditions) = cs.conditions(constants.max_block_cost_clvm).unwrap();
        pairs.extend(
            pkm_pairs_for_conditions(
                &conditions,
                &cs.coin,
                constants.agg_sig_me_additional_data.as_ref(),
            )
            .unwrap(),
        );
    }
    !pairs.is_empty()
        && aggregate_verify(
            &bundle.aggregated_signature,
            pairs.iter().map(|(pk, msg)| (pk, msg.as_slice())),
        )
}

impl TransactionSubmitter for TestServices {
    async fn push_transaction(&self, bundle: SpendBundle) -> ServiceResult<()> {
        self.with(|inner| {
            if inner.reject_transactions {
                return Err(ServiceError::Rejected("mempool full".to_string()));
            }
            // what the bundle spends is pending until it's confirmed
            for coin_id in bundle.removals().iter().map(Coin::coin_id) {
                for (wallet_id, records) in &inner.coins {
                    if records.iter().any(|record| record.coin.coin_id() == coin_id) {
                        inner.pending.entry(*wallet_id).or_default().insert(coin_id);
                    }
                }
            }
            inner.pushed.push(bundle);
            Ok(())
        })
    }
}

impl CoinStore for TestServices {
    async fn confirmed_balance(&self, wallet_id: u32) -> ServiceResult<u64> {
        Ok(self.with(|inner| {
            inner
                .coins
                .get(&wallet_id)
                .into_iter()
                .flatten()
                .filter(|record| !record.spent)
                .map(|record| record.coin.amount)
                .sum()
        }))
    }

    async fn unconfirmed_spendable(&self, wallet_id: u32) -> ServiceResult<u64> {
        if let Some(amount) = self.with(|inner| inner.spendable.get(&wallet_id).copied()) {
            return Ok(amount);
        }
        Ok(self.with(|inner| {
            let pending = inner.pending.get(&wallet_id);
            inner
                .coins
                .get(&wallet_id)
                .into_iter()
                .flatten()
                .filter(|record| !record.spent)
                .filter(|record| pending.is_none_or(|p| !p.contains(&record.coin.coin_id())))
                .map(|record| record.coin.amount)
                .sum()
        }))
    }

    async fn spendable_coin_records(&self, wallet_id: u32) -> ServiceResult<Vec<WalletCoinRecord>> {
        Ok(self.with(|inner| {
            inner
                .coins
                .get(&wallet_id)
                .into_iter()
                .flatten()
                .filter(|record| !record.spent)
                .copied()
                .collect()
        }))
    }

    async fn pending_removals(&self, wallet_id: u32) -> ServiceResult<HashSet<Bytes32>> {
        Ok(self.with(|inner| inner.pending.get(&wallet_id).cloned().unwrap_or_default()))
    }
}

impl Signer for TestServices {
    async fn sign(&self, inner_puzzle_hash: Bytes32, message: Vec<u8>) -> ServiceResult<Signature> {
        self.with(|inner| {
            inner.sign_calls += 1;
            let sk = inner
                .keys
                .get(&inner_puzzle_hash)
                .ok_or(ServiceError::KeyNotFound(inner_puzzle_hash))?;
            Ok(sign(sk, message))
        })
    }
}

impl PuzzleStore for TestServices {
    async fn new_inner_puzzle(&self, _wallet_id: u32) -> ServiceResult<Program> {
        Ok(self.with(Inner::derive_inner_puzzle))
    }

    async fn record_puzzle_hash(
        &self,
        wallet_id: u32,
        puzzle_hash: Bytes32,
        inner_puzzle: Program,
    ) -> ServiceResult<()> {
        self.with(|inner| inner.puzzles.insert(puzzle_hash, (wallet_id, inner_puzzle)));
        Ok(())
    }

    async fn inner_puzzle_for_puzzle_hash(
        &self,
        puzzle_hash: Bytes32,
    ) -> ServiceResult<Option<Program>> {
        Ok(self.with(|inner| {
            inner
                .puzzles
                .get(&puzzle_hash)
                .map(|(_, inner_puzzle)| inner_puzzle.clone())
        }))
    }

    async fn is_wallet_puzzle_hash(&self, wallet_id: u32, puzzle_hash: Bytes32) -> ServiceResult<bool> {
        Ok(self.with(|inner| {
            inner
                .puzzles
                .get(&puzzle_hash)
                .is_some_and(|(id, _)| *id == wallet_id)
        }))
    }
}

impl StandardWallet for TestServices {
    async fn select_standard_coins(&self, amount: u64) -> ServiceResult<Vec<Coin>> {
        self.with(|inner| {
            let mut selected = Vec::new();
            let mut sum = 0;
            for coin in &inner.standard_coins {
                if sum >= amount && !selected.is_empty() {
                    break;
                }
                sum += coin.amount;
                selected.push(*coin);
            }
            if sum < amount || selected.is_empty() {
                return Err(ServiceError::Other("not enough standard coins".to_string()));
            }
            Ok(selected)
        })
    }

    async fn generate_signed_transaction(
        &self,
        amount: u64,
        puzzle_hash: Bytes32,
        fee: u64,
        origin_id: Bytes32,
        coins: Vec<Coin>,
    ) -> ServiceResult<SpendBundle> {
        if !coins.iter().any(|coin| coin.coin_id() == origin_id) {
            return Err(ServiceError::Other(format!("origin {origin_id} isn't spent")));
        }
        let total: u64 = coins.iter().map(|coin| coin.amount).sum();
        let change = total - amount - fee;
        let change_puzzle_hash = program_hash(&identity()).unwrap();

        let coin_solutions = coins
            .iter()
            .map(|coin| {
                let solution = if coin.coin_id() == origin_id && change > 0 {
                    to_program(&clvm_list!(
                        clvm_list!(CREATE_COIN, puzzle_hash, amount),
                        clvm_list!(CREATE_COIN, change_puzzle_hash, change)
                    ))
                } else if coin.coin_id() == origin_id {
                    to_program(&clvm_list!(clvm_list!(CREATE_COIN, puzzle_hash, amount)))
                } else {
                    to_program(&())
                }
                .unwrap();
                CoinSolution::from_puzzle_and_solution(*coin, &identity(), &solution).unwrap()
            })
            .collect();
        // nothing in these spends asks for a signature
        Ok(SpendBundle::new(coin_solutions, Signature::default()))
    }
}

impl WalletStore for TestServices {
    async fn create_wallet(
        &self,
        name: String,
        wallet_type: WalletType,
        data: Bytes,
    ) -> ServiceResult<WalletInfo> {
        Ok(self.with(|inner| {
            // id 1 is the standard wallet
            let id = inner.wallets.keys().max().copied().unwrap_or(1) + 1;
            let info = WalletInfo::new(id, name, wallet_type, data);
            inner.wallets.insert(id, info.clone());
            info
        }))
    }

    async fn update_wallet(&self, info: WalletInfo) -> ServiceResult<()> {
        self.with(|inner| {
            if inner.fail_updates {
                return Err(ServiceError::Storage("disk full".to_string()));
            }
            inner.wallets.insert(info.id, info);
            Ok(())
        })
    }

    async fn get_wallet(&self, id: u32) -> ServiceResult<Option<WalletInfo>> {
        Ok(self.with(|inner| inner.wallets.get(&id).cloned()))
    }
}

impl ActionQueue for TestServices {
    async fn enqueue(
        &self,
        name: String,
        wallet_id: u32,
        wallet_type: WalletType,
        data: Bytes,
    ) -> ServiceResult<u32> {
        Ok(self.with(|inner| {
            if let Some(action) = inner.actions.iter().find(|action| {
                !action.done
                    && action.name == name
                    && action.wallet_id == wallet_id
                    && action.data == data
            }) {
                return action.id;
            }
            let id = inner.actions.len() as u32 + 1;
            inner
                .actions
                .push(PendingAction::new(id, name, wallet_id, wallet_type, data, false));
            id
        }))
    }

    async fn mark_done(&self, action_id: u32) -> ServiceResult<()> {
        self.with(|inner| {
            let action = inner
                .actions
                .iter_mut()
                .find(|action| action.id == action_id)
                .ok_or_else(|| ServiceError::Other(format!("unknown action {action_id}")))?;
            action.done = true;
            Ok(())
        })
    }

    async fn pending_actions(&self, wallet_id: u32) -> ServiceResult<Vec<PendingAction>> {
        Ok(self.with(|inner| {
            inner
                .actions
                .iter()
                .filter(|action| action.wallet_id == wallet_id && !action.done)
                .cloned()
                .collect()
        }))
    }
}
