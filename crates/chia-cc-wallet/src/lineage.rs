use std::sync::Arc;

use chia_cc_consensus::{ProgramEvaluator, get_name_puzzle_conditions};
use chia_cc_protocol::{CC_GET_GENERATOR, CcParent, GeneratorRequest, Npc, WalletType, program_hash};
use chia_protocol::{Bytes32, Coin, Program};
use chia_traits::Streamable;
use clvm_traits::{FromClvm, ToClvm};
use clvm_utils::tree_hash;
use clvmr::allocator::{Allocator, NodePtr};

use crate::puzzles::{CcSolution, genesis_lineage_proof, genesis_origin, uncurry_cc};
use crate::{Result, WalletConstants, WalletError, WalletServices, WalletState};

/// Verifies the spend of a parent coin and turns it into the lineage proof
/// of the coins it created.
///
/// Returns `None` if the parent isn't a coloured coin of colour `core_hash`
/// (an issuance, for instance), or if the coin info it declares doesn't hash
/// to `coin_name`.
pub fn lineage_proof_for_parent_spend(
    core_hash: Bytes32,
    coin_name: Bytes32,
    puzzle: &Program,
    solution: &Program,
) -> Result<Option<CcParent>> {
    let a = &mut Allocator::new();
    let puzzle = puzzle.to_clvm(a)?;
    let Some(args) = uncurry_cc(a, puzzle, core_hash) else {
        return Ok(None);
    };

    let solution = solution.to_clvm(a)?;
    let Ok(solution) = CcSolution::<NodePtr, NodePtr>::from_clvm(a, solution) else {
        log::warn!("coloured spend of {coin_name} has a malformed solution");
        return Ok(None);
    };

    let this = solution.this_coin_info;
    if this.coin_id() != coin_name || this.puzzle_hash != Bytes32::from(tree_hash(a, puzzle)) {
        log::warn!("coloured spend of {coin_name} declares coin info of another coin");
        return Ok(None);
    }

    Ok(Some(CcParent::new(
        this.parent_coin_info,
        args.inner_puzzle_hash,
        this.amount,
    )))
}

/// The lineage proof for the coins created by `npc`. A spend of the colour's
/// origin yields the genesis proof, any other spend has to be a verified
/// coloured parent.
fn parent_proof(core_hash: Bytes32, origin: Option<&Coin>, npc: &Npc) -> Result<Option<CcParent>> {
    if let Some(origin) = origin.filter(|origin| origin.coin_id() == npc.coin_name) {
        return Ok(Some(genesis_lineage_proof(origin)));
    }
    lineage_proof_for_parent_spend(core_hash, npc.coin_name, &npc.puzzle, &npc.solution)
}

/// Keeps the lineage table of a wallet up to date.
pub struct LineageTracker<S, E> {
    services: Arc<S>,
    state: Arc<WalletState<S>>,
    evaluator: E,
    constants: WalletConstants,
}

impl<S, E> LineageTracker<S, E>
where
    S: WalletServices,
    E: ProgramEvaluator + Send + Sync,
{
    pub fn new(
        services: Arc<S>,
        state: Arc<WalletState<S>>,
        evaluator: E,
        constants: WalletConstants,
    ) -> Self {
        Self {
            services,
            state,
            evaluator,
            constants,
        }
    }

    pub async fn get(&self, coin_id: Bytes32) -> Result<CcParent> {
        self.state
            .snapshot()
            .await
            .lineage(&coin_id)
            .copied()
            .ok_or(WalletError::MissingLineage(coin_id))
    }

    pub async fn record_lineage(&self, coin_id: Bytes32, parent: CcParent) -> Result<()> {
        self.state.record_lineage(coin_id, parent).await?;
        Ok(())
    }

    /// Records the lineage of a coin minted straight from `origin`, a coin
    /// this wallet spent to issue the colour. The origin isn't coloured, so
    /// its puzzle hash stands in for the inner puzzle hash.
    pub async fn record_genesis(&self, origin: &Coin, minted: &Coin) -> Result<()> {
        self.record_lineage(minted.coin_id(), genesis_lineage_proof(origin))
            .await
    }

    /// Takes note of a coin that arrived in the wallet. If its lineage isn't
    /// known yet, a request for the generator holding its parent spend is
    /// queued and its id returned.
    pub async fn coin_added(
        &self,
        coin: &Coin,
        height: u32,
        header_hash: Bytes32,
    ) -> Result<Option<u32>> {
        let coin_id = coin.coin_id();
        let wallet_id = self.state.wallet_id().await;
        log::info!("cc wallet {wallet_id} has been notified that coin {coin_id} was added");

        let inner_puzzle = match self
            .services
            .inner_puzzle_for_puzzle_hash(coin.puzzle_hash)
            .await?
        {
            Some(inner_puzzle) => inner_puzzle,
            None => self
                .state
                .snapshot()
                .await
                .inner_puzzle(&coin_id)
                .cloned()
                .ok_or(WalletError::MissingInnerPuzzle(coin_id))?,
        };
        let info = self.state.add_inner_puzzle(coin_id, inner_puzzle).await?;

        if info.lineage(&coin_id).is_some() {
            return Ok(None);
        }

        let request = GeneratorRequest::new(height, header_hash);
        let action_id = self
            .services
            .enqueue(
                CC_GET_GENERATOR.to_string(),
                wallet_id,
                WalletType::ColouredCoin,
                request.to_bytes()?.into(),
            )
            .await?;
        log::debug!("queued generator request {action_id} for block {height}");
        Ok(Some(action_id))
    }

    /// Handles the generator requested by action `action_id`: every coin it
    /// creates for this wallet gets the lineage proof of its parent. Returns
    /// the number of proofs recorded.
    ///
    /// If the generator can't be decoded the action stays pending and the
    /// wallet state is left as it was. Only this wallet's pending generator
    /// requests are accepted.
    pub async fn generator_received(&self, generator: &Program, action_id: u32) -> Result<usize> {
        let wallet_id = self.state.wallet_id().await;
        let requested = self
            .services
            .pending_actions(wallet_id)
            .await?
            .iter()
            .any(|action| action.id == action_id && action.name == CC_GET_GENERATOR);
        if !requested {
            log::warn!("cc wallet {wallet_id} didn't ask for a generator with action {action_id}");
            return Err(WalletError::UnknownAction(action_id));
        }

        let info = self.state.snapshot().await;
        let core = info.my_core.as_ref().ok_or(WalletError::NoCore)?;
        let core_hash = program_hash(core)?;
        let origin = genesis_origin(core)?;
        let max_cost = self.constants.max_block_cost_clvm;

        let npc_result = match get_name_puzzle_conditions(&self.evaluator, generator, max_cost) {
            Ok(npc_result) => npc_result,
            Err(error) => {
                log::warn!("failed to decode generator for action {action_id}: {error}");
                return Err(error.into());
            }
        };

        let mut recorded = 0;
        for npc in &npc_result.npc_list {
            let mut proof = None;
            for (puzzle_hash, amount) in npc.created_coins()? {
                if !self
                    .services
                    .is_wallet_puzzle_hash(wallet_id, puzzle_hash)
                    .await?
                {
                    continue;
                }

                if proof.is_none() {
                    proof = match parent_proof(core_hash, origin.as_ref(), npc) {
                        Ok(proof) => Some(proof),
                        Err(error) => {
                            log::warn!(
                                "failed to verify the spend of {} for action {action_id}: {error}",
                                npc.coin_name
                            );
                            return Err(error);
                        }
                    };
                }
                let Some(Some(parent)) = proof else {
                    log::info!("parent {} of a wallet coin isn't of this colour", npc.coin_name);
                    break;
                };

                let child = Coin::new(npc.coin_name, puzzle_hash, amount);
                self.state.record_lineage(child.coin_id(), parent).await?;
                recorded += 1;
            }
        }

        self.services.mark_done(action_id).await?;
        log::info!("recorded {recorded} lineage proofs from generator of action {action_id}");
        Ok(recorded)
    }
}
