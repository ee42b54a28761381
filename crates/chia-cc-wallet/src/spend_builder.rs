//! Builds the transaction that spends a set of coloured coins.
//!
//! The first selected coin is the auditor. It pays the destination and the
//! change, and declares the whole input value as its output. Every other
//! coin declares an output of 0. Each real spend shows the full auditee
//! list, so the coloured puzzle can check that inputs and declared outputs
//! balance. Each coin also spends an ephemeral stub carrying its declared
//! output, and the auditor spends one announcement stub per audited coin.

use std::sync::Arc;

use chia_bls::Signature;
use chia_cc_consensus::{ProgramEvaluator, conditions_dict_for_solution, pkm_pairs_for_conditions};
use chia_cc_protocol::{CcInfo, CcParent, CoinSolution, SpendBundle, program_hash};
use chia_protocol::{Bytes32, Coin, Program};

use crate::puzzles::{
    AuditeeInfo, AuditorInfo, CcSolution, InnerCoinInfo, audit_stub, cc_puzzle_for_inner_puzzle_hash,
    cc_puzzle_hash_for_inner_puzzle_hash, ephemeral_stub, standard_inner_solution, to_program,
};
use crate::{PuzzleStore, Result, Signer, WalletConstants, WalletError};

/// The change output of a spend, with everything needed to spend it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeCoin {
    pub coin: Coin,
    /// Lineage of the change coin, describing the auditor as its parent.
    pub lineage: CcParent,
    pub inner_puzzle: Program,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcSpend {
    pub bundle: SpendBundle,
    pub change: Option<ChangeCoin>,
}

struct PreparedCoin {
    coin: Coin,
    lineage: CcParent,
    inner_puzzle: Program,
    inner_puzzle_hash: Bytes32,
}

pub struct SpendBuilder<S, E> {
    services: Arc<S>,
    evaluator: E,
    constants: WalletConstants,
    wallet_id: u32,
}

impl<S, E> SpendBuilder<S, E>
where
    S: PuzzleStore + Signer + Send + Sync,
    E: ProgramEvaluator + Send + Sync,
{
    pub fn new(services: Arc<S>, evaluator: E, constants: WalletConstants, wallet_id: u32) -> Self {
        Self {
            services,
            evaluator,
            constants,
            wallet_id,
        }
    }

    /// Spends `selected` to send `amount` to the inner puzzle hash
    /// `destination`, returning the signed bundle. It is not submitted.
    ///
    /// Every coin's lineage and inner puzzle are looked up before anything
    /// is derived or signed.
    pub async fn build(
        &self,
        info: &CcInfo,
        selected: &[Coin],
        amount: u64,
        destination: Bytes32,
    ) -> Result<CcSpend> {
        let core = info.my_core.as_ref().ok_or(WalletError::NoCore)?;
        let core_hash = program_hash(core)?;

        let mut prepared = Vec::with_capacity(selected.len());
        for coin in selected {
            let coin_id = coin.coin_id();
            let lineage = *info
                .lineage(&coin_id)
                .ok_or(WalletError::MissingLineage(coin_id))?;
            let inner_puzzle = info
                .inner_puzzle(&coin_id)
                .cloned()
                .ok_or(WalletError::MissingInnerPuzzle(coin_id))?;
            let inner_puzzle_hash = program_hash(&inner_puzzle)?;
            prepared.push(PreparedCoin {
                coin: *coin,
                lineage,
                inner_puzzle,
                inner_puzzle_hash,
            });
        }

        let total = selected
            .iter()
            .fold(0_u64, |acc, coin| acc.saturating_add(coin.amount));
        let Some(auditor) = prepared.first() else {
            return Err(WalletError::Contention {
                requested: amount,
                selected: 0,
            });
        };
        let Some(change) = total.checked_sub(amount) else {
            return Err(WalletError::Contention {
                requested: amount,
                selected: total,
            });
        };

        let mut primaries = vec![(destination, amount)];
        let change_coin = if change > 0 {
            let inner_puzzle = self.services.new_inner_puzzle(self.wallet_id).await?;
            let inner_puzzle_hash = program_hash(&inner_puzzle)?;
            let puzzle_hash = cc_puzzle_hash_for_inner_puzzle_hash(core_hash, inner_puzzle_hash);
            self.services
                .record_puzzle_hash(self.wallet_id, puzzle_hash, inner_puzzle.clone())
                .await?;
            primaries.push((inner_puzzle_hash, change));
            Some(ChangeCoin {
                coin: Coin::new(auditor.coin.coin_id(), puzzle_hash, change),
                lineage: CcParent::new(
                    auditor.coin.parent_coin_info,
                    auditor.inner_puzzle_hash,
                    auditor.coin.amount,
                ),
                inner_puzzle,
            })
        } else {
            None
        };

        let auditor_id = auditor.coin.coin_id();
        let auditor_info = AuditorInfo {
            coin: InnerCoinInfo {
                parent_coin_info: auditor.coin.parent_coin_info,
                inner_puzzle_hash: auditor.inner_puzzle_hash,
                amount: auditor.coin.amount,
            },
            lineage_proof: auditor.lineage,
        };
        let auditees: Vec<AuditeeInfo> = prepared
            .iter()
            .enumerate()
            .map(|(index, p)| AuditeeInfo {
                parent_coin_info: p.coin.parent_coin_info,
                inner_puzzle_hash: p.inner_puzzle_hash,
                input_amount: p.coin.amount,
                output_amount: if index == 0 { total } else { 0 },
            })
            .collect();

        let mut coin_solutions = Vec::with_capacity(prepared.len() * 3);
        let mut signature = Signature::default();
        for (index, p) in prepared.iter().enumerate() {
            let coin_id = p.coin.coin_id();
            let inner_solution = if index == 0 {
                standard_inner_solution(&primaries)?
            } else {
                standard_inner_solution(&[])?
            };

            signature.aggregate(&self.sign_inner(p, &inner_solution).await?);

            let puzzle = cc_puzzle_for_inner_puzzle_hash(core, p.inner_puzzle_hash)?;
            let solution = to_program(&CcSolution {
                lineage_proof: p.lineage,
                this_coin_info: p.coin,
                inner_puzzle: p.inner_puzzle.clone(),
                inner_solution,
                auditor: auditor_info,
                auditees: auditees.clone(),
            })?;
            coin_solutions.push(CoinSolution::from_puzzle_and_solution(
                p.coin, &puzzle, &solution,
            )?);
            coin_solutions.push(ephemeral_stub(
                coin_id,
                auditor_id,
                auditees[index].output_amount,
            )?);
            coin_solutions.push(audit_stub(auditor_id, coin_id)?);
        }

        log::debug!(
            "built spend of {} coins for wallet {}, change {change}",
            prepared.len(),
            self.wallet_id
        );
        Ok(CcSpend {
            bundle: SpendBundle::new(coin_solutions, signature),
            change: change_coin,
        })
    }

    /// Signs every AGG_SIG condition the inner puzzle of `p` emits.
    async fn sign_inner(&self, p: &PreparedCoin, inner_solution: &Program) -> Result<Signature> {
        let (_, conditions) = conditions_dict_for_solution(
            &self.evaluator,
            &p.inner_puzzle,
            inner_solution,
            self.constants.max_block_cost_clvm,
        )?;
        let pairs = pkm_pairs_for_conditions(
            &conditions,
            &p.coin,
            self.constants.agg_sig_me_additional_data.as_ref(),
        )
        .map_err(WalletError::Conditions)?;

        let mut signature = Signature::default();
        for (_, message) in pairs {
            signature.aggregate(&self.services.sign(p.inner_puzzle_hash, message).await?);
        }
        Ok(signature)
    }
}
