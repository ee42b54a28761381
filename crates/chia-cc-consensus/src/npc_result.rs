use chia_cc_protocol::Npc;
use chia_protocol::{Bytes32, Program};
use clvm_traits::{FromClvm, ToClvm};
use clvm_utils::tree_hash;
use clvmr::allocator::Allocator;
use clvmr::cost::Cost;

use crate::conditions::conditions_for_nodes;
use crate::validation::{atom, next, two_items};
use crate::{ErrorCode, EvalFault, NpcError, ProgramEvaluator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcResult {
    pub npc_list: Vec<Npc>,
    pub cost: Cost,
}

/// Runs a block generator and decodes every spend it contains.
///
/// The generator is run without arguments and must return a list of
/// `(coin_name (puzzle solution))`. Each puzzle is run against its solution
/// to obtain the conditions of that spend. The cost of every evaluation is
/// accumulated, and on failure the error carries whatever had been spent up
/// to that point.
pub fn get_name_puzzle_conditions(
    evaluator: &impl ProgramEvaluator,
    generator: &Program,
    max_cost: Cost,
) -> Result<NpcResult, NpcError> {
    let a = &mut Allocator::new();
    let program = generator
        .to_clvm(a)
        .map_err(|_| NpcError::new(ErrorCode::InvalidGeneratorOutput, 0))?;
    let args = a.nil();
    let (mut cost, output) = evaluator
        .run(a, program, args, max_cost)
        .map_err(|_| NpcError::new(ErrorCode::InvalidGeneratorOutput, 0))?;

    let mut npc_list = Vec::new();
    let mut iter = output;
    loop {
        let fail = |code| NpcError::new(code, cost);
        let Some((spend, tail)) =
            next(a, iter, ErrorCode::InvalidGeneratorOutput).map_err(fail)?
        else {
            break;
        };
        iter = tail;

        let (coin_name, puzzle_and_solution) =
            two_items(a, spend, ErrorCode::InvalidCoinSolution).map_err(fail)?;
        let coin_name = atom(a, coin_name, ErrorCode::InvalidCoinSolution).map_err(fail)?;
        let coin_name = Bytes32::try_from(coin_name.as_ref())
            .map_err(|_| fail(ErrorCode::InvalidCoinSolution))?;
        let (puzzle, solution) =
            two_items(a, puzzle_and_solution, ErrorCode::InvalidCoinSolution).map_err(fail)?;

        let puzzle_hash: Bytes32 = tree_hash(a, puzzle).into();
        let cost_left = max_cost.saturating_sub(cost);
        let (spend_cost, conditions) = conditions_for_nodes(evaluator, a, puzzle, solution, cost_left)
            .map_err(|err| match err {
                EvalFault::InvalidCondition => fail(ErrorCode::InvalidCondition),
                _ => fail(ErrorCode::InvalidCoinSolution),
            })?;
        cost += spend_cost;

        let fail = |code| NpcError::new(code, cost);
        let reveal =
            Program::from_clvm(a, puzzle).map_err(|_| fail(ErrorCode::InvalidCoinSolution))?;
        let solution =
            Program::from_clvm(a, solution).map_err(|_| fail(ErrorCode::InvalidCoinSolution))?;
        let npc = Npc::new(coin_name, puzzle_hash, reveal, solution, conditions);
        // every CREATE_COIN has to name a puzzle hash and an amount
        npc.created_coins()
            .map_err(|_| fail(ErrorCode::InvalidCondition))?;
        npc_list.push(npc);
    }

    Ok(NpcResult { npc_list, cost })
}
