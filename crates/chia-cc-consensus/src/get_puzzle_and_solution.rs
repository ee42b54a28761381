use chia_protocol::{Bytes32, Program};
use clvm_traits::{FromClvm, ToClvm};
use clvmr::allocator::Allocator;
use clvmr::cost::Cost;

use crate::validation::{atom, next, two_items};
use crate::{ErrorCode, NpcError, ProgramEvaluator};

/// Runs the generator again and returns the puzzle reveal and solution of the
/// spend of `coin_name`. Fails with `InvalidCondition` if the generator
/// doesn't spend that coin.
pub fn get_puzzle_and_solution_for_coin(
    evaluator: &impl ProgramEvaluator,
    generator: &Program,
    coin_name: &Bytes32,
    max_cost: Cost,
) -> Result<(Program, Program), NpcError> {
    let a = &mut Allocator::new();
    let program = generator
        .to_clvm(a)
        .map_err(|_| NpcError::new(ErrorCode::InvalidGeneratorOutput, 0))?;
    let args = a.nil();
    let (cost, output) = evaluator
        .run(a, program, args, max_cost)
        .map_err(|_| NpcError::new(ErrorCode::InvalidGeneratorOutput, 0))?;
    let fail = |code| NpcError::new(code, cost);

    let mut iter = output;
    while let Some((spend, tail)) =
        next(a, iter, ErrorCode::InvalidGeneratorOutput).map_err(fail)?
    {
        iter = tail;
        let (name, puzzle_and_solution) =
            two_items(a, spend, ErrorCode::InvalidCoinSolution).map_err(fail)?;
        if atom(a, name, ErrorCode::InvalidCoinSolution)
            .map_err(fail)?
            .as_ref()
            != coin_name.as_slice()
        {
            continue;
        }

        // we found the coin
        let (puzzle, solution) =
            two_items(a, puzzle_and_solution, ErrorCode::InvalidCoinSolution).map_err(fail)?;
        let puzzle =
            Program::from_clvm(a, puzzle).map_err(|_| fail(ErrorCode::InvalidCoinSolution))?;
        let solution =
            Program::from_clvm(a, solution).map_err(|_| fail(ErrorCode::InvalidCoinSolution))?;
        return Ok((puzzle, solution));
    }
    Err(fail(ErrorCode::InvalidCondition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClvmEvaluator;
    use crate::npc_result::tests::{MAX_COST, program, quoted};
    use clvm_traits::clvm_list;

    #[test]
    fn finds_the_named_spend() {
        let coin1 = Bytes32::new([1; 32]);
        let coin2 = Bytes32::new([2; 32]);
        let puzzle2 = program(&clvm_list!(2_u8, 5_u8));
        let solution2 = program(&clvm_list!(7_u8));
        let generator = quoted(&clvm_list!(
            clvm_list!(coin1, clvm_list!(Program::from(vec![1_u8]), ())),
            clvm_list!(coin2, clvm_list!(puzzle2.clone(), solution2.clone()))
        ));

        let found =
            get_puzzle_and_solution_for_coin(&ClvmEvaluator::default(), &generator, &coin2, MAX_COST)
                .unwrap();
        assert_eq!(found, (puzzle2, solution2));
    }

    #[test]
    fn missing_spend() {
        let generator = quoted(&clvm_list!(clvm_list!(
            Bytes32::new([1; 32]),
            clvm_list!(Program::from(vec![1_u8]), ())
        )));
        let err = get_puzzle_and_solution_for_coin(
            &ClvmEvaluator::default(),
            &generator,
            &Bytes32::new([3; 32]),
            MAX_COST,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCondition);
        assert!(err.cost > 0);
    }
}
