use chia_protocol::{Coin, Program};
use chia_streamable_macro::streamable;
use clvm_traits::{FromClvm, ToClvm, clvm_list, destructure_list, match_list};
use clvmr::{Allocator, ClvmFlags};
use clvmr::cost::Cost;

use crate::{ConditionTable, Error, Result, created_coins, parse_conditions};

/// A coin together with the program that unlocks it. The solution is the
/// pair `(puzzle solution)`, serialized as one program.
#[streamable]
pub struct CoinSolution {
    coin: Coin,
    solution: Program,
}

impl CoinSolution {
    pub fn from_puzzle_and_solution(
        coin: Coin,
        puzzle: &Program,
        solution: &Program,
    ) -> Result<Self> {
        let a = &mut Allocator::new();
        let node = clvm_list!(puzzle, solution).to_clvm(a)?;
        Ok(Self {
            coin,
            solution: Program::from_clvm(a, node)?,
        })
    }

    /// Splits the combined program back into the puzzle reveal and the
    /// solution passed to it.
    pub fn puzzle_and_solution(&self) -> Result<(Program, Program)> {
        let a = &mut Allocator::new();
        let node = self.solution.to_clvm(a)?;
        let destructure_list!(puzzle, solution) =
            <match_list!(Program, Program)>::from_clvm(a, node)?;
        Ok((puzzle, solution))
    }

    pub fn puzzle_reveal(&self) -> Result<Program> {
        Ok(self.puzzle_and_solution()?.0)
    }

    pub fn solution_program(&self) -> Result<Program> {
        Ok(self.puzzle_and_solution()?.1)
    }

    /// Runs the puzzle against its solution and decodes the conditions.
    pub fn conditions(&self, max_cost: Cost) -> Result<(Cost, ConditionTable)> {
        let (puzzle, solution) = self.puzzle_and_solution()?;
        let a = &mut Allocator::new();
        let (cost, conditions) = puzzle
            .run(a, ClvmFlags::empty(), max_cost, &solution)
            .map_err(|err| Error::Eval(format!("{err:?}")))?;
        Ok((cost, parse_conditions(a, conditions)?))
    }

    pub fn additions(&self, max_cost: Cost) -> Result<Vec<Coin>> {
        let (_, conditions) = self.conditions(max_cost)?;
        created_coins(&conditions, self.coin.coin_id())
    }
}
