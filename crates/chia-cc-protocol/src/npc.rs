use chia_protocol::{Bytes32, Coin, Program};

use crate::{CREATE_COIN, Condition, ConditionOpcode, ConditionTable, Error, Result};

/// The decoded effect of one coin spend inside a block generator, together
/// with the puzzle reveal and solution it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Npc {
    pub coin_name: Bytes32,
    pub puzzle_hash: Bytes32,
    pub puzzle: Program,
    pub solution: Program,
    pub conditions: ConditionTable,
}

impl Npc {
    pub fn new(
        coin_name: Bytes32,
        puzzle_hash: Bytes32,
        puzzle: Program,
        solution: Program,
        conditions: ConditionTable,
    ) -> Self {
        Self {
            coin_name,
            puzzle_hash,
            puzzle,
            solution,
            conditions,
        }
    }

    pub fn conditions_for(&self, opcode: ConditionOpcode) -> &[Condition] {
        self.conditions.get(&opcode).map_or(&[], Vec::as_slice)
    }

    /// The `(puzzle_hash, amount)` of every CREATE_COIN, in the order the
    /// spend emitted them. A malformed one fails the whole spend.
    pub fn created_coins(&self) -> Result<Vec<(Bytes32, u64)>> {
        self.conditions_for(CREATE_COIN)
            .iter()
            .map(|c| c.create_coin().ok_or(Error::InvalidSpend))
            .collect()
    }

    pub fn creates_puzzle_hash(&self, puzzle_hash: &Bytes32) -> Result<bool> {
        Ok(self
            .created_coins()?
            .iter()
            .any(|(ph, _)| ph == puzzle_hash))
    }

    /// Created coins as full records. The parent is the spent coin, whose id
    /// is `coin_name`.
    pub fn additions(&self) -> Result<Vec<Coin>> {
        crate::created_coins(&self.conditions, self.coin_name)
    }
}
