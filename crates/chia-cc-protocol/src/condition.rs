use std::collections::BTreeMap;

use chia_protocol::{Bytes, Bytes32, Coin};
use clvmr::allocator::{Allocator, NodePtr, SExp};

use crate::{Error, Result};

pub type ConditionOpcode = u16;

// AGG_SIG is ascii "1"
pub const AGG_SIG_UNSAFE: ConditionOpcode = 49;
pub const AGG_SIG_ME: ConditionOpcode = 50;

// the conditions below reserve coin amounts and have to be accounted for in
// output totals
pub const CREATE_COIN: ConditionOpcode = 51;
pub const RESERVE_FEE: ConditionOpcode = 52;

// the conditions below deal with announcements, for inter-coin communication
pub const CREATE_COIN_ANNOUNCEMENT: ConditionOpcode = 60;
pub const ASSERT_COIN_ANNOUNCEMENT: ConditionOpcode = 61;
pub const CREATE_PUZZLE_ANNOUNCEMENT: ConditionOpcode = 62;
pub const ASSERT_PUZZLE_ANNOUNCEMENT: ConditionOpcode = 63;

// the conditions below let coins inquire about themselves
pub const ASSERT_MY_COIN_ID: ConditionOpcode = 70;
pub const ASSERT_MY_PARENT_ID: ConditionOpcode = 71;
pub const ASSERT_MY_PUZZLEHASH: ConditionOpcode = 72;
pub const ASSERT_MY_AMOUNT: ConditionOpcode = 73;

// the conditions below ensure that we're "far enough" in the future
pub const ASSERT_SECONDS_RELATIVE: ConditionOpcode = 80;
pub const ASSERT_SECONDS_ABSOLUTE: ConditionOpcode = 81;
pub const ASSERT_HEIGHT_RELATIVE: ConditionOpcode = 82;
pub const ASSERT_HEIGHT_ABSOLUTE: ConditionOpcode = 83;

/// A single condition emitted by a puzzle, with its atom operands in order.
/// Operands that are not atoms (such as a memo list trailing a CREATE_COIN)
/// are not kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub opcode: ConditionOpcode,
    pub vars: Vec<Bytes>,
}

/// Conditions of one spend, grouped by opcode. Within an opcode the order
/// they were emitted in is preserved.
pub type ConditionTable = BTreeMap<ConditionOpcode, Vec<Condition>>;

impl Condition {
    pub fn new(opcode: ConditionOpcode, vars: Vec<Bytes>) -> Self {
        Self { opcode, vars }
    }

    pub fn var(&self, index: usize) -> Option<&[u8]> {
        self.vars.get(index).map(Bytes::as_slice)
    }

    /// The puzzle hash and amount of a CREATE_COIN condition, or `None` if
    /// this isn't a well-formed one.
    pub fn create_coin(&self) -> Option<(Bytes32, u64)> {
        if self.opcode != CREATE_COIN {
            return None;
        }
        let puzzle_hash = Bytes32::try_from(self.var(0)?).ok()?;
        let amount = u64_from_atom(self.var(1)?)?;
        Some((puzzle_hash, amount))
    }
}

/// Interprets a CLVM atom as an unsigned amount. Negative values and values
/// wider than 64 bits are rejected.
pub fn u64_from_atom(buf: &[u8]) -> Option<u64> {
    if buf.first().is_some_and(|b| b & 0x80 != 0) {
        return None;
    }
    let start = buf.iter().position(|b| *b != 0).unwrap_or(buf.len());
    let buf = &buf[start..];
    if buf.len() > 8 {
        return None;
    }
    Some(buf.iter().fold(0_u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Decodes the condition list returned by a puzzle into a [`ConditionTable`].
/// Conditions with multi-byte opcodes are skipped, a condition whose opcode
/// isn't an atom is an error.
pub fn parse_conditions(a: &Allocator, conditions: NodePtr) -> Result<ConditionTable> {
    let mut table = ConditionTable::new();
    let mut iter = conditions;
    while let Some((c, tail)) = a.next(iter) {
        iter = tail;
        let SExp::Pair(op, args) = a.sexp(c) else {
            return Err(Error::InvalidCondition);
        };
        let buf = match a.sexp(op) {
            SExp::Atom => a.atom(op),
            SExp::Pair(..) => return Err(Error::InvalidCondition),
        };
        let buf = buf.as_ref();
        if buf.len() != 1 {
            continue;
        }
        let opcode = ConditionOpcode::from(buf[0]);

        let mut vars = Vec::new();
        let mut args = args;
        while let Some((arg, tail)) = a.next(args) {
            args = tail;
            if let SExp::Atom = a.sexp(arg) {
                vars.push(Bytes::new(a.atom(arg).as_ref().to_vec()));
            }
        }
        table
            .entry(opcode)
            .or_default()
            .push(Condition::new(opcode, vars));
    }
    Ok(table)
}

/// All coins created by a spend of `parent_coin_id`, in emission order.
pub fn created_coins(table: &ConditionTable, parent_coin_id: Bytes32) -> Result<Vec<Coin>> {
    let Some(conditions) = table.get(&CREATE_COIN) else {
        return Ok(Vec::new());
    };
    conditions
        .iter()
        .map(|c| {
            let (puzzle_hash, amount) = c.create_coin().ok_or(Error::InvalidSpend)?;
            Ok(Coin::new(parent_coin_id, puzzle_hash, amount))
        })
        .collect()
}
