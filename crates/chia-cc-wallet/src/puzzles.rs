//! The coloured wrapper around inner puzzles, the bookkeeping stubs spent
//! alongside it and the solutions the auditor protocol feeds them.

use chia_bls::PublicKey;
use chia_cc_protocol::{CREATE_COIN, CcParent, CoinSolution, program_hash};
use chia_protocol::{Bytes32, Coin, Program};
use chia_puzzle_types::standard::{StandardArgs, StandardSolution};
use chia_puzzles::P2_DELEGATED_PUZZLE_OR_HIDDEN_PUZZLE;
use clvm_traits::{FromClvm, ToClvm, clvm_list};
use clvm_utils::{CurriedProgram, ToTreeHash, TreeHash, tree_hash};
use clvmr::allocator::{Allocator, NodePtr};
use hex_literal::hex;

use crate::Result;

/// `(q . ())`, a puzzle that returns no conditions. Stub coins lock their
/// bookkeeping into it as curried arguments.
pub const LOCK_PUZZLE: [u8; 3] = hex!("ff0180");

pub const LOCK_PUZZLE_HASH: [u8; 32] =
    hex!("ba4484b961b7a2369d948d06c55b64bdbfaffb326bc13b490ab1215dd33d8d46");

#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(curry)]
pub struct CcArgs {
    pub core_hash: Bytes32,
    pub inner_puzzle_hash: Bytes32,
}

impl CcArgs {
    pub fn new(core_hash: Bytes32, inner_puzzle_hash: Bytes32) -> Self {
        Self {
            core_hash,
            inner_puzzle_hash,
        }
    }

    pub fn curry_tree_hash(core_hash: Bytes32, inner_puzzle_hash: Bytes32) -> TreeHash {
        CurriedProgram {
            program: TreeHash::from(core_hash),
            args: CcArgs::new(core_hash, inner_puzzle_hash),
        }
        .tree_hash()
    }
}

/// Curried into a colour module to make the core of one colour. The origin
/// is the uncoloured coin whose spend issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(curry)]
pub struct GenesisArgs {
    pub origin: Coin,
}

/// Curried into the stub that carries a coin's declared output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(curry)]
pub struct EphemeralStubArgs {
    pub auditor_coin_id: Bytes32,
    pub declared_output: u64,
}

/// Curried into the stub the auditor creates for each coin it audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(curry)]
pub struct AuditStubArgs {
    pub auditee_coin_id: Bytes32,
}

/// A coin described by its inner puzzle hash rather than its full puzzle
/// hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(list)]
pub struct InnerCoinInfo {
    pub parent_coin_info: Bytes32,
    pub inner_puzzle_hash: Bytes32,
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(list)]
pub struct AuditorInfo {
    pub coin: InnerCoinInfo,
    pub lineage_proof: CcParent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(list)]
pub struct AuditeeInfo {
    pub parent_coin_info: Bytes32,
    pub inner_puzzle_hash: Bytes32,
    pub input_amount: u64,
    pub output_amount: u64,
}

/// The solution of a coloured coin.
#[derive(Debug, Clone, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(list)]
pub struct CcSolution<I, S> {
    pub lineage_proof: CcParent,
    pub this_coin_info: Coin,
    pub inner_puzzle: I,
    pub inner_solution: S,
    pub auditor: AuditorInfo,
    pub auditees: Vec<AuditeeInfo>,
}

pub(crate) fn to_program(value: &impl ToClvm<Allocator>) -> Result<Program> {
    let a = &mut Allocator::new();
    let node = value.to_clvm(a)?;
    Ok(Program::from_clvm(a, node)?)
}

pub fn cc_puzzle_for_inner_puzzle_hash(
    core: &Program,
    inner_puzzle_hash: Bytes32,
) -> Result<Program> {
    let core_hash = program_hash(core)?;
    to_program(&CurriedProgram {
        program: core,
        args: CcArgs::new(core_hash, inner_puzzle_hash),
    })
}

pub fn cc_puzzle_hash_for_inner_puzzle_hash(
    core_hash: Bytes32,
    inner_puzzle_hash: Bytes32,
) -> Bytes32 {
    CcArgs::curry_tree_hash(core_hash, inner_puzzle_hash).into()
}

/// The curried arguments of `puzzle` if it is the coloured wrapper for the
/// colour `core_hash`, `None` for any other puzzle.
pub fn uncurry_cc(a: &Allocator, puzzle: NodePtr, core_hash: Bytes32) -> Option<CcArgs> {
    let curried = CurriedProgram::<NodePtr, CcArgs>::from_clvm(a, puzzle).ok()?;
    if curried.args.core_hash != core_hash
        || Bytes32::from(tree_hash(a, curried.program)) != core_hash
    {
        return None;
    }
    Some(curried.args)
}

/// The core of the colour issued by spending `origin`.
pub fn cc_make_core(core_mod: &Program, origin: Coin) -> Result<Program> {
    to_program(&CurriedProgram {
        program: core_mod,
        args: GenesisArgs { origin },
    })
}

/// The origin coin a core was made from, if it was made by [`cc_make_core`].
pub fn genesis_origin(core: &Program) -> Result<Option<Coin>> {
    let a = &mut Allocator::new();
    let node = core.to_clvm(a)?;
    Ok(CurriedProgram::<NodePtr, GenesisArgs>::from_clvm(a, node)
        .ok()
        .map(|curried| curried.args.origin))
}

/// The lineage proof of a coin minted straight out of an uncoloured coin.
/// The parent isn't coloured, so its puzzle hash stands in for the inner
/// puzzle hash.
pub fn genesis_lineage_proof(origin: &Coin) -> CcParent {
    CcParent::new(origin.parent_coin_info, origin.puzzle_hash, origin.amount)
}

fn stub_puzzle(args: &impl ToClvm<Allocator>) -> Result<Program> {
    to_program(&CurriedProgram {
        program: Program::from(LOCK_PUZZLE.to_vec()),
        args,
    })
}

/// Spends a stub coin. The lock puzzle ignores its solution, so it's nil.
fn stub_coin_solution(parent_coin_id: Bytes32, puzzle: &Program) -> Result<CoinSolution> {
    let coin = Coin::new(parent_coin_id, program_hash(puzzle)?, 0);
    Ok(CoinSolution::from_puzzle_and_solution(
        coin,
        puzzle,
        &Program::from(vec![0x80]),
    )?)
}

/// The zero value coin a spending coin creates to carry its declared output
/// to the auditor.
pub fn ephemeral_stub(
    spending_coin_id: Bytes32,
    auditor_coin_id: Bytes32,
    declared_output: u64,
) -> Result<CoinSolution> {
    let puzzle = stub_puzzle(&EphemeralStubArgs {
        auditor_coin_id,
        declared_output,
    })?;
    stub_coin_solution(spending_coin_id, &puzzle)
}

/// The zero value coin the auditor creates to announce that it audited
/// `auditee_coin_id`.
pub fn audit_stub(auditor_coin_id: Bytes32, auditee_coin_id: Bytes32) -> Result<CoinSolution> {
    let puzzle = stub_puzzle(&AuditStubArgs { auditee_coin_id })?;
    stub_coin_solution(auditor_coin_id, &puzzle)
}

pub fn stub_puzzle_hash(args: &EphemeralStubArgs) -> Bytes32 {
    CurriedProgram {
        program: TreeHash::new(LOCK_PUZZLE_HASH),
        args: *args,
    }
    .tree_hash()
    .into()
}

/// The standard inner puzzle locked to `synthetic_key`.
pub fn standard_inner_puzzle(synthetic_key: PublicKey) -> Result<Program> {
    to_program(&CurriedProgram {
        program: Program::from(P2_DELEGATED_PUZZLE_OR_HIDDEN_PUZZLE.to_vec()),
        args: StandardArgs::new(synthetic_key),
    })
}

/// A solution for the standard inner puzzle that creates `primaries` and
/// nothing else.
pub fn standard_inner_solution(primaries: &[(Bytes32, u64)]) -> Result<Program> {
    let conditions: Vec<_> = primaries
        .iter()
        .map(|(puzzle_hash, amount)| clvm_list!(CREATE_COIN, *puzzle_hash, *amount))
        .collect();
    to_program(&StandardSolution::from_conditions(conditions))
}
