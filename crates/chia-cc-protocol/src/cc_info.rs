use chia_protocol::{Bytes32, Program};
use chia_puzzle_types::LineageProof;
use chia_streamable_macro::streamable;
use clvm_traits::{
    ClvmDecoder, ClvmEncoder, FromClvm, FromClvmError, ToClvm, ToClvmError, clvm_list,
    destructure_list, match_list,
};
use clvm_utils::tree_hash;
use clvmr::Allocator;

use crate::Result;

/// Proof that a coloured coin descends from a coin of the same colour.
///
/// It is stored under the id of the child and describes the child's parent:
/// the parent's own parent id, the inner puzzle hash the parent was locked
/// with and the parent's amount. Rehashing these together with the parent's
/// outer puzzle hash must yield the child's parent id.
#[streamable]
#[derive(Copy)]
pub struct CcParent {
    parent_name: Bytes32,
    inner_puzzle_hash: Bytes32,
    amount: u64,
}

impl<N, E: ClvmEncoder<Node = N>> ToClvm<E> for CcParent {
    fn to_clvm(&self, encoder: &mut E) -> std::result::Result<N, ToClvmError> {
        clvm_list!(self.parent_name, self.inner_puzzle_hash, self.amount).to_clvm(encoder)
    }
}

impl<N, D: ClvmDecoder<Node = N>> FromClvm<D> for CcParent {
    fn from_clvm(decoder: &D, node: N) -> std::result::Result<Self, FromClvmError> {
        let destructure_list!(parent_name, inner_puzzle_hash, amount) =
            <match_list!(Bytes32, Bytes32, u64)>::from_clvm(decoder, node)?;
        Ok(CcParent {
            parent_name,
            inner_puzzle_hash,
            amount,
        })
    }
}

impl From<LineageProof> for CcParent {
    fn from(proof: LineageProof) -> Self {
        CcParent::new(
            proof.parent_parent_coin_info,
            proof.parent_inner_puzzle_hash,
            proof.parent_amount,
        )
    }
}

impl From<CcParent> for LineageProof {
    fn from(parent: CcParent) -> Self {
        LineageProof {
            parent_parent_coin_info: parent.parent_name,
            parent_inner_puzzle_hash: parent.inner_puzzle_hash,
            parent_amount: parent.amount,
        }
    }
}

/// The persisted state of one coloured coin wallet.
///
/// Values are never mutated in place. Every `with_*` method returns a new
/// value and leaves the receiver untouched, so a snapshot handed to a reader
/// stays consistent while a writer prepares the next state. Both lookup
/// tables are kept sorted by coin id.
#[streamable]
#[derive(Default)]
pub struct CcInfo {
    my_core: Option<Program>,
    inner_puzzle_lookup_for_coin: Vec<(Bytes32, Program)>,
    parent_info: Vec<(Bytes32, CcParent)>,
    my_colour_name: Option<String>,
}

fn upsert<T>(table: &mut Vec<(Bytes32, T)>, key: Bytes32, value: T) {
    match table.binary_search_by(|(k, _)| k.cmp(&key)) {
        Ok(idx) => table[idx].1 = value,
        Err(idx) => table.insert(idx, (key, value)),
    }
}

fn lookup<'a, T>(table: &'a [(Bytes32, T)], key: &Bytes32) -> Option<&'a T> {
    table
        .binary_search_by(|(k, _)| k.cmp(key))
        .ok()
        .map(|idx| &table[idx].1)
}

/// The tree hash of a serialized program.
pub fn program_hash(program: &Program) -> Result<Bytes32> {
    let a = &mut Allocator::new();
    let node = program.to_clvm(a)?;
    Ok(tree_hash(a, node).into())
}

impl CcInfo {
    /// The colour is identified by the tree hash of its core program.
    pub fn colour_id(&self) -> Result<Option<Bytes32>> {
        self.my_core.as_ref().map(program_hash).transpose()
    }

    pub fn lineage(&self, coin_id: &Bytes32) -> Option<&CcParent> {
        lookup(&self.parent_info, coin_id)
    }

    pub fn inner_puzzle(&self, coin_id: &Bytes32) -> Option<&Program> {
        lookup(&self.inner_puzzle_lookup_for_coin, coin_id)
    }

    #[must_use]
    pub fn with_name(&self, name: String) -> Self {
        Self {
            my_colour_name: Some(name),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_core(&self, core: Program) -> Self {
        Self {
            my_core: Some(core),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_lineage(&self, coin_id: Bytes32, parent: CcParent) -> Self {
        let mut parent_info = self.parent_info.clone();
        upsert(&mut parent_info, coin_id, parent);
        Self {
            parent_info,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_inner_puzzle(&self, coin_id: Bytes32, inner_puzzle: Program) -> Self {
        let mut inner_puzzle_lookup_for_coin = self.inner_puzzle_lookup_for_coin.clone();
        upsert(&mut inner_puzzle_lookup_for_coin, coin_id, inner_puzzle);
        Self {
            inner_puzzle_lookup_for_coin,
            ..self.clone()
        }
    }

    /// Drops everything known about a coin that has been spent.
    #[must_use]
    pub fn without_coin(&self, coin_id: &Bytes32) -> Self {
        let mut info = self.clone();
        info.inner_puzzle_lookup_for_coin
            .retain(|(k, _)| k != coin_id);
        info.parent_info.retain(|(k, _)| k != coin_id);
        info
    }
}
