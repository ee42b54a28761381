use chia_bls::PublicKey;
use chia_cc_protocol::{
    AGG_SIG_ME, AGG_SIG_UNSAFE, Condition, ConditionOpcode, ConditionTable, parse_conditions,
};
use chia_protocol::{Coin, Program};
use clvm_traits::ToClvm;
use clvmr::allocator::{Allocator, NodePtr};
use clvmr::cost::Cost;

use crate::{ErrorCode, EvalFault, ProgramEvaluator};

/// Runs `puzzle` against `solution` and groups the conditions it returns by
/// opcode.
pub fn conditions_dict_for_solution(
    evaluator: &impl ProgramEvaluator,
    puzzle: &Program,
    solution: &Program,
    max_cost: Cost,
) -> Result<(Cost, ConditionTable), EvalFault> {
    let a = &mut Allocator::new();
    let puzzle = puzzle.to_clvm(a)?;
    let solution = solution.to_clvm(a)?;
    conditions_for_nodes(evaluator, a, puzzle, solution, max_cost)
}

pub(crate) fn conditions_for_nodes(
    evaluator: &impl ProgramEvaluator,
    a: &mut Allocator,
    puzzle: NodePtr,
    solution: NodePtr,
    max_cost: Cost,
) -> Result<(Cost, ConditionTable), EvalFault> {
    let (cost, output) = evaluator.run(a, puzzle, solution, max_cost)?;
    Ok((cost, parse_conditions(a, output)?))
}

/// Appends what an AGG_SIG condition commits to besides its own message.
/// AGG_SIG_UNSAFE signs the message as is, AGG_SIG_ME binds it to the coin
/// and the network.
pub fn make_aggsig_final_message(
    opcode: ConditionOpcode,
    msg: &mut Vec<u8>,
    coin: &Coin,
    agg_sig_me_additional_data: &[u8],
) {
    if opcode == AGG_SIG_ME {
        msg.extend(coin.coin_id().as_slice());
        msg.extend(agg_sig_me_additional_data);
    }
}

fn pkm_pair(
    condition: &Condition,
    coin: &Coin,
    agg_sig_me_additional_data: &[u8],
) -> Result<(PublicKey, Vec<u8>), ErrorCode> {
    let pk: &[u8; 48] = condition
        .var(0)
        .and_then(|buf| buf.try_into().ok())
        .ok_or(ErrorCode::InvalidCondition)?;
    let pk = PublicKey::from_bytes(pk).map_err(|_| ErrorCode::InvalidCondition)?;
    let mut msg = condition
        .var(1)
        .ok_or(ErrorCode::InvalidCondition)?
        .to_vec();
    make_aggsig_final_message(condition.opcode, &mut msg, coin, agg_sig_me_additional_data);
    Ok((pk, msg))
}

/// The `(public key, message)` pairs a spend of `coin` has to be signed
/// with, AGG_SIG_UNSAFE first.
pub fn pkm_pairs_for_conditions(
    conditions: &ConditionTable,
    coin: &Coin,
    agg_sig_me_additional_data: &[u8],
) -> Result<Vec<(PublicKey, Vec<u8>)>, ErrorCode> {
    let mut ret = Vec::new();
    for opcode in [AGG_SIG_UNSAFE, AGG_SIG_ME] {
        for condition in conditions.get(&opcode).into_iter().flatten() {
            ret.push(pkm_pair(condition, coin, agg_sig_me_additional_data)?);
        }
    }
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClvmEvaluator;
    use chia_bls::SecretKey;
    use chia_cc_protocol::CREATE_COIN;
    use chia_protocol::{Bytes, Bytes32};
    use clvm_traits::{FromClvm, clvm_list};
    use rstest::rstest;

    fn program(value: &impl ToClvm<Allocator>) -> Program {
        let a = &mut Allocator::new();
        let node = value.to_clvm(a).unwrap();
        Program::from_clvm(a, node).unwrap()
    }

    fn agg_sig(opcode: ConditionOpcode, pk: &PublicKey, msg: &[u8]) -> Condition {
        Condition::new(
            opcode,
            vec![Bytes::new(pk.to_bytes().to_vec()), Bytes::new(msg.to_vec())],
        )
    }

    #[test]
    fn solution_conditions_through_the_identity_puzzle() {
        let ph = Bytes32::new([3; 32]);
        let solution = program(&clvm_list!(clvm_list!(CREATE_COIN, ph, 42_u64)));
        let (cost, table) = conditions_dict_for_solution(
            &ClvmEvaluator::default(),
            &Program::from(vec![1_u8]),
            &solution,
            11_000_000_000,
        )
        .unwrap();
        assert!(cost > 0);
        assert_eq!(table[&CREATE_COIN][0].create_coin(), Some((ph, 42)));
    }

    #[test]
    fn malformed_output_is_invalid_condition() {
        // the identity puzzle hands back a list whose first condition is an atom
        let solution = program(&clvm_list!(51_u8));
        let err = conditions_dict_for_solution(
            &ClvmEvaluator::default(),
            &Program::from(vec![1_u8]),
            &solution,
            11_000_000_000,
        )
        .unwrap_err();
        assert_eq!(err, EvalFault::InvalidCondition);
    }

    #[rstest]
    #[case(AGG_SIG_UNSAFE, false)]
    #[case(AGG_SIG_ME, true)]
    fn final_message(#[case] opcode: ConditionOpcode, #[case] bound_to_coin: bool) {
        let coin = Coin::new(Bytes32::new([1; 32]), Bytes32::new([2; 32]), 3);
        let additional_data = [0xcc_u8; 32];
        let mut msg = b"hello".to_vec();
        make_aggsig_final_message(opcode, &mut msg, &coin, &additional_data);

        let mut expected = b"hello".to_vec();
        if bound_to_coin {
            expected.extend(coin.coin_id().as_slice());
            expected.extend(additional_data);
        }
        assert_eq!(msg, expected);
    }

    #[test]
    fn pkm_pairs_unsafe_first() {
        let pk = SecretKey::from_seed(&[1; 32]).public_key();
        let coin = Coin::new(Bytes32::new([1; 32]), Bytes32::new([2; 32]), 3);
        let mut table = ConditionTable::new();
        table.insert(AGG_SIG_ME, vec![agg_sig(AGG_SIG_ME, &pk, b"me")]);
        table.insert(AGG_SIG_UNSAFE, vec![agg_sig(AGG_SIG_UNSAFE, &pk, b"unsafe")]);

        let pairs = pkm_pairs_for_conditions(&table, &coin, &[7; 32]).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (pk, b"unsafe".to_vec()));
        assert_eq!(pairs[1].1.len(), 2 + 32 + 32);
        assert_eq!(&pairs[1].1[2..34], coin.coin_id().as_slice());
    }

    #[test]
    fn pkm_pairs_rejects_bad_key() {
        let coin = Coin::new(Bytes32::new([1; 32]), Bytes32::new([2; 32]), 3);
        let mut table = ConditionTable::new();
        table.insert(
            AGG_SIG_ME,
            vec![Condition::new(
                AGG_SIG_ME,
                vec![Bytes::new(vec![1, 2, 3]), Bytes::new(b"msg".to_vec())],
            )],
        );
        assert_eq!(
            pkm_pairs_for_conditions(&table, &coin, &[]),
            Err(ErrorCode::InvalidCondition)
        );
    }
}
