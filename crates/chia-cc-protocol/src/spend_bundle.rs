use std::collections::HashSet;

use chia_bls::G2Element;
use chia_protocol::{Bytes32, Coin};
use chia_streamable_macro::streamable;
use chia_traits::Streamable;
use clvmr::cost::Cost;

use crate::{CoinSolution, Error, Result};

#[streamable]
pub struct SpendBundle {
    coin_solutions: Vec<CoinSolution>,
    aggregated_signature: G2Element,
}

impl SpendBundle {
    /// Concatenates the coin solutions of every bundle, in order, and adds
    /// their signatures together.
    pub fn aggregate(spend_bundles: &[SpendBundle]) -> SpendBundle {
        let mut coin_solutions = Vec::<CoinSolution>::new();
        let mut aggregated_signature = G2Element::default();
        for sb in spend_bundles {
            coin_solutions.extend_from_slice(&sb.coin_solutions[..]);
            aggregated_signature.aggregate(&sb.aggregated_signature);
        }
        SpendBundle {
            coin_solutions,
            aggregated_signature,
        }
    }

    pub fn name(&self) -> Bytes32 {
        self.hash().into()
    }

    pub fn removals(&self) -> Vec<Coin> {
        self.coin_solutions.iter().map(|cs| cs.coin).collect()
    }

    pub fn additions(&self, max_cost: Cost) -> Result<Vec<Coin>> {
        let mut cost_left = max_cost;
        let mut ret = Vec::<Coin>::new();
        for cs in &self.coin_solutions {
            let (cost, conditions) = cs.conditions(cost_left)?;
            if cost > cost_left {
                return Err(Error::CostExceeded);
            }
            cost_left -= cost;
            ret.extend(crate::created_coins(&conditions, cs.coin.coin_id())?);
        }
        Ok(ret)
    }

    /// Additions that are not spent again inside this same bundle.
    pub fn not_ephemeral_additions(&self, max_cost: Cost) -> Result<Vec<Coin>> {
        let removed: HashSet<Bytes32> = self
            .coin_solutions
            .iter()
            .map(|cs| cs.coin.coin_id())
            .collect();
        Ok(self
            .additions(max_cost)?
            .into_iter()
            .filter(|coin| !removed.contains(&coin.coin_id()))
            .collect())
    }
}
