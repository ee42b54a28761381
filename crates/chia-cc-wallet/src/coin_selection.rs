use std::sync::Arc;

use chia_protocol::Coin;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{CoinStore, Result, WalletError};

/// Coins picked for one spend. The selection lock stays held until this is
/// dropped, which has to happen only after the spend is pending.
#[derive(Debug)]
pub struct Selection {
    pub coins: Vec<Coin>,
    _guard: OwnedMutexGuard<()>,
}

/// Picks the coins a spend draws from.
///
/// Selectors sharing one lock hand out one [`Selection`] at a time, so two
/// spends can't both pick a coin before either is pending.
pub struct CoinSelector<S> {
    services: Arc<S>,
    lock: Arc<Mutex<()>>,
    wallet_id: u32,
}

impl<S: CoinStore> CoinSelector<S> {
    pub fn new(services: Arc<S>, lock: Arc<Mutex<()>>, wallet_id: u32) -> Self {
        Self {
            services,
            lock,
            wallet_id,
        }
    }

    /// Oldest coins first, until `amount` is covered. The first coin returned
    /// is the one a spend builder makes the auditor.
    pub async fn select(&self, amount: u64) -> Result<Selection> {
        if amount == 0 {
            return Err(WalletError::ZeroAmount);
        }
        let guard = Arc::clone(&self.lock).lock_owned().await;

        let spendable = self.services.unconfirmed_spendable(self.wallet_id).await?;
        if amount > spendable {
            return Err(WalletError::NotEnoughFunds {
                requested: amount,
                spendable,
            });
        }

        let mut records = self.services.spendable_coin_records(self.wallet_id).await?;
        records.sort_by_key(|record| record.confirmed_block_index);
        let pending = self.services.pending_removals(self.wallet_id).await?;

        let mut selected = Vec::new();
        let mut sum = 0_u64;
        for record in records {
            if sum >= amount {
                break;
            }
            let coin_id = record.coin.coin_id();
            if record.spent || pending.contains(&coin_id) {
                continue;
            }
            sum = sum.saturating_add(record.coin.amount);
            log::info!(
                "selected coin {coin_id} of {} for wallet {}",
                record.coin.amount,
                self.wallet_id
            );
            selected.push(record.coin);
        }

        if sum < amount {
            return Err(WalletError::Contention {
                requested: amount,
                selected: sum,
            });
        }
        Ok(Selection {
            coins: selected,
            _guard: guard,
        })
    }
}
