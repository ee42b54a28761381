use std::sync::Arc;

use chia_cc_protocol::{CcInfo, CcParent, WalletInfo};
use chia_protocol::{Bytes32, Program};
use chia_traits::Streamable;
use tokio::sync::RwLock;

use crate::{Result, WalletStore};

/// The in-memory `CcInfo` of one wallet and the protocol for changing it.
///
/// A change derives a new value from the current one, writes it to the store
/// and only then swaps it in. The write lock is held for all three steps, so
/// mutations never interleave and a failed write leaves the old value in
/// place. Readers take a [`WalletState::snapshot`] and never block a writer
/// for longer than an `Arc` clone.
pub struct WalletState<S> {
    store: Arc<S>,
    wallet_info: RwLock<WalletInfo>,
    cc_info: RwLock<Arc<CcInfo>>,
}

impl<S: WalletStore> WalletState<S> {
    pub fn new(store: Arc<S>, wallet_info: WalletInfo, cc_info: CcInfo) -> Self {
        Self {
            store,
            wallet_info: RwLock::new(wallet_info),
            cc_info: RwLock::new(Arc::new(cc_info)),
        }
    }

    pub async fn wallet_id(&self) -> u32 {
        self.wallet_info.read().await.id
    }

    pub async fn wallet_info(&self) -> WalletInfo {
        self.wallet_info.read().await.clone()
    }

    pub async fn snapshot(&self) -> Arc<CcInfo> {
        Arc::clone(&*self.cc_info.read().await)
    }

    /// Applies `f` to the current state and persists the result. If `f`
    /// returns `None` nothing changed and nothing is written.
    pub async fn update<F>(&self, f: F) -> Result<Arc<CcInfo>>
    where
        F: FnOnce(&CcInfo) -> Option<CcInfo> + Send,
    {
        self.commit(None, f).await
    }

    async fn commit<F>(&self, rename: Option<String>, f: F) -> Result<Arc<CcInfo>>
    where
        F: FnOnce(&CcInfo) -> Option<CcInfo> + Send,
    {
        let mut current = self.cc_info.write().await;
        let next = f(&current);
        let mut wallet_info = self.wallet_info.write().await;
        let rename = rename.filter(|name| *name != wallet_info.name);
        if next.is_none() && rename.is_none() {
            return Ok(Arc::clone(&current));
        }

        let mut record = wallet_info.clone();
        if let Some(name) = rename {
            record.name = name;
        }
        if let Some(next) = &next {
            record.data = next.to_bytes()?.into();
        }
        self.store.update_wallet(record.clone()).await?;

        log::debug!("saved cc info for wallet {}", record.id);
        *wallet_info = record;
        if let Some(next) = next {
            *current = Arc::new(next);
        }
        Ok(Arc::clone(&current))
    }

    /// Renames the wallet. The colour name in the `CcInfo` and the name of
    /// the wallet record change in the same write.
    pub async fn set_name(&self, name: String) -> Result<Arc<CcInfo>> {
        let colour_name = name.clone();
        self.commit(Some(name), |info| {
            if info.my_colour_name.as_deref() == Some(colour_name.as_str()) {
                None
            } else {
                Some(info.with_name(colour_name))
            }
        })
        .await
    }

    pub async fn set_core(&self, core: Program) -> Result<Arc<CcInfo>> {
        self.update(|info| Some(info.with_core(core))).await
    }

    /// Records the lineage proof of `coin_id`. Writing the proof that is
    /// already stored is a no-op.
    pub async fn record_lineage(&self, coin_id: Bytes32, parent: CcParent) -> Result<Arc<CcInfo>> {
        self.update(|info| {
            if info.lineage(&coin_id) == Some(&parent) {
                None
            } else {
                Some(info.with_lineage(coin_id, parent))
            }
        })
        .await
    }

    pub async fn add_inner_puzzle(
        &self,
        coin_id: Bytes32,
        inner_puzzle: Program,
    ) -> Result<Arc<CcInfo>> {
        self.update(|info| {
            if info.inner_puzzle(&coin_id) == Some(&inner_puzzle) {
                None
            } else {
                Some(info.with_inner_puzzle(coin_id, inner_puzzle))
            }
        })
        .await
    }

    pub async fn remove_coin(&self, coin_id: Bytes32) -> Result<Arc<CcInfo>> {
        self.update(|info| {
            if info.lineage(&coin_id).is_none() && info.inner_puzzle(&coin_id).is_none() {
                None
            } else {
                Some(info.without_coin(&coin_id))
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_services::{TestServices, pass_through_core};
    use crate::WalletError;
    use chia_cc_protocol::WalletType;

    async fn state(services: &Arc<TestServices>) -> WalletState<TestServices> {
        let info = CcInfo::default().with_core(pass_through_core());
        let record = services
            .create_wallet(
                "cc".to_string(),
                WalletType::ColouredCoin,
                info.to_bytes().unwrap().into(),
            )
            .await
            .unwrap();
        WalletState::new(Arc::clone(services), record, info)
    }

    async fn stored(services: &TestServices, id: u32) -> CcInfo {
        let record = services.get_wallet(id).await.unwrap().unwrap();
        CcInfo::from_bytes(&record.data).unwrap()
    }

    #[tokio::test]
    async fn mutations_are_persisted() {
        let services = Arc::new(TestServices::default());
        let state = state(&services).await;
        let id = state.wallet_id().await;
        let coin_id = Bytes32::new([1; 32]);
        let parent = CcParent::new(Bytes32::new([2; 32]), Bytes32::new([3; 32]), 4);

        let info = state.record_lineage(coin_id, parent).await.unwrap();
        assert_eq!(info.lineage(&coin_id), Some(&parent));
        assert_eq!(stored(&services, id).await, *info);

        let info = state.remove_coin(coin_id).await.unwrap();
        assert_eq!(info.lineage(&coin_id), None);
        assert_eq!(stored(&services, id).await, *state.snapshot().await);
    }

    #[tokio::test]
    async fn record_lineage_is_idempotent() {
        let services = Arc::new(TestServices::default());
        let state = state(&services).await;
        let coin_id = Bytes32::new([1; 32]);
        let parent = CcParent::new(Bytes32::new([2; 32]), Bytes32::new([3; 32]), 4);

        let first = state.record_lineage(coin_id, parent).await.unwrap();
        // an unchanged entry doesn't touch the store
        services.fail_updates(true);
        let second = state.record_lineage(coin_id, parent).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failed_write_keeps_the_old_value() {
        let services = Arc::new(TestServices::default());
        let state = state(&services).await;
        let before = state.snapshot().await;

        services.fail_updates(true);
        let result = state.set_name("Marmot".to_string()).await;
        assert!(matches!(result, Err(WalletError::Service(_))));
        assert_eq!(state.snapshot().await, before);
        assert_eq!(state.wallet_info().await.name, "cc");
    }

    #[tokio::test]
    async fn rename_writes_both_names() {
        let services = Arc::new(TestServices::default());
        let state = state(&services).await;
        let id = state.wallet_id().await;

        state.set_name("Marmot".to_string()).await.unwrap();
        let record = services.get_wallet(id).await.unwrap().unwrap();
        assert_eq!(record.name, "Marmot");
        assert_eq!(
            CcInfo::from_bytes(&record.data).unwrap().my_colour_name.as_deref(),
            Some("Marmot")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_are_serialized() {
        let services = Arc::new(TestServices::default());
        let state = Arc::new(state(&services).await);

        let tasks: Vec<_> = (0_u8..16)
            .map(|i| {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let parent = CcParent::new(Bytes32::new([i; 32]), Bytes32::new([i; 32]), 1);
                    state.record_lineage(Bytes32::new([i; 32]), parent).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let info = state.snapshot().await;
        for i in 0_u8..16 {
            assert!(info.lineage(&Bytes32::new([i; 32])).is_some());
        }
        assert_eq!(stored(&services, state.wallet_id().await).await, *info);
    }
}
