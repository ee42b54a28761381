use std::sync::Arc;

use chia_cc_consensus::{ClvmEvaluator, ProgramEvaluator};
use chia_cc_protocol::{CcInfo, CcParent, SpendBundle, WalletInfo, WalletType, program_hash};
use chia_protocol::{Bytes32, Coin, Program};
use chia_traits::Streamable;
use tokio::sync::Mutex;

use crate::puzzles::{cc_make_core, cc_puzzle_hash_for_inner_puzzle_hash, genesis_lineage_proof};
use crate::{
    CoinSelector, LineageTracker, Result, Selection, SpendBuilder, WalletConstants, WalletError,
    WalletServices, WalletState,
};

/// What every coloured coin wallet of one user shares: the collaborators,
/// the coin selection lock, the evaluator and the network constants.
pub struct WalletContext<S, E = ClvmEvaluator> {
    pub services: Arc<S>,
    pub selection_lock: Arc<Mutex<()>>,
    pub evaluator: E,
    pub constants: WalletConstants,
}

impl<S> WalletContext<S> {
    pub fn new(services: Arc<S>, constants: WalletConstants) -> Self {
        Self {
            services,
            selection_lock: Arc::new(Mutex::new(())),
            evaluator: ClvmEvaluator::new(constants.clvm_flags),
            constants,
        }
    }
}

impl<S, E: Clone> Clone for WalletContext<S, E> {
    fn clone(&self) -> Self {
        Self {
            services: Arc::clone(&self.services),
            selection_lock: Arc::clone(&self.selection_lock),
            evaluator: self.evaluator.clone(),
            constants: self.constants,
        }
    }
}

/// A wallet holding coins of a single colour.
pub struct CcWallet<S, E = ClvmEvaluator> {
    services: Arc<S>,
    state: Arc<WalletState<S>>,
    lineage: LineageTracker<S, E>,
    selector: CoinSelector<S>,
    builder: SpendBuilder<S, E>,
}

impl<S, E> CcWallet<S, E>
where
    S: WalletServices,
    E: ProgramEvaluator + Clone + Send + Sync,
{
    fn from_parts(ctx: &WalletContext<S, E>, record: WalletInfo, info: CcInfo) -> Self {
        let wallet_id = record.id;
        let state = Arc::new(WalletState::new(Arc::clone(&ctx.services), record, info));
        Self {
            services: Arc::clone(&ctx.services),
            lineage: LineageTracker::new(
                Arc::clone(&ctx.services),
                Arc::clone(&state),
                ctx.evaluator.clone(),
                ctx.constants,
            ),
            selector: CoinSelector::new(
                Arc::clone(&ctx.services),
                Arc::clone(&ctx.selection_lock),
                wallet_id,
            ),
            builder: SpendBuilder::new(
                Arc::clone(&ctx.services),
                ctx.evaluator.clone(),
                ctx.constants,
                wallet_id,
            ),
            state,
        }
    }

    /// Creates a wallet for the colour defined by `core`.
    pub async fn create_new_wallet_for_colour(
        ctx: &WalletContext<S, E>,
        core: Program,
        name: String,
    ) -> Result<Self> {
        let info = CcInfo::default().with_core(core).with_name(name.clone());
        let record = ctx
            .services
            .create_wallet(name, WalletType::ColouredCoin, info.to_bytes()?.into())
            .await?;
        if let Some(colour) = info.colour_id()? {
            log::info!("created cc wallet {} for colour {colour}", record.id);
        }
        Ok(Self::from_parts(ctx, record, info))
    }

    /// Creates a wallet for a new colour and issues `amount` of it. The
    /// colour's core is `core_mod` curried with the standard coin that pays
    /// for the issuance. The returned bundle has been submitted.
    pub async fn create_new_cc(
        ctx: &WalletContext<S, E>,
        core_mod: &Program,
        amount: u64,
        name: String,
    ) -> Result<(Self, SpendBundle)> {
        if amount == 0 {
            return Err(WalletError::ZeroAmount);
        }
        let info = CcInfo::default().with_name(name.clone());
        let record = ctx
            .services
            .create_wallet(name, WalletType::ColouredCoin, info.to_bytes()?.into())
            .await?;
        let wallet = Self::from_parts(ctx, record, info);

        let bundle = wallet.generate_new_coloured_coin(core_mod, amount).await?;
        wallet.services.push_transaction(bundle.clone()).await?;
        log::info!(
            "submitted issuance bundle {} minting {amount} for wallet {}",
            bundle.name(),
            wallet.wallet_id().await
        );
        Ok((wallet, bundle))
    }

    /// Loads an existing wallet from its record.
    pub async fn create(ctx: &WalletContext<S, E>, wallet_id: u32) -> Result<Self> {
        let record = ctx
            .services
            .get_wallet(wallet_id)
            .await?
            .filter(|record| record.wallet_type == WalletType::ColouredCoin)
            .ok_or(WalletError::WalletNotFound(wallet_id))?;
        let info = CcInfo::from_bytes(&record.data)?;
        Ok(Self::from_parts(ctx, record, info))
    }

    pub async fn wallet_id(&self) -> u32 {
        self.state.wallet_id().await
    }

    pub async fn cc_info(&self) -> Arc<CcInfo> {
        self.state.snapshot().await
    }

    pub async fn get_name(&self) -> String {
        self.state.wallet_info().await.name
    }

    pub async fn set_name(&self, name: String) -> Result<()> {
        self.state.set_name(name).await?;
        Ok(())
    }

    pub async fn set_core(&self, core: Program) -> Result<()> {
        self.state.set_core(core).await?;
        Ok(())
    }

    pub async fn colour_id(&self) -> Result<Option<Bytes32>> {
        Ok(self.state.snapshot().await.colour_id()?)
    }

    pub async fn get_confirmed_balance(&self) -> Result<u64> {
        let wallet_id = self.wallet_id().await;
        Ok(self.services.confirmed_balance(wallet_id).await?)
    }

    pub async fn get_unconfirmed_balance(&self) -> Result<u64> {
        let wallet_id = self.wallet_id().await;
        Ok(self.services.unconfirmed_spendable(wallet_id).await?)
    }

    /// Derives a fresh inner puzzle and registers the coloured puzzle hash
    /// wrapping it as belonging to this wallet.
    async fn new_cc_puzzle(&self) -> Result<(Program, Bytes32, Bytes32)> {
        let wallet_id = self.wallet_id().await;
        let core_hash = self.colour_id().await?.ok_or(WalletError::NoCore)?;
        let inner_puzzle = self.services.new_inner_puzzle(wallet_id).await?;
        let inner_puzzle_hash = program_hash(&inner_puzzle)?;
        let puzzle_hash = cc_puzzle_hash_for_inner_puzzle_hash(core_hash, inner_puzzle_hash);
        self.services
            .record_puzzle_hash(wallet_id, puzzle_hash, inner_puzzle.clone())
            .await?;
        Ok((inner_puzzle, inner_puzzle_hash, puzzle_hash))
    }

    /// The inner puzzle hash a sender pays to. Coins sent to it arrive
    /// wrapped in this wallet's colour.
    pub async fn get_new_inner_hash(&self) -> Result<Bytes32> {
        Ok(self.new_cc_puzzle().await?.1)
    }

    pub async fn get_new_cc_puzzle_hash(&self) -> Result<Bytes32> {
        Ok(self.new_cc_puzzle().await?.2)
    }

    pub async fn get_lineage(&self, coin_id: Bytes32) -> Result<CcParent> {
        self.lineage.get(coin_id).await
    }

    pub async fn record_lineage(&self, coin_id: Bytes32, parent: CcParent) -> Result<()> {
        self.lineage.record_lineage(coin_id, parent).await
    }

    pub async fn record_genesis(&self, origin: &Coin, minted: &Coin) -> Result<()> {
        self.lineage.record_genesis(origin, minted).await
    }

    pub async fn coin_added(
        &self,
        coin: &Coin,
        height: u32,
        header_hash: Bytes32,
    ) -> Result<Option<u32>> {
        self.lineage.coin_added(coin, height, header_hash).await
    }

    pub async fn generator_received(&self, generator: &Program, action_id: u32) -> Result<usize> {
        self.lineage.generator_received(generator, action_id).await
    }

    /// Coins covering `amount`. Other selections sharing the lock wait until
    /// the returned selection is dropped.
    pub async fn select_coins(&self, amount: u64) -> Result<Selection> {
        self.selector.select(amount).await
    }

    /// Sends `amount` to the inner puzzle hash `destination` and submits
    /// the bundle. The change coin's lineage is recorded once the bundle has
    /// been accepted, so it can be spent without waiting for its generator.
    pub async fn cc_spend(&self, amount: u64, destination: Bytes32) -> Result<SpendBundle> {
        let selection = self.selector.select(amount).await?;
        let info = self.state.snapshot().await;
        let spend = self
            .builder
            .build(&info, &selection.coins, amount, destination)
            .await?;

        // the selected coins only show up as pending removals once pushed
        self.services.push_transaction(spend.bundle.clone()).await?;
        drop(selection);
        log::info!(
            "submitted spend bundle {} sending {amount} to {destination}",
            spend.bundle.name()
        );

        if let Some(change) = spend.change {
            let coin_id = change.coin.coin_id();
            self.state
                .update(|info| {
                    Some(
                        info.with_lineage(coin_id, change.lineage)
                            .with_inner_puzzle(coin_id, change.inner_puzzle),
                    )
                })
                .await?;
        }
        Ok(spend.bundle)
    }

    /// Sets this wallet's core to `core_mod` curried with a standard coin
    /// worth at least `amount`, and returns the bundle issuing `amount` of
    /// the new colour from it. The bundle isn't submitted.
    pub async fn generate_new_coloured_coin(
        &self,
        core_mod: &Program,
        amount: u64,
    ) -> Result<SpendBundle> {
        if amount == 0 {
            return Err(WalletError::ZeroAmount);
        }
        let coins = self.services.select_standard_coins(amount).await?;
        let origin = *coins.first().ok_or(WalletError::NotEnoughFunds {
            requested: amount,
            spendable: 0,
        })?;
        let core = cc_make_core(core_mod, origin)?;
        self.state.set_core(core).await?;
        if let Some(colour) = self.colour_id().await? {
            log::info!("issuing {amount} of colour {colour} from coin {}", origin.coin_id());
        }
        self.issue(origin, coins, amount).await
    }

    /// A bundle minting a coin of value 0 in this wallet's colour, funded by
    /// a standard coin. The bundle isn't submitted.
    pub async fn generate_zero_val_coin(&self) -> Result<SpendBundle> {
        let coins = self.services.select_standard_coins(1).await?;
        let origin = *coins.first().ok_or(WalletError::NotEnoughFunds {
            requested: 1,
            spendable: 0,
        })?;
        self.issue(origin, coins, 0).await
    }

    /// Spends `coins` so that `origin` pays an eve coin of `amount`, and
    /// spends the eve coin into a fresh coin of this wallet. Both coloured
    /// coins get their lineage recorded.
    async fn issue(&self, origin: Coin, coins: Vec<Coin>, amount: u64) -> Result<SpendBundle> {
        let origin_id = origin.coin_id();
        let (eve_inner_puzzle, eve_inner_puzzle_hash, eve_puzzle_hash) =
            self.new_cc_puzzle().await?;
        let funding = self
            .services
            .generate_signed_transaction(amount, eve_puzzle_hash, 0, origin_id, coins)
            .await?;

        let eve = Coin::new(origin_id, eve_puzzle_hash, amount);
        let eve_id = eve.coin_id();
        let eve_lineage = genesis_lineage_proof(&origin);
        let staged = self
            .state
            .snapshot()
            .await
            .with_lineage(eve_id, eve_lineage)
            .with_inner_puzzle(eve_id, eve_inner_puzzle.clone());

        let (inner_puzzle, inner_puzzle_hash, puzzle_hash) = self.new_cc_puzzle().await?;
        let spend = self
            .builder
            .build(&staged, &[eve], amount, inner_puzzle_hash)
            .await?;

        let minted = Coin::new(eve_id, puzzle_hash, amount);
        let minted_id = minted.coin_id();
        let minted_lineage = CcParent::new(origin_id, eve_inner_puzzle_hash, amount);
        self.state
            .update(|info| {
                Some(
                    info.with_lineage(eve_id, eve_lineage)
                        .with_inner_puzzle(eve_id, eve_inner_puzzle)
                        .with_lineage(minted_id, minted_lineage)
                        .with_inner_puzzle(minted_id, inner_puzzle),
                )
            })
            .await?;
        log::debug!("eve coin {eve_id} of {amount} mints coin {minted_id}");
        Ok(SpendBundle::aggregate(&[funding, spend.bundle]))
    }
}
