// node/src/runtime.rs
use crate::NodeConfig;
use agent_world::{SharedWorld, World};
use ledger_core::{
    ChainInfo, ChainStore, ChainViolation, Difficulty, Ledger, MineOutcome, Miner, TxId, TxKind,
};
use rpc::{RpcConfig as RpcCfg, RpcMethods, RpcServer};
use std::future::Future;
use std::sync::Arc;

/// Service context owning the ledger, the world and the miner
pub struct Node {
    config: NodeConfig,
    ledger: Arc<Ledger>,
    world: Arc<SharedWorld>,
    miner: Miner,
}

impl Node {
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        tracing::info!("Initializing node components");

        std::fs::create_dir_all(&config.data_dir)?;

        let store = ChainStore::new(config.chain_path());
        let ledger = Arc::new(Ledger::open(
            store,
            config.ledger.difficulty,
            config.ledger.target_scheme,
        )?);
        let info = ledger.info()?;
        tracing::info!(
            "✓ Ledger ready: height={}, difficulty={}, scheme={}",
            info.height,
            info.difficulty,
            info.target_scheme
        );

        let world = World::load(&config.world_path())?.unwrap_or_default();
        tracing::info!("✓ World ready: {} agents", world.graph().len());

        let miner = Miner::new(config.ledger.miner_config());

        Ok(Self {
            config,
            ledger,
            world: Arc::new(SharedWorld::new(world)),
            miner,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn world(&self) -> &Arc<SharedWorld> {
        &self.world
    }

    /// Runs the HTTP API (when enabled) until `shutdown` resolves
    pub async fn start<F>(self: Arc<Self>, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Starting LivingOS ledger node");

        if !self.config.rpc.enabled {
            tracing::info!("HTTP API disabled");
            shutdown.await;
            return Ok(());
        }

        let methods = RpcMethods::new(
            self.ledger.clone(),
            self.world.clone(),
            self.miner.clone(),
            self.config.world_path(),
            self.config.ledger.default_max_iters,
        );
        let rpc_config = RpcCfg {
            listen_addr: self.config.rpc.listen_addr,
            cors_origins: self.config.rpc.cors_origins.clone(),
        };
        let server = Arc::new(RpcServer::new(rpc_config, methods));
        server.start(shutdown).await?;

        Ok(())
    }

    pub fn info(&self) -> anyhow::Result<ChainInfo> {
        Ok(self.ledger.info()?)
    }

    pub fn validate(&self) -> anyhow::Result<Vec<ChainViolation>> {
        Ok(self.ledger.validate()?)
    }

    pub fn submit(&self, kind: TxKind, payload: &serde_json::Value) -> anyhow::Result<TxId> {
        Ok(self.ledger.submit(kind, payload)?)
    }

    /// One bounded search against the current world state
    pub fn mine(
        &self,
        max_iters: Option<u64>,
        difficulty: Option<Difficulty>,
    ) -> anyhow::Result<MineOutcome> {
        let max_iters = max_iters.unwrap_or(self.config.ledger.default_max_iters);
        Ok(self
            .miner
            .mine_once(&self.ledger, self.world.as_ref(), max_iters, difficulty)?)
    }
}
