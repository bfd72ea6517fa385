// rpc/src/methods.rs
use crate::fcp::{fcp_parse, FcpMessage};
use crate::{
    FcpRequest, FcpResponse, HealthResponse, ImportResponse, MineRequest, MineResponse, RpcError,
    RpcResult, ValidateResponse, VersionResponse,
};
use agent_world::{ImportPayload, SharedWorld, WorldState};
use ledger_core::{Block, ChainInfo, Ledger, MineOutcome, Miner, TxKind};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const SERVICE_NAME: &str = "LivingOS";

/// Handlers behind the HTTP routes.
///
/// Every world-mutating action is recorded as exactly one pending
/// transaction of the matching kind.
pub struct RpcMethods {
    ledger: Arc<Ledger>,
    world: Arc<SharedWorld>,
    miner: Miner,
    state_path: PathBuf,
    default_max_iters: u64,
    /// Held for the whole search so only one block is mined at a time
    mining: Mutex<()>,
}

impl RpcMethods {
    pub fn new(
        ledger: Arc<Ledger>,
        world: Arc<SharedWorld>,
        miner: Miner,
        state_path: impl Into<PathBuf>,
        default_max_iters: u64,
    ) -> Self {
        Self {
            ledger,
            world,
            miner,
            state_path: state_path.into(),
            default_max_iters,
            mining: Mutex::new(()),
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn world(&self) -> &Arc<SharedWorld> {
        &self.world
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    // ==================== SERVICE ====================

    pub fn health(&self) -> HealthResponse {
        HealthResponse { ok: true }
    }

    pub fn version(&self) -> VersionResponse {
        VersionResponse {
            name: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    // ==================== WORLD ====================

    /// Current world state; the state file is written on first access
    pub fn state(&self) -> RpcResult<WorldState> {
        if !self.state_path.is_file() {
            self.export()?;
        }
        Ok(self.world.read(|w| w.state())?)
    }

    fn export(&self) -> RpcResult<WorldState> {
        Ok(self.world.read(|w| w.export_state(&self.state_path))??)
    }

    /// Queue the transaction for a change already applied to the world,
    /// then refresh the state file. A failed refresh is only logged.
    fn record(&self, kind: TxKind, payload: &Value) -> RpcResult<()> {
        self.ledger.submit(kind, payload)?;
        if let Err(e) = self.export() {
            tracing::warn!(
                path = %self.state_path.display(),
                "{} recorded but state file not written: {}",
                kind,
                e
            );
        }
        Ok(())
    }

    /// Executes one FCP message. Failures are reported in an `ERR` reply.
    pub fn fcp(&self, body: &[u8]) -> FcpResponse {
        let request: FcpRequest = serde_json::from_slice(body).unwrap_or_default();
        let reply = match fcp_parse(&request.msg).and_then(|msg| self.dispatch_fcp(&msg)) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!("fcp request failed: {}", e);
                FcpMessage::new("ERR").arg("reason", e)
            }
        };
        FcpResponse { resp: reply.pack() }
    }

    fn dispatch_fcp(&self, msg: &FcpMessage) -> RpcResult<FcpMessage> {
        match msg.op.as_str() {
            "T" => {
                let text = msg.get("text").unwrap_or_default();
                let x = msg.get_f64("x")?;
                let y = msg.get_f64("y")?;
                let d = self.world.write(|w| w.ingest_text(text, x, y))?;

                let mut payload = json!({ "text": text, "d": d });
                if let Some(x) = x {
                    payload["x"] = json!(x);
                }
                if let Some(y) = y {
                    payload["y"] = json!(y);
                }
                self.record(TxKind::Add, &payload)?;
                Ok(FcpMessage::new("OK").arg("d", d))
            }
            "M" => {
                let a = msg.require("a")?;
                let b = msg.require("b")?;
                let mix = msg.get_f64("mix")?.unwrap_or(0.5);
                let d = self.world.write(|w| w.merge(a, b, mix))??;
                self.record(TxKind::Merge, &json!({ "a": a, "b": b, "mix": mix, "d": d }))?;
                Ok(FcpMessage::new("OK").arg("d", d))
            }
            "E" => {
                self.export()?;
                let path = self.state_path.display().to_string();
                self.ledger.submit(TxKind::Export, &json!({ "path": path }))?;
                Ok(FcpMessage::new("OK").arg("path", path))
            }
            "CLR" => {
                self.world.write(|w| w.clear())?;
                self.record(TxKind::Clear, &json!({}))?;
                Ok(FcpMessage::new("OK").arg("cleared", 1))
            }
            op => Err(RpcError::BadMessage(format!("unknown op {op}"))),
        }
    }

    /// Replaces the world with the posted state
    pub fn import(&self, body: &[u8]) -> RpcResult<ImportResponse> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| RpcError::ParseError(e.to_string()))?;
        let payload = ImportPayload::from_value(value)?;
        let nodes = self.world.write(|w| w.import_state(payload))??;
        self.record(TxKind::Import, &json!({ "nodes": nodes }))?;
        Ok(ImportResponse {
            ok: true,
            nodes: Some(nodes),
            error: None,
        })
    }

    // ==================== CHAIN ====================

    pub fn chain_info(&self) -> RpcResult<ChainInfo> {
        Ok(self.ledger.info()?)
    }

    pub fn blocks(&self) -> RpcResult<Vec<Block>> {
        Ok(self.ledger.blocks()?)
    }

    pub fn validate(&self) -> RpcResult<ValidateResponse> {
        let violations = self.ledger.validate()?;
        Ok(ValidateResponse {
            valid: violations.is_empty(),
            violations,
        })
    }

    /// Runs one bounded search on the blocking pool
    pub async fn mine(&self, body: &[u8]) -> RpcResult<MineResponse> {
        let request: MineRequest = if body.is_empty() {
            MineRequest::default()
        } else {
            serde_json::from_slice(body).map_err(|e| RpcError::ParseError(e.to_string()))?
        };
        let max_iters = request.max_iters.unwrap_or(self.default_max_iters);

        let _guard = self.mining.lock().await;
        let ledger = self.ledger.clone();
        let world = self.world.clone();
        let miner = self.miner.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            miner.mine_once(&ledger, world.as_ref(), max_iters, request.difficulty)
        })
        .await
        .map_err(|e| RpcError::InternalError(e.to_string()))??;

        let info = self.ledger.info()?;
        let response = match outcome {
            MineOutcome::Mined(block) => MineResponse {
                mined: true,
                block: Some(block),
                attempts: None,
                reason: None,
                info,
            },
            MineOutcome::Exhausted { attempts } => MineResponse {
                mined: false,
                block: None,
                attempts: Some(attempts),
                reason: Some("nonce budget exhausted".into()),
                info,
            },
            MineOutcome::NothingPending => MineResponse {
                mined: false,
                block: None,
                attempts: None,
                reason: Some("nothing pending".into()),
                info,
            },
        };
        Ok(response)
    }
}
