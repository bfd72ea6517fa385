// rpc/src/lib.rs
pub mod fcp;
pub mod methods;
pub mod server;
pub mod types;

pub use fcp::{fcp_pack, fcp_parse, FcpMessage};
pub use methods::RpcMethods;
pub use server::{RpcConfig, RpcServer};
pub use types::*;

use hyper::StatusCode;
use ledger_core::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Bad FCP message: {0}")]
    BadMessage(String),
    #[error("Route not found: {0}")]
    NotFound(String),
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("World error: {0}")]
    World(#[from] agent_world::WorldError),
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::ParseError(_)
            | RpcError::BadMessage(_)
            | RpcError::InvalidParams(_)
            | RpcError::World(agent_world::WorldError::BadImport(_))
            | RpcError::World(agent_world::WorldError::BadDescriptor(_)) => StatusCode::BAD_REQUEST,
            RpcError::Ledger(LedgerError::InvalidArgument(_))
            | RpcError::Ledger(LedgerError::MalformedTransaction(_)) => StatusCode::BAD_REQUEST,
            RpcError::Ledger(LedgerError::DuplicateTransaction(_))
            | RpcError::Ledger(LedgerError::InvalidLink { .. }) => StatusCode::CONFLICT,
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::Ledger(LedgerError::StateProvider(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
