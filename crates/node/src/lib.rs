// node/src/lib.rs
pub mod config;
pub mod runtime;

pub use config::{LedgerConfig, NodeConfig, RpcConfig};
pub use runtime::Node;
