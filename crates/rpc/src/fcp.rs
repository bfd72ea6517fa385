// rpc/src/fcp.rs
//! `fcp://OP|k=v;k=v` messages exchanged with world clients

use crate::{RpcError, RpcResult};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub const FCP_PREFIX: &str = "fcp://";

/// Characters left as-is in values; everything else is percent-encoded
const VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Parsed message. Arguments keep their wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcpMessage {
    pub op: String,
    pub args: Vec<(String, String)>,
}

impl FcpMessage {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push((key.into(), value.to_string()));
        self
    }

    /// Last value given for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn require(&self, key: &str) -> RpcResult<&str> {
        self.get(key)
            .ok_or_else(|| RpcError::BadMessage(format!("missing argument '{key}'")))
    }

    /// Optional float argument; `nan` and infinities are refused
    pub fn get_f64(&self, key: &str) -> RpcResult<Option<f64>> {
        self.get(key)
            .map(|v| match v.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(n),
                _ => Err(RpcError::BadMessage(format!("'{key}' is not a number: {v}"))),
            })
            .transpose()
    }

    /// Wire form with a trailing `t=<unix seconds>`
    pub fn pack_at(&self, unix_secs: i64) -> String {
        let mut parts: Vec<String> = self
            .args
            .iter()
            .map(|(k, v)| format!("{}={}", k, utf8_percent_encode(v, VALUE)))
            .collect();
        parts.push(format!("t={unix_secs}"));
        format!("{}{}|{}", FCP_PREFIX, self.op, parts.join(";"))
    }

    pub fn pack(&self) -> String {
        self.pack_at(chrono::Utc::now().timestamp())
    }
}

/// Builds a reply stamped with the current time
pub fn fcp_pack(op: &str, args: &[(&str, String)]) -> String {
    args.iter()
        .fold(FcpMessage::new(op), |msg, (k, v)| msg.arg(*k, v))
        .pack()
}

pub fn fcp_parse(msg: &str) -> RpcResult<FcpMessage> {
    let body = msg
        .strip_prefix(FCP_PREFIX)
        .ok_or_else(|| RpcError::BadMessage("bad fcp message".into()))?;
    let (head, payload) = body
        .split_once('|')
        .ok_or_else(|| RpcError::BadMessage("bad fcp message".into()))?;

    let args = payload
        .split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.to_string(), percent_decode_str(v).decode_utf8_lossy().into_owned()))
        .collect();

    Ok(FcpMessage {
        op: head.trim().to_string(),
        args,
    })
}
