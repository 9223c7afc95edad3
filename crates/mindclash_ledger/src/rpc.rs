//! # Ledger RPC
//!
//! The read seam: a trait for point-in-time account reads plus the
//! production HTTP JSON-RPC implementation. Provider throttling (HTTP 429
//! or a JSON-RPC throttle error) is classified as rate-limited so the
//! limiter can retry it; everything else surfaces as-is.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};

use mindclash_core::{Address, Throttled};

use crate::layout::{AccountKind, LayoutError};

/// Errors from the read path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    /// The HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider signaled throttling. Retried by the limiter.
    #[error("provider rate limited: {0}")]
    RateLimited(String),

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    BadResponse(String),

    /// A required account does not exist.
    #[error("account not found: {0}")]
    NotFound(String),

    /// The provider returned a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Provider message.
        message: String,
    },

    /// A fetched account did not match its fixed layout.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Input validation failed before any network call.
    #[error(transparent)]
    Core(#[from] mindclash_core::CoreError),
}

impl Throttled for RpcError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// A raw account as returned by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAccount {
    /// The program that currently holds the account. Changes to the
    /// delegation program while a warrior is handed off.
    pub authority: Address,
    /// Raw payload bytes.
    pub data: Vec<u8>,
    /// Lamport balance of the account itself.
    pub lamports: u64,
}

/// Point-in-time reads against the ledger.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Fetches one account's raw bytes, or `None` when it does not exist.
    async fn get_account(&self, address: &Address) -> Result<Option<RawAccount>, RpcError>;

    /// Enumerates accounts of one shape held by `owner_program`, matched
    /// by discriminator prefix.
    async fn get_program_accounts(
        &self,
        owner_program: &Address,
        kind: AccountKind,
    ) -> Result<Vec<(Address, RawAccount)>, RpcError>;

    /// Fetches a wallet's lamport balance.
    async fn get_balance(&self, address: &Address) -> Result<u64, RpcError>;
}

/// Production JSON-RPC-over-HTTP implementation.
pub struct HttpLedgerRpc {
    client: reqwest::Client,
    url: String,
    commitment: String,
}

impl HttpLedgerRpc {
    /// Creates a client against the given endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>, commitment: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            commitment: commitment.into(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if response.status().as_u16() == 429 {
            return Err(RpcError::RateLimited("http 429".to_string()));
        }
        if !response.status().is_success() {
            return Err(RpcError::Transport(format!("http {}", response.status())));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| RpcError::BadResponse(e.to_string()))?;

        if let Some(err) = payload.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            // Some providers signal throttling inside the RPC envelope.
            if code == 429 || message.to_ascii_lowercase().contains("too many requests") {
                return Err(RpcError::RateLimited(message));
            }
            return Err(RpcError::Rpc { code, message });
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::BadResponse("missing result".to_string()))
    }

    fn parse_account(value: &Value) -> Result<RawAccount, RpcError> {
        let data_b64 = value
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::BadResponse("missing account data".to_string()))?;
        let data = BASE64
            .decode(data_b64)
            .map_err(|e| RpcError::BadResponse(format!("account data base64: {e}")))?;

        let authority = value
            .get("owner")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::BadResponse("missing account owner".to_string()))?
            .parse::<Address>()
            .map_err(|e| RpcError::BadResponse(e.to_string()))?;

        let lamports = value
            .get("lamports")
            .and_then(Value::as_u64)
            .unwrap_or_default();

        Ok(RawAccount {
            authority,
            data,
            lamports,
        })
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn get_account(&self, address: &Address) -> Result<Option<RawAccount>, RpcError> {
        let result = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.commitment },
                ]),
            )
            .await?;

        match result.get("value") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(Self::parse_account(value)?)),
        }
    }

    async fn get_program_accounts(
        &self,
        owner_program: &Address,
        kind: AccountKind,
    ) -> Result<Vec<(Address, RawAccount)>, RpcError> {
        let disc = bs58::encode(kind.discriminator()).into_string();
        let result = self
            .call(
                "getProgramAccounts",
                json!([
                    owner_program.to_string(),
                    {
                        "encoding": "base64",
                        "commitment": self.commitment,
                        "filters": [ { "memcmp": { "offset": 0, "bytes": disc } } ],
                    },
                ]),
            )
            .await?;

        let entries = result
            .as_array()
            .ok_or_else(|| RpcError::BadResponse("expected account list".to_string()))?;

        let mut accounts = Vec::with_capacity(entries.len());
        for entry in entries {
            let address = entry
                .get("pubkey")
                .and_then(Value::as_str)
                .ok_or_else(|| RpcError::BadResponse("missing pubkey".to_string()))?
                .parse::<Address>()
                .map_err(|e| RpcError::BadResponse(e.to_string()))?;
            let account = entry
                .get("account")
                .ok_or_else(|| RpcError::BadResponse("missing account".to_string()))?;
            accounts.push((address, Self::parse_account(account)?));
        }
        Ok(accounts)
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, RpcError> {
        let result = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": self.commitment }]),
            )
            .await?;
        result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| RpcError::BadResponse("missing balance value".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_classification() {
        assert!(RpcError::RateLimited("429".to_string()).is_rate_limited());
        assert!(!RpcError::Transport("reset".to_string()).is_rate_limited());
        assert!(!RpcError::Rpc {
            code: -32602,
            message: "bad params".to_string()
        }
        .is_rate_limited());
    }

    #[test]
    fn test_parse_account_value() {
        let value = json!({
            "data": [BASE64.encode([1u8, 2, 3]), "base64"],
            "owner": Address::repeat_byte(7).to_string(),
            "lamports": 5_000u64,
        });
        let account = HttpLedgerRpc::parse_account(&value).unwrap();
        assert_eq!(account.data, vec![1, 2, 3]);
        assert_eq!(account.authority, Address::repeat_byte(7));
        assert_eq!(account.lamports, 5_000);
    }

    #[test]
    fn test_parse_account_rejects_bad_base64() {
        let value = json!({
            "data": ["!!not-base64!!", "base64"],
            "owner": Address::repeat_byte(7).to_string(),
        });
        assert!(matches!(
            HttpLedgerRpc::parse_account(&value),
            Err(RpcError::BadResponse(_))
        ));
    }
}
