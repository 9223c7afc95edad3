//! # Socket Protocol
//!
//! JSON-RPC framing over the persistent socket. Outbound: the
//! log-subscription request and a lightweight liveness probe. Inbound:
//! subscription confirmations, error envelopes, log notifications, and
//! account notifications from the program watcher.

use serde_json::{json, Value};

use mindclash_core::Address;

/// Builds the log-subscription request for the target program.
#[must_use]
pub fn subscribe_request(id: u64, program_id: &Address, commitment: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "logsSubscribe",
        "params": [
            { "mentions": [program_id.to_string()] },
            { "commitment": commitment },
        ],
    })
    .to_string()
}

/// Builds the account watcher subscription for one room account.
#[must_use]
pub fn account_subscribe_request(id: u64, account: &Address, commitment: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "accountSubscribe",
        "params": [
            account.to_string(),
            { "encoding": "base64", "commitment": commitment },
        ],
    })
    .to_string()
}

/// Builds the liveness probe.
#[must_use]
pub fn probe_request(id: u64) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "getHealth",
    })
    .to_string()
}

/// One parsed inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// The server confirmed a subscription and assigned an id.
    Confirmation {
        /// Request id this confirms.
        request: u64,
        /// Server-assigned subscription id.
        subscription: u64,
    },
    /// A liveness probe came back healthy.
    ProbeOk {
        /// Request id this answers.
        request: u64,
    },
    /// A JSON-RPC error envelope.
    Error {
        /// JSON-RPC error code.
        code: i64,
        /// Server message.
        message: String,
    },
    /// A batch of raw program log lines from one transaction.
    Logs {
        /// Originating transaction signature.
        signature: String,
        /// Raw log lines; not all of them are events.
        lines: Vec<String>,
    },
    /// A watched account changed.
    AccountUpdate {
        /// Account address when the notification carries one.
        pubkey: Option<String>,
        /// Base64 account payload.
        data: String,
    },
    /// Anything this client does not understand. Ignored.
    Unknown,
}

/// Classification of server error envelopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Provider throttling; back off and resubscribe.
    RateLimited,
    /// The subscription parameters were rejected; fatal for this
    /// subscription.
    InvalidParams,
    /// Server-side fault; force a reconnect.
    Internal,
    /// Anything else; logged and ignored.
    Other,
}

/// Triage for an inbound error envelope.
#[must_use]
pub fn classify_error(code: i64, message: &str) -> ErrorKind {
    if code == 429 || message.to_ascii_lowercase().contains("too many requests") {
        return ErrorKind::RateLimited;
    }
    match code {
        -32602 => ErrorKind::InvalidParams,
        -32603 => ErrorKind::Internal,
        _ => ErrorKind::Other,
    }
}

/// Parses one inbound text frame. Never fails: frames that do not match
/// any known shape come back as [`Inbound::Unknown`].
#[must_use]
pub fn parse_inbound(text: &str) -> Inbound {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return Inbound::Unknown,
    };

    if let Some(err) = value.get("error") {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        return Inbound::Error { code, message };
    }

    match value.get("method").and_then(Value::as_str) {
        Some("logsNotification") => parse_logs(&value),
        Some("accountNotification" | "programNotification") => parse_account(&value),
        Some(_) => Inbound::Unknown,
        None => parse_response(&value),
    }
}

fn parse_response(value: &Value) -> Inbound {
    let Some(request) = value.get("id").and_then(Value::as_u64) else {
        return Inbound::Unknown;
    };
    match value.get("result") {
        Some(Value::Number(n)) => n.as_u64().map_or(Inbound::Unknown, |subscription| {
            Inbound::Confirmation {
                request,
                subscription,
            }
        }),
        Some(Value::String(s)) if s == "ok" => Inbound::ProbeOk { request },
        _ => Inbound::Unknown,
    }
}

fn parse_logs(value: &Value) -> Inbound {
    let Some(result) = value.pointer("/params/result/value") else {
        return Inbound::Unknown;
    };
    let Some(signature) = result.get("signature").and_then(Value::as_str) else {
        return Inbound::Unknown;
    };
    let lines = result
        .get("logs")
        .and_then(Value::as_array)
        .map(|logs| {
            logs.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Inbound::Logs {
        signature: signature.to_string(),
        lines,
    }
}

fn parse_account(value: &Value) -> Inbound {
    let Some(result) = value.pointer("/params/result/value") else {
        return Inbound::Unknown;
    };
    // programNotification wraps the account next to a pubkey;
    // accountNotification carries the account fields directly.
    let (pubkey, account) = match result.get("account") {
        Some(account) => (
            result.get("pubkey").and_then(Value::as_str).map(str::to_string),
            account,
        ),
        None => (None, result),
    };
    let Some(data) = account
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(Value::as_str)
    else {
        return Inbound::Unknown;
    };
    Inbound::AccountUpdate {
        pubkey,
        data: data.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_shape() {
        let program = Address::repeat_byte(5);
        let text = subscribe_request(3, &program, "confirmed");
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["method"], "logsSubscribe");
        assert_eq!(value["id"], 3);
        assert_eq!(value["params"][0]["mentions"][0], program.to_string());
        assert_eq!(value["params"][1]["commitment"], "confirmed");
    }

    #[test]
    fn test_parse_confirmation() {
        let text = r#"{"jsonrpc":"2.0","id":3,"result":991}"#;
        assert_eq!(
            parse_inbound(text),
            Inbound::Confirmation {
                request: 3,
                subscription: 991
            }
        );
    }

    #[test]
    fn test_parse_probe_ok() {
        let text = r#"{"jsonrpc":"2.0","id":8,"result":"ok"}"#;
        assert_eq!(parse_inbound(text), Inbound::ProbeOk { request: 8 });
    }

    #[test]
    fn test_parse_logs_notification() {
        let text = r#"{
            "jsonrpc": "2.0",
            "method": "logsNotification",
            "params": {
                "subscription": 991,
                "result": {
                    "value": {
                        "signature": "5xA...sig",
                        "logs": ["Program log: JoinRoom", "Program data: aGVsbG8="]
                    }
                }
            }
        }"#;
        let Inbound::Logs { signature, lines } = parse_inbound(text) else {
            panic!("expected logs");
        };
        assert_eq!(signature, "5xA...sig");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_parse_account_notification() {
        let text = r#"{
            "jsonrpc": "2.0",
            "method": "accountNotification",
            "params": {
                "result": { "value": { "data": ["AAECAw==", "base64"], "lamports": 5 } }
            }
        }"#;
        assert_eq!(
            parse_inbound(text),
            Inbound::AccountUpdate {
                pubkey: None,
                data: "AAECAw==".to_string()
            }
        );
    }

    #[test]
    fn test_parse_program_notification_has_pubkey() {
        let text = r#"{
            "jsonrpc": "2.0",
            "method": "programNotification",
            "params": {
                "result": {
                    "value": {
                        "pubkey": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin",
                        "account": { "data": ["AAECAw==", "base64"] }
                    }
                }
            }
        }"#;
        let Inbound::AccountUpdate { pubkey, data } = parse_inbound(text) else {
            panic!("expected account update");
        };
        assert_eq!(pubkey.as_deref(), Some("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"));
        assert_eq!(data, "AAECAw==");
    }

    #[test]
    fn test_error_triage() {
        assert_eq!(classify_error(429, "slow down"), ErrorKind::RateLimited);
        assert_eq!(classify_error(-32000, "Too Many Requests"), ErrorKind::RateLimited);
        assert_eq!(classify_error(-32602, "invalid params"), ErrorKind::InvalidParams);
        assert_eq!(classify_error(-32603, "internal error"), ErrorKind::Internal);
        assert_eq!(classify_error(-32601, "method not found"), ErrorKind::Other);
    }

    #[test]
    fn test_garbage_is_unknown() {
        assert_eq!(parse_inbound("not json"), Inbound::Unknown);
        assert_eq!(parse_inbound("{}"), Inbound::Unknown);
        assert_eq!(parse_inbound(r#"{"id":"x","result":true}"#), Inbound::Unknown);
    }
}
