//! JSON-RPC client for the wallet daemon endpoints
//!
//! HTTP POST with basic auth and a per-call timeout. One client per endpoint:
//! the administrative ("master") RPC and each per-asset RPC get their own.
//! Every failure carries the method name so callers can say which call died.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::rpc::types::{SignedTransaction, TxInputRef, UnspentOutput};

/// Connection parameters for one RPC endpoint
#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// HTTP JSON-RPC 2.0 client
pub struct RpcClient {
    http: Client,
    endpoint: RpcEndpoint,
    next_id: AtomicU64,
}

/// JSON-RPC request envelope
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl RpcClient {
    /// Create a client for one endpoint with a per-call timeout
    pub fn new(endpoint: RpcEndpoint, timeout_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    fn url(&self) -> String {
        format!("http://{}:{}/", self.endpoint.host, self.endpoint.port)
    }

    /// Make one JSON-RPC call and deserialize the result
    pub async fn call<T: for<'de> Deserialize<'de>>(&self, method: &str, params: Value) -> Result<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        debug!(method, url = %self.url(), "rpc call");

        let response = self
            .http
            .post(self.url())
            .basic_auth(&self.endpoint.username, Some(&self.endpoint.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::RpcTimeout {
                        method: method.to_string(),
                    }
                } else {
                    Error::RpcConnection {
                        method: method.to_string(),
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // The daemon puts its JSON-RPC error object in non-200 bodies too;
            // prefer its code/message over the bare HTTP status.
            if let Ok(body) = response.json::<JsonRpcResponse<Value>>().await {
                if let Some(err) = body.error {
                    return Err(Error::RpcDaemon {
                        method: method.to_string(),
                        code: err.code,
                        message: err.message,
                    });
                }
            }
            return Err(Error::RpcHttp {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let body: JsonRpcResponse<T> = response.json().await.map_err(|e| Error::RpcMalformed {
            method: method.to_string(),
            detail: e.to_string(),
        })?;

        if let Some(err) = body.error {
            return Err(Error::RpcDaemon {
                method: method.to_string(),
                code: err.code,
                message: err.message,
            });
        }

        body.result.ok_or_else(|| Error::RpcMalformed {
            method: method.to_string(),
            detail: "missing result".into(),
        })
    }

    /// Unspent outputs held by this asset's wallet
    pub async fn list_unspent(&self) -> Result<Vec<UnspentOutput>> {
        self.call("listunspent", serde_json::json!([])).await
    }

    /// Assemble an unsigned raw transaction from selected inputs and an
    /// address→amount output map
    pub async fn create_raw_transaction(
        &self,
        inputs: &[UnspentOutput],
        outputs: &HashMap<String, Decimal>,
    ) -> Result<String> {
        let refs: Vec<TxInputRef> = inputs.iter().map(TxInputRef::from).collect();
        self.call("createrawtransaction", serde_json::json!([refs, outputs]))
            .await
    }

    /// Sign a raw transaction with the daemon's keys
    pub async fn sign_raw_transaction(&self, raw_hex: &str) -> Result<SignedTransaction> {
        self.call("signrawtransaction", serde_json::json!([raw_hex]))
            .await
    }

    /// Broadcast a signed transaction; returns the transaction id
    pub async fn send_raw_transaction(&self, signed_hex: &str) -> Result<String> {
        self.call("sendrawtransaction", serde_json::json!([signed_hex]))
            .await
    }

    /// Lightweight probe; the cheapest call the daemon answers
    pub async fn help(&self) -> Result<Value> {
        self.call("help", serde_json::json!([])).await
    }
}

// Credentials stay out of logs
impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("host", &self.endpoint.host)
            .field("port", &self.endpoint.port)
            .field("username", &self.endpoint.username)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_envelope_shape() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "listunspent",
            params: serde_json::json!([]),
            id: 7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "listunspent");
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn test_error_envelope_deserializes() {
        let raw = r#"{"result": null, "error": {"code": -32601, "message": "Method not found"}, "id": 1}"#;
        let body: JsonRpcResponse<Value> = serde_json::from_str(raw).unwrap();
        let err = body.error.unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found");
    }

    #[test]
    fn test_output_map_serializes_exact_amounts() {
        let mut outputs: HashMap<String, Decimal> = HashMap::new();
        outputs.insert("dest1".into(), dec!(9.999774));
        let json = serde_json::to_string(&serde_json::json!([outputs])).unwrap();
        assert!(json.contains("9.999774"), "lossy amount in {}", json);
    }

    #[test]
    fn test_debug_masks_password() {
        let client = RpcClient::new(
            RpcEndpoint {
                host: "127.0.0.1".into(),
                port: 19119,
                username: "user".into(),
                password: "hunter2".into(),
            },
            1000,
        )
        .unwrap();
        let dump = format!("{:?}", client);
        assert!(!dump.contains("hunter2"));
    }

    #[tokio::test]
    #[ignore = "requires a running wallet daemon RPC endpoint"]
    async fn test_live_help_probe() {
        let client = RpcClient::new(
            RpcEndpoint {
                host: "127.0.0.1".into(),
                port: 19119,
                username: "walletmux".into(),
                password: "walletmux".into(),
            },
            5_000,
        )
        .unwrap();
        assert!(client.help().await.is_ok());
    }
}
