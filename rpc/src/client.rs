//! HTTP JSON client for a ledger node's RPC port.

use std::time::Duration;

use async_trait::async_trait;
use nanomock_types::{Account, BlockHash, JsonBlock, PrivateKey, Seed};
use nanomock_work::Difficulty;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::trace;

use crate::contract::{
    AccountBalance, AccountInfo, ActiveDifficulty, BlockCreateRequest, CreatedBlock, LedgerRpc,
};
use crate::RpcError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to one node, e.g. `http://127.0.0.1:45000`.
///
/// Every request is a POST of a JSON object carrying an `"action"` field. A
/// response with an `"error"` field, or without the fields an action
/// promises, is a failed call.
#[derive(Clone)]
pub struct NodeRpc {
    http: reqwest::Client,
    url: String,
    auth: Option<(String, String)>,
}

#[derive(Deserialize)]
struct ProcessResponse {
    hash: BlockHash,
}

#[derive(Deserialize)]
struct WalletCreateResponse {
    wallet: String,
}

#[derive(Deserialize)]
struct WalletAddResponse {
    account: Account,
}

#[derive(Deserialize)]
struct ActiveDifficultyResponse {
    network_current: String,
    network_receive_current: String,
    network_minimum: String,
}

impl NodeRpc {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            auth: None,
        })
    }

    /// Send HTTP basic auth with every request.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `{"action": action, ..params}` and return the response object.
    pub async fn call(&self, action: &str, params: Value) -> Result<Value, RpcError> {
        let mut body = params;
        body.as_object_mut()
            .ok_or_else(|| RpcError::Transport("params must be a JSON object".into()))?
            .insert("action".to_string(), json!(action));

        trace!(action, url = %self.url, "rpc request");
        let mut request = self.http.post(&self.url).json(&body);
        if let Some((user, password)) = &self.auth {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Transport(format!("{action} timed out: {e}"))
            } else {
                RpcError::Transport(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(RpcError::Status(response.status().as_u16()));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| RpcError::invalid(action, e))?;

        if let Some(err) = json.get("error") {
            let message = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
            return Err(RpcError::Node(message));
        }
        Ok(json)
    }

    async fn call_typed<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<T, RpcError> {
        let json = self.call(action, params).await?;
        serde_json::from_value(json).map_err(|e| RpcError::invalid(action, e))
    }
}

#[async_trait]
impl LedgerRpc for NodeRpc {
    async fn account_info(&self, account: &Account) -> Result<Option<AccountInfo>, RpcError> {
        let params = json!({ "account": account, "representative": "true" });
        match self.call_typed("account_info", params).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.is_account_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn account_balance(&self, account: &Account) -> Result<AccountBalance, RpcError> {
        self.call_typed("account_balance", json!({ "account": account }))
            .await
    }

    async fn block_create(&self, request: &BlockCreateRequest<'_>) -> Result<CreatedBlock, RpcError> {
        let params = json!({
            "json_block": "true",
            "type": JsonBlock::STATE,
            "balance": request.balance,
            "key": request.key.encode_hex(),
            "representative": request.representative,
            "link": request.link,
            "previous": request.previous,
        });
        self.call_typed("block_create", params).await
    }

    async fn process(&self, block: &JsonBlock) -> Result<BlockHash, RpcError> {
        let mut params = json!({ "json_block": "true" });
        if let Some(subtype) = block.subtype {
            params["subtype"] = json!(subtype);
        }
        let mut wire = block.clone();
        wire.subtype = None;
        params["block"] = serde_json::to_value(&wire).map_err(|e| RpcError::invalid("process", e))?;

        let response: ProcessResponse = self.call_typed("process", params).await?;
        Ok(response.hash)
    }

    async fn active_difficulty(&self) -> Result<ActiveDifficulty, RpcError> {
        let response: ActiveDifficultyResponse =
            self.call_typed("active_difficulty", json!({})).await?;
        let parse = |value: &str| -> Result<Difficulty, RpcError> {
            value
                .parse()
                .map_err(|e| RpcError::invalid("active_difficulty", e))
        };
        Ok(ActiveDifficulty {
            network_current: parse(&response.network_current)?,
            network_receive_current: parse(&response.network_receive_current)?,
            network_minimum: parse(&response.network_minimum)?,
        })
    }

    async fn wallet_create(&self, seed: Option<&Seed>) -> Result<String, RpcError> {
        let params = match seed {
            Some(seed) => json!({ "seed": seed.encode_hex() }),
            None => json!({}),
        };
        let response: WalletCreateResponse = self.call_typed("wallet_create", params).await?;
        Ok(response.wallet)
    }

    async fn wallet_add(&self, wallet: &str, key: &PrivateKey) -> Result<Account, RpcError> {
        let params = json!({ "wallet": wallet, "key": key.encode_hex() });
        let response: WalletAddResponse = self.call_typed("wallet_add", params).await?;
        Ok(response.account)
    }
}
