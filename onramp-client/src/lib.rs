//! # On-Ramp Client SDK
//!
//! A typed Rust client for the on-ramp API. It can play the bank's side
//! (`notify`) as well as drive the admin routes.

use onramp_types::security::{SIGNATURE_HEADER, sign_payload};
use onramp_types::{
    BalanceResponse, InitiateOnRampRequest, OnRampResponse, WebhookAck, WebhookPayload,
};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

/// On-ramp API client.
pub struct OnRampClient {
    base_url: String,
    admin_key: Option<String>,
    webhook_secret: Option<String>,
    http: Client,
}

impl OnRampClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin_key: None,
            webhook_secret: None,
            http: Client::new(),
        }
    }

    /// Sets the bearer key for the admin routes.
    pub fn with_admin_key(mut self, admin_key: impl Into<String>) -> Self {
        self.admin_key = Some(admin_key.into());
        self
    }

    /// Signs webhook notifications with this secret.
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self.http.get(self.endpoint(&["health"])?).send().await?;
        Ok(resp.status().is_success())
    }

    /// Delivers a payment notification the way the bank does.
    pub async fn notify(
        &self,
        token: &str,
        user_identifier: &str,
        amount: i64,
    ) -> Result<WebhookAck, ClientError> {
        let payload = WebhookPayload {
            token: token.to_string(),
            user_identifier: user_identifier.to_string(),
            amount,
        };
        let body = serde_json::to_vec(&payload)?;

        let mut req = self
            .http
            .post(self.endpoint(&["hdfcWebHook"])?)
            .header("Content-Type", "application/json");
        if let Some(secret) = &self.webhook_secret {
            req = req.header(SIGNATURE_HEADER, sign_payload(&body, secret));
        }
        let resp = req.body(body).send().await?;
        self.handle_response(resp).await
    }

    /// Records a pending deposit.
    pub async fn initiate(
        &self,
        user_id: &str,
        amount: i64,
        token: Option<String>,
    ) -> Result<OnRampResponse, ClientError> {
        let req = InitiateOnRampRequest {
            user_id: user_id.to_string(),
            amount,
            provider: "HDFC Bank".to_string(),
            token,
        };
        self.post(&["api", "onramp"], &req).await
    }

    /// Gets an on-ramp transaction by token.
    pub async fn get_onramp(&self, token: &str) -> Result<OnRampResponse, ClientError> {
        self.get(&["api", "onramp", token]).await
    }

    /// Marks a pending deposit as failed.
    pub async fn fail_onramp(&self, token: &str) -> Result<OnRampResponse, ClientError> {
        self.post(&["api", "onramp", token, "fail"], &serde_json::json!({}))
            .await
    }

    /// Gets a user's balance.
    pub async fn get_balance(&self, user_id: &str) -> Result<BalanceResponse, ClientError> {
        self.get(&["api", "balances", user_id]).await
    }

    /// Builds a URL under the base, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let mut req = self.http.get(self.endpoint(segments)?);
        if let Some(key) = &self.admin_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self.http.post(self.endpoint(segments)?).json(body);
        if let Some(key) = &self.admin_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
