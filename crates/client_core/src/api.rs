use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use shared::{
    error::ServerErrorBody,
    protocol::{ChatRequest, ExamResultSubmission, StrategyResultSubmission, UserProfileDraft},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Timeout budget for plain data endpoints.
pub const DATA_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout budget for generation-backed endpoints, which are slow.
pub const AI_TIMEOUT: Duration = Duration::from_secs(130);

#[derive(Debug, Error)]
pub enum ApiCallError {
    /// The request never produced a response (connection refused, timeout,
    /// interrupted body).
    #[error("no response received from server")]
    NoResponse(#[source] reqwest::Error),
    /// The server answered with a failure status; `message` carries whatever
    /// human-readable text its error envelope exposed.
    #[error("{message}")]
    Server { status: StatusCode, message: String },
}

impl ApiCallError {
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiCallError::Server { message, .. } => Some(message),
            ApiCallError::NoResponse(_) => None,
        }
    }
}

/// The request capability the session store orchestrates. One method per
/// logical backend endpoint; every response body is handed back as a loose
/// `Value` for the normalizer to interpret.
#[async_trait]
pub trait ReadingApi: Send + Sync {
    async fn get_introduction(&self) -> Result<Value, ApiCallError>;
    async fn get_self_rate_items(&self) -> Result<Value, ApiCallError>;
    async fn create_user_profile(&self, draft: &UserProfileDraft) -> Result<Value, ApiCallError>;
    async fn get_exam(&self, exam_id: i64) -> Result<Value, ApiCallError>;
    async fn get_strategies(&self) -> Result<Value, ApiCallError>;
    async fn submit_exam_result(
        &self,
        result: &ExamResultSubmission,
    ) -> Result<Value, ApiCallError>;
    async fn submit_strategy_result(
        &self,
        result: &StrategyResultSubmission,
    ) -> Result<Value, ApiCallError>;
    async fn get_user_profile(&self, name: &str) -> Result<Value, ApiCallError>;
    async fn analyze_profile(&self, name: &str) -> Result<Value, ApiCallError>;
    async fn analyze_wrong_answers(&self, name: &str) -> Result<Value, ApiCallError>;
    async fn suggest_strategies(&self, name: &str) -> Result<Value, ApiCallError>;
    async fn chat(&self, request: &ChatRequest) -> Result<Value, ApiCallError>;
    async fn get_final_summary(&self, name: &str) -> Result<Value, ApiCallError>;
}

/// Reqwest-backed implementation with two independently configured clients:
/// a short-timeout one for data fetches and a long-timeout one for AI calls.
pub struct HttpReadingApi {
    base_url: String,
    data: Client,
    ai: Client,
}

impl HttpReadingApi {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::with_timeouts(base_url, DATA_TIMEOUT, AI_TIMEOUT)
    }

    pub fn with_timeouts(
        base_url: &str,
        data_timeout: Duration,
        ai_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("invalid base url '{base_url}'"))?;
        let base_url = parsed.as_str().trim_end_matches('/').to_string();
        let data = Client::builder()
            .timeout(data_timeout)
            .build()
            .context("failed to build data http client")?;
        let ai = Client::builder()
            .timeout(ai_timeout)
            .build()
            .context("failed to build ai http client")?;
        Ok(Self { base_url, data, ai })
    }

    async fn get_json(&self, client: &Client, path: &str) -> Result<Value, ApiCallError> {
        debug!(path, "api request");
        let response = client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(ApiCallError::NoResponse)?;
        Self::decode(path, response).await
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        client: &Client,
        path: &str,
        body: &T,
    ) -> Result<Value, ApiCallError> {
        debug!(path, "api request");
        let response = client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(ApiCallError::NoResponse)?;
        Self::decode(path, response).await
    }

    async fn decode(path: &str, response: Response) -> Result<Value, ApiCallError> {
        let status = response.status();
        let text = response.text().await.map_err(ApiCallError::NoResponse)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ServerErrorBody>(&text)
                .ok()
                .and_then(ServerErrorBody::into_message)
                .unwrap_or_else(|| format!("服务器返回错误状态 {status}"));
            debug!(path, %status, message, "api error response");
            return Err(ApiCallError::Server { status, message });
        }

        // Some historical server dialects answer with plain text; keep those
        // payloads alive as raw string values for the normalizer.
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[async_trait]
impl ReadingApi for HttpReadingApi {
    async fn get_introduction(&self) -> Result<Value, ApiCallError> {
        self.get_json(&self.data, "/introduction").await
    }

    async fn get_self_rate_items(&self) -> Result<Value, ApiCallError> {
        self.get_json(&self.data, "/self-rate").await
    }

    async fn create_user_profile(&self, draft: &UserProfileDraft) -> Result<Value, ApiCallError> {
        self.post_json(&self.data, "/user-profile", draft).await
    }

    async fn get_exam(&self, exam_id: i64) -> Result<Value, ApiCallError> {
        self.get_json(&self.data, &format!("/exam/{exam_id}")).await
    }

    async fn get_strategies(&self) -> Result<Value, ApiCallError> {
        self.get_json(&self.data, "/strategies").await
    }

    async fn submit_exam_result(
        &self,
        result: &ExamResultSubmission,
    ) -> Result<Value, ApiCallError> {
        self.post_json(&self.data, "/exam-result", result).await
    }

    async fn submit_strategy_result(
        &self,
        result: &StrategyResultSubmission,
    ) -> Result<Value, ApiCallError> {
        self.post_json(&self.data, "/strategy-result", result).await
    }

    async fn get_user_profile(&self, name: &str) -> Result<Value, ApiCallError> {
        self.get_json(&self.data, &format!("/user/{name}")).await
    }

    async fn analyze_profile(&self, name: &str) -> Result<Value, ApiCallError> {
        self.get_json(&self.ai, &format!("/analyze-profile/{name}"))
            .await
    }

    async fn analyze_wrong_answers(&self, name: &str) -> Result<Value, ApiCallError> {
        self.get_json(&self.ai, &format!("/analyze-wrong-answers/{name}"))
            .await
    }

    async fn suggest_strategies(&self, name: &str) -> Result<Value, ApiCallError> {
        self.get_json(&self.ai, &format!("/suggest-strategies/{name}"))
            .await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<Value, ApiCallError> {
        self.post_json(&self.ai, "/chat", request).await
    }

    async fn get_final_summary(&self, name: &str) -> Result<Value, ApiCallError> {
        self.get_json(&self.ai, &format!("/final-summary/{name}"))
            .await
    }
}
