//! HTTP implementation of [`SessionClient`] against the MediBot backend.

use crate::dto::{
    ChatRequest, ChatResponse, ClearResponse, ErrorBody, HealthResponse, SessionCreateResponse,
    SessionHistoryResponse, SessionStatusResponse,
};
use async_trait::async_trait;
use medibot_core::config::ClientConfig;
use medibot_core::conversation::{RemoteMessage, SendReply, SessionClient};
use medibot_core::error::{MedibotError, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Talks to the backend over HTTP with one bounded timeout per request.
///
/// Failures are classified as follows:
/// - no usable response (transport error, timeout, undecodable body): `Network`
/// - 404 or 410 on a session-scoped route: `SessionInvalid`
/// - any other non-2xx status, or a chat reply with `success = false`: `Server`
#[derive(Debug, Clone)]
pub struct HttpSessionClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
    max_chunks: u32,
}

impl HttpSessionClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(config.api_base_url.trim()).map_err(|e| {
            MedibotError::config(format!(
                "Invalid API base URL '{}': {}",
                config.api_base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(MedibotError::config(format!(
                "API base URL '{}' cannot carry a path",
                config.api_base_url
            )));
        }

        let http = Client::builder()
            .build()
            .map_err(|e| MedibotError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            timeout: config.request_timeout(),
            max_chunks: config.max_chunks,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Queries `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse> {
        let request = self.http.get(self.endpoint(&["health"])?);
        let response = self.execute(request, None).await?;
        decode(response).await
    }

    /// Builds `<base>/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MedibotError::config("API base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends the request and maps failure statuses to errors.
    ///
    /// `session_id` marks a session-scoped route, on which 404 and 410 mean
    /// the server no longer knows the session.
    async fn execute(&self, request: RequestBuilder, session_id: Option<&str>) -> Result<Response> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if let Some(session_id) = session_id {
            if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                return Err(MedibotError::session_invalid(session_id));
            }
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(MedibotError::server(status.as_u16(), error_message(&error_text)))
    }

    fn transport_error(&self, err: reqwest::Error) -> MedibotError {
        if err.is_timeout() {
            MedibotError::network(format!(
                "Request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            MedibotError::network(format!("Request failed: {}", err))
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| MedibotError::network(format!("Failed to parse response: {}", e)))
}

/// Extracts `detail` from a JSON error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "Unknown error".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl SessionClient for HttpSessionClient {
    async fn check_active(&self, session_id: &str) -> bool {
        let status: Result<SessionStatusResponse> = async {
            let url = self.endpoint(&["api", "sessions", session_id, "status"])?;
            let response = self.execute(self.http.get(url), Some(session_id)).await?;
            decode::<SessionStatusResponse>(response).await
        }
        .await;

        match status {
            Ok(status) => status.exists,
            Err(e) => {
                tracing::debug!("[SessionClient] Status check for {} failed: {}", session_id, e);
                false
            }
        }
    }

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<RemoteMessage>> {
        let url = self.endpoint(&["api", "sessions", session_id, "history"])?;
        let response = self.execute(self.http.get(url), Some(session_id)).await?;
        let history: SessionHistoryResponse = decode(response).await?;

        tracing::debug!(
            "[SessionClient] Fetched {} messages for session {}",
            history.messages.len(),
            session_id
        );
        Ok(history.messages)
    }

    async fn send_message(&self, session_id: Option<&str>, text: &str) -> Result<SendReply> {
        let body = ChatRequest {
            query: text.to_string(),
            session_id: session_id.map(str::to_string),
            max_chunks: self.max_chunks,
        };
        let request = self.http.post(self.endpoint(&["api", "chat"])?).json(&body);
        let response = self.execute(request, session_id).await?;
        let chat: ChatResponse = decode(response).await?;

        if !chat.success {
            return Err(MedibotError::server(
                StatusCode::OK.as_u16(),
                chat.error
                    .unwrap_or_else(|| "The server could not answer the query".to_string()),
            ));
        }
        if chat.session_id.trim().is_empty() {
            return Err(MedibotError::network("Chat response carried no session id"));
        }

        Ok(SendReply {
            response: chat.response,
            has_context: chat.conversation_context_used,
            sources: chat.sources,
            generation_time: chat.generation_time,
            session_id: chat.session_id,
        })
    }

    async fn start_new_conversation(&self) -> Result<String> {
        let request = self.http.post(self.endpoint(&["api", "sessions", "new"])?);
        let response = self.execute(request, None).await?;
        let created: SessionCreateResponse = decode(response).await?;

        if created.session_id.trim().is_empty() {
            return Err(MedibotError::network("Server returned an empty session id"));
        }
        Ok(created.session_id)
    }

    async fn clear_conversation(&self, session_id: &str) -> Result<bool> {
        let url = self.endpoint(&["api", "sessions", session_id, "messages"])?;
        let response = match self.execute(self.http.delete(url), Some(session_id)).await {
            Ok(response) => response,
            Err(e) if e.is_session_invalid() => return Ok(false),
            Err(e) => return Err(e),
        };
        let cleared: ClearResponse = decode(response).await?;
        Ok(cleared.success)
    }
}
