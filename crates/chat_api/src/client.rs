use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy, StatusCode, Url};

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::events::ModelList;
use crate::headers::{build_auth_headers, build_headers};
use crate::payload::ChatRequest;
use crate::url::{chat_completions_url, models_url};

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

/// Response body as a stream of raw chunks.
pub type ReplyBody = BoxStream<'static, Result<Vec<u8>, ChatApiError>>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Status and not-yet-read body of a chat-completion response.
pub struct ChatReply {
    pub status: StatusCode,
    pub body: ReplyBody,
}

impl fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatReply")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl ChatReply {
    pub fn new(status: StatusCode, body: ReplyBody) -> Self {
        Self { status, body }
    }

    /// Reply whose body arrives as the given sequence of chunks.
    pub fn from_chunks(status: StatusCode, chunks: Vec<Result<Vec<u8>, ChatApiError>>) -> Self {
        Self::new(status, stream::iter(chunks).boxed())
    }

    /// Reply with a single-chunk body.
    pub fn from_bytes(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::from_chunks(status, vec![Ok(body.into())])
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Drain the whole body.
    pub async fn into_bytes(mut self) -> Result<Vec<u8>, ChatApiError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    /// Drain the whole body as lossily decoded text.
    pub async fn into_text(self) -> Result<String, ChatApiError> {
        let bytes = self.into_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// HTTP client for the chat-completion and model-list endpoints.
#[derive(Debug, Clone)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let endpoint = chat_completions_url(&config.base_url);
        Url::parse(&endpoint)
            .map_err(|error| ChatApiError::InvalidBaseUrl(format!("{endpoint}: {error}")))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = config
            .proxy
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            let parsed = Proxy::all(proxy)
                .map_err(|error| ChatApiError::InvalidProxy(format!("{proxy}: {error}")))?;
            tracing::info!(proxy, "using proxy");
            builder = builder.proxy(parsed);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn chat_endpoint(&self) -> String {
        chat_completions_url(&self.config.base_url)
    }

    pub fn models_endpoint(&self) -> String {
        models_url(&self.config.base_url)
    }

    pub fn build_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        let headers = header_map(build_headers(&self.config, request.is_streaming())?)?;
        Ok(self
            .http
            .post(self.chat_endpoint())
            .headers(headers)
            .json(request))
    }

    /// Issue one chat-completion request and hand back status plus body.
    ///
    /// Non-success statuses are not turned into errors here; the caller
    /// decides on recovery before reading the body.
    pub async fn send(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatReply, ChatApiError> {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        tracing::debug!(
            endpoint = %self.chat_endpoint(),
            messages = request.messages.len(),
            stream = request.is_streaming(),
            "sending chat request"
        );
        let pending = self.build_request(request)?.send();
        let response = await_or_cancel(pending, cancellation).await??;
        let status = response.status();
        tracing::debug!(%status, "chat endpoint responded");

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(ChatApiError::from)
            })
            .boxed();
        Ok(ChatReply::new(status, body))
    }

    /// Fetch the models available to this key.
    pub async fn list_models(&self) -> Result<ModelList, ChatApiError> {
        let headers = header_map(build_auth_headers(&self.config)?)?;
        let response = self
            .http
            .get(self.models_endpoint())
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ChatApiError::Status(
                status,
                parse_error_message(status, &body),
            ));
        }

        serde_json::from_str::<ModelList>(&body).map_err(|error| {
            tracing::error!(%body, "unexpected model list body");
            ChatApiError::from(error)
        })
    }
}

fn header_map(headers: BTreeMap<String, String>) -> Result<HeaderMap, ChatApiError> {
    let mut out = HeaderMap::new();
    for (key, value) in headers {
        out.insert(
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
            HeaderValue::from_str(&value)
                .map_err(|_| ChatApiError::InvalidHeader(format!("invalid value for {key}")))?,
        );
    }
    Ok(out)
}

pub fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Await `future`, polling `cancellation` while it is pending.
pub async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
