use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum ChatApiError {
    MissingApiKey,
    InvalidBaseUrl(String),
    InvalidHeader(String),
    InvalidProxy(String),
    Request(reqwest::Error),
    /// Transport failure reported by a non-reqwest transport.
    Connection(String),
    Status(StatusCode, String),
    MalformedFrame(String),
    MissingRole,
    EmptyChoices,
    Serde(JsonError),
    ResendExhausted {
        attempts: u32,
    },
    Cancelled,
}

impl ChatApiError {
    /// True for failures that happened before any response status was seen.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Connection(_))
    }

    /// True for violations of the response wire contract.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame(_) | Self::MissingRole | Self::EmptyChoices | Self::Serde(_)
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status, _) => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl ErrorPayloadFields {
    fn describe(&self) -> Option<String> {
        let message = self.message.as_deref().and_then(non_empty_string)?;
        let kind = self
            .code
            .as_deref()
            .and_then(non_empty_string)
            .or_else(|| self.type_.as_deref().and_then(non_empty_string));
        Some(match kind {
            Some(kind) => format!("{message} ({kind})"),
            None => message.to_owned(),
        })
    }
}

impl fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::InvalidProxy(message) => write!(f, "invalid proxy: {message}"),
            Self::Request(error) => write!(f, "send chat body failed: {error}"),
            Self::Connection(message) => write!(f, "send chat body failed: {message}"),
            Self::Status(status, message) => {
                write!(f, "chat failed with status code: {}", status.as_u16())?;
                if message.is_empty() {
                    Ok(())
                } else {
                    write!(f, ": {message}")
                }
            }
            Self::MalformedFrame(message) => write!(f, "malformed stream frame: {message}"),
            Self::MissingRole => write!(f, "role is nil"),
            Self::EmptyChoices => write!(f, "choices of length 0"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::ResendExhausted { attempts } => write!(
                f,
                "stream closed before [DONE] on all {attempts} attempts"
            ),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for ChatApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for ChatApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extract a readable message from an error response body.
///
/// Falls back to the raw body, then to the canonical status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.trim().to_string()
        }
    };

    match serde_json::from_str::<ErrorPayload>(body) {
        Ok(ErrorPayload { value: Some(fields) }) => fields.describe().unwrap_or_else(fallback),
        _ => fallback(),
    }
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
