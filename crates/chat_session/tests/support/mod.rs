#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chat_api::{
    CancellationSignal, ChatApiError, ChatReply, ChatRequest, ModelInfo, ModelList, Role,
    StatusCode,
};
use chat_session::{ChatTransport, Session, SessionSettings, TranscriptSink};

pub const MODEL: &str = "gpt-test";

pub enum Scripted {
    Reply {
        status: u16,
        chunks: Vec<Result<Vec<u8>, String>>,
    },
    Fail(String),
}

impl Scripted {
    pub fn sse(frames: &[&str]) -> Self {
        Self::Reply {
            status: 200,
            chunks: vec![Ok(sse_body(frames))],
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::Reply {
            status,
            chunks: vec![Ok(body.as_bytes().to_vec())],
        }
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ChatRequest>>,
    models: Vec<String>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Scripted>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            models: vec![MODEL.to_owned()],
        }
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|model| (*model).to_owned()).collect();
        self
    }

    pub fn push(&self, reply: Scripted) {
        lock(&self.replies).push_back(reply);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }
}

impl ChatTransport for ScriptedTransport {
    async fn send_chat(
        &self,
        request: &ChatRequest,
        _cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatReply, ChatApiError> {
        lock(&self.requests).push(request.clone());
        let next = lock(&self.replies).pop_front();

        match next {
            Some(Scripted::Reply { status, chunks }) => Ok(ChatReply::from_chunks(
                StatusCode::from_u16(status).expect("scripted status should be valid"),
                chunks
                    .into_iter()
                    .map(|chunk| chunk.map_err(ChatApiError::Connection))
                    .collect(),
            )),
            Some(Scripted::Fail(message)) => Err(ChatApiError::Connection(message)),
            None => Err(ChatApiError::Connection("no scripted reply left".to_owned())),
        }
    }

    async fn list_models(&self) -> Result<ModelList, ChatApiError> {
        Ok(ModelList {
            data: self
                .models
                .iter()
                .map(|id| ModelInfo {
                    id: id.clone(),
                    object: "model".to_owned(),
                    owned_by: "test".to_owned(),
                })
                .collect(),
        })
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub replaced: Vec<String>,
    pub appended: Vec<String>,
}

impl TranscriptSink for RecordingSink {
    fn replace(&mut self, text: &str) {
        self.replaced.push(text.to_owned());
    }

    fn append(&mut self, delta: &str) {
        self.appended.push(delta.to_owned());
    }
}

pub fn sse_body(frames: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(frame);
        body.push_str("\n\n");
    }
    body.into_bytes()
}

pub fn role_frame(id: &str) -> String {
    format!(r#"{{"id":"{id}","choices":[{{"delta":{{"role":"assistant"}}}}]}}"#)
}

pub fn content_frame(content: &str) -> String {
    serde_json::json!({"choices": [{"delta": {"content": content}}]}).to_string()
}

/// Complete streamed reply `id` carrying `parts` as deltas.
pub fn streamed_reply(id: &str, parts: &[&str]) -> Scripted {
    let mut frames = vec![role_frame(id)];
    frames.extend(parts.iter().map(|part| content_frame(part)));
    frames.push("[DONE]".to_owned());
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    Scripted::sse(&frames)
}

pub fn completion_body(id: &str, content: &str) -> String {
    serde_json::json!({
        "id": id,
        "choices": [{"message": {"role": "assistant", "content": content}}],
    })
    .to_string()
}

pub fn settings(dir: &Path) -> SessionSettings {
    SessionSettings::new(MODEL, dir.join("session.dat"))
}

pub fn session(
    transport: &Arc<ScriptedTransport>,
    settings: &SessionSettings,
) -> Session<ScriptedTransport> {
    Session::new("session-1", "user-1", Arc::clone(transport), settings)
        .expect("session should be created")
}

pub fn roles_and_contents(messages: &[chat_api::Message]) -> Vec<(Role, String)> {
    messages
        .iter()
        .map(|message| (message.role, message.content.clone()))
        .collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
