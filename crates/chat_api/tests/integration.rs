use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use chat_api::{
    decode_completion, ChatApiClient, ChatApiConfig, ChatApiError, ChatRequest, LineBuffer,
    Message, SamplingOptions, StreamDecoder, StreamStep,
};
use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

fn allow_local_integration() -> bool {
    std::env::var("CHAT_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct ResponseChunk {
    delay_ms: u64,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct ScriptedResponse {
    status: u16,
    content_type: &'static str,
    chunks: Vec<ResponseChunk>,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}/v1");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);
            let requests = Arc::clone(&requests);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count, requests).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            requests,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn first_request(&self) -> String {
        self.requests
            .lock()
            .expect("requests lock")
            .first()
            .cloned()
            .unwrap_or_default()
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn response_sse(frames: &[&str]) -> ScriptedResponse {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(frame);
        body.push_str("\n\n");
    }

    ScriptedResponse {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: body.into_bytes(),
        }],
    }
}

fn response_json(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse {
        status,
        content_type: "application/json",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: body.as_bytes().to_vec(),
        }],
    }
}

fn streaming_request() -> ChatRequest {
    let options = SamplingOptions::new("gpt-test").with_stream(true);
    ChatRequest::build(&[Message::user("hi")], &options)
}

#[tokio::test]
async fn integration_streaming_body_decodes_to_message() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_sse(&[
        r#"{"id":"m1","choices":[{"delta":{"role":"assistant"}}]}"#,
        r#"{"id":"m1","choices":[{"delta":{"content":"Hel"}}]}"#,
        r#"{"id":"m1","choices":[{"delta":{"content":"lo"}}]}"#,
        "[DONE]",
    ])])
    .await;

    let client =
        ChatApiClient::new(ChatApiConfig::new("sk-test").with_base_url(&server.base_url))
            .expect("client");
    let mut reply = client
        .send(&streaming_request(), None)
        .await
        .expect("send should succeed");
    assert!(reply.is_success());

    let mut lines = LineBuffer::default();
    let mut decoder = StreamDecoder::default();
    let mut deltas = Vec::new();
    while let Some(chunk) = reply.body.next().await {
        for line in lines.feed(&chunk.expect("chunk")) {
            if let StreamStep::Delta(delta) = decoder.push_line(&line).expect("frame") {
                deltas.push(delta);
            }
        }
    }

    assert_eq!(deltas, vec!["Hel", "lo"]);
    assert_eq!(decoder.into_message().expect("message").content, "Hello");

    let request = server.first_request();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.contains("authorization: Bearer sk-test"));
    assert!(request.contains("connection: keep-alive"));

    server.shutdown();
}

#[tokio::test]
async fn integration_non_success_status_is_returned_with_body() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_json(
        400,
        r#"{"error":{"message":"maximum context length exceeded"}}"#,
    )])
    .await;

    let client = ChatApiClient::new(ChatApiConfig::new("k").with_base_url(&server.base_url))
        .expect("client");
    let reply = client
        .send(&streaming_request(), None)
        .await
        .expect("status is not a transport error");

    assert_eq!(reply.status.as_u16(), 400);
    assert!(reply
        .into_text()
        .await
        .expect("body")
        .contains("maximum context length"));
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn integration_non_streaming_body_decodes() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_json(
        200,
        r#"{"id":"x","choices":[{"message":{"role":"assistant","content":"hi"}}]}"#,
    )])
    .await;

    let client = ChatApiClient::new(ChatApiConfig::new("k").with_base_url(&server.base_url))
        .expect("client");
    let request = ChatRequest::build(&[Message::user("hi")], &SamplingOptions::new("m"));
    let body = client
        .send(&request, None)
        .await
        .expect("send")
        .into_bytes()
        .await
        .expect("body");

    assert_eq!(decode_completion(&body).expect("message").content, "hi");
    server.shutdown();
}

#[tokio::test]
async fn integration_model_list() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![response_json(
        200,
        r#"{"data":[{"id":"gpt-test","object":"model","owned_by":"me"}]}"#,
    )])
    .await;

    let client = ChatApiClient::new(ChatApiConfig::new("k").with_base_url(&server.base_url))
        .expect("client");
    let models = client.list_models().await.expect("models");

    assert!(models.contains("gpt-test"));
    assert!(server.first_request().starts_with("GET /v1/models"));
    server.shutdown();
}

#[tokio::test]
async fn integration_connection_refused_is_a_transport_error() {
    if !allow_local_integration() {
        return;
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = ChatApiClient::new(ChatApiConfig::new("k").with_base_url(format!("http://{addr}")))
        .expect("client");
    let error = client
        .send(&streaming_request(), None)
        .await
        .expect_err("nothing listens");
    assert!(error.is_transport());
}

#[tokio::test]
async fn integration_cancellation_while_awaiting_response() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![ScriptedResponse {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![ResponseChunk {
            delay_ms: 2_000,
            bytes: b"data: [DONE]\n\n".to_vec(),
        }],
    }])
    .await;

    let client = Arc::new(
        ChatApiClient::new(ChatApiConfig::new("k").with_base_url(&server.base_url))
            .expect("client"),
    );
    let cancellation = Arc::new(AtomicBool::new(false));
    let task = tokio::spawn({
        let client = Arc::clone(&client);
        let cancellation = Arc::clone(&cancellation);
        async move {
            let reply = client.send(&streaming_request(), Some(&cancellation)).await?;
            chat_api::await_or_cancel(reply.into_bytes(), Some(&cancellation)).await?
        }
    });

    sleep(Duration::from_millis(120)).await;
    cancellation.store(true, Ordering::Release);

    let result = timeout(Duration::from_secs(5), task)
        .await
        .expect("task should resolve")
        .expect("join handle should resolve")
        .expect_err("cancellation should abort");
    assert!(matches!(result, ChatApiError::Cancelled));

    server.shutdown();
}

#[tokio::test]
async fn integration_timeout_while_reading_body_is_a_transport_error() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![ScriptedResponse {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![ResponseChunk {
            delay_ms: 2_000,
            bytes: b"data: [DONE]\n\n".to_vec(),
        }],
    }])
    .await;

    let client = ChatApiClient::new(
        ChatApiConfig::new("k")
            .with_base_url(&server.base_url)
            .with_timeout(Duration::from_millis(200)),
    )
    .expect("client");

    let result = timeout(Duration::from_secs(5), async {
        let reply = client.send(&streaming_request(), None).await?;
        reply.into_bytes().await
    })
    .await
    .expect("request timeout should fire before the guard");

    let error = result.expect_err("delayed body should time out");
    assert!(error.is_transport(), "unexpected error: {error}");
    assert!(matches!(error, ChatApiError::Request(ref source) if source.is_timeout()));

    server.shutdown();
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        500 => "Internal Server Error",
        _ => "Error",
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
) {
    let Ok(head) = read_request_headers(&mut socket).await else {
        return;
    };
    requests.lock().expect("requests lock").push(head);

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| response_json(500, r#"{"error":{"message":"unexpected request"}}"#));

    let headers = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        response.status,
        status_reason(response.status),
        response.content_type,
    );
    if socket.write_all(headers.as_bytes()).await.is_err() {
        return;
    }

    for chunk in response.chunks {
        if chunk.delay_ms > 0 {
            sleep(Duration::from_millis(chunk.delay_ms)).await;
        }
        let prefix = format!("{:X}\r\n", chunk.bytes.len());
        if socket.write_all(prefix.as_bytes()).await.is_err() {
            return;
        }
        if socket.write_all(&chunk.bytes).await.is_err() {
            return;
        }
        if socket.write_all(b"\r\n").await.is_err() {
            return;
        }
    }

    let _ = socket.write_all(b"0\r\n\r\n").await;
    let _ = socket.shutdown().await;
}

async fn read_request_headers(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
        if request.windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&request).into_owned())
}
