//! Shared test helpers: a throwaway HTTP server on the loopback interface
//! and a provider that replays canned replies.
//!
//! Each server answers exactly one request with a canned status and body,
//! then hands the request it saw back to the test.

#![allow(dead_code)]

use std::{
    io::{BufRead, BufReader, Read, Write},
    net::TcpListener,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread::JoinHandle,
};

use dgrade::{
    AiGrader, GradedSubmission, GradingCriteria, ProviderType, Submission,
    config::AiProviderConfig,
    grade::GradingPrompt,
    providers::{AiProvider, ProviderError},
};

/// The request a [`OneShotServer`] received.
#[derive(Debug)]
pub struct CapturedRequest {
    /// Request line, e.g. `POST /v1/messages HTTP/1.1`.
    pub request_line: String,
    /// Header lines, lower-cased names.
    pub headers:      Vec<(String, String)>,
    /// Request body.
    pub body:         String,
}

impl CapturedRequest {
    /// The value of header `name`, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The body parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// A server that answers one request.
pub struct OneShotServer {
    /// Base URL, e.g. `http://127.0.0.1:43121`.
    pub url: String,
    /// Thread serving the request.
    handle:  JoinHandle<CapturedRequest>,
}

impl OneShotServer {
    /// Starts a server answering with `status` and `body`.
    pub fn start(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));

        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");

            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header line");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
                }
            }

            let length = headers
                .iter()
                .find(|(name, _)| name == "content-length")
                .and_then(|(_, value)| value.parse::<usize>().ok())
                .unwrap_or(0);
            let mut request_body = vec![0; length];
            reader.read_exact(&mut request_body).expect("request body");

            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: \
                 {}\r\nConnection: close\r\n\r\n{body}",
                reason(status),
                body.len()
            );
            let mut stream = stream;
            stream
                .write_all(response.as_bytes())
                .expect("write response");
            stream.flush().expect("flush");

            CapturedRequest {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: String::from_utf8(request_body).expect("utf-8 body"),
            }
        });

        Self { url, handle }
    }

    /// Waits for the request to be served and returns it.
    pub fn finish(self) -> CapturedRequest {
        self.handle.join().expect("server thread")
    }
}

/// Reason phrase for the status codes the tests use.
fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// A provider that replays canned replies and counts requests.
pub struct ScriptedProvider {
    /// Configuration reported to callers.
    config:  AiProviderConfig,
    /// Replies, used in order; the last one repeats.
    replies: Vec<Result<String, String>>,
    /// Number of `complete` calls so far.
    calls:   Arc<AtomicUsize>,
    /// Every prompt sent, in order.
    prompts: Arc<Mutex<Vec<GradingPrompt>>>,
}

impl ScriptedProvider {
    /// A provider whose every reply is `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::with_replies(vec![Ok(reply.into())])
    }

    /// A provider that answers with `replies` in order. An `Err` becomes a
    /// connection failure.
    pub fn with_replies(replies: Vec<Result<String, String>>) -> Self {
        Self {
            config: AiProviderConfig::builder()
                .provider_type(ProviderType::Anthropic)
                .model("scripted")
                .api_key("test-key")
                .build(),
            replies,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared counter of requests made.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Shared log of the prompts sent.
    pub fn prompts(&self) -> Arc<Mutex<Vec<GradingPrompt>>> {
        Arc::clone(&self.prompts)
    }
}

impl AiProvider for ScriptedProvider {
    fn config(&self) -> &AiProviderConfig {
        &self.config
    }

    fn validate_config(&mut self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn complete(&self, prompt: &GradingPrompt) -> Result<String, ProviderError> {
        self.prompts.lock().expect("prompt log").push(prompt.clone());
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .get(call)
            .or(self.replies.last())
            .cloned()
            .expect("at least one reply");
        reply.map_err(|message| ProviderError::Connection {
            provider: self.config.provider_type,
            message,
        })
    }
}

/// A grader backed by a [`ScriptedProvider`] that always sends `reply`.
pub fn scripted_grader(reply: &str) -> (AiGrader, Arc<AtomicUsize>) {
    let provider = ScriptedProvider::replying(reply);
    let calls = provider.calls();
    (AiGrader::from_provider(Box::new(provider)), calls)
}

/// A canned, well-formed grading reply.
pub fn reply_json(score: u32, feedback: &str) -> String {
    serde_json::json!({
        "score": score,
        "feedback": feedback,
        "improvement_suggestions": ["Cite a source"],
        "word_count": 1
    })
    .to_string()
}

/// Grades `text` against `criteria` with a grader that always answers
/// `reply`.
pub fn grade_with(reply: &str, text: &str, criteria: &GradingCriteria) -> GradedSubmission {
    let (grader, _) = scripted_grader(reply);
    let submission = Submission::new(1, text, "What is a design pattern?");
    grader
        .grade_submission(&submission, Some(criteria))
        .expect("grading succeeds")
}

/// A fresh directory under the system temp dir.
pub fn temp_dir(prefix: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
