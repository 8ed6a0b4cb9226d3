use crate::gemini::Provider;
use crate::types::*;
use cirrus_core::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_stream::Stream;

/// Mock response types for deterministic testing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MockResponse {
    Text { content: String },
    Error { message: String },
    Sequence { events: Vec<MockEvent> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MockEvent {
    Fragment { text: String },
    Error { message: String },
    Done,
}

/// Mock configuration from TOML file
#[derive(Debug, Deserialize)]
struct MockScript {
    responses: Vec<MockResponse>,
}

/// A request as the mock observed it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub history: Vec<Content>,
    pub prompt: String,
    pub temperature: Option<f32>,
}

impl From<&ChatRequest> for RecordedRequest {
    fn from(req: &ChatRequest) -> Self {
        Self { history: req.history.clone(), prompt: req.prompt.clone(), temperature: req.temperature }
    }
}

/// Mock provider for deterministic testing without API calls
///
/// Plays scripted responses in order and keeps a log of every request it
/// received, so tests can assert on the exact history that was sent (or
/// that no call happened at all).
pub struct MockProvider {
    responses: Vec<MockResponse>,
    current: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProvider {
    pub fn new(responses_file: Option<String>) -> Self {
        let responses = if let Some(path) = responses_file {
            Self::load_responses(&path)
        } else {
            vec![MockResponse::Text { content: "Mock response - configure responses_file".to_string() }]
        };

        Self::with_responses(responses)
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            current: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn load_responses(path: &str) -> Vec<MockResponse> {
        let script_path = Path::new(path);
        if !script_path.exists() {
            tracing::warn!("mock responses file not found: {}", path);
            return vec![MockResponse::Text { content: format!("Mock responses file not found: {}", path) }];
        }

        match fs::read_to_string(script_path) {
            Ok(content) => match toml::from_str::<MockScript>(&content) {
                Ok(script) => script.responses,
                Err(e) => {
                    tracing::error!("failed to parse mock responses: {}", e);
                    vec![MockResponse::Error { message: format!("Failed to parse mock responses: {}", e) }]
                }
            },
            Err(e) => {
                tracing::error!("failed to read mock responses file: {}", e);
                vec![MockResponse::Error { message: format!("Failed to read mock responses file: {}", e) }]
            }
        }
    }

    fn get_next_response(&self) -> MockResponse {
        let index = self.current.fetch_add(1, Ordering::SeqCst);
        if index < self.responses.len() {
            self.responses[index].clone()
        } else {
            MockResponse::Text {
                content: format!(
                    "No more mock responses configured (requested: {}, available: {})",
                    index + 1,
                    self.responses.len()
                ),
            }
        }
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for MockProvider {
    async fn stream_chat<'a>(
        &'a self, request: ChatRequest, _cancel_token: CancelToken,
    ) -> Result<Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'a>>> {
        self.requests.lock().unwrap().push(RecordedRequest::from(&request));
        let response = self.get_next_response();

        let stream = async_stream::stream! {
            match response {
                MockResponse::Text { content } => {
                    yield StreamEvent::Fragment(content);
                }
                MockResponse::Error { message } => {
                    yield StreamEvent::Error(message);
                    return;
                }
                MockResponse::Sequence { events } => {
                    for event in events {
                        match event {
                            MockEvent::Fragment { text } => {
                                yield StreamEvent::Fragment(text);
                            }
                            MockEvent::Error { message } => {
                                yield StreamEvent::Error(message);
                                return;
                            }
                            MockEvent::Done => {
                                yield StreamEvent::Done;
                                return;
                            }
                        }
                    }
                }
            }
            yield StreamEvent::Done;
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_mock_provider_creation() {
        let provider = MockProvider::new(None);
        assert!(!provider.responses.is_empty());
        assert_eq!(provider.request_count(), 0);
    }

    #[test]
    fn test_mock_response_parsing() {
        let toml = r#"
[[responses]]
type = "text"
content = "Hello, world!"

[[responses]]
type = "error"
message = "simulated outage"

[[responses]]
type = "sequence"
events = [
    { event = "fragment", text = "Partial" },
    { event = "done" }
]
"#;

        let script: MockScript = toml::from_str(toml).unwrap();
        assert_eq!(script.responses.len(), 3);
        assert!(matches!(script.responses[0], MockResponse::Text { .. }));
        assert!(matches!(script.responses[1], MockResponse::Error { .. }));
        assert!(matches!(script.responses[2], MockResponse::Sequence { .. }));
    }

    #[test]
    fn test_recorded_request_from_chat_request() {
        let request = ChatRequest::builder()
            .history(vec![Content::user("Hi")])
            .prompt("How are you?")
            .build();

        let recorded = RecordedRequest::from(&request);
        assert_eq!(recorded.history, vec![Content::user("Hi")]);
        assert_eq!(recorded.prompt, "How are you?");
    }

    #[tokio::test]
    async fn test_mock_streams_scripted_fragments() {
        let provider = MockProvider::with_responses(vec![MockResponse::Sequence {
            events: vec![
                MockEvent::Fragment { text: "I'm ".to_string() },
                MockEvent::Fragment { text: "fine.".to_string() },
                MockEvent::Done,
            ],
        }]);

        let request = ChatRequest::builder().prompt("How are you?").build();
        let stream = provider.stream_chat(request, CancelToken::new()).await.unwrap();
        let events: Vec<StreamEvent> = stream.collect().await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Fragment("I'm ".to_string()),
                StreamEvent::Fragment("fine.".to_string()),
                StreamEvent::Done,
            ]
        );
        assert_eq!(provider.request_count(), 1);
        assert_eq!(provider.requests()[0].prompt, "How are you?");
    }

    #[tokio::test]
    async fn test_mock_error_ends_stream() {
        let provider = MockProvider::with_responses(vec![MockResponse::Sequence {
            events: vec![
                MockEvent::Fragment { text: "par".to_string() },
                MockEvent::Error { message: "boom".to_string() },
                MockEvent::Fragment { text: "never".to_string() },
            ],
        }]);

        let request = ChatRequest::builder().prompt("Hi").build();
        let stream = provider.stream_chat(request, CancelToken::new()).await.unwrap();
        let events: Vec<StreamEvent> = stream.collect().await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Fragment("par".to_string()),
                StreamEvent::Error("boom".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_responses_play_in_order() {
        let provider = MockProvider::with_responses(vec![
            MockResponse::Text { content: "first".to_string() },
            MockResponse::Text { content: "second".to_string() },
        ]);

        for expected in ["first", "second"] {
            let request = ChatRequest::builder().prompt("go").build();
            let stream = provider.stream_chat(request, CancelToken::new()).await.unwrap();
            let events: Vec<StreamEvent> = stream.collect().await;
            assert_eq!(events[0], StreamEvent::Fragment(expected.to_string()));
        }

        assert_eq!(provider.request_count(), 2);
    }

    #[test]
    fn test_load_responses_missing_file() {
        let responses = MockProvider::load_responses("/nonexistent/mock.toml");
        assert!(matches!(responses[0], MockResponse::Text { .. }));
    }
}
