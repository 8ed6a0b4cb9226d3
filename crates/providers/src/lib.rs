pub mod gemini;
pub mod mock;
pub mod types;

pub use gemini::{GeminiProvider, Provider};
pub use mock::{MockEvent, MockProvider, MockResponse, RecordedRequest};
pub use types::{CancelToken, ChatRequest, Content, Part, StreamEvent, history_contents};

pub use cirrus_core::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::Transcript;

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest::builder()
            .history(vec![Content::user("Hi"), Content::model("Hello!")])
            .prompt("How are you?")
            .temperature(0.7)
            .build();

        let json = serde_json::to_string(&request.history).unwrap();
        assert!(json.contains("\"user\""));
        assert!(json.contains("\"model\""));
        assert!(json.contains("Hello!"));
    }

    #[test]
    fn test_stream_event_variants() {
        let fragment = StreamEvent::Fragment("Hello".to_string());
        let done = StreamEvent::Done;
        let error = StreamEvent::Error("Connection failed".to_string());

        assert!(matches!(fragment, StreamEvent::Fragment(_)));
        assert!(matches!(done, StreamEvent::Done));
        assert!(matches!(error, StreamEvent::Error(_)));
    }

    #[test]
    fn test_cancel_token() {
        let cancel = CancelToken::new();
        assert!(!cancel.is_cancelled());

        cancel.cancel();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_history_contents_from_empty_transcript() {
        let transcript = Transcript::new();
        assert!(history_contents(&transcript, true).is_empty());
        assert!(history_contents(&transcript, false).is_empty());
    }
}
