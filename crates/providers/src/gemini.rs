use eventsource_stream::Eventsource;
use futures::{StreamExt, stream::Stream};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::types::*;
use cirrus_core::{Error, ModelId, Result};

/// Generic provider trait for chat backends
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Open one remote conversation seeded with the request's history, send
    /// the prompt, and stream back incremental text fragments.
    ///
    /// The returned stream is finite and not restartable; a fresh call must
    /// be issued for any retry.
    async fn stream_chat<'a>(
        &'a self, request: ChatRequest, cancel_token: CancelToken,
    ) -> Result<Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'a>>>;
}

/// Gemini provider implementation
#[derive(Debug)]
pub struct GeminiProvider {
    client: HttpClient,
    api_key: String,
    base_url: String,
    model: ModelId,
}

impl GeminiProvider {
    /// Create a provider for the given credential and model.
    ///
    /// The key is an opaque string; the only local validation is that it is
    /// non-empty, which counts as an initialization failure rather than a
    /// stream failure.
    pub fn new(api_key: impl Into<String>, model: ModelId, base_url: Option<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Init("API key is empty".to_string()));
        }

        Ok(Self {
            client: HttpClient::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            model,
        })
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url,
            self.model.as_str(),
            self.api_key
        )
    }

    /// Convert a ChatRequest into the wire request body
    fn to_wire_request(&self, request: &ChatRequest) -> GenerateContentRequest {
        let mut contents = request.history.clone();
        contents.push(Content::user(request.prompt.clone()));

        GenerateContentRequest {
            contents,
            generation_config: request.temperature.map(|temperature| GenerationConfig { temperature: Some(temperature) }),
        }
    }

    /// Parse one SSE data payload into a StreamEvent.
    ///
    /// Chunks carrying neither text nor a finish reason become empty
    /// fragments, which the accumulator ignores.
    fn parse_chunk(&self, data: &str) -> StreamEvent {
        match serde_json::from_str::<GeminiChunk>(data) {
            Ok(chunk) => {
                if let Some(candidates) = &chunk.candidates
                    && let Some(candidate) = candidates.first()
                {
                    if let Some(content) = &candidate.content {
                        for part in &content.parts {
                            if let Some(text) = &part.text {
                                return StreamEvent::Fragment(text.clone());
                            }
                        }
                    }

                    if candidate.finish_reason.is_some() {
                        return StreamEvent::Done;
                    }
                }
                StreamEvent::Fragment(String::new())
            }
            Err(_) => StreamEvent::Error(format!("failed to parse chunk: {}", data)),
        }
    }
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    async fn stream_chat<'a>(
        &'a self, request: ChatRequest, cancel_token: CancelToken,
    ) -> Result<Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'a>>> {
        let wire_request = self.to_wire_request(&request);
        let url = self.stream_url();
        let cancel_token_clone = cancel_token.clone();

        let stream = async_stream::stream! {
            if cancel_token.is_cancelled() {
                yield StreamEvent::Error("cancelled before request".to_string());
                return;
            }

            tracing::debug!(model = self.model.as_str(), history = request.history.len(), "sending chat request");

            let response = match self.client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(&wire_request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield StreamEvent::Error(format!("request failed: {}", e));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                yield StreamEvent::Error(format!("API error: {} - {}", status, body));
                return;
            }

            let eventsource = response.bytes_stream().eventsource();
            tokio::pin!(eventsource);

            while let Some(event_result) = eventsource.next().await {
                if cancel_token_clone.is_cancelled() {
                    yield StreamEvent::Error("cancelled by user".to_string());
                    return;
                }

                match event_result {
                    Ok(event) => match self.parse_chunk(&event.data) {
                        StreamEvent::Done => break,
                        StreamEvent::Error(msg) => {
                            yield StreamEvent::Error(msg);
                            return;
                        }
                        fragment => yield fragment,
                    },
                    Err(e) => {
                        yield StreamEvent::Error(format!("SSE error: {}", e));
                        return;
                    }
                }
            }

            yield StreamEvent::Done;
        };

        Ok(Box::pin(stream))
    }
}

/// Wire request body for streamGenerateContent
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Streamed chunk format
#[derive(Debug, Deserialize)]
struct GeminiChunk {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiChunkContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiChunkContent {
    #[serde(default)]
    parts: Vec<GeminiChunkPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiChunkPart {
    #[serde(default)]
    text: Option<String>,
}
