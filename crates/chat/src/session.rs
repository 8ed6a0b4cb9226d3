use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use cirrus_core::{Error, Generation, Outcome, Result, Transcript};
use cirrus_providers::{CancelToken, ChatRequest, Provider, StreamEvent, history_contents};

/// Events sent from the session to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// An incremental piece of the reply
    Fragment(String),
    /// The reply completed and was appended to the transcript
    Done { text: String },
    /// The stream failed; the fallback reply was appended and `detail`
    /// carries the diagnostic for display
    Failed { detail: String },
    /// The user cancelled; the pending prompt was taken back
    Cancelled,
}

/// One chat session: the transcript plus the machinery for a turn cycle
///
/// The session is the single owner of the transcript. A submission appends
/// the user turn, streams the reply on a background task, and finalizes by
/// appending exactly one assistant turn (the real text, or the fixed
/// fallback on failure). Cancellation appends nothing and takes the pending
/// prompt back. At most one generation is in flight at a time; a submission
/// during one fails with [`Error::Busy`].
pub struct ChatSession {
    provider: Mutex<Arc<dyn Provider>>,
    transcript: Arc<Mutex<Transcript>>,
    temperature: Option<f32>,
    in_flight: Arc<AtomicBool>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider: Mutex::new(provider),
            transcript: Arc::new(Mutex::new(Transcript::new())),
            temperature: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the sampling temperature sent with every request
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Swap the provider (e.g. after a model or key change).
    ///
    /// The transcript is untouched; the next submission uses the new
    /// provider with the full existing history.
    pub fn set_provider(&self, provider: Arc<dyn Provider>) {
        *self.provider.lock().unwrap() = provider;
    }

    /// A snapshot of the transcript for display
    pub fn transcript(&self) -> Transcript {
        self.transcript.lock().unwrap().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Reset the transcript to empty. Rejected while a generation runs.
    pub fn clear(&self) -> Result<()> {
        if self.is_in_flight() {
            return Err(Error::Busy);
        }
        self.transcript.lock().unwrap().clear();
        Ok(())
    }

    /// Submit a prompt and receive the turn's events.
    ///
    /// Empty and whitespace-only prompts are rejected before anything is
    /// recorded or sent. On acceptance the user turn is appended, the wire
    /// history is built from everything before it, and a background task
    /// drives the provider stream, forwarding fragments as they arrive.
    pub fn submit(&self, prompt: &str, cancel_token: CancelToken) -> Result<mpsc::UnboundedReceiver<ChatEvent>> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::EmptyPrompt);
        }

        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(Error::Busy);
        }

        let history = {
            let mut transcript = self.transcript.lock().unwrap();
            transcript.push_user(prompt);
            history_contents(&transcript, true)
        };

        let mut request = ChatRequest::builder().history(history).prompt(prompt);
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }
        let request = request.build();

        let (tx, rx) = mpsc::unbounded_channel();
        let provider = self.provider.lock().unwrap().clone();
        let transcript = Arc::clone(&self.transcript);
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            let mut generation = Generation::start();

            match provider.stream_chat(request, cancel_token.clone()).await {
                Ok(stream) => {
                    tokio::pin!(stream);

                    while let Some(event) = stream.next().await {
                        if cancel_token.is_cancelled() {
                            generation.on_cancelled();
                            break;
                        }

                        match event {
                            StreamEvent::Fragment(text) => {
                                generation.on_fragment(&text);
                                if !text.is_empty() {
                                    let _ = tx.send(ChatEvent::Fragment(text));
                                }
                            }
                            StreamEvent::Done => break,
                            StreamEvent::Error(detail) => {
                                tracing::warn!("stream failed: {}", detail);
                                generation.on_error(detail);
                                break;
                            }
                        }
                    }
                }
                Err(e) => generation.on_error(e.to_string()),
            }

            finish_turn(generation, &transcript, &tx);
            in_flight.store(false, Ordering::SeqCst);
        });

        Ok(rx)
    }
}

/// Resolve the generation and record the turn.
///
/// Exactly one of: assistant turn with the reply, assistant turn with the
/// fallback, or the pending prompt taken back on cancellation.
fn finish_turn(generation: Generation, transcript: &Arc<Mutex<Transcript>>, tx: &mpsc::UnboundedSender<ChatEvent>) {
    match generation.finish() {
        Outcome::Completed { text } => {
            transcript.lock().unwrap().push_assistant(text.clone());
            let _ = tx.send(ChatEvent::Done { text });
        }
        Outcome::Failed { detail } => {
            transcript.lock().unwrap().push_assistant(cirrus_core::FALLBACK_REPLY);
            let _ = tx.send(ChatEvent::Failed { detail });
        }
        Outcome::Cancelled => {
            transcript.lock().unwrap().pop_pending_prompt();
            let _ = tx.send(ChatEvent::Cancelled);
        }
    }
}
