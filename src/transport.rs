use crate::config::Config;
use crate::prompts::ADVISOR_SYSTEM_INSTRUCTION;
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Role of a turn as the remote chat service understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One turn of remote session context.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Events emitted while a reply streams in.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Text delta appended to the reply.
    TextDelta(String),
    /// Stream finished normally.
    StreamComplete,
    /// Transport failed; no further events follow.
    Error(String),
}

/// Streaming chat service the conversation controller talks to.
///
/// A session is started once (optionally rehydrated from saved history) and
/// then driven one exchange at a time. Dropping the receiver abandons an
/// in-flight exchange; no upstream cancellation is attempted.
pub trait ChatTransport {
    fn start_session(&mut self, history: Vec<ChatTurn>) -> Result<()>;

    async fn send_streaming(&mut self, text: &str) -> Result<mpsc::Receiver<ChatEvent>>;
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini-backed chat transport.
///
/// Owns the model identity and the system instruction; the controller only
/// sees turns and events.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    turns: Arc<Mutex<Vec<ChatTurn>>>,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key()
            .context("No Gemini API key configured. Set GEMINI_API_KEY or add it to the config file.")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            turns: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn request_payload(turns: &[ChatTurn]) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = turns
            .iter()
            .map(|turn| {
                serde_json::json!({
                    "role": match turn.role {
                        TurnRole::User => "user",
                        TurnRole::Model => "model",
                    },
                    "parts": [{ "text": turn.content }],
                })
            })
            .collect();

        serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": ADVISOR_SYSTEM_INSTRUCTION }]
            },
            "contents": contents,
        })
    }

    /// Parse the SSE stream, forwarding text deltas. Returns the full
    /// accumulated reply text.
    async fn process_sse_stream(
        response: reqwest::Response,
        tx: &mpsc::Sender<ChatEvent>,
    ) -> Result<String> {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut reply_text = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline_pos) = buffer.find('\n') {
                let line = buffer[..newline_pos].trim().to_string();
                buffer = buffer[newline_pos + 1..].to_string();

                if let Some(data) = line.strip_prefix("data: ") {
                    Self::forward_delta(data, tx, &mut reply_text).await;
                }
            }
        }

        // Flush a trailing line that arrived without a newline.
        let line = buffer.trim();
        if let Some(data) = line.strip_prefix("data: ") {
            Self::forward_delta(data, tx, &mut reply_text).await;
        }

        Ok(reply_text)
    }

    async fn forward_delta(data: &str, tx: &mpsc::Sender<ChatEvent>, reply_text: &mut String) {
        let Ok(chunk) = serde_json::from_str::<serde_json::Value>(data) else {
            return;
        };
        let text = chunk
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str());
        if let Some(text) = text {
            reply_text.push_str(text);
            let _ = tx.send(ChatEvent::TextDelta(text.to_string())).await;
        }
    }

    async fn run_exchange(
        client: reqwest::Client,
        url: String,
        payload: serde_json::Value,
        turns: Arc<Mutex<Vec<ChatTurn>>>,
        tx: mpsc::Sender<ChatEvent>,
    ) -> Result<()> {
        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error: {}", error_text);
        }

        let reply_text = Self::process_sse_stream(response, &tx).await?;

        // Keep the model's reply as session context for the next exchange.
        if !reply_text.trim().is_empty() {
            turns
                .lock()
                .expect("session turns lock poisoned")
                .push(ChatTurn {
                    role: TurnRole::Model,
                    content: reply_text,
                });
        }

        let _ = tx.send(ChatEvent::StreamComplete).await;
        Ok(())
    }
}

impl ChatTransport for GeminiClient {
    fn start_session(&mut self, history: Vec<ChatTurn>) -> Result<()> {
        *self.turns.lock().expect("session turns lock poisoned") = history;
        Ok(())
    }

    async fn send_streaming(&mut self, text: &str) -> Result<mpsc::Receiver<ChatEvent>> {
        let (tx, rx) = mpsc::channel(1000);

        let payload = {
            let mut turns = self.turns.lock().expect("session turns lock poisoned");
            turns.push(ChatTurn {
                role: TurnRole::User,
                content: text.to_string(),
            });
            Self::request_payload(&turns)
        };

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );

        let client = self.client.clone();
        let turns = self.turns.clone();
        let tx_err = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::run_exchange(client, url, payload, turns, tx).await {
                let _ = tx_err.send(ChatEvent::Error(e.to_string())).await;
            }
        });

        Ok(rx)
    }
}
