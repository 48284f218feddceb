use crate::events::{Author, Message};
use crate::storage::SnapshotStore;
use crate::transport::{ChatEvent, ChatTransport, ChatTurn, TurnRole};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

pub const INIT_ERROR_TEXT: &str =
    "Failed to initialize the AI model. Please check your API key.";
pub const RESET_ERROR_TEXT: &str = "Failed to initialize the AI model.";
pub const REPLY_ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Lifecycle of the single in-flight exchange. One enum rather than a set of
/// flags, so a stream without a placeholder cannot be represented.
enum Exchange {
    Idle,
    Streaming {
        placeholder_id: String,
        buffer: String,
        rx: mpsc::Receiver<ChatEvent>,
    },
}

/// Owns the conversation: the ordered message list, the one outstanding
/// streaming exchange, and persistence of the history snapshot.
///
/// No error escapes this type; failures land in the error flag or in message
/// content.
pub struct ConversationController<T, S> {
    transport: T,
    store: S,
    messages: Vec<Message>,
    exchange: Exchange,
    session_ready: bool,
    error: Option<String>,
}

impl<T: ChatTransport, S: SnapshotStore> ConversationController<T, S> {
    pub fn new(transport: T, store: S) -> Self {
        Self {
            transport,
            store,
            messages: Vec::new(),
            exchange: Exchange::Idle,
            session_ready: false,
            error: None,
        }
    }

    /// Restore the saved conversation (if any) and start the remote session.
    ///
    /// A snapshot that fails to parse is deleted so it cannot fail again on
    /// the next launch; the conversation then starts empty. The remote
    /// session is attempted either way.
    pub fn initialize(&mut self) {
        let mut failed = false;

        match self.store.get() {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Message>>(&raw) {
                Ok(history) => self.messages = history,
                Err(_) => {
                    let _ = self.store.remove();
                    failed = true;
                }
            },
            Ok(None) => {}
            Err(_) => failed = true,
        }

        match self.transport.start_session(self.session_turns()) {
            Ok(()) => self.session_ready = true,
            Err(_) => {
                self.session_ready = false;
                failed = true;
            }
        }

        self.error = failed.then(|| INIT_ERROR_TEXT.to_string());
    }

    /// Append a user message plus an empty bot placeholder and open a
    /// streaming exchange. Blank input, an unready session, or an exchange
    /// already in flight make this a no-op.
    pub async fn send(&mut self, text: &str) {
        if text.trim().is_empty() || !self.session_ready || self.is_streaming() {
            return;
        }

        self.error = None;
        self.messages.push(Message::user(text));
        let placeholder = Message::bot_placeholder();
        let placeholder_id = placeholder.id.clone();
        self.messages.push(placeholder);
        self.persist();

        match self.transport.send_streaming(text).await {
            Ok(rx) => {
                self.exchange = Exchange::Streaming {
                    placeholder_id,
                    buffer: String::new(),
                    rx,
                };
            }
            Err(_) => self.mark_failed(&placeholder_id),
        }
    }

    /// Drain pending stream events, applying deltas in arrival order onto
    /// the placeholder (located by id, so other messages never move).
    /// Returns true if anything changed.
    pub fn poll_stream(&mut self) -> bool {
        let Exchange::Streaming { rx, .. } = &mut self.exchange else {
            return false;
        };

        let mut events = Vec::new();
        let mut disconnected = false;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    let terminal = !matches!(event, ChatEvent::TextDelta(_));
                    events.push(event);
                    if terminal {
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        let mut changed = false;
        for event in events {
            match event {
                ChatEvent::TextDelta(delta) => {
                    self.apply_delta(&delta);
                    changed = true;
                }
                ChatEvent::StreamComplete => {
                    self.finish_exchange();
                    return true;
                }
                ChatEvent::Error(_) => {
                    self.fail_exchange();
                    return true;
                }
            }
        }

        // Sender gone without a terminal event: treat as stream end.
        if disconnected {
            self.finish_exchange();
            return true;
        }

        if changed {
            self.persist();
        }
        changed
    }

    /// Drop the conversation and start over with a fresh remote session.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.exchange = Exchange::Idle;
        let _ = self.store.remove();

        match self.transport.start_session(Vec::new()) {
            Ok(()) => {
                self.session_ready = true;
                self.error = None;
            }
            Err(_) => {
                self.session_ready = false;
                self.error = Some(RESET_ERROR_TEXT.to_string());
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.exchange, Exchange::Streaming { .. })
    }

    pub fn is_ready(&self) -> bool {
        self.session_ready
    }

    fn session_turns(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .map(|msg| ChatTurn {
                role: match msg.author {
                    Author::User => TurnRole::User,
                    Author::Bot => TurnRole::Model,
                },
                content: msg.text.clone(),
            })
            .collect()
    }

    fn apply_delta(&mut self, delta: &str) {
        let Exchange::Streaming {
            placeholder_id,
            buffer,
            ..
        } = &mut self.exchange
        else {
            return;
        };
        buffer.push_str(delta);
        let id = placeholder_id.clone();
        let text = buffer.clone();
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
            msg.text = text;
        }
    }

    /// Stream ended normally. A reply that is blank once trimmed removes the
    /// placeholder entirely; the user message stays.
    fn finish_exchange(&mut self) {
        let Exchange::Streaming {
            placeholder_id,
            buffer,
            ..
        } = std::mem::replace(&mut self.exchange, Exchange::Idle)
        else {
            return;
        };

        if buffer.trim().is_empty() {
            self.messages.retain(|m| m.id != placeholder_id);
        }
        self.persist();
    }

    /// Transport failed mid-stream. The partial buffer is discarded, never
    /// shown.
    fn fail_exchange(&mut self) {
        let Exchange::Streaming { placeholder_id, .. } =
            std::mem::replace(&mut self.exchange, Exchange::Idle)
        else {
            return;
        };
        self.mark_failed(&placeholder_id);
    }

    fn mark_failed(&mut self, placeholder_id: &str) {
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == placeholder_id) {
            msg.text = REPLY_ERROR_TEXT.to_string();
        }
        self.error = Some(REPLY_ERROR_TEXT.to_string());
        self.persist();
    }

    fn persist(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        if let Ok(raw) = serde_json::to_string(&self.messages) {
            let _ = self.store.set(&raw);
        }
    }

    #[cfg(test)]
    fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// In-memory snapshot store; clones share the same slot so a test can
    /// inspect what a controller wrote.
    #[derive(Clone, Default)]
    struct MemoryStore {
        raw: Arc<Mutex<Option<String>>>,
    }

    impl MemoryStore {
        fn with_raw(raw: &str) -> Self {
            Self {
                raw: Arc::new(Mutex::new(Some(raw.to_string()))),
            }
        }

        fn snapshot(&self) -> Option<String> {
            self.raw.lock().unwrap().clone()
        }
    }

    impl SnapshotStore for MemoryStore {
        fn get(&self) -> Result<Option<String>> {
            Ok(self.raw.lock().unwrap().clone())
        }

        fn set(&mut self, raw: &str) -> Result<()> {
            *self.raw.lock().unwrap() = Some(raw.to_string());
            Ok(())
        }

        fn remove(&mut self) -> Result<()> {
            *self.raw.lock().unwrap() = None;
            Ok(())
        }
    }

    /// Transport that replays scripted event sequences, one per send.
    #[derive(Default)]
    struct ScriptedTransport {
        scripts: VecDeque<Vec<ChatEvent>>,
        fail_start: bool,
        fail_send: bool,
        started: Vec<Vec<ChatTurn>>,
        sent: Vec<String>,
    }

    impl ScriptedTransport {
        fn with_script(events: Vec<ChatEvent>) -> Self {
            Self {
                scripts: VecDeque::from([events]),
                ..Self::default()
            }
        }
    }

    impl ChatTransport for ScriptedTransport {
        fn start_session(&mut self, history: Vec<ChatTurn>) -> Result<()> {
            if self.fail_start {
                anyhow::bail!("session unavailable");
            }
            self.started.push(history);
            Ok(())
        }

        async fn send_streaming(&mut self, text: &str) -> Result<mpsc::Receiver<ChatEvent>> {
            if self.fail_send {
                anyhow::bail!("send failed");
            }
            self.sent.push(text.to_string());
            let events = self.scripts.pop_front().unwrap_or_default();
            let (tx, rx) = mpsc::channel(64);
            for event in events {
                tx.try_send(event).unwrap();
            }
            Ok(rx)
        }
    }

    fn drain(controller: &mut ConversationController<ScriptedTransport, MemoryStore>) {
        while controller.poll_stream() {}
    }

    #[tokio::test]
    async fn deltas_accumulate_in_order() {
        let transport = ScriptedTransport::with_script(vec![
            ChatEvent::TextDelta("Prices ".into()),
            ChatEvent::TextDelta("are ".into()),
            ChatEvent::TextDelta("rising.".into()),
            ChatEvent::StreamComplete,
        ]);
        let mut controller = ConversationController::new(transport, MemoryStore::default());
        controller.initialize();

        controller.send("mango prices?").await;
        assert!(controller.is_streaming());
        drain(&mut controller);

        assert!(!controller.is_streaming());
        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].author, Author::User);
        assert_eq!(messages[1].author, Author::Bot);
        assert_eq!(messages[1].text, "Prices are rising.");
    }

    #[tokio::test]
    async fn blank_send_is_a_no_op() {
        let mut controller = ConversationController::new(
            ScriptedTransport::default(),
            MemoryStore::default(),
        );
        controller.initialize();

        controller.send("").await;
        controller.send("   ").await;

        assert!(controller.messages().is_empty());
        assert!(controller.transport().sent.is_empty());
    }

    #[tokio::test]
    async fn send_before_session_ready_is_a_no_op() {
        let transport = ScriptedTransport {
            fail_start: true,
            ..ScriptedTransport::default()
        };
        let mut controller = ConversationController::new(transport, MemoryStore::default());
        controller.initialize();

        assert!(!controller.is_ready());
        assert_eq!(controller.error(), Some(INIT_ERROR_TEXT));

        controller.send("hello").await;
        assert!(controller.messages().is_empty());
    }

    #[tokio::test]
    async fn empty_reply_removes_placeholder() {
        let transport =
            ScriptedTransport::with_script(vec![ChatEvent::StreamComplete]);
        let mut controller = ConversationController::new(transport, MemoryStore::default());
        controller.initialize();

        controller.send("anything there?").await;
        drain(&mut controller);

        let messages = controller.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author, Author::User);
    }

    #[tokio::test]
    async fn whitespace_only_reply_removes_placeholder() {
        let transport = ScriptedTransport::with_script(vec![
            ChatEvent::TextDelta("  \n ".into()),
            ChatEvent::StreamComplete,
        ]);
        let mut controller = ConversationController::new(transport, MemoryStore::default());
        controller.initialize();

        controller.send("hm").await;
        drain(&mut controller);

        assert_eq!(controller.messages().len(), 1);
    }

    #[tokio::test]
    async fn stream_error_replaces_placeholder_in_place() {
        let transport = ScriptedTransport::with_script(vec![
            ChatEvent::TextDelta("partial answer that must not surv".into()),
            ChatEvent::Error("connection reset".into()),
        ]);
        let mut controller = ConversationController::new(transport, MemoryStore::default());
        controller.initialize();

        controller.send("demand for turmeric?").await;
        drain(&mut controller);

        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].author, Author::Bot);
        assert_eq!(messages[1].text, REPLY_ERROR_TEXT);
        assert_eq!(controller.error(), Some(REPLY_ERROR_TEXT));
    }

    #[tokio::test]
    async fn send_failure_replaces_placeholder() {
        let transport = ScriptedTransport {
            fail_send: true,
            ..ScriptedTransport::default()
        };
        let mut controller = ConversationController::new(transport, MemoryStore::default());
        controller.initialize();

        controller.send("hello").await;

        let messages = controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, REPLY_ERROR_TEXT);
        assert!(!controller.is_streaming());
    }

    #[tokio::test]
    async fn history_round_trips_through_snapshot() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::with_script(vec![
            ChatEvent::TextDelta("Grow more onions.".into()),
            ChatEvent::StreamComplete,
        ]);
        let mut controller = ConversationController::new(transport, store.clone());
        controller.initialize();
        controller.send("what should I grow?").await;
        drain(&mut controller);

        let saved = controller.messages().to_vec();
        assert_eq!(saved.len(), 2);

        let mut restored =
            ConversationController::new(ScriptedTransport::default(), store.clone());
        restored.initialize();
        assert_eq!(restored.messages(), saved.as_slice());

        // The remote session was rehydrated with the saved turns.
        let started = &restored.transport().started[0];
        assert_eq!(started.len(), 2);
        assert_eq!(started[0].role, TurnRole::User);
        assert_eq!(started[1].role, TurnRole::Model);
        assert_eq!(started[1].content, "Grow more onions.");
    }

    #[tokio::test]
    async fn malformed_snapshot_is_discarded_and_deleted() {
        let store = MemoryStore::with_raw("{ definitely not a history");
        let mut controller =
            ConversationController::new(ScriptedTransport::default(), store.clone());
        controller.initialize();

        assert!(controller.messages().is_empty());
        assert!(store.snapshot().is_none());
        assert_eq!(controller.error(), Some(INIT_ERROR_TEXT));
        // Session still starts, with no history.
        assert!(controller.is_ready());
        assert!(controller.transport().started[0].is_empty());
    }

    #[tokio::test]
    async fn reset_clears_history_snapshot_and_error() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::with_script(vec![
            ChatEvent::TextDelta("ok".into()),
            ChatEvent::StreamComplete,
        ]);
        let mut controller = ConversationController::new(transport, store.clone());
        controller.initialize();
        controller.send("hi").await;
        drain(&mut controller);
        assert!(store.snapshot().is_some());

        controller.reset();

        assert!(controller.messages().is_empty());
        assert!(store.snapshot().is_none());
        assert!(controller.error().is_none());
        assert!(controller.is_ready());
    }

    #[tokio::test]
    async fn send_while_streaming_is_ignored() {
        let transport = ScriptedTransport {
            scripts: VecDeque::from([
                vec![ChatEvent::TextDelta("working...".into())],
                vec![ChatEvent::StreamComplete],
            ]),
            ..ScriptedTransport::default()
        };
        let mut controller = ConversationController::new(transport, MemoryStore::default());
        controller.initialize();

        controller.send("first").await;
        assert!(controller.is_streaming());
        controller.send("second").await;

        assert_eq!(controller.transport().sent, vec!["first".to_string()]);
        assert_eq!(controller.messages().len(), 2);
    }

    #[tokio::test]
    async fn prior_error_clears_on_next_send() {
        let transport = ScriptedTransport {
            scripts: VecDeque::from([
                vec![ChatEvent::Error("boom".into())],
                vec![
                    ChatEvent::TextDelta("fine now".into()),
                    ChatEvent::StreamComplete,
                ],
            ]),
            ..ScriptedTransport::default()
        };
        let mut controller = ConversationController::new(transport, MemoryStore::default());
        controller.initialize();

        controller.send("one").await;
        drain(&mut controller);
        assert!(controller.error().is_some());

        controller.send("two").await;
        assert!(controller.error().is_none());
        drain(&mut controller);
        assert_eq!(controller.messages().last().unwrap().text, "fine now");
    }
}
