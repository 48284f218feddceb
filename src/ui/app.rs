use crate::config::Config;
use crate::controller::ConversationController;
use crate::speech::{SpeechCapture, SpeechEvent, UnsupportedCapture};
use crate::storage::{FileSnapshotStore, SnapshotStore};
use crate::transport::{ChatTransport, GeminiClient};
use crate::ui::composer::{Composer, ComposerResult, ComposerView};
use crate::ui::history::{MessageList, SUGGESTED_PROMPTS};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::io::Stdout;
use std::time::Duration;

/// Single-screen TUI wiring the conversation controller, the composer, and
/// the speech-capture collaborator together on one event loop.
pub struct App<T, S> {
    controller: ConversationController<T, S>,
    composer: Composer,
    speech: Box<dyn SpeechCapture>,
    should_quit: bool,
}

impl App<GeminiClient, FileSnapshotStore> {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = GeminiClient::new(config)?;
        let store = FileSnapshotStore::new(&config.advisor_home);
        // No terminal speech backend ships yet; feature detection hides the
        // voice toggle when the backend reports unsupported.
        let speech: Box<dyn SpeechCapture> = Box::new(UnsupportedCapture);

        let composer = Composer::new(&config.default_language, speech.is_supported());
        let mut controller = ConversationController::new(transport, store);
        controller.initialize();

        Ok(Self {
            controller,
            composer,
            speech,
            should_quit: false,
        })
    }
}

impl<T: ChatTransport, S: SnapshotStore> App<T, S> {
    pub async fn run(mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<()> {
        while !self.should_quit {
            self.controller.poll_stream();
            self.pump_speech();

            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key).await;
                }
            }
        }
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('n') => {
                    self.controller.reset();
                    return;
                }
                KeyCode::Char('l') => {
                    let language = self.composer.cycle_language();
                    self.speech.set_language(language.code);
                    return;
                }
                KeyCode::Char('r') => {
                    self.toggle_voice();
                    return;
                }
                _ => {}
            }
        }

        if key.code == KeyCode::Esc {
            // First Esc dismisses the capture notice, the next one quits.
            if !self.composer.clear_notice() {
                self.should_quit = true;
            }
            return;
        }

        let disabled = self.controller.is_streaming() || !self.controller.is_ready();

        // On the welcome screen a bare digit picks the matching suggested
        // prompt; once a draft or conversation exists digits type normally.
        if self.controller.messages().is_empty() && self.composer.is_empty() && !disabled {
            if let KeyCode::Char(c @ '1'..='9') = key.code {
                if let Some(prompt) = SUGGESTED_PROMPTS.get(c as usize - '1' as usize) {
                    self.controller.send(prompt).await;
                    return;
                }
            }
        }

        if let ComposerResult::Submitted(text) = self.composer.handle_key(key, disabled) {
            self.controller.send(&text).await;
        }
    }

    fn toggle_voice(&mut self) {
        if !self.composer.voice_supported() {
            return;
        }
        if self.composer.is_listening() {
            self.speech.stop();
            self.composer.set_listening(false);
        } else {
            match self.speech.start() {
                Ok(()) => self.composer.set_listening(true),
                Err(e) => self.composer.set_notice(e.to_string()),
            }
        }
    }

    /// Forward transcript updates into the composer draft.
    fn pump_speech(&mut self) {
        if !self.composer.is_listening() {
            return;
        }
        while let Some(update) = self.speech.poll() {
            match update {
                Ok(SpeechEvent::Interim(text)) | Ok(SpeechEvent::Final(text)) => {
                    self.composer.set_content(&text);
                }
                Ok(SpeechEvent::Ended) => {
                    self.composer.set_listening(false);
                    break;
                }
                Err(error) => {
                    self.composer.set_notice(error.user_message());
                    self.composer.set_listening(false);
                    self.speech.stop();
                    break;
                }
            }
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let notice_height = if self.composer.notice().is_some() { 1 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(8),
                Constraint::Length(notice_height),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(frame.size());

        frame.render_widget(
            MessageList {
                messages: self.controller.messages(),
                error: self.controller.error(),
                streaming: self.controller.is_streaming(),
            },
            chunks[0],
        );

        if let Some(notice) = self.composer.notice() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    format!("🎙 {} (Esc to dismiss)", notice),
                    Style::default().fg(Color::Yellow),
                ))),
                chunks[1],
            );
        }

        let disabled = self.controller.is_streaming() || !self.controller.is_ready();
        frame.render_widget(
            ComposerView {
                composer: &self.composer,
                disabled,
            },
            chunks[2],
        );

        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "Enter send · Shift+Enter newline · Ctrl+N new conversation · Ctrl+L language · Esc quit",
                Style::default().fg(Color::DarkGray),
            ))),
            chunks[3],
        );
    }
}
