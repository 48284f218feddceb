use crate::speech::{Language, SUPPORTED_LANGUAGES};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    None,
}

/// Input composer: text entry, language selector, voice toggle.
#[derive(Clone)]
pub struct Composer {
    content: String,
    cursor_position: usize,
    language_index: usize,
    listening: bool,
    voice_supported: bool,
    /// Composer-scoped notice (speech-capture failures); dismissible,
    /// never fatal to the conversation.
    notice: Option<String>,
}

impl Composer {
    pub fn new(default_language: &str, voice_supported: bool) -> Self {
        let language_index = SUPPORTED_LANGUAGES
            .iter()
            .position(|l| l.code == default_language)
            .unwrap_or(0);
        Self {
            content: String::new(),
            cursor_position: 0,
            language_index,
            listening: false,
            voice_supported,
            notice: None,
        }
    }

    /// Handle key input. `disabled` blocks submission while a reply streams;
    /// typing stays available so the user can draft the next question.
    pub fn handle_key(&mut self, key: KeyEvent, disabled: bool) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                } else if !disabled && !self.content.trim().is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor_position = 0;
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_char(c);
            }
            KeyCode::Backspace => {
                if let Some(prev) = self.prev_boundary() {
                    self.content.remove(prev);
                    self.cursor_position = prev;
                }
            }
            KeyCode::Delete => {
                if self.cursor_position < self.content.len() {
                    self.content.remove(self.cursor_position);
                }
            }
            KeyCode::Left => {
                if let Some(prev) = self.prev_boundary() {
                    self.cursor_position = prev;
                }
            }
            KeyCode::Right => {
                if self.cursor_position < self.content.len() {
                    let c = self.content[self.cursor_position..]
                        .chars()
                        .next()
                        .map(char::len_utf8)
                        .unwrap_or(1);
                    self.cursor_position += c;
                }
            }
            KeyCode::Home => self.cursor_position = 0,
            KeyCode::End => self.cursor_position = self.content.len(),
            _ => {}
        }

        ComposerResult::None
    }

    fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    /// Byte index of the char boundary before the cursor, if any.
    fn prev_boundary(&self) -> Option<usize> {
        self.content[..self.cursor_position]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Replace the draft with transcript text (speech capture writes here).
    pub fn set_content(&mut self, text: &str) {
        self.content = text.to_string();
        self.cursor_position = self.content.len();
    }

    pub fn cycle_language(&mut self) -> Language {
        self.language_index = (self.language_index + 1) % SUPPORTED_LANGUAGES.len();
        self.language()
    }

    pub fn language(&self) -> Language {
        SUPPORTED_LANGUAGES[self.language_index]
    }

    pub fn voice_supported(&self) -> bool {
        self.voice_supported
    }

    pub fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn set_notice(&mut self, notice: String) {
        self.notice = Some(notice);
    }

    pub fn clear_notice(&mut self) -> bool {
        self.notice.take().is_some()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

/// Renders the composer box; `disabled` dims it while a reply streams.
pub struct ComposerView<'a> {
    pub composer: &'a Composer,
    pub disabled: bool,
}

impl Widget for ComposerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let composer = self.composer;

        let mut title = format!(" {} [Ctrl+L] ", composer.language().name);
        if composer.voice_supported() {
            let mic = if composer.is_listening() {
                "🎤 listening"
            } else {
                "🎤 off"
            };
            title.push_str(&format!("· {} [Ctrl+R] ", mic));
        }

        let border_style = if self.disabled {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(border_style);

        let inner_area = block.inner(area);
        block.render(area, buf);

        if composer.content.is_empty() {
            let placeholder = if self.disabled {
                "Waiting for the advisor to reply..."
            } else {
                "Ask about crop prices, demand, or exports... (Enter to send)"
            };
            let line = Line::from(vec![Span::styled(
                placeholder,
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
        } else {
            let mut content = composer.content.clone();
            if !self.disabled {
                content.insert(composer.cursor_position.min(content.len()), '▌');
            }
            for (i, line_text) in content.split('\n').enumerate() {
                if i < inner_area.height as usize {
                    let line = Line::from(vec![Span::raw(line_text.to_string())]);
                    buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_submits_trimmed_content() {
        let mut composer = Composer::new("hi-IN", false);
        for c in "hello".chars() {
            composer.handle_key(press(KeyCode::Char(c)), false);
        }
        let result = composer.handle_key(press(KeyCode::Enter), false);
        assert_eq!(result, ComposerResult::Submitted("hello".to_string()));
        assert!(composer.content.is_empty());
    }

    #[test]
    fn enter_ignored_while_disabled() {
        let mut composer = Composer::new("hi-IN", false);
        composer.set_content("draft");
        let result = composer.handle_key(press(KeyCode::Enter), true);
        assert_eq!(result, ComposerResult::None);
        assert_eq!(composer.content, "draft");
    }

    #[test]
    fn blank_content_does_not_submit() {
        let mut composer = Composer::new("hi-IN", false);
        composer.set_content("   ");
        let result = composer.handle_key(press(KeyCode::Enter), false);
        assert_eq!(result, ComposerResult::None);
    }

    #[test]
    fn language_cycles_through_the_table() {
        let mut composer = Composer::new("hi-IN", false);
        assert_eq!(composer.language().code, "hi-IN");
        composer.cycle_language();
        assert_eq!(composer.language().code, "bn-IN");
        for _ in 0..SUPPORTED_LANGUAGES.len() - 1 {
            composer.cycle_language();
        }
        assert_eq!(composer.language().code, "hi-IN");
    }

    #[test]
    fn unknown_default_language_falls_back_to_first() {
        let composer = Composer::new("xx-XX", false);
        assert_eq!(composer.language().code, "hi-IN");
    }
}
