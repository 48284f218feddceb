//! Speech-capture collaborator interface.
//!
//! Capture itself is an external subsystem; this module defines the contract
//! the composer drives: a fixed supported-language table, interim/final
//! transcript events, and the error subtypes a backend must distinguish.
//! Plain terminals ship with [`UnsupportedCapture`], which feature-detection
//! uses to hide the voice controls entirely.

use anyhow::Result;
use once_cell::sync::Lazy;

/// A speech-capture language option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

/// Languages the voice composer offers, in selector order.
pub static SUPPORTED_LANGUAGES: Lazy<Vec<Language>> = Lazy::new(|| {
    vec![
        Language { code: "hi-IN", name: "हिन्दी (भारत)" },
        Language { code: "bn-IN", name: "বাংলা (ভারত)" },
        Language { code: "ta-IN", name: "தமிழ் (இந்தியா)" },
        Language { code: "te-IN", name: "తెలుగు (భారతదేశం)" },
        Language { code: "mr-IN", name: "मराठी (भारत)" },
        Language { code: "gu-IN", name: "ગુજરાતી (ભારત)" },
        Language { code: "kn-IN", name: "ಕನ್ನಡ (ಭಾರತ)" },
        Language { code: "en-IN", name: "English (India)" },
    ]
});

/// Transcript updates delivered while capture runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    /// Partial transcript, still subject to revision.
    Interim(String),
    /// Finalized transcript text.
    Final(String),
    /// Capture stopped (end of speech or explicit stop).
    Ended,
}

/// Distinguished capture failures.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechError {
    AudioCapture,
    NotAllowed,
    NoSpeech,
    Network,
    Unknown(String),
}

impl SpeechError {
    /// Human-readable notice for the composer banner.
    pub fn user_message(&self) -> String {
        match self {
            SpeechError::AudioCapture => {
                "Audio capture failed. Please check your microphone connection and ensure it is not being used by another application.".to_string()
            }
            SpeechError::NotAllowed => {
                "Microphone access was denied. Please allow microphone permissions.".to_string()
            }
            SpeechError::NoSpeech => {
                "No speech was detected. Please try speaking again.".to_string()
            }
            SpeechError::Network => {
                "A network error occurred during speech recognition. Please check your internet connection.".to_string()
            }
            SpeechError::Unknown(detail) => format!("An error occurred: {}", detail),
        }
    }
}

/// A speech-capture backend.
///
/// Event-pump style to match the UI loop: `poll` is called every tick while
/// capture is active. Errors end the capture; they never affect the
/// conversation itself.
pub trait SpeechCapture {
    /// Whether a capture device and recognizer are available at all.
    fn is_supported(&self) -> bool;

    fn set_language(&mut self, code: &str);

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn poll(&mut self) -> Option<Result<SpeechEvent, SpeechError>>;
}

/// Backend for environments without speech capture. Reports unsupported so
/// the voice toggle is never offered.
#[derive(Debug, Default)]
pub struct UnsupportedCapture;

impl SpeechCapture for UnsupportedCapture {
    fn is_supported(&self) -> bool {
        false
    }

    fn set_language(&mut self, _code: &str) {}

    fn start(&mut self) -> Result<()> {
        anyhow::bail!("Speech capture is not supported in this environment")
    }

    fn stop(&mut self) {}

    fn poll(&mut self) -> Option<Result<SpeechEvent, SpeechError>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_table_has_eight_entries() {
        assert_eq!(SUPPORTED_LANGUAGES.len(), 8);
        assert_eq!(SUPPORTED_LANGUAGES[0].code, "hi-IN");
        assert!(SUPPORTED_LANGUAGES.iter().any(|l| l.code == "en-IN"));
    }

    #[test]
    fn unsupported_backend_refuses_to_start() {
        let mut capture = UnsupportedCapture;
        assert!(!capture.is_supported());
        assert!(capture.start().is_err());
        assert!(capture.poll().is_none());
    }

    #[test]
    fn error_messages_are_user_facing() {
        assert!(SpeechError::NoSpeech.user_message().contains("No speech"));
        assert!(SpeechError::AudioCapture.user_message().contains("microphone"));
        assert!(SpeechError::NotAllowed.user_message().contains("denied"));
        assert!(SpeechError::Network.user_message().contains("network"));
        assert!(
            SpeechError::Unknown("device busy".into())
                .user_message()
                .contains("device busy")
        );
    }

    /// Replays a fixed transcript sequence; stands in for a real recognizer.
    struct ScriptedCapture {
        language: String,
        active: bool,
        events: std::collections::VecDeque<Result<SpeechEvent, SpeechError>>,
    }

    impl SpeechCapture for ScriptedCapture {
        fn is_supported(&self) -> bool {
            true
        }

        fn set_language(&mut self, code: &str) {
            self.language = code.to_string();
        }

        fn start(&mut self) -> Result<()> {
            self.active = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.active = false;
        }

        fn poll(&mut self) -> Option<Result<SpeechEvent, SpeechError>> {
            if !self.active {
                return None;
            }
            self.events.pop_front()
        }
    }

    #[test]
    fn scripted_capture_delivers_interim_then_final() {
        let mut capture = ScriptedCapture {
            language: "hi-IN".to_string(),
            active: false,
            events: std::collections::VecDeque::from([
                Ok(SpeechEvent::Interim("mango".to_string())),
                Ok(SpeechEvent::Final("mango prices".to_string())),
                Ok(SpeechEvent::Ended),
            ]),
        };

        capture.set_language("en-IN");
        assert_eq!(capture.language, "en-IN");

        assert!(capture.poll().is_none());
        capture.start().unwrap();
        assert_eq!(
            capture.poll(),
            Some(Ok(SpeechEvent::Interim("mango".to_string())))
        );
        assert_eq!(
            capture.poll(),
            Some(Ok(SpeechEvent::Final("mango prices".to_string())))
        );
        assert_eq!(capture.poll(), Some(Ok(SpeechEvent::Ended)));
        capture.stop();
        assert!(capture.poll().is_none());
    }
}
