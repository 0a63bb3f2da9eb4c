//! Speech synthesis providers for slide narration.
//!
//! This crate provides:
//! - The `SpeechSynthesizer` contract the pipeline depends on
//! - A Google Translate TTS client (primary)
//! - An OpenAI-compatible TTS client (fallback)
//! - A fallback chain that keeps "text too long" and "providers down" apart

pub mod config;
pub mod error;
pub mod fallback;
pub mod google;
pub mod openai;
pub mod provider;

pub use config::VoiceConfig;
pub use error::{VoiceError, VoiceResult};
pub use fallback::FallbackSynthesizer;
pub use google::GoogleTranslateTts;
pub use openai::OpenAiTts;
pub use provider::SpeechSynthesizer;
