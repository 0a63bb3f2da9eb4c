//! Google Translate TTS client.
//!
//! The endpoint only accepts short pieces of text, so narration is split on
//! word boundaries and the MP3 responses are concatenated in order.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Client;
use tracing::debug;

use crate::error::{VoiceError, VoiceResult};
use crate::provider::SpeechSynthesizer;

const PROVIDER: &str = "google";

/// Longest piece of text sent in one request.
pub const MAX_PIECE_CHARS: usize = 100;

/// Playback speed the endpoint uses for slow speech.
const SLOW_SPEED: &str = "0.24";
const NORMAL_SPEED: &str = "1";

/// Google Translate TTS client.
pub struct GoogleTranslateTts {
    base_url: String,
    client: Client,
}

impl GoogleTranslateTts {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> VoiceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; slidecast)")
            .build()
            .map_err(|e| VoiceError::provider(PROVIDER, e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn piece_url(&self, piece: &str, language: &str, slow: bool, idx: usize, total: usize) -> String {
        format!(
            "{}/translate_tts?ie=UTF-8&client=tw-ob&q={}&tl={}&ttsspeed={}&total={}&idx={}&textlen={}",
            self.base_url,
            urlencoding::encode(piece),
            urlencoding::encode(language),
            if slow { SLOW_SPEED } else { NORMAL_SPEED },
            total,
            idx,
            piece.chars().count()
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn synthesize(&self, text: &str, language: &str, slow: bool) -> VoiceResult<Bytes> {
        let pieces = split_text(text, MAX_PIECE_CHARS);
        if pieces.is_empty() {
            return Err(VoiceError::provider(PROVIDER, "no speakable text"));
        }

        let total = pieces.len();
        let mut audio = BytesMut::new();
        for (idx, piece) in pieces.iter().enumerate() {
            let url = self.piece_url(piece, language, slow, idx, total);
            debug!("Requesting TTS piece {}/{} ({} chars)", idx + 1, total, piece.chars().count());

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| VoiceError::provider(PROVIDER, e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(VoiceError::provider(
                    PROVIDER,
                    format!("HTTP {}: {}", status, truncate(&body, 200)),
                ));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| VoiceError::provider(PROVIDER, e.to_string()))?;
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(VoiceError::EmptyAudio { provider: PROVIDER });
        }
        Ok(audio.freeze())
    }
}

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Pieces break on whitespace; a single word longer than `max_chars` is cut
/// on character boundaries.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_chars) {
                pieces.push(chunk.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
