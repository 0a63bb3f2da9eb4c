//! Slide units and voice settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One slide: the rendered image and the narration spoken over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideUnit {
    pub image: PathBuf,
    pub narration: String,
}

impl SlideUnit {
    pub fn new(image: impl Into<PathBuf>, narration: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            narration: narration.into(),
        }
    }

    /// Pair index-aligned image paths with narration texts.
    ///
    /// Every image becomes a slide. A slide without a narration gets an
    /// empty one and renders with silence; surplus narrations are dropped.
    pub fn zip(images: Vec<PathBuf>, narrations: Vec<String>) -> Vec<Self> {
        let mut narrations = narrations.into_iter();
        images
            .into_iter()
            .map(|image| Self {
                image,
                narration: narrations.next().unwrap_or_default(),
            })
            .collect()
    }
}

/// Narration speed selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoiceSpeed {
    #[default]
    Normal,
    Slow,
    /// Accepted for compatibility; synthesized like `Normal`
    Fast,
}

impl VoiceSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceSpeed::Normal => "normal",
            VoiceSpeed::Slow => "slow",
            VoiceSpeed::Fast => "fast",
        }
    }

    /// Whether the synthesizer should use its slow mode.
    pub fn is_slow(&self) -> bool {
        matches!(self, VoiceSpeed::Slow)
    }
}

impl fmt::Display for VoiceSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VoiceSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(VoiceSpeed::Normal),
            "slow" => Ok(VoiceSpeed::Slow),
            "fast" => Ok(VoiceSpeed::Fast),
            other => Err(format!("unknown voice speed: {}", other)),
        }
    }
}
