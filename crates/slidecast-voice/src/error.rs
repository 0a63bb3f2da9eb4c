//! Speech synthesis error types.

use thiserror::Error;

pub type VoiceResult<T> = Result<T, VoiceError>;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("{provider} synthesis failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned no audio")]
    EmptyAudio { provider: &'static str },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("text of {len} characters exceeds the {limit}-character limit and no fallback provider is configured")]
    TextTooLong { len: usize, limit: usize },

    #[error("text of {len} characters exceeds the {limit}-character limit and the fallback provider failed: {cause}")]
    FallbackFailed {
        len: usize,
        limit: usize,
        #[source]
        cause: Box<VoiceError>,
    },

    #[error("all speech providers failed (primary: {primary}; fallback: {fallback})")]
    AllProvidersFailed {
        primary: Box<VoiceError>,
        fallback: Box<VoiceError>,
    },
}

impl VoiceError {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used in logs and job messages.
    pub fn kind(&self) -> &'static str {
        match self {
            VoiceError::TextTooLong { .. } | VoiceError::FallbackFailed { .. } => "text_too_long",
            VoiceError::AllProvidersFailed { .. } => "providers_down",
            VoiceError::NotConfigured(_) => "not_configured",
            VoiceError::Provider { .. } | VoiceError::EmptyAudio { .. } => "provider_failed",
        }
    }

    /// Whether the failure was caused by the length of the text.
    pub fn is_text_too_long(&self) -> bool {
        self.kind() == "text_too_long"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let too_long = VoiceError::TextTooLong { len: 5000, limit: 4000 };
        let down = VoiceError::AllProvidersFailed {
            primary: Box::new(VoiceError::provider("google", "503")),
            fallback: Box::new(VoiceError::provider("openai", "401")),
        };
        assert_eq!(too_long.kind(), "text_too_long");
        assert_eq!(down.kind(), "providers_down");
        assert!(too_long.is_text_too_long());
        assert!(!down.is_text_too_long());
        assert!(down.to_string().contains("503"));
        assert!(down.to_string().contains("401"));
    }
}
