// Text Generation Provider Port
// Providers are tried in a fixed order; first available and successful wins.

use async_trait::async_trait;
use thiserror::Error;

/// Default completion budget for text agents
pub const DEFAULT_MAX_TOKENS: u32 = 1400;

/// Failures reported by external providers (text, image, transcription)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Rate limits, gateway errors and transport failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            ProviderError::Transport(_) => true,
            _ => false,
        }
    }
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Short name for logs ("openai", "anthropic")
    fn name(&self) -> &str;

    /// True when credentials are configured
    fn is_available(&self) -> bool;

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always answer with this text
        Reply(String),
        /// Always fail
        Fail(ProviderError),
    }

    /// Scripted provider that records every prompt it receives
    pub struct ScriptedTextProvider {
        name: String,
        available: bool,
        behavior: MockBehavior,
        calls: Arc<Mutex<Vec<(String, String, u32)>>>,
    }

    impl ScriptedTextProvider {
        pub fn replying(name: impl Into<String>, reply: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                available: true,
                behavior: MockBehavior::Reply(reply.into()),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn failing(name: impl Into<String>, error: ProviderError) -> Self {
            Self {
                name: name.into(),
                available: true,
                behavior: MockBehavior::Fail(error),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn unavailable(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                available: false,
                behavior: MockBehavior::Reply(String::new()),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// (system, user, max_tokens) of every call
        pub fn calls(&self) -> Vec<(String, String, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextProvider for ScriptedTextProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn generate(
            &self,
            system_prompt: &str,
            user_prompt: &str,
            max_tokens: u32,
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push((
                system_prompt.to_string(),
                user_prompt.to_string(),
                max_tokens,
            ));
            match &self.behavior {
                MockBehavior::Reply(text) => Ok(text.clone()),
                MockBehavior::Fail(err) => Err(err.clone()),
            }
        }
    }
}
