// Text generation providers, tried in the order returned by `default_chain`

mod anthropic;
mod openai;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};

use contentforge_core::port::TextProvider;
use std::sync::Arc;

/// Sampling temperature shared by every text provider
pub const TEMPERATURE: f32 = 0.6;

/// OpenAI first, then Anthropic.
pub fn default_chain(
    openai: OpenAiProvider,
    anthropic: AnthropicProvider,
) -> Vec<Arc<dyn TextProvider>> {
    vec![Arc::new(openai), Arc::new(anthropic)]
}
