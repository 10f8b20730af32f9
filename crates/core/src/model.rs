use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported hosted model providers (serialized as lowercase strings).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    Openai,
    Openrouter,
    Gemini,
    Mistral,
    Groq,
    /// Deterministic mock provider, wired in for unit tests.
    Test,
}

/// Fixed priority order used to pick a provider on first run: the first
/// provider whose API key environment variable is set wins.
pub const ENV_SCAN_ORDER: &[Provider] = &[
    Provider::Anthropic,
    Provider::Openai,
    Provider::Openrouter,
    Provider::Gemini,
    Provider::Mistral,
    Provider::Groq,
];

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::Openai => "openai",
            Provider::Openrouter => "openrouter",
            Provider::Gemini => "gemini",
            Provider::Mistral => "mistral",
            Provider::Groq => "groq",
            Provider::Test => "test",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic (Claude)",
            Provider::Openai => "OpenAI (GPT)",
            Provider::Openrouter => "OpenRouter",
            Provider::Gemini => "Google Gemini",
            Provider::Mistral => "Mistral AI",
            Provider::Groq => "Groq",
            Provider::Test => "Test provider",
        }
    }

    /// Environment variable holding the API key for this provider.
    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Openai => "OPENAI_API_KEY",
            Provider::Openrouter => "OPENROUTER_API_KEY",
            Provider::Gemini => "GOOGLE_API_KEY",
            Provider::Mistral => "MISTRAL_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
            Provider::Test => "PILOT_TEST_API_KEY",
        }
    }

    /// Base URL for OpenAI-compatible providers. `None` means the
    /// adapter's own default endpoint applies.
    pub fn base_url(&self) -> Option<&'static str> {
        match self {
            Provider::Anthropic => Some("https://api.anthropic.com"),
            Provider::Openai => None,
            Provider::Openrouter => Some("https://openrouter.ai/api/v1"),
            Provider::Gemini => {
                Some("https://generativelanguage.googleapis.com/v1beta/openai")
            }
            Provider::Mistral => Some("https://api.mistral.ai/v1"),
            Provider::Groq => Some("https://api.groq.com/openai/v1"),
            Provider::Test => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-7-sonnet-20250219",
            Provider::Openai => "gpt-4o",
            Provider::Openrouter => "anthropic/claude-3.7-sonnet",
            Provider::Gemini => "gemini-1.5-pro",
            Provider::Mistral => "mistral-large-latest",
            Provider::Groq => "llama-3.3-70b-versatile",
            Provider::Test => "test-model",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" | "gpt" => Ok(Provider::Openai),
            "openrouter" => Ok(Provider::Openrouter),
            "gemini" | "google" => Ok(Provider::Gemini),
            "mistral" => Ok(Provider::Mistral),
            "groq" => Ok(Provider::Groq),
            "test" => Ok(Provider::Test),
            other => Err(format!("Unknown provider: {other}")),
        }
    }
}

/// Static descriptive record for a model offered by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub supports_vision: bool,
    pub context_window: u32,
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vision = if self.supports_vision { " [vision]" } else { "" };
        write!(
            f,
            "{} ({}, {}K ctx){}",
            self.id,
            self.display_name,
            self.context_window / 1000,
            vision
        )
    }
}

/// Reference catalog of known models per provider. Immutable data, used for
/// `/models` listings and to derive the vision flag of the active model.
pub fn models_for(provider: Provider) -> &'static [ModelInfo] {
    match provider {
        Provider::Anthropic => &[
            ModelInfo {
                id: "claude-3-7-sonnet-20250219",
                display_name: "Claude 3.7 Sonnet",
                supports_vision: true,
                context_window: 200_000,
            },
            ModelInfo {
                id: "claude-3-5-sonnet-20241022",
                display_name: "Claude 3.5 Sonnet",
                supports_vision: true,
                context_window: 200_000,
            },
            ModelInfo {
                id: "claude-3-5-haiku-20241022",
                display_name: "Claude 3.5 Haiku",
                supports_vision: true,
                context_window: 200_000,
            },
            ModelInfo {
                id: "claude-3-opus-20240229",
                display_name: "Claude 3 Opus",
                supports_vision: true,
                context_window: 200_000,
            },
        ],
        Provider::Openai => &[
            ModelInfo {
                id: "gpt-4o",
                display_name: "GPT-4o",
                supports_vision: true,
                context_window: 128_000,
            },
            ModelInfo {
                id: "gpt-4o-mini",
                display_name: "GPT-4o Mini",
                supports_vision: true,
                context_window: 128_000,
            },
            ModelInfo {
                id: "gpt-4-turbo",
                display_name: "GPT-4 Turbo",
                supports_vision: true,
                context_window: 128_000,
            },
            ModelInfo {
                id: "gpt-3.5-turbo",
                display_name: "GPT-3.5 Turbo",
                supports_vision: false,
                context_window: 16_385,
            },
        ],
        Provider::Openrouter => &[
            ModelInfo {
                id: "anthropic/claude-3.7-sonnet",
                display_name: "Claude 3.7 Sonnet",
                supports_vision: true,
                context_window: 200_000,
            },
            ModelInfo {
                id: "openai/gpt-4o",
                display_name: "GPT-4o",
                supports_vision: true,
                context_window: 128_000,
            },
            ModelInfo {
                id: "mistralai/mistral-large",
                display_name: "Mistral Large",
                supports_vision: false,
                context_window: 32_000,
            },
            ModelInfo {
                id: "meta-llama/llama-3-70b-instruct",
                display_name: "Llama 3 70B",
                supports_vision: false,
                context_window: 8_000,
            },
        ],
        Provider::Gemini => &[
            ModelInfo {
                id: "gemini-1.5-pro",
                display_name: "Gemini 1.5 Pro",
                supports_vision: true,
                context_window: 1_000_000,
            },
            ModelInfo {
                id: "gemini-1.5-flash",
                display_name: "Gemini 1.5 Flash",
                supports_vision: true,
                context_window: 1_000_000,
            },
        ],
        Provider::Mistral => &[
            ModelInfo {
                id: "mistral-large-latest",
                display_name: "Mistral Large",
                supports_vision: false,
                context_window: 32_000,
            },
            ModelInfo {
                id: "mistral-medium-latest",
                display_name: "Mistral Medium",
                supports_vision: false,
                context_window: 32_000,
            },
            ModelInfo {
                id: "mistral-small-latest",
                display_name: "Mistral Small",
                supports_vision: false,
                context_window: 32_000,
            },
        ],
        Provider::Groq => &[
            ModelInfo {
                id: "llama-3.3-70b-versatile",
                display_name: "Llama 3.3 70B",
                supports_vision: false,
                context_window: 128_000,
            },
            ModelInfo {
                id: "llama-3.1-8b-instant",
                display_name: "Llama 3.1 8B",
                supports_vision: false,
                context_window: 128_000,
            },
            ModelInfo {
                id: "mixtral-8x7b-32768",
                display_name: "Mixtral 8x7B",
                supports_vision: false,
                context_window: 32_768,
            },
            ModelInfo {
                id: "gemma2-9b-it",
                display_name: "Gemma 2 9B",
                supports_vision: false,
                context_window: 8_192,
            },
        ],
        Provider::Test => &[ModelInfo {
            id: "test-model",
            display_name: "Test Model",
            supports_vision: false,
            context_window: 4_096,
        }],
    }
}

/// Look up a model in the catalog of the given provider.
pub fn model_info(provider: Provider, id: &str) -> Option<&'static ModelInfo> {
    models_for(provider).iter().find(|m| m.id == id)
}

/// Rewrites a retired model identifier to its current alias.
///
/// Returns `None` when the identifier needs no migration. Must run before
/// anything else consumes the model id.
pub fn migrate_model_id(provider: Provider, id: &str) -> Option<&'static str> {
    let migrated = match (provider, id) {
        (Provider::Groq, "llama3-70b-8192") => "llama-3.3-70b-versatile",
        (Provider::Groq, "llama-3-70b-8192") => "llama-3.3-70b-versatile",
        (Provider::Groq, "llama3-8b-8192") => "llama-3.1-8b-instant",
        (Provider::Groq, "gemma-7b-it") => "gemma2-9b-it",
        (Provider::Anthropic, "claude-3-7-sonnet-20240229") => "claude-3-7-sonnet-20250219",
        (Provider::Anthropic, "claude-3-5-sonnet-20240620") => "claude-3-5-sonnet-20241022",
        _ => return None,
    };
    Some(migrated)
}
