use crate::completion::ChatModel;
use crate::config::Config;
use crate::model::Provider;
use crate::provider::anthropic::AnthropicModel;
use crate::provider::openai::OpenAiCompatModel;
use crate::provider::test_provider::TestProviderModel;
use anyhow::Result;
use tracing::instrument;

/// Build the chat model for the configured provider. Constructed per
/// completion so that configuration changes take effect on the next turn.
#[instrument(skip(config), fields(provider = %config.api_provider, model = %config.model))]
pub fn get_chat_model(config: &Config) -> Result<Box<dyn ChatModel>> {
    let model: Box<dyn ChatModel> = match config.api_provider {
        Provider::Anthropic => Box::new(AnthropicModel::new(&config.api_key, &config.model, None)?),
        Provider::Test => Box::new(TestProviderModel::new(&config.model)),
        provider => Box::new(OpenAiCompatModel::new(
            provider,
            &config.api_key,
            &config.model,
            None,
        )?),
    };
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_an_error() {
        let config = Config {
            api_provider: Provider::Anthropic,
            api_key: String::new(),
            ..Config::default()
        };
        let err = get_chat_model(&config).err().unwrap();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        let config = Config {
            api_provider: Provider::Mistral,
            api_key: String::new(),
            ..Config::default()
        };
        let err = get_chat_model(&config).err().unwrap();
        assert!(err.to_string().contains("MISTRAL_API_KEY"));
    }

    #[test]
    fn test_test_provider_needs_no_key() {
        let config = Config {
            api_provider: Provider::Test,
            api_key: String::new(),
            model: "test-model".to_string(),
            ..Config::default()
        };
        assert!(get_chat_model(&config).is_ok());
    }

    #[test]
    fn test_openai_compat_providers_build() {
        for provider in [
            Provider::Openai,
            Provider::Openrouter,
            Provider::Gemini,
            Provider::Mistral,
            Provider::Groq,
        ] {
            let config = Config {
                api_provider: provider,
                api_key: "sk-test".to_string(),
                model: provider.default_model().to_string(),
                ..Config::default()
            };
            assert!(get_chat_model(&config).is_ok(), "{provider} should build");
        }
    }
}
