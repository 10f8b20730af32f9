pub(crate) mod anthropic;
pub(crate) mod llm;
pub(crate) mod openai;
pub(crate) mod test_provider;
