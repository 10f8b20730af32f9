use once_cell::sync::Lazy;
use std::path::PathBuf;

static DEFAULT_DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::data_local_dir()
        .map(|p| p.join("pilot"))
        .unwrap_or_else(|| PathBuf::from("~/.local/share/pilot"))
});

// DEFAULT_CONFIG_DIR is a fallback; get_config_dir checks XDG_CONFIG_HOME first.
static DEFAULT_CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::config_dir()
        .map(|p| p.join("pilot"))
        .unwrap_or_else(|| PathBuf::from("~/.config/pilot"))
});

pub fn get_config_dir() -> PathBuf {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home).join("pilot")
    } else {
        DEFAULT_CONFIG_DIR.clone()
    }
}

pub fn get_data_dir() -> std::io::Result<PathBuf> {
    let path = if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data_home).join("pilot")
    } else {
        DEFAULT_DATA_DIR.clone()
    };
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Template for a `.env` file listing the API key variable of every
/// supported provider.
pub fn env_template() -> &'static str {
    r#"# Pilot API keys
# Uncomment and add your API keys below

# Anthropic (Claude)
# ANTHROPIC_API_KEY=your_key_here

# OpenAI
# OPENAI_API_KEY=your_key_here

# OpenRouter
# OPENROUTER_API_KEY=your_key_here

# Google Gemini
# GOOGLE_API_KEY=your_key_here

# Mistral
# MISTRAL_API_KEY=your_key_here

# Groq
# GROQ_API_KEY=your_key_here
"#
}
