//! Named system-prompt presets that alter assistant behaviour.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Assistant,
    Code,
    Sql,
    Data,
    Explain,
}

pub const ALL_MODES: &[Mode] = &[
    Mode::Assistant,
    Mode::Code,
    Mode::Sql,
    Mode::Data,
    Mode::Explain,
];

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Assistant => "assistant",
            Mode::Code => "code",
            Mode::Sql => "sql",
            Mode::Data => "data",
            Mode::Explain => "explain",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Mode::Assistant => "General purpose assistant",
            Mode::Code => "Programming help and code generation",
            Mode::Sql => "SQL query authoring and tuning",
            Mode::Data => "Data analysis and transformation",
            Mode::Explain => "Step-by-step explanations",
        }
    }

    /// System prompt sent with every completion in this mode.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Mode::Assistant => {
                "You are Pilot, an AI assistant. You are helpful, honest and \
                 concise in your responses. You can assist with a wide range of \
                 tasks while being mindful of limitations."
            }
            Mode::Code => {
                "You are Pilot, a coding assistant. You help users with \
                 programming tasks, explain code, debug issues and suggest \
                 improvements. When asked to write code, provide well-documented, \
                 efficient solutions."
            }
            Mode::Sql => {
                "You are Pilot, a SQL assistant. You help users write, explain \
                 and optimize SQL queries. Prefer standard SQL and call out \
                 dialect-specific syntax when you use it."
            }
            Mode::Data => {
                "You are Pilot, a data analysis assistant. You help users \
                 explore, clean and summarize datasets, and suggest suitable \
                 analyses and visualizations."
            }
            Mode::Explain => {
                "You are Pilot, a patient teacher. Explain concepts step by \
                 step, starting from first principles and building up with \
                 concrete examples."
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assistant" => Ok(Mode::Assistant),
            "code" => Ok(Mode::Code),
            "sql" => Ok(Mode::Sql),
            "data" => Ok(Mode::Data),
            "explain" => Ok(Mode::Explain),
            other => Err(format!("Unknown mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for mode in ALL_MODES {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), *mode);
        }
        assert!("bogus".parse::<Mode>().is_err());
    }

    #[test]
    fn test_system_prompts_not_empty() {
        for mode in ALL_MODES {
            assert!(!mode.system_prompt().is_empty());
            assert!(!mode.description().is_empty());
        }
    }
}
