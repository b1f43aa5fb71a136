use crate::locale::Language;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_HINT_BUDGET: u32 = 1024;
pub const DEFAULT_ANALYSIS_BUDGET: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got `{value}`")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key}: {message}")]
    InvalidLanguage { key: &'static str, message: String },

    #[error("analysis budget ({analysis}) must be larger than hint budget ({hint})")]
    BudgetOrder { hint: u32, analysis: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub hint_budget: u32,
    pub analysis_budget: u32,
    pub language: Language,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            hint_budget: DEFAULT_HINT_BUDGET,
            analysis_budget: DEFAULT_ANALYSIS_BUDGET,
            language: Language::default(),
        }
    }
}

impl TutorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Values are
    /// trimmed and empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        let api_key = value("GEMINI_API_KEY").or_else(|| value("GOOGLE_API_KEY"));
        let api_base = value("GEMINI_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .unwrap_or(defaults.api_base);
        let model = value("TUTORLENS_MODEL").unwrap_or(defaults.model);

        let hint_budget = parse_budget("TUTORLENS_HINT_BUDGET", value("TUTORLENS_HINT_BUDGET"))?
            .unwrap_or(defaults.hint_budget);
        let analysis_budget =
            parse_budget("TUTORLENS_ANALYSIS_BUDGET", value("TUTORLENS_ANALYSIS_BUDGET"))?
                .unwrap_or(defaults.analysis_budget);
        if analysis_budget <= hint_budget {
            return Err(ConfigError::BudgetOrder {
                hint: hint_budget,
                analysis: analysis_budget,
            });
        }

        let language = match value("TUTORLENS_LANGUAGE") {
            Some(raw) => raw.parse::<Language>().map_err(|message| ConfigError::InvalidLanguage {
                key: "TUTORLENS_LANGUAGE",
                message,
            })?,
            None => defaults.language,
        };

        Ok(Self {
            api_key,
            api_base,
            model,
            hint_budget,
            analysis_budget,
            language,
        })
    }
}

fn parse_budget(key: &'static str, raw: Option<String>) -> Result<Option<u32>, ConfigError> {
    raw.map(|value| {
        value
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber { key, value })
    })
    .transpose()
}
