//! REPL settings read from the environment.

use std::path::PathBuf;
use thiserror::Error;

pub const HISTORY_ENV_VAR: &str = "LAZYSCHEME_HISTORY";
pub const EDIT_MODE_ENV_VAR: &str = "LAZYSCHEME_EDIT_MODE";
pub const PROMPT_ENV_VAR: &str = "LAZYSCHEME_PROMPT";

const DEFAULT_HISTORY_FILE: &str = "lazyscheme_history.txt";
const DEFAULT_PROMPT: &str = "lazy> ";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Config Error: {var} must be 'vi' or 'emacs', got '{value}'")]
    InvalidEditMode { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Vi,
    Emacs,
}

impl std::str::FromStr for EditMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vi" => Ok(EditMode::Vi),
            "emacs" => Ok(EditMode::Emacs),
            _ => Err(ConfigError::InvalidEditMode {
                var: EDIT_MODE_ENV_VAR,
                value: s.to_string(),
            }),
        }
    }
}

impl From<EditMode> for rustyline::EditMode {
    fn from(mode: EditMode) -> Self {
        match mode {
            EditMode::Vi => rustyline::EditMode::Vi,
            EditMode::Emacs => rustyline::EditMode::Emacs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplConfig {
    pub history_file: PathBuf,
    pub edit_mode: EditMode,
    pub prompt: String,
}

impl Default for ReplConfig {
    fn default() -> Self {
        ReplConfig {
            history_file: PathBuf::from(DEFAULT_HISTORY_FILE),
            edit_mode: EditMode::default(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl ReplConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from `lookup`, falling back to defaults for unset
    /// or empty variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value: &String| !value.is_empty());
        let mut config = ReplConfig::default();
        if let Some(path) = get(HISTORY_ENV_VAR) {
            config.history_file = PathBuf::from(path);
        }
        if let Some(mode) = get(EDIT_MODE_ENV_VAR) {
            config.edit_mode = mode.parse()?;
        }
        if let Some(prompt) = get(PROMPT_ENV_VAR) {
            config.prompt = prompt;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ReplConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ReplConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config_from(&[]), Ok(ReplConfig::default()));
        assert_eq!(config_from(&[(PROMPT_ENV_VAR, "")]), Ok(ReplConfig::default()));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (HISTORY_ENV_VAR, "/tmp/hist"),
            (EDIT_MODE_ENV_VAR, "Emacs"),
            (PROMPT_ENV_VAR, "> "),
        ])
        .expect("valid config");
        assert_eq!(config.history_file, PathBuf::from("/tmp/hist"));
        assert_eq!(config.edit_mode, EditMode::Emacs);
        assert_eq!(config.prompt, "> ");
        assert_eq!(
            rustyline::EditMode::from(config.edit_mode),
            rustyline::EditMode::Emacs
        );
    }

    #[test]
    fn test_invalid_edit_mode() {
        assert_eq!(
            config_from(&[(EDIT_MODE_ENV_VAR, "nano")]),
            Err(ConfigError::InvalidEditMode {
                var: EDIT_MODE_ENV_VAR,
                value: "nano".to_string(),
            })
        );
    }
}
