//! Tag and validator configuration.
//!
//! Parses `bbcode.toml` with serde. Without an explicit path the file is
//! searched for in the current directory and its parents; when none is
//! found the default tag set is used.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bbcode::validator::{PatternError, PatternValidator};
use bbcode::{DefinitionSet, TagDefinition, ValidatorSet};
use serde::Deserialize;

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "bbcode.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Match tag names exactly instead of ASCII case-insensitively.
    pub case_sensitive: bool,
    /// Start from the built-in tag set. Configured tags override it.
    pub defaults: bool,
    /// Extra validators, referenced by name from tags.
    #[serde(rename = "validator")]
    pub validators: Vec<ValidatorConfig>,
    #[serde(rename = "tag")]
    pub tags: Vec<TagConfig>,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            defaults: true,
            validators: Vec::new(),
            tags: Vec::new(),
            config_path: None,
        }
    }
}

/// A regular-expression validator.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    pub name: String,
    pub pattern: String,
}

/// One `[[tag]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagConfig {
    pub name: String,
    pub html: String,
    #[serde(default)]
    pub preview_html: Option<String>,
    #[serde(default)]
    pub use_option: bool,
    #[serde(default = "default_parse_content")]
    pub parse_content: bool,
    /// Negative means unlimited.
    #[serde(default = "default_nest_limit")]
    pub nest_limit: i64,
    /// Validator for the tag's own option (`[name=value]`).
    #[serde(default)]
    pub option_validator: Option<String>,
    #[serde(default)]
    pub body_validator: Option<String>,
}

fn default_parse_content() -> bool {
    true
}

fn default_nest_limit() -> i64 {
    -1
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("tag #{index}: tag name must not be empty")]
    EmptyTagName { index: usize },
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

impl Config {
    /// Load `config_path`, or the discovered `bbcode.toml`, or defaults.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit `config_path` doesn't exist or a file
    /// cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }

        match Self::discover_config() {
            Some(discovered) => Self::load_from_file(&discovered),
            None => Ok(Self::default()),
        }
    }

    /// Search for the config file in the current directory and parents.
    #[must_use]
    pub fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), tags = config.tags.len(), "loaded configuration");
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Built-in validators plus the configured ones, which override
    /// built-ins of the same name.
    pub fn validators(&self) -> Result<ValidatorSet, ConfigError> {
        let mut set = ValidatorSet::with_builtins();
        for validator in &self.validators {
            let pattern = PatternValidator::new(&validator.name, &validator.pattern)?;
            if set.register(pattern).is_some() {
                tracing::debug!(validator = %validator.name, "validator overridden");
            }
        }
        Ok(set)
    }

    /// Resolve validators and build the tag definitions.
    ///
    /// A tag naming an unknown validator keeps the tag but drops the
    /// validator, with a warning.
    pub fn definitions(&self, validators: &ValidatorSet) -> Result<DefinitionSet, ConfigError> {
        let mut set = DefinitionSet::with_case_sensitivity(self.case_sensitive);
        if self.defaults {
            set.insert_defaults(validators);
        }

        for (index, tag) in self.tags.iter().enumerate() {
            let definition = tag.to_definition(validators, index)?;
            if set.insert(definition).is_some() {
                tracing::debug!(tag = %tag.name, use_option = tag.use_option, "tag overridden");
            }
        }

        Ok(set)
    }
}

impl TagConfig {
    fn to_definition(
        &self,
        validators: &ValidatorSet,
        index: usize,
    ) -> Result<TagDefinition, ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyTagName { index });
        }

        let nest_limit = usize::try_from(self.nest_limit).ok();
        let mut definition = TagDefinition::new(&self.name, &self.html)
            .with_parse_content(self.parse_content)
            .with_nest_limit(nest_limit);
        if self.use_option {
            definition = definition.with_option();
        }
        if let Some(preview_html) = &self.preview_html {
            definition = definition.with_preview_html(preview_html);
        }
        if let Some(validator) = self.resolve(validators, self.option_validator.as_deref()) {
            definition = definition.with_option_validator(&self.name, validator);
        }
        if let Some(validator) = self.resolve(validators, self.body_validator.as_deref()) {
            definition = definition.with_body_validator(validator);
        }
        Ok(definition)
    }

    fn resolve(
        &self,
        validators: &ValidatorSet,
        name: Option<&str>,
    ) -> Option<Arc<dyn bbcode::Validator>> {
        let name = name?;
        let validator = validators.get(name);
        if validator.is_none() {
            tracing::warn!(tag = %self.name, validator = name, "unknown validator, ignoring");
        }
        validator
    }
}
