use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::validator::Validator;

const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "mailto"];

static CSS_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[a-z]+|#[0-9a-f]{3}|#[0-9a-f]{6}|rgb\(\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*\))$",
    )
    .expect("valid regex")
});

/// Absolute URLs with an http, https, ftp or mailto scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlValidator;

impl Validator for UrlValidator {
    fn name(&self) -> &str {
        "url"
    }

    fn validate(&self, input: &str) -> bool {
        Url::parse(input.trim()).is_ok_and(|url| URL_SCHEMES.contains(&url.scheme()))
    }
}

/// Named colours, `#rgb`, `#rrggbb` and `rgb(r, g, b)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssColorValidator;

impl Validator for CssColorValidator {
    fn name(&self) -> &str {
        "css_color"
    }

    fn validate(&self, input: &str) -> bool {
        CSS_COLOR.is_match(input.trim())
    }
}

/// Non-negative integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberValidator;

impl Validator for NumberValidator {
    fn name(&self) -> &str {
        "number"
    }

    fn validate(&self, input: &str) -> bool {
        let input = input.trim();
        !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
    }
}

/// The supplied pattern could not be compiled.
#[derive(Debug, thiserror::Error)]
#[error("invalid pattern for validator `{name}`: {source}")]
pub struct PatternError {
    name: String,
    #[source]
    source: regex::Error,
}

/// Inputs matching a user-supplied regular expression.
///
/// The pattern is matched against the trimmed input and is not anchored
/// implicitly; use `^...$` to match the whole input.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    name: String,
    pattern: Regex,
}

impl PatternValidator {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, PatternError> {
        let name = name.into();
        match Regex::new(pattern) {
            Ok(pattern) => Ok(PatternValidator { name, pattern }),
            Err(source) => Err(PatternError { name, source }),
        }
    }
}

impl Validator for PatternValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, input: &str) -> bool {
        self.pattern.is_match(input.trim())
    }
}
