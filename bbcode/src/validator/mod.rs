mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

pub use builtin::{CssColorValidator, NumberValidator, PatternError, PatternValidator, UrlValidator};

/// Accepts or rejects an option value or a tag body.
///
/// Validators are shared across parses and threads; they must not hold
/// per-parse state.
pub trait Validator: Send + Sync {
    /// Name used to reference the validator from configuration.
    fn name(&self) -> &str;

    fn validate(&self, input: &str) -> bool;
}

/// Named, live validator instances.
#[derive(Clone, Default)]
pub struct ValidatorSet {
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        ValidatorSet::default()
    }

    /// `url`, `css_color` and `number`.
    pub fn with_builtins() -> Self {
        let mut set = ValidatorSet::new();
        set.register(UrlValidator);
        set.register(CssColorValidator);
        set.register(NumberValidator);
        set
    }

    /// Add or replace a validator under its own name.
    pub fn register(&mut self, validator: impl Validator + 'static) -> Option<Arc<dyn Validator>> {
        self.register_shared(Arc::new(validator))
    }

    pub fn register_shared(&mut self, validator: Arc<dyn Validator>) -> Option<Arc<dyn Validator>> {
        self.validators.insert(validator.name().to_owned(), validator)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Validator>> {
        self.validators.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NonEmpty;

    impl Validator for NonEmpty {
        fn name(&self) -> &str {
            "url"
        }

        fn validate(&self, input: &str) -> bool {
            !input.is_empty()
        }
    }

    #[test]
    fn builtins_are_registered() {
        let set = ValidatorSet::with_builtins();
        assert_eq!(set.names(), vec!["css_color", "number", "url"]);
    }

    #[test]
    fn register_overrides_by_name() {
        let mut set = ValidatorSet::with_builtins();
        let previous = set.register(NonEmpty);
        assert!(previous.is_some());
        let url = set.get("url").unwrap();
        assert!(url.validate("not a url"));
        assert!(!url.validate(""));
    }
}
