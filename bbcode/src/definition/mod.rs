mod defaults;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::validator::Validator;

/// Read-only description of one tag.
///
/// A tag name may be defined twice: once for `[name]` and once for
/// `[name=option]`. The two are independent definitions.
#[derive(Clone)]
pub struct TagDefinition {
    name: String,
    html: String,
    preview_html: Option<String>,
    use_option: bool,
    parse_content: bool,
    nest_limit: Option<usize>,
    option_validators: Vec<(String, Arc<dyn Validator>)>,
    body_validator: Option<Arc<dyn Validator>>,
}

impl TagDefinition {
    /// A definition without option that parses nested tags and has no
    /// nesting limit. `html` may use `{param}`, `{option}` and `{<key>}`
    /// placeholders.
    pub fn new(name: impl Into<String>, html: impl Into<String>) -> Self {
        TagDefinition {
            name: name.into(),
            html: html.into(),
            preview_html: None,
            use_option: false,
            parse_content: true,
            nest_limit: None,
            option_validators: Vec::new(),
            body_validator: None,
        }
    }

    /// Require an option (`[name=value]` or `[name key=value ...]`).
    #[must_use]
    pub fn with_option(mut self) -> Self {
        self.use_option = true;
        self
    }

    /// When false, the body is kept as literal text up to the closing tag.
    #[must_use]
    pub fn with_parse_content(mut self, parse_content: bool) -> Self {
        self.parse_content = parse_content;
        self
    }

    /// Maximum number of simultaneously open tags with this name.
    #[must_use]
    pub fn with_nest_limit(mut self, limit: Option<usize>) -> Self {
        self.nest_limit = limit;
        self
    }

    #[must_use]
    pub fn with_preview_html(mut self, preview_html: impl Into<String>) -> Self {
        self.preview_html = Some(preview_html.into());
        self
    }

    /// Validate the option named `key`. Use the tag name for `[name=value]`.
    #[must_use]
    pub fn with_option_validator(
        mut self,
        key: impl Into<String>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        self.option_validators.push((key.into(), validator));
        self
    }

    /// Validate the literal body text. Only consulted when content is not parsed.
    #[must_use]
    pub fn with_body_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.body_validator = Some(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Preview template, falling back to [`html`](Self::html).
    pub fn preview_html(&self) -> &str {
        self.preview_html.as_deref().unwrap_or(&self.html)
    }

    pub fn use_option(&self) -> bool {
        self.use_option
    }

    pub fn parse_content(&self) -> bool {
        self.parse_content
    }

    pub fn nest_limit(&self) -> Option<usize> {
        self.nest_limit
    }

    /// Validator registered for option `key` (ASCII case-insensitive).
    pub fn option_validator(&self, key: &str) -> Option<&dyn Validator> {
        self.option_validators
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_ref())
    }

    pub fn body_validator(&self) -> Option<&dyn Validator> {
        self.body_validator.as_deref()
    }
}

impl fmt::Debug for TagDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let option_validators: Vec<(&str, &str)> = self
            .option_validators
            .iter()
            .map(|(key, v)| (key.as_str(), v.name()))
            .collect();
        f.debug_struct("TagDefinition")
            .field("name", &self.name)
            .field("html", &self.html)
            .field("preview_html", &self.preview_html)
            .field("use_option", &self.use_option)
            .field("parse_content", &self.parse_content)
            .field("nest_limit", &self.nest_limit)
            .field("option_validators", &option_validators)
            .field("body_validator", &self.body_validator.as_ref().map(|v| v.name()))
            .finish()
    }
}

/// What the tree builder asks the lookup about a candidate opening tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagQuery<'a> {
    /// Tag name as written.
    pub name: &'a str,
    /// Whether the tag was written with options.
    pub has_option: bool,
    /// Number of currently open elements with the same name.
    pub open_ancestors: usize,
}

/// Source of tag definitions consulted during a parse.
///
/// Implementations must answer `exists` and `get` consistently for the same
/// query; the parser aborts with
/// [`ParseError::LookupDivergence`](crate::ParseError::LookupDivergence)
/// when they disagree.
pub trait TagLookup {
    fn get(&self, query: &TagQuery<'_>) -> Option<&Arc<TagDefinition>>;

    fn exists(&self, query: &TagQuery<'_>) -> bool {
        self.get(query).is_some()
    }

    /// Whether a written closing name refers to an open element's name.
    fn names_match(&self, written: &str, defined: &str) -> bool {
        written == defined
    }
}

impl<L: TagLookup + ?Sized> TagLookup for &L {
    fn get(&self, query: &TagQuery<'_>) -> Option<&Arc<TagDefinition>> {
        (**self).get(query)
    }

    fn exists(&self, query: &TagQuery<'_>) -> bool {
        (**self).exists(query)
    }

    fn names_match(&self, written: &str, defined: &str) -> bool {
        (**self).names_match(written, defined)
    }
}

/// In-memory definition registry, populated once and then shared by parses.
#[derive(Debug, Clone)]
pub struct DefinitionSet {
    definitions: HashMap<(String, bool), Arc<TagDefinition>>,
    case_sensitive: bool,
}

impl Default for DefinitionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionSet {
    /// An empty set with ASCII case-insensitive tag names.
    pub fn new() -> Self {
        Self::with_case_sensitivity(false)
    }

    /// An empty set with the given case policy. The policy is fixed for the
    /// lifetime of the set, so `b` and `B` are either one tag or two from
    /// the first insert on.
    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        DefinitionSet {
            definitions: HashMap::new(),
            case_sensitive,
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Add a definition, replacing any earlier one with the same name and
    /// option requirement. Returns the replaced definition.
    pub fn insert(&mut self, definition: TagDefinition) -> Option<Arc<TagDefinition>> {
        self.insert_shared(Arc::new(definition))
    }

    pub fn insert_shared(&mut self, definition: Arc<TagDefinition>) -> Option<Arc<TagDefinition>> {
        let key = (self.normalize(definition.name()), definition.use_option());
        self.definitions.insert(key, definition)
    }

    /// Definition for `name`, ignoring nesting limits.
    pub fn definition(&self, name: &str, use_option: bool) -> Option<&Arc<TagDefinition>> {
        self.definitions.get(&(self.normalize(name), use_option))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions sorted by name, option-less first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TagDefinition>> {
        let mut definitions: Vec<_> = self.definitions.iter().collect();
        definitions.sort_by(|(a, _), (b, _)| a.cmp(b));
        definitions.into_iter().map(|(_, definition)| definition)
    }

    fn normalize(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_owned()
        } else {
            name.to_ascii_lowercase()
        }
    }
}

impl TagLookup for DefinitionSet {
    fn get(&self, query: &TagQuery<'_>) -> Option<&Arc<TagDefinition>> {
        let definition = self.definition(query.name, query.has_option)?;
        match definition.nest_limit() {
            Some(limit) if query.open_ancestors >= limit => {
                tracing::trace!(
                    tag = query.name,
                    limit,
                    open = query.open_ancestors,
                    "nesting limit reached"
                );
                None
            }
            _ => Some(definition),
        }
    }

    fn names_match(&self, written: &str, defined: &str) -> bool {
        if self.case_sensitive {
            written == defined
        } else {
            written.eq_ignore_ascii_case(defined)
        }
    }
}
