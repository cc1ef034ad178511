use std::sync::Arc;

use crate::definition::TagDefinition;
use crate::document::NodeId;

/// Options written inside a tag's opening brackets, in source order.
///
/// `[url=https://example.com]` has one option keyed by the tag name;
/// `[img width=10 height=20]` has three: `img` (empty), `width` and `height`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
    entries: Vec<(String, String)>,
}

impl TagOptions {
    pub fn new() -> Self {
        TagOptions::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Insert an option. A repeated key replaces the earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive key lookup.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The value when exactly one option was given.
    pub fn single(&self) -> Option<&str> {
        match self.entries.as_slice() {
            [(_, value)] => Some(value),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = TagOptions::new();
        for (key, value) in iter {
            options.insert(key, value);
        }
        options
    }
}

/// A recognised tag instance.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) definition: Arc<TagDefinition>,
    pub(crate) options: TagOptions,
    pub(crate) children: Vec<NodeId>,
}

impl Element {
    pub fn tag_name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &TagDefinition {
        &self.definition
    }

    pub fn options(&self) -> &TagOptions {
        &self.options
    }

    /// The tag's own option (`[url=...]`), or the only option given.
    pub fn option(&self) -> Option<&str> {
        self.options
            .get_ignore_case(self.tag_name())
            .or_else(|| self.options.single())
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
