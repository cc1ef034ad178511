use crate::definition::{DefinitionSet, TagDefinition};
use crate::validator::ValidatorSet;

impl DefinitionSet {
    /// The conventional tag set with case-insensitive names.
    /// See [`insert_defaults`](Self::insert_defaults).
    pub fn with_defaults(validators: &ValidatorSet) -> Self {
        let mut set = DefinitionSet::new();
        set.insert_defaults(validators);
        set
    }

    /// Add the conventional tags: `b`, `i`, `u`, `s`, `url`, `img`,
    /// `color`, `quote` and `code`, keyed under this set's case policy.
    ///
    /// Validators are taken from `validators` by name (`url`, `css_color`);
    /// a missing validator leaves the corresponding input unchecked.
    pub fn insert_defaults(&mut self, validators: &ValidatorSet) {
        let url = validators.get("url");
        let color = validators.get("css_color");

        self.insert(TagDefinition::new("b", "<strong>{param}</strong>"));
        self.insert(TagDefinition::new("i", "<em>{param}</em>"));
        self.insert(TagDefinition::new("u", "<u>{param}</u>"));
        self.insert(TagDefinition::new("s", "<del>{param}</del>"));
        self.insert(TagDefinition::new("quote", "<blockquote>{param}</blockquote>"));
        self.insert(
            TagDefinition::new(
                "quote",
                "<blockquote><cite>{option}</cite>{param}</blockquote>",
            )
            .with_option(),
        );
        self.insert(
            TagDefinition::new("code", "<pre><code>{param}</code></pre>").with_parse_content(false),
        );

        let mut link = TagDefinition::new("url", r#"<a href="{param}">{param}</a>"#)
            .with_parse_content(false);
        let mut titled_link =
            TagDefinition::new("url", r#"<a href="{option}">{param}</a>"#).with_option();
        let mut image = TagDefinition::new("img", r#"<img src="{param}" alt="">"#)
            .with_parse_content(false);
        if let Some(url) = url {
            link = link.with_body_validator(url.clone());
            titled_link = titled_link.with_option_validator("url", url.clone());
            image = image.with_body_validator(url);
        }
        self.insert(link);
        self.insert(titled_link);
        self.insert(image);

        let mut colored = TagDefinition::new("color", r#"<span style="color: {option}">{param}</span>"#)
            .with_option();
        if let Some(color) = color {
            colored = colored.with_option_validator("color", color);
        }
        self.insert(colored);
    }
}
