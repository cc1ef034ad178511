use std::sync::Arc;

use bbcode::{
    DefinitionSet, Document, NodeId, NodeKind, Parser, RecoveryKind, TagDefinition, TagOptions,
    TreeSink, ValidatorSet,
};
use pretty_assertions::assert_eq;

/// Compact tree notation: `"text"`, `name{children}`, `name(k=v){...}`.
fn dump(document: &Document) -> String {
    fn node(document: &Document, id: NodeId, out: &mut Vec<String>) {
        match document.node(id).kind() {
            NodeKind::Root { .. } => unreachable!(),
            NodeKind::Text(text) => out.push(format!("{:?}", text)),
            NodeKind::Element(element) => {
                let mut s = element.tag_name().to_owned();
                if !element.options().is_empty() {
                    let options: Vec<String> = element
                        .options()
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect();
                    s.push_str(&format!("({})", options.join(",")));
                }
                let mut children = Vec::new();
                for &child in element.children() {
                    node(document, child, &mut children);
                }
                s.push_str(&format!("{{{}}}", children.join(" ")));
                out.push(s);
            }
        }
    }
    let mut out = Vec::new();
    for &child in document.children(document.root()) {
        node(document, child, &mut out);
    }
    out.join(" ")
}

fn definitions() -> DefinitionSet {
    definitions_with_case(false)
}

fn definitions_with_case(case_sensitive: bool) -> DefinitionSet {
    let mut set = DefinitionSet::with_case_sensitivity(case_sensitive);
    set.insert(TagDefinition::new("b", "<b>{param}</b>"));
    set.insert(TagDefinition::new("i", "<i>{param}</i>"));
    set.insert(TagDefinition::new("q", "<q>{param}</q>").with_nest_limit(Some(1)));
    set.insert(TagDefinition::new("url", "<a href=\"{option}\">{param}</a>").with_option());
    set.insert(TagDefinition::new("code", "<pre>{param}</pre>").with_parse_content(false));
    set
}

fn parse(input: &str) -> Document {
    Parser::new(&definitions()).parse(input).expect("parse failed")
}

fn assert_no_adjacent_text(document: &Document, id: NodeId) {
    let children = document.children(id);
    for pair in children.windows(2) {
        assert!(
            document.text(pair[0]).is_none() || document.text(pair[1]).is_none(),
            "adjacent text nodes under {:?}",
            id
        );
    }
    for &child in children {
        assert_no_adjacent_text(document, child);
    }
}

#[test]
fn unknown_tags_stay_verbatim() {
    let input = "[nosuchtag]x[/nosuchtag]";
    let document = Parser::new(&DefinitionSet::new()).parse(input).unwrap();
    let children = document.children(document.root());
    assert_eq!(children.len(), 1);
    assert_eq!(document.text(children[0]), Some(input));
}

#[test]
fn text_is_coalesced() {
    let document = parse("ab[b]cd[/b]ef");
    assert_eq!(dump(&document), r#""ab" b{"cd"} "ef""#);
    assert_no_adjacent_text(&document, document.root());
}

#[test]
fn unmatched_closer_is_literal() {
    let (document, recoveries) = Parser::new(&definitions())
        .parse_with_recoveries("[/b]")
        .unwrap();
    assert_eq!(dump(&document), r#""[/b]""#);
    assert_eq!(recoveries.len(), 1);
    assert_eq!(
        recoveries[0].kind,
        RecoveryKind::UnmatchedClosingTag("b".to_owned())
    );
    assert_eq!(recoveries[0].span, 0..4);
}

#[test]
fn end_of_input_closes_implicitly() {
    let document = parse("[b]unterminated");
    assert_eq!(dump(&document), r#"b{"unterminated"}"#);
}

#[test]
fn nesting_limit_rejects_inner_tag() {
    let (document, recoveries) = Parser::new(&definitions())
        .parse_with_recoveries("[q][q]x[/q][/q]")
        .unwrap();
    assert_eq!(dump(&document), r#"q{"[q]x[/q]"}"#);
    assert_eq!(
        recoveries.iter().map(|r| r.kind.clone()).collect::<Vec<_>>(),
        vec![RecoveryKind::NestLimit("q".to_owned())]
    );
    assert_eq!(recoveries[0].span, 3..6);
}

#[test]
fn rejected_closer_inside_other_elements() {
    assert_eq!(
        dump(&parse("[q][q][b]x[/q]y[/q]z")),
        r#"q{"[q]" b{"x[/q]y"}} "z""#
    );
}

#[test]
fn nesting_limit_counts_open_ancestors() {
    let mut set = definitions();
    set.insert(TagDefinition::new("q", "<q>{param}</q>").with_nest_limit(Some(2)));
    let (document, recoveries) = Parser::new(&set)
        .parse_with_recoveries("[q]1[q]2[q]3[/q]4[/q]5[/q]6")
        .unwrap();
    assert_eq!(dump(&document), r#"q{"1" q{"2[q]3[/q]4"} "5"} "6""#);
    assert_eq!(
        recoveries.iter().map(|r| r.kind.clone()).collect::<Vec<_>>(),
        vec![RecoveryKind::NestLimit("q".to_owned())]
    );
    assert_eq!(recoveries[0].span, 8..11);
}

#[test]
fn nesting_limit_ignores_case_of_openers() {
    let (document, recoveries) = Parser::new(&definitions())
        .parse_with_recoveries("[q]a[Q]b[/Q]c[/q]d")
        .unwrap();
    assert_eq!(dump(&document), r#"q{"a[Q]b[/Q]c"} "d""#);
    assert_eq!(
        recoveries[0].kind,
        RecoveryKind::NestLimit("Q".to_owned())
    );
}

#[test]
fn nesting_limit_allows_siblings() {
    assert_eq!(dump(&parse("[q]a[/q][q]b[/q]")), r#"q{"a"} q{"b"}"#);
}

#[test]
fn plain_text_round_trips() {
    for input in ["", "hello", "multi\nline\ttext", "back\\slash", "ünïcödé ✓"] {
        let document = parse(input);
        if input.is_empty() {
            assert!(document.is_empty());
        } else {
            assert_eq!(document.children(document.root()).len(), 1);
            assert_eq!(document.text_content(document.root()), input);
        }
        assert_eq!(document.to_string(), input);
    }
}

#[test]
fn closing_tag_closes_open_descendants() {
    let document = parse("[b]1[i]2[/b]3");
    assert_eq!(dump(&document), r#"b{"1" i{"2"}} "3""#);
}

#[test]
fn closing_tag_matches_nearest_ancestor() {
    let document = parse("[b]1[b]2[/b]3[/b]4");
    assert_eq!(dump(&document), r#"b{"1" b{"2"} "3"} "4""#);
}

#[test]
fn closing_tag_with_several_options_is_literal() {
    let (document, recoveries) = Parser::new(&definitions())
        .parse_with_recoveries("[b]x[/b a=1 c=2]")
        .unwrap();
    assert_eq!(dump(&document), r#"b{"x[/b a=1 c=2]"}"#);
    assert_eq!(
        recoveries[0].kind,
        RecoveryKind::MalformedClosingTag("b".to_owned())
    );
}

#[test]
fn unterminated_bracket_keeps_captured_text() {
    let (document, recoveries) = Parser::new(&definitions())
        .parse_with_recoveries("a[b c")
        .unwrap();
    assert_eq!(dump(&document), r#""a[b c""#);
    assert_eq!(recoveries[0].kind, RecoveryKind::Unterminated);
    assert_eq!(recoveries[0].span, 1..5);
}

#[test]
fn nested_open_bracket_restarts_scan() {
    assert_eq!(dump(&parse("[[b]x")), r#""[" b{"x"}"#);
    assert_eq!(dump(&parse("[[[[")), r#""[[[[""#);
}

#[test]
fn empty_tag_name_is_literal() {
    let (document, recoveries) = Parser::new(&definitions())
        .parse_with_recoveries("[]x[=y]")
        .unwrap();
    assert_eq!(dump(&document), r#""[]x[=y]""#);
    assert!(recoveries.iter().all(|r| r.kind == RecoveryKind::EmptyTagName));
}

#[test]
fn option_presence_selects_definition() {
    // url is only defined with an option.
    assert_eq!(
        dump(&parse("[url=http://a.b]x[/url]")),
        r#"url(url=http://a.b){"x"}"#
    );
    assert_eq!(dump(&parse("[url]x[/url]")), r#""[url]x[/url]""#);
    // b is only defined without one.
    assert_eq!(dump(&parse("[b=1]x")), r#""[b=1]x""#);
}

#[test]
fn raw_content_is_not_parsed() {
    let document = parse("[code][b]x[/b] [/nope][/code]after");
    assert_eq!(dump(&document), r#"code{"[b]x[/b] [/nope]"} "after""#);
}

#[test]
fn raw_element_closes_at_end_of_input() {
    let (document, recoveries) = Parser::new(&definitions())
        .parse_with_recoveries("[code]a[0")
        .unwrap();
    assert_eq!(dump(&document), r#"code{"a[0"}"#);
    assert!(recoveries.is_empty());
}

#[test]
fn tag_names_are_case_insensitive_by_default() {
    assert_eq!(dump(&parse("[B]x[/b]y")), r#"b{"x"} "y""#);
}

#[test]
fn case_sensitive_definitions() {
    let set = definitions_with_case(true);
    let document = Parser::new(&set).parse("[B]x[/B][b]y[/B]").unwrap();
    assert_eq!(dump(&document), r#""[B]x[/B]" b{"y[/B]"}"#);
}

#[test]
fn stray_close_bracket_is_text() {
    assert_eq!(dump(&parse("a]b[b]c]d")), r#""a]b" b{"c]d"}"#);
}

#[test]
fn escaped_brackets_are_literal() {
    let document = parse(r"\[b\]x");
    assert_eq!(dump(&document), r#""[b]x""#);
    assert_eq!(document.to_string(), r"\[b\]x");
}

#[test]
fn node_ids_are_assigned_in_creation_order() {
    let document = parse("a[b]c[/b]d");
    let ids: Vec<usize> = document
        .descendants(document.root())
        .map(NodeId::index)
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(document.len(), 5);
}

#[test]
fn elements_by_tag_name_collects_nested() {
    let document = parse("[b]1[i]2[b]3[/b][/i][/b][b]4[/b]");
    let found: Vec<String> = document
        .elements_by_tag_name("b")
        .into_iter()
        .map(|id| document.text_content(id))
        .collect();
    assert_eq!(found, vec!["123", "3", "4"]);
}

#[test]
fn elements_matching_follows_case_policy() {
    let document = parse("[B]1[/B][b]2[/b]");
    assert_eq!(document.elements_by_tag_name("B").len(), 0);
    assert_eq!(document.elements_matching("B", &definitions()).len(), 2);

    let set = definitions_with_case(true);
    let document = Parser::new(&set).parse("[B]1[/B][b]2[/b]").unwrap();
    assert_eq!(document.elements_matching("b", &set).len(), 1);
    assert_eq!(document.elements_matching("B", &set).len(), 0);
}

#[test]
fn serialization_reparses_to_the_same_tree() {
    let set = DefinitionSet::with_defaults(&ValidatorSet::with_builtins());
    let parser = Parser::new(&set);
    let inputs = [
        "[b]bold [i]both[/b] after",
        "[url=http://example.com]link[/url] [img]http://x/y.png[/img]",
        "[quote=\"Jane Doe\"]hi[/quote][code][b][/code]",
        "[nosuchtag]x[/nosuchtag] [/b] [b",
    ];
    for input in inputs {
        let first = parser.parse(input).unwrap();
        let second = parser.parse(&first.to_string()).unwrap();
        assert_eq!(dump(&first), dump(&second), "input: {input}");
    }
}

#[test]
fn trailing_backslash_survives_serialization() {
    let document = parse(r"[b]C:\");
    assert_eq!(dump(&document), r#"b{"C:\\"}"#);
    assert_eq!(document.to_string(), r"[b]C:\\[/b]");

    for input in [r"[b]C:\", r"a\\[b]x\\\[\\", r"[code]\\[/code]x\", r"\[i\]\\[i]"] {
        let first = parse(input);
        let second = parse(&first.to_string());
        assert_eq!(dump(&first), dump(&second), "input: {input}");
    }
}

#[test]
fn parsing_is_deterministic() {
    let input = "[b]x[q]y[q]z[/q][/b][url=http://a]w";
    assert_eq!(dump(&parse(input)), dump(&parse(input)));
}

/// A sink that records the shape of the tree as events.
#[derive(Default)]
struct EventSink {
    events: Vec<String>,
    next: usize,
}

impl TreeSink for EventSink {
    type Handle = usize;

    fn root(&self) -> usize {
        0
    }

    fn append_text(&mut self, parent: usize, text: &str) {
        self.events.push(format!("{parent}:text:{text}"));
    }

    fn append_element(
        &mut self,
        parent: usize,
        definition: Arc<TagDefinition>,
        _options: TagOptions,
    ) -> usize {
        self.next += 1;
        self.events
            .push(format!("{parent}:{}#{}", definition.name(), self.next));
        self.next
    }
}

#[test]
fn custom_sink_receives_the_parse() {
    let mut sink = EventSink::default();
    let recoveries = Parser::new(&definitions())
        .parse_into("x[b]y[/b]z", &mut sink)
        .unwrap();
    assert!(recoveries.is_empty());
    assert_eq!(
        sink.events,
        vec!["0:text:x", "0:b#1", "1:text:y", "0:text:z"]
    );
}

#[test]
fn concurrent_parses_share_definitions() {
    let set = Arc::new(definitions());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let set = Arc::clone(&set);
            std::thread::spawn(move || {
                let input = format!("[b]{i}[/b]");
                let document = Parser::new(set.as_ref()).parse(&input).unwrap();
                dump(&document)
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!(r#"b{{"{i}"}}"#));
    }
}
