use jinja_lens::{Action, CompletionType, Engine, Position, Range};

fn pos(line: u32, character: u32) -> Position {
    Position::new(line, character)
}

fn action(name: &str, description: &str) -> Option<Vec<Action>> {
    Some(vec![Action {
        name: name.to_string(),
        description: description.to_string(),
    }])
}

#[test]
fn partial_word_is_replaced() {
    let engine = Engine::default();
    engine.add_one(1, "page.html", "{% set abc = 1 %}{{ ab", 0, "html", None);

    let items = engine.complete(1, "page.html", 0, pos(0, 22)).unwrap();
    let abc = items.iter().find(|item| item.label == "abc").unwrap();
    assert_eq!(abc.completion_type, CompletionType::Identifier);
    assert_eq!(abc.replace_range, Some(Range::new(pos(0, 20), pos(0, 22))));
    assert_eq!(abc.insert_range, None);
    // 局部变量排在内置名字前面
    assert_eq!(items[0].label, "abc");
    assert!(items.iter().any(|item| item.label == "range"));
}

#[test]
fn pipe_offers_filters_and_tag_offers_snippets() {
    let engine = Engine::default();
    engine.add_one(1, "page.html", "{{ name | }}", 0, "html", None);
    let filters = engine.complete(1, "page.html", 0, pos(0, 10)).unwrap();
    assert!(!filters.is_empty());
    assert!(filters.iter().all(|item| item.completion_type == CompletionType::Filter));
    assert!(filters.iter().any(|item| item.label == "upper"));
    assert_eq!(filters[0].insert_range, Some(Range::empty(pos(0, 10))));

    engine.add_one(2, "block.html", "{% ", 0, "html", None);
    let snippets = engine.complete(2, "block.html", 0, pos(0, 3)).unwrap();
    assert!(snippets.iter().all(|item| item.completion_type == CompletionType::Snippet));
    assert!(snippets.iter().any(|item| item.label == "for1"));
}

#[test]
fn snippet_adds_leading_space_only_when_missing() {
    let engine = Engine::default();
    engine.add_one(1, "spaced.html", "{% ", 0, "html", None);
    let items = engine.complete(1, "spaced.html", 0, pos(0, 3)).unwrap();
    let text = items[0].new_text.as_deref().unwrap();
    assert!(!text.starts_with(' '), "{:?}", text);

    engine.add_one(2, "tight.html", "{%", 0, "html", None);
    let items = engine.complete(2, "tight.html", 0, pos(0, 2)).unwrap();
    let text = items[0].new_text.as_deref().unwrap();
    assert!(text.starts_with(' '), "{:?}", text);
    assert_eq!(items[0].insert_range, Some(Range::empty(pos(0, 2))));
}

#[test]
fn loop_variable_completes_at_end_of_unclosed_loop() {
    let engine = Engine::default();
    engine.add_one(1, "page.html", "{% for item in items %}\n{{ it", 0, "html", None);

    let items = engine.complete(1, "page.html", 0, pos(1, 5)).unwrap();
    let item = items.iter().find(|i| i.label == "item").expect("loop target is offered");
    assert_eq!(item.replace_range, Some(Range::new(pos(1, 3), pos(1, 5))));
    assert!(items.iter().any(|i| i.label == "loop"));
}

#[test]
fn macro_parameter_completes_at_end_of_unclosed_macro() {
    let engine = Engine::default();
    engine.add_one(1, "page.html", "{% macro m(arg) %}{{ ", 0, "html", None);

    let items = engine.complete(1, "page.html", 0, pos(0, 21)).unwrap();
    assert!(items.iter().any(|i| i.label == "arg"));
    assert!(items.iter().any(|i| i.label == "m"));
}

#[test]
fn include_string_offers_other_templates() {
    let engine = Engine::default();
    engine.add_one(1, "/srv/base.html", "<html></html>", 0, "html", None);
    engine.add_one(2, "/srv/page.html", r#"{% include "" %}"#, 0, "html", None);

    let items = engine.complete(2, "/srv/page.html", 0, pos(0, 12)).unwrap();
    let labels: Vec<_> = items.iter().map(|item| item.label.as_str()).collect();
    assert_eq!(labels, vec!["base.html"]);
}

#[test]
fn plain_text_has_no_completion() {
    let engine = Engine::default();
    engine.add_one(1, "page.html", "<p>hello</p>", 0, "html", None);
    assert!(engine.complete(1, "page.html", 0, pos(0, 5)).is_none());
}

#[test]
fn link_hint_lifecycle() {
    let engine = Engine::default();
    engine.add_one(1, "page.html", r#"{{ "/users" }}"#, 0, "html", None);
    engine.add_link_hints("file:///routes.py", action("/users", "Users page"));

    let hover = engine.hover(1, "page.html", 0, pos(0, 5)).unwrap();
    assert_eq!(hover.value, "Users page");
    let locations = engine.goto_definition(1, "page.html", 0, pos(0, 5)).unwrap();
    assert_eq!(locations[0].uri, "file:///routes.py");

    // 未保存的提示可以丢弃
    engine.remove_temp_link_hint(None);
    let hover = engine.hover(1, "page.html", 0, pos(0, 5)).unwrap();
    assert_ne!(hover.value, "Users page");
    assert!(engine.goto_definition(1, "page.html", 0, pos(0, 5)).unwrap().is_empty());

    // 保存之后不再被丢弃
    engine.add_link_hints("file:///routes.py", action("/users", "Users page"));
    engine.save_link_hint(None, Some("/users"));
    engine.remove_temp_link_hint(Some("/users"));
    engine.remove_temp_link_hint(None);
    let hover = engine.hover(1, "page.html", 0, pos(0, 5)).unwrap();
    assert_eq!(hover.value, "Users page");

    let items = engine.complete(1, "page.html", 0, pos(0, 5)).unwrap();
    assert_eq!(items[0].label, "/users");
    assert_eq!(items[0].replace_range, Some(Range::new(pos(0, 4), pos(0, 5))));
}

#[test]
fn filter_hover_shows_documentation() {
    let engine = Engine::default();
    engine.add_one(1, "page.html", "{{ name | upper }}", 0, "html", None);
    let hover = engine.hover(1, "page.html", 0, pos(0, 11)).unwrap();
    assert_eq!(hover.label.as_deref(), Some("Filter"));
    assert!(hover.documentation.is_some());
}
