use log::trace;

use crate::analyzer::{Identifier, IdentifierKind};
use crate::backend::{HostToken, HostTokenKind};
use crate::source::SourceFile;

/// 注册全局名字的 Environment 方法
const REGISTER_METHODS: [&str; 4] = ["add_global", "add_filter", "add_function", "add_test"];

/// 接收模板名的调用
const TEMPLATE_CALLS: [&str; 2] = ["get_template", "render_jinja"];

pub(super) fn collect(file: &SourceFile, tokens: &[HostToken]) -> Vec<Identifier> {
    let src = file.src.as_str();
    let mut out = Vec::new();

    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != HostTokenKind::Ident {
            continue;
        }
        let name = tok.text(src);

        // 1. context! { key => value, shorthand, ..spread }
        if name == "context" && tokens.get(i + 1).is_some_and(|t| t.is_punct(src, "!")) {
            if let Some(open) = tokens.get(i + 2)
                && matches!(open.text(src), "{" | "(" | "[")
            {
                context_keys(file, &tokens[i + 3..], &mut out);
            }
            continue;
        }

        // 2. env.add_global("NAME", ..)
        if REGISTER_METHODS.contains(&name)
            && i > 0
            && tokens[i - 1].is_punct(src, ".")
            && let Some(arg) = first_string_arg(src, &tokens[i + 1..])
        {
            let span = arg.string_content(src);
            trace!("backend global `{}`", span.text(src));
            out.push(Identifier::new(
                span.text(src),
                file.range_of(span),
                IdentifierKind::BackendVariable,
            ));
            continue;
        }

        // 3. env.get_template("page.jinja")
        if TEMPLATE_CALLS.contains(&name)
            && let Some(arg) = first_string_arg(src, &tokens[i + 1..])
        {
            let span = arg.string_content(src);
            out.push(Identifier::new(
                span.text(src),
                file.range_of(span),
                IdentifierKind::JinjaTemplateRef,
            ));
        }
    }
    out
}

/// `(` 紧跟一个字符串字面量
fn first_string_arg<'t>(src: &str, rest: &'t [HostToken]) -> Option<&'t HostToken> {
    match rest {
        [open, arg, ..] if open.is_punct(src, "(") && arg.kind == HostTokenKind::Str => Some(arg),
        _ => None,
    }
}

/// 只看最外层：每一项开头的标识符就是键
fn context_keys(file: &SourceFile, body: &[HostToken], out: &mut Vec<Identifier>) {
    let src = file.src.as_str();
    let mut depth = 0usize;
    let mut item_start = true;

    for tok in body {
        let text = tok.text(src);
        match text {
            "{" | "(" | "[" => {
                depth += 1;
                item_start = false;
            }
            "}" | ")" | "]" if depth == 0 => return,
            "}" | ")" | "]" => depth -= 1,
            "," if depth == 0 => item_start = true,
            _ => {
                if item_start && depth == 0 && tok.kind == HostTokenKind::Ident {
                    out.push(Identifier::new(
                        text,
                        file.range_of(tok.span),
                        IdentifierKind::BackendVariable,
                    ));
                }
                item_start = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::backend::{BackendLang, scanner};

    fn collect_src(src: &str) -> Vec<(String, IdentifierKind)> {
        let file = SourceFile::new(PathBuf::from("app.rs"), src.to_string());
        let tokens = scanner::tokenize(src, BackendLang::Rust);
        collect(&file, &tokens)
            .into_iter()
            .map(|id| (id.name, id.kind))
            .collect()
    }

    #[test]
    fn context_macro_keys() {
        let found = collect_src(
            r#"let ctx = context! { user => u, items, nested => map! { inner => 1 }, ..base };"#,
        );
        let names: Vec<_> = found.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["user", "items", "nested"]);
        assert!(found.iter().all(|(_, k)| *k == IdentifierKind::BackendVariable));
    }

    #[test]
    fn registered_globals_and_template_refs() {
        let found = collect_src(
            r#"
            env.add_global("PROJECT", "loom");
            env.add_filter("shout", shout);
            let tmpl = env.get_template("index.jinja")?;
            "#,
        );
        assert_eq!(
            found,
            vec![
                ("PROJECT".to_string(), IdentifierKind::BackendVariable),
                ("shout".to_string(), IdentifierKind::BackendVariable),
                ("index.jinja".to_string(), IdentifierKind::JinjaTemplateRef),
            ]
        );
    }

    #[test]
    fn keys_in_comments_are_ignored() {
        let found = collect_src("// context! { hidden => 1 }\nlet x = 1;");
        assert!(found.is_empty());
    }
}
