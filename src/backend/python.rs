use crate::analyzer::{Identifier, IdentifierKind};
use crate::backend::{HostToken, HostTokenKind};
use crate::source::SourceFile;

/// 关键字参数会变成模板变量的调用
const RENDER_CALLS: [&str; 3] = ["render", "render_template", "render_template_string"];

/// 第一个字符串参数是模板名的调用
const TEMPLATE_CALLS: [&str; 3] = ["get_template", "render_template", "select_template"];

pub(super) fn collect(file: &SourceFile, tokens: &[HostToken]) -> Vec<Identifier> {
    let src = file.src.as_str();
    let mut out = Vec::new();

    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != HostTokenKind::Ident {
            continue;
        }
        let name = tok.text(src);
        let rest = &tokens[i + 1..];

        // 1. template.render(user=..., items=...)
        if RENDER_CALLS.contains(&name) && rest.first().is_some_and(|t| t.is_punct(src, "(")) {
            keyword_args(file, &rest[1..], &mut out);
        }

        // 2. env.globals.update(NAME=...)
        if name == "update"
            && i >= 2
            && tokens[i - 1].is_punct(src, ".")
            && matches!(tokens[i - 2].text(src), "globals" | "filters" | "tests")
            && rest.first().is_some_and(|t| t.is_punct(src, "("))
        {
            keyword_args(file, &rest[1..], &mut out);
        }

        // 3. env.globals["NAME"] = ...
        if matches!(name, "globals" | "filters" | "tests")
            && let [open, key, close, assign, ..] = rest
            && open.is_punct(src, "[")
            && key.kind == HostTokenKind::Str
            && close.is_punct(src, "]")
            && assign.is_punct(src, "=")
        {
            let span = key.string_content(src);
            out.push(Identifier::new(
                span.text(src),
                file.range_of(span),
                IdentifierKind::BackendVariable,
            ));
        }

        // 4. env.get_template("page.jinja")
        if TEMPLATE_CALLS.contains(&name)
            && let [open, arg, ..] = rest
            && open.is_punct(src, "(")
            && arg.kind == HostTokenKind::Str
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

/// 最外层的 `name=` (不是 `==`)
fn keyword_args(file: &SourceFile, body: &[HostToken], out: &mut Vec<Identifier>) {
    let src = file.src.as_str();
    let mut depth = 0usize;

    for (i, tok) in body.iter().enumerate() {
        match tok.text(src) {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" if depth == 0 => return,
            ")" | "]" | "}" => depth -= 1,
            text => {
                if depth == 0
                    && tok.kind == HostTokenKind::Ident
                    && body.get(i + 1).is_some_and(|t| t.is_punct(src, "="))
                {
                    out.push(Identifier::new(
                        text,
                        file.range_of(tok.span),
                        IdentifierKind::BackendVariable,
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use indoc::indoc;

    use super::*;
    use crate::backend::{BackendLang, scanner};

    fn collect_src(src: &str) -> Vec<(String, IdentifierKind)> {
        let file = SourceFile::new(PathBuf::from("app.py"), src.to_string());
        let tokens = scanner::tokenize(src, BackendLang::Python);
        collect(&file, &tokens)
            .into_iter()
            .map(|id| (id.name, id.kind))
            .collect()
    }

    #[test]
    fn render_keyword_arguments() {
        let found = collect_src(indoc! {r#"
            tmpl = env.get_template("users.html")
            tmpl.render(users=load(limit=10), title="Users", debug=a == b)
        "#});
        assert_eq!(
            found,
            vec![
                ("users.html".to_string(), IdentifierKind::JinjaTemplateRef),
                ("users".to_string(), IdentifierKind::BackendVariable),
                ("title".to_string(), IdentifierKind::BackendVariable),
                ("debug".to_string(), IdentifierKind::BackendVariable),
            ]
        );
    }

    #[test]
    fn globals_assignment_and_update() {
        let found = collect_src(indoc! {r#"
            env.globals["site_name"] = "loom"
            env.globals.update(version=VERSION)
            # env.globals["commented"] = 1
        "#});
        let names: Vec<_> = found.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["site_name", "version"]);
    }
}
