use std::collections::HashSet;
use std::path::Path;

use crate::analyzer::{BUILTINS, Identifier, IdentifierKind};
use crate::catalog;
use crate::parser::TemplateSyntax;
use crate::query::{CompletionItem, CompletionKind, CompletionType, QueryContext};
use crate::store::{Document, DocumentKind};
use crate::token::{Token, TokenKind};
use crate::utils::{Position, Range, Span};

/// 候选的落点：纯插入，或者替换已经输入的半个词
#[derive(Debug, Clone, Copy)]
enum Edit {
    Insert(Range),
    Replace(Range),
}

impl Edit {
    fn apply(self, item: &mut CompletionItem) {
        match self {
            Edit::Insert(range) => item.insert_range = Some(range),
            Edit::Replace(range) => item.replace_range = Some(range),
        }
    }
}

/// 没有合适的补全场景时返回 None
pub fn complete(
    ctx: &QueryContext<'_>,
    document: &Document,
    position: Position,
) -> Option<Vec<CompletionItem>> {
    let offset = document.file.offset_at(position)?;
    let items = match &document.kind {
        DocumentKind::Template(syntax) => template_completion(ctx, document, syntax, offset, position)?,
        DocumentKind::Backend { identifiers, .. } => {
            backend_completion(ctx, document, identifiers, position)?
        }
    };
    Some(items)
}

fn template_completion(
    ctx: &QueryContext<'_>,
    document: &Document,
    syntax: &TemplateSyntax,
    offset: usize,
    position: Position,
) -> Option<Vec<CompletionItem>> {
    let tokens = &syntax.tokens;
    let src = document.file.src.as_str();

    // 1. 光标前的最后一个 token
    let index = tokens
        .iter()
        .rposition(|t| t.kind != TokenKind::EOF && t.span.start < offset)?;
    let token = tokens[index];
    let prev = index.checked_sub(1).map(|i| tokens[i].kind);
    let touching = offset <= token.span.end;
    let insert = Edit::Insert(Range::empty(position));

    // 2. 按场景分派
    match token.kind {
        TokenKind::Text => None,
        kind if kind.is_tag_end() => None,
        TokenKind::StringLiteral if inside_string(token, offset, src) => {
            string_completion(ctx, document, tokens, index, offset)
        }
        TokenKind::StmtBegin => Some(snippets(insert, offset > token.span.end)),
        TokenKind::Pipe => Some(filters(insert)),
        TokenKind::Dot => None,
        kind if kind.is_word() && touching => {
            let replace = Edit::Replace(document.file.range_of(token.span));
            match prev {
                Some(TokenKind::StmtBegin) => Some(snippets(replace, true)),
                Some(TokenKind::Pipe) => Some(filters(replace)),
                Some(TokenKind::Dot) => None,
                _ => Some(identifiers(ctx, syntax, position, replace)),
            }
        }
        _ => Some(identifiers(ctx, syntax, position, insert)),
    }
}

/// 后端文件里只补全模板名 (`get_template("|")`)
fn backend_completion(
    ctx: &QueryContext<'_>,
    document: &Document,
    identifiers: &[Identifier],
    position: Position,
) -> Option<Vec<CompletionItem>> {
    let reference = identifiers
        .iter()
        .find(|id| id.kind == IdentifierKind::JinjaTemplateRef && id.range.touches(position))?;
    let partial = Range::new(reference.range.start, position);
    let edit = if partial.is_empty() {
        Edit::Insert(Range::empty(position))
    } else {
        Edit::Replace(partial)
    };
    Some(templates(ctx, document, edit))
}

/// 光标在字符串字面量内部 (未闭合的字符串包括末尾)
fn inside_string(token: Token, offset: usize, src: &str) -> bool {
    let text = token.span.text(src);
    let closed = text.len() >= 2 && text.chars().next() == text.chars().last();
    offset > token.span.start && (offset < token.span.end || (!closed && offset <= token.span.end))
}

fn string_completion(
    ctx: &QueryContext<'_>,
    document: &Document,
    tokens: &[Token],
    index: usize,
    offset: usize,
) -> Option<Vec<CompletionItem>> {
    let token = tokens[index];
    let content_start = token.span.start + 1;
    let partial_span = Span::new(content_start, offset.max(content_start));
    let partial = partial_span.text(&document.file.src);
    let edit = if partial.is_empty() {
        Edit::Insert(Range::empty(document.file.position_at(offset)))
    } else {
        Edit::Replace(document.file.range_of(partial_span))
    };

    // 所在语句的第一个关键字
    let head = tokens[..index]
        .iter()
        .rposition(|t| t.kind.is_tag_begin())
        .and_then(|begin| tokens.get(begin + 1))
        .map(|t| t.kind);
    match head {
        Some(TokenKind::Extends | TokenKind::Include | TokenKind::Import | TokenKind::From) => {
            Some(templates(ctx, document, edit))
        }
        _ if partial.starts_with('/') => Some(link_hints(ctx, edit)),
        _ => None,
    }
}

/// 内层作用域 -> 外层作用域 -> 后端变量 -> 内置名字，同名只出现一次
fn identifiers(
    ctx: &QueryContext<'_>,
    syntax: &TemplateSyntax,
    position: Position,
    edit: Edit,
) -> Vec<CompletionItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    let mut push = |name: &str, kind: CompletionKind, description: &str| {
        if !seen.insert(name.to_string()) {
            return;
        }
        let mut item = CompletionItem {
            completion_type: CompletionType::Identifier,
            label: name.to_string(),
            kind,
            description: description.to_string(),
            new_text: None,
            insert_range: None,
            replace_range: None,
        };
        edit.apply(&mut item);
        items.push(item);
    };

    for binding in syntax.scopes.visible_at(position) {
        push(&binding.name, binding.kind.completion_kind(), binding.kind.completion_detail());
    }
    let backend = IdentifierKind::BackendVariable;
    for (name, _) in ctx.state.backend().names(ctx.state.family()) {
        push(name, backend.completion_kind(), backend.completion_detail());
    }
    for name in BUILTINS {
        push(name, CompletionKind::Constant, "Builtin");
    }
    items
}

fn filters(edit: Edit) -> Vec<CompletionItem> {
    catalog::FILTERS
        .iter()
        .map(|(name, doc)| {
            let mut item = CompletionItem {
                completion_type: CompletionType::Filter,
                label: name.to_string(),
                kind: CompletionKind::Function,
                description: doc.to_string(),
                new_text: None,
                insert_range: None,
                replace_range: None,
            };
            edit.apply(&mut item);
            item
        })
        .collect()
}

/// `spaced`: `{%` 和光标之间已经有空白 (或者在替换已输入的词)，片段不再带前导空格
fn snippets(edit: Edit, spaced: bool) -> Vec<CompletionItem> {
    catalog::SNIPPETS
        .iter()
        .map(|(label, description, text)| {
            let text = if spaced { text.trim_start() } else { *text };
            let mut item = CompletionItem {
                completion_type: CompletionType::Snippet,
                label: label.to_string(),
                kind: CompletionKind::Text,
                description: description.to_string(),
                new_text: Some(text.to_string()),
                insert_range: None,
                replace_range: None,
            };
            edit.apply(&mut item);
            item
        })
        .collect()
}

/// 工作区里已知的模板 (不含当前文档)
fn templates(ctx: &QueryContext<'_>, current: &Document, edit: Edit) -> Vec<CompletionItem> {
    let mut names: Vec<String> = ctx
        .state
        .documents()
        .filter(|doc| doc.syntax().is_some() && doc.id != current.id)
        .map(|doc| template_name(ctx.config.templates.as_deref(), doc.filename()))
        .collect();
    names.sort();
    names.dedup();

    let detail = IdentifierKind::JinjaTemplateRef.completion_detail();
    names
        .into_iter()
        .map(|name| {
            let mut item = CompletionItem {
                completion_type: CompletionType::Identifier,
                label: name,
                kind: CompletionKind::File,
                description: detail.to_string(),
                new_text: None,
                insert_range: None,
                replace_range: None,
            };
            edit.apply(&mut item);
            item
        })
        .collect()
}

fn link_hints(ctx: &QueryContext<'_>, edit: Edit) -> Vec<CompletionItem> {
    ctx.hints
        .all()
        .into_iter()
        .map(|hint| {
            let mut item = CompletionItem {
                completion_type: CompletionType::Identifier,
                label: hint.action.name,
                kind: CompletionKind::Text,
                description: hint.action.description,
                new_text: None,
                insert_range: None,
                replace_range: None,
            };
            edit.apply(&mut item);
            item
        })
        .collect()
}

/// 文件名 -> 模板名：去掉 uri 前缀和模板根目录，找不到根目录时用文件名本身
fn template_name(root: Option<&Path>, filename: &str) -> String {
    let path = filename.strip_prefix("file://").unwrap_or(filename);
    if let Some(root) = root {
        if let Ok(relative) = Path::new(path).strip_prefix(root) {
            return relative.to_string_lossy().to_string();
        }
        let root = root.to_string_lossy();
        let marker = format!("/{}/", root.trim_start_matches("./").trim_matches('/'));
        if let Some(at) = path.find(&marker) {
            return path[at + marker.len()..].to_string();
        }
    }
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_names_are_relative_to_root() {
        let root = Path::new("./templates");
        assert_eq!(
            template_name(Some(root), "file:///srv/app/templates/users/list.html"),
            "users/list.html"
        );
        assert_eq!(template_name(Some(Path::new("/srv/t")), "/srv/t/a.html"), "a.html");
        assert_eq!(template_name(None, "/srv/app/base.jinja"), "base.jinja");
    }
}
