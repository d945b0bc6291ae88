//! 模板语法扫描
//!
//! 不构造完整 AST：只记录分析需要的东西 (作用域树、变量引用、过滤器、模板引用、链接)。
//! 语句逐个处理，坏掉的语句跳到它的结束定界符为止，不影响文件其余部分。

mod expr;
mod stmt;

use log::trace;

use crate::analyzer::{
    Binding, FilterUse, Identifier, IdentifierKind, Reference, ScopeId, ScopeKind, ScopeTree,
};
use crate::lexer::Lexer;
use crate::source::SourceFile;
use crate::token::{Token, TokenKind};
use crate::utils::{Position, Range};

/// 一个模板文件的语法层结果
#[derive(Debug, Clone)]
pub struct TemplateSyntax {
    pub tokens: Vec<Token>,
    pub scopes: ScopeTree,
    pub references: Vec<Reference>,
    pub filters: Vec<FilterUse>,
    /// JinjaTemplateRef
    pub templates: Vec<Identifier>,
    /// Link
    pub links: Vec<Identifier>,
}

/// 还没遇到结束标签的块语句
#[derive(Debug)]
struct OpenBlock {
    tag: TokenKind,
    /// 块体对应的作用域 (if / filter / set 块没有自己的作用域)
    scope: Option<ScopeId>,
    /// `{% set x %}...{% endset %}`：结束标签之后才生效的声明
    pending: Vec<(ScopeId, Binding)>,
}

pub struct Parser<'a> {
    file: &'a SourceFile,
    tokens: Vec<Token>,
    current: usize,
    scopes: ScopeTree,
    open: Vec<OpenBlock>,
    references: Vec<Reference>,
    filters: Vec<FilterUse>,
    templates: Vec<Identifier>,
    links: Vec<Identifier>,
}

impl<'a> Parser<'a> {
    pub fn new(file: &'a SourceFile) -> Self {
        Self {
            file,
            tokens: Lexer::tokenize(&file.src),
            current: 0,
            scopes: ScopeTree::new(file.end_position()),
            open: Vec::new(),
            references: Vec::new(),
            filters: Vec::new(),
            templates: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn parse(file: &'a SourceFile) -> TemplateSyntax {
        Parser::new(file).run()
    }

    fn run(mut self) -> TemplateSyntax {
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::EOF => break,
                TokenKind::ExprBegin => {
                    self.advance();
                    let scope = self.current_scope();
                    self.scan_expr(scope, &[], expr::ExprContext::Value);
                    self.finish_tag();
                }
                TokenKind::StmtBegin => {
                    self.advance();
                    self.parse_statement(token);
                }
                // Text 以及游离的 token
                _ => {
                    self.advance();
                }
            }
        }

        // 文件结束时还开着的块一律收口到文件尾
        let end = self.file.end_position();
        while let Some(block) = self.open.pop() {
            trace!("unclosed `{}` block at end of file", block.tag.as_str());
            let scope = block.scope;
            self.close_block(block, end, end);
            if let Some(scope) = scope {
                self.scopes.close_at_end(scope, end);
            }
        }

        TemplateSyntax {
            tokens: self.tokens,
            scopes: self.scopes,
            references: self.references,
            filters: self.filters,
            templates: self.templates,
            links: self.links,
        }
    }
}

// 基础设施：token 游标
impl<'a> Parser<'a> {
    fn peek(&self) -> Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Token {
        let eof = Token::new(TokenKind::EOF, self.file.src.len(), self.file.src.len());
        self.tokens.get(self.current + n).copied().unwrap_or(eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::EOF {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// 语句内部可以当名字的 token
    fn match_name(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.kind.is_word() && !token.kind.is_operator_keyword() {
            Some(self.advance())
        } else {
            None
        }
    }

    /// 当前 token 是否在语句/表达式里 (未到标签结束)
    fn in_tag(&self) -> bool {
        let kind = self.peek().kind;
        !(kind == TokenKind::EOF || kind.is_tag_end() || kind.is_tag_begin())
    }

    fn text(&self, token: Token) -> &'a str {
        token.span.text(&self.file.src)
    }

    fn range(&self, token: Token) -> Range {
        self.file.range_of(token.span)
    }

    fn start_of(&self, token: Token) -> Position {
        self.file.position_at(token.span.start)
    }

    fn end_of(&self, token: Token) -> Position {
        self.file.position_at(token.span.end)
    }

    /// 跳过当前标签剩余的 token，返回标签结束后的位置
    /// 标签没有闭合时停在下一个标签 (或文件尾) 之前
    fn finish_tag(&mut self) -> Position {
        loop {
            let token = self.peek();
            if token.kind == TokenKind::EOF || token.kind.is_tag_begin() {
                return self.start_of(token);
            }
            self.advance();
            if token.kind.is_tag_end() {
                return self.end_of(token);
            }
        }
    }
}

// 作用域与声明
impl<'a> Parser<'a> {
    fn current_scope(&self) -> ScopeId {
        self.open
            .iter()
            .rev()
            .find_map(|block| block.scope)
            .unwrap_or(ScopeId::ROOT)
    }

    fn open_scope(&mut self, kind: ScopeKind, start: Position) -> ScopeId {
        let parent = self.current_scope();
        self.scopes.open(kind, parent, start)
    }

    fn binding(&self, token: Token, kind: IdentifierKind, visible_from: Position) -> Binding {
        Binding {
            name: self.text(token).to_string(),
            kind,
            range: self.range(token),
            visible_from,
            implicit: false,
        }
    }

    fn declare(&mut self, scope: ScopeId, token: Token, kind: IdentifierKind, visible_from: Position) {
        let binding = self.binding(token, kind, visible_from);
        self.scopes.define(scope, binding);
    }

    fn declare_implicit(&mut self, scope: ScopeId, name: &str, range: Range, visible_from: Position) {
        self.scopes.define(
            scope,
            Binding {
                name: name.to_string(),
                kind: IdentifierKind::MacroParameter,
                range,
                visible_from,
                implicit: true,
            },
        );
    }

    fn push_block(&mut self, tag: TokenKind, scope: Option<ScopeId>) {
        self.open.push(OpenBlock {
            tag,
            scope,
            pending: Vec::new(),
        });
    }

    /// end: 作用域结束位置 (结束标签开头)；after: 结束标签之后
    fn close_block(&mut self, block: OpenBlock, end: Position, after: Position) {
        if let Some(scope) = block.scope {
            self.scopes.close(scope, end);
        }
        for (scope, mut binding) in block.pending {
            binding.visible_from = after;
            self.scopes.define(scope, binding);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use indoc::indoc;

    use super::*;

    fn parse(src: &str) -> (SourceFile, TemplateSyntax) {
        let file = SourceFile::new(PathBuf::from("t.jinja"), src.to_string());
        let syntax = Parser::parse(&file);
        (file, syntax)
    }

    fn reference_names(syntax: &TemplateSyntax) -> Vec<&str> {
        syntax.references.iter().map(|r| r.name.as_str()).collect()
    }

    fn declared(syntax: &TemplateSyntax) -> Vec<(&str, IdentifierKind)> {
        let mut all: Vec<_> = syntax
            .scopes
            .bindings()
            .filter(|b| !b.implicit)
            .map(|b| (b.name.as_str(), b.kind))
            .collect();
        all.sort();
        all
    }

    #[test]
    fn expression_references_skip_attributes_filters_and_tests() {
        let (_, syntax) = parse("{{ user.name | title }} {{ x is defined and not y }} {{ f(a, key=b) }}");
        assert_eq!(reference_names(&syntax), vec!["user", "x", "y", "f", "a", "b"]);
        let filters: Vec<_> = syntax.filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(filters, vec!["title"]);
    }

    #[test]
    fn for_loop_declares_targets_and_loop() {
        let (_, syntax) = parse(indoc! {"
            {% for key, value in items if value %}
              {{ loop.index }} {{ key }}
            {% endfor %}
        "});
        assert_eq!(
            declared(&syntax),
            vec![
                ("key", IdentifierKind::ForLoopKey),
                ("loop", IdentifierKind::ForLoopCount),
                ("value", IdentifierKind::ForLoopValue),
            ]
        );
        // loop 没有自己的 token，挂在 for 关键字上
        let loop_var = syntax.scopes.bindings().find(|b| b.name == "loop").unwrap();
        assert_eq!(loop_var.range.start, Position::new(0, 3));
        assert_eq!(loop_var.range.end, Position::new(0, 6));

        // items 在外层作用域求值，if 条件在循环作用域
        let items = &syntax.references[0];
        assert_eq!(items.name, "items");
        assert_eq!(items.scope, ScopeId::ROOT);
        assert_ne!(syntax.references[1].scope, ScopeId::ROOT);
    }

    #[test]
    fn set_block_is_visible_after_endset() {
        let (file, syntax) = parse("{% set body %}hi{% endset %}{{ body }}");
        let binding = syntax.scopes.bindings().next().unwrap();
        assert_eq!(binding.name, "body");
        assert_eq!(binding.kind, IdentifierKind::SetVariable);
        let endset_end = file.src.find("{{").unwrap();
        assert_eq!(binding.visible_from, file.position_at(endset_end));
    }

    #[test]
    fn macro_parameters_and_implicit_names() {
        let (_, syntax) = parse(indoc! {r#"
            {% macro input(name, value="", type=default_type) %}
              {{ caller() }} {{ varargs }}
            {% endmacro %}
        "#});
        assert_eq!(
            declared(&syntax),
            vec![
                ("input", IdentifierKind::MacroName),
                ("name", IdentifierKind::MacroParameter),
                ("type", IdentifierKind::MacroParameter),
                ("value", IdentifierKind::MacroParameter),
            ]
        );
        let default_type = syntax
            .references
            .iter()
            .find(|r| r.name == "default_type")
            .unwrap();
        assert_eq!(default_type.scope, ScopeId::ROOT);
    }

    #[test]
    fn template_statements_record_refs_and_aliases() {
        let (_, syntax) = parse(indoc! {r#"
            {% extends "base.html" %}
            {% include "header.html" ignore missing with context %}
            {% import "forms.html" as forms %}
            {% from "macros.html" import field as f, button %}
        "#});
        let templates: Vec<_> = syntax.templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(templates, vec!["base.html", "header.html", "forms.html", "macros.html"]);
        assert!(syntax.references.is_empty());
        assert_eq!(
            declared(&syntax),
            vec![
                ("button", IdentifierKind::MacroName),
                ("f", IdentifierKind::MacroName),
                ("forms", IdentifierKind::SetVariable),
            ]
        );
    }

    #[test]
    fn links_are_string_literals_that_look_like_paths() {
        let (_, syntax) = parse(r#"{{ url("/users/profile") }} {{ "https://example.com" }} {{ "plain" }}"#);
        let links: Vec<_> = syntax.links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(links, vec!["/users/profile", "https://example.com"]);
    }

    #[test]
    fn raw_blocks_are_ignored() {
        let (_, syntax) = parse("{% raw %}{{ hidden }}{% endraw %}{{ shown }}");
        assert_eq!(reference_names(&syntax), vec!["shown"]);
    }

    #[test]
    fn malformed_statement_does_not_stop_parsing() {
        let (_, syntax) = parse("{% for in %}{% endfor %}{% set = %}{{ after }}");
        assert_eq!(reference_names(&syntax), vec!["after"]);
    }

    #[test]
    fn unclosed_loop_extends_to_end_of_file() {
        let (file, syntax) = parse("{% for x in xs %}\n{{ x }}");
        let (id, scope) = syntax.scopes.iter().nth(1).unwrap();
        assert_eq!(scope.kind, ScopeKind::Loop);
        assert_eq!(scope.range.end, file.end_position());
        assert!(scope.open_ended);
        assert_eq!(syntax.scopes.innermost_at(file.end_position()), id);
    }
}
