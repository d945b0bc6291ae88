use crate::analyzer::{FilterUse, Identifier, IdentifierKind, Reference, ScopeId};
use crate::lexer::unquote;
use crate::parser::Parser;
use crate::token::{Token, TokenKind};
use crate::utils::Span;

/// 字符串字面量在当前位置的含义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExprContext {
    /// 普通值；像路径或 URL 的字符串记为 Link
    Value,
    /// extends / include / import / from 后面：字符串是模板名
    Template,
}

/// 看起来像站内路径或外部 URL 的字符串
pub fn looks_like_link(text: &str) -> bool {
    text.starts_with('/') || text.contains("://")
}

impl<'a> Parser<'a> {
    /// 线性扫描一个表达式，收集变量引用 / 过滤器 / 字符串
    ///
    /// 在以下位置停下 (不消耗)：标签结束或新标签开始、最外层的 stop 词、
    /// 最外层未配对的右括号。
    pub(super) fn scan_expr(&mut self, scope: ScopeId, stops: &[&str], ctx: ExprContext) {
        let mut depth = 0usize;
        // 前两个 token，用于判断 `.name`、`| name`、`is not name`
        let mut prev: Option<TokenKind> = None;
        let mut prev2: Option<TokenKind> = None;

        while self.in_tag() {
            let token = self.peek();
            let kind = token.kind;
            if depth == 0 && stops.contains(&self.text(token)) {
                break;
            }

            match kind {
                TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => depth += 1,
                TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::StringLiteral => self.string_literal(token, ctx),
                k if k.is_word() => self.word(token, prev, prev2, depth, scope),
                _ => {}
            }

            prev2 = prev;
            prev = Some(kind);
            self.advance();
        }
    }

    fn word(
        &mut self,
        token: Token,
        prev: Option<TokenKind>,
        prev2: Option<TokenKind>,
        depth: usize,
        scope: ScopeId,
    ) {
        // 1. `a.b`：b 是属性
        if prev == Some(TokenKind::Dot) {
            return;
        }

        // 2. `| name`：过滤器
        if prev == Some(TokenKind::Pipe) {
            self.filters.push(FilterUse {
                name: self.text(token).to_string(),
                range: self.range(token),
            });
            return;
        }

        // 3. `is name` / `is not name`：测试
        let is_test = prev == Some(TokenKind::Is)
            || (prev == Some(TokenKind::Not) && prev2 == Some(TokenKind::Is));
        if is_test && token.kind != TokenKind::Not {
            return;
        }

        // 4. 运算符关键字
        if token.kind.is_operator_keyword() {
            return;
        }

        // 5. 调用里的 `key=value`：key 是参数名
        if depth > 0 && self.peek_nth(1).kind == TokenKind::Assign {
            return;
        }

        self.references.push(Reference {
            name: self.text(token).to_string(),
            range: self.range(token),
            scope,
        });
    }

    fn string_literal(&mut self, token: Token, ctx: ExprContext) {
        let content = string_content(token, &self.file.src);
        let text = content.text(&self.file.src);
        let kind = match ctx {
            ExprContext::Template => IdentifierKind::JinjaTemplateRef,
            ExprContext::Value if looks_like_link(text) => IdentifierKind::Link,
            ExprContext::Value => return,
        };
        let identifier = Identifier::new(text, self.file.range_of(content), kind);
        match kind {
            IdentifierKind::Link => self.links.push(identifier),
            _ => self.templates.push(identifier),
        }
    }
}

/// 去掉引号后的区间 (未闭合的字符串只去掉开头引号)
pub fn string_content(token: Token, src: &str) -> Span {
    let text = token.span.text(src);
    let inner = unquote(text);
    let start = token.span.start + (text.len() - text.trim_start_matches(['"', '\'']).len()).min(1);
    Span::new(start, start + inner.len())
}
