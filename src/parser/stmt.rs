use log::trace;

use crate::analyzer::{FilterUse, IdentifierKind, Reference, ScopeId, ScopeKind};
use crate::parser::Parser;
use crate::parser::expr::ExprContext;
use crate::token::{Token, TokenKind};
use crate::utils::{Position, Range};

/// 宏体里不用声明就能用的名字
const MACRO_IMPLICIT: [&str; 3] = ["caller", "varargs", "kwargs"];

/// 只有一个表达式的扩展语句
const EXPRESSION_STATEMENTS: [&str; 3] = ["do", "print", "autoescape"];

impl<'a> Parser<'a> {
    /// `{%` 已被消耗；begin 是这个 `{%` token
    pub(super) fn parse_statement(&mut self, begin: Token) {
        let head = self.peek();
        match head.kind {
            TokenKind::For => self.parse_for(),
            TokenKind::If => {
                self.advance();
                let scope = self.current_scope();
                self.scan_expr(scope, &[], ExprContext::Value);
                self.finish_tag();
                self.push_block(TokenKind::If, None);
            }
            TokenKind::Elif => {
                self.advance();
                let scope = self.current_scope();
                self.scan_expr(scope, &[], ExprContext::Value);
                self.finish_tag();
            }
            TokenKind::Else => self.parse_else(begin),
            TokenKind::Set => self.parse_set(),
            TokenKind::With => self.parse_with(),
            TokenKind::Macro => self.parse_macro(),
            TokenKind::Call => self.parse_call(),
            TokenKind::Block => self.parse_block(),
            TokenKind::Filter => self.parse_filter(),
            TokenKind::Raw => self.parse_raw(),
            TokenKind::Extends | TokenKind::Include => {
                self.advance();
                let scope = self.current_scope();
                self.scan_expr(scope, &["ignore", "with", "without"], ExprContext::Template);
                self.finish_tag();
            }
            TokenKind::Import => self.parse_import(),
            TokenKind::From => self.parse_from_import(),

            TokenKind::EndFor => self.end_block(begin, TokenKind::For),
            TokenKind::EndIf => self.end_block(begin, TokenKind::If),
            TokenKind::EndSet => self.end_block(begin, TokenKind::Set),
            TokenKind::EndWith => self.end_block(begin, TokenKind::With),
            TokenKind::EndMacro => self.end_block(begin, TokenKind::Macro),
            TokenKind::EndCall => self.end_block(begin, TokenKind::Call),
            TokenKind::EndBlock => self.end_block(begin, TokenKind::Block),
            TokenKind::EndFilter => self.end_block(begin, TokenKind::Filter),

            TokenKind::Identifier if EXPRESSION_STATEMENTS.contains(&self.text(head)) => {
                self.advance();
                let scope = self.current_scope();
                self.scan_expr(scope, &[], ExprContext::Value);
                self.finish_tag();
            }
            // break / continue / endautoescape / trans 等：不含变量
            _ => {
                trace!("skipping statement `{}`", self.text(head));
                self.finish_tag();
            }
        }
    }

    /// `{% for a, b in items if cond recursive %}`
    fn parse_for(&mut self) {
        let for_token = self.advance();
        let outer = self.current_scope();
        let scope = self.open_scope(ScopeKind::Loop, self.end_of(for_token));

        // 1. 目标：`x` / `k, v` / `(k, v)`
        let mut targets = Vec::new();
        let parenthesized = self.match_token(TokenKind::LeftParen).is_some();
        while let Some(name) = self.match_name() {
            targets.push(name);
            if self.match_token(TokenKind::Comma).is_none() {
                break;
            }
        }
        if parenthesized {
            self.match_token(TokenKind::RightParen);
        }

        for (i, target) in targets.iter().enumerate() {
            let kind = if i == 0 {
                IdentifierKind::ForLoopKey
            } else {
                IdentifierKind::ForLoopValue
            };
            let visible_from = self.end_of(*target);
            self.declare(scope, *target, kind, visible_from);
        }

        // 2. 可迭代对象在外层作用域求值
        if self.match_token(TokenKind::In).is_some() {
            self.scan_expr(outer, &["if", "recursive"], ExprContext::Value);
        }

        // 3. 过滤条件能看到循环变量
        if self.match_token(TokenKind::If).is_some() {
            self.scan_expr(scope, &["recursive"], ExprContext::Value);
        }

        let body_start = self.finish_tag();
        self.scopes.set_start(scope, body_start);
        // `loop` 没有 token：名字改成 loop，范围留在 for 关键字上
        let mut loop_var = self.binding(for_token, IdentifierKind::ForLoopCount, body_start);
        loop_var.name = "loop".to_string();
        self.scopes.define(scope, loop_var);
        self.push_block(TokenKind::For, Some(scope));
    }

    /// for 的 else 分支在循环没有执行时渲染，看不到循环变量
    fn parse_else(&mut self, begin: Token) {
        self.advance();
        let at = self.start_of(begin);
        if let Some(block) = self.open.last_mut()
            && block.tag == TokenKind::For
            && let Some(scope) = block.scope.take()
        {
            self.scopes.close(scope, at);
        }
        self.finish_tag();
    }

    /// `{% set a = expr %}` / `{% set a, b = expr %}` / `{% set ns.attr = expr %}` / `{% set a %}...{% endset %}`
    fn parse_set(&mut self) {
        self.advance();
        let scope = self.current_scope();

        let mut targets = Vec::new();
        while let Some(name) = self.match_name() {
            if self.check(TokenKind::Dot) {
                // namespace 属性赋值：只是对 ns 的引用
                self.references.push(Reference {
                    name: self.text(name).to_string(),
                    range: self.range(name),
                    scope,
                });
                self.advance();
                self.match_name();
            } else {
                targets.push(name);
            }
            if self.match_token(TokenKind::Comma).is_none() {
                break;
            }
        }

        if self.match_token(TokenKind::Assign).is_some() {
            self.scan_expr(scope, &[], ExprContext::Value);
            let after = self.finish_tag();
            for target in targets {
                self.declare(scope, target, IdentifierKind::SetVariable, after);
            }
            return;
        }

        // 块形式：`{% set body | trim %}` 的过滤器照常记录
        self.scan_expr(scope, &[], ExprContext::Value);
        self.finish_tag();
        let pending = targets
            .into_iter()
            .map(|target| {
                let binding = self.binding(target, IdentifierKind::SetVariable, Position::default());
                (scope, binding)
            })
            .collect();
        self.push_block(TokenKind::Set, None);
        if let Some(block) = self.open.last_mut() {
            block.pending = pending;
        }
    }

    /// `{% with a = 1, b = a %}`：右边都在外层作用域求值
    fn parse_with(&mut self) {
        let with_token = self.advance();
        let outer = self.current_scope();
        let scope = self.open_scope(ScopeKind::With, self.end_of(with_token));

        let mut names = Vec::new();
        while self.peek().kind.is_word() && self.peek_nth(1).kind == TokenKind::Assign {
            names.push(self.advance());
            self.advance();
            self.scan_expr(outer, &[","], ExprContext::Value);
            if self.match_token(TokenKind::Comma).is_none() {
                break;
            }
        }

        let body_start = self.finish_tag();
        self.scopes.set_start(scope, body_start);
        for name in names {
            self.declare(scope, name, IdentifierKind::WithVariable, body_start);
        }
        self.push_block(TokenKind::With, Some(scope));
    }

    /// `{% macro name(a, b=default) %}`
    fn parse_macro(&mut self) {
        let macro_token = self.advance();
        let outer = self.current_scope();
        let name = self.match_name();
        let scope = self.open_scope(ScopeKind::Macro, self.end_of(macro_token));

        // 宏名从名字本身开始可见 (允许递归)
        if let Some(name) = name {
            let visible_from = self.start_of(name);
            self.declare(outer, name, IdentifierKind::MacroName, visible_from);
        }
        if self.match_token(TokenKind::LeftParen).is_some() {
            self.parse_parameters(scope, outer);
        }

        let body_start = self.finish_tag();
        self.scopes.set_start(scope, body_start);
        let anchor = match name {
            Some(name) => self.range(name),
            None => Range::empty(body_start),
        };
        for implicit in MACRO_IMPLICIT {
            self.declare_implicit(scope, implicit, anchor, body_start);
        }
        self.push_block(TokenKind::Macro, Some(scope));
    }

    /// `{% call(user) render_list(users) %}`
    fn parse_call(&mut self) {
        let call_token = self.advance();
        let outer = self.current_scope();
        let scope = self.open_scope(ScopeKind::Call, self.end_of(call_token));

        if self.match_token(TokenKind::LeftParen).is_some() {
            self.parse_parameters(scope, outer);
        }
        self.scan_expr(outer, &[], ExprContext::Value);

        let body_start = self.finish_tag();
        self.scopes.set_start(scope, body_start);
        self.push_block(TokenKind::Call, Some(scope));
    }

    /// 参数表，`(` 已消耗；默认值在外层作用域求值
    fn parse_parameters(&mut self, scope: ScopeId, outer: ScopeId) {
        while self.in_tag() {
            if let Some(param) = self.match_name() {
                let visible_from = self.end_of(param);
                self.declare(scope, param, IdentifierKind::MacroParameter, visible_from);
                if self.match_token(TokenKind::Assign).is_some() {
                    self.scan_expr(outer, &[","], ExprContext::Value);
                }
                continue;
            }
            match self.peek().kind {
                TokenKind::RightParen => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// `{% block name scoped %}`
    fn parse_block(&mut self) {
        let block_token = self.advance();
        let outer = self.current_scope();
        if let Some(name) = self.match_name() {
            let visible_from = self.start_of(name);
            self.declare(outer, name, IdentifierKind::TemplateBlock, visible_from);
        }
        let scope = self.open_scope(ScopeKind::Block, self.end_of(block_token));
        let body_start = self.finish_tag();
        self.scopes.set_start(scope, body_start);
        self.push_block(TokenKind::Block, Some(scope));
    }

    /// `{% filter upper | trim %}`
    fn parse_filter(&mut self) {
        self.advance();
        if let Some(name) = self.match_name() {
            self.filters.push(FilterUse {
                name: self.text(name).to_string(),
                range: self.range(name),
            });
        }
        let scope = self.current_scope();
        self.scan_expr(scope, &[], ExprContext::Value);
        self.finish_tag();
        self.push_block(TokenKind::Filter, None);
    }

    /// raw 里的内容原样输出，跳到 `{% endraw %}`
    fn parse_raw(&mut self) {
        self.advance();
        self.finish_tag();
        loop {
            let token = self.peek();
            if token.kind == TokenKind::EOF {
                return;
            }
            if token.kind == TokenKind::StmtBegin && self.peek_nth(1).kind == TokenKind::EndRaw {
                self.advance();
                self.advance();
                self.finish_tag();
                return;
            }
            self.advance();
        }
    }

    /// `{% import "forms.html" as forms %}`
    fn parse_import(&mut self) {
        self.advance();
        let scope = self.current_scope();
        self.scan_expr(scope, &["as"], ExprContext::Template);
        let alias = match self.match_token(TokenKind::As) {
            Some(_) => self.match_name(),
            None => None,
        };
        let after = self.finish_tag();
        if let Some(alias) = alias {
            self.declare(scope, alias, IdentifierKind::SetVariable, after);
        }
    }

    /// `{% from "forms.html" import input as field, textarea with context %}`
    fn parse_from_import(&mut self) {
        self.advance();
        let scope = self.current_scope();
        self.scan_expr(scope, &["import"], ExprContext::Template);

        let mut names = Vec::new();
        if self.match_token(TokenKind::Import).is_some() {
            while !matches!(self.text(self.peek()), "with" | "without") {
                let Some(name) = self.match_name() else {
                    break;
                };
                let local = match self.match_token(TokenKind::As) {
                    Some(_) => self.match_name().unwrap_or(name),
                    None => name,
                };
                names.push(local);
                if self.match_token(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        let after = self.finish_tag();
        for name in names {
            self.declare(scope, name, IdentifierKind::MacroName, after);
        }
    }

    /// 结束标签：弹出到与之配对的开始标签为止
    fn end_block(&mut self, begin: Token, tag: TokenKind) {
        self.advance();
        let end = self.start_of(begin);
        let after = self.finish_tag();

        let Some(index) = self.open.iter().rposition(|block| block.tag == tag) else {
            trace!("stray `end{}`", tag.as_str());
            return;
        };
        while self.open.len() > index {
            if let Some(block) = self.open.pop() {
                self.close_block(block, end, after);
            }
        }
    }
}
