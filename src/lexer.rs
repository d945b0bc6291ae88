use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// 标签之外
    Data,
    /// `{{ ... }}` 或 `{% ... %}` 内部
    /// close: 期待的结束 token；depth: 花括号深度 (dict 字面量里的 `}}` 不算结束)
    Code { close: TokenKind, depth: usize },
}

pub struct Lexer<'a> {
    src: &'a str,
    current_position: usize,
    mode: Mode,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            current_position: 0,
            mode: Mode::Data,
        }
    }

    /// 一次性切分整个文档，最后一个 token 总是 EOF
    pub fn tokenize(src: &'a str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            tokens.push(token);
            if token.kind == TokenKind::EOF {
                break;
            }
        }
        tokens
    }

    fn rest(&self) -> &'a str {
        &self.src[self.current_position..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current_position += c.len_utf8();
        Some(c)
    }

    fn make_token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, start, self.current_position)
    }

    pub fn next_token(&mut self) -> Token {
        match self.mode {
            Mode::Data => self.lex_data(),
            Mode::Code { close, depth } => self.lex_code(close, depth),
        }
    }
}

impl<'a> Lexer<'a> {
    fn lex_data(&mut self) -> Token {
        loop {
            let start = self.current_position;
            if start >= self.src.len() {
                return Token::new(TokenKind::EOF, self.src.len(), self.src.len());
            }

            let Some(found) = find_tag_open(self.rest()) else {
                self.current_position = self.src.len();
                return self.make_token(TokenKind::Text, start);
            };

            // 先把标签前的文本作为一个 Text 吐出去
            if found > 0 {
                self.current_position += found;
                return self.make_token(TokenKind::Text, start);
            }

            let rest = self.rest();
            if rest.starts_with("{#") {
                // 注释整体跳过，未闭合就吃到文件尾
                self.current_position = match rest.find("#}") {
                    Some(end) => start + end + 2,
                    None => self.src.len(),
                };
                continue;
            }

            let (kind, close) = if rest.starts_with("{{") {
                (TokenKind::ExprBegin, TokenKind::ExprEnd)
            } else {
                (TokenKind::StmtBegin, TokenKind::StmtEnd)
            };
            self.current_position += 2;
            // 空白控制 {%- / {%+
            if matches!(self.peek(), Some('-') | Some('+')) {
                self.current_position += 1;
            }
            self.mode = Mode::Code { close, depth: 0 };
            return self.make_token(kind, start);
        }
    }

    fn lex_code(&mut self, close: TokenKind, depth: usize) -> Token {
        self.skip_whitespace();
        let start = self.current_position;
        let rest = self.rest();

        if rest.is_empty() {
            self.mode = Mode::Data;
            return Token::new(TokenKind::EOF, self.src.len(), self.src.len());
        }

        // 1. 结束标记 (可带空白控制符)
        let trimmed = rest.strip_prefix(['-', '+']).unwrap_or(rest);
        let marker_len = rest.len() - trimmed.len() + 2;
        if close == TokenKind::StmtEnd && trimmed.starts_with("%}") {
            self.current_position += marker_len;
            self.mode = Mode::Data;
            return self.make_token(TokenKind::StmtEnd, start);
        }
        if close == TokenKind::ExprEnd && depth == 0 && trimmed.starts_with("}}") {
            self.current_position += marker_len;
            self.mode = Mode::Data;
            return self.make_token(TokenKind::ExprEnd, start);
        }

        // 2. 标签没写完就开始了下一个标签：视为当前标签已结束，交给 Data 模式处理
        if depth == 0 && (rest.starts_with("{{") || rest.starts_with("{%") || rest.starts_with("{#"))
        {
            self.mode = Mode::Data;
            return self.lex_data();
        }

        let Some(c) = self.advance() else {
            return Token::new(TokenKind::EOF, self.src.len(), self.src.len());
        };

        match c {
            c if is_ident_start(c) => self.scan_identifier(start),
            c if c.is_ascii_digit() => self.scan_number(start),
            '"' | '\'' => self.scan_string(start, c),

            '{' => {
                self.mode = Mode::Code {
                    close,
                    depth: depth + 1,
                };
                self.make_token(TokenKind::LeftBrace, start)
            }
            '}' => {
                self.mode = Mode::Code {
                    close,
                    depth: depth.saturating_sub(1),
                };
                self.make_token(TokenKind::RightBrace, start)
            }

            '(' => self.make_token(TokenKind::LeftParen, start),
            ')' => self.make_token(TokenKind::RightParen, start),
            '[' => self.make_token(TokenKind::LeftBracket, start),
            ']' => self.make_token(TokenKind::RightBracket, start),
            '|' => self.make_token(TokenKind::Pipe, start),
            '.' => self.make_token(TokenKind::Dot, start),
            ',' => self.make_token(TokenKind::Comma, start),
            ':' => self.make_token(TokenKind::Colon, start),
            '~' => self.make_token(TokenKind::Tilde, start),
            '+' => self.make_token(TokenKind::Plus, start),
            '-' => self.make_token(TokenKind::Minus, start),
            '%' => self.make_token(TokenKind::Percent, start),

            '*' => self.either('*', TokenKind::StarStar, TokenKind::Star, start),
            '/' => self.either('/', TokenKind::SlashSlash, TokenKind::Slash, start),
            '=' => self.either('=', TokenKind::Equal, TokenKind::Assign, start),
            '<' => self.either('=', TokenKind::LessEqual, TokenKind::LessThan, start),
            '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::GreaterThan, start),
            '!' => self.either('=', TokenKind::NotEqual, TokenKind::ERROR, start),

            _ => self.make_token(TokenKind::ERROR, start),
        }
    }

    fn either(&mut self, next: char, double: TokenKind, single: TokenKind, start: usize) -> Token {
        if self.peek() == Some(next) {
            self.advance();
            self.make_token(double, start)
        } else {
            self.make_token(single, start)
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn scan_identifier(&mut self, start: usize) -> Token {
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            self.advance();
        }
        let text = &self.src[start..self.current_position];
        let kind = TokenKind::lookup_keyword(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start)
    }

    fn scan_number(&mut self, start: usize) -> Token {
        let mut kind = TokenKind::Integer;
        self.eat_digits();

        // 小数部分：`1.` 后面必须跟数字，否则 `.` 是成员访问
        let rest = self.rest().as_bytes();
        if rest.first() == Some(&b'.') && rest.get(1).is_some_and(u8::is_ascii_digit) {
            self.advance();
            self.eat_digits();
            kind = TokenKind::Float;
        }

        // 指数部分
        if matches!(self.peek(), Some('e') | Some('E')) {
            let rest = self.rest().as_bytes();
            let digit_at = if matches!(rest.get(1), Some(b'+') | Some(b'-')) { 2 } else { 1 };
            if rest.get(digit_at).is_some_and(u8::is_ascii_digit) {
                self.current_position += digit_at;
                self.eat_digits();
                kind = TokenKind::Float;
            }
        }
        self.make_token(kind, start)
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peek() {
            if !(c.is_ascii_digit() || c == '_') {
                break;
            }
            self.advance();
        }
    }

    /// 字符串在换行处截断：编辑中的未闭合字符串不应吞掉后面的整个文件
    fn scan_string(&mut self, start: usize, quote: char) -> Token {
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.advance();
                    self.advance();
                }
                '\n' => break,
                c if c == quote => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        self.make_token(TokenKind::StringLiteral, start)
    }
}

fn find_tag_open(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && matches!(bytes[i + 1], b'{' | b'%' | b'#') {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// 去掉字符串字面量两端的引号
pub fn unquote(text: &str) -> &str {
    let text = text.strip_prefix(['"', '\'']).unwrap_or(text);
    text.strip_suffix(['"', '\'']).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn splits_text_and_tags() {
        assert_eq!(
            kinds("<p>{{ name }}</p>{% if x %}"),
            vec![
                Text, ExprBegin, Identifier, ExprEnd, Text, StmtBegin, If, Identifier, StmtEnd,
                EOF
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("a{# {{ x }} #}b"), vec![Text, Text, EOF]);
        assert_eq!(kinds("{# never closed {{ x }}"), vec![EOF]);
    }

    #[test]
    fn whitespace_control_is_part_of_delimiters() {
        let src = "{%- set a = 1 -%}{{- a -}}";
        let tokens = Lexer::tokenize(src);
        assert_eq!(tokens[0].span.text(src), "{%-");
        assert_eq!(tokens[5].span.text(src), "-%}");
        assert_eq!(tokens[6].span.text(src), "{{-");
        assert_eq!(tokens[8].span.text(src), "-}}");
    }

    #[test]
    fn nested_dict_braces_do_not_close_expression() {
        assert_eq!(
            kinds("{{ {'a': {'b': 1}} }}"),
            vec![
                ExprBegin, LeftBrace, StringLiteral, Colon, LeftBrace, StringLiteral, Colon,
                Integer, RightBrace, RightBrace, ExprEnd, EOF
            ]
        );
    }

    #[test]
    fn unterminated_tag_stops_at_next_tag() {
        assert_eq!(
            kinds("{{ ab {{ c }}"),
            vec![ExprBegin, Identifier, ExprBegin, Identifier, ExprEnd, EOF]
        );
    }

    #[test]
    fn numbers_and_attribute_access() {
        assert_eq!(
            kinds("{{ 1.5 + 2 ~ x.1 }}"),
            vec![ExprBegin, Float, Plus, Integer, Tilde, Identifier, Dot, Integer, ExprEnd, EOF]
        );
    }

    #[test]
    fn unquote_strips_either_quote() {
        assert_eq!(unquote("\"base.html\""), "base.html");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("'open"), "open");
    }
}
