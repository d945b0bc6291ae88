use crate::utils::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline(always)]
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
        }
    }
}

macro_rules! define_tokens {
    (
        dynamic { $($dynamic_variant:ident),* $(,)? }
        keywords { $($keyword_text:literal => $keyword_variant:ident),* $(,)? }
        symbols { $($symbol_text:literal => $symbol_variant:ident),* $(,)? }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum TokenKind {
            EOF,
            ERROR,
            // 动态 Token (由词法分析器根据上下文生成)
            $($dynamic_variant),*,
            // 关键字
            $($keyword_variant),*,
            // 符号
            $($symbol_variant),*,
        }

        impl TokenKind {
            pub fn as_str(&self) -> &'static str {
                match self {
                    TokenKind::EOF => "end of file",
                    TokenKind::ERROR => "error",
                    $(TokenKind::$dynamic_variant => stringify!($dynamic_variant)),*,
                    $(TokenKind::$keyword_variant => $keyword_text),*,
                    $(TokenKind::$symbol_variant => $symbol_text),*,
                }
            }

            pub fn lookup_keyword(text: &str) -> Option<TokenKind> {
                match text {
                    $($keyword_text => Some(TokenKind::$keyword_variant),)*
                    _ => None,
                }
            }

            pub fn is_keyword(&self) -> bool {
                matches!(self, $(TokenKind::$keyword_variant)|*)
            }
        }
    };
}

define_tokens! {
    dynamic {
        // --- 模板结构 ---
        Text,         // 标签之外的原始文本
        ExprBegin,    // {{  {{-
        ExprEnd,      // }}  -}}
        StmtBegin,    // {%  {%-  {%+
        StmtEnd,      // %}  -%}

        // --- 字面量 ---
        Identifier,
        Integer,
        Float,
        StringLiteral,
    }

    keywords {
        // --- 语句头 ---
        "for"       => For,
        "endfor"    => EndFor,
        "if"        => If,
        "elif"      => Elif,
        "else"      => Else,
        "endif"     => EndIf,
        "set"       => Set,
        "endset"    => EndSet,
        "with"      => With,
        "endwith"   => EndWith,
        "macro"     => Macro,
        "endmacro"  => EndMacro,
        "call"      => Call,
        "endcall"   => EndCall,
        "block"     => Block,
        "endblock"  => EndBlock,
        "filter"    => Filter,
        "endfilter" => EndFilter,
        "raw"       => Raw,
        "endraw"    => EndRaw,

        // --- 模板引用 ---
        "extends"   => Extends,
        "include"   => Include,
        "import"    => Import,
        "from"      => From,
        "as"        => As,

        // --- 表达式运算符 ---
        "in"        => In,
        "is"        => Is,
        "and"       => And,
        "or"        => Or,
        "not"       => Not,
        "recursive" => Recursive,
    }

    symbols {
        "|"   => Pipe,
        "."   => Dot,
        ","   => Comma,
        ":"   => Colon,
        "~"   => Tilde,
        "("   => LeftParen,
        ")"   => RightParen,
        "["   => LeftBracket,
        "]"   => RightBracket,
        "{"   => LeftBrace,
        "}"   => RightBrace,

        "="   => Assign,
        "=="  => Equal,
        "!="  => NotEqual,
        "<"   => LessThan,
        "<="  => LessEqual,
        ">"   => GreaterThan,
        ">="  => GreaterEqual,

        "+"   => Plus,
        "-"   => Minus,
        "*"   => Star,
        "**"  => StarStar,
        "/"   => Slash,
        "//"  => SlashSlash,
        "%"   => Percent,
    }
}

impl TokenKind {
    /// 可以当作名字使用的 token
    /// Jinja 的语句关键字只在语句开头有意义，表达式里 `block`、`filter` 等仍是普通变量名
    pub fn is_word(&self) -> bool {
        *self == TokenKind::Identifier || self.is_keyword()
    }

    /// 表达式里真正保留的关键字，不会是变量引用
    pub fn is_operator_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::In
                | TokenKind::Is
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::Recursive
        )
    }

    pub fn is_tag_begin(&self) -> bool {
        matches!(self, TokenKind::ExprBegin | TokenKind::StmtBegin)
    }

    pub fn is_tag_end(&self) -> bool {
        matches!(self, TokenKind::ExprEnd | TokenKind::StmtEnd)
    }
}
