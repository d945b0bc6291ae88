use crate::backend::BackendLang;
use crate::utils::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostTokenKind {
    Ident,
    Str,
    Number,
    /// 运算符 / 标点，多字符的 (`=>`, `==`, `::` ...) 合成一个
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostToken {
    pub kind: HostTokenKind,
    pub span: Span,
}

impl HostToken {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        self.span.text(src)
    }

    pub fn is_punct(&self, src: &str, op: &str) -> bool {
        self.kind == HostTokenKind::Punct && self.text(src) == op
    }

    /// 字符串字面量去掉前缀和引号后的内容区间
    pub fn string_content(&self, src: &str) -> Span {
        let text = self.text(src);
        let prefix = text.find(['"', '\'']).unwrap_or(0);
        let body = &text[prefix..];
        let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''") {
            3
        } else if body.is_empty() {
            0
        } else {
            1
        };
        let start = self.span.start + prefix + quote_len;
        // 收尾引号加上 Rust 原始字符串的 #
        let hashes = text[..prefix].matches('#').count();
        let closing = format!("{}{}", &body[..quote_len], "#".repeat(hashes));
        let trailing = if body.len() >= quote_len + closing.len() && body.ends_with(&closing) {
            closing.len()
        } else {
            0
        };
        let end = (self.span.end - trailing).max(start);
        Span::new(start, end)
    }
}

const MULTI_CHAR_OPS: [&str; 9] = ["=>", "==", "!=", "<=", ">=", "->", "::", "**", "//"];

/// 跳过注释，切出宿主语言的粗粒度 token
pub fn tokenize(src: &str, lang: BackendLang) -> Vec<HostToken> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let rest = &src[i..];
        let c = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };

        if c.is_whitespace() {
            i += c.len_utf8();
            continue;
        }

        // 注释
        match lang {
            BackendLang::Rust if rest.starts_with("//") => {
                i += rest.find('\n').unwrap_or(rest.len());
                continue;
            }
            BackendLang::Rust if rest.starts_with("/*") => {
                i += skip_block_comment(rest);
                continue;
            }
            BackendLang::Python if c == '#' => {
                i += rest.find('\n').unwrap_or(rest.len());
                continue;
            }
            _ => {}
        }

        let start = i;

        // 带前缀的字符串：r"..", r#".."#, b"..", f"..", rb'..'
        if let Some(len) = prefixed_string(rest, lang) {
            i += len;
            tokens.push(HostToken {
                kind: HostTokenKind::Str,
                span: Span::new(start, i),
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let len = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            i += len;
            tokens.push(HostToken {
                kind: HostTokenKind::Ident,
                span: Span::new(start, i),
            });
            continue;
        }

        if c.is_ascii_digit() {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
                .unwrap_or(rest.len());
            i += len;
            tokens.push(HostToken {
                kind: HostTokenKind::Number,
                span: Span::new(start, i),
            });
            continue;
        }

        if c == '"' || (c == '\'' && lang == BackendLang::Python) {
            i += quoted_len(rest, lang);
            tokens.push(HostToken {
                kind: HostTokenKind::Str,
                span: Span::new(start, i),
            });
            continue;
        }

        if c == '\'' {
            // Rust：字符字面量还是生命周期
            let len = rust_char_len(rest);
            i += len;
            if len > 2 {
                tokens.push(HostToken {
                    kind: HostTokenKind::Str,
                    span: Span::new(start, i),
                });
            }
            continue;
        }

        let len = MULTI_CHAR_OPS
            .iter()
            .find(|op| rest.starts_with(**op))
            .map(|op| op.len())
            .unwrap_or(c.len_utf8());
        i += len;
        tokens.push(HostToken {
            kind: HostTokenKind::Punct,
            span: Span::new(start, i),
        });
    }
    tokens
}

fn skip_block_comment(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    rest.len()
}

fn prefixed_string(rest: &str, lang: BackendLang) -> Option<usize> {
    let prefix_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let prefix = &rest[..prefix_len];
    let valid = match lang {
        BackendLang::Rust => matches!(prefix, "r" | "b" | "br" | "c" | "cr"),
        BackendLang::Python => {
            !prefix.is_empty()
                && prefix.len() <= 2
                && prefix.chars().all(|c| "rbfuRBFU".contains(c))
        }
    };
    if !valid {
        return None;
    }
    let after = &rest[prefix_len..];

    if lang == BackendLang::Rust && prefix.ends_with('r') {
        // r#"..."#：数 # 的个数
        let hashes = after.len() - after.trim_start_matches('#').len();
        let body = &after[hashes..];
        if !body.starts_with('"') {
            return None;
        }
        let closing = format!("\"{}", "#".repeat(hashes));
        let end = body[1..]
            .find(&closing)
            .map(|p| 1 + p + closing.len())
            .unwrap_or(body.len());
        return Some(prefix_len + hashes + end);
    }

    if after.starts_with('"') || (lang == BackendLang::Python && after.starts_with('\'')) {
        return Some(prefix_len + quoted_len(after, lang));
    }
    None
}

/// 普通带引号字符串 (含 Python 三引号) 的长度
fn quoted_len(rest: &str, lang: BackendLang) -> usize {
    let triple = lang == BackendLang::Python && (rest.starts_with("\"\"\"") || rest.starts_with("'''"));
    if triple {
        let delim = &rest[..3];
        return rest[3..]
            .find(delim)
            .map(|p| 3 + p + 3)
            .unwrap_or(rest.len());
    }

    let mut chars = rest.char_indices();
    let Some((_, quote)) = chars.next() else {
        return 0;
    };
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\n' if lang == BackendLang::Python => return i,
            c if c == quote => return i + c.len_utf8(),
            _ => {}
        }
    }
    rest.len()
}

/// `'a'` / `'\n'` 是字符字面量，`'a` 是生命周期 (只吃掉引号本身)
fn rust_char_len(rest: &str) -> usize {
    let mut chars = rest.char_indices().skip(1);
    match chars.next() {
        Some((_, '\\')) => {
            for (i, c) in chars {
                if c == '\'' {
                    return i + 1;
                }
                if c == '\n' {
                    break;
                }
            }
            1
        }
        Some((_, c)) => {
            let after = 1 + c.len_utf8();
            if rest[after..].starts_with('\'') {
                after + 1
            } else {
                1
            }
        }
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str, lang: BackendLang) -> Vec<&str> {
        tokenize(src, lang).iter().map(|t| t.text(src)).collect()
    }

    #[test]
    fn rust_comments_and_lifetimes_are_skipped() {
        let src = "fn f<'a>(x: &'a str) /* x */ { let c = 'q'; // tail\n }";
        let tokens = texts(src, BackendLang::Rust);
        assert!(tokens.contains(&"'q'"));
        assert!(!tokens.iter().any(|t| t.contains("tail") || t.contains("x */")));
        assert!(tokens.contains(&"a"));
    }

    #[test]
    fn raw_string_content_excludes_hashes() {
        let src = r###"x(r#"a"b"#)"###;
        let tokens = tokenize(src, BackendLang::Rust);
        let s = tokens.iter().find(|t| t.kind == HostTokenKind::Str).unwrap();
        assert_eq!(s.string_content(src).text(src), "a\"b");
    }

    #[test]
    fn python_triple_quotes_and_prefixes() {
        let src = "x = f'''a\nb''' # c\ny = rb\"z\"";
        let tokens = texts(src, BackendLang::Python);
        assert_eq!(tokens, vec!["x", "=", "f'''a\nb'''", "y", "=", "rb\"z\""]);
    }

    #[test]
    fn multi_char_operators_are_single_tokens() {
        let src = "a => b == c";
        assert_eq!(texts(src, BackendLang::Rust), vec!["a", "=>", "b", "==", "c"]);
    }
}
