use std::path::PathBuf;

use crate::utils::{Position, Range, Span};

/// 一份文档的原始文本 + 行索引
///
/// 内部统一用字节偏移，对外 (Position) 用 UTF-16 列号。
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub name: String,
    pub src: String,
    pub line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(path: PathBuf, src: String) -> Self {
        // 计算每一行的起始位置
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        let name = path.to_string_lossy().to_string();

        Self {
            path,
            name,
            src,
            line_starts,
        }
    }

    /// 0-based 行号
    fn line_index(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        }
    }

    /// 某一行的字节区间 (不含换行符)
    fn line_bounds(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line)?;
        let end = match self.line_starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.src.len(),
        };
        // 兼容 \r\n
        let end = if end > start && self.src.as_bytes().get(end - 1) == Some(&b'\r') {
            end - 1
        } else {
            end
        };
        Some((start, end.max(start)))
    }

    pub fn line_text(&self, line: usize) -> &str {
        match self.line_bounds(line) {
            Some((start, end)) => &self.src[start..end],
            None => "",
        }
    }

    /// 返回 (行号, 列号, 该行文本内容)，行列均为 1-based，用于命令行诊断输出
    pub fn lookup_location(&self, offset: usize) -> (usize, usize, &str) {
        let offset = offset.min(self.src.len());
        let line = self.line_index(offset);
        let line_start = self.line_starts[line];
        (line + 1, offset - line_start + 1, self.line_text(line))
    }

    /// 字节偏移 -> 编辑器坐标
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.src.len());
        let line = self.line_index(offset);
        let line_start = self.line_starts[line];
        let character: usize = self
            .src
            .get(line_start..offset)
            .unwrap_or("")
            .chars()
            .map(char::len_utf16)
            .sum();
        Position::new(line as u32, character as u32)
    }

    /// 编辑器坐标 -> 字节偏移
    /// 列号超出行尾时夹到行尾；行号越界返回 None
    pub fn offset_at(&self, pos: Position) -> Option<usize> {
        let (start, end) = self.line_bounds(pos.line as usize)?;
        let mut units = 0usize;
        for (i, c) in self.src[start..end].char_indices() {
            if units >= pos.character as usize {
                return Some(start + i);
            }
            units += c.len_utf16();
        }
        Some(end)
    }

    pub fn range_of(&self, span: Span) -> Range {
        Range::new(self.position_at(span.start), self.position_at(span.end))
    }

    pub fn end_position(&self) -> Position {
        self.position_at(self.src.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(src: &str) -> SourceFile {
        SourceFile::new(PathBuf::from("t.jinja"), src.to_string())
    }

    #[test]
    fn columns_are_utf16_units() {
        // "é" 是 2 字节 / 1 个 UTF-16 单元，"𝄞" 是 4 字节 / 2 个单元
        let f = file("é𝄞x\nab");
        let x = f.src.find('x').unwrap();
        assert_eq!(f.position_at(x), Position::new(0, 3));
        assert_eq!(f.offset_at(Position::new(0, 3)), Some(x));
        assert_eq!(f.position_at(f.src.len()), Position::new(1, 2));
    }

    #[test]
    fn offset_clamps_to_line_end() {
        let f = file("abc\r\nde");
        assert_eq!(f.offset_at(Position::new(0, 99)), Some(3));
        assert_eq!(f.offset_at(Position::new(1, 1)), Some(6));
        assert_eq!(f.offset_at(Position::new(5, 0)), None);
        assert_eq!(f.line_text(0), "abc");
    }

    #[test]
    fn lookup_location_is_one_based() {
        let f = file("a\n  b");
        let (line, col, text) = f.lookup_location(4);
        assert_eq!((line, col, text), (2, 3, "  b"));
    }
}
