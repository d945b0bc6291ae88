use serde::{Deserialize, Serialize};

/// 编辑器坐标：0-based 行号 + UTF-16 列号
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// 半开区间 `[start, end)`，start <= end (按字典序)
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start <= end, "Range start must be <= end");
        Self { start, end }
    }

    /// 零宽区间，用于纯插入
    pub const fn empty(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos >= self.start && pos < self.end
    }

    /// 包含末尾：光标停在标识符后面时仍然算"在标识符上"
    pub fn touches(&self, pos: Position) -> bool {
        pos >= self.start && pos <= self.end
    }

    /// 区间是否覆盖到某一行。结束于下一行第 0 列的区间不算覆盖下一行。
    pub fn intersects_line(&self, line: u32) -> bool {
        if line < self.start.line || line > self.end.line {
            return false;
        }
        !(line == self.end.line && self.end.character == 0 && self.start.line < line)
    }
}

impl From<Position> for lsp_types::Position {
    fn from(pos: Position) -> Self {
        lsp_types::Position::new(pos.line, pos.character)
    }
}

impl From<lsp_types::Position> for Position {
    fn from(pos: lsp_types::Position) -> Self {
        Position::new(pos.line, pos.character)
    }
}

impl From<Range> for lsp_types::Range {
    fn from(range: Range) -> Self {
        lsp_types::Range::new(range.start.into(), range.end.into())
    }
}

impl From<lsp_types::Range> for Range {
    fn from(range: lsp_types::Range) -> Self {
        Range {
            start: range.start.into(),
            end: range.end.into(),
        }
    }
}
