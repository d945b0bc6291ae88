use crate::analyzer::ScopeId;
use crate::utils::{Position, Range};

/// 模板里对变量的一次使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub range: Range,
    /// 求值所在的作用域 (for 的可迭代表达式属于外层作用域)
    pub scope: ScopeId,
}

impl Reference {
    /// 可见性比较用的位置
    pub fn at(&self) -> Position {
        self.range.start
    }
}

/// `| name` 或 `{% filter name %}` 里的过滤器名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterUse {
    pub name: String,
    pub range: Range,
}
