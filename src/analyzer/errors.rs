use std::fmt;

/// 引用无法绑定的原因，渲染后写进 Identifier::error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// 作用域链和后端文件里都没有
    NotInScope(String),

    /// 同一模板里有声明，但不在引用所在的作用域链上 (或者声明在引用之后)
    /// 行号是 1-based
    DeclaredOutOfScope { name: String, line: u32 },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NotInScope(name) => {
                write!(f, "no binding for `{}` in scope", name)
            }
            UnresolvedReason::DeclaredOutOfScope { name, line } => {
                write!(
                    f,
                    "`{}` is declared at line {} but is not visible here",
                    name, line
                )
            }
        }
    }
}

/// 包含位置的未解析引用 (命令行诊断用)
#[derive(Debug, Clone)]
pub struct SemanticError {
    pub name: String,
    pub range: crate::utils::Range,
    pub reason: UnresolvedReason,
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}
