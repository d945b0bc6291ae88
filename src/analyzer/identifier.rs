use lsp_types::SymbolKind;
use serde::{Deserialize, Serialize};

use crate::query::CompletionKind;
use crate::utils::Range;

/// 标识符分类 (封闭集合)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentifierKind {
    ForLoopKey,
    ForLoopValue,
    /// 隐式的 `loop`，范围是 for 关键字
    ForLoopCount,
    SetVariable,
    WithVariable,
    MacroName,
    MacroParameter,
    TemplateBlock,
    BackendVariable,
    UndefinedVariable,
    JinjaTemplateRef,
    Link,
}

impl IdentifierKind {
    pub fn completion_detail(&self) -> &'static str {
        match self {
            IdentifierKind::ForLoopKey => "For loop key",
            IdentifierKind::ForLoopValue => "For loop value",
            IdentifierKind::ForLoopCount => "For loop count",
            IdentifierKind::SetVariable => "Set variable",
            IdentifierKind::WithVariable => "With variable",
            IdentifierKind::MacroName => "Macro",
            IdentifierKind::MacroParameter => "Macro parameter",
            IdentifierKind::TemplateBlock => "Template block",
            IdentifierKind::BackendVariable => "Backend variable",
            IdentifierKind::UndefinedVariable => "Undefined variable",
            IdentifierKind::JinjaTemplateRef => "Jinja template",
            IdentifierKind::Link => "Link",
        }
    }

    pub fn completion_kind(&self) -> CompletionKind {
        match self {
            IdentifierKind::ForLoopKey
            | IdentifierKind::ForLoopValue
            | IdentifierKind::SetVariable
            | IdentifierKind::WithVariable
            | IdentifierKind::BackendVariable => CompletionKind::Variable,
            IdentifierKind::ForLoopCount | IdentifierKind::MacroParameter => CompletionKind::Field,
            IdentifierKind::MacroName => CompletionKind::Function,
            IdentifierKind::TemplateBlock => CompletionKind::Module,
            IdentifierKind::UndefinedVariable => CompletionKind::Constant,
            IdentifierKind::JinjaTemplateRef => CompletionKind::File,
            IdentifierKind::Link => CompletionKind::Text,
        }
    }

    /// 大纲 (documentSymbol) 里的图标
    pub fn symbol_kind(&self) -> SymbolKind {
        match self {
            IdentifierKind::ForLoopKey
            | IdentifierKind::ForLoopValue
            | IdentifierKind::SetVariable
            | IdentifierKind::WithVariable
            | IdentifierKind::BackendVariable => SymbolKind::VARIABLE,
            IdentifierKind::ForLoopCount | IdentifierKind::MacroParameter => SymbolKind::FIELD,
            IdentifierKind::MacroName => SymbolKind::FUNCTION,
            IdentifierKind::TemplateBlock => SymbolKind::MODULE,
            IdentifierKind::UndefinedVariable => SymbolKind::CONSTANT,
            IdentifierKind::JinjaTemplateRef => SymbolKind::FILE,
            IdentifierKind::Link => SymbolKind::STRING,
        }
    }

    /// 能被变量引用绑定的声明
    /// block 名只用于继承覆盖，不是变量
    pub fn binds_references(&self) -> bool {
        matches!(
            self,
            IdentifierKind::ForLoopKey
                | IdentifierKind::ForLoopValue
                | IdentifierKind::ForLoopCount
                | IdentifierKind::SetVariable
                | IdentifierKind::WithVariable
                | IdentifierKind::MacroName
                | IdentifierKind::MacroParameter
                | IdentifierKind::BackendVariable
        )
    }
}

/// 一个被分类、带位置的 token
///
/// `range` 是名字本身在源码里的位置。例外是隐式的 `loop`：
/// 它在源码里没有 token，`name` 是 "loop"，`range` 是所属 for 关键字。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub range: Range,
    pub name: String,
    pub kind: IdentifierKind,
    /// 只有 UndefinedVariable (或局部语法问题) 才带
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Identifier {
    pub fn new(name: impl Into<String>, range: Range, kind: IdentifierKind) -> Self {
        Self {
            range,
            name: name.into(),
            kind,
            error: None,
        }
    }

    pub fn undefined(name: impl Into<String>, range: Range, error: String) -> Self {
        Self {
            range,
            name: name.into(),
            kind: IdentifierKind::UndefinedVariable,
            error: Some(error),
        }
    }
}

/// 排序 + 去重：按起点排序，(range, kind) 相同的只保留一个
pub fn normalize(identifiers: &mut Vec<Identifier>) {
    identifiers.sort_by(|a, b| {
        (a.range.start, a.range.end, a.kind).cmp(&(b.range.start, b.range.end, b.kind))
    });
    identifiers.dedup_by(|a, b| a.range == b.range && a.kind == b.kind);
}
