//! 查询：hover / 补全 / 跳转定义
//!
//! 查询只读：在一个读锁快照上完成，从不修改文档表。

mod completion;
mod definition;
mod hover;

use serde::{Deserialize, Serialize};

use crate::analyzer::{Analysis, FilterUse, Identifier, IdentifierKind, ResolvedReference};
use crate::config::EngineConfig;
use crate::hints::LinkHintManager;
use crate::store::{Document, StoreState};
use crate::utils::{Position, Range};

pub use completion::complete;
pub use definition::{goto_definition, missing_template};
pub use hover::hover;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hover {
    /// 内容格式，总是 "markdown"
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl Hover {
    pub fn markdown(value: impl Into<String>, range: Range) -> Self {
        Self {
            kind: "markdown".to_string(),
            value: value.into(),
            range: Some(range),
            label: None,
            documentation: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl From<Hover> for lsp_types::Hover {
    fn from(hover: Hover) -> Self {
        lsp_types::Hover {
            contents: lsp_types::HoverContents::Markup(lsp_types::MarkupContent {
                kind: lsp_types::MarkupKind::Markdown,
                value: hover.value,
            }),
            range: hover.range.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionType {
    Filter,
    Identifier,
    Snippet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionKind {
    Variable,
    Field,
    Function,
    Module,
    Constant,
    File,
    Text,
}

impl From<CompletionKind> for lsp_types::CompletionItemKind {
    fn from(kind: CompletionKind) -> Self {
        match kind {
            CompletionKind::Variable => lsp_types::CompletionItemKind::VARIABLE,
            CompletionKind::Field => lsp_types::CompletionItemKind::FIELD,
            CompletionKind::Function => lsp_types::CompletionItemKind::FUNCTION,
            CompletionKind::Module => lsp_types::CompletionItemKind::MODULE,
            CompletionKind::Constant => lsp_types::CompletionItemKind::CONSTANT,
            CompletionKind::File => lsp_types::CompletionItemKind::FILE,
            CompletionKind::Text => lsp_types::CompletionItemKind::TEXT,
        }
    }
}

/// 补全候选
/// insert_range 和 replace_range 至多有一个
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub completion_type: CompletionType,
    pub label: String,
    pub kind: CompletionKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_range: Option<Range>,
}

impl From<CompletionItem> for lsp_types::CompletionItem {
    fn from(item: CompletionItem) -> Self {
        let text = item.new_text.clone().unwrap_or_else(|| item.label.clone());
        let text_edit = item
            .replace_range
            .or(item.insert_range)
            .map(|range| {
                lsp_types::CompletionTextEdit::Edit(lsp_types::TextEdit::new(range.into(), text))
            });
        let kind = match item.completion_type {
            CompletionType::Snippet => lsp_types::CompletionItemKind::SNIPPET,
            _ => item.kind.into(),
        };
        let insert_text_format = match item.completion_type {
            CompletionType::Snippet => Some(lsp_types::InsertTextFormat::SNIPPET),
            _ => None,
        };
        lsp_types::CompletionItem {
            label: item.label,
            kind: Some(kind),
            detail: Some(item.description),
            text_edit,
            insert_text_format,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub uri: String,
    pub range: Range,
    /// 定义在宿主语言文件里
    pub is_backend: bool,
    pub name: String,
}

/// 查询需要的全部只读状态
pub struct QueryContext<'a> {
    pub state: &'a StoreState,
    pub hints: &'a LinkHintManager,
    pub config: &'a EngineConfig,
}

/// 光标下的东西
#[derive(Debug, Clone, Copy)]
pub(crate) enum Target<'a> {
    Reference(&'a ResolvedReference),
    Filter(&'a FilterUse),
    Identifier(&'a Identifier),
}

impl Target<'_> {
    fn range(&self) -> Range {
        match self {
            Target::Reference(r) => r.reference.range,
            Target::Filter(f) => f.range,
            Target::Identifier(id) => id.range,
        }
    }
}

/// 找光标下的引用 / 过滤器 / 表内标识符
/// 严格包含优先；其次接受光标紧贴在末尾的情况
pub(crate) fn target_at<'a>(
    document: &'a Document,
    analysis: &'a Analysis,
    position: Position,
) -> Option<Target<'a>> {
    let mut candidates: Vec<Target<'a>> = Vec::new();
    candidates.extend(analysis.references.iter().map(Target::Reference));
    if let Some(syntax) = document.syntax() {
        candidates.extend(syntax.filters.iter().map(Target::Filter));
    }
    // 模板里的未定义变量已经作为引用出现过
    let is_template = document.syntax().is_some();
    candidates.extend(
        analysis
            .identifiers
            .iter()
            .filter(|id| !(is_template && id.kind == IdentifierKind::UndefinedVariable))
            .map(Target::Identifier),
    );

    candidates
        .iter()
        .find(|t| t.range().contains(position))
        .or_else(|| candidates.iter().find(|t| t.range().touches(position)))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_item_serializes_camel_case() {
        let item = CompletionItem {
            completion_type: CompletionType::Identifier,
            label: "user".into(),
            kind: CompletionKind::Variable,
            description: "Backend variable".into(),
            new_text: None,
            insert_range: None,
            replace_range: Some(Range::new(Position::new(0, 3), Position::new(0, 5))),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["completionType"], "Identifier");
        assert_eq!(json["replaceRange"]["end"]["character"], 5);
        assert!(json.get("insertRange").is_none());
    }

    #[test]
    fn completion_item_to_lsp_uses_replace_edit() {
        let item = CompletionItem {
            completion_type: CompletionType::Snippet,
            label: "for1".into(),
            kind: CompletionKind::Text,
            description: "Basic for loop".into(),
            new_text: Some(" for x in xs %}".into()),
            insert_range: Some(Range::empty(Position::new(1, 2))),
            replace_range: None,
        };
        let lsp: lsp_types::CompletionItem = item.into();
        assert_eq!(lsp.kind, Some(lsp_types::CompletionItemKind::SNIPPET));
        match lsp.text_edit {
            Some(lsp_types::CompletionTextEdit::Edit(edit)) => {
                assert_eq!(edit.new_text, " for x in xs %}");
                assert_eq!(edit.range.start, lsp_types::Position::new(1, 2));
            }
            other => panic!("unexpected edit {:?}", other),
        }
    }
}
