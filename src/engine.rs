//! 引擎句柄：编辑器集成层唯一需要持有的对象

use std::path::PathBuf;

use log::{debug, trace};

use crate::analyzer::{Identifier, IdentifierKind};
use crate::config::EngineConfig;
use crate::hints::{Action, LinkHintManager};
use crate::query::{self, CompletionItem, Hover, Location, QueryContext};
use crate::source::DocumentId;
use crate::store::{Document, DocumentStore, DocumentUpdate};
use crate::utils::Position;

/// 一个工作区的全部状态
///
/// 所有方法都只要 `&self`：读操作可以并发，写操作 (add_one / delete_all) 在内部串行。
#[derive(Debug, Default)]
pub struct Engine {
    store: DocumentStore,
    hints: LinkHintManager,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: DocumentStore::new(config.lang),
            hints: LinkHintManager::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 分析 (或重新分析) 一个文档，返回完整的标识符表
    /// line / column 只是光标提示
    pub fn add_one(
        &self,
        id: u32,
        filename: &str,
        content: &str,
        line: u32,
        extension: &str,
        column: Option<u32>,
    ) -> Vec<Identifier> {
        self.store.add_one(DocumentUpdate {
            id: DocumentId::new(id),
            filename,
            content,
            extension,
            line,
            column,
        })
    }

    pub fn delete_all(&self, filename: &str) {
        self.store.delete_all(filename);
    }

    pub fn get_variables(&self, id: &str, line: u32) -> Option<Vec<Identifier>> {
        self.store.get_variables(id, line)
    }

    pub fn hover(&self, id: u32, filename: &str, line: u32, position: Position) -> Option<Hover> {
        self.query(id, filename, line, |ctx, document| query::hover(ctx, document, position))
    }

    pub fn complete(
        &self,
        id: u32,
        filename: &str,
        line: u32,
        position: Position,
    ) -> Option<Vec<CompletionItem>> {
        self.query(id, filename, line, |ctx, document| query::complete(ctx, document, position))
    }

    pub fn goto_definition(
        &self,
        id: u32,
        filename: &str,
        line: u32,
        position: Position,
    ) -> Option<Vec<Location>> {
        self.query(id, filename, line, |ctx, document| {
            query::goto_definition(ctx, document, position)
        })
    }

    /// 光标下引用的模板还不存在时，返回应该创建的路径 (快速修复用)
    pub fn missing_template(
        &self,
        id: u32,
        filename: &str,
        line: u32,
        position: Position,
    ) -> Option<PathBuf> {
        self.query(id, filename, line, |ctx, document| {
            query::missing_template(ctx, document, position)
        })
    }

    /// 文档大纲：声明、模板引用和未定义变量，按位置排序；链接不进大纲
    pub fn document_symbols(&self, id: u32, filename: &str) -> Option<Vec<Identifier>> {
        self.query(id, filename, 0, |ctx, document| {
            let analysis = ctx.state.analysis(document);
            Some(
                analysis
                    .identifiers
                    .iter()
                    .filter(|identifier| identifier.kind != IdentifierKind::Link)
                    .cloned()
                    .collect(),
            )
        })
    }

    pub fn add_link_hints(&self, uri: &str, actions: Option<Vec<Action>>) {
        self.hints.add_link_hints(uri, actions);
    }

    pub fn save_link_hint(&self, actions: Option<Vec<Action>>, hint: Option<&str>) {
        self.hints.save_link_hint(actions, hint);
    }

    pub fn remove_temp_link_hint(&self, hint: Option<&str>) {
        self.hints.remove_temp_link_hint(hint);
    }

    /// 文档里所有未定义的引用 (诊断用)；文档不存在时返回 None
    pub fn undefined(&self, filename: &str) -> Option<Vec<Identifier>> {
        let state = self.store.read();
        let document = state.document_by_name(filename)?;
        let analysis = state.analysis(document);
        Some(
            analysis
                .identifiers
                .iter()
                .filter(|id| id.kind == IdentifierKind::UndefinedVariable)
                .cloned()
                .collect(),
        )
    }

    /// 当前已知的全部模板文件名
    pub fn template_files(&self) -> Vec<String> {
        let state = self.store.read();
        let mut names: Vec<String> = state
            .documents()
            .filter(|doc| doc.syntax().is_some())
            .map(|doc| doc.filename().to_string())
            .collect();
        names.sort();
        names
    }

    /// 在读锁快照上执行一次查询；文档不存在时返回 None
    fn query<T>(
        &self,
        id: u32,
        filename: &str,
        line: u32,
        run: impl FnOnce(&QueryContext<'_>, &Document) -> Option<T>,
    ) -> Option<T> {
        let state = self.store.read();
        let Some(document) = state.find(DocumentId::new(id), filename) else {
            debug!("query on unknown document #{} {}", id, filename);
            return None;
        };
        trace!("query {} line hint {}", document.filename(), line);
        let ctx = QueryContext {
            state: &*state,
            hints: &self.hints,
            config: &self.config,
        };
        run(&ctx, document.as_ref())
    }
}
