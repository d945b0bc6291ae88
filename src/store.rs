//! 文档表
//!
//! 所有文档放在一张 RwLock 保护的表里，每个文档是不可变的 `Arc<Document>` 快照：
//! 写操作在写锁下整体替换指针，读者要么看到旧快照，要么看到新快照。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, trace, warn};

use crate::analyzer::{Analysis, Analyzer, BackendIndex, Identifier};
use crate::backend::{self, BackendLang, Language};
use crate::parser::{Parser, TemplateSyntax};
use crate::source::{DocumentId, SourceFile};

/// 锁中毒时继续使用里面的数据：表本身总是处于一致状态 (写入是一次指针替换)
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub enum DocumentKind {
    Template(TemplateSyntax),
    Backend {
        lang: BackendLang,
        identifiers: Vec<Identifier>,
    },
}

#[derive(Debug)]
pub struct Document {
    pub id: DocumentId,
    pub file: SourceFile,
    pub extension: String,
    /// 写入时的全局版本号
    pub revision: u64,
    pub kind: DocumentKind,
    /// (后端版本, 分析结果)；后端版本变了就重新解析
    cache: Mutex<Option<(u64, Arc<Analysis>)>>,
}

impl Document {
    pub fn filename(&self) -> &str {
        &self.file.name
    }

    pub fn language(&self) -> Language {
        match &self.kind {
            DocumentKind::Template(_) => Language::Template,
            DocumentKind::Backend { lang, .. } => Language::Backend(*lang),
        }
    }

    pub fn syntax(&self) -> Option<&TemplateSyntax> {
        match &self.kind {
            DocumentKind::Template(syntax) => Some(syntax),
            DocumentKind::Backend { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct StoreState {
    documents: HashMap<DocumentId, Arc<Document>>,
    by_name: HashMap<String, DocumentId>,
    backend: BackendIndex,
    revision: u64,
    /// 后端变量集合每变一次加一，模板的解析缓存以它为准
    backend_generation: u64,
    family: Option<BackendLang>,
}

impl StoreState {
    pub fn document(&self, id: DocumentId) -> Option<&Arc<Document>> {
        self.documents.get(&id)
    }

    pub fn document_by_name(&self, filename: &str) -> Option<&Arc<Document>> {
        self.by_name.get(filename).and_then(|id| self.documents.get(id))
    }

    /// id 优先，id 不认识时按文件名找
    pub fn find(&self, id: DocumentId, filename: &str) -> Option<&Arc<Document>> {
        self.document(id).or_else(|| self.document_by_name(filename))
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    pub fn backend(&self) -> &BackendIndex {
        &self.backend
    }

    pub fn family(&self) -> Option<BackendLang> {
        self.family
    }

    /// 文档当前的分析结果 (必要时重新解析引用)
    pub fn analysis(&self, document: &Document) -> Arc<Analysis> {
        let mut cache = document.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((generation, analysis)) = cache.as_ref()
            && *generation == self.backend_generation
        {
            return Arc::clone(analysis);
        }

        let analysis = Arc::new(match &document.kind {
            DocumentKind::Template(syntax) => {
                trace!("resolving {} (generation {})", document.filename(), self.backend_generation);
                Analyzer::new(&document.file, syntax, &self.backend, self.family).analyze()
            }
            DocumentKind::Backend { identifiers, .. } => Analysis {
                identifiers: identifiers.clone(),
                ..Analysis::default()
            },
        });
        *cache = Some((self.backend_generation, Arc::clone(&analysis)));
        analysis
    }

    fn remove(&mut self, id: DocumentId) -> Option<Arc<Document>> {
        let document = self.documents.remove(&id)?;
        if self.by_name.get(document.filename()) == Some(&id) {
            self.by_name.remove(document.filename());
        }
        if self.backend.remove_document(id) {
            self.backend_generation += 1;
        }
        Some(document)
    }
}

/// 一次 addOne 的输入
#[derive(Debug, Clone)]
pub struct DocumentUpdate<'a> {
    pub id: DocumentId,
    pub filename: &'a str,
    pub content: &'a str,
    pub extension: &'a str,
    /// 光标位置提示 (只用于日志，不影响结果)
    pub line: u32,
    pub column: Option<u32>,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    state: RwLock<StoreState>,
}

impl DocumentStore {
    /// family: 模板解析后端变量时的语言族，None = 所有
    pub fn new(family: Option<BackendLang>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                family,
                ..StoreState::default()
            }),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        read_lock(&self.state)
    }

    /// 整体替换一个文档，返回它的完整标识符表
    pub fn add_one(&self, update: DocumentUpdate<'_>) -> Vec<Identifier> {
        let language = Language::from_extension(update.extension);
        debug!(
            "add_one #{} {} ({:?}, cursor {}:{:?})",
            update.id.get(),
            update.filename,
            language,
            update.line,
            update.column
        );

        // 1. 锁外完成词法/语法层的工作
        let file = SourceFile::new(PathBuf::from(update.filename), update.content.to_string());
        let kind = match language {
            Language::Template => DocumentKind::Template(Parser::parse(&file)),
            Language::Backend(lang) => DocumentKind::Backend {
                lang,
                identifiers: backend::scan(lang, &file),
            },
        };

        // 2. 写锁内：替换快照、更新后端索引
        let mut state = write_lock(&self.state);
        state.revision += 1;
        let revision = state.revision;

        // 同一个文件名换了 id：旧的那份作废
        if let Some(&old) = state.by_name.get(update.filename)
            && old != update.id
        {
            trace!("{} moved from #{} to #{}", update.filename, old.get(), update.id.get());
            state.remove(old);
        }
        state.remove(update.id);

        if let DocumentKind::Backend { lang, identifiers } = &kind {
            state
                .backend
                .insert_document(update.id, update.filename, *lang, revision, identifiers);
            state.backend_generation += 1;
        }

        let document = Arc::new(Document {
            id: update.id,
            file,
            extension: update.extension.to_string(),
            revision,
            kind,
            cache: Mutex::new(None),
        });
        state.documents.insert(update.id, Arc::clone(&document));
        state.by_name.insert(update.filename.to_string(), update.id);

        // 3. 返回前算好分析结果 (同时填好缓存)
        let analysis = state.analysis(&document);
        analysis.identifiers.clone()
    }

    /// 幂等
    pub fn delete_all(&self, filename: &str) {
        let mut state = write_lock(&self.state);
        match state.by_name.get(filename).copied() {
            Some(id) => {
                state.remove(id);
                debug!("delete_all {} (#{})", filename, id.get());
            }
            None => trace!("delete_all {}: not known", filename),
        }
    }

    pub fn get_variables(&self, id: &str, line: u32) -> Option<Vec<Identifier>> {
        let state = self.read();
        let document = match id.parse::<DocumentId>() {
            Ok(id) => state.document(id),
            Err(e) => {
                warn!("get_variables: {}, looking up by filename", e);
                state.document_by_name(id)
            }
        }?;
        let analysis = state.analysis(document);
        Some(
            analysis
                .identifiers
                .iter()
                .filter(|identifier| identifier.range.intersects_line(line))
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::IdentifierKind;

    fn update<'a>(id: u32, filename: &'a str, content: &'a str, extension: &'a str) -> DocumentUpdate<'a> {
        DocumentUpdate {
            id: DocumentId::new(id),
            filename,
            content,
            extension,
            line: 0,
            column: None,
        }
    }

    fn undefined_names(identifiers: &[Identifier]) -> Vec<&str> {
        identifiers
            .iter()
            .filter(|id| id.kind == IdentifierKind::UndefinedVariable)
            .map(|id| id.name.as_str())
            .collect()
    }

    #[test]
    fn backend_changes_invalidate_template_analysis() {
        let store = DocumentStore::new(None);
        let table = store.add_one(update(1, "page.jinja", "{{ user }}", "jinja"));
        assert_eq!(undefined_names(&table), vec!["user"]);

        store.add_one(update(2, "app.rs", "context! { user => u }", "rs"));
        let vars = store.get_variables("1", 0).unwrap();
        assert!(undefined_names(&vars).is_empty());

        store.delete_all("app.rs");
        let vars = store.get_variables("1", 0).unwrap();
        assert_eq!(undefined_names(&vars), vec!["user"]);
    }

    #[test]
    fn family_restricts_backend_lookup() {
        let store = DocumentStore::new(Some(BackendLang::Python));
        store.add_one(update(1, "app.rs", "context! { user => u }", "rs"));
        let table = store.add_one(update(2, "page.jinja", "{{ user }}", "jinja"));
        assert_eq!(undefined_names(&table), vec!["user"]);
    }

    #[test]
    fn readd_replaces_and_delete_is_idempotent() {
        let store = DocumentStore::new(None);
        store.add_one(update(1, "page.jinja", "{% set a = 1 %}", "jinja"));
        let table = store.add_one(update(1, "page.jinja", "{% set b = 1 %}", "jinja"));
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].name, "b");

        store.delete_all("page.jinja");
        store.delete_all("page.jinja");
        assert!(store.get_variables("1", 0).is_none());
        assert!(store.get_variables("page.jinja", 0).is_none());
    }

    #[test]
    fn same_filename_under_new_id_replaces_old() {
        let store = DocumentStore::new(None);
        store.add_one(update(1, "app.py", "t.render(title=x)", "py"));
        store.add_one(update(9, "app.py", "t.render(name=x)", "py"));
        assert!(store.get_variables("1", 0).is_none());
        let names: Vec<_> = store
            .get_variables("app.py", 0)
            .unwrap()
            .into_iter()
            .map(|id| id.name)
            .collect();
        assert_eq!(names, vec!["name"]);
        let state = store.read();
        assert!(state.backend().latest("title", None).is_none());
    }
}
