use std::collections::HashMap;

use crate::analyzer::{Identifier, IdentifierKind};
use crate::backend::BackendLang;
use crate::source::DocumentId;
use crate::utils::Range;

/// 某个后端文件里声明的一个变量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEntry {
    pub document: DocumentId,
    pub filename: String,
    pub lang: BackendLang,
    pub range: Range,
    /// 写入时的全局版本号，越大越新
    pub revision: u64,
}

/// 跨文件的后端变量索引：名字 -> 所有声明位置
///
/// 文件之间不互相持有引用，跨文件解析就是在这里查一次表。
#[derive(Debug, Clone, Default)]
pub struct BackendIndex {
    entries: HashMap<String, Vec<BackendEntry>>,
}

impl BackendIndex {
    /// 用一个后端文件的新标识符表替换它原有的全部条目
    pub fn insert_document(
        &mut self,
        document: DocumentId,
        filename: &str,
        lang: BackendLang,
        revision: u64,
        identifiers: &[Identifier],
    ) {
        self.remove_document(document);
        for identifier in identifiers
            .iter()
            .filter(|id| id.kind == IdentifierKind::BackendVariable)
        {
            self.entries
                .entry(identifier.name.clone())
                .or_default()
                .push(BackendEntry {
                    document,
                    filename: filename.to_string(),
                    lang,
                    range: identifier.range,
                    revision,
                });
        }
    }

    /// 返回是否真的删掉了什么
    pub fn remove_document(&mut self, document: DocumentId) -> bool {
        let mut removed = false;
        self.entries.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.document != document);
            removed |= entries.len() != before;
            !entries.is_empty()
        });
        removed
    }

    /// 所有候选，最新写入的排在前面 (同一文件内按位置)
    pub fn lookup(&self, name: &str, family: Option<BackendLang>) -> Vec<&BackendEntry> {
        let mut found: Vec<&BackendEntry> = self
            .entries
            .get(name)
            .into_iter()
            .flatten()
            .filter(|entry| family.is_none_or(|lang| entry.lang == lang))
            .collect();
        found.sort_by(|a, b| {
            b.revision
                .cmp(&a.revision)
                .then_with(|| a.range.start.cmp(&b.range.start))
        });
        found
    }

    /// 最近写入的那个声明
    pub fn latest(&self, name: &str, family: Option<BackendLang>) -> Option<&BackendEntry> {
        self.lookup(name, family).into_iter().next()
    }

    /// 所有可见的名字 (补全用)，按名字排序
    pub fn names(&self, family: Option<BackendLang>) -> Vec<(&str, &BackendEntry)> {
        let mut names: Vec<(&str, &BackendEntry)> = self
            .entries
            .keys()
            .filter_map(|name| Some((name.as_str(), self.latest(name, family)?)))
            .collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        names
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
