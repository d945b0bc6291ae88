//! 宿主语言文件 (Rust / Python) 的扫描
//!
//! 这里不做真正的语法分析，只把"某个位置上的名字"找出来：
//! 传给模板的变量 (BackendVariable) 和代码里引用的模板名 (JinjaTemplateRef)。

mod python;
mod rust;
mod scanner;

use serde::{Deserialize, Serialize};

use crate::analyzer::{Identifier, normalize};
use crate::source::SourceFile;

pub use scanner::{HostToken, HostTokenKind};

/// 后端语言族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendLang {
    #[serde(alias = "rs")]
    Rust,
    #[serde(alias = "py")]
    Python,
}

impl BackendLang {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.') {
            "rs" => Some(BackendLang::Rust),
            "py" | "pyi" => Some(BackendLang::Python),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            BackendLang::Rust => "rs",
            BackendLang::Python => "py",
        }
    }
}

/// 文档的语言分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Template,
    Backend(BackendLang),
}

impl Language {
    /// 除了已知的宿主语言扩展名，其余一律当模板处理
    pub fn from_extension(ext: &str) -> Self {
        match BackendLang::from_extension(ext) {
            Some(lang) => Language::Backend(lang),
            None => Language::Template,
        }
    }

    pub fn backend(&self) -> Option<BackendLang> {
        match self {
            Language::Backend(lang) => Some(*lang),
            Language::Template => None,
        }
    }
}

/// 扫描宿主语言文件，得到已排序的标识符表
pub fn scan(lang: BackendLang, file: &SourceFile) -> Vec<Identifier> {
    let tokens = scanner::tokenize(&file.src, lang);
    let mut identifiers = match lang {
        BackendLang::Rust => rust::collect(file, &tokens),
        BackendLang::Python => python::collect(file, &tokens),
    };
    normalize(&mut identifiers);
    identifiers
}
