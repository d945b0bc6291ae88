use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::{BackendLang, Language};
use crate::error::EngineResult;

/// 编辑器通过 initializationOptions 传进来的配置
/// 不认识的字段直接忽略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// 模板根目录：模板名 -> 文件路径
    pub templates: Option<PathBuf>,
    /// 启动时预先扫描的后端源码目录
    pub backend: Vec<PathBuf>,
    /// 模板解析后端变量时使用的语言族；None = 所有
    pub lang: Option<BackendLang>,
    #[serde(alias = "template_extensions")]
    pub template_extensions: Vec<String>,
    #[serde(alias = "hide_undefined")]
    pub hide_undefined: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            templates: None,
            backend: Vec::new(),
            lang: None,
            template_extensions: vec!["html".into(), "jinja".into(), "j2".into(), "jinja2".into()],
            hide_undefined: false,
        }
    }
}

impl EngineConfig {
    /// null 或缺省时使用默认配置
    pub fn from_json(value: serde_json::Value) -> EngineResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(text: &str) -> EngineResult<Self> {
        Self::from_json(serde_json::from_str(text)?)
    }

    /// 前端 (命令行 / LSP) 用来判断文件要不要分析
    pub fn language_of(&self, path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?;
        match Language::from_extension(ext) {
            Language::Template if !self.is_template_extension(ext) => None,
            lang => Some(lang),
        }
    }

    pub fn is_template_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.template_extensions.iter().any(|e| e.trim_start_matches('.') == ext)
    }

    /// 模板名对应的磁盘路径
    pub fn template_path(&self, name: &str) -> Option<PathBuf> {
        self.templates.as_ref().map(|root| root.join(name))
    }
}
