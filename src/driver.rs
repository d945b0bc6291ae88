use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::analyzer::Identifier;
use crate::backend::Language;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::source::{DocumentId, SourceFile, SourceManager};
use crate::utils::Range;
use crate::workspace;

/// 命令行检查器：从磁盘加载文件，放进同一个工作区分析，输出未定义变量
pub struct Driver {
    pub engine: Engine,
    pub sources: SourceManager,
}

impl Driver {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(config),
            sources: SourceManager::new(),
        }
    }

    /// 入口：返回格式化好的诊断 (为空表示没有问题)
    /// 目录参数会递归展开
    pub fn check_files(&mut self, paths: &[PathBuf]) -> EngineResult<Vec<String>> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                let found = workspace::discover_in(self.engine.config(), [path]);
                files.extend(found.into_iter().map(|(file, _)| file));
            } else {
                files.push(path.clone());
            }
        }

        // 1. 加载 (SourceManager 负责去重)
        let mut loaded = Vec::new();
        for path in &files {
            let Some(language) = self.engine.config().language_of(path) else {
                warn!("skipping {}: not a template or backend file", path.display());
                continue;
            };
            let id = self.sources.load_file(path).map_err(|e| EngineError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;
            if loaded.iter().any(|(known, _)| *known == id) {
                continue;
            }
            loaded.push((id, language));
        }

        // 2. 后端文件先分析，模板才能看到它们声明的变量
        loaded.sort_by_key(|(_, language)| *language == Language::Template);

        for (id, _) in &loaded {
            let file = &self.sources[*id];
            let extension = extension_of(&file.path);
            self.engine.add_one(id.get(), &file.name, &file.src, 0, &extension, None);
        }

        // 3. 收集模板里的未定义变量
        let mut diagnostics = Vec::new();
        for (id, language) in &loaded {
            if *language != Language::Template {
                continue;
            }
            let file = &self.sources[*id];
            for undefined in self.engine.undefined(&file.name).unwrap_or_default() {
                diagnostics.push(self.format_undefined(*id, &undefined));
            }
        }
        info!("checked {} files, {} problems", loaded.len(), diagnostics.len());
        Ok(diagnostics)
    }

    fn format_undefined(&self, id: DocumentId, undefined: &Identifier) -> String {
        let message = format!(
            "Error: {}",
            undefined.error.as_deref().unwrap_or("undefined variable")
        );
        self.format_diagnostic(&self.sources[id], undefined.range, &message)
    }

    /// 类似 rustc 的错误打印
    /// Error: message
    ///   --> templates/index.html:3:8
    ///    |
    ///   3| {{ usr.name }}
    ///    |    ^^^
    fn format_diagnostic(&self, file: &SourceFile, range: Range, message: &str) -> String {
        let (Some(start), Some(end)) = (file.offset_at(range.start), file.offset_at(range.end)) else {
            return format!("{} (at {:?})", message, range.start);
        };
        let (line, col, line_text) = file.lookup_location(start);

        // 下划线至少一个字符，且不超出这一行
        let highlight_len = if end > start {
            let max_len = line_text.len().saturating_sub(col - 1).max(1);
            std::cmp::min(end - start, max_len)
        } else {
            1
        };
        let pointer = "^".repeat(highlight_len);
        let padding = " ".repeat(col.saturating_sub(1));

        format!(
            "{}\n  --> {}:{}:{}\n   |\n{:3}| {}\n   | {}{}",
            message,
            file.name,
            line,
            col,
            line,
            line_text.trim_end(),
            padding,
            pointer
        )
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_string()
}
