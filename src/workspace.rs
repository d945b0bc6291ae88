//! 从磁盘发现要分析的文件 (LSP 启动预加载 / 命令行目录参数)

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use log::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::backend::Language;
use crate::config::EngineConfig;

/// 这些目录里不会有模板或后端源码
const SKIPPED_DIRS: [&str; 5] = ["target", "node_modules", "__pycache__", "venv", "site-packages"];

/// 模板根目录和后端目录下的全部文件
pub fn discover(config: &EngineConfig) -> Vec<(PathBuf, Language)> {
    discover_in(config, config.templates.iter().chain(config.backend.iter()))
}

/// 递归扫描若干根目录，只保留配置认识的扩展名
///
/// 同一个文件只出现一次；后端文件排在模板前面，同类按路径排序。
pub fn discover_in<'a>(
    config: &EngineConfig,
    roots: impl IntoIterator<Item = &'a PathBuf>,
) -> Vec<(PathBuf, Language)> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for root in roots {
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| !is_skipped(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("walking {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(language) = config.language_of(entry.path()) else {
                continue;
            };
            // 根目录可能互相包含 ("." 和 "./templates")
            let key = fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());
            if seen.insert(key) {
                found.push((entry.into_path(), language));
            }
        }
    }
    found.sort_by(|(a, la), (b, lb)| {
        (*la == Language::Template, a).cmp(&(*lb == Language::Template, b))
    });
    debug!("discovered {} files", found.len());
    found
}

/// 隐藏目录和构建产物目录不进去 (根目录本身除外，"." 也是隐藏名)
fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    let name: &str = &name;
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::backend::BackendLang;

    fn tree(name: &str, files: &[&str]) -> PathBuf {
        let root = std::env::temp_dir().join(format!("jinja-lens-walk-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        root
    }

    fn relative(root: &Path, found: &[(PathBuf, Language)]) -> Vec<String> {
        found
            .iter()
            .map(|(path, _)| path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn backend_first_and_noise_skipped() {
        let root = tree(
            "noise",
            &[
                "templates/index.html",
                "templates/partials/nav.j2",
                "app.py",
                "src/routes.rs",
                "README.md",
                ".git/hooks/pre-commit.py",
                "node_modules/pkg/index.html",
                "target/debug/build.rs",
            ],
        );
        let found = discover_in(&EngineConfig::default(), [&root]);
        assert_eq!(
            relative(&root, &found),
            vec!["app.py", "src/routes.rs", "templates/index.html", "templates/partials/nav.j2"]
        );
        assert_eq!(found[0].1, Language::Backend(BackendLang::Python));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn nested_roots_do_not_duplicate() {
        let root = tree("nested", &["templates/base.html", "views.py"]);
        let config = EngineConfig {
            templates: Some(root.join("templates")),
            backend: vec![root.clone()],
            ..EngineConfig::default()
        };
        let found = discover(&config);
        assert_eq!(relative(&root, &found), vec!["views.py", "templates/base.html"]);
        let _ = fs::remove_dir_all(&root);
    }
}
