use std::{
    fs, io,
    ops::Index,
    path::Path,
};

use crate::source::{DocumentId, SourceFile};

/// 命令行模式下从磁盘加载的文件表
///
/// 编号按加载顺序分配，同一路径只加载一次。
#[derive(Debug, Default)]
pub struct SourceManager {
    files: Vec<SourceFile>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> io::Result<DocumentId> {
        let abs_path = fs::canonicalize(path.as_ref())?;

        if let Some(id) = self.files.iter().position(|f| f.path == abs_path) {
            return Ok(DocumentId::new(id as u32));
        }

        let src = fs::read_to_string(&abs_path)?;
        let id = DocumentId::new(self.files.len() as u32);
        self.files.push(SourceFile::new(abs_path, src));
        Ok(id)
    }
}

impl Index<DocumentId> for SourceManager {
    type Output = SourceFile;

    fn index(&self, index: DocumentId) -> &Self::Output {
        &self.files[index.get() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_loads_once() {
        let dir = std::env::temp_dir().join(format!("jinja-lens-manager-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("base.html");
        fs::write(&path, "{{ title }}").unwrap();

        let mut manager = SourceManager::new();
        let first = manager.load_file(&path).unwrap();
        let again = manager.load_file(dir.join(".").join("base.html")).unwrap();
        assert_eq!(first, again);
        assert_eq!(manager[first].src, "{{ title }}");
        assert!(manager.load_file(dir.join("missing.html")).is_err());
    }
}
