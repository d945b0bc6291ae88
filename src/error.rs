use std::fmt;
use std::path::PathBuf;

/// 引擎对外的错误
/// 只有配置解析和读文件会失败；查询一律返回 Option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Io { path: PathBuf, message: String },
    Config(String),
    InvalidDocumentId(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Io { path, message } => {
                write!(f, "cannot read `{}`: {}", path.display(), message)
            }
            EngineError::Config(message) => write!(f, "invalid configuration: {}", message),
            EngineError::InvalidDocumentId(raw) => write!(f, "invalid document id `{}`", raw),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
