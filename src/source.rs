mod file;
mod fileid;
mod manager;

pub use file::SourceFile;
pub use fileid::DocumentId;
pub use manager::SourceManager;
