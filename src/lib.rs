// src/lib.rs

pub mod lexer;
pub mod parser;
pub mod source;
pub mod token;
pub mod utils;

pub mod analyzer;
pub mod backend;
pub mod catalog;
pub mod hints;
pub mod query;
pub mod store;

pub mod config;
pub mod engine;
pub mod error;
pub mod workspace;

pub mod driver;
pub use driver::Driver;

pub use analyzer::{Identifier, IdentifierKind};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use hints::Action;
pub use query::{CompletionItem, CompletionKind, CompletionType, Hover, Location};
pub use utils::{Position, Range};
