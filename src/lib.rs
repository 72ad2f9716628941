pub mod api;
pub mod ast;
pub mod cache;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod transformer;
pub mod tree;
pub mod utils;
pub mod validator;
pub mod vocabulary;

pub use api::{parse_document, validate, validate_file, ParsedScript, ValidationResult};
pub use config::ValidatorConfig;
pub use error::{BelError, ValidationError, ValidationWarning};
pub use report::Record;
pub use vocabulary::{FileFetcher, MemoryStore, SourceFetcher, VocabularyStore};
