pub mod composer;
pub mod config;
pub mod error;
pub mod index;
pub mod rowstore;
pub mod tokenizer;

pub use composer::TableIndex;
pub use config::{IndexSettings, PerformanceProfile, ReadStrategy, RowStoreConfig, TokenizerConfig};
pub use error::{LsearchError, Result};
pub use index::{DocId, InvertedIndex, Posting, TermId};
pub use rowstore::{Row, RowSchema, RowStore, Value};
pub use tokenizer::Tokenizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
