//! Static on-disk inverted index
//!
//! # Architecture
//!
//! - `VocabularyBuilder`: assigns term ids, emits postings and frequencies
//! - `PostingLayout`: groups postings per term in ascending term order
//! - `PostingStore`: postings blob + term offset directory on disk
//! - `QueryEngine`: tokenizes a query and intersects doc id lists
//! - `InvertedIndex`: build/open/lookup/search handle over the above

mod types;
mod vocabulary;
mod layout;
mod postings;
mod directory;
mod store;
mod query;
mod inverted;

pub use types::*;
pub use vocabulary::*;
pub use layout::*;
pub use postings::*;
pub use directory::*;
pub use store::*;
pub use query::*;
pub use inverted::*;
