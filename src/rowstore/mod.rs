//! Columnar row store
//!
//! - `RowSchema`: fixed and variable columns compiled into a record layout
//! - `codec`: the single-record encode/decode routine
//! - `OffsetIndex`: ordinal row offsets persisted as text
//! - `RowStore`: serialize plus sequential, threaded, process and mmap reads

mod schema;
mod value;
mod codec;
mod offsets;
mod store;

pub use schema::*;
pub use value::*;
pub use codec::*;
pub use offsets::*;
pub use store::*;
