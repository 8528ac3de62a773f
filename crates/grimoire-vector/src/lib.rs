//! Dense (vector) backend: a persisted LanceDB table of fragment
//! embeddings, reopenable by directory + table name without re-embedding.

mod index;
mod schema;

pub use index::LanceDenseIndex;
pub use schema::build_arrow_schema;
