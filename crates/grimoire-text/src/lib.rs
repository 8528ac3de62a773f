//! Sparse (lexical) backend: an in-memory tantivy index over the fragment
//! set, rebuilt from the fragment store at process start.

mod index;
mod tantivy_utils;

pub use index::SparseTextIndex;
