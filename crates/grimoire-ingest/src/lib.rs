//! Ingestion: structured record rendering, multi-edition supersession,
//! plain-text book chunking, and the fragment store that bridges ingest
//! and serving.

pub mod books;
pub mod normalize;
pub mod records;
pub mod store;

pub use books::BookChunker;
pub use normalize::{Normalizer, SourceCollection};
pub use records::RuleRecord;
pub use store::FragmentStore;
