//! Schema and text analyzer for the lexical index.
//!
//! The analyzer is tuned for rulebook prose and player questions rather
//! than general documents. The stop list stays deliberately small: modal
//! verbs ("can", "must", "may") and negation ("not") decide whether a rule
//! permits or forbids something, so they stay indexed even though a
//! general-purpose list would drop them.

use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{
    LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer,
};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "rules_text";

const STOP_WORDS: [&str; 42] = [
    // articles, conjunctions, prepositions
    "a", "an", "the", "and", "or", "of", "to", "in", "on", "at", "by", "for", "from", "with", "as",
    // pronouns and determiners
    "it", "its", "you", "your", "this", "that", "these", "those", "they", "them", "their",
    // auxiliaries that appear in nearly every rule sentence
    "is", "are", "was", "be", "has", "have", "had", "do", "does",
    // question scaffolding from user queries
    "how", "what", "when", "where", "which", "who", "why",
];

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let _id_field = schema_builder.add_text_field("id", STRING | STORED);
    let content_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let content_options = TextOptions::default().set_indexing_options(content_indexing);
    let _content_field = schema_builder.add_text_field("content", content_options);
    let _ordinal_field = schema_builder.add_u64_field("ordinal", STORED);
    schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
    // stat-block runs without whitespace can get long; cap the token
    // length so they cannot bloat the dictionary
    let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| (*s).to_string())))
        .build();
    index.tokenizers().register(TOKENIZER_NAME, analyzer);
}
