use anyhow::Result;
use std::cmp::Ordering;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, TantivyDocument};

use grimoire_core::traits::TextIndex;
use grimoire_core::types::{Fragment, SearchHit, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer};

/// BM25-scored lexical index held entirely in RAM. There is no on-disk
/// state: the index is rebuilt from the serialized fragment list at every
/// process start.
pub struct SparseTextIndex {
    index: Index,
    id_field: tantivy::schema::Field,
    content_field: tantivy::schema::Field,
    ordinal_field: tantivy::schema::Field,
}

impl SparseTextIndex {
    pub fn build(fragments: &[Fragment]) -> Result<Self> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        register_tokenizer(&index);
        let id_field = schema.get_field("id")?;
        let content_field = schema.get_field("content")?;
        let ordinal_field = schema.get_field("ordinal")?;
        let me = Self { index, id_field, content_field, ordinal_field };
        TextIndex::index(&me, fragments)?;
        tracing::debug!(fragments = fragments.len(), "sparse index built");
        Ok(me)
    }
}

impl TextIndex for SparseTextIndex {
    fn index(&self, fragments: &[Fragment]) -> Result<()> {
        let mut writer = self.index.writer(50_000_000)?;
        for f in fragments {
            let document = doc!(
                self.id_field => f.id.clone(),
                self.content_field => f.content.clone(),
                self.ordinal_field => f.ordinal as u64,
            );
            writer.add_document(document)?;
        }
        writer.commit()?;
        Ok(())
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let reader = self.index.reader()?;
        let searcher = reader.searcher();
        let query_parser = QueryParser::for_index(&self.index, vec![self.content_field]);
        // user questions contain punctuation that the strict parser rejects
        let (parsed, errors) = query_parser.parse_query_lenient(query);
        if !errors.is_empty() {
            tracing::debug!(?errors, "lenient query parse");
        }
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(k))?;
        let mut hits = Vec::new();
        for (score, addr) in top_docs {
            let document: TantivyDocument = searcher.doc(addr)?;
            let id = document
                .get_first(self.id_field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let ordinal = document
                .get_first(self.ordinal_field)
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize;
            hits.push(SearchHit { id, score, ordinal, source: SourceKind::Sparse });
        }
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.ordinal.cmp(&b.ordinal))
        });
        hits.truncate(k);
        Ok(hits)
    }
}
