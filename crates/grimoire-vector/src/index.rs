use anyhow::Result;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use arrow_array::{
    FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray,
};

use grimoire_core::traits::VectorIndex;
use grimoire_core::types::{Fragment, SearchHit, SourceKind};

use crate::schema::build_arrow_schema;

/// LanceDB-backed dense index. Embeddings are computed once at build time
/// and persisted; reopening by path + table name never re-embeds existing
/// rows. Adds are upserts keyed by fragment id, so duplicate identities
/// overwrite and disjoint identities append.
pub struct LanceDenseIndex {
    db: Connection,
    table_name: String,
    dim: i32,
}

impl LanceDenseIndex {
    pub async fn open(db_dir: &Path, table_name: &str, dim: usize) -> Result<Self> {
        let db = connect(db_dir.to_string_lossy().as_ref()).execute().await?;
        Ok(Self { db, table_name: table_name.to_string(), dim: i32::try_from(dim)? })
    }

    pub async fn count(&self) -> Result<usize> {
        let names = self.db.table_names().execute().await?;
        if !names.contains(&self.table_name) {
            return Ok(0);
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        Ok(table.count_rows(None).await?)
    }

    fn to_record_batch(&self, fragments: &[Fragment], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
        let schema = build_arrow_schema(self.dim);
        let mut ids = Vec::new();
        let mut contents = Vec::new();
        let mut metadatas = Vec::new();
        let mut ordinals = Vec::new();
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
        for (fragment, embedding) in fragments.iter().zip(embeddings.iter()) {
            anyhow::ensure!(
                embedding.len() == self.dim as usize,
                "embedding length {} does not match index dimension {}",
                embedding.len(),
                self.dim
            );
            ids.push(fragment.id.clone());
            contents.push(fragment.content.clone());
            metadatas.push(serde_json::to_string(&fragment.metadata)?);
            ordinals.push(fragment.ordinal as i64);
            vectors.push(Some(embedding.iter().map(|&x| Some(x)).collect()));
        }
        let record_batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(metadatas)),
                Arc::new(Int64Array::from(ordinals)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(vectors.into_iter(), self.dim)),
            ],
        )?;
        Ok(record_batch)
    }
}

#[async_trait::async_trait]
impl VectorIndex for LanceDenseIndex {
    async fn add(&self, fragments: &[Fragment], embeddings: &[Vec<f32>]) -> Result<()> {
        if fragments.is_empty() {
            return Ok(());
        }
        anyhow::ensure!(
            fragments.len() == embeddings.len(),
            "fragments and embeddings length must match"
        );
        let record_batch = self.to_record_batch(fragments, embeddings)?;
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        let names = self.db.table_names().execute().await?;
        if names.contains(&self.table_name) {
            let table = self.db.open_table(&self.table_name).execute().await?;
            // upsert keyed by id: newer rows replace older ones
            let mut merge = table.merge_insert(&["id"]);
            merge.when_matched_update_all(None).when_not_matched_insert_all();
            let _ = merge.execute(reader).await?;
        } else {
            self.db.create_table(&self.table_name, reader).execute().await?;
        }
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        let mut stream = table
            .vector_search(query_vec.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let ids = batch
                .column_by_name("id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("id column missing"))?;
            let ordinals = batch
                .column_by_name("ordinal")
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
                .ok_or_else(|| anyhow::anyhow!("ordinal column missing"))?;
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());
            for i in 0..batch.num_rows() {
                let score = match distances {
                    Some(col) => 1.0 - col.value(i),
                    None => 0.5,
                };
                hits.push(SearchHit {
                    id: ids.value(i).to_string(),
                    score,
                    ordinal: ordinals.value(i) as usize,
                    source: SourceKind::Dense,
                });
            }
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
