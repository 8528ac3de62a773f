use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Arrow schema for the fragment table. `metadata` is the fragment's
/// metadata map serialized as JSON so provenance survives alongside the
/// vectors.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("ordinal", DataType::Int64, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            true,
        ),
    ]))
}
