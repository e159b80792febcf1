use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const ID_COL: &str = "id";
pub const TEXT_COL: &str = "text";
pub const METADATA_COL: &str = "metadata";
pub const VECTOR_COL: &str = "vector";

/// Metadata fields mirrored into their own nullable columns for predicate pushdown.
pub const PUSHDOWN_COLUMNS: [&str; 5] = ["title", "heading", "section", "year", "assessment_year"];

/// Record table: id, text, the pushdown columns, full metadata as JSON, vector.
pub fn build_record_schema(dim: i32) -> Arc<Schema> {
    let mut fields = vec![
        Field::new(ID_COL, DataType::Utf8, false),
        Field::new(TEXT_COL, DataType::Utf8, false),
    ];
    fields.extend(PUSHDOWN_COLUMNS.iter().map(|name| Field::new(*name, DataType::Utf8, true)));
    fields.push(Field::new(METADATA_COL, DataType::Utf8, false));
    fields.push(Field::new(
        VECTOR_COL,
        DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
        true,
    ));
    Arc::new(Schema::new(fields))
}

/// Fixed-size-list length of the vector column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<i32> {
    match schema.field_with_name(VECTOR_COL).ok()?.data_type() {
        DataType::FixedSizeList(_, n) => Some(*n),
        _ => None,
    }
}
