//! Source record → output record projection.

use crate::models::{CellValue, ColumnRule, OutputRecord, OutputSchema, SourceRecord, DEFAULT_PHYSICIAN};

/// The physician written in every row: the argument unless it is absent or empty.
pub fn resolve_physician(physician: Option<&str>) -> String {
    match physician {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_PHYSICIAN.to_string(),
    }
}

/// Build one output record, iterating the schema in order.
///
/// `source` columns copy the source value only when it is truthy, so a
/// numeric `0` becomes empty just like a missing column.
pub fn project(record: &SourceRecord, schema: &OutputSchema, physician: &str) -> OutputRecord {
    let fields = schema
        .columns
        .iter()
        .map(|column| {
            let value = match &column.rule {
                ColumnRule::Physician => CellValue::Text(physician.to_string()),
                ColumnRule::Constant { value } => value.clone(),
                ColumnRule::Source => match record.get(&column.name) {
                    Some(v) if v.is_truthy() => v.clone(),
                    _ => CellValue::Text(String::new()),
                },
            };
            (column.name.clone(), value)
        })
        .collect();

    OutputRecord::new(fields)
}

pub fn project_all(
    records: &[SourceRecord],
    schema: &OutputSchema,
    physician: &str,
) -> Vec<OutputRecord> {
    records
        .iter()
        .map(|r| project(r, schema, physician))
        .collect()
}
