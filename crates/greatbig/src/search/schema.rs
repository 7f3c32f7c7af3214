use super::{document_text, SEARCH_TEXT_COLUMN};
use crate::model::{Entity, FieldKind, FieldReader, FieldValue};
use anyhow::{Context, Result};
use arrow_array::{
    cast::AsArray,
    types::{Int32Type, Int64Type},
    Array, ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Create the Arrow schema for an entity's search documents
pub fn create_schema<E: Entity>() -> Arc<Schema> {
    let mut fields = vec![Field::new("id", DataType::Int64, false)];
    fields.extend(E::FIELDS.iter().map(|f| {
        let data_type = match f.kind {
            FieldKind::Text => DataType::Utf8,
            FieldKind::Integer => DataType::Int32,
        };
        Field::new(f.name, data_type, true)
    }));
    fields.push(Field::new(SEARCH_TEXT_COLUMN, DataType::Utf8, false));
    Arc::new(Schema::new(fields))
}

/// Convert persisted entities to an Arrow RecordBatch
pub fn entities_to_batch<E: Entity>(entities: &[E]) -> Result<RecordBatch> {
    let schema = create_schema::<E>();

    let ids = entities
        .iter()
        .map(|e| {
            e.id()
                .with_context(|| format!("Cannot index a {} without an id", E::NAME))
        })
        .collect::<Result<Vec<_>>>()?;

    let rows: Vec<Vec<FieldValue>> = entities.iter().map(|e| e.values()).collect();

    let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from(ids))];

    for (index, field) in E::FIELDS.iter().enumerate() {
        let column: ArrayRef = match field.kind {
            FieldKind::Text => Arc::new(StringArray::from(
                rows.iter()
                    .map(|row| match row.get(index) {
                        Some(FieldValue::Text(value)) => value.clone(),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
            FieldKind::Integer => Arc::new(Int32Array::from(
                rows.iter()
                    .map(|row| match row.get(index) {
                        Some(FieldValue::Integer(value)) => *value,
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
        };
        columns.push(column);
    }

    columns.push(Arc::new(StringArray::from(
        entities.iter().map(document_text).collect::<Vec<_>>(),
    )));

    RecordBatch::try_new(schema, columns)
        .map_err(|e| anyhow::anyhow!("Failed to create record batch: {}", e))
}

/// Convert a RecordBatch of search documents back into entities
pub fn batch_to_entities<E: Entity>(batch: &RecordBatch) -> Result<Vec<E>> {
    let ids = batch
        .column_by_name("id")
        .context("Missing id column")?
        .as_primitive::<Int64Type>();

    let columns = E::FIELDS
        .iter()
        .map(|f| {
            batch
                .column_by_name(f.name)
                .with_context(|| format!("Missing {} column", f.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut entities = Vec::with_capacity(batch.num_rows());

    for i in 0..batch.num_rows() {
        let values = E::FIELDS
            .iter()
            .zip(&columns)
            .map(|(field, column)| match field.kind {
                FieldKind::Text => {
                    let array = column.as_string::<i32>();
                    FieldValue::Text((!array.is_null(i)).then(|| array.value(i).to_string()))
                },
                FieldKind::Integer => {
                    let array = column.as_primitive::<Int32Type>();
                    FieldValue::Integer((!array.is_null(i)).then(|| array.value(i)))
                },
            })
            .collect();

        entities.push(E::from_values(ids.value(i), &mut FieldReader::new(values))?);
    }

    Ok(entities)
}
