//! Rejected-row audit file.
//!
//! The audit file is a pretty-printed JSON array with one object per rejected
//! row. Keys follow the table's column order.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use polars::prelude::{AnyValue, DataFrame};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Number, Value};

use hdq_common::is_missing;

use crate::error::{Result, ValidateError};

struct AuditRecord<'a> {
    names: &'a [String],
    values: Vec<Value>,
}

impl Serialize for AuditRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (name, value) in self.names.iter().zip(&self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn any_to_json(value: AnyValue<'_>) -> Value {
    if is_missing(&value) {
        return Value::Null;
    }
    match value {
        AnyValue::Boolean(v) => Value::Bool(v),
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number),
        AnyValue::Float64(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        other => Value::String(other.to_string()),
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ValidateError + '_ {
    move |source| ValidateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write every row of `df` to `path` as a JSON array of objects.
///
/// Missing parent directories are created first. Nulls and `NaN` become JSON
/// `null`.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_rejects_json(df: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let records: Vec<AuditRecord<'_>> = (0..df.height())
        .map(|idx| AuditRecord {
            names: &names,
            values: df
                .get_columns()
                .iter()
                .map(|column| any_to_json(column.get(idx).unwrap_or(AnyValue::Null)))
                .collect(),
        })
        .collect();

    let file = fs::File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.write_all(b"\n").map_err(io_error(path))?;
    writer.flush().map_err(io_error(path))?;
    Ok(())
}
