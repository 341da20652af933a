//! Record projection: turning a value into parallel column-name and value lists.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::errors::{Result, RowmapError};
use crate::index::{FieldInfo, FieldRead, read_path};
use crate::mapper::Mapper;
use crate::record::Record;
use crate::value::{Column, Value, ZeroCheck};

/// Controls how `omitempty` fields with empty values are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapOptions {
    /// Emit `DEFAULT` for zero-valued `omitempty` fields instead of skipping them.
    pub include_zeroed: bool,
    /// Emit `DEFAULT` for absent `omitempty` fields instead of skipping them.
    pub include_nil: bool,
}

impl MapOptions {
    pub fn include_zeroed(mut self) -> Self {
        self.include_zeroed = true;
        self
    }

    pub fn include_nil(mut self) -> Self {
        self.include_nil = true;
        self
    }
}

/// Column names and their values, index-aligned and sorted by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub names: Vec<String>,
    pub values: Vec<Value>,
}

impl Projection {
    fn push(&mut self, name: &str, value: Value) {
        self.names.push(name.to_string());
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.iter().position(|n| n == name).map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }
}

/// Anything the projector accepts.
#[derive(Clone, Copy)]
pub enum Input<'a> {
    Record(&'a dyn Record),
    /// Pre-filtered name/value pairs, copied as they are.
    Entries(&'a BTreeMap<String, Value>),
    /// A JSON object, treated like `Entries`.
    Json(&'a JsonValue),
}

impl<'a> From<&'a dyn Record> for Input<'a> {
    fn from(record: &'a dyn Record) -> Self {
        Input::Record(record)
    }
}

impl<'a> From<&'a BTreeMap<String, Value>> for Input<'a> {
    fn from(entries: &'a BTreeMap<String, Value>) -> Self {
        Input::Entries(entries)
    }
}

impl<'a> From<&'a JsonValue> for Input<'a> {
    fn from(json: &'a JsonValue) -> Self {
        Input::Json(json)
    }
}

enum Emit {
    Skip,
    Value(Value),
}

impl Mapper {
    /// Projects `record` with default options: empty `omitempty` fields are left out.
    pub fn map(&self, record: &dyn Record) -> Result<Projection> {
        self.project(record, MapOptions::default())
    }

    pub fn project(&self, record: &dyn Record, options: MapOptions) -> Result<Projection> {
        let index = self.lookup_dyn(record);
        let mut out = Projection::default();

        for field in index.fields().filter(|f| f.tagged) {
            let emit = match read_path(&index, record, &field.path) {
                Some(FieldRead::Column(column)) if column.is_absent() => absent(field, options),
                Some(FieldRead::Column(column)) => present(field, column, options),
                Some(FieldRead::Missing) if field.nullable => absent(field, options),
                // The parent record is missing, so the field holds its zero value.
                Some(FieldRead::Missing) => zeroed(field, field.zero.clone(), options),
                Some(FieldRead::Embedded(_)) | None => {
                    log::debug!("{}: `{}` is not readable as a column", index.type_name(), field.name);
                    Emit::Skip
                }
            };
            if let Emit::Value(value) = emit {
                out.push(&field.name, value);
            }
        }

        Ok(out)
    }

    pub fn project_input<'a>(&self, input: impl Into<Input<'a>>, options: MapOptions) -> Result<Projection> {
        match input.into() {
            Input::Record(record) => self.project(record, options),
            Input::Entries(entries) => Ok(project_entries(entries.iter().map(|(k, v)| (k.as_str(), v.clone())))),
            Input::Json(JsonValue::Object(object)) => {
                let mut entries: Vec<(&str, Value)> =
                    object.iter().map(|(k, v)| (k.as_str(), Value::from_json(v))).collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                Ok(project_entries(entries))
            }
            Input::Json(other) => Err(RowmapError::invalid_input(format!(
                "expected a record or an object, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn project_entries<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Projection {
    let mut out = Projection::default();
    for (name, value) in entries {
        out.push(name, value);
    }
    out
}

fn absent(field: &FieldInfo, options: MapOptions) -> Emit {
    match (field.options.omit_empty, options.include_nil) {
        (false, _) => Emit::Value(Value::Null),
        (true, false) => Emit::Skip,
        (true, true) => Emit::Value(Value::Default),
    }
}

fn present(field: &FieldInfo, column: &dyn Column, options: MapOptions) -> Emit {
    let value = column.to_value();
    let is_zero = match field.zero_check {
        ZeroCheck::Custom => column.is_zero(),
        ZeroCheck::Length => column.len() == 0,
        ZeroCheck::Equality => value == field.zero,
    };
    if is_zero {
        zeroed(field, value, options)
    } else {
        Emit::Value(value)
    }
}

fn zeroed(field: &FieldInfo, value: Value, options: MapOptions) -> Emit {
    match (field.options.omit_empty, options.include_zeroed) {
        (false, _) => Emit::Value(value),
        (true, false) => Emit::Skip,
        (true, true) => Emit::Value(Value::Default),
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
