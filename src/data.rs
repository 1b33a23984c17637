use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::errors::CorpusError;
use crate::hash::membership_fingerprint;

pub use crate::types::{FieldName, GroupKey};

/// Reference to an image payload as delivered by a provider.
///
/// Columnar backends encode images as `{bytes, path}` structs; `bytes` keeps the
/// base64 text the row decoder produced so values round-trip unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Original image path or filename, when known.
    pub path: Option<String>,
    /// Base64-encoded image bytes, when embedded.
    pub bytes: Option<String>,
}

/// A single field value inside a [`Record`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value", from = "Value")]
pub enum FieldValue {
    /// Missing value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer number.
    Integer(i64),
    /// Non-integer number.
    Float(f64),
    /// Free text, identifiers, and category labels.
    Text(String),
    /// Embedded or referenced image.
    Image(ImageRef),
    /// Ordered values (answers, conversation turns, image lists).
    List(Vec<FieldValue>),
    /// Nested record.
    Struct(IndexMap<FieldName, FieldValue>),
}

impl FieldValue {
    /// Build a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True when the value carries no content (null, blank text, empty list/struct).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Struct(fields) => fields.is_empty(),
            Self::Image(image) => image.path.is_none() && image.bytes.is_none(),
            Self::Bool(_) | Self::Integer(_) | Self::Float(_) => false,
        }
    }

    /// Borrow the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Render the value as a natural/grouping key.
    ///
    /// Text and integers map to themselves; images map to their path.
    pub fn as_key(&self) -> Option<GroupKey> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Image(image) => image.path.clone(),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => match number.as_i64() {
                Some(int) => Self::Integer(int),
                None => Self::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                if looks_like_image(&map) {
                    return Self::Image(ImageRef {
                        path: map.get("path").and_then(Value::as_str).map(str::to_string),
                        bytes: map.get("bytes").and_then(Value::as_str).map(str::to_string),
                    });
                }
                Self::Struct(
                    map.into_iter()
                        .map(|(key, value)| (key, Self::from(value)))
                        .collect(),
                )
            }
        }
    }
}

fn looks_like_image(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.contains_key("bytes")
        && map.keys().all(|key| key == "bytes" || key == "path")
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(flag) => Value::Bool(flag),
            FieldValue::Integer(int) => Value::Number(int.into()),
            FieldValue::Float(float) => Number::from_f64(float)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(text) => Value::String(text),
            FieldValue::Image(image) => {
                let mut map = Map::new();
                map.insert(
                    "bytes".to_string(),
                    image.bytes.map(Value::String).unwrap_or(Value::Null),
                );
                map.insert(
                    "path".to_string(),
                    image.path.map(Value::String).unwrap_or(Value::Null),
                );
                Value::Object(map)
            }
            FieldValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            FieldValue::Struct(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// One row: an ordered mapping from field name to value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<FieldName, FieldValue>,
}

impl Record {
    /// Build a record from `(name, value)` pairs, keeping their order.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<FieldName>,
        V: Into<FieldValue>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Field names in record order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Return a copy with `name` set to `value` (appended when new).
    pub fn with_field(mut self, name: impl Into<FieldName>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Rename fields in place of their old position.
    pub(crate) fn with_renamed(self, renames: &IndexMap<FieldName, FieldName>) -> Self {
        Self {
            fields: self
                .fields
                .into_iter()
                .map(|(name, value)| match renames.get(&name) {
                    Some(target) => (target.clone(), value),
                    None => (name, value),
                })
                .collect(),
        }
    }

    /// Render the record as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), Value::from(value.clone())))
                .collect(),
        )
    }

    fn same_fields(&self, schema: &[FieldName]) -> bool {
        self.fields.len() == schema.len() && schema.iter().all(|name| self.fields.contains_key(name))
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(name, value)| (name, FieldValue::from(value)))
                .collect(),
        }
    }
}

/// Ordered, schema-uniform sequence of records.
///
/// Transformations consume the collection and return a new one; nothing hands
/// out mutable access to records another holder can observe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCollection")]
pub struct RecordCollection {
    name: String,
    schema: Vec<FieldName>,
    records: Vec<Record>,
}

// Deserialized form, validated through `RecordCollection::new`.
#[derive(Deserialize)]
struct RawCollection {
    name: String,
    schema: Vec<FieldName>,
    records: Vec<Record>,
}

impl TryFrom<RawCollection> for RecordCollection {
    type Error = CorpusError;

    fn try_from(raw: RawCollection) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.schema, raw.records)
    }
}

impl RecordCollection {
    /// Build a collection, checking every record carries exactly `schema`.
    pub fn new(
        name: impl Into<String>,
        schema: Vec<FieldName>,
        records: Vec<Record>,
    ) -> Result<Self, CorpusError> {
        let name = name.into();
        if let Some((idx, record)) = records
            .iter()
            .enumerate()
            .find(|(_, record)| !record.same_fields(&schema))
        {
            return Err(CorpusError::schema(
                name,
                format!(
                    "row {idx} has fields [{}], expected [{}]",
                    record.field_names().collect::<Vec<_>>().join(", "),
                    schema.join(", ")
                ),
            ));
        }
        Ok(Self {
            name,
            schema,
            records,
        })
    }

    /// Build a collection whose schema is taken from the first record.
    pub fn from_records(name: impl Into<String>, records: Vec<Record>) -> Result<Self, CorpusError> {
        let schema = records
            .first()
            .map(|record| record.field_names().map(str::to_string).collect())
            .unwrap_or_default();
        Self::new(name, schema, records)
    }

    /// Empty collection with a fixed schema.
    pub fn empty(name: impl Into<String>, schema: Vec<FieldName>) -> Self {
        Self {
            name: name.into(),
            schema,
            records: Vec::new(),
        }
    }

    // Callers guarantee `records` match `schema`.
    pub(crate) fn from_parts(name: String, schema: Vec<FieldName>, records: Vec<Record>) -> Self {
        Self {
            name,
            schema,
            records,
        }
    }

    /// Diagnostic name (source, variant, split, or a derived label).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the same rows under a new diagnostic name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Field names shared by every record.
    pub fn schema(&self) -> &[FieldName] {
        &self.schema
    }

    /// True when `field` is part of the schema.
    pub fn has_field(&self, field: &str) -> bool {
        self.schema.iter().any(|name| name == field)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrow the records in order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Iterate records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Take ownership of the records.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub(crate) fn into_parts(self) -> (String, Vec<FieldName>, Vec<Record>) {
        (self.name, self.schema, self.records)
    }

    /// Iterate the values of one field, failing if the field is not in the schema.
    pub fn column<'a>(
        &'a self,
        field: &'a str,
    ) -> Result<impl Iterator<Item = &'a FieldValue> + 'a, CorpusError> {
        self.require_field(field)?;
        Ok(self.records.iter().filter_map(move |record| record.get(field)))
    }

    /// Distinct key renderings of `field`, in sorted order.
    pub fn distinct_keys(&self, field: &str) -> Result<BTreeSet<GroupKey>, CorpusError> {
        Ok(self.column(field)?.filter_map(FieldValue::as_key).collect())
    }

    /// Keep the records at `indices`, in the given order.
    ///
    /// Indices must be distinct and in range.
    pub fn select(self, indices: &[usize]) -> Result<Self, CorpusError> {
        let (name, schema, records) = self.into_parts();
        let total = records.len();
        let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();
        let mut picked = Vec::with_capacity(indices.len());
        for &idx in indices {
            let Some(record) = slots.get_mut(idx).and_then(Option::take) else {
                return Err(CorpusError::Configuration(format!(
                    "index {idx} is out of range or repeated for '{name}' ({total} rows)"
                )));
            };
            picked.push(record);
        }
        Ok(Self::from_parts(name, schema, picked))
    }

    /// Keep the contiguous range `[start, end)`.
    pub fn select_range(self, start: usize, end: usize) -> Result<Self, CorpusError> {
        if start > end || end > self.records.len() {
            return Err(CorpusError::Configuration(format!(
                "range {start}..{end} does not fit '{}' ({} rows)",
                self.name,
                self.records.len()
            )));
        }
        let (name, schema, records) = self.into_parts();
        let records = records.into_iter().skip(start).take(end - start).collect();
        Ok(Self::from_parts(name, schema, records))
    }

    /// Keep the first `count` records, failing when fewer exist.
    pub fn head(self, count: usize) -> Result<Self, CorpusError> {
        self.select_range(0, count)
    }

    pub(crate) fn require_field(&self, field: &str) -> Result<(), CorpusError> {
        if self.has_field(field) {
            Ok(())
        } else {
            Err(CorpusError::schema(
                self.name.clone(),
                format!(
                    "missing field '{field}' (schema: [{}])",
                    self.schema.join(", ")
                ),
            ))
        }
    }
}

impl<'a> IntoIterator for &'a RecordCollection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// The two output partitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionLabel {
    /// Training partition.
    Train,
    /// Evaluation partition.
    Test,
}

impl PartitionLabel {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for PartitionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `{train, test}` pair of collections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartitionedCollection {
    /// Training rows.
    pub train: RecordCollection,
    /// Evaluation rows.
    pub test: RecordCollection,
}

impl PartitionedCollection {
    /// Pair two collections.
    pub fn new(train: RecordCollection, test: RecordCollection) -> Self {
        Self { train, test }
    }

    /// Borrow one partition.
    pub fn get(&self, label: PartitionLabel) -> &RecordCollection {
        match label {
            PartitionLabel::Train => &self.train,
            PartitionLabel::Test => &self.test,
        }
    }

    /// Split into `(train, test)`.
    pub fn into_parts(self) -> (RecordCollection, RecordCollection) {
        (self.train, self.test)
    }

    /// Stable hash over partition sizes and natural keys in order.
    ///
    /// Rows are identified by `key_field` when given, otherwise by their full
    /// JSON rendering. Two runs with identical membership produce the same value.
    pub fn fingerprint(&self, key_field: Option<&str>) -> u64 {
        membership_fingerprint(
            [PartitionLabel::Train, PartitionLabel::Test]
                .into_iter()
                .map(|label| {
                    let keys = self
                        .get(label)
                        .iter()
                        .map(|record| record_key(record, key_field))
                        .collect::<Vec<_>>();
                    (label.as_str(), keys)
                }),
        )
    }
}

// Rows without a usable key fall back to their JSON rendering.
fn record_key(record: &Record, key_field: Option<&str>) -> String {
    key_field
        .and_then(|field| record.get(field))
        .and_then(FieldValue::as_key)
        .unwrap_or_else(|| record.to_json().to_string())
}
