//! Schema normalization: renames, derived fields, provenance tags, and unions.
//!
//! Every operation consumes its input collection and returns a new one with the
//! same row count and row order (concatenation appends in argument order).

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::data::{FieldValue, Record, RecordCollection};
use crate::errors::CorpusError;
use crate::types::FieldName;

/// A per-record pure function that adds (or replaces) one field.
pub struct Derivation {
    target: FieldName,
    requires: Vec<FieldName>,
    derive: Box<dyn Fn(&Record) -> FieldValue>,
}

impl Derivation {
    /// Derive `target` from fields listed in `requires`.
    pub fn new<F>(target: impl Into<FieldName>, requires: &[&str], derive: F) -> Self
    where
        F: Fn(&Record) -> FieldValue + 'static,
    {
        Self {
            target: target.into(),
            requires: requires.iter().map(|name| name.to_string()).collect(),
            derive: Box::new(derive),
        }
    }

    /// `target` = `primary` when present and non-null, otherwise `fallback`.
    pub fn coalesce(target: &str, primary: &str, fallback: &str) -> Self {
        let (primary_name, fallback_name) = (primary.to_string(), fallback.to_string());
        Self::new(target, &[primary, fallback], move |record| {
            record
                .get(&primary_name)
                .filter(|value| !value.is_null())
                .or_else(|| record.get(&fallback_name))
                .cloned()
                .unwrap_or(FieldValue::Null)
        })
    }

    /// Name of the produced field.
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Rename fields, then optionally derive one new field.
///
/// Fails with a schema error when a rename source is absent, since downstream
/// code reads the renamed fields unconditionally.
pub fn normalize(
    collection: RecordCollection,
    renames: &[(&str, &str)],
    derive: Option<&Derivation>,
) -> Result<RecordCollection, CorpusError> {
    let renamed = rename_fields(collection, renames)?;
    match derive {
        Some(derivation) => derive_field(renamed, derivation),
        None => Ok(renamed),
    }
}

/// Rename `old → new` fields, keeping field positions.
pub fn rename_fields(
    collection: RecordCollection,
    renames: &[(&str, &str)],
) -> Result<RecordCollection, CorpusError> {
    if renames.is_empty() {
        return Ok(collection);
    }
    let mut mapping: IndexMap<FieldName, FieldName> = IndexMap::new();
    for (old, new) in renames {
        collection.require_field(old)?;
        if mapping.insert(old.to_string(), new.to_string()).is_some() {
            return Err(CorpusError::schema(
                collection.name(),
                format!("field '{old}' renamed more than once"),
            ));
        }
    }

    let schema: Vec<FieldName> = collection
        .schema()
        .iter()
        .map(|name| mapping.get(name).cloned().unwrap_or_else(|| name.clone()))
        .collect();
    let mut seen = HashSet::new();
    if let Some(dup) = schema.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(CorpusError::schema(
            collection.name(),
            format!("rename would produce duplicate field '{dup}'"),
        ));
    }

    let (name, _, records) = collection.into_parts();
    let records = records
        .into_iter()
        .map(|record| record.with_renamed(&mapping))
        .collect();
    Ok(RecordCollection::from_parts(name, schema, records))
}

/// Apply `derivation` to every record, returning a new collection.
pub fn derive_field(
    collection: RecordCollection,
    derivation: &Derivation,
) -> Result<RecordCollection, CorpusError> {
    for field in &derivation.requires {
        collection.require_field(field)?;
    }
    let (name, mut schema, records) = collection.into_parts();
    if !schema.iter().any(|field| *field == derivation.target) {
        schema.push(derivation.target.clone());
    }
    let records = records
        .into_iter()
        .map(|record| {
            let value = (derivation.derive)(&record);
            record.with_field(derivation.target.clone(), value)
        })
        .collect();
    Ok(RecordCollection::from_parts(name, schema, records))
}

/// Add a field holding the same value on every row (e.g. a provenance tag).
pub fn with_constant_field(
    collection: RecordCollection,
    field: &str,
    value: FieldValue,
) -> Result<RecordCollection, CorpusError> {
    let derivation = Derivation::new(field, &[], move |_| value.clone());
    derive_field(collection, &derivation)
}

/// Append collections in order; every input must share the same field set.
pub fn concatenate(
    name: impl Into<String>,
    collections: Vec<RecordCollection>,
) -> Result<RecordCollection, CorpusError> {
    let name = name.into();
    let mut parts = collections.into_iter();
    let Some(first) = parts.next() else {
        return Err(CorpusError::Configuration(format!(
            "nothing to concatenate for '{name}'"
        )));
    };
    let (_, schema, mut records) = first.into_parts();
    let expected: HashSet<&str> = schema.iter().map(String::as_str).collect();
    for part in parts {
        let actual: HashSet<&str> = part.schema().iter().map(String::as_str).collect();
        if actual != expected {
            return Err(CorpusError::schema(
                name,
                format!(
                    "cannot concatenate '{}' with fields [{}] onto fields [{}]",
                    part.name(),
                    part.schema().join(", "),
                    schema.join(", ")
                ),
            ));
        }
        records.extend(part.into_records());
    }
    Ok(RecordCollection::from_parts(name, schema, records))
}

/// Require `field` to be present and non-empty on every row.
pub fn ensure_non_empty_field(collection: &RecordCollection, field: &str) -> Result<(), CorpusError> {
    collection.require_field(field)?;
    match collection
        .iter()
        .position(|record| record.get(field).is_none_or(FieldValue::is_empty))
    {
        Some(idx) => Err(CorpusError::schema(
            collection.name(),
            format!("row {idx} has an empty '{field}'"),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vqa_rows() -> RecordCollection {
        let records = vec![
            Record::from_fields([
                ("question", FieldValue::text("what is the total?")),
                ("ucsf_document_id", FieldValue::text("doc-1")),
                ("image_url", FieldValue::text("https://img/1.png")),
            ]),
            Record::from_fields([
                ("question", FieldValue::text("who signed?")),
                ("ucsf_document_id", FieldValue::Null),
                ("image_url", FieldValue::text("https://img/2.png")),
            ]),
        ];
        RecordCollection::from_records("vqa", records).unwrap()
    }

    #[test]
    fn normalize_renames_and_derives_without_reordering() {
        let derivation = Derivation::coalesce("image_filename", "ucsf_document_id", "image_url");
        let out = normalize(vqa_rows(), &[("question", "query")], Some(&derivation)).unwrap();

        assert_eq!(
            out.schema(),
            ["query", "ucsf_document_id", "image_url", "image_filename"]
        );
        let filenames: Vec<_> = out
            .iter()
            .map(|record| record.get("image_filename").and_then(FieldValue::as_text))
            .collect();
        assert_eq!(filenames, vec![Some("doc-1"), Some("https://img/2.png")]);
        assert_eq!(
            out.records()[0].get("query").and_then(FieldValue::as_text),
            Some("what is the total?")
        );
    }

    #[test]
    fn renaming_a_missing_field_is_a_schema_error() {
        let err = rename_fields(vqa_rows(), &[("texts", "query")]).unwrap_err();
        assert!(matches!(err, CorpusError::Schema { ref details, .. } if details.contains("texts")));
    }

    #[test]
    fn renaming_onto_an_existing_field_is_rejected() {
        let err = rename_fields(vqa_rows(), &[("question", "image_url")]).unwrap_err();
        assert!(matches!(err, CorpusError::Schema { ref details, .. } if details.contains("duplicate")));
    }

    #[test]
    fn derivation_requires_its_inputs() {
        let derivation = Derivation::coalesce("image_filename", "doc_id", "image_url");
        assert!(matches!(
            derive_field(vqa_rows(), &derivation),
            Err(CorpusError::Schema { .. })
        ));
    }

    #[test]
    fn constant_field_tags_every_row() {
        let tagged = with_constant_field(vqa_rows(), "source", FieldValue::text("docvqa")).unwrap();
        assert!(tagged.has_field("source"));
        assert!(
            tagged
                .iter()
                .all(|record| record.get("source") == Some(&FieldValue::text("docvqa")))
        );
    }

    #[test]
    fn concatenate_appends_in_order_and_checks_schemas() {
        let left = vqa_rows();
        let right = vqa_rows().renamed("vqa_2");
        let merged = concatenate("union", vec![left, right]).unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.name(), "union");

        let tagged = with_constant_field(vqa_rows(), "source", FieldValue::text("x")).unwrap();
        let err = concatenate("union", vec![vqa_rows(), tagged]).unwrap_err();
        assert!(matches!(err, CorpusError::Schema { .. }));
        assert!(matches!(
            concatenate("union", Vec::new()),
            Err(CorpusError::Configuration(_))
        ));
    }

    #[test]
    fn non_empty_check_reports_the_first_offending_row() {
        let records = vec![
            Record::from_fields([("query", FieldValue::text("ok"))]),
            Record::from_fields([("query", FieldValue::text(""))]),
        ];
        let collection = RecordCollection::from_records("q", records).unwrap();
        let err = ensure_non_empty_field(&collection, "query").unwrap_err();
        assert!(matches!(err, CorpusError::Schema { ref details, .. } if details.contains("row 1")));
    }
}
