//! Train/test partitioning of a single collection.
//!
//! Positional splits cut one seeded permutation in two. Key-grouped splits
//! assign whole groups of rows (one grouping key each) to a side, so a key
//! never appears in both partitions.

use std::collections::BTreeSet;
use tracing::debug;

use crate::data::{FieldValue, PartitionLabel, PartitionedCollection, RecordCollection};
use crate::errors::CorpusError;
use crate::sampler::{KeySeed, sample_key_subset, shuffle, shuffle_then_slice};
use crate::types::GroupKey;

fn partition_name(base: &str, label: PartitionLabel) -> String {
    format!("{base}:{label}")
}

/// Shuffle once with `seed`; the first `eval_rows` rows become `test`, the rest `train`.
///
/// Both partitions come from one permutation, so they are disjoint and their
/// sizes add up to the input length.
pub fn positional_split(
    collection: RecordCollection,
    seed: u64,
    eval_rows: usize,
) -> Result<PartitionedCollection, CorpusError> {
    if eval_rows > collection.len() {
        return Err(CorpusError::Configuration(format!(
            "cannot take {eval_rows} test rows from '{}' ({} rows)",
            collection.name(),
            collection.len()
        )));
    }
    let (name, schema, mut shuffled) = shuffle(collection, seed)?.into_parts();
    let train_records = shuffled.split_off(eval_rows);
    debug!(
        "[corpora:splits] positional split '{}' seed={} test={} train={}",
        name,
        seed,
        shuffled.len(),
        train_records.len()
    );
    Ok(PartitionedCollection::new(
        RecordCollection::from_parts(
            partition_name(&name, PartitionLabel::Train),
            schema.clone(),
            train_records,
        ),
        RecordCollection::from_parts(partition_name(&name, PartitionLabel::Test), schema, shuffled),
    ))
}

/// Settings for [`key_grouped_split`].
#[derive(Clone, Debug)]
pub struct KeyGroupedSplit {
    /// Field whose value groups rows (e.g. `image_filename`).
    pub key_field: String,
    /// Number of distinct keys drawn into `test`.
    pub eval_keys: usize,
    /// Seed discipline for the key draw.
    pub key_seed: KeySeed,
    /// Exact number of `test` rows kept after the row shuffle.
    pub eval_rows: usize,
    /// Seed for the row shuffle applied to the drawn keys' rows.
    pub row_seed: u64,
}

/// Partition rows by membership of their grouping key in a drawn key subset.
///
/// Rows of drawn keys are shuffled with `row_seed` and cut to `eval_rows`;
/// every other row stays in `train` in input order. A key never lands on both
/// sides. Rows without a usable key stay in `train`.
pub fn key_grouped_split(
    collection: RecordCollection,
    settings: &KeyGroupedSplit,
) -> Result<PartitionedCollection, CorpusError> {
    let domain: BTreeSet<GroupKey> = collection.distinct_keys(&settings.key_field)?;
    let drawn = sample_key_subset(&domain, settings.key_seed, settings.eval_keys)?;
    debug!(
        "[corpora:splits] key-grouped split '{}' keys={} drawn={} seed={:?}",
        collection.name(),
        domain.len(),
        drawn.len(),
        settings.key_seed
    );

    let (name, schema, records) = collection.into_parts();
    let (eval_records, train_records): (Vec<_>, Vec<_>) =
        records.into_iter().partition(|record| {
            record
                .get(&settings.key_field)
                .and_then(FieldValue::as_key)
                .is_some_and(|key| drawn.contains(&key))
        });

    let eval = RecordCollection::from_parts(
        partition_name(&name, PartitionLabel::Test),
        schema.clone(),
        eval_records,
    );
    let eval = shuffle_then_slice(eval, settings.row_seed, 0, settings.eval_rows)?;
    let train = RecordCollection::from_parts(
        partition_name(&name, PartitionLabel::Train),
        schema,
        train_records,
    );
    Ok(PartitionedCollection::new(train, eval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Record;
    use std::collections::HashSet;

    fn paged_rows(pages: usize, rows_per_page: usize) -> RecordCollection {
        let mut records = Vec::new();
        for page in 0..pages {
            for row in 0..rows_per_page {
                records.push(Record::from_fields([
                    ("query", FieldValue::text(format!("q{page}-{row}"))),
                    ("image_filename", FieldValue::text(format!("page_{page:03}.png"))),
                ]));
            }
        }
        RecordCollection::from_records("pages", records).unwrap()
    }

    fn keys_of(collection: &RecordCollection) -> HashSet<String> {
        collection
            .iter()
            .filter_map(|record| record.get("image_filename").and_then(FieldValue::as_key))
            .collect()
    }

    #[test]
    fn positional_split_covers_input_without_overlap() {
        let out = positional_split(paged_rows(10, 3), 42, 12).unwrap();
        assert_eq!(out.test.len(), 12);
        assert_eq!(out.train.len(), 18);
        assert_eq!(out.test.name(), "pages:test");

        let mut queries: Vec<_> = out
            .train
            .iter()
            .chain(out.test.iter())
            .filter_map(|record| record.get("query").and_then(FieldValue::as_text))
            .collect();
        queries.sort_unstable();
        queries.dedup();
        assert_eq!(queries.len(), 30);
    }

    #[test]
    fn positional_split_rejects_oversized_test_partition() {
        let err = positional_split(paged_rows(2, 2), 42, 5).unwrap_err();
        assert!(matches!(err, CorpusError::Configuration(_)));
    }

    #[test]
    fn key_grouped_split_never_splits_a_key() {
        let settings = KeyGroupedSplit {
            key_field: "image_filename".into(),
            eval_keys: 4,
            key_seed: KeySeed::Fixed(11),
            eval_rows: 10,
            row_seed: 42,
        };
        let out = key_grouped_split(paged_rows(12, 3), &settings).unwrap();
        assert_eq!(out.test.len(), 10);
        assert_eq!(out.train.len(), 8 * 3);
        assert!(keys_of(&out.train).is_disjoint(&keys_of(&out.test)));
        assert!(keys_of(&out.test).len() <= 4);
    }

    #[test]
    fn key_grouped_split_is_reproducible_with_fixed_seeds() {
        let settings = KeyGroupedSplit {
            key_field: "image_filename".into(),
            eval_keys: 5,
            key_seed: KeySeed::Fixed(3),
            eval_rows: 12,
            row_seed: 42,
        };
        let first = key_grouped_split(paged_rows(20, 4), &settings).unwrap();
        let second = key_grouped_split(paged_rows(20, 4), &settings).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn key_grouped_split_needs_enough_rows_for_the_test_cut() {
        let settings = KeyGroupedSplit {
            key_field: "image_filename".into(),
            eval_keys: 2,
            key_seed: KeySeed::Unseeded,
            eval_rows: 7,
            row_seed: 42,
        };
        let err = key_grouped_split(paged_rows(5, 3), &settings).unwrap_err();
        assert!(matches!(err, CorpusError::Configuration(_)));
    }

    #[test]
    fn key_grouped_split_rejects_more_keys_than_exist() {
        let settings = KeyGroupedSplit {
            key_field: "image_filename".into(),
            eval_keys: 6,
            key_seed: KeySeed::Unseeded,
            eval_rows: 1,
            row_seed: 42,
        };
        assert!(matches!(
            key_grouped_split(paged_rows(5, 1), &settings),
            Err(CorpusError::Configuration(_))
        ));
    }
}
