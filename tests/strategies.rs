use std::collections::{BTreeSet, HashSet};

use vidore_corpora::config::{
    CauldronOptions, DocVqaOptions, EmbeddingsOptions, Locality, ProviderConfig, TabfquadOptions,
    TrainSetOptions,
};
use vidore_corpora::constants::{cauldron, docvqa, embeddings, tabfquad, train_set};
use vidore_corpora::data::{FieldValue, ImageRef, Record, RecordCollection};
use vidore_corpora::source::{InMemoryProvider, LogicalSource};
use vidore_corpora::strategies::{
    cauldron_tagged_union, docvqa_union, embeddings_positional, tabfquad_key_grouped,
    train_set_union,
};
use vidore_corpora::{CorpusError, KeySeed, PartitionedCollection, StrategyName, run_strategy};

fn remote() -> ProviderConfig {
    ProviderConfig {
        locality: Locality::Remote,
        ..ProviderConfig::default()
    }
}

fn text(collection: &RecordCollection, field: &str) -> Vec<String> {
    collection
        .iter()
        .map(|record| {
            record
                .get(field)
                .and_then(FieldValue::as_text)
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

fn vqa_rows(tag: &str, split: &str, count: usize) -> RecordCollection {
    let records = (0..count)
        .map(|idx| {
            // Every third row lacks a UCSF id and must fall back to the URL.
            let ucsf = if idx % 3 == 0 {
                FieldValue::Null
            } else {
                FieldValue::text(format!("{tag}-doc-{idx}"))
            };
            Record::from_fields([
                ("questionId", FieldValue::text(format!("{tag}-{split}-{idx}"))),
                ("question", FieldValue::text(format!("{tag} {split} question {idx}"))),
                ("ucsf_document_id", ucsf),
                ("image_url", FieldValue::text(format!("https://img/{tag}/{idx}.png"))),
            ])
        })
        .collect();
    RecordCollection::from_records(format!("{tag}:{split}"), records).unwrap()
}

fn docvqa_provider(config: ProviderConfig) -> InMemoryProvider {
    let options = DocVqaOptions::default();
    let mut provider = InMemoryProvider::new(config);
    for (variant, tag) in [
        (docvqa::VARIANT_DOC, "doc"),
        (docvqa::VARIANT_INFO, "info"),
    ] {
        provider.insert(
            &options.family,
            Some(variant),
            docvqa::TRAIN_SPLIT,
            vqa_rows(tag, "validation", 40),
        );
        provider.insert(
            &options.family,
            Some(variant),
            docvqa::EVAL_SPLIT,
            vqa_rows(tag, "test", 150),
        );
    }
    provider
}

fn paired_rows(count: usize) -> RecordCollection {
    let records = (0..count)
        .map(|idx| {
            Record::from_fields([
                (embeddings::QUERY_FIELD, FieldValue::text(format!("query {idx}"))),
                (embeddings::DOC_FIELD, FieldValue::text(format!("document {idx}"))),
            ])
        })
        .collect();
    RecordCollection::from_records("pairs", records).unwrap()
}

fn embeddings_provider(count: usize) -> InMemoryProvider {
    let options = EmbeddingsOptions::default();
    InMemoryProvider::new(ProviderConfig::default()).with(
        &options.source,
        None,
        &options.split,
        paired_rows(count),
    )
}

/// `pages` distinct image filenames with `rows_per_page` questions each.
fn table_rows(pages: usize, rows_per_page: usize) -> RecordCollection {
    let mut records = Vec::with_capacity(pages * rows_per_page);
    for page in 0..pages {
        for row in 0..rows_per_page {
            records.push(Record::from_fields([
                ("query", FieldValue::text(format!("table {page} question {row}"))),
                ("image_filename", FieldValue::text(format!("table_{page:03}.png"))),
            ]));
        }
    }
    RecordCollection::from_records("tables", records).unwrap()
}

fn tabfquad_provider(config: ProviderConfig, pages: usize, rows_per_page: usize) -> InMemoryProvider {
    let options = TabfquadOptions::default();
    InMemoryProvider::new(config).with(
        &options.source,
        None,
        tabfquad::SPLIT,
        table_rows(pages, rows_per_page),
    )
}

fn cauldron_provider(rows_per_variant: usize) -> InMemoryProvider {
    let options = CauldronOptions::default();
    let mut provider = InMemoryProvider::new(ProviderConfig::default());
    for variant in cauldron::VARIANTS {
        let records = (0..rows_per_variant)
            .map(|idx| {
                Record::from_fields([
                    (
                        cauldron::QUERY_FIELD,
                        FieldValue::List(vec![FieldValue::text(format!("{variant} turn {idx}"))]),
                    ),
                    (
                        cauldron::IMAGE_FIELD,
                        FieldValue::List(vec![FieldValue::Image(ImageRef {
                            path: Some(format!("{variant}_{idx}.png")),
                            bytes: None,
                        })]),
                    ),
                ])
            })
            .collect();
        provider.insert(
            &options.family,
            Some(variant),
            cauldron::SPLIT,
            RecordCollection::from_records(variant, records).unwrap(),
        );
    }
    provider
}

fn train_set_provider(config: ProviderConfig, rows_per_source: usize, arxivqa_rows: usize) -> InMemoryProvider {
    let mut provider = InMemoryProvider::new(config);
    for name in train_set::SOURCES {
        let count = if name == train_set::ARXIVQA_SOURCE {
            arxivqa_rows
        } else {
            rows_per_source
        };
        let records = (0..count)
            .map(|idx| {
                Record::from_fields([
                    ("query", FieldValue::text(format!("{name} query {idx}"))),
                    ("image_filename", FieldValue::text(format!("{name}/{idx}.png"))),
                ])
            })
            .collect();
        provider.insert(
            &LogicalSource::prefixed(name, train_set::REMOTE_PREFIX),
            None,
            train_set::SPLIT,
            RecordCollection::from_records(name, records).unwrap(),
        );
    }
    provider
}

fn assert_disjoint_cover(partitioned: &PartitionedCollection, field: &str, input_rows: usize) {
    let train: HashSet<String> = text(&partitioned.train, field).into_iter().collect();
    let test: HashSet<String> = text(&partitioned.test, field).into_iter().collect();
    assert_eq!(train.len(), partitioned.train.len(), "train rows must be unique");
    assert_eq!(test.len(), partitioned.test.len(), "test rows must be unique");
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), input_rows);
}

#[test]
fn docvqa_union_keeps_validation_in_train_and_cuts_test_to_200() {
    let provider = docvqa_provider(ProviderConfig::default());
    let partitioned = docvqa_union(&provider, &DocVqaOptions::default()).unwrap();

    assert_eq!(partitioned.train.len(), 80);
    assert_eq!(partitioned.test.len(), docvqa::EVAL_ROWS);
    assert!(text(&partitioned.train, "questionId").iter().all(|id| id.contains("-validation-")));
    assert!(text(&partitioned.test, "questionId").iter().all(|id| id.contains("-test-")));

    // Validation rows keep their concatenation order.
    let train_ids = text(&partitioned.train, "questionId");
    assert_eq!(train_ids.first().map(String::as_str), Some("doc-validation-0"));
    assert_eq!(train_ids.get(40).map(String::as_str), Some("info-validation-0"));

    for collection in [&partitioned.train, &partitioned.test] {
        assert!(collection.has_field("query"));
        assert!(!collection.has_field("question"));
        assert!(collection.has_field("image_filename"));
    }
}

#[test]
fn docvqa_image_filename_falls_back_to_the_url() {
    let provider = docvqa_provider(ProviderConfig::default());
    let partitioned = docvqa_union(&provider, &DocVqaOptions::default()).unwrap();
    let filenames = text(&partitioned.train, "image_filename");
    assert_eq!(filenames[0], "https://img/doc/0.png");
    assert_eq!(filenames[1], "doc-doc-1");
    assert_eq!(filenames[43], "https://img/info/3.png");
}

#[test]
fn docvqa_union_is_deterministic() {
    let first = docvqa_union(&docvqa_provider(ProviderConfig::default()), &DocVqaOptions::default()).unwrap();
    let second = docvqa_union(&docvqa_provider(ProviderConfig::default()), &DocVqaOptions::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.fingerprint(None), second.fingerprint(None));
}

#[test]
fn docvqa_union_with_a_missing_variant_aborts() {
    let options = DocVqaOptions::default();
    let provider = InMemoryProvider::new(ProviderConfig::default())
        .with(&options.family, Some(docvqa::VARIANT_DOC), docvqa::TRAIN_SPLIT, vqa_rows("doc", "validation", 5))
        .with(&options.family, Some(docvqa::VARIANT_DOC), docvqa::EVAL_SPLIT, vqa_rows("doc", "test", 300));
    let err = docvqa_union(&provider, &options).unwrap_err();
    assert!(matches!(
        err,
        CorpusError::SourceUnavailable { ref source_id, .. } if source_id.contains("InfographicVQA")
    ));
}

#[test]
fn embeddings_split_renames_and_cuts_200_test_rows() {
    let partitioned = embeddings_positional(&embeddings_provider(450), &EmbeddingsOptions::default()).unwrap();
    assert_eq!(partitioned.test.len(), 200);
    assert_eq!(partitioned.train.len(), 250);
    assert_eq!(partitioned.train.schema(), ["query", "doc"]);
    assert_eq!(partitioned.test.name(), "manu_embeddings:test");
    assert_disjoint_cover(&partitioned, "query", 450);
}

#[test]
fn embeddings_split_with_too_few_rows_is_a_configuration_error() {
    let err = embeddings_positional(&embeddings_provider(150), &EmbeddingsOptions::default()).unwrap_err();
    assert!(matches!(err, CorpusError::Configuration(_)));
}

#[test]
fn embeddings_split_without_the_expected_columns_is_a_schema_error() {
    let options = EmbeddingsOptions::default();
    let records = (0..250)
        .map(|idx| Record::from_fields([("sentence", FieldValue::text(format!("s{idx}")))]))
        .collect();
    let provider = InMemoryProvider::new(ProviderConfig::default()).with(
        &options.source,
        None,
        &options.split,
        RecordCollection::from_records("sentences", records).unwrap(),
    );
    let err = embeddings_positional(&provider, &options).unwrap_err();
    assert!(matches!(err, CorpusError::Schema { .. }));
}

#[test]
fn empty_queries_are_rejected() {
    let options = EmbeddingsOptions::default();
    let mut records: Vec<Record> = paired_rows(300).into_records();
    records[17] = Record::from_fields([
        (embeddings::QUERY_FIELD, FieldValue::text("")),
        (embeddings::DOC_FIELD, FieldValue::text("orphan document")),
    ]);
    let provider = InMemoryProvider::new(ProviderConfig::default()).with(
        &options.source,
        None,
        &options.split,
        RecordCollection::from_records("pairs", records).unwrap(),
    );
    let err = embeddings_positional(&provider, &options).unwrap_err();
    assert!(matches!(err, CorpusError::Schema { ref details, .. } if details.contains("empty 'query'")));
}

#[test]
fn tabfquad_split_never_shares_an_image_between_partitions() {
    let options = TabfquadOptions {
        key_seed: KeySeed::Fixed(7),
        ..TabfquadOptions::default()
    };
    let provider = tabfquad_provider(ProviderConfig::default(), 100, 4);
    let partitioned = tabfquad_key_grouped(&provider, &options).unwrap();

    assert_eq!(partitioned.test.len(), 200);
    // 70 drawn pages hold 280 rows; the 30 undrawn pages stay whole in train.
    assert_eq!(partitioned.train.len(), 120);

    let train_keys: BTreeSet<String> = text(&partitioned.train, "image_filename").into_iter().collect();
    let test_keys: BTreeSet<String> = text(&partitioned.test, "image_filename").into_iter().collect();
    assert!(train_keys.is_disjoint(&test_keys));
    assert_eq!(train_keys.len(), 30);
    assert!(test_keys.len() <= 70);
}

#[test]
fn tabfquad_split_is_reproducible_with_a_fixed_key_seed() {
    let options = TabfquadOptions {
        key_seed: KeySeed::Fixed(11),
        ..TabfquadOptions::default()
    };
    let first = tabfquad_key_grouped(&tabfquad_provider(ProviderConfig::default(), 90, 3), &options).unwrap();
    let second = tabfquad_key_grouped(&tabfquad_provider(ProviderConfig::default(), 90, 3), &options).unwrap();
    assert_eq!(
        first.fingerprint(Some("image_filename")),
        second.fingerprint(Some("image_filename"))
    );
    assert_eq!(text(&first.test, "query"), text(&second.test, "query"));
}

#[test]
fn tabfquad_default_key_draw_still_honours_the_contract() {
    let provider = tabfquad_provider(ProviderConfig::default(), 80, 3);
    let partitioned = run_strategy(&provider, StrategyName::Tabfquad).unwrap();
    assert_eq!(partitioned.test.len(), 200);
    assert_eq!(partitioned.train.len(), 30);
    let train_keys: HashSet<String> = text(&partitioned.train, "image_filename").into_iter().collect();
    let test_keys: HashSet<String> = text(&partitioned.test, "image_filename").into_iter().collect();
    assert!(train_keys.is_disjoint(&test_keys));
}

#[test]
fn tabfquad_with_too_few_images_is_a_configuration_error() {
    let provider = tabfquad_provider(ProviderConfig::default(), 60, 5);
    let err = run_strategy(&provider, StrategyName::Tabfquad).unwrap_err();
    assert!(matches!(err, CorpusError::Configuration(ref msg) if msg.contains("70")));
}

#[test]
fn tabfquad_drawn_rows_below_the_eval_size_is_a_configuration_error() {
    // 70 drawn pages with 2 rows each give 140 rows, short of 200.
    let provider = tabfquad_provider(ProviderConfig::default(), 100, 2);
    let options = TabfquadOptions {
        key_seed: KeySeed::Fixed(3),
        ..TabfquadOptions::default()
    };
    let err = tabfquad_key_grouped(&provider, &options).unwrap_err();
    assert!(matches!(err, CorpusError::Configuration(_)));
}

#[test]
fn tabfquad_remote_and_local_read_different_splits() {
    let options = TabfquadOptions::default();
    let local = options
        .source
        .resolve(&ProviderConfig::default(), None, tabfquad::SPLIT);
    let remote_resolved = options.source.resolve(&remote(), None, tabfquad::SPLIT);
    assert_eq!(local.split, tabfquad::LOCAL_SPLIT);
    assert_eq!(remote_resolved.split, tabfquad::SPLIT);
    assert!(remote_resolved.source_id().starts_with(tabfquad::SOURCE_REMOTE));

    let provider = tabfquad_provider(remote(), 100, 3);
    let partitioned = tabfquad_key_grouped(
        &provider,
        &TabfquadOptions {
            key_seed: KeySeed::Fixed(1),
            ..options
        },
    )
    .unwrap();
    assert_eq!(partitioned.test.len(), 200);
}

#[test]
fn cauldron_union_tags_every_row_with_its_variant() {
    let partitioned = cauldron_tagged_union(&cauldron_provider(120), &CauldronOptions::default()).unwrap();
    assert_eq!(partitioned.test.len(), 200);
    assert_eq!(partitioned.train.len(), 160);

    for collection in [&partitioned.train, &partitioned.test] {
        assert!(collection.has_field("query"));
        assert!(collection.has_field("image"));
        assert!(collection.has_field("source"));
        for record in collection {
            let tag = record.get("source").and_then(FieldValue::as_text).unwrap();
            assert!(cauldron::VARIANTS.contains(&tag));
            let Some(FieldValue::List(turns)) = record.get("query") else {
                panic!("query should stay a list of turns");
            };
            let first = turns[0].as_text().unwrap();
            assert!(first.starts_with(tag), "{first} tagged {tag}");
        }
    }

    let tags: HashSet<String> = text(&partitioned.train, "source")
        .into_iter()
        .chain(text(&partitioned.test, "source"))
        .collect();
    assert_eq!(tags.len(), 3);
}

#[test]
fn train_set_union_subsamples_arxivqa_then_cuts_500_test_rows() {
    let provider = train_set_provider(remote(), 100, 10_050);
    let partitioned = train_set_union(&provider, &TrainSetOptions::default()).unwrap();

    assert_eq!(partitioned.test.len(), 500);
    // 8 * 100 + 10_000 arxivqa rows survive the subsample.
    assert_eq!(partitioned.train.len(), 10_800 - 500);

    let arxivqa = text(&partitioned.train, "query")
        .into_iter()
        .chain(text(&partitioned.test, "query"))
        .filter(|query| query.starts_with("arxivqa_train "))
        .count();
    assert_eq!(arxivqa, 10_000);
    assert_disjoint_cover(&partitioned, "query", 10_800);
}

#[test]
fn train_set_union_with_a_short_arxivqa_source_is_a_configuration_error() {
    let provider = train_set_provider(ProviderConfig::default(), 100, 9_999);
    let err = run_strategy(&provider, StrategyName::TrainSet).unwrap_err();
    assert!(matches!(err, CorpusError::Configuration(_)));
}

#[test]
fn train_set_union_aborts_when_any_source_is_missing() {
    let options = TrainSetOptions::default();
    let provider = InMemoryProvider::new(ProviderConfig::default());
    let err = train_set_union(&provider, &options).unwrap_err();
    assert!(matches!(
        err,
        CorpusError::SourceUnavailable { ref source_id, .. } if source_id.contains("infovqa_train")
    ));
}
