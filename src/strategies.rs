//! The five partition strategies.
//!
//! Each strategy is a single pass: fetch from the injected provider, tag and
//! normalize, merge, then split. Any provider error aborts the whole strategy;
//! no partial partition is ever returned.

use tracing::info;

use crate::config::{
    CauldronOptions, DocVqaOptions, EmbeddingsOptions, TabfquadOptions, TrainSetOptions,
};
use crate::constants::{cauldron, docvqa, embeddings, fields};
use crate::data::{FieldValue, PartitionLabel, PartitionedCollection, RecordCollection};
use crate::errors::CorpusError;
use crate::normalize::{
    Derivation, concatenate, ensure_non_empty_field, normalize, with_constant_field,
};
use crate::sampler::shuffle_then_slice;
use crate::source::RecordProvider;
use crate::splits::{KeyGroupedSplit, key_grouped_split, positional_split};

/// Union of two VQA variants: validation splits become `train`, a seeded
/// 200-row cut of the held-out test splits becomes `test`.
pub fn docvqa_union(
    provider: &dyn RecordProvider,
    options: &DocVqaOptions,
) -> Result<PartitionedCollection, CorpusError> {
    let mut train_parts = Vec::with_capacity(options.variants.len());
    let mut eval_parts = Vec::with_capacity(options.variants.len());
    for variant in &options.variants {
        train_parts.push(provider.fetch(&options.family, Some(variant.as_str()), &options.train_split)?);
        eval_parts.push(provider.fetch(&options.family, Some(variant.as_str()), &options.eval_split)?);
    }

    let train = concatenate("docvqa:train", train_parts)?;
    let eval = concatenate("docvqa:test", eval_parts)?;
    let eval = shuffle_then_slice(eval, options.seed, 0, options.eval_rows)?;

    let image_filename = Derivation::coalesce(
        fields::IMAGE_FILENAME,
        docvqa::PRIMARY_ID_FIELD,
        docvqa::FALLBACK_ID_FIELD,
    );
    let renames = [(docvqa::QUESTION_FIELD, fields::QUERY)];
    let train = normalize(train, &renames, Some(&image_filename))?;
    let eval = normalize(eval, &renames, Some(&image_filename))?;
    finish("docvqa", PartitionedCollection::new(train, eval))
}

/// One paired-text source: shuffle once, first rows are `test`, the rest `train`.
pub fn embeddings_positional(
    provider: &dyn RecordProvider,
    options: &EmbeddingsOptions,
) -> Result<PartitionedCollection, CorpusError> {
    let raw = provider.fetch(&options.source, None, &options.split)?;
    let normalized = normalize(
        raw,
        &[
            (embeddings::QUERY_FIELD, fields::QUERY),
            (embeddings::DOC_FIELD, fields::DOC),
        ],
        None,
    )?;
    finish(
        "manu_embeddings",
        positional_split(normalized, options.seed, options.eval_rows)?,
    )
}

/// One source split by `image_filename`: a drawn key subset feeds `test`, every
/// other key stays in `train`.
pub fn tabfquad_key_grouped(
    provider: &dyn RecordProvider,
    options: &TabfquadOptions,
) -> Result<PartitionedCollection, CorpusError> {
    let raw = provider.fetch(&options.source, None, &options.split)?;
    let settings = KeyGroupedSplit {
        key_field: fields::IMAGE_FILENAME.to_string(),
        eval_keys: options.eval_keys,
        key_seed: options.key_seed,
        eval_rows: options.eval_rows,
        row_seed: options.row_seed,
    };
    finish("tabfquad_retrieving", key_grouped_split(raw, &settings)?)
}

/// Several variants tagged with a `source` provenance field, merged, then split
/// positionally.
pub fn cauldron_tagged_union(
    provider: &dyn RecordProvider,
    options: &CauldronOptions,
) -> Result<PartitionedCollection, CorpusError> {
    let mut parts = Vec::with_capacity(options.variants.len());
    for variant in &options.variants {
        let raw = provider.fetch(&options.family, Some(variant.as_str()), &options.split)?;
        parts.push(with_constant_field(
            raw,
            fields::SOURCE,
            FieldValue::text(variant.as_str()),
        )?);
    }
    let merged = concatenate("cauldron", parts)?;
    let normalized = normalize(
        merged,
        &[
            (cauldron::QUERY_FIELD, fields::QUERY),
            (cauldron::IMAGE_FIELD, fields::IMAGE),
        ],
        None,
    )?;
    finish(
        "cauldron",
        positional_split(normalized, options.seed, options.eval_rows)?,
    )
}

/// Many sources, each optionally subsampled by policy, merged and split
/// positionally.
pub fn train_set_union(
    provider: &dyn RecordProvider,
    options: &TrainSetOptions,
) -> Result<PartitionedCollection, CorpusError> {
    let mut parts = Vec::with_capacity(options.sources.len());
    for policy in &options.sources {
        let raw = provider.fetch(&policy.source, None, &options.split)?;
        let raw = match policy.subsample {
            Some(rows) => {
                info!(
                    "[corpora:strategy] subsampling {} from {} to {} rows",
                    policy.source,
                    raw.len(),
                    rows
                );
                shuffle_then_slice(raw, options.seed, 0, rows)?
            }
            None => raw,
        };
        parts.push(raw);
    }
    let merged = concatenate("train_set", parts)?;
    finish(
        "train_set",
        positional_split(merged, options.seed, options.eval_rows)?,
    )
}

fn finish(
    strategy: &str,
    partitioned: PartitionedCollection,
) -> Result<PartitionedCollection, CorpusError> {
    let (train, test) = partitioned.into_parts();
    let train = label(train, strategy, PartitionLabel::Train);
    let test = label(test, strategy, PartitionLabel::Test);
    ensure_non_empty_field(&train, fields::QUERY)?;
    ensure_non_empty_field(&test, fields::QUERY)?;
    info!(
        "[corpora:strategy] {} done train={} test={}",
        strategy,
        train.len(),
        test.len()
    );
    Ok(PartitionedCollection::new(train, test))
}

fn label(collection: RecordCollection, strategy: &str, partition: PartitionLabel) -> RecordCollection {
    collection.renamed(format!("{strategy}:{partition}"))
}
