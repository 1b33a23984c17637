use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::config::{
    CauldronOptions, DocVqaOptions, EmbeddingsOptions, TabfquadOptions, TrainSetOptions,
};
use crate::constants::{docvqa, fields, source, train_set};
use crate::data::{PartitionedCollection, RecordCollection};
use crate::errors::CorpusError;
use crate::source::{LogicalSource, RecordProvider};
use crate::strategies::{
    cauldron_tagged_union, docvqa_union, embeddings_positional, tabfquad_key_grouped,
    train_set_union,
};

/// Stable names of the shipped strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyName {
    /// Two-variant VQA union with a held-out test cut.
    DocVqa,
    /// Single paired-text source, positional split.
    Embeddings,
    /// Single source split by image filename.
    Tabfquad,
    /// Three tagged variants, positional split.
    Cauldron,
    /// Nine-source union with per-source subsampling.
    TrainSet,
}

impl StrategyName {
    /// Every strategy in registry order.
    pub const ALL: [Self; 5] = [
        Self::DocVqa,
        Self::Embeddings,
        Self::Tabfquad,
        Self::Cauldron,
        Self::TrainSet,
    ];

    /// Registry name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocVqa => "docvqa",
            Self::Embeddings => "manu_embeddings",
            Self::Tabfquad => "tabfquad_retrieving",
            Self::Cauldron => "cauldron",
            Self::TrainSet => "train_set",
        }
    }

    /// Field identifying rows for fingerprints, when a single field does.
    pub fn natural_key(self) -> Option<&'static str> {
        match self {
            Self::Tabfquad => Some(fields::IMAGE_FILENAME),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyName {
    type Err = CorpusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| {
                CorpusError::Configuration(format!(
                    "unknown strategy '{value}' (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

/// Run `name` with its default options.
pub fn run_strategy(
    provider: &dyn RecordProvider,
    name: StrategyName,
) -> Result<PartitionedCollection, CorpusError> {
    info!(
        "[corpora:registry] running strategy '{}' locality={:?}",
        name,
        provider.config().locality
    );
    match name {
        StrategyName::DocVqa => docvqa_union(provider, &DocVqaOptions::default()),
        StrategyName::Embeddings => embeddings_positional(provider, &EmbeddingsOptions::default()),
        StrategyName::Tabfquad => tabfquad_key_grouped(provider, &TabfquadOptions::default()),
        StrategyName::Cauldron => cauldron_tagged_union(provider, &CauldronOptions::default()),
        StrategyName::TrainSet => train_set_union(provider, &TrainSetOptions::default()),
    }
}

/// Parse `name` and run it.
pub fn run_named_strategy(
    provider: &dyn RecordProvider,
    name: &str,
) -> Result<PartitionedCollection, CorpusError> {
    run_strategy(provider, name.parse()?)
}

/// Pass-through fetch of the `test` split of an upstream pre-split source.
pub fn fetch_named_test_split(
    provider: &dyn RecordProvider,
    logical_source: &LogicalSource,
) -> Result<RecordCollection, CorpusError> {
    provider.fetch(logical_source, None, source::TEST_SPLIT)
}

/// Reusable accessor bound to one pre-split source.
#[derive(Clone, Debug)]
pub struct TestSetFactory {
    source: LogicalSource,
}

impl TestSetFactory {
    /// Bind the factory to `source`.
    pub fn new(source: LogicalSource) -> Self {
        Self { source }
    }

    /// Factory for a `coldoc/<name>` test set (local snapshot `<name>`).
    pub fn coldoc(name: &str) -> Self {
        Self::new(LogicalSource::prefixed(name, train_set::REMOTE_PREFIX))
    }

    /// Bound source.
    pub fn source(&self) -> &LogicalSource {
        &self.source
    }

    /// Fetch the bound source's `test` split.
    pub fn fetch(&self, provider: &dyn RecordProvider) -> Result<RecordCollection, CorpusError> {
        fetch_named_test_split(provider, &self.source)
    }
}

/// The docvqa-style `test` partition, cut to its first 200 rows.
pub fn docvqa_test(provider: &dyn RecordProvider) -> Result<RecordCollection, CorpusError> {
    docvqa_union(provider, &DocVqaOptions::default())?
        .test
        .head(docvqa::EVAL_ROWS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for name in StrategyName::ALL {
            assert_eq!(name.as_str().parse::<StrategyName>().unwrap(), name);
        }
    }

    #[test]
    fn unknown_names_list_the_valid_ones() {
        let err = "docvqa_v2".parse::<StrategyName>().unwrap_err();
        assert!(matches!(
            err,
            CorpusError::Configuration(ref msg) if msg.contains("docvqa_v2") && msg.contains("train_set")
        ));
    }

    #[test]
    fn coldoc_factory_binds_prefixed_source() {
        let factory = TestSetFactory::coldoc("tabfquad_test_subsampled");
        assert_eq!(factory.source().remote_id(), "coldoc/tabfquad_test_subsampled");
        assert_eq!(factory.source().local_name(), Some("tabfquad_test_subsampled"));
    }
}
