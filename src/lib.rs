#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners shared by the bundled binaries.
pub mod apps;
/// Provider and strategy configuration types.
pub mod config;
/// Centralized constants used across strategies, providers, and the CLI.
pub mod constants;
/// Record, collection, and partition types.
pub mod data;
mod hash;
/// Field renaming, derivation, tagging, and concatenation.
pub mod normalize;
/// Named strategy lookup and pass-through test-set accessors.
pub mod registry;
/// Deterministic shuffling and key-subset sampling.
pub mod sampler;
/// Logical sources and record providers.
pub mod source;
/// Positional and key-grouped train/test splitting.
pub mod splits;
/// The shipped partition strategies.
pub mod strategies;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::{
    CauldronOptions, DocVqaOptions, EmbeddingsOptions, Locality, ProviderConfig, SourcePolicy,
    TabfquadOptions, TrainSetOptions,
};
pub use data::{
    FieldValue, ImageRef, PartitionLabel, PartitionedCollection, Record, RecordCollection,
};
pub use errors::CorpusError;
pub use registry::{
    StrategyName, TestSetFactory, docvqa_test, fetch_named_test_split, run_named_strategy,
    run_strategy,
};
pub use sampler::{DeterministicRng, KeySeed};
#[cfg(feature = "huggingface")]
pub use source::SnapshotProvider;
pub use source::{InMemoryProvider, LogicalSource, RecordProvider};
pub use splits::KeyGroupedSplit;
pub use types::{
    ConfigVariant, FieldName, GroupKey, ProvenanceTag, SourceId, SplitName, StrategyId,
};
