use std::path::PathBuf;

use crate::constants::{cauldron, docvqa, embeddings, sampler, source, tabfquad, train_set};
use crate::sampler::KeySeed;
use crate::source::LogicalSource;

/// Where logical source names resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locality {
    /// Snapshot directories under `ProviderConfig::data_dir`.
    #[default]
    Local,
    /// Repositories on the remote registry.
    Remote,
}

impl Locality {
    /// Interpret a `USE_LOCAL_DATASET`-style flag: unset or `"1"` means local.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            None | Some("1") => Self::Local,
            Some(_) => Self::Remote,
        }
    }
}

/// Provider settings, fixed for the lifetime of a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Local snapshots or remote registry.
    pub locality: Locality,
    /// Root directory holding local snapshots.
    pub data_dir: PathBuf,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            locality: Locality::Local,
            data_dir: PathBuf::from(source::DEFAULT_DATA_DIR),
        }
    }
}

/// Per-source policy used by the many-source union.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePolicy {
    /// Source to fetch.
    pub source: LogicalSource,
    /// Rows kept (seeded shuffle-then-slice) before the union; `None` keeps all.
    pub subsample: Option<usize>,
}

impl SourcePolicy {
    /// Keep every row of `source`.
    pub fn full(source: LogicalSource) -> Self {
        Self {
            source,
            subsample: None,
        }
    }

    /// Keep `rows` rows of `source`.
    pub fn subsampled(source: LogicalSource, rows: usize) -> Self {
        Self {
            source,
            subsample: Some(rows),
        }
    }
}

/// Options for the docvqa-style union.
#[derive(Clone, Debug)]
pub struct DocVqaOptions {
    /// Source family holding every variant.
    pub family: LogicalSource,
    /// Variants merged in order.
    pub variants: Vec<String>,
    /// Split feeding `train` (and nothing else).
    pub train_split: String,
    /// Held-out split feeding `test`.
    pub eval_split: String,
    /// Rows kept in `test`.
    pub eval_rows: usize,
    /// Seed of the `test` shuffle.
    pub seed: u64,
}

impl Default for DocVqaOptions {
    fn default() -> Self {
        Self {
            family: LogicalSource::new(docvqa::FAMILY_LOCAL, docvqa::FAMILY_REMOTE),
            variants: vec![docvqa::VARIANT_DOC.into(), docvqa::VARIANT_INFO.into()],
            train_split: docvqa::TRAIN_SPLIT.into(),
            eval_split: docvqa::EVAL_SPLIT.into(),
            eval_rows: docvqa::EVAL_ROWS,
            seed: sampler::DEFAULT_SEED,
        }
    }
}

/// Options for the embeddings-style positional split.
#[derive(Clone, Debug)]
pub struct EmbeddingsOptions {
    /// Paired-text source.
    pub source: LogicalSource,
    /// Upstream split.
    pub split: String,
    /// Leading shuffled rows moved into `test`.
    pub eval_rows: usize,
    /// Shuffle seed.
    pub seed: u64,
}

impl Default for EmbeddingsOptions {
    fn default() -> Self {
        Self {
            source: LogicalSource::remote_only(embeddings::SOURCE_REMOTE),
            split: embeddings::SPLIT.into(),
            eval_rows: embeddings::EVAL_ROWS,
            seed: sampler::DEFAULT_SEED,
        }
    }
}

/// Options for the tabfquad-style key-grouped split.
#[derive(Clone, Debug)]
pub struct TabfquadOptions {
    /// Source keyed by `image_filename`.
    pub source: LogicalSource,
    /// Requested split (aliased for the local snapshot).
    pub split: String,
    /// Distinct `image_filename` values drawn into `test`.
    pub eval_keys: usize,
    /// Rows kept in `test` after the row shuffle.
    pub eval_rows: usize,
    /// Seed discipline for the key draw; unseeded unless a caller pins it.
    pub key_seed: KeySeed,
    /// Seed for the row shuffle of the drawn keys' rows.
    pub row_seed: u64,
}

impl Default for TabfquadOptions {
    fn default() -> Self {
        Self {
            source: LogicalSource::new(tabfquad::SOURCE_LOCAL, tabfquad::SOURCE_REMOTE)
                .with_local_split(tabfquad::SPLIT, tabfquad::LOCAL_SPLIT),
            split: tabfquad::SPLIT.into(),
            eval_keys: tabfquad::EVAL_KEYS,
            eval_rows: tabfquad::EVAL_ROWS,
            key_seed: KeySeed::Unseeded,
            row_seed: sampler::DEFAULT_SEED,
        }
    }
}

/// Options for the cauldron-style tagged union.
#[derive(Clone, Debug)]
pub struct CauldronOptions {
    /// Source family holding every variant.
    pub family: LogicalSource,
    /// Variants to merge; each variant name is also its provenance tag.
    pub variants: Vec<String>,
    /// Upstream split of every variant.
    pub split: String,
    /// Leading shuffled rows moved into `test`.
    pub eval_rows: usize,
    /// Shuffle seed.
    pub seed: u64,
}

impl Default for CauldronOptions {
    fn default() -> Self {
        Self {
            family: LogicalSource::remote_only(cauldron::FAMILY_REMOTE),
            variants: cauldron::VARIANTS.iter().map(|v| v.to_string()).collect(),
            split: cauldron::SPLIT.into(),
            eval_rows: cauldron::EVAL_ROWS,
            seed: sampler::DEFAULT_SEED,
        }
    }
}

/// Options for the many-source training-set union.
#[derive(Clone, Debug)]
pub struct TrainSetOptions {
    /// Sources in concatenation order with their subsampling policy.
    pub sources: Vec<SourcePolicy>,
    /// Upstream split of every source.
    pub split: String,
    /// Leading shuffled rows moved into `test`.
    pub eval_rows: usize,
    /// Seed for subsampling and the final shuffle.
    pub seed: u64,
}

impl Default for TrainSetOptions {
    fn default() -> Self {
        let sources = train_set::SOURCES
            .iter()
            .map(|name| {
                let source = LogicalSource::prefixed(name, train_set::REMOTE_PREFIX);
                if *name == train_set::ARXIVQA_SOURCE {
                    SourcePolicy::subsampled(source, train_set::ARXIVQA_ROWS)
                } else {
                    SourcePolicy::full(source)
                }
            })
            .collect();
        Self {
            sources,
            split: train_set::SPLIT.into(),
            eval_rows: train_set::EVAL_ROWS,
            seed: sampler::DEFAULT_SEED,
        }
    }
}
